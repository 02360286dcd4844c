// File I/O operations

pub mod csv;
pub mod export;
pub mod json;
pub mod source;
pub mod xlsx;

pub use export::write_outputs;
pub use source::{load_currency_table, load_input, load_source, load_static_rates};
