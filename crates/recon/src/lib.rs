//! `pricecheck-recon`: Three-source quotation reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded source tables and a rate source,
//! returns reconciled rows with converted contract values, deltas and
//! diagnostics. No CLI, file or HTTP dependencies.

pub mod classify;
pub mod config;
pub mod convert;
pub mod currency;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod fx;
pub mod join;
pub mod model;
pub mod prepare;
pub mod schema;
pub mod stats;
pub mod table;

pub use classify::{delta_pct, ModelChange};
pub use config::ReconConfig;
pub use convert::{convert, CurrencyComparison};
pub use currency::{CurrencyReport, CurrencyTable};
pub use engine::run;
pub use error::ReconError;
pub use fx::{ExchangeRateService, RateError, RateSource, StaticRates};
pub use model::{ReconInput, ReconResult, SourceTable, Value};
