use std::fmt;

use crate::model::Source;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty file path, bad category labels, etc.).
    ConfigValidation(String),
    /// A column named in the config is absent from the loaded source.
    MissingColumn { source: Source, column: String },
    /// Join key appears more than once in one source table.
    DuplicateKey { source: Source, key: String },
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { source, column } => {
                write!(f, "source '{source}': missing column '{column}'")
            }
            Self::DuplicateKey { source, key } => {
                write!(f, "source '{source}': join key '{key}' is not unique")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
