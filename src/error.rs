use thiserror::Error;

/// Why a complete `(projection, line, std_dev)` triple could not be priced.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EdgeError {
    #[error("std_dev must be greater than zero, got {0}")]
    InvalidStdDev(f64),

    #[error("line is zero, edge percentage is undefined")]
    DivisionByZeroEdge,

    #[error("non-finite operand: {0}")]
    NonFiniteOperand(&'static str),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column missing: {0}")]
    MissingColumn(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("EDGE_DEFAULT_STD_DEV must be a number greater than zero, got {0:?}")]
    InvalidDefaultStdDev(String),

    #[error("unknown league {0:?} (expected nba, nfl, mlb or nhl)")]
    UnknownLeague(String),

    #[error("unknown tier scheme {0:?} (expected letter or strength)")]
    UnknownTierScheme(String),
}
