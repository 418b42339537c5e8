use thiserror::Error;

/// Validation and contract errors exposed by `thaifin-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid source '{value}', expected one of finnomena, thai_securities_data, set_factsheet, set_dividend")]
    InvalidSource { value: String },

    #[error("fiscal year {year} is outside the supported range")]
    FiscalYearOutOfRange { year: i64 },
    #[error("quarter must be 1..=4, got {value}")]
    InvalidQuarter { value: i64 },
    #[error("unrecognized period label '{value}'")]
    InvalidPeriodLabel { value: String },

    #[error("field '{field}' is not a number: '{value}'")]
    NotANumber { field: String, value: String },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: String },
    #[error("invalid calendar date '{value}'")]
    InvalidDate { value: String },

    #[error("security id '{value}' is not a UUID")]
    InvalidSecurityId { value: String },
    #[error("required field '{field}' is missing")]
    MissingField { field: &'static str },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for CoreError {
    fn from(value: toml::de::Error) -> Self {
        Self::Config(value.to_string())
    }
}
