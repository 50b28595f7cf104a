use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoreError {
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
    #[error("invalid date range: {0}")]
    InvalidRange(String),
    #[error("csv error: {0}")]
    Csv(String),
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("too many rows: {count} (max {max})")]
    TooManyRows { count: usize, max: usize },
}

impl From<csv::Error> for CoreError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}
