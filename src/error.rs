use thiserror::Error;

/// Error taxonomy for the trading bot.
///
/// The cycle runner treats these classes differently: `Transient` is
/// retried with backoff, `DataUnavailable` skips the cycle, `Validation`
/// aborts the cycle before anything is persisted, `Execution` leaves the
/// position state untouched, and `Config` is only fatal at startup.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("price history unavailable: {0}")]
    DataUnavailable(String),

    #[error("transient network failure: {0}")]
    Transient(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("order execution failed: {0}")]
    Execution(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl BotError {
    /// Whether the retry helper may re-attempt the operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, BotError::Transient(_))
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            BotError::Transient(err.to_string())
        } else {
            BotError::Execution(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
