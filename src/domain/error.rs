//! Domain error types.

/// Outcome of an open/close that could not be applied to the ledger.
///
/// These are "nothing to do" results: callers skip the ticker and carry on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("position already open for {0}")]
    AlreadyOpen(String),

    #[error("no capacity for a new position (cash {cash:.2}, open {open}/{max})")]
    CapacityExhausted { cash: f64, open: usize, max: usize },

    #[error("no open position for {0}")]
    NotOpen(String),

    #[error("invalid price {price} for {ticker}")]
    InvalidPrice { ticker: String, price: f64 },
}

/// Top-level error type for simtrader.
#[derive(Debug, thiserror::Error)]
pub enum SimtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("corrupt {file}: {reason}")]
    StorageFormat { file: String, reason: String },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error("failed to fetch {ticker}: {reason}")]
    DataFetch { ticker: String, reason: String },

    #[error("universe unavailable: {reason}")]
    Universe { reason: String },

    #[error("trading cycle failed: {reason}")]
    Cycle { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SimtraderError> for std::process::ExitCode {
    fn from(err: &SimtraderError) -> Self {
        let code: u8 = match err {
            SimtraderError::Io(_)
            | SimtraderError::Storage { .. }
            | SimtraderError::StorageFormat { .. } => 1,
            SimtraderError::ConfigParse { .. }
            | SimtraderError::ConfigMissing { .. }
            | SimtraderError::ConfigInvalid { .. } => 2,
            SimtraderError::NoData { .. }
            | SimtraderError::DataFetch { .. }
            | SimtraderError::Universe { .. } => 3,
            SimtraderError::Cycle { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_error_messages() {
        assert_eq!(
            LedgerError::AlreadyOpen("AAPL".into()).to_string(),
            "position already open for AAPL"
        );
        assert_eq!(
            LedgerError::NotOpen("MSFT".into()).to_string(),
            "no open position for MSFT"
        );
        let err = LedgerError::CapacityExhausted {
            cash: 5.0,
            open: 3,
            max: 100,
        };
        assert_eq!(
            err.to_string(),
            "no capacity for a new position (cash 5.00, open 3/100)"
        );
    }

    #[test]
    fn config_invalid_message_names_section_and_key() {
        let err = SimtraderError::ConfigInvalid {
            section: "trading".into(),
            key: "stop_loss".into(),
            reason: "must be between 0 and 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [trading] stop_loss: must be between 0 and 1"
        );
    }

    #[test]
    fn io_error_converts_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SimtraderError = io.into();
        assert!(matches!(err, SimtraderError::Io(_)));
        assert_eq!(err.to_string(), "gone");
    }
}
