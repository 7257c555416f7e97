//! Domain error types.
//!
//! Only structural problems surface as errors. Sparse or undefined data is
//! absorbed by the fallback policies of the signal, allocation and
//! evaluation stages and never reaches this type.

use crate::domain::universe::UniverseError;

/// Top-level error type for overlaytrader.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
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

    #[error("{role} ticker {ticker} is missing from the input data")]
    MissingTicker { ticker: String, role: String },

    #[error("column {column} is missing from {frame}")]
    MissingColumn { frame: String, column: String },

    #[error("market data error: {reason}")]
    Data { reason: String },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error(transparent)]
    InvalidTicker(#[from] UniverseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OverlayError {
    pub(crate) fn missing_ticker(ticker: &str, role: &str) -> Self {
        OverlayError::MissingTicker {
            ticker: ticker.to_string(),
            role: role.to_string(),
        }
    }

    pub(crate) fn missing_column(frame: &str, column: &str) -> Self {
        OverlayError::MissingColumn {
            frame: frame.to_string(),
            column: column.to_string(),
        }
    }

    /// Process exit status for this error family.
    pub fn exit_status(&self) -> u8 {
        match self {
            OverlayError::Io(_) => 1,
            OverlayError::ConfigParse { .. }
            | OverlayError::ConfigMissing { .. }
            | OverlayError::ConfigInvalid { .. }
            | OverlayError::InvalidTicker(_) => 2,
            OverlayError::Data { .. } => 3,
            OverlayError::MissingTicker { .. } | OverlayError::MissingColumn { .. } => 4,
            OverlayError::NoData { .. } => 5,
        }
    }
}

impl From<&OverlayError> for std::process::ExitCode {
    fn from(err: &OverlayError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ticker_message_names_ticker_and_role() {
        let err = OverlayError::missing_ticker("BIL", "cash");
        assert_eq!(
            err.to_string(),
            "cash ticker BIL is missing from the input data"
        );
    }

    #[test]
    fn missing_column_message_names_frame() {
        let err = OverlayError::missing_column("dollar volume", "QQQ");
        assert_eq!(err.to_string(), "column QQQ is missing from dollar volume");
    }

    #[test]
    fn universe_error_is_transparent() {
        let err: OverlayError = UniverseError::DuplicateTicker("SPY".into()).into();
        assert_eq!(err.to_string(), "duplicate ticker: SPY");
    }

    #[test]
    fn exit_codes_by_family() {
        let cfg = OverlayError::ConfigMissing {
            section: "universe".into(),
            key: "tickers".into(),
        };
        assert_eq!(cfg.exit_status(), 2);
        let structural = OverlayError::missing_ticker("SPY", "benchmark");
        assert_eq!(structural.exit_status(), 4);
        let empty = OverlayError::NoData {
            ticker: "GLD".into(),
        };
        assert_eq!(empty.exit_status(), 5);
    }
}
