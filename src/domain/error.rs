//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for backadjust.
#[derive(Debug, thiserror::Error)]
pub enum BackadjustError {
    #[error("invalid contract code {code:?}: {reason}")]
    Format { code: String, reason: String },

    #[error(
        "no prices for both {outgoing} and {incoming} within {lookback} trading days of {roll_date}"
    )]
    DataGap {
        outgoing: String,
        incoming: String,
        roll_date: NaiveDate,
        lookback: usize,
    },

    #[error("need {required} rollable active contracts, found {found}")]
    InsufficientContracts { required: usize, found: usize },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

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

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BackadjustError {
    pub fn format(code: &str, reason: impl Into<String>) -> Self {
        Self::Format {
            code: code.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&BackadjustError> for std::process::ExitCode {
    fn from(err: &BackadjustError) -> Self {
        let code: u8 = match err {
            BackadjustError::Io(_) | BackadjustError::Csv(_) => 1,
            BackadjustError::ConfigParse { .. }
            | BackadjustError::ConfigMissing { .. }
            | BackadjustError::ConfigInvalid { .. } => 2,
            BackadjustError::Format { .. } => 3,
            BackadjustError::DataGap { .. } => 4,
            BackadjustError::InsufficientContracts { .. } | BackadjustError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
