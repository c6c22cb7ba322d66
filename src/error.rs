use thiserror::Error;

pub type Result<T> = std::result::Result<T, DemandError>;

#[derive(Error, Debug)]
pub enum DemandError {
    /// Source malformed or catalog columns missing. Fatal at startup.
    #[error("data load error: {0}")]
    DataLoad(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown medicine: {0}")]
    UnknownMedicine(String),

    /// The medicine never accumulated a full trailing window.
    #[error("insufficient history for {medicine}: no complete {needed}-row window in {got} rows")]
    InsufficientHistory {
        medicine: String,
        needed: usize,
        got: usize,
    },

    #[error("invalid feature {feature}: {value}")]
    InvalidFeature { feature: &'static str, value: f64 },

    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("model load error: {0}")]
    ModelLoad(String),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl DemandError {
    /// Errors that must stop the process before it serves anything.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DemandError::DataLoad(_)
                | DemandError::Csv(_)
                | DemandError::Sqlite(_)
                | DemandError::Io(_)
                | DemandError::ModelLoad(_)
                | DemandError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = DemandError::UnknownMedicine("X99".to_string());
        assert_eq!(err.to_string(), "unknown medicine: X99");

        let err = DemandError::InsufficientHistory {
            medicine: "R06".to_string(),
            needed: 30,
            got: 12,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history for R06: no complete 30-row window in 12 rows"
        );

        let err = DemandError::InvalidFeature {
            feature: "last_30d",
            value: f64::NAN,
        };
        assert_eq!(err.to_string(), "invalid feature last_30d: NaN");
    }

    #[test]
    fn load_errors_are_fatal_request_errors_are_not() {
        assert!(DemandError::DataLoad("missing column".into()).is_fatal());
        assert!(DemandError::ModelLoad("bad json".into()).is_fatal());
        assert!(!DemandError::UnknownMedicine("X".into()).is_fatal());
        assert!(!DemandError::Classifier("boom".into()).is_fatal());
    }
}
