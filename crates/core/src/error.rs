use thiserror::Error;

pub type MixResult<T> = Result<T, MixError>;

#[derive(Error, Debug)]
pub enum MixError {
    #[error("No records loaded: {0}")]
    MissingData(String),

    #[error("Channel mismatch between investment and contribution tables: {0}")]
    ChannelMismatch(String),

    #[error("Infeasible budget: total {total_budget:.2} is below the channel floor total {floor_total:.2}")]
    InfeasibleBudget { total_budget: f64, floor_total: f64 },

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for MixError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasible_budget_message() {
        let err = MixError::InfeasibleBudget {
            total_budget: 10_000.0,
            floor_total: 75_000.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("10000.00"));
        assert!(msg.contains("75000.00"));
    }

    #[test]
    fn test_serde_error_converts() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: MixError = parse.unwrap_err().into();
        assert!(matches!(err, MixError::Serialization(_)));
    }
}
