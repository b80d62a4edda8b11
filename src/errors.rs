use thiserror::Error;
use timeledger_config::ConfigError;
use timeledger_domain::{MonthKey, MonthKeyError};
use uuid::Uuid;

/// Failures raised at the engine boundary. The aggregation itself never fails;
/// degraded inputs surface as absent hours or warnings instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid month: {0}")]
    Month(#[from] MonthKeyError),
    #[error("Invalid window: {from} is after {to}")]
    InvalidWindow { from: MonthKey, to: MonthKey },
    #[error("Dataset failed validation:\n  {}", .0.join("\n  "))]
    Validation(Vec<String>),
    #[error("Unknown user {0}")]
    UnknownUser(Uuid),
    #[error("Unknown scenario {scenario} for user {user}")]
    UnknownScenario { user: Uuid, scenario: Uuid },
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Errors surfaced by `timeledger_cli`.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Engine(EngineError::Config(err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Engine(EngineError::Serde(err))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Engine(EngineError::Io(err))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
pub type CliResult<T> = std::result::Result<T, CliError>;
