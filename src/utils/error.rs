use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Oracle unavailable: {message}")]
    OracleUnavailable { message: String },

    #[error("Image enrichment failed: {message}")]
    EnrichmentFailure { message: String },

    #[error("Record already exists for product: {name}")]
    DuplicateKey { name: String },

    #[error("Notification dispatch to {target} failed: {message}")]
    DispatchFailure { target: String, message: String },

    #[error("Storage error: {source}")]
    StorageError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller supplied bad input.
    Input,
    /// A non-essential collaborator failed; the answer degrades.
    Degraded,
    /// Startup configuration is wrong.
    Configuration,
    /// Storage or unexpected failure; surfaces as a 500.
    Internal,
}

impl TrackerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TrackerError::ValidationError { .. } => ErrorCategory::Input,
            TrackerError::OracleUnavailable { .. }
            | TrackerError::EnrichmentFailure { .. }
            | TrackerError::DuplicateKey { .. }
            | TrackerError::DispatchFailure { .. } => ErrorCategory::Degraded,
            TrackerError::ConfigError { .. }
            | TrackerError::InvalidConfigValueError { .. }
            | TrackerError::MissingConfigError { .. } => ErrorCategory::Configuration,
            TrackerError::StorageError { .. }
            | TrackerError::ApiError(_)
            | TrackerError::IoError(_)
            | TrackerError::SerializationError(_)
            | TrackerError::InternalError { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether the resolver or sweeper may absorb this error and keep going.
    pub fn is_degradable(&self) -> bool {
        self.category() == ErrorCategory::Degraded
    }

    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TrackerError::StorageError {
            source: Box::new(err),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => self.to_string(),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Degraded => format!("A collaborator is unavailable: {}", self),
            ErrorCategory::Internal => "Internal Server Error".to_string(),
        }
    }
}
