use std::fmt;

/// Custom error type for the outer layers (config, storage, report IO).
/// The enrichment pipeline itself never fails; see the resolver fallback.
#[derive(Debug)]
pub enum AppError {
    /// Database operation error
    Database(String),
    /// Configuration error
    Config(String),
    /// IO error
    Io(std::io::Error),
    /// Report serialization error
    Serialize(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(err) => write!(f, "IO error: {}", err),
            AppError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialize(err.to_string())
    }
}
