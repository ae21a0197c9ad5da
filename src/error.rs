use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("constraint violation: {0}")]
    Conflict(String),

    #[error("blocked by references: {0}")]
    ReferentialBlock(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("engine is closed")]
    EngineClosed,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::ReferentialBlock(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
