#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid configuration for {key}: {message}")]
    Config { key: &'static str, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
