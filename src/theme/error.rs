//! Theme engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThemeError {
    /// Loading or rendering failed; the message carries the whole cause chain
    #[error("Template error: {0}")]
    TemplateError(String),

    /// The override directory could not be read
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
