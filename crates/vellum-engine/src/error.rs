//! Engine errors

/// Failure to start a document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),
}
