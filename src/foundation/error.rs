/// Convenience result type used across gifloom.
pub type GifResult<T> = Result<T, GifError>;

/// Top-level error taxonomy used by encoder APIs.
#[derive(thiserror::Error, Debug)]
pub enum GifError {
    /// Invalid caller-provided frame data or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation not allowed in the current session state.
    #[error("invalid state: {0}")]
    State(String),

    /// Failure while opening, writing or flushing the output sink.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors when serializing or deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GifError {
    /// Build a [`GifError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`GifError::State`] value.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Build a [`GifError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether the error came from the output sink.
    ///
    /// A session that reported an I/O error has possibly written a partial stream; callers
    /// should discard whatever the sink received.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
