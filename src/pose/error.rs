use thiserror::Error;

/// Errors raised by the pose core.
///
/// Shape errors are never retried: the caller handed over data the decoder
/// cannot interpret, and guessing a default would hide the fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoseError {
    #[error("invalid shape: {0}")]
    InvalidShape(String),
}

impl PoseError {
    pub(crate) fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape(reason.into())
    }
}
