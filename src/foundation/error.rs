use crate::foundation::core::ImageId;

/// Convenience result type used across the crate.
pub type RestoreResult<T> = Result<T, RestoreError>;

/// Error taxonomy for image recording, resolution and restoration.
#[derive(thiserror::Error, Debug)]
pub enum RestoreError {
    /// Region or vertex data out of bounds. A programmer error; never retried.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Texture allocation, upload, readback or draw submission failed.
    ///
    /// Recoverable by retrying the enclosing resolve/restore pass.
    #[error("backend failure: {0}")]
    BackendFailure(String),

    /// Unresolved histories read from each other in a loop.
    #[error("cyclic dependency between images {images:?}")]
    CyclicDependency {
        /// Images left unordered once every acyclic node was drained.
        images: Vec<ImageId>,
    },

    /// Shader or addressing feature unavailable on the current backend.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A uniform value does not match the shader's slot schema.
    #[error("invalid uniform: {0}")]
    InvalidUniform(String),

    /// Use of an image or shader after it was disposed.
    #[error("use after dispose: {0}")]
    Disposed(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RestoreError {
    /// Build a [`RestoreError::InvalidGeometry`] value.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Build a [`RestoreError::BackendFailure`] value.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::BackendFailure(msg.into())
    }

    /// Build a [`RestoreError::UnsupportedFeature`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFeature(msg.into())
    }

    /// Build a [`RestoreError::InvalidUniform`] value.
    pub fn uniform(msg: impl Into<String>) -> Self {
        Self::InvalidUniform(msg.into())
    }

    /// Build a [`RestoreError::Disposed`] value.
    pub fn disposed(msg: impl Into<String>) -> Self {
        Self::Disposed(msg.into())
    }

    /// `true` when retrying the same pass on a later frame may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendFailure(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
