/// Errors that can occur at the native boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// The native entry point is missing or the core is not linked.
    ///
    /// Distinct from a refused connection: the library isn't there at all.
    #[error("native netplay unavailable: {0}")]
    Unavailable(String),

    /// The native call ran and reported a failure.
    #[error("native call `{op}` failed: {message}")]
    Call { op: &'static str, message: String },

    /// The native call panicked on its blocking thread.
    #[error("native call `{op}` panicked")]
    Panicked { op: &'static str },
}

impl NativeError {
    /// Returns `true` for [`NativeError::Unavailable`].
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
