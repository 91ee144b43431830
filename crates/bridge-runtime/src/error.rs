use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};

/// Fatal orchestrator errors (spec §7: "the only fatal paths are unable to
/// load the consolidated config with no last-good, or graceful
/// cancellation"). Every other failure mode collapses into
/// `ServiceStats.is_healthy` + `last_error`, never a `StructError`.
#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum RuntimeReason {
    #[error("bootstrap error")]
    Bootstrap,
    #[error("shutdown error")]
    Shutdown,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for RuntimeReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Bootstrap => 2001,
            Self::Shutdown => 2002,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type RuntimeError = StructError<RuntimeReason>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;
