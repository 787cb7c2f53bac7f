// ABOUTME: Error taxonomy for runtime operations, plus a SNAFU-unified
// ABOUTME: wrapper with an error-kind accessor for programmatic handling.

use crate::naming::NameError;
use crate::platform::DetectError;
use crate::runtime::options::WorkspaceStatus;
use snafu::Snafu;

/// Errors from container runtime operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Dial failure against the engine socket or gRPC endpoint. Carries the
    /// platform's start hint so the user gets a next step, not a raw
    /// transport error.
    #[error("failed to connect to {platform}: {message}; try: {hint}")]
    Connection {
        platform: String,
        message: String,
        hint: String,
    },

    /// Deterministic "this backend cannot do that" failure. Never transient,
    /// must not be retried.
    #[error("{operation} is not supported by the {runtime} runtime: {hint}")]
    Unsupported {
        operation: &'static str,
        runtime: &'static str,
        hint: String,
    },

    /// Operation required a workspace state it was not in.
    #[error("workspace {workspace} is {actual}, expected {expected}")]
    State {
        workspace: String,
        expected: WorkspaceStatus,
        actual: WorkspaceStatus,
    },

    /// Hard not-found, used by attach/stop-style operations. Status queries
    /// report `WorkspaceStatus::NotFound` instead of this.
    #[error("workspace not found: {0}")]
    NotFound(String),

    #[error("image not found: {name}; {hint}")]
    ImageNotFound { name: String, hint: String },

    #[error("invalid workspace name: {0}")]
    Name(#[from] NameError),

    /// Engine-reported failure that maps to no more specific variant.
    #[error("{0}")]
    Engine(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Unified error for detection plus runtime operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WorkspaceError {
    #[snafu(display("platform detection failed: {source}"))]
    Detection { source: DetectError },

    #[snafu(display("{source}"))]
    Runtime { source: RuntimeError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceErrorKind {
    /// No container platform found on the machine.
    NoPlatformFound,
    /// An explicitly requested platform is installed but not running.
    PlatformUnavailable,
    /// Could not connect to the engine.
    ConnectionFailed,
    /// The selected backend does not support the operation.
    Unsupported,
    /// The workspace was in the wrong state for the operation.
    StateMismatch,
    /// The workspace or image does not exist.
    NotFound,
    /// Anything else the engine reported.
    EngineFailure,
}

impl WorkspaceError {
    pub fn kind(&self) -> WorkspaceErrorKind {
        match self {
            WorkspaceError::Detection { source } => match source {
                DetectError::NoPlatformFound { .. } => WorkspaceErrorKind::NoPlatformFound,
                DetectError::PlatformUnavailable { .. } | DetectError::UnknownPlatform(_) => {
                    WorkspaceErrorKind::PlatformUnavailable
                }
            },
            WorkspaceError::Runtime { source } => match source {
                RuntimeError::Connection { .. } => WorkspaceErrorKind::ConnectionFailed,
                RuntimeError::Unsupported { .. } => WorkspaceErrorKind::Unsupported,
                RuntimeError::State { .. } => WorkspaceErrorKind::StateMismatch,
                RuntimeError::NotFound(_) | RuntimeError::ImageNotFound { .. } => {
                    WorkspaceErrorKind::NotFound
                }
                RuntimeError::Name(_) | RuntimeError::Engine(_) | RuntimeError::Io(_) => {
                    WorkspaceErrorKind::EngineFailure
                }
            },
        }
    }
}

impl From<DetectError> for WorkspaceError {
    fn from(source: DetectError) -> Self {
        WorkspaceError::Detection { source }
    }
}

impl From<RuntimeError> for WorkspaceError {
    fn from(source: RuntimeError) -> Self {
        WorkspaceError::Runtime { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_classify_variants() {
        let err: WorkspaceError = RuntimeError::NotFound("dvm-api-main".into()).into();
        assert_eq!(err.kind(), WorkspaceErrorKind::NotFound);

        let err: WorkspaceError = RuntimeError::State {
            workspace: "dvm-api-main".into(),
            expected: WorkspaceStatus::Running,
            actual: WorkspaceStatus::Stopped,
        }
        .into();
        assert_eq!(err.kind(), WorkspaceErrorKind::StateMismatch);
    }

    #[test]
    fn connection_error_carries_hint() {
        let err = RuntimeError::Connection {
            platform: "Colima".into(),
            message: "connection refused".into(),
            hint: "colima start".into(),
        };
        assert!(err.to_string().contains("colima start"));
    }
}
