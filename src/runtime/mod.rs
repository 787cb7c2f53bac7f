// ABOUTME: The runtime layer: a uniform container lifecycle contract and its
// ABOUTME: Docker, containerd and Colima backends.

pub mod containerd;
pub mod docker;
pub mod error;
pub mod factory;
pub mod options;
pub mod traits;

pub use error::{RuntimeError, WorkspaceError, WorkspaceErrorKind};
pub use factory::{RuntimeChoice, create_runtime};
pub use options::{
    BuildOptions, ContainerId, StartAction, StartOptions, WorkspaceInfo, WorkspaceStatus,
    reconcile_start,
};
pub use traits::{ContainerRuntime, RuntimeType};
