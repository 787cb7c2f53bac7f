// ABOUTME: The ContainerRuntime lifecycle contract every backend implements.
// ABOUTME: Sealed so new methods can be added without breaking downstreams.

use super::error::RuntimeError;
use super::options::{BuildOptions, ContainerId, StartOptions, WorkspaceInfo, WorkspaceStatus};
use async_trait::async_trait;

pub(crate) mod sealed {
    /// Sealed trait preventing external `ContainerRuntime` implementations,
    /// so the contract can grow without a semver break.
    pub trait Sealed {}
}

/// Which execution model a runtime instance speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeType {
    /// Docker Engine API over a Unix socket.
    Docker,
    /// containerd gRPC, client and daemon on the same filesystem.
    Containerd,
    /// containerd inside a Colima VM, driven via `colima ssh` + nerdctl.
    ContainerdSsh,
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeType::Docker => write!(f, "docker"),
            RuntimeType::Containerd => write!(f, "containerd"),
            RuntimeType::ContainerdSsh => write!(f, "containerd-ssh"),
        }
    }
}

/// Uniform lifecycle contract over Docker, containerd and Colima backends.
///
/// One instance owns one engine connection. Read operations (status, list)
/// are safe to call concurrently within a process; concurrent start/stop on
/// the same workspace name must be serialized by the caller — the idempotent
/// creation check narrows but does not close that race.
#[async_trait]
pub trait ContainerRuntime: sealed::Sealed + Send + Sync {
    /// Build an image for a workspace. Backends without a build verb reject
    /// this deterministically with an error naming the image builder.
    async fn build_image(&self, opts: &BuildOptions) -> Result<(), RuntimeError>;

    /// Ensure a workspace container exists and is running, and return its id.
    ///
    /// Idempotent: an existing container with the same recorded image is
    /// reused (started in place if stopped); a different or unrecorded image
    /// forces removal and recreation under the same name.
    async fn start_workspace(&self, opts: &StartOptions) -> Result<ContainerId, RuntimeError>;

    /// Open an interactive shell in a running workspace; blocks until the
    /// session ends. Fails with a state error when the workspace is not
    /// running, and a hard not-found when it does not exist.
    async fn attach_to_workspace(&self, id: &ContainerId) -> Result<(), RuntimeError>;

    /// Stop a workspace: graceful signal, bounded wait, then force-kill.
    /// A workspace that is already gone is not an error.
    async fn stop_workspace(&self, id: &ContainerId) -> Result<(), RuntimeError>;

    /// Observe the workspace's state. A missing container yields
    /// `WorkspaceStatus::NotFound`, never an error — callers poll this.
    async fn workspace_status(&self, id: &ContainerId) -> Result<WorkspaceStatus, RuntimeError>;

    /// All DVM-managed workspaces (filtered by the managed label).
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceInfo>, RuntimeError>;

    /// Find one managed workspace by container name.
    async fn find_workspace(&self, name: &str) -> Result<Option<WorkspaceInfo>, RuntimeError> {
        Ok(self
            .list_workspaces()
            .await?
            .into_iter()
            .find(|w| w.name == name))
    }

    /// Stop every managed workspace. Only containers carrying the managed
    /// label are ever touched.
    async fn stop_all(&self) -> Result<usize, RuntimeError> {
        let workspaces = self.list_workspaces().await?;
        let mut stopped = 0;
        for ws in workspaces {
            if ws.status.is_running() {
                self.stop_workspace(&ws.id).await?;
                stopped += 1;
            }
        }
        Ok(stopped)
    }

    fn runtime_type(&self) -> RuntimeType;

    fn platform_name(&self) -> &str;

    /// Release the engine connection. Instances own their connection
    /// exclusively; drop alone is not guaranteed to flush transports.
    async fn close(&self) -> Result<(), RuntimeError> {
        Ok(())
    }
}
