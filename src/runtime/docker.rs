// ABOUTME: DockerRuntime - the lifecycle contract over the Docker Engine API.
// ABOUTME: Serves OrbStack, Docker Desktop, Podman, Linux and Colima-docker.

use crate::platform::Platform;
use crate::runtime::error::RuntimeError;
use crate::runtime::options::{
    BuildOptions, ContainerId, IMAGE_LABEL, MANAGED_LABEL, StartAction, StartOptions,
    WorkspaceInfo, WorkspaceStatus, reconcile_start,
};
use crate::runtime::traits::{ContainerRuntime, RuntimeType, sealed::Sealed};
use crate::ssh_agent::{self, CONTAINER_AGENT_SOCKET};
use crate::term::RawModeGuard;
use async_trait::async_trait;
use bollard::Docker;
use bollard::exec::{ResizeExecOptions, StartExecOptions, StartExecResults};
use bollard::models::{ContainerCreateBody, HostConfig, Mount, MountTypeEnum};
use bollard::query_parameters::{
    BuildImageOptions, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StopContainerOptions,
};
use futures::StreamExt;
use std::collections::HashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn is_not_found(e: &bollard::errors::Error) -> bool {
    matches!(
        e,
        bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }
    )
}

fn is_not_modified(e: &bollard::errors::Error) -> bool {
    matches!(
        e,
        bollard::errors::Error::DockerResponseServerError { status_code: 304, .. }
    )
}

fn map_create_error(e: bollard::errors::Error, image: &str) -> RuntimeError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code: 404, .. } => {
            RuntimeError::ImageNotFound {
                name: image.to_string(),
                hint: "build it first with `dvm build`".to_string(),
            }
        }
        _ => RuntimeError::Engine(e.to_string()),
    }
}

/// Docker Engine API runtime.
///
/// One instance owns one client over the platform's Unix socket.
pub struct DockerRuntime {
    client: Docker,
    platform: Platform,
    stop_grace: std::time::Duration,
}

impl DockerRuntime {
    /// Connect to the engine behind the detected platform's socket.
    pub fn connect(platform: Platform, stop_grace: std::time::Duration) -> Result<Self, RuntimeError> {
        let socket = platform.socket_path.to_string_lossy();
        let client = Docker::connect_with_unix(&socket, 120, bollard::API_DEFAULT_VERSION)
            .map_err(|e| RuntimeError::Connection {
                platform: platform.name.clone(),
                message: e.to_string(),
                hint: platform.kind.start_hint().to_string(),
            })?;
        Ok(Self { client, platform, stop_grace })
    }

    fn stop_options(&self) -> StopContainerOptions {
        StopContainerOptions {
            t: Some(self.stop_grace.as_secs().min(i32::MAX as u64) as i32),
            signal: None,
        }
    }

    fn host_config(&self, opts: &StartOptions) -> Result<HostConfig, RuntimeError> {
        let mut mounts: Vec<Mount> = opts
            .mounts
            .iter()
            .map(|m| Mount {
                source: Some(m.source.to_string_lossy().into_owned()),
                target: Some(m.destination.clone()),
                typ: Some(MountTypeEnum::BIND),
                read_only: Some(m.read_only),
                ..Default::default()
            })
            .collect();

        if opts.ssh_agent_forwarding {
            let agent = ssh_agent::resolve_agent_socket(&self.platform)
                .map_err(|e| RuntimeError::Engine(e.to_string()))?;
            mounts.push(Mount {
                source: Some(agent.to_string_lossy().into_owned()),
                target: Some(CONTAINER_AGENT_SOCKET.to_string()),
                typ: Some(MountTypeEnum::BIND),
                read_only: Some(false),
                ..Default::default()
            });
        }

        Ok(HostConfig {
            mounts: if mounts.is_empty() { None } else { Some(mounts) },
            ..Default::default()
        })
    }

    async fn create_and_start(&self, opts: &StartOptions, name: &str) -> Result<ContainerId, RuntimeError> {
        let mut env: Vec<String> = opts.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        if opts.ssh_agent_forwarding {
            env.push(format!("SSH_AUTH_SOCK={CONTAINER_AGENT_SOCKET}"));
        }

        let body = ContainerCreateBody {
            image: Some(opts.image_name.clone()),
            cmd: Some(opts.compute_command()),
            env: if env.is_empty() { None } else { Some(env) },
            labels: Some(opts.labels()),
            working_dir: if opts.working_dir.is_empty() {
                None
            } else {
                Some(opts.working_dir.clone())
            },
            tty: Some(true),
            open_stdin: Some(true),
            host_config: Some(self.host_config(opts)?),
            ..Default::default()
        };

        let create_opts = CreateContainerOptions {
            name: Some(name.to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(create_opts), body)
            .await
            .map_err(|e| map_create_error(e, &opts.image_name))?;

        self.client
            .start_container(name, None::<bollard::query_parameters::StartContainerOptions>)
            .await
            .map_err(|e| RuntimeError::Engine(e.to_string()))?;

        tracing::info!(container = %name, image = %opts.image_name, "created workspace");
        Ok(ContainerId::new(response.id))
    }

    async fn remove_existing(&self, name: &str) {
        // Best-effort cleanup before recreation; only the final create may
        // abort the start operation.
        let opts = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(e) = self.client.remove_container(name, Some(opts)).await {
            if !is_not_found(&e) {
                tracing::warn!(container = %name, "failed to remove stale container: {e}");
            }
        }
    }
}

impl Sealed for DockerRuntime {}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn build_image(&self, opts: &BuildOptions) -> Result<(), RuntimeError> {
        let context = tar_build_context(&opts.build_context)?;
        let tag = opts
            .tags
            .first()
            .cloned()
            .unwrap_or_else(|| opts.image_name.clone());

        let build_opts = BuildImageOptions {
            dockerfile: opts.dockerfile.clone(),
            t: Some(tag.clone()),
            buildargs: Some(opts.build_args.clone()),
            rm: true,
            ..Default::default()
        };

        // The pump task prints progress while this task drains the build
        // stream; both sides are joined and either failure is surfaced.
        let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(32);
        let pump = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                tracing::info!(target: "dvm::build", "{line}");
            }
        });

        let mut stream =
            self.client
                .build_image(build_opts, None, Some(bollard::body_full(context.into())));

        let mut result = Ok(());
        while let Some(item) = stream.next().await {
            match item {
                Ok(info) => {
                    if let Some(line) = info.stream {
                        let line = line.trim_end().to_string();
                        if !line.is_empty() {
                            let _ = tx.send(line).await;
                        }
                    }
                    if let Some(err) = info.error_detail.and_then(|d| d.message) {
                        result = Err(RuntimeError::Engine(format!("build failed: {err}")));
                        break;
                    }
                }
                Err(e) => {
                    result = Err(RuntimeError::Engine(format!("build failed: {e}")));
                    break;
                }
            }
        }

        drop(tx);
        pump.await
            .map_err(|e| RuntimeError::Engine(format!("build progress task failed: {e}")))?;

        result.inspect(|()| tracing::info!(image = %tag, "image built"))
    }

    async fn start_workspace(&self, opts: &StartOptions) -> Result<ContainerId, RuntimeError> {
        let name = opts.compute_container_name()?;

        let existing = match self
            .client
            .inspect_container(&name, None::<InspectContainerOptions>)
            .await
        {
            Ok(details) => Some(details),
            Err(e) if is_not_found(&e) => None,
            Err(e) => return Err(RuntimeError::Engine(e.to_string())),
        };

        let Some(details) = existing else {
            return self.create_and_start(opts, &name).await;
        };

        let recorded_image = details
            .config
            .as_ref()
            .and_then(|c| c.labels.as_ref())
            .and_then(|l| l.get(IMAGE_LABEL))
            .cloned();
        let status = details
            .state
            .as_ref()
            .and_then(|s| s.status)
            .map(|s| WorkspaceStatus::from_engine_state(&s.to_string()))
            .unwrap_or(WorkspaceStatus::Stopped);
        let id = ContainerId::new(details.id.clone().unwrap_or_else(|| name.clone()));

        match reconcile_start(recorded_image.as_deref(), &opts.image_name, status) {
            StartAction::ReuseRunning => Ok(id),
            StartAction::StartInPlace => {
                match self
                    .client
                    .start_container(&name, None::<bollard::query_parameters::StartContainerOptions>)
                    .await
                {
                    Ok(()) => Ok(id),
                    Err(e) => {
                        tracing::warn!(container = %name, "in-place start failed, recreating: {e}");
                        self.remove_existing(&name).await;
                        self.create_and_start(opts, &name).await
                    }
                }
            }
            StartAction::Recreate => {
                tracing::info!(
                    container = %name,
                    old = recorded_image.as_deref().unwrap_or("<unrecorded>"),
                    new = %opts.image_name,
                    "image changed, recreating workspace"
                );
                self.remove_existing(&name).await;
                self.create_and_start(opts, &name).await
            }
        }
    }

    async fn attach_to_workspace(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        let status = self.workspace_status(id).await?;
        if status == WorkspaceStatus::NotFound {
            return Err(RuntimeError::NotFound(id.to_string()));
        }
        if !status.is_running() {
            return Err(RuntimeError::State {
                workspace: id.to_string(),
                expected: WorkspaceStatus::Running,
                actual: status,
            });
        }

        let exec = self
            .client
            .create_exec(
                id.as_str(),
                bollard::models::ExecConfig {
                    cmd: Some(vec!["/bin/sh".to_string(), "-l".to_string()]),
                    attach_stdin: Some(true),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    tty: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| RuntimeError::Engine(e.to_string()))?;

        let started = self
            .client
            .start_exec(&exec.id, Some(StartExecOptions::default()))
            .await
            .map_err(|e| RuntimeError::Engine(e.to_string()))?;

        let StartExecResults::Attached { mut output, mut input } = started else {
            return Err(RuntimeError::Engine("exec did not attach".to_string()));
        };

        let _raw = RawModeGuard::enter()?;
        if let Some((cols, rows)) = RawModeGuard::size() {
            let _ = self
                .client
                .resize_exec(&exec.id, ResizeExecOptions { height: rows, width: cols })
                .await;
        }

        let stdin_pump = tokio::spawn(async move {
            let mut stdin = tokio::io::stdin();
            let mut buf = [0u8; 1024];
            loop {
                match stdin.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if input.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                        let _ = input.flush().await;
                    }
                }
            }
        });

        let mut stdout = tokio::io::stdout();
        while let Some(chunk) = output.next().await {
            match chunk {
                Ok(out) => {
                    stdout.write_all(&out.into_bytes()).await?;
                    stdout.flush().await?;
                }
                Err(e) => {
                    stdin_pump.abort();
                    return Err(RuntimeError::Engine(e.to_string()));
                }
            }
        }
        stdin_pump.abort();

        Ok(())
    }

    async fn stop_workspace(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        // Docker's stop already escalates: SIGTERM, bounded wait, SIGKILL.
        match self.client.stop_container(id.as_str(), Some(self.stop_options())).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) || is_not_modified(&e) => Ok(()),
            Err(e) => Err(RuntimeError::Engine(e.to_string())),
        }
    }

    async fn workspace_status(&self, id: &ContainerId) -> Result<WorkspaceStatus, RuntimeError> {
        match self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
        {
            Ok(details) => Ok(details
                .state
                .as_ref()
                .and_then(|s| s.status)
                .map(|s| WorkspaceStatus::from_engine_state(&s.to_string()))
                .unwrap_or(WorkspaceStatus::Stopped)),
            Err(e) if is_not_found(&e) => Ok(WorkspaceStatus::NotFound),
            Err(e) => Err(RuntimeError::Engine(e.to_string())),
        }
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceInfo>, RuntimeError> {
        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert("label".to_string(), vec![format!("{MANAGED_LABEL}=true")]);

        let opts = ListContainersOptions {
            all: true,
            filters: Some(filters),
            ..Default::default()
        };

        let containers = self
            .client
            .list_containers(Some(opts))
            .await
            .map_err(|e| RuntimeError::Engine(e.to_string()))?;

        Ok(containers
            .into_iter()
            .map(|c| {
                let name = c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();
                let status = c
                    .state
                    .map(|s| WorkspaceStatus::from_engine_state(&format!("{s:?}")))
                    .unwrap_or(WorkspaceStatus::Stopped);
                WorkspaceInfo::from_engine(
                    ContainerId::new(c.id.unwrap_or_default()),
                    name,
                    status,
                    c.image.unwrap_or_default(),
                    c.labels.unwrap_or_default(),
                )
            })
            .collect())
    }

    fn runtime_type(&self) -> RuntimeType {
        RuntimeType::Docker
    }

    fn platform_name(&self) -> &str {
        &self.platform.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformKind;
    use std::path::PathBuf;
    use std::time::Duration;

    // The unix client is lazy; no daemon is dialed until a request is made.
    fn runtime(stop_grace: Duration) -> DockerRuntime {
        let platform = Platform::new(
            PlatformKind::LinuxNative,
            PathBuf::from("/tmp/dvm-test-docker.sock"),
            PathBuf::from("/home/dev"),
        );
        DockerRuntime::connect(platform, stop_grace).unwrap()
    }

    #[test]
    fn stop_options_carry_configured_grace_period() {
        assert_eq!(runtime(Duration::from_secs(30)).stop_options().t, Some(30));
        assert_eq!(runtime(Duration::from_secs(10)).stop_options().t, Some(10));
    }

    #[test]
    fn oversized_grace_period_is_clamped() {
        let opts = runtime(Duration::from_secs(u64::MAX)).stop_options();
        assert_eq!(opts.t, Some(i32::MAX));
    }
}

/// Tar the build context directory into an in-memory archive.
fn tar_build_context(context: &std::path::Path) -> Result<Vec<u8>, RuntimeError> {
    let mut builder = tar::Builder::new(Vec::new());
    builder
        .append_dir_all(".", context)
        .map_err(|e| RuntimeError::Engine(format!("failed to tar build context: {e}")))?;
    builder
        .into_inner()
        .map_err(|e| RuntimeError::Engine(format!("failed to finish build context: {e}")))
}
