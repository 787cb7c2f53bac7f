// ABOUTME: Direct containerd gRPC runtime, used when the client process and
// ABOUTME: the daemon share a filesystem namespace (native Linux containerd).

use crate::platform::Platform;
use crate::runtime::containerd::oci::SpecBuilder;
use crate::runtime::error::RuntimeError;
use crate::runtime::options::{
    BuildOptions, ContainerId, IMAGE_LABEL, MANAGED_LABEL, StartAction, StartOptions,
    WorkspaceInfo, WorkspaceStatus, reconcile_start,
};
use crate::runtime::traits::{ContainerRuntime, RuntimeType, sealed::Sealed};
use crate::term::RawModeGuard;
use async_trait::async_trait;
use containerd_client::services::v1::snapshots::{
    PrepareSnapshotRequest, RemoveSnapshotRequest, snapshots_client::SnapshotsClient,
};
use containerd_client::services::v1::{
    Container, CreateContainerRequest, CreateTaskRequest, DeleteContainerRequest,
    DeleteProcessRequest, DeleteTaskRequest, ExecProcessRequest, GetContainerRequest, GetImageRequest,
    GetRequest, KillRequest, ListContainersRequest, ReadContentRequest, StartRequest, WaitRequest,
    container, containers_client::ContainersClient, content_client::ContentClient,
    images_client::ImagesClient, tasks_client::TasksClient,
};
use containerd_client::tonic::transport::Channel;
use containerd_client::tonic::{Code, Request, Status};
use containerd_client::with_namespace;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::pipe;

/// Namespace all DVM workspaces live in.
const NAMESPACE: &str = "default";
const SNAPSHOTTER: &str = "overlayfs";
const RUNC_V2: &str = "io.containerd.runc.v2";
const SPEC_TYPE_URL: &str = "types.containerd.io/opencontainers/runtime-spec/1/Spec";
const PROCESS_TYPE_URL: &str = "types.containerd.io/opencontainers/runtime-spec/1/Process";

const SIGTERM: u32 = 15;
const SIGKILL: u32 = 9;

fn not_found(status: &Status) -> bool {
    status.code() == Code::NotFound
}

fn engine(status: Status) -> RuntimeError {
    RuntimeError::Engine(format!("containerd: {}", status.message()))
}

/// Lifecycle contract over the containerd gRPC API.
///
/// Containers are assembled from first principles: image chain ID, snapshot,
/// manually built OCI spec, task. There is no build verb here; raw containerd
/// cannot build images.
pub struct ContainerdRuntime {
    channel: Channel,
    platform: Platform,
    stop_grace: Duration,
}

impl ContainerdRuntime {
    pub async fn connect(platform: Platform, stop_grace: Duration) -> Result<Self, RuntimeError> {
        let channel = containerd_client::connect(&platform.socket_path)
            .await
            .map_err(|e| RuntimeError::Connection {
                platform: platform.name.clone(),
                message: e.to_string(),
                hint: platform.kind.start_hint().to_string(),
            })?;
        Ok(Self { channel, platform, stop_grace })
    }

    fn containers(&self) -> ContainersClient<Channel> {
        ContainersClient::new(self.channel.clone())
    }

    fn tasks(&self) -> TasksClient<Channel> {
        TasksClient::new(self.channel.clone())
    }

    fn images(&self) -> ImagesClient<Channel> {
        ImagesClient::new(self.channel.clone())
    }

    fn content(&self) -> ContentClient<Channel> {
        ContentClient::new(self.channel.clone())
    }

    fn snapshots(&self) -> SnapshotsClient<Channel> {
        SnapshotsClient::new(self.channel.clone())
    }

    async fn get_container(&self, id: &str) -> Result<Option<Container>, RuntimeError> {
        let req = GetContainerRequest { id: id.to_string() };
        match self.containers().get(with_namespace!(req, NAMESPACE)).await {
            Ok(resp) => Ok(resp.into_inner().container),
            Err(status) if not_found(&status) => Ok(None),
            Err(status) => Err(engine(status)),
        }
    }

    async fn task_status(&self, id: &str) -> Result<Option<WorkspaceStatus>, RuntimeError> {
        let req = GetRequest {
            container_id: id.to_string(),
            exec_id: String::new(),
        };
        match self.tasks().get(with_namespace!(req, NAMESPACE)).await {
            Ok(resp) => {
                use containerd_client::types::v1::Status as TaskStatus;
                let status = resp
                    .into_inner()
                    .process
                    .map(|p| match TaskStatus::try_from(p.status) {
                        Ok(TaskStatus::Created) => WorkspaceStatus::Created,
                        Ok(TaskStatus::Running) => WorkspaceStatus::Running,
                        Ok(TaskStatus::Paused) | Ok(TaskStatus::Pausing) => WorkspaceStatus::Paused,
                        Ok(TaskStatus::Stopped) => WorkspaceStatus::Stopped,
                        _ => WorkspaceStatus::Stopped,
                    })
                    .unwrap_or(WorkspaceStatus::Stopped);
                Ok(Some(status))
            }
            Err(status) if not_found(&status) => Ok(None),
            Err(status) => Err(engine(status)),
        }
    }

    /// Read one blob from the content store.
    async fn read_blob(&self, digest: &str) -> Result<Vec<u8>, RuntimeError> {
        let req = ReadContentRequest {
            digest: digest.to_string(),
            offset: 0,
            size: 0,
        };
        let mut stream = self
            .content()
            .read(with_namespace!(req, NAMESPACE))
            .await
            .map_err(engine)?
            .into_inner();

        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend(chunk.map_err(engine)?.data);
        }
        Ok(data)
    }

    /// Resolve the snapshot parent (layer chain ID) for an image.
    ///
    /// Walks image target -> (index ->) manifest -> config -> diff_ids, then
    /// folds the diff IDs into the OCI chain ID the snapshotter keyed the
    /// unpacked layers under.
    async fn image_chain_id(&self, image_name: &str) -> Result<String, RuntimeError> {
        let req = GetImageRequest {
            name: image_name.to_string(),
        };
        let image = match self.images().get(with_namespace!(req, NAMESPACE)).await {
            Ok(resp) => resp.into_inner().image,
            Err(status) if not_found(&status) => None,
            Err(status) => return Err(engine(status)),
        };
        let target = image.and_then(|i| i.target).ok_or_else(|| RuntimeError::ImageNotFound {
            name: image_name.to_string(),
            hint: "build it first with `dvm build`".to_string(),
        })?;

        let mut manifest: serde_json::Value = serde_json::from_slice(&self.read_blob(&target.digest).await?)
            .map_err(|e| RuntimeError::Engine(format!("invalid image manifest: {e}")))?;

        // A multi-arch image points at an index; descend into the manifest
        // matching this host.
        if let Some(manifests) = manifest.get("manifests").and_then(|m| m.as_array()) {
            let arch = oci_arch();
            let entry = manifests
                .iter()
                .find(|m| {
                    m["platform"]["os"] == "linux"
                        && (m["platform"]["architecture"] == arch || manifests.len() == 1)
                })
                .or_else(|| manifests.first())
                .ok_or_else(|| RuntimeError::Engine("empty image index".to_string()))?;
            let digest = entry["digest"]
                .as_str()
                .ok_or_else(|| RuntimeError::Engine("image index entry has no digest".to_string()))?;
            manifest = serde_json::from_slice(&self.read_blob(digest).await?)
                .map_err(|e| RuntimeError::Engine(format!("invalid image manifest: {e}")))?;
        }

        let config_digest = manifest["config"]["digest"]
            .as_str()
            .ok_or_else(|| RuntimeError::Engine("image manifest has no config".to_string()))?;
        let config: serde_json::Value = serde_json::from_slice(&self.read_blob(config_digest).await?)
            .map_err(|e| RuntimeError::Engine(format!("invalid image config: {e}")))?;

        let diff_ids: Vec<&str> = config["rootfs"]["diff_ids"]
            .as_array()
            .map(|a| a.iter().filter_map(|d| d.as_str()).collect())
            .unwrap_or_default();
        if diff_ids.is_empty() {
            return Err(RuntimeError::Engine("image config has no layers".to_string()));
        }

        Ok(chain_id(&diff_ids))
    }

    /// Forcibly tear down any existing task, container and snapshot under
    /// this name. Failures here are logged, not fatal; only the subsequent
    /// create decides the outcome.
    async fn teardown(&self, id: &str) {
        let kill = KillRequest {
            container_id: id.to_string(),
            exec_id: String::new(),
            signal: SIGKILL,
            all: true,
        };
        if let Err(status) = self.tasks().kill(with_namespace!(kill, NAMESPACE)).await {
            if !not_found(&status) {
                tracing::warn!(container = id, "failed to kill stale task: {}", status.message());
            }
        }

        let delete_task = DeleteTaskRequest {
            container_id: id.to_string(),
        };
        if let Err(status) = self.tasks().delete(with_namespace!(delete_task, NAMESPACE)).await {
            if !not_found(&status) {
                tracing::warn!(container = id, "failed to delete stale task: {}", status.message());
            }
        }

        let delete_container = DeleteContainerRequest { id: id.to_string() };
        if let Err(status) = self
            .containers()
            .delete(with_namespace!(delete_container, NAMESPACE))
            .await
        {
            if !not_found(&status) {
                tracing::warn!(container = id, "failed to delete stale container: {}", status.message());
            }
        }

        let remove_snapshot = RemoveSnapshotRequest {
            snapshotter: SNAPSHOTTER.to_string(),
            key: id.to_string(),
        };
        if let Err(status) = self
            .snapshots()
            .remove(with_namespace!(remove_snapshot, NAMESPACE))
            .await
        {
            if !not_found(&status) {
                tracing::warn!(container = id, "failed to remove stale snapshot: {}", status.message());
            }
        }
    }

    async fn create_and_start(&self, opts: &StartOptions, name: &str) -> Result<ContainerId, RuntimeError> {
        let parent = self.image_chain_id(&opts.image_name).await?;

        let prepare = PrepareSnapshotRequest {
            snapshotter: SNAPSHOTTER.to_string(),
            key: name.to_string(),
            parent,
            labels: HashMap::new(),
        };
        let rootfs = self
            .snapshots()
            .prepare(with_namespace!(prepare, NAMESPACE))
            .await
            .map_err(engine)?
            .into_inner()
            .mounts;

        let mut binds = opts.mounts.clone();
        let mut env = opts.env.clone();
        if opts.ssh_agent_forwarding {
            let agent = crate::ssh_agent::resolve_agent_socket(&self.platform)
                .map_err(|e| RuntimeError::Engine(e.to_string()))?;
            binds.push(crate::mounts::Mount::bind(
                agent,
                crate::ssh_agent::CONTAINER_AGENT_SOCKET,
                false,
            ));
            env.insert(
                "SSH_AUTH_SOCK".to_string(),
                crate::ssh_agent::CONTAINER_AGENT_SOCKET.to_string(),
            );
        }

        let spec = SpecBuilder::new(name)
            .args(opts.compute_command())
            .env(env)
            .cwd(&opts.working_dir)
            .binds(binds)
            .build();
        let spec_any = prost_types::Any {
            type_url: SPEC_TYPE_URL.to_string(),
            value: serde_json::to_vec(&spec)
                .map_err(|e| RuntimeError::Engine(format!("failed to encode OCI spec: {e}")))?,
        };

        let create = CreateContainerRequest {
            container: Some(Container {
                id: name.to_string(),
                image: opts.image_name.clone(),
                runtime: Some(container::Runtime {
                    name: RUNC_V2.to_string(),
                    options: None,
                }),
                spec: Some(spec_any),
                snapshotter: SNAPSHOTTER.to_string(),
                snapshot_key: name.to_string(),
                labels: opts.labels(),
                ..Default::default()
            }),
        };
        self.containers()
            .create(with_namespace!(create, NAMESPACE))
            .await
            .map_err(engine)?;

        let create_task = CreateTaskRequest {
            container_id: name.to_string(),
            rootfs,
            stdin: "/dev/null".to_string(),
            stdout: "/dev/null".to_string(),
            stderr: "/dev/null".to_string(),
            terminal: false,
            ..Default::default()
        };
        self.tasks()
            .create(with_namespace!(create_task, NAMESPACE))
            .await
            .map_err(engine)?;

        let start = StartRequest {
            container_id: name.to_string(),
            exec_id: String::new(),
        };
        self.tasks()
            .start(with_namespace!(start, NAMESPACE))
            .await
            .map_err(engine)?;

        tracing::info!(container = %name, image = %opts.image_name, "created workspace");
        Ok(ContainerId::new(name))
    }
}

impl Sealed for ContainerdRuntime {}

#[async_trait]
impl ContainerRuntime for ContainerdRuntime {
    async fn build_image(&self, _opts: &BuildOptions) -> Result<(), RuntimeError> {
        // Raw containerd has no build verb; this is deterministic, not
        // transient.
        Err(RuntimeError::Unsupported {
            operation: "build_image",
            runtime: "containerd",
            hint: "use the image builder (`dvm build` on a Docker-API platform)".to_string(),
        })
    }

    async fn start_workspace(&self, opts: &StartOptions) -> Result<ContainerId, RuntimeError> {
        let name = opts.compute_container_name()?;

        if let Some(existing) = self.get_container(&name).await? {
            let recorded_image = existing.labels.get(IMAGE_LABEL).map(String::as_str);
            // A container with no task never ran; treat it as freshly created.
            let status = self
                .task_status(&name)
                .await?
                .unwrap_or(WorkspaceStatus::Created);

            match reconcile_start(recorded_image, &opts.image_name, status) {
                StartAction::ReuseRunning => return Ok(ContainerId::new(name)),
                StartAction::StartInPlace => {
                    // Right image, not running: try restarting the task in
                    // place before tearing the whole container down.
                    let start = StartRequest {
                        container_id: name.clone(),
                        exec_id: String::new(),
                    };
                    if self.tasks().start(with_namespace!(start, NAMESPACE)).await.is_ok() {
                        return Ok(ContainerId::new(name));
                    }
                }
                StartAction::Recreate => {
                    tracing::info!(
                        container = %name,
                        old = recorded_image.unwrap_or("<unrecorded>"),
                        new = %opts.image_name,
                        "image changed, recreating workspace"
                    );
                }
            }
            self.teardown(&name).await;
        }

        self.create_and_start(opts, &name).await
    }

    async fn attach_to_workspace(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        if self.get_container(id.as_str()).await?.is_none() {
            return Err(RuntimeError::NotFound(id.to_string()));
        }
        let status = self
            .task_status(id.as_str())
            .await?
            .unwrap_or(WorkspaceStatus::Created);
        if !status.is_running() {
            return Err(RuntimeError::State {
                workspace: id.to_string(),
                expected: WorkspaceStatus::Running,
                actual: status,
            });
        }

        let exec_id = format!("dvm-attach-{}", std::process::id());
        let fifos = FifoPair::create(&exec_id)?;

        let process = SpecBuilder::new(id.as_str())
            .args(vec!["/bin/sh".to_string(), "-l".to_string()])
            .cwd("/workspace")
            .terminal(true)
            .build_process();
        let process_any = prost_types::Any {
            type_url: PROCESS_TYPE_URL.to_string(),
            value: serde_json::to_vec(&process)
                .map_err(|e| RuntimeError::Engine(format!("failed to encode process spec: {e}")))?,
        };

        let exec = ExecProcessRequest {
            container_id: id.to_string(),
            exec_id: exec_id.clone(),
            terminal: true,
            stdin: fifos.stdin.to_string_lossy().into_owned(),
            stdout: fifos.stdout.to_string_lossy().into_owned(),
            stderr: String::new(),
            spec: Some(process_any),
        };
        self.tasks().exec(with_namespace!(exec, NAMESPACE)).await.map_err(engine)?;

        let start = StartRequest {
            container_id: id.to_string(),
            exec_id: exec_id.clone(),
        };
        self.tasks().start(with_namespace!(start, NAMESPACE)).await.map_err(engine)?;

        let result = self.pump_exec_stdio(id, &exec_id, &fifos).await;

        let delete = DeleteProcessRequest {
            container_id: id.to_string(),
            exec_id: exec_id.clone(),
        };
        if let Err(status) = self.tasks().delete_process(with_namespace!(delete, NAMESPACE)).await {
            if !not_found(&status) {
                tracing::debug!("failed to delete exec process: {}", status.message());
            }
        }
        fifos.cleanup();

        result
    }

    async fn stop_workspace(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        let kill = KillRequest {
            container_id: id.to_string(),
            exec_id: String::new(),
            signal: SIGTERM,
            all: false,
        };
        match self.tasks().kill(with_namespace!(kill, NAMESPACE)).await {
            Ok(_) => {}
            Err(status) if not_found(&status) => return Ok(()),
            Err(status) => return Err(engine(status)),
        }

        let wait = WaitRequest {
            container_id: id.to_string(),
            exec_id: String::new(),
        };
        let mut tasks = self.tasks();
        let waited =
            tokio::time::timeout(self.stop_grace, tasks.wait(with_namespace!(wait, NAMESPACE))).await;

        if waited.is_err() {
            tracing::warn!(container = %id, "graceful stop timed out, killing");
            let kill = KillRequest {
                container_id: id.to_string(),
                exec_id: String::new(),
                signal: SIGKILL,
                all: true,
            };
            if let Err(status) = self.tasks().kill(with_namespace!(kill, NAMESPACE)).await {
                if !not_found(&status) {
                    return Err(engine(status));
                }
            }
        }

        let delete = DeleteTaskRequest {
            container_id: id.to_string(),
        };
        if let Err(status) = self.tasks().delete(with_namespace!(delete, NAMESPACE)).await {
            if !not_found(&status) {
                return Err(engine(status));
            }
        }
        Ok(())
    }

    async fn workspace_status(&self, id: &ContainerId) -> Result<WorkspaceStatus, RuntimeError> {
        if self.get_container(id.as_str()).await?.is_none() {
            return Ok(WorkspaceStatus::NotFound);
        }
        // A container with no task was created but never started.
        Ok(self
            .task_status(id.as_str())
            .await?
            .unwrap_or(WorkspaceStatus::Created))
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceInfo>, RuntimeError> {
        let req = ListContainersRequest {
            filters: vec![format!("labels.\"{MANAGED_LABEL}\"==true")],
        };
        let containers = self
            .containers()
            .list(with_namespace!(req, NAMESPACE))
            .await
            .map_err(engine)?
            .into_inner()
            .containers;

        let mut infos = Vec::with_capacity(containers.len());
        for c in containers {
            let status = self
                .task_status(&c.id)
                .await?
                .unwrap_or(WorkspaceStatus::Created);
            infos.push(WorkspaceInfo::from_engine(
                ContainerId::new(c.id.clone()),
                c.id,
                status,
                c.image,
                c.labels,
            ));
        }
        Ok(infos)
    }

    fn runtime_type(&self) -> RuntimeType {
        RuntimeType::Containerd
    }

    fn platform_name(&self) -> &str {
        &self.platform.name
    }
}

impl ContainerdRuntime {
    /// Stream the exec process's FIFO stdio to the calling terminal, in raw
    /// mode, until the remote shell exits.
    async fn pump_exec_stdio(
        &self,
        id: &ContainerId,
        exec_id: &str,
        fifos: &FifoPair,
    ) -> Result<(), RuntimeError> {
        let output = fifos.open_reader()?;
        let input = fifos.open_writer().await?;

        let _raw = RawModeGuard::enter()?;

        let stdin_pump = tokio::spawn(async move {
            let mut input = input;
            let mut stdin = tokio::io::stdin();
            let mut buf = [0u8; 1024];
            loop {
                match stdin.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if input.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let output_pump = tokio::spawn(async move {
            let mut output = output;
            let mut stdout = tokio::io::stdout();
            let mut buf = [0u8; 4096];
            loop {
                match output.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if stdout.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                        let _ = stdout.flush().await;
                    }
                }
            }
        });

        let wait = WaitRequest {
            container_id: id.to_string(),
            exec_id: exec_id.to_string(),
        };
        let waited = self.tasks().wait(with_namespace!(wait, NAMESPACE)).await;

        stdin_pump.abort();
        let _ = output_pump.await;

        waited.map(|_| ()).map_err(engine)
    }
}

/// The gRPC task API does stdio through named pipes on the daemon's
/// filesystem; that is exactly why this runtime only works when daemon and
/// client share one.
struct FifoPair {
    dir: PathBuf,
    stdin: PathBuf,
    stdout: PathBuf,
}

impl FifoPair {
    fn create(exec_id: &str) -> Result<Self, RuntimeError> {
        let dir = std::env::temp_dir().join(format!("dvm-fifo-{exec_id}"));
        std::fs::create_dir_all(&dir)?;
        let stdin = dir.join("stdin");
        let stdout = dir.join("stdout");
        mkfifo(&stdin)?;
        mkfifo(&stdout)?;
        Ok(Self { dir, stdin, stdout })
    }

    fn open_reader(&self) -> Result<pipe::Receiver, RuntimeError> {
        pipe::OpenOptions::new()
            .read_write(true)
            .open_receiver(&self.stdout)
            .map_err(RuntimeError::Io)
    }

    async fn open_writer(&self) -> Result<pipe::Sender, RuntimeError> {
        // The shim opens the read end when the exec starts; retry briefly
        // until it does.
        for _ in 0..50 {
            match pipe::OpenOptions::new().open_sender(&self.stdin) {
                Ok(sender) => return Ok(sender),
                Err(e) if e.raw_os_error() == Some(libc::ENXIO) => {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                Err(e) => return Err(RuntimeError::Io(e)),
            }
        }
        Err(RuntimeError::Engine("timed out opening exec stdin pipe".to_string()))
    }

    fn cleanup(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            tracing::debug!("failed to remove fifo dir: {e}");
        }
    }
}

fn mkfifo(path: &std::path::Path) -> Result<(), RuntimeError> {
    use std::os::unix::ffi::OsStrExt;
    let cstr = std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|_| RuntimeError::Engine("fifo path contains a NUL byte".to_string()))?;
    // SAFETY: cstr is a valid NUL-terminated path for the duration of the call.
    let rc = unsafe { libc::mkfifo(cstr.as_ptr(), 0o600) };
    if rc != 0 {
        return Err(RuntimeError::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Fold OCI layer diff IDs into the chain ID naming the unpacked snapshot.
fn chain_id(diff_ids: &[&str]) -> String {
    let mut chain = diff_ids[0].to_string();
    for diff in &diff_ids[1..] {
        let digest = Sha256::digest(format!("{chain} {diff}").as_bytes());
        chain = format!("sha256:{digest:x}");
    }
    chain
}

fn oci_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_of_single_layer_is_the_diff_id() {
        let diff = "sha256:0000000000000000000000000000000000000000000000000000000000000001";
        assert_eq!(chain_id(&[diff]), diff);
    }

    #[test]
    fn chain_id_folds_layers_in_order() {
        let a = "sha256:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let b = "sha256:bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
        let expected = format!("sha256:{:x}", Sha256::digest(format!("{a} {b}").as_bytes()));
        assert_eq!(chain_id(&[a, b]), expected);
        // Order matters.
        assert_ne!(chain_id(&[a, b]), chain_id(&[b, a]));
    }

    #[test]
    fn oci_arch_maps_host_arch() {
        assert!(!oci_arch().is_empty());
    }
}
