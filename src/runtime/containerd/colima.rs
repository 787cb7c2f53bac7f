// ABOUTME: Colima containerd runtime driven through `colima ssh -- nerdctl`.
// ABOUTME: The containerd socket lives inside the VM, so everything is exec-based.

use crate::platform::Platform;
use crate::runtime::error::RuntimeError;
use crate::runtime::options::{
    BuildOptions, ContainerId, IMAGE_LABEL, MANAGED_LABEL, StartAction, StartOptions,
    WorkspaceInfo, WorkspaceStatus, reconcile_start,
};
use crate::runtime::traits::{ContainerRuntime, RuntimeType, sealed::Sealed};
use crate::shell;
use crate::ssh_agent::CONTAINER_AGENT_SOCKET;
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs nerdctl inside the Colima VM over `colima ssh`.
///
/// Colima's containerd socket is not reachable from the host filesystem, so
/// the gRPC path is out; every operation becomes a remote nerdctl invocation.
/// Host paths still work as mount sources and build contexts because Colima
/// mounts the home directory into the VM at the same path.
pub struct ColimaRuntime {
    platform: Platform,
    profile: String,
    stop_grace: Duration,
}

impl ColimaRuntime {
    pub fn new(platform: Platform, stop_grace: Duration) -> Self {
        let profile = platform.profile.clone().unwrap_or_else(|| "default".to_string());
        Self { platform, profile, stop_grace }
    }

    /// Every nerdctl token is shell-quoted individually: `colima ssh` hands
    /// the remainder to a shell inside the VM, which would otherwise re-split
    /// arguments containing spaces or expand metacharacters.
    fn ssh_command(&self, nerdctl_args: &[String]) -> Command {
        let mut cmd = Command::new("colima");
        cmd.arg("ssh").arg("--profile").arg(&self.profile).arg("--").arg("nerdctl");
        for arg in nerdctl_args {
            cmd.arg(shell::quote(arg));
        }
        cmd
    }

    /// Run nerdctl and capture its output. Non-zero exit becomes an engine
    /// error carrying stderr.
    async fn nerdctl(&self, args: &[String]) -> Result<String, RuntimeError> {
        tracing::debug!(command = %shell::join(args), "nerdctl (colima ssh)");
        let output = self
            .ssh_command(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RuntimeError::Connection {
                platform: self.platform.name.clone(),
                message: format!("failed to run colima ssh: {e}"),
                hint: self.platform.kind.start_hint().to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RuntimeError::Engine(format!("nerdctl {}: {stderr}", args[0])));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// `nerdctl inspect` for one container, or None when it does not exist.
    async fn inspect(&self, name: &str) -> Result<Option<serde_json::Value>, RuntimeError> {
        let args = vec!["inspect".to_string(), name.to_string()];
        match self.nerdctl(&args).await {
            Ok(stdout) => {
                let parsed: Vec<serde_json::Value> = serde_json::from_str(&stdout)
                    .map_err(|e| RuntimeError::Engine(format!("invalid inspect output: {e}")))?;
                Ok(parsed.into_iter().next())
            }
            Err(RuntimeError::Engine(msg)) if is_not_found_message(&msg) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn run_args(&self, opts: &StartOptions, name: &str) -> Result<Vec<String>, RuntimeError> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            name.to_string(),
        ];
        let mut labels: Vec<(String, String)> = opts.labels().into_iter().collect();
        labels.sort();
        for (key, value) in labels {
            args.push("--label".to_string());
            args.push(format!("{key}={value}"));
        }
        for mount in &opts.mounts {
            args.push("-v".to_string());
            let source = mount.source.to_string_lossy();
            if mount.read_only {
                args.push(format!("{source}:{}:ro", mount.destination));
            } else {
                args.push(format!("{source}:{}", mount.destination));
            }
        }
        if opts.ssh_agent_forwarding {
            let agent = crate::ssh_agent::resolve_agent_socket(&self.platform)
                .map_err(|e| RuntimeError::Engine(e.to_string()))?;
            args.push("-v".to_string());
            args.push(format!("{}:{CONTAINER_AGENT_SOCKET}", agent.to_string_lossy()));
        }
        if !opts.working_dir.is_empty() {
            args.push("-w".to_string());
            args.push(opts.working_dir.clone());
        }
        let mut env: Vec<(&String, &String)> = opts.env.iter().collect();
        env.sort();
        for (key, value) in env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        if opts.ssh_agent_forwarding {
            args.push("-e".to_string());
            args.push(format!("SSH_AUTH_SOCK={CONTAINER_AGENT_SOCKET}"));
        }
        args.push(opts.image_name.clone());
        args.extend(opts.compute_command());
        Ok(args)
    }

    fn stop_args(&self, id: &ContainerId) -> Vec<String> {
        vec![
            "stop".to_string(),
            "-t".to_string(),
            self.stop_grace.as_secs().to_string(),
            id.to_string(),
        ]
    }
}

impl Sealed for ColimaRuntime {}

#[async_trait]
impl ContainerRuntime for ColimaRuntime {
    async fn build_image(&self, opts: &BuildOptions) -> Result<(), RuntimeError> {
        let mut args = vec![
            "build".to_string(),
            "-f".to_string(),
            opts.dockerfile.clone(),
        ];
        for tag in &opts.tags {
            args.push("-t".to_string());
            args.push(tag.clone());
        }
        if !opts.tags.contains(&opts.image_name) {
            args.push("-t".to_string());
            args.push(opts.image_name.clone());
        }
        let mut build_args: Vec<(&String, &String)> = opts.build_args.iter().collect();
        build_args.sort();
        for (key, value) in build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(opts.build_context.to_string_lossy().into_owned());

        // Build output goes straight to the terminal.
        let status = self
            .ssh_command(&args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| RuntimeError::Connection {
                platform: self.platform.name.clone(),
                message: format!("failed to run colima ssh: {e}"),
                hint: self.platform.kind.start_hint().to_string(),
            })?;
        if !status.success() {
            return Err(RuntimeError::Engine(format!(
                "nerdctl build failed for {}",
                opts.image_name
            )));
        }
        tracing::info!(image = %opts.image_name, "built image via nerdctl");
        Ok(())
    }

    async fn start_workspace(&self, opts: &StartOptions) -> Result<ContainerId, RuntimeError> {
        let name = opts.compute_container_name()?;

        if let Some(existing) = self.inspect(&name).await? {
            let recorded_image = existing["Config"]["Labels"][IMAGE_LABEL].as_str();
            let state = existing["State"]["Status"].as_str().unwrap_or("");
            let status = WorkspaceStatus::from_engine_state(state);

            match reconcile_start(recorded_image, &opts.image_name, status) {
                StartAction::ReuseRunning => return Ok(ContainerId::new(name)),
                StartAction::StartInPlace => {
                    let start = vec!["start".to_string(), name.clone()];
                    if self.nerdctl(&start).await.is_ok() {
                        return Ok(ContainerId::new(name));
                    }
                    tracing::warn!(container = %name, "in-place start failed, recreating");
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
            let rm = vec!["rm".to_string(), "-f".to_string(), name.clone()];
            if let Err(e) = self.nerdctl(&rm).await {
                tracing::warn!(container = %name, "failed to remove stale container: {e}");
            }
        }

        let run_args = self.run_args(opts, &name)?;
        let stdout = self.nerdctl(&run_args).await.map_err(|e| {
            match e {
                RuntimeError::Engine(msg) if is_image_missing_message(&msg) => {
                    RuntimeError::ImageNotFound {
                        name: opts.image_name.clone(),
                        hint: "build it first with `dvm build`".to_string(),
                    }
                }
                other => other,
            }
        })?;
        tracing::info!(container = %name, id = stdout.trim(), "created workspace");
        Ok(ContainerId::new(name))
    }

    async fn attach_to_workspace(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        match self.workspace_status(id).await? {
            WorkspaceStatus::NotFound => return Err(RuntimeError::NotFound(id.to_string())),
            status if !status.is_running() => {
                return Err(RuntimeError::State {
                    workspace: id.to_string(),
                    expected: WorkspaceStatus::Running,
                    actual: status,
                });
            }
            _ => {}
        }

        // Interactive session: ssh owns the terminal end to end, so stdio is
        // inherited rather than pumped.
        let args = vec![
            "exec".to_string(),
            "-it".to_string(),
            id.to_string(),
            "/bin/sh".to_string(),
            "-l".to_string(),
        ];
        // `colima ssh` allocates a tty when attached to one, so stdio passes
        // through untouched.
        let status = self
            .ssh_command(&args)
            .status()
            .await
            .map_err(|e| RuntimeError::Connection {
                platform: self.platform.name.clone(),
                message: format!("failed to run colima ssh: {e}"),
                hint: self.platform.kind.start_hint().to_string(),
            })?;
        if !status.success() {
            tracing::debug!(container = %id, code = status.code(), "attach session ended non-zero");
        }
        Ok(())
    }

    async fn stop_workspace(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        let args = self.stop_args(id);
        match self.nerdctl(&args).await {
            Ok(_) => Ok(()),
            Err(RuntimeError::Engine(msg)) if is_not_found_message(&msg) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn workspace_status(&self, id: &ContainerId) -> Result<WorkspaceStatus, RuntimeError> {
        match self.inspect(id.as_str()).await? {
            Some(value) => {
                let state = value["State"]["Status"].as_str().unwrap_or("");
                Ok(WorkspaceStatus::from_engine_state(state))
            }
            None => Ok(WorkspaceStatus::NotFound),
        }
    }

    async fn list_workspaces(&self) -> Result<Vec<WorkspaceInfo>, RuntimeError> {
        let args = vec![
            "ps".to_string(),
            "-a".to_string(),
            "--filter".to_string(),
            format!("label={MANAGED_LABEL}=true"),
            "--format".to_string(),
            "json".to_string(),
        ];
        let stdout = self.nerdctl(&args).await?;

        // nerdctl emits one JSON object per line.
        let mut infos = Vec::new();
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            let row: serde_json::Value = serde_json::from_str(line)
                .map_err(|e| RuntimeError::Engine(format!("invalid ps output: {e}")))?;
            let name = row["Names"].as_str().unwrap_or_default().to_string();
            let labels = parse_label_string(row["Labels"].as_str().unwrap_or_default());
            // ps reports a human string ("Up 5 minutes", "Exited (0) ...");
            // only the leading word names the state.
            let state = row["Status"]
                .as_str()
                .unwrap_or_default()
                .split_whitespace()
                .next()
                .unwrap_or_default();
            infos.push(WorkspaceInfo::from_engine(
                ContainerId::new(name.clone()),
                name,
                WorkspaceStatus::from_engine_state(state),
                row["Image"].as_str().unwrap_or_default().to_string(),
                labels,
            ));
        }
        Ok(infos)
    }

    fn runtime_type(&self) -> RuntimeType {
        RuntimeType::ContainerdSsh
    }

    fn platform_name(&self) -> &str {
        &self.platform.name
    }
}

fn is_not_found_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("no such container") || lower.contains("not found")
}

fn is_image_missing_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("no such image") || lower.contains("failed to resolve")
}

/// nerdctl ps reports labels as a single `k=v,k=v` string.
fn parse_label_string(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mounts::Mount;
    use crate::platform::{Platform, PlatformKind};
    use std::path::PathBuf;

    fn colima_runtime() -> ColimaRuntime {
        colima_runtime_with_grace(Duration::from_secs(10))
    }

    fn colima_runtime_with_grace(stop_grace: Duration) -> ColimaRuntime {
        let platform = Platform::new(
            PlatformKind::Colima,
            PathBuf::from("/home/dev/.colima/default/containerd.sock"),
            PathBuf::from("/home/dev"),
        )
        .with_profile("default");
        ColimaRuntime::new(platform, stop_grace)
    }

    #[test]
    fn run_args_carry_labels_mounts_and_keepalive() {
        let rt = colima_runtime();
        let opts = StartOptions {
            image_name: "dvm/api:1".to_string(),
            workspace_name: "main".to_string(),
            app_name: Some("api".to_string()),
            working_dir: "/workspace".to_string(),
            mounts: vec![Mount::bind(PathBuf::from("/home/dev/repo"), "/workspace", false)],
            ..Default::default()
        };
        let args = rt.run_args(&opts, "dvm-api-main").unwrap();
        let joined = args.join(" ");
        assert!(joined.starts_with("run -d --name dvm-api-main"));
        assert!(joined.contains(&format!("--label {MANAGED_LABEL}=true")));
        assert!(joined.contains("-v /home/dev/repo:/workspace"));
        assert!(joined.contains("-w /workspace"));
        assert!(joined.ends_with("dvm/api:1 /bin/sleep infinity"));
    }

    #[test]
    fn run_args_mark_read_only_mounts() {
        let rt = colima_runtime();
        let opts = StartOptions {
            image_name: "img".to_string(),
            workspace_name: "main".to_string(),
            mounts: vec![Mount::bind(PathBuf::from("/home/dev/cfg"), "/etc/cfg", true)],
            ..Default::default()
        };
        let args = rt.run_args(&opts, "dvm-main-main").unwrap();
        assert!(args.contains(&"/home/dev/cfg:/etc/cfg:ro".to_string()));
    }

    #[test]
    fn stop_args_carry_configured_grace_period() {
        let rt = colima_runtime_with_grace(Duration::from_secs(25));
        let id = ContainerId::new("dvm-api-main");
        assert_eq!(rt.stop_args(&id), vec!["stop", "-t", "25", "dvm-api-main"]);
    }

    #[test]
    fn label_string_parses_pairs() {
        let labels = parse_label_string("io.devopsmaestro.managed=true,io.devopsmaestro.workspace=main");
        assert_eq!(labels.get(MANAGED_LABEL).map(String::as_str), Some("true"));
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn not_found_messages_are_recognized() {
        assert!(is_not_found_message("nerdctl inspect: No such container: dvm-api-main"));
        assert!(!is_not_found_message("permission denied"));
    }

    #[test]
    fn image_missing_messages_are_recognized() {
        assert!(is_image_missing_message(
            "nerdctl run: failed to resolve reference \"docker.io/library/dvm/api:1\""
        ));
        assert!(!is_image_missing_message("exit status 125"));
    }
}
