// ABOUTME: Shared option and state types for the ContainerRuntime contract.
// ABOUTME: StartOptions, BuildOptions, WorkspaceInfo, WorkspaceStatus, labels.

use crate::mounts::Mount;
use crate::naming::{self, NameError, parse_name};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Label marking a container as created and owned by DVM. Listing and bulk
/// operations only ever touch containers carrying this label.
pub const MANAGED_LABEL: &str = "io.devopsmaestro.managed";
pub const APP_LABEL: &str = "io.devopsmaestro.app";
pub const WORKSPACE_LABEL: &str = "io.devopsmaestro.workspace";

/// Records the image a workspace was created from. This label, not the
/// engine's image field, is the signal for detecting an image change on
/// restart: containers created by earlier versions lack it and are treated
/// as stale.
pub const IMAGE_LABEL: &str = "io.devopsmaestro.image";

/// Keep-alive command used when the caller supplies none, so the container
/// does not exit before the first attach.
pub const KEEPALIVE_COMMAND: [&str; 2] = ["/bin/sleep", "infinity"];

/// Identifier of a workspace container as known to the engine.
#[must_use = "container ids reference live resources"]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input to `start_workspace`.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub image_name: String,
    pub workspace_name: String,
    /// Explicit container name; when unset, derived from the hierarchy.
    pub container_name: Option<String>,
    pub ecosystem_name: Option<String>,
    pub domain_name: Option<String>,
    pub app_name: Option<String>,
    /// Host path of the application checkout.
    pub app_path: PathBuf,
    /// Working directory inside the container.
    pub working_dir: String,
    /// Main process; empty means the keep-alive sentinel.
    pub command: Vec<String>,
    pub env: HashMap<String, String>,
    /// Opt-in SSH agent forwarding (defaults to off).
    pub ssh_agent_forwarding: bool,
    pub mounts: Vec<Mount>,
}

impl StartOptions {
    /// The container name this workspace runs under.
    ///
    /// An explicit `container_name` wins; otherwise the hierarchical name is
    /// derived, with the workspace name standing in for a missing app name.
    pub fn compute_container_name(&self) -> Result<String, NameError> {
        if let Some(name) = &self.container_name {
            return Ok(name.clone());
        }
        let app = self
            .app_name
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(&self.workspace_name);
        naming::generate_name(
            self.ecosystem_name.as_deref(),
            self.domain_name.as_deref(),
            app,
            &self.workspace_name,
        )
    }

    /// The command the container runs: the caller's, or the keep-alive.
    pub fn compute_command(&self) -> Vec<String> {
        if self.command.is_empty() {
            KEEPALIVE_COMMAND.iter().map(|s| s.to_string()).collect()
        } else {
            self.command.clone()
        }
    }

    /// Management labels applied to the created container.
    pub fn labels(&self) -> HashMap<String, String> {
        let mut labels = HashMap::new();
        labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
        labels.insert(WORKSPACE_LABEL.to_string(), self.workspace_name.clone());
        labels.insert(IMAGE_LABEL.to_string(), self.image_name.clone());
        if let Some(app) = &self.app_name {
            labels.insert(APP_LABEL.to_string(), app.clone());
        }
        labels
    }
}

/// Input to `build_image`. Defined alongside the runtime contract because
/// some backends reject building outright; the heavy lifting lives in the
/// image-builder subsystem.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub app_path: PathBuf,
    pub app_name: String,
    pub image_name: String,
    /// Dockerfile path relative to the build context.
    pub dockerfile: String,
    pub build_context: PathBuf,
    pub tags: Vec<String>,
    pub build_args: HashMap<String, String>,
}

/// Observed lifecycle state of a workspace container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Stopped,
    Dead,
    NotFound,
}

impl WorkspaceStatus {
    /// Map an engine-reported state string onto the workspace status set.
    pub fn from_engine_state(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "created" => WorkspaceStatus::Created,
            "running" | "up" => WorkspaceStatus::Running,
            "paused" | "pausing" => WorkspaceStatus::Paused,
            "restarting" => WorkspaceStatus::Restarting,
            "exited" | "stopped" | "stopping" | "removing" => WorkspaceStatus::Stopped,
            "dead" => WorkspaceStatus::Dead,
            _ => WorkspaceStatus::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        *self == WorkspaceStatus::Running
    }
}

impl std::fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkspaceStatus::Created => "created",
            WorkspaceStatus::Running => "running",
            WorkspaceStatus::Paused => "paused",
            WorkspaceStatus::Restarting => "restarting",
            WorkspaceStatus::Stopped => "stopped",
            WorkspaceStatus::Dead => "dead",
            WorkspaceStatus::NotFound => "not_found",
        };
        write!(f, "{s}")
    }
}

/// What `start_workspace` should do with an existing container, decided
/// from engine observations alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAction {
    /// Same image, already running: hand back the existing id.
    ReuseRunning,
    /// Same image, not running: start the existing container, falling back
    /// to recreation if the engine refuses.
    StartInPlace,
    /// Different or unrecorded image: remove and recreate under the name.
    Recreate,
}

/// Reconcile an existing container against a start request.
///
/// The recorded image is the `io.devopsmaestro.image` label, not the
/// engine's image field; a container without the label predates the label
/// scheme and is treated as stale. All three backends route their
/// existing-container branch through this one decision.
pub fn reconcile_start(
    recorded_image: Option<&str>,
    requested_image: &str,
    status: WorkspaceStatus,
) -> StartAction {
    if recorded_image != Some(requested_image) {
        return StartAction::Recreate;
    }
    if status.is_running() {
        StartAction::ReuseRunning
    } else {
        StartAction::StartInPlace
    }
}

/// Runtime-observed description of one managed workspace. Produced by
/// querying the live engine and never cached beyond a single call.
#[derive(Debug, Clone)]
pub struct WorkspaceInfo {
    pub id: ContainerId,
    pub name: String,
    pub status: WorkspaceStatus,
    pub image: String,
    pub ecosystem: Option<String>,
    pub domain: Option<String>,
    pub app: Option<String>,
    pub workspace: Option<String>,
    pub raw_labels: HashMap<String, String>,
}

impl WorkspaceInfo {
    /// Assemble a `WorkspaceInfo` from engine data, filling the hierarchy
    /// from labels first and the parsed container name second.
    pub fn from_engine(
        id: ContainerId,
        name: String,
        status: WorkspaceStatus,
        image: String,
        raw_labels: HashMap<String, String>,
    ) -> Self {
        let parsed = parse_name(&name).ok();
        let app = raw_labels
            .get(APP_LABEL)
            .cloned()
            .or_else(|| parsed.as_ref().map(|p| p.app.clone()));
        let workspace = raw_labels
            .get(WORKSPACE_LABEL)
            .cloned()
            .or_else(|| parsed.as_ref().map(|p| p.workspace.clone()));
        Self {
            id,
            name,
            status,
            image,
            ecosystem: parsed.as_ref().and_then(|p| p.ecosystem.clone()),
            domain: parsed.as_ref().and_then(|p| p.domain.clone()),
            app,
            workspace,
            raw_labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_agent_forwarding_defaults_off() {
        assert!(!StartOptions::default().ssh_agent_forwarding);
    }

    #[test]
    fn empty_command_becomes_keepalive() {
        let opts = StartOptions::default();
        assert_eq!(opts.compute_command(), vec!["/bin/sleep", "infinity"]);
    }

    #[test]
    fn explicit_command_is_unchanged() {
        let opts = StartOptions {
            command: vec!["zsh".to_string(), "-l".to_string()],
            ..Default::default()
        };
        assert_eq!(opts.compute_command(), vec!["zsh", "-l"]);
    }

    #[test]
    fn explicit_container_name_wins() {
        let opts = StartOptions {
            container_name: Some("custom".to_string()),
            workspace_name: "main".to_string(),
            ..Default::default()
        };
        assert_eq!(opts.compute_container_name().unwrap(), "custom");
    }

    #[test]
    fn derived_name_uses_hierarchy() {
        let opts = StartOptions {
            workspace_name: "main".to_string(),
            app_name: Some("api".to_string()),
            domain_name: Some("billing".to_string()),
            ..Default::default()
        };
        assert_eq!(opts.compute_container_name().unwrap(), "dvm-billing-api-main");
    }

    #[test]
    fn missing_app_falls_back_to_workspace() {
        let opts = StartOptions {
            workspace_name: "main".to_string(),
            ..Default::default()
        };
        assert_eq!(opts.compute_container_name().unwrap(), "dvm-main-main");
    }

    #[test]
    fn labels_always_include_managed_and_image() {
        let opts = StartOptions {
            image_name: "dvm/api:1".to_string(),
            workspace_name: "main".to_string(),
            ..Default::default()
        };
        let labels = opts.labels();
        assert_eq!(labels.get(MANAGED_LABEL).map(String::as_str), Some("true"));
        assert_eq!(labels.get(IMAGE_LABEL).map(String::as_str), Some("dvm/api:1"));
        assert_eq!(labels.get(WORKSPACE_LABEL).map(String::as_str), Some("main"));
    }

    #[test]
    fn start_on_running_container_with_same_image_reuses_it() {
        assert_eq!(
            reconcile_start(Some("dvm/api:1"), "dvm/api:1", WorkspaceStatus::Running),
            StartAction::ReuseRunning
        );
    }

    #[test]
    fn start_on_stopped_container_with_same_image_starts_in_place() {
        for status in [
            WorkspaceStatus::Created,
            WorkspaceStatus::Stopped,
            WorkspaceStatus::Paused,
            WorkspaceStatus::Dead,
        ] {
            assert_eq!(
                reconcile_start(Some("dvm/api:1"), "dvm/api:1", status),
                StartAction::StartInPlace,
                "{status} with matching image must start in place"
            );
        }
    }

    #[test]
    fn changed_image_forces_recreate_regardless_of_state() {
        for status in [WorkspaceStatus::Running, WorkspaceStatus::Stopped] {
            assert_eq!(
                reconcile_start(Some("dvm/api:1"), "dvm/api:2", status),
                StartAction::Recreate
            );
        }
    }

    #[test]
    fn missing_image_label_is_treated_as_stale() {
        assert_eq!(
            reconcile_start(None, "dvm/api:1", WorkspaceStatus::Running),
            StartAction::Recreate
        );
    }

    #[test]
    fn status_maps_engine_states() {
        assert_eq!(WorkspaceStatus::from_engine_state("Running"), WorkspaceStatus::Running);
        assert_eq!(WorkspaceStatus::from_engine_state("exited"), WorkspaceStatus::Stopped);
        assert_eq!(WorkspaceStatus::NotFound.to_string(), "not_found");
    }

    #[test]
    fn info_hierarchy_prefers_labels_then_name() {
        let mut labels = HashMap::new();
        labels.insert(WORKSPACE_LABEL.to_string(), "main".to_string());
        let info = WorkspaceInfo::from_engine(
            ContainerId::new("abc"),
            "dvm-billing-api-main".to_string(),
            WorkspaceStatus::Running,
            "img".to_string(),
            labels,
        );
        assert_eq!(info.app.as_deref(), Some("api"));
        assert_eq!(info.domain.as_deref(), Some("billing"));
        assert_eq!(info.workspace.as_deref(), Some("main"));
    }
}
