// ABOUTME: SSH agent socket resolution for opt-in agent forwarding.
// ABOUTME: Never mounts ~/.ssh; only the agent socket itself is exposed.

use crate::platform::{Platform, PlatformKind};
use std::path::PathBuf;
use thiserror::Error;

/// Fixed agent socket macOS VM products expose inside their guests.
pub const HOST_SERVICES_AGENT_SOCKET: &str = "/run/host-services/ssh-auth.sock";

/// Container path the forwarded agent socket is mounted at, and the value
/// `SSH_AUTH_SOCK` is set to inside the workspace.
pub const CONTAINER_AGENT_SOCKET: &str = "/ssh-agent/agent.sock";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("SSH_AUTH_SOCK is not set; start an ssh-agent (eval \"$(ssh-agent)\") or disable agent forwarding")]
    AgentSocketUnset,
}

/// Resolve the host-side SSH agent socket for a platform.
///
/// Docker Desktop and OrbStack virtualize the agent at a fixed guest path
/// regardless of the host environment; everything else forwards whatever
/// `SSH_AUTH_SOCK` points at.
pub fn resolve_agent_socket(platform: &Platform) -> Result<PathBuf, AgentError> {
    match platform.kind {
        PlatformKind::DockerDesktop | PlatformKind::OrbStack => {
            Ok(PathBuf::from(HOST_SERVICES_AGENT_SOCKET))
        }
        PlatformKind::Colima
        | PlatformKind::LinuxNative
        | PlatformKind::Podman
        | PlatformKind::Unknown => std::env::var("SSH_AUTH_SOCK")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .ok_or(AgentError::AgentSocketUnset),
    }
}
