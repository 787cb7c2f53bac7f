// ABOUTME: Runtime selection: maps a detected platform plus an optional
// ABOUTME: explicit choice onto a concrete ContainerRuntime backend.

use crate::platform::{Platform, PlatformKind};
use crate::runtime::containerd::{ColimaRuntime, ContainerdRuntime};
use crate::runtime::docker::DockerRuntime;
use crate::runtime::error::RuntimeError;
use crate::runtime::traits::ContainerRuntime;
use std::path::PathBuf;
use std::time::Duration;

/// Default containerd endpoint used when the runtime is forced to containerd
/// on a platform whose detected socket speaks the Docker API.
const NATIVE_CONTAINERD_SOCKET: &str = "/run/containerd/containerd.sock";

/// Which backend the caller wants, before reconciling with what the platform
/// offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeChoice {
    /// Follow the platform: Docker API where available, containerd otherwise.
    #[default]
    Auto,
    Docker,
    Containerd,
}

impl RuntimeChoice {
    /// Parse a runtime name as used by `DVM_RUNTIME` and the config file.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Some(RuntimeChoice::Auto),
            "docker" => Some(RuntimeChoice::Docker),
            "containerd" | "nerdctl" => Some(RuntimeChoice::Containerd),
            _ => None,
        }
    }
}

impl std::fmt::Display for RuntimeChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeChoice::Auto => write!(f, "auto"),
            RuntimeChoice::Docker => write!(f, "docker"),
            RuntimeChoice::Containerd => write!(f, "containerd"),
        }
    }
}

/// Construct the backend for a detected platform.
///
/// `Auto` follows the platform's native protocol. Explicit choices are
/// honored when the platform can serve them and rejected with an
/// [`RuntimeError::Unsupported`] when it cannot; a mismatch is a
/// configuration error, not something to silently paper over.
pub async fn create_runtime(
    platform: Platform,
    choice: RuntimeChoice,
    stop_grace: Duration,
) -> Result<Box<dyn ContainerRuntime>, RuntimeError> {
    match choice {
        RuntimeChoice::Auto => {
            if platform.is_containerd() {
                Ok(Box::new(ColimaRuntime::new(platform, stop_grace)))
            } else {
                Ok(Box::new(DockerRuntime::connect(platform, stop_grace)?))
            }
        }
        RuntimeChoice::Docker => {
            if !platform.is_docker_compatible() {
                return Err(RuntimeError::Unsupported {
                    operation: "docker runtime",
                    runtime: "containerd",
                    hint: "this Colima profile runs the containerd backend; restart it with \
                           `colima start --runtime docker` or use the containerd runtime"
                        .to_string(),
                });
            }
            Ok(Box::new(DockerRuntime::connect(platform, stop_grace)?))
        }
        RuntimeChoice::Containerd => {
            if platform.kind == PlatformKind::Colima {
                // Colima's containerd socket lives inside the VM; the only
                // viable transport is nerdctl over ssh.
                return Ok(Box::new(ColimaRuntime::new(platform, stop_grace)));
            }
            let mut platform = platform;
            if !platform
                .socket_path
                .file_name()
                .is_some_and(|n| n == "containerd.sock")
            {
                platform.socket_path = PathBuf::from(NATIVE_CONTAINERD_SOCKET);
            }
            Ok(Box::new(ContainerdRuntime::connect(platform, stop_grace).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_names() {
        assert_eq!(RuntimeChoice::parse("auto"), Some(RuntimeChoice::Auto));
        assert_eq!(RuntimeChoice::parse("Docker"), Some(RuntimeChoice::Docker));
        assert_eq!(RuntimeChoice::parse("nerdctl"), Some(RuntimeChoice::Containerd));
        assert_eq!(RuntimeChoice::parse("qemu"), None);
    }

    #[test]
    fn empty_string_means_auto() {
        assert_eq!(RuntimeChoice::parse(""), Some(RuntimeChoice::Auto));
    }

    #[test]
    fn display_round_trips_parse() {
        for choice in [RuntimeChoice::Auto, RuntimeChoice::Docker, RuntimeChoice::Containerd] {
            assert_eq!(RuntimeChoice::parse(&choice.to_string()), Some(choice));
        }
    }
}
