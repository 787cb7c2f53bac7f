// ABOUTME: Platform type definitions for detected container engines.
// ABOUTME: Includes PlatformKind enum and the Platform snapshot struct.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The family of container engine a platform belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformKind {
    OrbStack,
    Colima,
    DockerDesktop,
    Podman,
    LinuxNative,
    Unknown,
}

impl PlatformKind {
    /// Parse a platform name as used by `DVM_PLATFORM` and the config file.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "orbstack" => Some(PlatformKind::OrbStack),
            "colima" => Some(PlatformKind::Colima),
            "docker-desktop" | "dockerdesktop" => Some(PlatformKind::DockerDesktop),
            "podman" => Some(PlatformKind::Podman),
            "linux" | "linux-native" | "docker" => Some(PlatformKind::LinuxNative),
            _ => None,
        }
    }

    /// Display name shown to users.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformKind::OrbStack => "OrbStack",
            PlatformKind::Colima => "Colima",
            PlatformKind::DockerDesktop => "Docker Desktop",
            PlatformKind::Podman => "Podman",
            PlatformKind::LinuxNative => "Docker (Linux)",
            PlatformKind::Unknown => "Unknown",
        }
    }

    /// Hint for installing the platform, used in detection failures.
    pub fn install_hint(&self) -> &'static str {
        match self {
            PlatformKind::OrbStack => "install from https://orbstack.dev",
            PlatformKind::Colima => "brew install colima",
            PlatformKind::DockerDesktop => "install from https://docker.com/products/docker-desktop",
            PlatformKind::Podman => "brew install podman && podman machine start",
            PlatformKind::LinuxNative => "install docker and start the daemon (systemctl start docker)",
            PlatformKind::Unknown => "install a container runtime",
        }
    }

    /// Hint for starting an installed-but-stopped platform.
    pub fn start_hint(&self) -> &'static str {
        match self {
            PlatformKind::OrbStack => "open -a OrbStack",
            PlatformKind::Colima => "colima start",
            PlatformKind::DockerDesktop => "open -a Docker",
            PlatformKind::Podman => "podman machine start",
            PlatformKind::LinuxNative => "systemctl start docker",
            PlatformKind::Unknown => "start your container runtime",
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformKind::OrbStack => write!(f, "orbstack"),
            PlatformKind::Colima => write!(f, "colima"),
            PlatformKind::DockerDesktop => write!(f, "docker-desktop"),
            PlatformKind::Podman => write!(f, "podman"),
            PlatformKind::LinuxNative => write!(f, "linux"),
            PlatformKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A detected container engine and its connection details.
///
/// Constructed fresh on every detection call and never mutated; the socket
/// path is guaranteed to exist at detection time only.
#[derive(Debug, Clone)]
pub struct Platform {
    pub kind: PlatformKind,
    /// Unix socket the engine listens on.
    pub socket_path: PathBuf,
    /// Colima profile name, when applicable.
    pub profile: Option<String>,
    /// Display name for user-facing output.
    pub name: String,
    /// Home directory the probes ran against.
    pub home_dir: PathBuf,
}

impl Platform {
    pub(crate) fn new(kind: PlatformKind, socket_path: PathBuf, home_dir: PathBuf) -> Self {
        Self {
            kind,
            socket_path,
            profile: None,
            name: kind.display_name().to_string(),
            home_dir,
        }
    }

    pub(crate) fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// True only for a Colima install whose active backend is containerd.
    pub fn is_containerd(&self) -> bool {
        self.kind == PlatformKind::Colima
            && self
                .socket_path
                .file_name()
                .is_some_and(|n| n == "containerd.sock")
    }

    /// True for every platform that speaks the Docker Engine API.
    pub fn is_docker_compatible(&self) -> bool {
        match self.kind {
            PlatformKind::OrbStack
            | PlatformKind::DockerDesktop
            | PlatformKind::Podman
            | PlatformKind::LinuxNative => true,
            PlatformKind::Colima => !self.is_containerd(),
            PlatformKind::Unknown => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(kind: PlatformKind, socket: &str) -> Platform {
        Platform::new(kind, PathBuf::from(socket), PathBuf::from("/home/dev"))
    }

    #[test]
    fn colima_containerd_socket_is_containerd() {
        let p = platform(PlatformKind::Colima, "/home/dev/.colima/default/containerd.sock");
        assert!(p.is_containerd());
        assert!(!p.is_docker_compatible());
    }

    #[test]
    fn colima_docker_socket_is_docker_compatible() {
        let p = platform(PlatformKind::Colima, "/home/dev/.colima/default/docker.sock");
        assert!(!p.is_containerd());
        assert!(p.is_docker_compatible());
    }

    #[test]
    fn docker_family_is_never_containerd() {
        for kind in [
            PlatformKind::OrbStack,
            PlatformKind::DockerDesktop,
            PlatformKind::Podman,
            PlatformKind::LinuxNative,
        ] {
            // A containerd-looking basename must not flip non-Colima platforms.
            let p = platform(kind, "/tmp/containerd.sock");
            assert!(!p.is_containerd());
            assert!(p.is_docker_compatible());
        }
    }

    #[test]
    fn parse_kind_round_trips_display() {
        for kind in [
            PlatformKind::OrbStack,
            PlatformKind::Colima,
            PlatformKind::DockerDesktop,
            PlatformKind::Podman,
            PlatformKind::LinuxNative,
        ] {
            assert_eq!(PlatformKind::parse(&kind.to_string()), Some(kind));
        }
        assert_eq!(PlatformKind::parse("qemu"), None);
    }
}
