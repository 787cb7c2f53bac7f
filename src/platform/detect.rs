// ABOUTME: Filesystem-probe based detection of the active container platform.
// ABOUTME: Fixed priority: OrbStack, Colima, Docker Desktop, Podman, native Linux.

use super::types::{Platform, PlatformKind};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit platform, bypassing probe priority.
pub const PLATFORM_ENV: &str = "DVM_PLATFORM";

const COLIMA_DOCKER_PROFILE_ENV: &str = "COLIMA_DOCKER_PROFILE";
const COLIMA_ACTIVE_PROFILE_ENV: &str = "COLIMA_ACTIVE_PROFILE";
const SHARED_DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Probe priority. Detection returns the first platform whose probe matches.
const PROBE_ORDER: [PlatformKind; 5] = [
    PlatformKind::OrbStack,
    PlatformKind::Colima,
    PlatformKind::DockerDesktop,
    PlatformKind::Podman,
    PlatformKind::LinuxNative,
];

/// Error during platform detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("no container platform found; tried:\n{attempted}")]
    NoPlatformFound {
        /// One "name: install hint" line per probed platform.
        attempted: String,
    },

    #[error("platform {kind} was requested but is not available; try: {hint}")]
    PlatformUnavailable { kind: PlatformKind, hint: String },

    #[error("unknown platform name: {0} (expected orbstack|colima|docker-desktop|podman|linux)")]
    UnknownPlatform(String),
}

/// Probes the filesystem for known container-engine sockets.
///
/// Detection is a point-in-time snapshot: it only checks socket existence and
/// symlink targets, and never dials a socket.
#[derive(Debug, Clone)]
pub struct Detector {
    home: PathBuf,
    shared_docker_socket: PathBuf,
    colima_profile: Option<String>,
}

impl Detector {
    /// Detector rooted at the current user's home directory.
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        Self {
            home,
            shared_docker_socket: PathBuf::from(SHARED_DOCKER_SOCKET),
            colima_profile: None,
        }
    }

    /// Detector with explicit roots, used by tests to fake socket trees.
    pub fn with_roots(home: impl Into<PathBuf>, shared_docker_socket: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            shared_docker_socket: shared_docker_socket.into(),
            colima_profile: None,
        }
    }

    /// Colima profile from the config file, consulted after the env vars.
    pub fn with_colima_profile(mut self, profile: Option<String>) -> Self {
        self.colima_profile = profile;
        self
    }

    /// Detect the active platform.
    ///
    /// Honors an explicit `DVM_PLATFORM` override (or `override_kind` from the
    /// config file, with the environment taking precedence) before falling
    /// back to probe priority. An override naming an absent platform is a
    /// distinct error from "nothing found".
    pub fn detect(&self, override_kind: Option<PlatformKind>) -> Result<Platform, DetectError> {
        let explicit = match std::env::var(PLATFORM_ENV) {
            Ok(name) => Some(
                PlatformKind::parse(&name).ok_or_else(|| DetectError::UnknownPlatform(name))?,
            ),
            Err(_) => override_kind,
        };

        if let Some(kind) = explicit {
            return self.probe(kind).ok_or_else(|| DetectError::PlatformUnavailable {
                kind,
                hint: kind.start_hint().to_string(),
            });
        }

        for kind in PROBE_ORDER {
            if let Some(platform) = self.probe(kind) {
                tracing::debug!(platform = %kind, socket = %platform.socket_path.display(), "detected platform");
                return Ok(platform);
            }
        }

        let attempted = PROBE_ORDER
            .iter()
            .map(|k| format!("  {}: {}", k.display_name(), k.install_hint()))
            .collect::<Vec<_>>()
            .join("\n");
        Err(DetectError::NoPlatformFound { attempted })
    }

    /// Every platform whose probe currently matches, in priority order.
    pub fn detect_all(&self) -> Vec<Platform> {
        PROBE_ORDER.iter().filter_map(|k| self.probe(*k)).collect()
    }

    fn probe(&self, kind: PlatformKind) -> Option<Platform> {
        match kind {
            PlatformKind::OrbStack => self.probe_orbstack(),
            PlatformKind::Colima => self.probe_colima(),
            PlatformKind::DockerDesktop => self.probe_docker_desktop(),
            PlatformKind::Podman => self.probe_podman(),
            PlatformKind::LinuxNative => self.probe_linux_native(),
            PlatformKind::Unknown => None,
        }
    }

    fn probe_orbstack(&self) -> Option<Platform> {
        let socket = self.home.join(".orbstack/run/docker.sock");
        socket
            .exists()
            .then(|| Platform::new(PlatformKind::OrbStack, socket, self.home.clone()))
    }

    /// Colima exposes either docker.sock or containerd.sock in its profile
    /// directory, depending on which backend the VM was started with.
    fn probe_colima(&self) -> Option<Platform> {
        let profile = colima_profile(self.colima_profile.as_deref());
        let profile_dir = self.home.join(".colima").join(&profile);

        let docker_socket = profile_dir.join("docker.sock");
        if docker_socket.exists() {
            return Some(
                Platform::new(PlatformKind::Colima, docker_socket, self.home.clone())
                    .with_profile(profile),
            );
        }

        let containerd_socket = profile_dir.join("containerd.sock");
        if containerd_socket.exists() {
            return Some(
                Platform::new(PlatformKind::Colima, containerd_socket, self.home.clone())
                    .with_profile(profile),
            );
        }

        None
    }

    fn probe_docker_desktop(&self) -> Option<Platform> {
        let desktop_socket = self.home.join(".docker/run/docker.sock");
        if desktop_socket.exists() {
            return Some(Platform::new(
                PlatformKind::DockerDesktop,
                desktop_socket,
                self.home.clone(),
            ));
        }

        // Docker Desktop also claims /var/run/docker.sock, but so do OrbStack
        // and Colima via symlinks. Only accept the shared path when no
        // higher-priority platform owns it.
        if self.shared_docker_socket.exists()
            && socket_claimant(&self.shared_docker_socket).is_none()
            && self.home.join(".docker").is_dir()
        {
            return Some(Platform::new(
                PlatformKind::DockerDesktop,
                self.shared_docker_socket.clone(),
                self.home.clone(),
            ));
        }

        None
    }

    fn probe_podman(&self) -> Option<Platform> {
        let mut candidates: Vec<PathBuf> = vec![
            self.home
                .join(".local/share/containers/podman/machine/podman.sock"),
            PathBuf::from("/run/podman/podman.sock"),
        ];
        if let Some(uid) = current_uid() {
            candidates.insert(1, PathBuf::from(format!("/run/user/{uid}/podman/podman.sock")));
        }
        // macOS: podman machine places its API socket under the per-user
        // temp dir with a machine-name suffix.
        candidates.extend(podman_tempdir_sockets());

        candidates
            .into_iter()
            .find(|p| p.exists())
            .map(|socket| Platform::new(PlatformKind::Podman, socket, self.home.clone()))
    }

    fn probe_linux_native(&self) -> Option<Platform> {
        if !self.shared_docker_socket.exists() {
            return None;
        }
        // A symlink into ~/.orbstack or ~/.colima means the path is owned by
        // a VM product, not a native daemon.
        if socket_claimant(&self.shared_docker_socket).is_some() {
            return None;
        }
        Some(Platform::new(
            PlatformKind::LinuxNative,
            self.shared_docker_socket.clone(),
            self.home.clone(),
        ))
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the active Colima profile name.
///
/// Order: `$COLIMA_DOCKER_PROFILE`, `$COLIMA_ACTIVE_PROFILE`, the config
/// file's `colima_profile`, `"default"`.
pub fn colima_profile(config_profile: Option<&str>) -> String {
    std::env::var(COLIMA_DOCKER_PROFILE_ENV)
        .or_else(|_| std::env::var(COLIMA_ACTIVE_PROFILE_ENV))
        .ok()
        .filter(|p| !p.trim().is_empty())
        .or_else(|| config_profile.map(str::to_string))
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| "default".to_string())
}

/// Inspect a shared docker socket path and report which VM product claims it,
/// if any, by following its symlink target.
pub(crate) fn socket_claimant(path: &Path) -> Option<PlatformKind> {
    let target = std::fs::read_link(path).ok()?;
    let target = target.to_string_lossy();
    if target.contains(".orbstack") {
        Some(PlatformKind::OrbStack)
    } else if target.contains(".colima") {
        Some(PlatformKind::Colima)
    } else {
        None
    }
}

fn current_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

fn podman_tempdir_sockets() -> Vec<PathBuf> {
    let tmp = std::env::temp_dir();
    let Ok(entries) = std::fs::read_dir(&tmp) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("podman"))
        .map(|e| e.path().join("podman-machine-default-api.sock"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colima_profile_defaults_when_env_unset() {
        temp_env::with_vars(
            [
                (COLIMA_DOCKER_PROFILE_ENV, None::<&str>),
                (COLIMA_ACTIVE_PROFILE_ENV, None),
            ],
            || assert_eq!(colima_profile(None), "default"),
        );
    }

    #[test]
    fn colima_docker_profile_wins_over_active_profile() {
        temp_env::with_vars(
            [
                (COLIMA_DOCKER_PROFILE_ENV, Some("work")),
                (COLIMA_ACTIVE_PROFILE_ENV, Some("other")),
            ],
            || assert_eq!(colima_profile(None), "work"),
        );
    }

    #[test]
    fn config_profile_fills_in_when_env_unset() {
        temp_env::with_vars(
            [
                (COLIMA_DOCKER_PROFILE_ENV, None::<&str>),
                (COLIMA_ACTIVE_PROFILE_ENV, None),
            ],
            || {
                assert_eq!(colima_profile(Some("work")), "work");
                // Blank values never name a profile directory.
                assert_eq!(colima_profile(Some("  ")), "default");
            },
        );
    }

    #[test]
    fn env_profile_wins_over_config_profile() {
        temp_env::with_vars(
            [
                (COLIMA_DOCKER_PROFILE_ENV, None::<&str>),
                (COLIMA_ACTIVE_PROFILE_ENV, Some("env-profile")),
            ],
            || assert_eq!(colima_profile(Some("config-profile")), "env-profile"),
        );
    }

    #[test]
    fn socket_claimant_reads_symlink_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(".orbstack/run/docker.sock");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"").unwrap();
        let link = dir.path().join("docker.sock");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(socket_claimant(&link), Some(PlatformKind::OrbStack));
    }

    #[test]
    fn socket_claimant_ignores_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker.sock");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(socket_claimant(&path), None);
    }
}
