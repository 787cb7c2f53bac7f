// ABOUTME: Integration tests for platform detection against fake socket trees.
// ABOUTME: Builds temp home directories and asserts probe priority and overrides.

use dvm::platform::{DetectError, Detector, PLATFORM_ENV, PlatformKind};
use std::path::Path;
use tempfile::TempDir;

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"").unwrap();
}

struct Fixture {
    home: TempDir,
    shared: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            shared: TempDir::new().unwrap(),
        }
    }

    fn detector(&self) -> Detector {
        Detector::with_roots(self.home.path(), self.shared.path().join("docker.sock"))
    }

    fn orbstack(&self) -> &Self {
        touch(&self.home.path().join(".orbstack/run/docker.sock"));
        self
    }

    fn colima_docker(&self) -> &Self {
        touch(&self.home.path().join(".colima/default/docker.sock"));
        self
    }

    fn colima_containerd(&self) -> &Self {
        touch(&self.home.path().join(".colima/default/containerd.sock"));
        self
    }

    fn docker_desktop(&self) -> &Self {
        touch(&self.home.path().join(".docker/run/docker.sock"));
        self
    }

    fn linux_native(&self) -> &Self {
        touch(&self.shared.path().join("docker.sock"));
        self
    }
}

fn with_clean_env(f: impl FnOnce()) {
    temp_env::with_vars(
        [
            (PLATFORM_ENV, None::<&str>),
            ("COLIMA_DOCKER_PROFILE", None),
            ("COLIMA_ACTIVE_PROFILE", None),
        ],
        f,
    );
}

#[test]
fn nothing_installed_reports_every_attempt() {
    with_clean_env(|| {
        let fx = Fixture::new();
        match fx.detector().detect(None) {
            Err(DetectError::NoPlatformFound { attempted }) => {
                assert!(attempted.contains("OrbStack"));
                assert!(attempted.contains("Colima"));
                assert!(attempted.contains("Podman"));
            }
            other => panic!("expected NoPlatformFound, got {other:?}"),
        }
    });
}

#[test]
fn orbstack_wins_over_everything() {
    with_clean_env(|| {
        let fx = Fixture::new();
        fx.orbstack().colima_docker().docker_desktop().linux_native();
        let platform = fx.detector().detect(None).unwrap();
        assert_eq!(platform.kind, PlatformKind::OrbStack);
    });
}

#[test]
fn colima_wins_over_docker_desktop() {
    with_clean_env(|| {
        let fx = Fixture::new();
        fx.colima_docker().docker_desktop();
        let platform = fx.detector().detect(None).unwrap();
        assert_eq!(platform.kind, PlatformKind::Colima);
        assert_eq!(platform.profile.as_deref(), Some("default"));
        assert!(platform.is_docker_compatible());
    });
}

#[test]
fn colima_containerd_backend_is_flagged() {
    with_clean_env(|| {
        let fx = Fixture::new();
        fx.colima_containerd();
        let platform = fx.detector().detect(None).unwrap();
        assert_eq!(platform.kind, PlatformKind::Colima);
        assert!(platform.is_containerd());
        assert!(!platform.is_docker_compatible());
    });
}

#[test]
fn colima_prefers_docker_socket_over_containerd() {
    with_clean_env(|| {
        let fx = Fixture::new();
        fx.colima_docker().colima_containerd();
        let platform = fx.detector().detect(None).unwrap();
        assert!(!platform.is_containerd());
    });
}

#[test]
fn colima_profile_env_changes_probe_directory() {
    temp_env::with_vars(
        [
            (PLATFORM_ENV, None::<&str>),
            ("COLIMA_DOCKER_PROFILE", Some("work")),
            ("COLIMA_ACTIVE_PROFILE", None),
        ],
        || {
            let fx = Fixture::new();
            touch(&fx.home.path().join(".colima/work/docker.sock"));
            let platform = fx.detector().detect(None).unwrap();
            assert_eq!(platform.kind, PlatformKind::Colima);
            assert_eq!(platform.profile.as_deref(), Some("work"));
        },
    );
}

#[test]
fn config_profile_changes_probe_directory_when_env_unset() {
    with_clean_env(|| {
        let fx = Fixture::new();
        touch(&fx.home.path().join(".colima/work/docker.sock"));
        let detector = fx.detector().with_colima_profile(Some("work".to_string()));
        let platform = detector.detect(None).unwrap();
        assert_eq!(platform.kind, PlatformKind::Colima);
        assert_eq!(platform.profile.as_deref(), Some("work"));
    });
}

#[test]
fn env_profile_wins_over_config_profile() {
    temp_env::with_vars(
        [
            (PLATFORM_ENV, None::<&str>),
            ("COLIMA_DOCKER_PROFILE", Some("work")),
            ("COLIMA_ACTIVE_PROFILE", None),
        ],
        || {
            let fx = Fixture::new();
            touch(&fx.home.path().join(".colima/work/docker.sock"));
            touch(&fx.home.path().join(".colima/personal/docker.sock"));
            let detector = fx.detector().with_colima_profile(Some("personal".to_string()));
            let platform = detector.detect(None).unwrap();
            assert_eq!(platform.profile.as_deref(), Some("work"));
        },
    );
}

#[test]
fn shared_socket_symlinked_to_orbstack_is_not_linux_native() {
    with_clean_env(|| {
        let fx = Fixture::new();
        // OrbStack's own socket is gone but its /var/run/docker.sock symlink
        // lingers; that must not be mistaken for a native daemon.
        let target = fx.home.path().join(".orbstack/run/docker.sock.stale");
        touch(&target);
        std::os::unix::fs::symlink(&target, fx.shared.path().join("docker.sock")).unwrap();

        match fx.detector().detect(None) {
            Err(DetectError::NoPlatformFound { .. }) => {}
            other => panic!("expected NoPlatformFound, got {other:?}"),
        }
    });
}

#[test]
fn plain_shared_socket_is_linux_native() {
    with_clean_env(|| {
        let fx = Fixture::new();
        fx.linux_native();
        let platform = fx.detector().detect(None).unwrap();
        assert_eq!(platform.kind, PlatformKind::LinuxNative);
    });
}

#[test]
fn env_override_beats_probe_priority() {
    temp_env::with_vars(
        [
            (PLATFORM_ENV, Some("colima")),
            ("COLIMA_DOCKER_PROFILE", None),
            ("COLIMA_ACTIVE_PROFILE", None),
        ],
        || {
            let fx = Fixture::new();
            fx.orbstack().colima_docker();
            let platform = fx.detector().detect(None).unwrap();
            assert_eq!(platform.kind, PlatformKind::Colima);
        },
    );
}

#[test]
fn env_override_of_missing_platform_is_unavailable_not_notfound() {
    temp_env::with_vars([(PLATFORM_ENV, Some("orbstack"))], || {
        let fx = Fixture::new();
        fx.linux_native();
        match fx.detector().detect(None) {
            Err(DetectError::PlatformUnavailable { kind, hint }) => {
                assert_eq!(kind, PlatformKind::OrbStack);
                assert!(hint.contains("OrbStack"));
            }
            other => panic!("expected PlatformUnavailable, got {other:?}"),
        }
    });
}

#[test]
fn unknown_env_override_is_rejected() {
    temp_env::with_vars([(PLATFORM_ENV, Some("qemu"))], || {
        let fx = Fixture::new();
        fx.orbstack();
        assert!(matches!(
            fx.detector().detect(None),
            Err(DetectError::UnknownPlatform(_))
        ));
    });
}

#[test]
fn config_override_applies_when_env_is_unset() {
    with_clean_env(|| {
        let fx = Fixture::new();
        fx.orbstack().colima_docker();
        let platform = fx.detector().detect(Some(PlatformKind::Colima)).unwrap();
        assert_eq!(platform.kind, PlatformKind::Colima);
    });
}

#[test]
fn detect_all_returns_priority_order() {
    with_clean_env(|| {
        let fx = Fixture::new();
        fx.orbstack().colima_docker().docker_desktop();
        let kinds: Vec<PlatformKind> =
            fx.detector().detect_all().into_iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![PlatformKind::OrbStack, PlatformKind::Colima, PlatformKind::DockerDesktop]
        );
    });
}
