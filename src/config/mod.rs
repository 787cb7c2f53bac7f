// ABOUTME: User configuration from ~/.devopsmaestro/config.yaml.
// ABOUTME: Platform and runtime overrides with env vars taking precedence.

use crate::platform::{PLATFORM_ENV, PlatformKind};
use crate::runtime::RuntimeChoice;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR: &str = ".devopsmaestro";
pub const CONFIG_FILENAME: &str = "config.yaml";

/// Env var forcing a runtime choice, overriding the config file.
pub const RUNTIME_ENV: &str = "DVM_RUNTIME";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("unknown platform '{0}' (expected orbstack, colima, docker-desktop, podman or linux)")]
    UnknownPlatform(String),

    #[error("unknown runtime '{0}' (expected auto, docker or containerd)")]
    UnknownRuntime(String),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Pin detection to one platform instead of probing the priority order.
    #[serde(default)]
    pub platform: Option<String>,

    /// Force a backend (`docker` or `containerd`) instead of following the
    /// platform's native protocol.
    #[serde(default)]
    pub runtime: Option<String>,

    /// Colima profile to probe. `COLIMA_DOCKER_PROFILE` and
    /// `COLIMA_ACTIVE_PROFILE` still win at detection time.
    #[serde(default)]
    pub colima_profile: Option<String>,

    #[serde(default)]
    pub stop: StopConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopConfig {
    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for StopConfig {
    fn default() -> Self {
        StopConfig {
            timeout: default_stop_timeout(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content, path)
    }

    /// Load from the default location; a missing file means defaults, any
    /// other failure is surfaced.
    pub fn discover() -> Result<Self, ConfigError> {
        let Some(home) = dirs::home_dir() else {
            return Ok(Config::default());
        };
        let path = home.join(CONFIG_DIR).join(CONFIG_FILENAME);
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load(&path)
    }

    /// The platform override to hand to detection: `DVM_PLATFORM` wins over
    /// the config file, and an unparseable value in either is an error
    /// rather than a silent fall-through to probing.
    pub fn platform_override(&self) -> Result<Option<PlatformKind>, ConfigError> {
        let value = std::env::var(PLATFORM_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.platform.clone());
        match value {
            None => Ok(None),
            Some(raw) => PlatformKind::parse(&raw)
                .map(Some)
                .ok_or(ConfigError::UnknownPlatform(raw)),
        }
    }

    /// The effective runtime choice: `DVM_RUNTIME`, then the config file,
    /// then auto.
    pub fn runtime_choice(&self) -> Result<RuntimeChoice, ConfigError> {
        let value = std::env::var(RUNTIME_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.runtime.clone());
        match value {
            None => Ok(RuntimeChoice::Auto),
            Some(raw) => RuntimeChoice::parse(&raw).ok_or(ConfigError::UnknownRuntime(raw)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Config {
        Config::from_yaml(yaml, Path::new("config.yaml")).unwrap()
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let config = parse("{}");
        assert!(config.platform.is_none());
        assert!(config.runtime.is_none());
        assert_eq!(config.stop.timeout, Duration::from_secs(10));
    }

    #[test]
    fn stop_timeout_accepts_humantime() {
        let config = parse("stop:\n  timeout: 30s\n");
        assert_eq!(config.stop.timeout, Duration::from_secs(30));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = Config::from_yaml("platfrom: colima\n", Path::new("config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn env_platform_beats_config_file() {
        let config = parse("platform: podman\n");
        temp_env::with_var(PLATFORM_ENV, Some("orbstack"), || {
            assert_eq!(config.platform_override().unwrap(), Some(PlatformKind::OrbStack));
        });
        temp_env::with_var(PLATFORM_ENV, None::<&str>, || {
            assert_eq!(config.platform_override().unwrap(), Some(PlatformKind::Podman));
        });
    }

    #[test]
    fn bad_platform_value_is_an_error() {
        let config = parse("platform: qemu\n");
        temp_env::with_var(PLATFORM_ENV, None::<&str>, || {
            assert!(matches!(
                config.platform_override(),
                Err(ConfigError::UnknownPlatform(_))
            ));
        });
    }

    #[test]
    fn runtime_choice_defaults_to_auto() {
        let config = parse("{}");
        temp_env::with_var(RUNTIME_ENV, None::<&str>, || {
            assert_eq!(config.runtime_choice().unwrap(), RuntimeChoice::Auto);
        });
    }

    #[test]
    fn env_runtime_beats_config_file() {
        let config = parse("runtime: docker\n");
        temp_env::with_var(RUNTIME_ENV, Some("containerd"), || {
            assert_eq!(config.runtime_choice().unwrap(), RuntimeChoice::Containerd);
        });
    }
}
