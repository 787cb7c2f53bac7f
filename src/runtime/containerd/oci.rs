// ABOUTME: Manual OCI runtime spec construction for the direct containerd path.
// ABOUTME: Mount, device and capability allow-lists live here as named constants.

use crate::mounts::Mount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const OCI_VERSION: &str = "1.1.0";

/// Baseline capability set for workspace shells. This mirrors what a
/// CLI-based engine grants by default; dropping any of these makes common
/// shell and editor operations fail with opaque permission errors.
pub const BASE_CAPABILITIES: [&str; 14] = [
    "CAP_CHOWN",
    "CAP_DAC_OVERRIDE",
    "CAP_FSETID",
    "CAP_FOWNER",
    "CAP_MKNOD",
    "CAP_NET_RAW",
    "CAP_SETGID",
    "CAP_SETUID",
    "CAP_SETFCAP",
    "CAP_SETPCAP",
    "CAP_NET_BIND_SERVICE",
    "CAP_SYS_CHROOT",
    "CAP_KILL",
    "CAP_AUDIT_WRITE",
];

/// Device-cgroup allow-list as (major, minor) pairs of character devices:
/// null, zero, full, random, urandom, tty, console, ptmx, and the pts range.
/// All entries get "rwm" access.
pub const DEVICE_ALLOW_LIST: [(i64, Option<i64>); 9] = [
    (1, Some(3)),   // /dev/null
    (1, Some(5)),   // /dev/zero
    (1, Some(7)),   // /dev/full
    (1, Some(8)),   // /dev/random
    (1, Some(9)),   // /dev/urandom
    (5, Some(0)),   // /dev/tty
    (5, Some(1)),   // /dev/console
    (5, Some(2)),   // /dev/ptmx
    (136, None),    // /dev/pts/*
];

/// Filesystem mounts an interactive shell needs. The high-level helpers other
/// engines use add these implicitly; raw containerd does not, and a spec
/// without them yields a container whose shell cannot allocate a tty.
pub fn default_mounts() -> Vec<OciMount> {
    vec![
        OciMount {
            destination: "/proc".into(),
            kind: "proc".into(),
            source: "proc".into(),
            options: vec![],
        },
        OciMount {
            destination: "/dev".into(),
            kind: "tmpfs".into(),
            source: "tmpfs".into(),
            options: str_vec(&["nosuid", "strictatime", "mode=755", "size=65536k"]),
        },
        OciMount {
            destination: "/dev/pts".into(),
            kind: "devpts".into(),
            source: "devpts".into(),
            options: str_vec(&[
                "nosuid",
                "noexec",
                "newinstance",
                "ptmxmode=0666",
                "mode=0620",
                "gid=5",
            ]),
        },
        OciMount {
            destination: "/dev/shm".into(),
            kind: "tmpfs".into(),
            source: "shm".into(),
            options: str_vec(&["nosuid", "noexec", "nodev", "mode=1777", "size=65536k"]),
        },
        OciMount {
            destination: "/sys".into(),
            kind: "sysfs".into(),
            source: "sysfs".into(),
            options: str_vec(&["nosuid", "noexec", "nodev", "ro"]),
        },
    ]
}

fn str_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Spec types (serialized as the containerd Any payload)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OciSpec {
    pub oci_version: String,
    pub root: OciRoot,
    pub process: OciProcess,
    pub hostname: String,
    pub mounts: Vec<OciMount>,
    pub linux: OciLinux,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OciRoot {
    pub path: String,
    pub readonly: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OciProcess {
    pub terminal: bool,
    pub user: OciUser,
    pub args: Vec<String>,
    pub env: Vec<String>,
    pub cwd: String,
    pub capabilities: OciCapabilities,
    pub no_new_privileges: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OciUser {
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OciCapabilities {
    pub bounding: Vec<String>,
    pub effective: Vec<String>,
    pub permitted: Vec<String>,
    pub inheritable: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OciMount {
    pub destination: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OciLinux {
    pub namespaces: Vec<OciNamespace>,
    pub resources: OciResources,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OciNamespace {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OciResources {
    pub devices: Vec<OciDeviceCgroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OciDeviceCgroup {
    pub allow: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor: Option<i64>,
    pub access: String,
}

// =============================================================================
// Builder
// =============================================================================

/// Builds an immutable [`OciSpec`] for a workspace container or exec process.
#[derive(Debug, Clone)]
pub struct SpecBuilder {
    hostname: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: String,
    binds: Vec<Mount>,
    terminal: bool,
}

impl SpecBuilder {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: "/".to_string(),
            binds: Vec::new(),
            terminal: false,
        }
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        let cwd = cwd.into();
        if !cwd.is_empty() {
            self.cwd = cwd;
        }
        self
    }

    pub fn binds(mut self, binds: Vec<Mount>) -> Self {
        self.binds = binds;
        self
    }

    pub fn terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn build(self) -> OciSpec {
        let mut mounts = default_mounts();
        for bind in &self.binds {
            let mut options = str_vec(&["rbind"]);
            options.push(if bind.read_only { "ro" } else { "rw" }.to_string());
            mounts.push(OciMount {
                destination: bind.destination.clone(),
                kind: "bind".into(),
                source: bind.source.to_string_lossy().into_owned(),
                options,
            });
        }

        OciSpec {
            oci_version: OCI_VERSION.to_string(),
            root: OciRoot {
                path: "rootfs".to_string(),
                readonly: false,
            },
            process: self.build_process(),
            hostname: self.hostname.clone(),
            mounts,
            linux: OciLinux {
                namespaces: ["pid", "ipc", "uts", "mount", "network"]
                    .iter()
                    .map(|k| OciNamespace { kind: k.to_string() })
                    .collect(),
                resources: OciResources {
                    devices: device_cgroup_rules(),
                },
            },
        }
    }

    /// Just the process document, used for containerd exec requests.
    pub fn build_process(&self) -> OciProcess {
        let mut env: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if !self.env.contains_key("PATH") {
            env.push(
                "PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin".to_string(),
            );
        }
        if !self.env.contains_key("TERM") {
            env.push("TERM=xterm-256color".to_string());
        }
        env.sort();

        let caps = str_vec(&BASE_CAPABILITIES);
        OciProcess {
            terminal: self.terminal,
            user: OciUser { uid: 0, gid: 0 },
            args: self.args.clone(),
            env,
            cwd: self.cwd.clone(),
            capabilities: OciCapabilities {
                bounding: caps.clone(),
                effective: caps.clone(),
                permitted: caps.clone(),
                inheritable: caps,
            },
            no_new_privileges: false,
        }
    }
}

fn device_cgroup_rules() -> Vec<OciDeviceCgroup> {
    // Deny-all first, then the explicit character-device allow-list.
    let mut rules = vec![OciDeviceCgroup {
        allow: false,
        kind: None,
        major: None,
        minor: None,
        access: "rwm".to_string(),
    }];
    rules.extend(DEVICE_ALLOW_LIST.iter().map(|(major, minor)| OciDeviceCgroup {
        allow: true,
        kind: Some("c".to_string()),
        major: Some(*major),
        minor: *minor,
        access: "rwm".to_string(),
    }));
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_mounts_cover_interactive_shell_needs() {
        let destinations: Vec<String> = default_mounts().into_iter().map(|m| m.destination).collect();
        for required in ["/proc", "/dev", "/dev/pts", "/dev/shm", "/sys"] {
            assert!(destinations.contains(&required.to_string()), "missing {required}");
        }
    }

    #[test]
    fn sys_mount_is_read_only() {
        let sys = default_mounts().into_iter().find(|m| m.destination == "/sys").unwrap();
        assert!(sys.options.contains(&"ro".to_string()));
    }

    #[test]
    fn binds_carry_ro_flag() {
        let spec = SpecBuilder::new("ws")
            .binds(vec![Mount::bind(PathBuf::from("/src"), "/dst", true)])
            .build();
        let bind = spec.mounts.iter().find(|m| m.destination == "/dst").unwrap();
        assert_eq!(bind.kind, "bind");
        assert!(bind.options.contains(&"ro".to_string()));
    }

    #[test]
    fn capabilities_match_baseline() {
        let spec = SpecBuilder::new("ws").args(vec!["/bin/sh".into()]).build();
        assert_eq!(spec.process.capabilities.bounding.len(), BASE_CAPABILITIES.len());
        assert!(spec.process.capabilities.effective.contains(&"CAP_SYS_CHROOT".to_string()));
    }

    #[test]
    fn device_rules_start_with_deny_all() {
        let rules = device_cgroup_rules();
        assert!(!rules[0].allow);
        assert_eq!(rules.len(), 1 + DEVICE_ALLOW_LIST.len());
    }

    #[test]
    fn path_is_defaulted_not_duplicated() {
        let mut env = HashMap::new();
        env.insert("PATH".to_string(), "/custom".to_string());
        let spec = SpecBuilder::new("ws").env(env).build();
        let paths: Vec<&String> = spec.process.env.iter().filter(|e| e.starts_with("PATH=")).collect();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0], "PATH=/custom");
    }

    #[test]
    fn spec_serializes_with_oci_field_names() {
        let spec = SpecBuilder::new("ws").args(vec!["/bin/sleep".into(), "infinity".into()]).build();
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["ociVersion"], OCI_VERSION);
        assert_eq!(json["mounts"][0]["type"], "proc");
        assert!(json["linux"]["resources"]["devices"].is_array());
    }
}
