// ABOUTME: Mount planning for DVM workspaces.
// ABOUTME: Every source is constructed under ~/.devopsmaestro/workspaces/<slug>/.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Root directory (under $HOME) holding all workspace state.
pub const WORKSPACES_ROOT: &str = ".devopsmaestro/workspaces";

/// Container path the repository is mounted at.
pub const REPO_DESTINATION: &str = "/workspace";

/// Read-write per-tool data volumes: (subdir of `<ws>/volume/`, container path).
pub const DATA_VOLUMES: [(&str, &str); 3] = [
    ("nvim-data", "/home/dev/.local/share/nvim"),
    ("nvim-state", "/home/dev/.local/state/nvim"),
    ("cache", "/home/dev/.cache"),
];

/// Read-only generated-config binds: (subdir of `<ws>/.dvm/`, container path).
pub const CONFIG_BINDS: [(&str, &str); 3] = [
    ("nvim", "/home/dev/.config/nvim"),
    ("shell", "/home/dev/.config/shell"),
    ("starship", "/home/dev/.config/starship"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MountError {
    #[error("workspace slug cannot be empty")]
    EmptySlug,

    #[error("workspace slug contains a path separator or traversal: {0}")]
    UnsafeSlug(String),
}

/// Kind of mount. Only bind mounts exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    Bind,
}

/// A single bind mount from the host into the workspace container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: PathBuf,
    pub destination: String,
    pub kind: MountKind,
    pub read_only: bool,
}

impl Mount {
    pub fn bind(source: PathBuf, destination: impl Into<String>, read_only: bool) -> Self {
        Self {
            source,
            destination: destination.into(),
            kind: MountKind::Bind,
            read_only,
        }
    }
}

/// Computes the full mount set for a workspace from its slug alone.
///
/// Containment is enforced by construction: the slug is validated against
/// path separators and traversal, and every source path is joined from the
/// workspace directory, so no mount can reference `~/.ssh`, `~/.gitconfig`,
/// `/etc` or any other host path outside the workspace tree.
#[derive(Debug, Clone)]
pub struct MountPlanner {
    home: PathBuf,
}

impl MountPlanner {
    pub fn new() -> Self {
        Self {
            home: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
        }
    }

    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Host directory that owns all state for the given workspace.
    pub fn workspace_dir(&self, slug: &str) -> Result<PathBuf, MountError> {
        validate_slug(slug)?;
        Ok(self.home.join(WORKSPACES_ROOT).join(slug))
    }

    /// The repo mount, data volumes and generated-config binds for a slug.
    pub fn plan(&self, slug: &str) -> Result<Vec<Mount>, MountError> {
        let ws = self.workspace_dir(slug)?;

        let mut mounts = Vec::with_capacity(1 + DATA_VOLUMES.len() + CONFIG_BINDS.len());
        mounts.push(Mount::bind(ws.join("repo"), REPO_DESTINATION, false));

        for (subdir, dest) in DATA_VOLUMES {
            mounts.push(Mount::bind(ws.join("volume").join(subdir), dest, false));
        }
        for (subdir, dest) in CONFIG_BINDS {
            mounts.push(Mount::bind(ws.join(".dvm").join(subdir), dest, true));
        }

        Ok(mounts)
    }
}

impl Default for MountPlanner {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_slug(slug: &str) -> Result<(), MountError> {
    if slug.is_empty() {
        return Err(MountError::EmptySlug);
    }
    if slug.contains('/') || slug.contains('\\') || slug.contains("..") || Path::new(slug).is_absolute() {
        return Err(MountError::UnsafeSlug(slug.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> MountPlanner {
        MountPlanner::with_home("/home/dev")
    }

    #[test]
    fn repo_mount_is_read_write_at_workspace() {
        let mounts = planner().plan("api-main").unwrap();
        let repo = &mounts[0];
        assert_eq!(repo.source, PathBuf::from("/home/dev/.devopsmaestro/workspaces/api-main/repo"));
        assert_eq!(repo.destination, "/workspace");
        assert!(!repo.read_only);
    }

    #[test]
    fn config_binds_are_read_only() {
        let mounts = planner().plan("api-main").unwrap();
        for mount in mounts.iter().filter(|m| m.source.to_string_lossy().contains("/.dvm/")) {
            assert!(mount.read_only, "config bind {:?} must be read-only", mount.source);
        }
    }

    #[test]
    fn every_source_stays_inside_the_workspace_dir() {
        let ws = planner().workspace_dir("api-main").unwrap();
        for mount in planner().plan("api-main").unwrap() {
            assert!(mount.source.starts_with(&ws), "{:?} escapes {:?}", mount.source, ws);
        }
    }

    #[test]
    fn traversal_slug_is_rejected() {
        assert!(planner().plan("../etc").is_err());
        assert!(planner().plan("a/b").is_err());
        assert!(planner().plan("").is_err());
    }
}
