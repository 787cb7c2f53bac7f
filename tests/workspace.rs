// ABOUTME: Cross-module integration tests: naming feeds mount planning and
// ABOUTME: start options end to end, without touching an engine.

use dvm::mounts::{MountPlanner, REPO_DESTINATION};
use dvm::runtime::options::{IMAGE_LABEL, MANAGED_LABEL, StartOptions};
use std::collections::HashMap;
use std::path::PathBuf;

fn start_options() -> StartOptions {
    StartOptions {
        image_name: "dvm/api:2024-06".to_string(),
        workspace_name: "main".to_string(),
        app_name: Some("api".to_string()),
        domain_name: Some("billing".to_string()),
        ecosystem_name: Some("acme".to_string()),
        ..Default::default()
    }
}

#[test]
fn container_name_is_a_valid_mount_slug() {
    let opts = start_options();
    let name = opts.compute_container_name().unwrap();
    assert_eq!(name, "dvm-acme-billing-api-main");

    // The derived name doubles as the workspace state directory name, so the
    // planner must accept it and keep every source under that directory.
    let planner = MountPlanner::with_home("/home/dev");
    let ws_dir = planner.workspace_dir(&name).unwrap();
    let mounts = planner.plan(&name).unwrap();
    assert!(!mounts.is_empty());
    for mount in &mounts {
        assert!(mount.source.starts_with(&ws_dir));
    }
}

#[test]
fn repo_mount_lands_at_workspace_destination() {
    let planner = MountPlanner::with_home("/home/dev");
    let mounts = planner.plan("dvm-api-main").unwrap();
    let repo = mounts.iter().find(|m| m.destination == REPO_DESTINATION).unwrap();
    assert!(!repo.read_only);
    assert_eq!(
        repo.source,
        PathBuf::from("/home/dev/.devopsmaestro/workspaces/dvm-api-main/repo")
    );
}

#[test]
fn sensitive_host_paths_are_never_planned() {
    let planner = MountPlanner::with_home("/home/dev");
    let mounts = planner.plan("dvm-api-main").unwrap();
    for mount in &mounts {
        let source = mount.source.to_string_lossy();
        assert!(!source.contains(".ssh"), "{source} leaks ~/.ssh");
        assert!(!source.contains(".gitconfig"), "{source} leaks ~/.gitconfig");
        assert!(!source.starts_with("/etc"), "{source} leaks /etc");
    }
}

#[test]
fn labels_record_enough_to_list_and_recreate() {
    let opts = start_options();
    let labels: HashMap<String, String> = opts.labels();
    // Listing filters on the managed label; recreation compares the image
    // label. Both must always be present.
    assert_eq!(labels.get(MANAGED_LABEL).map(String::as_str), Some("true"));
    assert_eq!(
        labels.get(IMAGE_LABEL).map(String::as_str),
        Some("dvm/api:2024-06")
    );
}
