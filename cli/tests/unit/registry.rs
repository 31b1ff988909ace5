//! Tests for the data directory layout and registry loading.

#![allow(clippy::expect_used)]

use botfleet_cli::infra::{FleetPaths, load_registry};
use tempfile::TempDir;

#[test]
fn paths_live_under_the_home_directory() {
    let dir = TempDir::new().expect("tempdir");
    let paths = FleetPaths::with_home(dir.path().to_path_buf());

    assert_eq!(paths.tokens(), dir.path().join("tokens.json"));
    assert_eq!(paths.registry(), dir.path().join("agents.yaml"));
}

#[test]
fn missing_registry_falls_back_to_builtin_agents() {
    let dir = TempDir::new().expect("tempdir");

    let registry = load_registry(&dir.path().join("agents.yaml")).expect("load");

    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        ["iq-test", "registration", "crypto", "giveaway"]
    );
}

#[test]
fn registry_file_replaces_builtin_agents() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("agents.yaml");
    std::fs::write(
        &path,
        "agents:\n  - name: shop-bot\n    flow: registration\n    description: Shop sign-up\n",
    )
    .expect("write");

    let registry = load_registry(&path).expect("load");

    assert_eq!(registry.len(), 1);
    let agent = registry.get("shop-bot").expect("shop-bot");
    assert_eq!(agent.flow, "registration");
    assert_eq!(agent.description.as_deref(), Some("Shop sign-up"));
}

#[test]
fn invalid_registry_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("agents.yaml");
    std::fs::write(&path, "agents:\n  - name: Bad_Name\n    flow: crypto\n").expect("write");

    let err = load_registry(&path).expect_err("invalid name");

    assert!(format!("{err:#}").contains("Invalid agent name"));
}
