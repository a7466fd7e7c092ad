use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    crate_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

#[test]
fn demo_config_validates() {
    let path = workspace_root().join("demos/design.yaml");
    let result = dh_project::load_yaml(&path);
    assert!(
        result.is_ok(),
        "demo config failed validation: {} => {:?}",
        path.display(),
        result.err()
    );
}

#[test]
fn demo_scenario_loads() {
    let path = workspace_root().join("demos/scenario.yaml");
    let scenario = dh_project::load_scenario(&path).unwrap();
    assert_eq!(scenario.roads.len(), 6);
    assert_eq!(scenario.buildings.len(), 5);
    let buildings = scenario.building_features().unwrap();
    let total: f64 = buildings.iter().map(|b| b.record.demand_kw()).sum();
    assert_eq!(total, 140.0);
}
