use std::fs;
use std::path::PathBuf;

use relaygrid_io::ieee14::case14;
use relaygrid_protection::config::parse_config;
use relaygrid_protection::{
    AttenuatingPropagation, CoordinationChecker, CoordinationOutcome, DeviceId, FaultSeverity,
    Measurement, ProtectionScheme,
};
use relaygrid_scenarios::{check_against_scheme, load_spec_from_path, resolve_scenarios, validate};
use tempfile::tempdir;

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../data")
        .join(name)
}

fn scheme() -> ProtectionScheme {
    let text = fs::read_to_string(data("ieee14_protection.yaml")).unwrap();
    let config = parse_config(&text, Some("yaml")).unwrap();
    ProtectionScheme::build(&config, &case14()).unwrap()
}

#[test]
fn bundled_scenarios_resolve() {
    let set = load_spec_from_path(&data("fault_scenarios.yaml")).unwrap();
    assert_eq!(set.version, Some(1));
    let scenarios = resolve_scenarios(&set).unwrap();
    assert_eq!(scenarios.len(), 6);

    let first = &scenarios[0];
    assert_eq!(first.id, "f-l1-2");
    assert_eq!(first.severity, FaultSeverity::HIGH);
    assert_eq!(first.tags, vec!["ieee14".to_string()]);

    let light = scenarios.iter().find(|s| s.id == "f-l9-10-light").unwrap();
    assert_eq!(light.tags, vec!["scripted".to_string()]);
    assert_eq!(
        light.scripted(&DeviceId::new("27_B9")),
        Some(&Measurement::voltage(0.95))
    );

    check_against_scheme(&scenarios, &scheme()).unwrap();
}

#[test]
fn bundled_scenarios_run_against_ieee14() {
    let set = load_spec_from_path(&data("fault_scenarios.yaml")).unwrap();
    let scenarios = resolve_scenarios(&set).unwrap();
    let report = CoordinationChecker::new()
        .check_all(&scheme(), &case14(), &scenarios, &AttenuatingPropagation::default())
        .unwrap();

    assert_eq!(report.count(CoordinationOutcome::Coordinated), 4);
    assert_eq!(report.count(CoordinationOutcome::MarginViolation), 1);
    assert_eq!(report.count(CoordinationOutcome::NoTrip), 1);
    assert!((report.score - 4.0 / 6.0).abs() < 1e-12);
}

#[test]
fn json_spec_and_unknown_zone() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("faults.json");
    fs::write(
        &path,
        r#"{"scenarios": [{"scenario_id": "x", "zone": "L3-4", "severity": "low"}]}"#,
    )
    .unwrap();
    let set = load_spec_from_path(&path).unwrap();
    validate(&set).unwrap();
    let scenarios = resolve_scenarios(&set).unwrap();
    let err = check_against_scheme(&scenarios, &scheme()).unwrap_err();
    assert!(err.to_string().contains("L3-4"));
}

#[test]
fn stray_scripted_device_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("faults.yml");
    fs::write(
        &path,
        "scenarios:\n  - scenario_id: x\n    zone: L1-2\n    measurements:\n      50_B7: { kind: current, amps: 900 }\n",
    )
    .unwrap();
    let scenarios = resolve_scenarios(&load_spec_from_path(&path).unwrap()).unwrap();
    let err = check_against_scheme(&scenarios, &scheme()).unwrap_err();
    assert!(err.to_string().contains("50_B7"));
}

#[test]
fn unreadable_spec_reports_path() {
    let err = load_spec_from_path(&data("does_not_exist.yaml")).unwrap_err();
    assert!(err.to_string().contains("does_not_exist.yaml"));
}

#[test]
fn scripted_reading_of_wrong_kind_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("faults.yaml");
    fs::write(
        &path,
        "scenarios:\n  - scenario_id: x\n    zone: L2-4\n    measurements:\n      51_B4: { kind: voltage, pu: 0.5 }\n",
    )
    .unwrap();
    let scenarios = resolve_scenarios(&load_spec_from_path(&path).unwrap()).unwrap();
    let err = check_against_scheme(&scenarios, &scheme()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("'x'"), "{message}");
    assert!(message.contains("voltage reading for '51_B4'"), "{message}");
    assert!(message.contains("expects a current measurement"), "{message}");
}
