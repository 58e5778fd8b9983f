use std::fs;

use relaygrid_io::ieee14::case14;
use relaygrid_protection::{load_config_from_path, ProtectionError, ProtectionScheme};
use tempfile::tempdir;

#[test]
fn json_and_toml_configs_build_the_same_scheme() {
    let dir = tempdir().unwrap();
    let json = dir.path().join("scheme.json");
    fs::write(
        &json,
        r#"{
            "margin_s": 0.25,
            "devices": [
                {"id": "50_B7", "kind": "overcurrent", "element": {"type": "bus", "id": 7},
                 "pickup": 600, "operating_time_s": 0.05, "trips": "DJ_50_B7"},
                {"id": "DJ_50_B7", "kind": "breaker", "element": {"type": "bus", "id": 7}}
            ],
            "zones": [
                {"name": "L7-9", "kind": "line", "buses": [7, 9], "primary": ["50_B7"]}
            ]
        }"#,
    )
    .unwrap();
    let toml = dir.path().join("scheme.toml");
    fs::write(
        &toml,
        r#"
margin_s = 0.25

[[devices]]
id = "50_B7"
kind = "overcurrent"
element = { type = "bus", id = 7 }
pickup = 600
operating_time_s = 0.05
trips = "DJ_50_B7"

[[devices]]
id = "DJ_50_B7"
kind = "breaker"
element = { type = "bus", id = 7 }

[[zones]]
name = "L7-9"
kind = "line"
buses = [7, 9]
primary = ["50_B7"]
"#,
    )
    .unwrap();

    let network = case14();
    for path in [&json, &toml] {
        let config = load_config_from_path(path).unwrap();
        let scheme = ProtectionScheme::build(&config, &network).unwrap();
        assert_eq!(scheme.margin().value(), 0.25);
        assert_eq!(scheme.devices().count(), 2);
        let bank = scheme.breaker_bank();
        assert_eq!(bank.coupled_breaker("50_B7").map(|id| id.as_str()), Some("DJ_50_B7"));
    }
}

#[test]
fn unreadable_and_malformed_files() {
    let dir = tempdir().unwrap();
    let err = load_config_from_path(&dir.path().join("missing.yaml")).unwrap_err();
    assert!(matches!(err, ProtectionError::Io(_)));

    let bad = dir.path().join("bad.yaml");
    fs::write(&bad, "devices: [ { id: 51_B4, kind: teleporter } ]").unwrap();
    let err = load_config_from_path(&bad).unwrap_err();
    assert!(matches!(err, ProtectionError::Parse(_)));
    assert!(err.to_string().contains("bad.yaml"));
}
