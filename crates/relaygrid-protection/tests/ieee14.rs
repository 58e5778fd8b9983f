use relaygrid_core::{Amperes, BusId, ElementRef, GenId, Seconds};
use relaygrid_io::ieee14::case14;
use relaygrid_protection::config::parse_config;
use relaygrid_protection::{
    AttenuatingPropagation, CoordinationChecker, CoordinationOutcome, DeviceKind, DeviceRecord,
    FaultScenario, FlowDirection, FaultSeverity, Measurement, ProtectionConfig, ProtectionDevice,
    ProtectionError, ProtectionScheme, RecordingTelemetry, TelemetryEvent, ZoneKind, ZoneRecord,
};

const SCHEME: &str = include_str!("../../../data/ieee14_protection.yaml");

fn scheme() -> ProtectionScheme {
    let config = parse_config(SCHEME, Some("yaml")).unwrap();
    ProtectionScheme::build(&config, &case14()).unwrap()
}

#[test]
fn overcurrent_on_bus_seven() {
    let network = case14();
    assert_eq!(network.stats().num_buses, 14);

    let relay = ProtectionDevice::overcurrent(
        "50_B7",
        ElementRef::Bus(BusId::new(7)),
        Amperes(600.0),
        Seconds(0.05),
    )
    .unwrap();
    assert!(network.contains(relay.element()));
    assert!(relay.decide(&Measurement::current(650.0)).unwrap());
    assert!(!relay.decide(&Measurement::current(500.0)).unwrap());

    let scheme = scheme();
    assert!(scheme.decide("50_B7", &Measurement::current(650.0)).unwrap());
    assert!(!scheme.decide("50_B7", &Measurement::current(500.0)).unwrap());
}

#[test]
fn demo_scheme_loads_and_audits() {
    let network = case14();
    let scheme = scheme();
    assert_eq!(scheme.devices().count(), 18);
    assert_eq!(
        scheme
            .devices()
            .filter(|d| d.kind() == DeviceKind::Breaker)
            .count(),
        9
    );
    assert_eq!(scheme.zones().len(), 6);
    assert_eq!(scheme.breaker_bank().len(), 9);

    let diag = scheme.audit(&network);
    assert!(!diag.has_errors(), "{diag}");
    assert_eq!(diag.issues_by_category("coverage").count(), 2);
    assert_eq!(diag.issues_by_category("coordination").count(), 1);
    assert_eq!(
        diag.issues_by_category("coordination").next().unwrap().entity.as_deref(),
        Some("L6-13")
    );
}

#[test]
fn missing_element_fails_before_any_decision() {
    let mut config: ProtectionConfig = parse_config(SCHEME, Some("yaml")).unwrap();
    config.devices.push(DeviceRecord {
        id: "51_B15".into(),
        kind: DeviceKind::Overcurrent,
        element: ElementRef::Bus(BusId::new(15)),
        pickup: Some(300.0),
        operating_time_s: Some(0.4),
        direction: None,
        trips: None,
    });
    let err = ProtectionScheme::build(&config, &case14()).unwrap_err();
    assert!(matches!(err, ProtectionError::Reference(_)), "{err}");

    let mut config: ProtectionConfig = parse_config(SCHEME, Some("yaml")).unwrap();
    config.devices.push(DeviceRecord {
        id: "DISJ_G9".into(),
        kind: DeviceKind::Breaker,
        element: ElementRef::Gen(GenId::new(9)),
        pickup: None,
        operating_time_s: None,
        direction: None,
        trips: None,
    });
    assert!(matches!(
        ProtectionScheme::build(&config, &case14()),
        Err(ProtectionError::Reference(_))
    ));
}

#[test]
fn zone_across_unconnected_buses_is_rejected() {
    let mut config: ProtectionConfig = parse_config(SCHEME, Some("yaml")).unwrap();
    config.zones.push(ZoneRecord {
        name: "B1-B14".into(),
        kind: ZoneKind::Bus,
        buses: vec![1, 14],
        primary: vec!["87T_B1".into()],
        backup: vec![],
    });
    let err = ProtectionScheme::build(&config, &case14()).unwrap_err();
    assert!(matches!(err, ProtectionError::Reference(_)));
}

#[test]
fn scripted_margins() {
    let network = case14();
    let scheme = scheme();
    let checker = CoordinationChecker::new();

    // Primary 0.2 s, backup 0.4 s on L2-4.
    let scenario = FaultScenario::new("scripted", "L2-4", FaultSeverity::HIGH)
        .unwrap()
        .with_measurement(
            "67_B2",
            Measurement::directional(900.0, FlowDirection::Forward),
        )
        .with_measurement("51_B4", Measurement::current(900.0));
    let result = checker
        .check_coordination(&scheme, &network, "L2-4", &scenario, &AttenuatingPropagation::default())
        .unwrap();
    assert_eq!(result.outcome, CoordinationOutcome::Coordinated);
    assert_eq!(result.primary.as_ref().unwrap().device.as_str(), "67_B2");
    assert_eq!(result.backup.as_ref().unwrap().device.as_str(), "51_B4");
    assert_eq!(result.pairs.len(), 1);
    assert!(result.pairs[0].passed);

    // Tighter requirement turns the same sequence into a violation.
    let strict = CoordinationChecker::new().with_margin(Seconds(0.3));
    let result = strict
        .check_coordination(&scheme, &network, "L2-4", &scenario, &AttenuatingPropagation::default())
        .unwrap();
    assert_eq!(result.outcome, CoordinationOutcome::MarginViolation);
    assert!(!result.passed());
}

#[test]
fn nothing_trips_is_no_trip() {
    let network = case14();
    let scheme = scheme();
    let scenario = FaultScenario::new("quiet", "L2-4", FaultSeverity::LOW)
        .unwrap()
        .with_measurement(
            "67_B2",
            Measurement::directional(900.0, FlowDirection::Reverse),
        )
        .with_measurement("51_B4", Measurement::current(10.0));
    let result = CoordinationChecker::new()
        .check_coordination(&scheme, &network, "L2-4", &scenario, &AttenuatingPropagation::default())
        .unwrap();
    assert_eq!(result.outcome, CoordinationOutcome::NoTrip);
    assert!(!result.passed());
    assert!(result.tripped.is_empty());
    assert!(result.opened_breakers.is_empty());
}

#[test]
fn unknown_zone_is_reference_error() {
    let scenario = FaultScenario::new("f", "L99-100", FaultSeverity::HIGH).unwrap();
    let err = CoordinationChecker::new()
        .check_coordination(&scheme(), &case14(), "L99-100", &scenario, &AttenuatingPropagation::default())
        .unwrap_err();
    assert!(matches!(err, ProtectionError::Reference(_)));
}

#[test]
fn batch_run_with_isolated_breakers() {
    let network = case14();
    let scheme = scheme();
    let recorder = RecordingTelemetry::new();
    let checker = CoordinationChecker::new().with_telemetry(recorder.clone());

    let severity = FaultSeverity::new(0.5).unwrap();
    let scenarios = vec![
        FaultScenario::new("f-l1-2", "L1-2", FaultSeverity::HIGH).unwrap(),
        FaultScenario::new("f-l2-4", "L2-4", severity).unwrap(),
        FaultScenario::new("f-t4-7", "T4-7", FaultSeverity::LOW).unwrap(),
        FaultScenario::new("f-l6-13", "L6-13", severity).unwrap(),
        FaultScenario::new("f-l9-14", "L9-14", FaultSeverity::new(0.3).unwrap()).unwrap(),
    ];
    let report = checker
        .check_all(&scheme, &network, &scenarios, &AttenuatingPropagation::default())
        .unwrap();

    assert_eq!(report.results.len(), 5);
    let outcome = |id: &str| {
        report
            .results
            .iter()
            .find(|r| r.scenario == id)
            .map(|r| r.outcome)
            .unwrap()
    };
    assert_eq!(outcome("f-l1-2"), CoordinationOutcome::Coordinated);
    assert_eq!(outcome("f-l2-4"), CoordinationOutcome::Coordinated);
    assert_eq!(outcome("f-t4-7"), CoordinationOutcome::Coordinated);
    assert_eq!(outcome("f-l6-13"), CoordinationOutcome::MarginViolation);
    assert_eq!(outcome("f-l9-14"), CoordinationOutcome::Coordinated);
    assert!((report.score - 0.8).abs() < 1e-12);

    // Breakers opened in one scenario never show up in another.
    let l2_4 = report.results.iter().find(|r| r.scenario == "f-l2-4").unwrap();
    let mut opened: Vec<&str> = l2_4.opened_breakers.iter().map(|id| id.as_str()).collect();
    opened.sort_unstable();
    assert_eq!(opened, vec!["DJ_51_B4", "DJ_67_B2"]);
    let l9_14 = report.results.iter().find(|r| r.scenario == "f-l9-14").unwrap();
    let opened: Vec<&str> = l9_14.opened_breakers.iter().map(|id| id.as_str()).collect();
    assert_eq!(opened, vec!["DJ_27_B9"]);

    let events = recorder.events();
    assert_eq!(
        events.last(),
        Some(&TelemetryEvent::RunFinished {
            scenarios: 5,
            passed: 4
        })
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, TelemetryEvent::CoordinationChecked { .. }))
            .count(),
        5
    );
}

#[test]
fn relay_without_operating_time_cannot_become_primary() {
    let mut config: ProtectionConfig = parse_config(SCHEME, Some("yaml")).unwrap();
    let backup = config
        .devices
        .iter_mut()
        .find(|d| d.id == "51_B4")
        .unwrap();
    backup.operating_time_s = None;
    let err = ProtectionScheme::build(&config, &case14()).unwrap_err();
    assert!(matches!(err, ProtectionError::Configuration(_)), "{err}");
    assert!(err.to_string().contains("51_B4"));
}
