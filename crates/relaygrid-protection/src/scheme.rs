//! A validated set of devices and zones bound to one network.

use std::collections::{BTreeMap, HashSet};

use relaygrid_core::{Diagnostics, ElementRef, Network, Seconds};
use tracing::debug;

use crate::breaker::BreakerBank;
use crate::config::ProtectionConfig;
use crate::device::{DeviceId, DeviceKind, ProtectionDevice, TripRule};
use crate::error::{ProtectionError, ProtectionResult};
use crate::measurement::Measurement;
use crate::zone::{ProtectionZone, ZoneKind};

/// Devices keyed by id, zones in file order, and the required
/// primary/backup margin.
///
/// Every device element exists in the network, every zone spans two
/// connected buses and names only known devices, and every relay coupling
/// points at a breaker. Building fails otherwise.
#[derive(Debug, Clone)]
pub struct ProtectionScheme {
    devices: BTreeMap<DeviceId, ProtectionDevice>,
    zones: Vec<ProtectionZone>,
    margin: Seconds,
}

impl ProtectionScheme {
    /// Validate plain records against `network`.
    ///
    /// All record-level problems (`Configuration`) are reported before any
    /// lookup against the network (`Reference`).
    pub fn build(config: &ProtectionConfig, network: &Network) -> ProtectionResult<Self> {
        let margin = Seconds(config.margin_s);
        let devices = config
            .devices
            .iter()
            .map(|record| record.to_device())
            .collect::<ProtectionResult<Vec<_>>>()?;
        let zones = config
            .zones
            .iter()
            .map(|record| record.to_zone())
            .collect::<ProtectionResult<Vec<_>>>()?;
        Self::from_parts(devices, zones, margin, network)
    }

    /// Assemble a scheme from already-built devices and zones.
    pub fn from_parts(
        devices: Vec<ProtectionDevice>,
        zones: Vec<ProtectionZone>,
        margin: Seconds,
        network: &Network,
    ) -> ProtectionResult<Self> {
        if !margin.is_finite() || margin < Seconds::ZERO {
            return Err(ProtectionError::Configuration(format!(
                "coordination margin must be a non-negative number, got {}",
                margin.value()
            )));
        }

        let mut by_id = BTreeMap::new();
        for device in devices {
            let id = device.id().clone();
            if by_id.insert(id.clone(), device).is_some() {
                return Err(ProtectionError::Configuration(format!(
                    "duplicate device id '{id}'"
                )));
            }
        }

        let mut zone_names = HashSet::new();
        for zone in &zones {
            if !zone_names.insert(zone.name()) {
                return Err(ProtectionError::Configuration(format!(
                    "duplicate zone name '{}'",
                    zone.name()
                )));
            }
            if let Some(unknown) = zone.members().into_iter().find(|id| !by_id.contains_key(*id)) {
                return Err(ProtectionError::Configuration(format!(
                    "zone '{}' lists unknown device '{unknown}'",
                    zone.name()
                )));
            }
        }

        let scheme = Self {
            devices: by_id,
            zones,
            margin,
        };
        scheme.check_references(network)?;
        debug!(
            devices = scheme.devices.len(),
            zones = scheme.zones.len(),
            margin_s = margin.value(),
            "protection scheme built"
        );
        Ok(scheme)
    }

    fn check_references(&self, network: &Network) -> ProtectionResult<()> {
        for device in self.devices.values() {
            if !network.contains(device.element()) {
                return Err(ProtectionError::Reference(format!(
                    "device {} watches {}, which is not in the network",
                    device.id(),
                    device.element()
                )));
            }
            if let Some(breaker) = device.trips() {
                match self.devices.get(breaker) {
                    Some(target) if target.kind() == DeviceKind::Breaker => {}
                    Some(target) => {
                        return Err(ProtectionError::Reference(format!(
                            "device {} trips '{breaker}', which is a {} not a breaker",
                            device.id(),
                            target.kind()
                        )))
                    }
                    None => {
                        return Err(ProtectionError::Reference(format!(
                            "device {} trips unknown breaker '{breaker}'",
                            device.id()
                        )))
                    }
                }
            }
        }
        for zone in &self.zones {
            let [a, b] = zone.buses();
            for bus in [a, b] {
                if network.bus(bus).is_none() {
                    return Err(ProtectionError::Reference(format!(
                        "zone '{}' is bounded by {bus}, which is not in the network",
                        zone.name()
                    )));
                }
            }
            if network.connection_between(a, b).is_none() {
                return Err(ProtectionError::Reference(format!(
                    "zone '{}': {a} and {b} are not joined by a line or transformer",
                    zone.name()
                )));
            }
        }
        Ok(())
    }

    pub fn device(&self, id: &str) -> Option<&ProtectionDevice> {
        self.devices.get(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &ProtectionDevice> {
        self.devices.values()
    }

    pub fn zones(&self) -> &[ProtectionZone] {
        &self.zones
    }

    pub fn zone(&self, name: &str) -> Option<&ProtectionZone> {
        self.zones.iter().find(|zone| zone.name() == name)
    }

    pub fn margin(&self) -> Seconds {
        self.margin
    }

    /// Per-device trip query by id.
    pub fn decide(&self, id: &str, measurement: &Measurement) -> ProtectionResult<bool> {
        self.device(id)
            .ok_or_else(|| ProtectionError::Reference(format!("no device named '{id}'")))?
            .decide(measurement)
    }

    /// All breakers closed, with this scheme's relay couplings.
    pub fn breaker_bank(&self) -> BreakerBank {
        BreakerBank::from_devices(self.devices.values())
    }

    /// Findings that do not stop the scheme from being used.
    pub fn audit(&self, network: &Network) -> Diagnostics {
        let mut diag = Diagnostics::new();

        let zoned: HashSet<&DeviceId> = self.zones.iter().flat_map(|z| z.members()).collect();
        let coupled: HashSet<&DeviceId> = self.devices.values().filter_map(|d| d.trips()).collect();

        for device in self.devices.values() {
            let entity = device.id().as_str();
            match device.kind() {
                DeviceKind::Breaker => {
                    if !coupled.contains(device.id()) {
                        diag.add_warning_with_entity(
                            "coverage",
                            "Breaker is not operated by any relay",
                            entity,
                        );
                    }
                    continue;
                }
                kind if kind.is_relay() && device.trips().is_none() => {
                    diag.add_warning_with_entity(
                        "settings",
                        "Relay is not coupled to a breaker",
                        entity,
                    );
                }
                _ => {}
            }
            if !zoned.contains(device.id()) {
                diag.add_warning_with_entity("coverage", "Device is not assigned to any zone", entity);
            }
            if let Some(rated) = network.rated_current(device.element()) {
                let pickup = match device.rule() {
                    TripRule::Overcurrent { pickup } | TripRule::Directional { pickup, .. } => {
                        Some(*pickup)
                    }
                    TripRule::Fuse { melt } => Some(*melt),
                    _ => None,
                };
                if let Some(pickup) = pickup.filter(|p| *p > rated) {
                    diag.add_warning_with_entity(
                        "settings",
                        &format!("Pickup {pickup} is above the element rating {rated}"),
                        entity,
                    );
                }
            }
            match device.rule() {
                TripRule::Undervoltage { threshold } if threshold.value() >= 1.0 => {
                    diag.add_warning_with_entity(
                        "settings",
                        "Undervoltage threshold at or above nominal trips in normal operation",
                        entity,
                    );
                }
                TripRule::Overvoltage { threshold } if threshold.value() <= 1.0 => {
                    diag.add_warning_with_entity(
                        "settings",
                        "Overvoltage threshold at or below nominal trips in normal operation",
                        entity,
                    );
                }
                _ => {}
            }
        }

        for zone in &self.zones {
            let name = zone.name();
            if zone.primary().is_empty() {
                diag.add_error_with_entity("coverage", "Zone has no primary device", name);
            }
            if zone.backup().is_empty() {
                diag.add_warning_with_entity("coverage", "Zone has no backup device", name);
            }
            let [a, b] = zone.buses();
            let joined_by = network.connection_between(a, b);
            let kind_matches = match (zone.kind(), joined_by) {
                (ZoneKind::Line, Some(ElementRef::Branch(_))) => true,
                (ZoneKind::Transformer, Some(ElementRef::Transformer(_))) => true,
                (ZoneKind::Bus, Some(_)) => true,
                _ => false,
            };
            if !kind_matches {
                diag.add_warning_with_entity(
                    "structure",
                    &format!("Zone kind '{}' does not match the element joining {a} and {b}", zone.kind()),
                    name,
                );
            }

            let slowest_primary = self.max_time(zone.primary());
            let fastest_backup = self.min_time(zone.backup());
            if let (Some(p), Some(b)) = (slowest_primary, fastest_backup) {
                if (b - p).value() + 1e-9 < self.margin.value() {
                    diag.add_warning_with_entity(
                        "coordination",
                        &format!(
                            "Backup settings leave {} after the slowest primary, less than the {} margin",
                            b - p,
                            self.margin
                        ),
                        name,
                    );
                }
            }
        }

        diag
    }

    fn timed<'a>(&'a self, ids: &'a [DeviceId]) -> impl Iterator<Item = f64> + 'a {
        ids.iter()
            .filter_map(|id| self.device(id.as_str()))
            .filter(|d| d.kind() != DeviceKind::Breaker)
            .map(|d| d.operating_time().value())
    }

    fn max_time(&self, ids: &[DeviceId]) -> Option<Seconds> {
        self.timed(ids).reduce(f64::max).map(Seconds)
    }

    fn min_time(&self, ids: &[DeviceId]) -> Option<Seconds> {
        self.timed(ids).reduce(f64::min).map(Seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeviceRecord, ZoneRecord};
    use relaygrid_core::{Branch, BranchId, Bus, BusId, Kilovolts};

    fn network() -> Network {
        let mut network = Network::new();
        for id in 1..=3 {
            network.add_bus(Bus {
                id: BusId::new(id),
                name: format!("Bus {id}"),
                base_kv: Kilovolts(13.8),
            });
        }
        for (id, from, to) in [(1, 1, 2), (2, 2, 3)] {
            network
                .add_branch(
                    Branch::new(
                        BranchId::new(id),
                        format!("Line {from}-{to}"),
                        BusId::new(from),
                        BusId::new(to),
                        0.01,
                        0.1,
                    )
                    .with_rating(Some(10.0)),
                )
                .unwrap();
        }
        network
    }

    fn relay(id: &str, element: ElementRef, pickup: f64, time: f64) -> DeviceRecord {
        DeviceRecord {
            id: id.into(),
            kind: DeviceKind::Overcurrent,
            element,
            pickup: Some(pickup),
            operating_time_s: Some(time),
            direction: None,
            trips: None,
        }
    }

    fn zone(name: &str, buses: [usize; 2], primary: &[&str], backup: &[&str]) -> ZoneRecord {
        ZoneRecord {
            name: name.into(),
            kind: ZoneKind::Line,
            buses: buses.to_vec(),
            primary: primary.iter().map(|s| s.to_string()).collect(),
            backup: backup.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn base_config() -> ProtectionConfig {
        ProtectionConfig {
            devices: vec![
                relay("A", ElementRef::Branch(BranchId::new(1)), 200.0, 0.2),
                relay("B", ElementRef::Bus(BusId::new(1)), 250.0, 0.5),
            ],
            zones: vec![zone("L1-2", [1, 2], &["A"], &["B"])],
            ..ProtectionConfig::default()
        }
    }

    #[test]
    fn builds_valid_scheme() {
        let scheme = ProtectionScheme::build(&base_config(), &network()).unwrap();
        assert_eq!(scheme.devices().count(), 2);
        assert_eq!(scheme.zone("L1-2").unwrap().primary().len(), 1);
        assert_eq!(scheme.margin(), Seconds(0.2));
        assert!(scheme.decide("A", &Measurement::current(200.0)).unwrap());
        assert!(matches!(
            scheme.decide("Z", &Measurement::current(1.0)),
            Err(ProtectionError::Reference(_))
        ));
    }

    #[test]
    fn missing_element_is_reference_error() {
        let mut config = base_config();
        config.devices[1].element = ElementRef::Bus(BusId::new(14));
        let err = ProtectionScheme::build(&config, &network()).unwrap_err();
        assert!(matches!(err, ProtectionError::Reference(_)));
        assert!(err.to_string().contains("Bus#14"));
    }

    #[test]
    fn configuration_errors_come_before_reference_errors() {
        let mut config = base_config();
        config.devices[1].element = ElementRef::Bus(BusId::new(14));
        config.devices.push(relay("A", ElementRef::Bus(BusId::new(2)), 1.0, 0.1));
        let err = ProtectionScheme::build(&config, &network()).unwrap_err();
        assert!(matches!(err, ProtectionError::Configuration(_)), "{err}");
        assert!(err.to_string().contains("duplicate device id 'A'"));
    }

    #[test]
    fn zone_with_unknown_device() {
        let mut config = base_config();
        config.zones[0].backup.push("GHOST".into());
        let err = ProtectionScheme::build(&config, &network()).unwrap_err();
        assert!(matches!(err, ProtectionError::Configuration(_)));
    }

    #[test]
    fn zone_buses_must_be_connected() {
        let mut config = base_config();
        config.zones.push(zone("L1-3", [1, 3], &["A"], &[]));
        let err = ProtectionScheme::build(&config, &network()).unwrap_err();
        assert!(matches!(err, ProtectionError::Reference(_)));
        assert!(err.to_string().contains("not joined"));
    }

    #[test]
    fn coupling_must_target_a_breaker() {
        let mut config = base_config();
        config.devices[0].trips = Some("B".into());
        let err = ProtectionScheme::build(&config, &network()).unwrap_err();
        assert!(err.to_string().contains("not a breaker"));

        config.devices[0].trips = Some("DJ_A".into());
        let err = ProtectionScheme::build(&config, &network()).unwrap_err();
        assert!(err.to_string().contains("unknown breaker"));
    }

    #[test]
    fn negative_margin_rejected() {
        let mut config = base_config();
        config.margin_s = -0.1;
        assert!(matches!(
            ProtectionScheme::build(&config, &network()),
            Err(ProtectionError::Configuration(_))
        ));
    }

    #[test]
    fn audit_reports_soft_findings() {
        let mut config = base_config();
        // 10 MVA at 13.8 kV is about 418 A
        config.devices[0].pickup = Some(500.0);
        config.devices[1].operating_time_s = Some(0.3);
        config.devices.push(DeviceRecord {
            id: "DJ_X".into(),
            kind: DeviceKind::Breaker,
            element: ElementRef::Bus(BusId::new(3)),
            pickup: None,
            operating_time_s: None,
            direction: None,
            trips: None,
        });
        let net = network();
        let scheme = ProtectionScheme::build(&config, &net).unwrap();
        let diag = scheme.audit(&net);

        assert!(!diag.has_errors(), "{diag}");
        let messages: Vec<_> = diag.issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("above the element rating")));
        assert!(messages.iter().any(|m| m.contains("not operated by any relay")));
        assert!(messages.iter().any(|m| m.contains("less than the")));
        assert_eq!(diag.issues_by_category("settings").filter(|i| i.message.contains("not coupled")).count(), 2);
    }
}
