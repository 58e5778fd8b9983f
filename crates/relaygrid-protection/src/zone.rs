use std::fmt;

use relaygrid_core::BusId;
use serde::{Deserialize, Serialize};

use crate::device::DeviceId;
use crate::error::{ProtectionError, ProtectionResult};

/// What the zone between the two boundary buses protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Bus,
    Line,
    Transformer,
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneKind::Bus => f.write_str("bus"),
            ZoneKind::Line => f.write_str("line"),
            ZoneKind::Transformer => f.write_str("transformer"),
        }
    }
}

/// Portion of the network bounded by exactly two buses, with the devices
/// responsible for clearing faults inside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtectionZone {
    name: String,
    kind: ZoneKind,
    buses: [BusId; 2],
    primary: Vec<DeviceId>,
    backup: Vec<DeviceId>,
}

impl ProtectionZone {
    pub fn new(
        name: impl Into<String>,
        kind: ZoneKind,
        buses: [BusId; 2],
        primary: Vec<DeviceId>,
        backup: Vec<DeviceId>,
    ) -> ProtectionResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProtectionError::Configuration(
                "zone name cannot be empty".into(),
            ));
        }
        if buses[0] == buses[1] {
            return Err(ProtectionError::Configuration(format!(
                "zone '{name}' must span two distinct buses, got {} twice",
                buses[0]
            )));
        }
        Ok(Self {
            name,
            kind,
            buses,
            primary,
            backup,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ZoneKind {
        self.kind
    }

    pub fn buses(&self) -> [BusId; 2] {
        self.buses
    }

    pub fn primary(&self) -> &[DeviceId] {
        &self.primary
    }

    pub fn backup(&self) -> &[DeviceId] {
        &self.backup
    }

    /// Primary devices followed by backups, each id once.
    pub fn members(&self) -> Vec<&DeviceId> {
        let mut members: Vec<&DeviceId> = Vec::new();
        for id in self.primary.iter().chain(&self.backup) {
            if !members.contains(&id) {
                members.push(id);
            }
        }
        members
    }

    pub fn covers_bus(&self, bus: BusId) -> bool {
        self.buses.contains(&bus)
    }
}
