//! Plain-record protection configuration files.
//!
//! ```yaml
//! margin_s: 0.2
//! devices:
//!   - id: 51_B4
//!     kind: overcurrent
//!     element: { type: bus, id: 4 }
//!     pickup: 300
//!     operating_time_s: 0.4
//!     trips: DJ_51_B4
//!   - id: DJ_51_B4
//!     kind: breaker
//!     element: { type: bus, id: 4 }
//! zones:
//!   - name: L4-5
//!     kind: line
//!     buses: [4, 5]
//!     primary: [51_B4]
//! ```
//!
//! Records are checked on their own here ([`DeviceRecord::to_device`],
//! [`ZoneRecord::to_zone`]); cross-checks against the network happen in
//! [`crate::scheme::ProtectionScheme::build`].

use std::fs;
use std::path::Path;

use relaygrid_core::{Amperes, BusId, ElementRef, PerUnit, Seconds};
use serde::{Deserialize, Serialize};

use crate::coordination::DEFAULT_MARGIN;
use crate::device::{DeviceId, DeviceKind, ProtectionDevice, TripRule};
use crate::error::{ProtectionError, ProtectionResult};
use crate::measurement::FlowDirection;
use crate::zone::{ProtectionZone, ZoneKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Required gap between primary and backup operating times
    #[serde(default = "default_margin_s")]
    pub margin_s: f64,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
    #[serde(default)]
    pub zones: Vec<ZoneRecord>,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            name: None,
            margin_s: default_margin_s(),
            devices: Vec::new(),
            zones: Vec::new(),
        }
    }
}

fn default_margin_s() -> f64 {
    DEFAULT_MARGIN.value()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub kind: DeviceKind,
    pub element: ElementRef,
    /// Amperes for current elements, per-unit for voltage elements; unused
    /// by breakers
    #[serde(default)]
    pub pickup: Option<f64>,
    /// Required for every kind except breakers, which act at 0 s
    #[serde(default)]
    pub operating_time_s: Option<f64>,
    /// Directional relays only
    #[serde(default)]
    pub direction: Option<FlowDirection>,
    /// Breaker opened when this relay trips
    #[serde(default)]
    pub trips: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub name: String,
    pub kind: ZoneKind,
    pub buses: Vec<usize>,
    #[serde(default)]
    pub primary: Vec<String>,
    #[serde(default)]
    pub backup: Vec<String>,
}

impl DeviceRecord {
    pub fn to_device(&self) -> ProtectionResult<ProtectionDevice> {
        let unexpected = |field: &str| {
            ProtectionError::Configuration(format!(
                "device {}: {} does not take {field}",
                self.id, self.kind
            ))
        };
        if self.direction.is_some() && self.kind != DeviceKind::Directional {
            return Err(unexpected("a direction"));
        }
        if self.kind == DeviceKind::Breaker && self.pickup.is_some() {
            return Err(unexpected("a pickup setting"));
        }
        let operating_time = match (self.kind, self.operating_time_s) {
            (_, Some(time)) => time,
            (DeviceKind::Breaker, None) => 0.0,
            (kind, None) => {
                return Err(ProtectionError::Configuration(format!(
                    "device {}: {kind} requires operating_time_s",
                    self.id
                )))
            }
        };
        let pickup = || {
            self.pickup.ok_or_else(|| {
                ProtectionError::Configuration(format!(
                    "device {}: {} requires a pickup setting",
                    self.id, self.kind
                ))
            })
        };
        let rule = match self.kind {
            DeviceKind::Overcurrent => TripRule::Overcurrent {
                pickup: Amperes(pickup()?),
            },
            DeviceKind::Directional => TripRule::Directional {
                pickup: Amperes(pickup()?),
                direction: self.direction.ok_or_else(|| {
                    ProtectionError::Configuration(format!(
                        "device {}: directional relay requires a direction",
                        self.id
                    ))
                })?,
            },
            DeviceKind::Differential => TripRule::Differential {
                threshold: Amperes(pickup()?),
            },
            DeviceKind::Undervoltage => TripRule::Undervoltage {
                threshold: PerUnit(pickup()?),
            },
            DeviceKind::Overvoltage => TripRule::Overvoltage {
                threshold: PerUnit(pickup()?),
            },
            DeviceKind::Fuse => TripRule::Fuse {
                melt: Amperes(pickup()?),
            },
            DeviceKind::Breaker => TripRule::Breaker,
        };
        let device = ProtectionDevice::new(
            self.id.as_str(),
            self.element,
            rule,
            Seconds(operating_time),
        )?;
        Ok(match &self.trips {
            Some(breaker) => device.with_breaker(breaker.as_str()),
            None => device,
        })
    }
}

impl ZoneRecord {
    pub fn to_zone(&self) -> ProtectionResult<ProtectionZone> {
        let [a, b] = self.buses[..] else {
            return Err(ProtectionError::Configuration(format!(
                "zone '{}' must list exactly two buses, got {}",
                self.name,
                self.buses.len()
            )));
        };
        ProtectionZone::new(
            self.name.as_str(),
            self.kind,
            [BusId::new(a), BusId::new(b)],
            self.primary.iter().map(|id| DeviceId::new(id.as_str())).collect(),
            self.backup.iter().map(|id| DeviceId::new(id.as_str())).collect(),
        )
    }
}

/// Read a configuration file; YAML, JSON or TOML by extension, YAML then
/// JSON when the extension says nothing.
pub fn load_config_from_path(path: &Path) -> ProtectionResult<ProtectionConfig> {
    let data = fs::read_to_string(path)?;
    let ext = path.extension().and_then(|ext| ext.to_str());
    parse_config(&data, ext)
        .map_err(|err| ProtectionError::Parse(format!("{}: {err}", path.display())))
}

pub fn parse_config(data: &str, extension: Option<&str>) -> Result<ProtectionConfig, String> {
    match extension {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(data).map_err(|err| err.to_string())
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(data).map_err(|err| err.to_string())
        }
        Some(ext) if ext.eq_ignore_ascii_case("toml") => {
            toml::from_str(data).map_err(|err| err.to_string())
        }
        _ => serde_yaml::from_str(data)
            .or_else(|_| serde_json::from_str(data))
            .map_err(|err: serde_json::Error| err.to_string()),
    }
}
