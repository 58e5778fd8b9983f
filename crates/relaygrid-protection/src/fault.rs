//! Fault scenarios presented to a scheme.

use std::collections::BTreeMap;
use std::fmt;

use relaygrid_core::Seconds;
use serde::Serialize;

use crate::device::DeviceId;
use crate::error::{ProtectionError, ProtectionResult};
use crate::measurement::Measurement;

/// Fault severity on a 0.0 to 1.0 scale.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct FaultSeverity(f64);

impl FaultSeverity {
    /// Fault current twice the base level.
    pub const LOW: FaultSeverity = FaultSeverity(1.0 / 9.0);
    /// Five times the base level.
    pub const MEDIUM: FaultSeverity = FaultSeverity(4.0 / 9.0);
    /// Ten times the base level.
    pub const HIGH: FaultSeverity = FaultSeverity(1.0);

    pub fn new(value: f64) -> ProtectionResult<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ProtectionError::InvalidScenario(format!(
                "severity must lie in [0, 1], got {value}"
            )));
        }
        Ok(FaultSeverity(value))
    }

    /// `low`, `medium` or `high`.
    pub fn from_label(label: &str) -> ProtectionResult<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::LOW),
            "medium" => Ok(Self::MEDIUM),
            "high" => Ok(Self::HIGH),
            other => Err(ProtectionError::InvalidScenario(format!(
                "unknown severity label '{other}' (low|medium|high)"
            ))),
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Fault current as a multiple of the base level: 1x at zero severity,
    /// 10x at full severity.
    pub fn current_multiplier(self) -> f64 {
        1.0 + 9.0 * self.0
    }
}

impl fmt::Display for FaultSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// One fault in one zone, with optional scripted readings that take
/// precedence over any propagation model.
#[derive(Debug, Clone, Serialize)]
pub struct FaultScenario {
    pub id: String,
    pub zone: String,
    pub severity: FaultSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Overrides the scheme margin for this scenario
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Seconds>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub measurements: BTreeMap<DeviceId, Measurement>,
}

impl FaultScenario {
    pub fn new(
        id: impl Into<String>,
        zone: impl Into<String>,
        severity: FaultSeverity,
    ) -> ProtectionResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ProtectionError::InvalidScenario(
                "scenario id cannot be empty".into(),
            ));
        }
        Ok(Self {
            id,
            zone: zone.into(),
            severity,
            description: None,
            tags: Vec::new(),
            margin: None,
            measurements: BTreeMap::new(),
        })
    }

    /// Script the reading a device sees in this scenario.
    pub fn with_measurement(mut self, device: impl Into<DeviceId>, measurement: Measurement) -> Self {
        self.measurements.insert(device.into(), measurement);
        self
    }

    pub fn with_margin(mut self, margin: Seconds) -> Self {
        self.margin = Some(margin);
        self
    }

    pub fn scripted(&self, device: &DeviceId) -> Option<&Measurement> {
        self.measurements.get(device)
    }
}
