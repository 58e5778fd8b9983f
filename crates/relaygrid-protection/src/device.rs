//! Protection devices and their trip rules.
//!
//! A [`ProtectionDevice`] pairs a monitored network element with one
//! [`TripRule`]. Devices are immutable once built; the only mutable runtime
//! state in the model is breaker position, which lives in
//! [`crate::breaker::BreakerState`].

use std::borrow::Borrow;
use std::fmt;

use relaygrid_core::{Amperes, ElementRef, PerUnit, Seconds};
use serde::{Deserialize, Serialize};

use crate::error::{ProtectionError, ProtectionResult};
use crate::measurement::{FlowDirection, Measurement};

/// Unique device tag, e.g. `51_B4` or `DJ_67_B2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        DeviceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        DeviceId::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        DeviceId(id)
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Overcurrent,
    Directional,
    Differential,
    Undervoltage,
    Overvoltage,
    Fuse,
    Breaker,
}

impl DeviceKind {
    /// IEEE C37.2 device function number.
    pub fn ansi_code(&self) -> &'static str {
        match self {
            DeviceKind::Overcurrent => "51",
            DeviceKind::Directional => "67",
            DeviceKind::Differential => "87",
            DeviceKind::Undervoltage => "27",
            DeviceKind::Overvoltage => "59",
            DeviceKind::Fuse => "FU",
            DeviceKind::Breaker => "52",
        }
    }

    /// Relays can be coupled to a breaker; fuses and breakers cannot.
    pub fn is_relay(&self) -> bool {
        !matches!(self, DeviceKind::Fuse | DeviceKind::Breaker)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Overcurrent => "overcurrent",
            DeviceKind::Directional => "directional",
            DeviceKind::Differential => "differential",
            DeviceKind::Undervoltage => "undervoltage",
            DeviceKind::Overvoltage => "overvoltage",
            DeviceKind::Fuse => "fuse",
            DeviceKind::Breaker => "breaker",
        };
        f.write_str(name)
    }
}

/// Kind-specific decision strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum TripRule {
    /// Trip when current >= pickup
    Overcurrent { pickup: Amperes },
    /// Trip when current >= pickup and flow runs in `direction`
    Directional {
        pickup: Amperes,
        direction: FlowDirection,
    },
    /// Trip when |primary - secondary| >= threshold
    Differential { threshold: Amperes },
    /// Trip when voltage <= threshold
    Undervoltage { threshold: PerUnit },
    /// Trip when voltage >= threshold
    Overvoltage { threshold: PerUnit },
    /// Melt when current >= melt rating
    Fuse { melt: Amperes },
    /// Follow the open command
    Breaker,
}

impl TripRule {
    pub fn kind(&self) -> DeviceKind {
        match self {
            TripRule::Overcurrent { .. } => DeviceKind::Overcurrent,
            TripRule::Directional { .. } => DeviceKind::Directional,
            TripRule::Differential { .. } => DeviceKind::Differential,
            TripRule::Undervoltage { .. } => DeviceKind::Undervoltage,
            TripRule::Overvoltage { .. } => DeviceKind::Overvoltage,
            TripRule::Fuse { .. } => DeviceKind::Fuse,
            TripRule::Breaker => DeviceKind::Breaker,
        }
    }

    /// Measurement the rule is evaluated against, for error reports.
    pub fn expected_measurement(&self) -> &'static str {
        match self {
            TripRule::Overcurrent { .. } | TripRule::Fuse { .. } => "current",
            TripRule::Directional { .. } => "directional current",
            TripRule::Differential { .. } => "differential current",
            TripRule::Undervoltage { .. } | TripRule::Overvoltage { .. } => "voltage",
            TripRule::Breaker => "command",
        }
    }

    /// Pickup as a plain number in the rule's own unit (A or pu).
    pub fn setting(&self) -> Option<f64> {
        match self {
            TripRule::Overcurrent { pickup } | TripRule::Directional { pickup, .. } => {
                Some(pickup.value())
            }
            TripRule::Differential { threshold } => Some(threshold.value()),
            TripRule::Undervoltage { threshold } | TripRule::Overvoltage { threshold } => {
                Some(threshold.value())
            }
            TripRule::Fuse { melt } => Some(melt.value()),
            TripRule::Breaker => None,
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self.setting() {
            Some(value) if !value.is_finite() => {
                Err(format!("{} setting is not a number", self.kind()))
            }
            Some(value) if value <= 0.0 => {
                Err(format!("{} setting must be positive, got {value}", self.kind()))
            }
            _ => Ok(()),
        }
    }

    /// `None` when the measurement is of the wrong kind for this rule.
    pub fn evaluate(&self, measurement: &Measurement) -> Option<bool> {
        match (self, measurement) {
            (TripRule::Overcurrent { pickup }, m) => m.current_magnitude().map(|i| i >= *pickup),
            (TripRule::Fuse { melt }, m) => m.current_magnitude().map(|i| i >= *melt),
            (
                TripRule::Directional { pickup, direction },
                Measurement::DirectionalCurrent {
                    amps,
                    direction: seen,
                },
            ) => Some(amps.abs() >= *pickup && seen == direction),
            (
                TripRule::Differential { threshold },
                Measurement::DifferentialCurrent { primary, secondary },
            ) => Some((*primary - *secondary).abs() >= *threshold),
            (TripRule::Undervoltage { threshold }, Measurement::Voltage { pu }) => {
                Some(pu <= threshold)
            }
            (TripRule::Overvoltage { threshold }, Measurement::Voltage { pu }) => {
                Some(pu >= threshold)
            }
            (TripRule::Breaker, Measurement::Command { open }) => Some(*open),
            _ => None,
        }
    }
}

/// A relay, fuse or breaker attached to one network element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtectionDevice {
    id: DeviceId,
    element: ElementRef,
    rule: TripRule,
    operating_time: Seconds,
    #[serde(skip_serializing_if = "Option::is_none")]
    trips: Option<DeviceId>,
}

impl ProtectionDevice {
    /// Build a device, rejecting empty ids, non-positive or non-finite
    /// settings and negative operating times.
    pub fn new(
        id: impl Into<DeviceId>,
        element: ElementRef,
        rule: TripRule,
        operating_time: Seconds,
    ) -> ProtectionResult<Self> {
        let id = id.into();
        if id.as_str().trim().is_empty() {
            return Err(ProtectionError::Configuration(
                "device id cannot be empty".into(),
            ));
        }
        rule.validate()
            .map_err(|msg| ProtectionError::Configuration(format!("device {id}: {msg}")))?;
        if !operating_time.is_finite() || operating_time < Seconds::ZERO {
            return Err(ProtectionError::Configuration(format!(
                "device {id}: operating time must be a non-negative number of seconds"
            )));
        }
        Ok(Self {
            id,
            element,
            rule,
            operating_time,
            trips: None,
        })
    }

    pub fn overcurrent(
        id: impl Into<DeviceId>,
        element: ElementRef,
        pickup: Amperes,
        operating_time: Seconds,
    ) -> ProtectionResult<Self> {
        Self::new(id, element, TripRule::Overcurrent { pickup }, operating_time)
    }

    pub fn directional(
        id: impl Into<DeviceId>,
        element: ElementRef,
        pickup: Amperes,
        direction: FlowDirection,
        operating_time: Seconds,
    ) -> ProtectionResult<Self> {
        Self::new(
            id,
            element,
            TripRule::Directional { pickup, direction },
            operating_time,
        )
    }

    pub fn differential(
        id: impl Into<DeviceId>,
        element: ElementRef,
        threshold: Amperes,
        operating_time: Seconds,
    ) -> ProtectionResult<Self> {
        Self::new(id, element, TripRule::Differential { threshold }, operating_time)
    }

    pub fn breaker(id: impl Into<DeviceId>, element: ElementRef) -> ProtectionResult<Self> {
        Self::new(id, element, TripRule::Breaker, Seconds::ZERO)
    }

    /// Couple this relay to the breaker it opens when it trips.
    pub fn with_breaker(mut self, breaker: impl Into<DeviceId>) -> Self {
        self.trips = Some(breaker.into());
        self
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn element(&self) -> ElementRef {
        self.element
    }

    pub fn rule(&self) -> &TripRule {
        &self.rule
    }

    pub fn kind(&self) -> DeviceKind {
        self.rule.kind()
    }

    pub fn operating_time(&self) -> Seconds {
        self.operating_time
    }

    /// Breaker this relay opens, if coupled.
    pub fn trips(&self) -> Option<&DeviceId> {
        self.trips.as_ref()
    }

    /// Trip decision for one measurement. Pure: the same inputs always give
    /// the same answer.
    pub fn decide(&self, measurement: &Measurement) -> ProtectionResult<bool> {
        self.rule
            .evaluate(measurement)
            .ok_or_else(|| ProtectionError::TypeMismatch {
                device: self.id.clone(),
                expected: self.rule.expected_measurement(),
                found: measurement.kind(),
            })
    }
}
