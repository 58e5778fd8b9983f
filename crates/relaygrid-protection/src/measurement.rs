//! What a device sees at its monitored point.

use std::fmt;
use std::str::FromStr;

use relaygrid_core::{Amperes, PerUnit};
use serde::{Deserialize, Serialize};

/// Direction of power flow relative to the relay's reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Forward,
    Reverse,
}

impl fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowDirection::Forward => write!(f, "forward"),
            FlowDirection::Reverse => write!(f, "reverse"),
        }
    }
}

impl FromStr for FlowDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "fwd" => Ok(FlowDirection::Forward),
            "reverse" | "rev" => Ok(FlowDirection::Reverse),
            other => Err(format!("unknown flow direction '{other}' (forward|reverse)")),
        }
    }
}

/// A single observation presented to a device.
///
/// Serialized with a `kind` tag:
///
/// ```
/// use relaygrid_protection::Measurement;
///
/// let m: Measurement = serde_json::from_str(
///     r#"{"kind": "directional_current", "amps": 420.0, "direction": "forward"}"#,
/// ).unwrap();
/// assert_eq!(m.current_magnitude().unwrap().value(), 420.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measurement {
    Current {
        amps: Amperes,
    },
    DirectionalCurrent {
        amps: Amperes,
        direction: FlowDirection,
    },
    /// Currents at the two ends of a differential zone
    DifferentialCurrent {
        primary: Amperes,
        secondary: Amperes,
    },
    Voltage {
        pu: PerUnit,
    },
    /// Open (true) or hold (false) command for a breaker
    Command {
        open: bool,
    },
}

impl Measurement {
    pub fn current(amps: f64) -> Self {
        Measurement::Current {
            amps: Amperes(amps),
        }
    }

    pub fn directional(amps: f64, direction: FlowDirection) -> Self {
        Measurement::DirectionalCurrent {
            amps: Amperes(amps),
            direction,
        }
    }

    pub fn differential(primary: f64, secondary: f64) -> Self {
        Measurement::DifferentialCurrent {
            primary: Amperes(primary),
            secondary: Amperes(secondary),
        }
    }

    pub fn voltage(pu: f64) -> Self {
        Measurement::Voltage { pu: PerUnit(pu) }
    }

    pub fn command(open: bool) -> Self {
        Measurement::Command { open }
    }

    pub fn kind(&self) -> MeasurementKind {
        match self {
            Measurement::Current { .. } => MeasurementKind::Current,
            Measurement::DirectionalCurrent { .. } => MeasurementKind::DirectionalCurrent,
            Measurement::DifferentialCurrent { .. } => MeasurementKind::DifferentialCurrent,
            Measurement::Voltage { .. } => MeasurementKind::Voltage,
            Measurement::Command { .. } => MeasurementKind::Command,
        }
    }

    /// Current magnitude for plain and directional current readings.
    pub fn current_magnitude(&self) -> Option<Amperes> {
        match self {
            Measurement::Current { amps } | Measurement::DirectionalCurrent { amps, .. } => {
                Some(amps.abs())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Current { amps } => write!(f, "{amps}"),
            Measurement::DirectionalCurrent { amps, direction } => {
                write!(f, "{amps} {direction}")
            }
            Measurement::DifferentialCurrent { primary, secondary } => {
                write!(f, "{primary} / {secondary}")
            }
            Measurement::Voltage { pu } => write!(f, "{pu}"),
            Measurement::Command { open } => {
                write!(f, "{}", if *open { "open" } else { "hold" })
            }
        }
    }
}

/// Variant name of a [`Measurement`], used in mismatch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    Current,
    DirectionalCurrent,
    DifferentialCurrent,
    Voltage,
    Command,
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeasurementKind::Current => "current",
            MeasurementKind::DirectionalCurrent => "directional current",
            MeasurementKind::DifferentialCurrent => "differential current",
            MeasurementKind::Voltage => "voltage",
            MeasurementKind::Command => "command",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_parses_loosely() {
        assert_eq!("Forward".parse::<FlowDirection>(), Ok(FlowDirection::Forward));
        assert_eq!(" rev ".parse::<FlowDirection>(), Ok(FlowDirection::Reverse));
        assert!("sideways".parse::<FlowDirection>().is_err());
    }

    #[test]
    fn yaml_shapes() {
        let m: Measurement = serde_yaml::from_str("kind: voltage\npu: 0.82\n").unwrap();
        assert_eq!(m, Measurement::voltage(0.82));

        let m: Measurement =
            serde_yaml::from_str("kind: differential_current\nprimary: 800\nsecondary: 780\n")
                .unwrap();
        assert_eq!(m.kind(), MeasurementKind::DifferentialCurrent);
    }

    #[test]
    fn magnitude_only_for_currents() {
        assert_eq!(
            Measurement::current(-300.0).current_magnitude(),
            Some(Amperes(300.0))
        );
        assert_eq!(Measurement::voltage(1.0).current_magnitude(), None);
        assert_eq!(Measurement::command(true).current_magnitude(), None);
    }

    #[test]
    fn display() {
        assert_eq!(
            Measurement::directional(250.0, FlowDirection::Reverse).to_string(),
            "250.000 A reverse"
        );
        assert_eq!(Measurement::command(false).to_string(), "hold");
    }
}
