use relaygrid_core::{GridError, Seconds};
use thiserror::Error;

use crate::device::DeviceId;
use crate::measurement::MeasurementKind;

/// Everything that can go wrong while building a scheme or evaluating faults.
///
/// `Configuration` and `Reference` are raised while a scheme is built and
/// abort it. `TypeMismatch` means a caller handed a device the wrong kind of
/// measurement.
#[derive(Error, Debug)]
pub enum ProtectionError {
    /// A device or zone record is malformed on its own terms
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A record points at something that does not exist
    #[error("reference error: {0}")]
    Reference(String),

    #[error("device {device} expects a {expected} measurement, got {found}")]
    TypeMismatch {
        device: DeviceId,
        expected: &'static str,
        found: MeasurementKind,
    },

    #[error(
        "ambiguous coordination in zone '{zone}': {} tie at {time}",
        join_ids(.tied)
    )]
    AmbiguousCoordination {
        zone: String,
        tied: Vec<DeviceId>,
        time: Seconds,
    },

    #[error("no measurement for device {device} in scenario '{scenario}'")]
    MissingMeasurement { device: DeviceId, scenario: String },

    #[error("invalid fault scenario: {0}")]
    InvalidScenario(String),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type ProtectionResult<T> = Result<T, ProtectionError>;

fn join_ids(ids: &[DeviceId]) -> String {
    ids.iter()
        .map(DeviceId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
