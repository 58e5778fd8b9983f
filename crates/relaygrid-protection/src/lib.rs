//! # relaygrid-protection: Protection Devices and Coordination
//!
//! Typed protection devices attached to a [`relaygrid_core::Network`], and a
//! checker that verifies primary/backup ordering for faults.
//!
//! ## Pipeline
//!
//! 1. Load plain records with [`config::load_config_from_path`].
//! 2. Validate them against a network with [`ProtectionScheme::build`]. Bad
//!    records fail with `Configuration`; dangling references with
//!    `Reference`.
//! 3. Describe faults as [`FaultScenario`]s and pick a
//!    [`FaultPropagation`] model.
//! 4. Run [`CoordinationChecker::check_coordination`] for one zone or
//!    [`CoordinationChecker::check_all`] for a batch (parallel, one breaker
//!    bank per scenario).
//!
//! ## Quick Start
//!
//! ```rust
//! use relaygrid_core::{Amperes, BusId, ElementRef, Seconds};
//! use relaygrid_protection::{Measurement, ProtectionDevice};
//!
//! let relay = ProtectionDevice::overcurrent(
//!     "50_B7",
//!     ElementRef::Bus(BusId::new(7)),
//!     Amperes(600.0),
//!     Seconds(0.1),
//! )?;
//! assert!(relay.decide(&Measurement::current(650.0))?);
//! assert!(!relay.decide(&Measurement::current(500.0))?);
//! # Ok::<(), relaygrid_protection::ProtectionError>(())
//! ```

pub mod breaker;
pub mod config;
pub mod coordination;
pub mod device;
pub mod error;
pub mod fault;
pub mod measurement;
pub mod propagation;
pub mod scheme;
pub mod telemetry;
pub mod zone;

pub use breaker::{BreakerBank, BreakerPosition, BreakerState};
pub use config::{load_config_from_path, DeviceRecord, ProtectionConfig, ZoneRecord};
pub use coordination::{
    CoordinationChecker, CoordinationOutcome, CoordinationReport, CoordinationResult, DeviceTrip,
    PairCheck, DEFAULT_MARGIN,
};
pub use device::{DeviceId, DeviceKind, ProtectionDevice, TripRule};
pub use error::{ProtectionError, ProtectionResult};
pub use fault::{FaultScenario, FaultSeverity};
pub use measurement::{FlowDirection, Measurement, MeasurementKind};
pub use propagation::{AttenuatingPropagation, Fault, FaultPropagation, ScriptedPropagation};
pub use scheme::ProtectionScheme;
pub use telemetry::{
    NullTelemetry, RecordingTelemetry, Telemetry, TelemetryEvent, TracingTelemetry,
};
pub use zone::{ProtectionZone, ZoneKind};
