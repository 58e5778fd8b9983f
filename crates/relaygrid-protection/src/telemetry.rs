//! Injected event sink.
//!
//! Components take an `Arc<dyn Telemetry>` instead of writing to a global
//! logger, so tests can swap in [`RecordingTelemetry`] and assert on what
//! happened. [`TracingTelemetry`] forwards to `tracing`, whose subscriber the
//! binary installs at start-up.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::coordination::CoordinationOutcome;
use crate::device::DeviceId;
use crate::measurement::MeasurementKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    DeviceDecision {
        device: DeviceId,
        measurement: MeasurementKind,
        trip: bool,
    },
    BreakerOpened {
        breaker: DeviceId,
        by: DeviceId,
    },
    CoordinationChecked {
        zone: String,
        scenario: String,
        outcome: CoordinationOutcome,
    },
    RunFinished {
        scenarios: usize,
        passed: usize,
    },
}

impl fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEvent::DeviceDecision {
                device,
                measurement,
                trip,
            } => write!(
                f,
                "{device} on {measurement}: {}",
                if *trip { "trip" } else { "no trip" }
            ),
            TelemetryEvent::BreakerOpened { breaker, by } => {
                write!(f, "{breaker} opened by {by}")
            }
            TelemetryEvent::CoordinationChecked {
                zone,
                scenario,
                outcome,
            } => write!(f, "{scenario} in {zone}: {outcome}"),
            TelemetryEvent::RunFinished { scenarios, passed } => {
                write!(f, "{passed}/{scenarios} scenarios coordinated")
            }
        }
    }
}

pub trait Telemetry: Send + Sync {
    fn record(&self, event: TelemetryEvent);

    /// Push out anything buffered. Called once at shutdown.
    fn flush(&self) {}
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Emits each event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        match &event {
            TelemetryEvent::DeviceDecision { device, trip, .. } => {
                debug!(device = %device, trip, "{event}")
            }
            TelemetryEvent::BreakerOpened { breaker, .. } => {
                info!(breaker = %breaker, "{event}")
            }
            TelemetryEvent::CoordinationChecked { outcome, .. } if !outcome.passed() => {
                warn!(outcome = %outcome, "{event}")
            }
            TelemetryEvent::CoordinationChecked { outcome, .. } => {
                info!(outcome = %outcome, "{event}")
            }
            TelemetryEvent::RunFinished { .. } => info!("{event}"),
        }
    }

    fn flush(&self) {
        debug!("telemetry flushed");
        let _ = std::io::stderr().flush();
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
    flushes: Mutex<usize>,
}

impl RecordingTelemetry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// How many times `flush` was called.
    pub fn flushes(&self) -> usize {
        *self.flushes.lock()
    }
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }

    fn flush(&self) {
        *self.flushes.lock() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_keeps_order() {
        let recorder = RecordingTelemetry::new();
        let sink: Arc<dyn Telemetry> = recorder.clone();
        sink.record(TelemetryEvent::BreakerOpened {
            breaker: "DJ_51_B4".into(),
            by: "51_B4".into(),
        });
        sink.record(TelemetryEvent::RunFinished {
            scenarios: 3,
            passed: 2,
        });
        sink.flush();

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].to_string(), "DJ_51_B4 opened by 51_B4");
        assert_eq!(events[1].to_string(), "2/3 scenarios coordinated");
        assert_eq!(recorder.flushes(), 1);
    }

    #[test]
    fn null_and_tracing_sinks_accept_events() {
        let event = TelemetryEvent::DeviceDecision {
            device: "50_B7".into(),
            measurement: MeasurementKind::Current,
            trip: true,
        };
        NullTelemetry.record(event.clone());
        TracingTelemetry.record(event);
        TracingTelemetry.flush();
    }
}
