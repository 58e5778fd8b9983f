//! Primary/backup coordination checking.
//!
//! For a fault in a zone, every zone device (breakers excluded) is handed
//! its reading from the propagation model. The devices that trip are ranked
//! by operating time: the fastest is the primary, the next distinct one the
//! backup. The pair is coordinated when the backup waits at least the
//! required margin after the primary.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use relaygrid_core::{Network, Seconds};
use serde::Serialize;

use crate::breaker::BreakerBank;
use crate::device::{DeviceId, DeviceKind};
use crate::error::{ProtectionError, ProtectionResult};
use crate::fault::FaultScenario;
use crate::propagation::{Fault, FaultPropagation};
use crate::scheme::ProtectionScheme;
use crate::telemetry::{NullTelemetry, Telemetry, TelemetryEvent};

/// Margin used when neither the scheme nor the caller sets one.
pub const DEFAULT_MARGIN: Seconds = Seconds(0.2);

/// Operating times closer than this are treated as equal.
pub const TIME_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationOutcome {
    Coordinated,
    MarginViolation,
    /// Nothing tripped; never counted as a pass
    NoTrip,
    UncoordinatedSingleTrip,
    /// Two or more devices share the primary or the backup slot
    AmbiguousCoordination,
}

impl CoordinationOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, CoordinationOutcome::Coordinated)
    }
}

impl fmt::Display for CoordinationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoordinationOutcome::Coordinated => "coordinated",
            CoordinationOutcome::MarginViolation => "margin_violation",
            CoordinationOutcome::NoTrip => "no_trip",
            CoordinationOutcome::UncoordinatedSingleTrip => "uncoordinated_single_trip",
            CoordinationOutcome::AmbiguousCoordination => "ambiguous_coordination",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceTrip {
    pub device: DeviceId,
    pub operating_time: Seconds,
}

/// Margin between two consecutive devices in the trip sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairCheck {
    pub primary: DeviceId,
    pub backup: DeviceId,
    pub margin: Seconds,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoordinationResult {
    pub zone: String,
    pub scenario: String,
    pub outcome: CoordinationOutcome,
    pub required_margin: Seconds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<DeviceTrip>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<DeviceTrip>,
    /// Backup time minus primary time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Seconds>,
    /// Every device that tripped, fastest first
    pub tripped: Vec<DeviceTrip>,
    pub pairs: Vec<PairCheck>,
    /// Devices sharing the contested slot when the outcome is ambiguous
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tied: Vec<DeviceId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opened_breakers: Vec<DeviceId>,
}

impl CoordinationResult {
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }

    /// Turn an ambiguous result into an error for callers that cannot
    /// proceed without a designer's decision.
    pub fn into_error(self) -> ProtectionResult<Self> {
        if self.outcome != CoordinationOutcome::AmbiguousCoordination {
            return Ok(self);
        }
        let time = self
            .tied
            .first()
            .and_then(|id| self.tripped.iter().find(|t| &t.device == id))
            .map_or(Seconds::ZERO, |t| t.operating_time);
        Err(ProtectionError::AmbiguousCoordination {
            zone: self.zone,
            tied: self.tied,
            time,
        })
    }
}

/// Results of a batch of scenarios.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinationReport {
    pub results: Vec<CoordinationResult>,
    /// Passing results over all results
    pub score: f64,
    /// Zones whose every scenario passed, over zones exercised
    pub zone_score: f64,
}

impl CoordinationReport {
    pub fn from_results(results: Vec<CoordinationResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed()).count();
        let score = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64
        };

        let mut zones: BTreeMap<&str, bool> = BTreeMap::new();
        for result in &results {
            *zones.entry(result.zone.as_str()).or_insert(true) &= result.passed();
        }
        let zone_score = if zones.is_empty() {
            0.0
        } else {
            zones.values().filter(|ok| **ok).count() as f64 / zones.len() as f64
        };

        Self {
            results,
            score,
            zone_score,
        }
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn count(&self, outcome: CoordinationOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Coordination: {}/{} scenarios passed (score {:.2}, zones {:.2}); {} margin violations, {} no-trip, {} single-trip, {} ambiguous",
            self.passed(),
            self.results.len(),
            self.score,
            self.zone_score,
            self.count(CoordinationOutcome::MarginViolation),
            self.count(CoordinationOutcome::NoTrip),
            self.count(CoordinationOutcome::UncoordinatedSingleTrip),
            self.count(CoordinationOutcome::AmbiguousCoordination),
        )
    }
}

/// Runs coordination checks against a scheme.
///
/// Margin precedence: [`with_margin`](Self::with_margin), then the
/// scenario's own margin, then the scheme margin.
#[derive(Clone)]
pub struct CoordinationChecker {
    margin: Option<Seconds>,
    telemetry: Arc<dyn Telemetry>,
}

impl Default for CoordinationChecker {
    fn default() -> Self {
        Self {
            margin: None,
            telemetry: Arc::new(NullTelemetry),
        }
    }
}

impl fmt::Debug for CoordinationChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinationChecker")
            .field("margin", &self.margin)
            .finish_non_exhaustive()
    }
}

impl CoordinationChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_margin(mut self, margin: Seconds) -> Self {
        self.margin = Some(margin);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    fn required_margin(&self, scheme: &ProtectionScheme, scenario: &FaultScenario) -> Seconds {
        self.margin
            .or(scenario.margin)
            .unwrap_or_else(|| scheme.margin())
    }

    /// Check one fault in one zone on a scratch breaker bank.
    pub fn check_coordination<P: FaultPropagation + ?Sized>(
        &self,
        scheme: &ProtectionScheme,
        network: &Network,
        zone: &str,
        scenario: &FaultScenario,
        propagation: &P,
    ) -> ProtectionResult<CoordinationResult> {
        let mut breakers = scheme.breaker_bank();
        self.check_with_breakers(scheme, network, zone, scenario, propagation, &mut breakers)
    }

    /// Check one fault in one zone; tripped relays open their coupled
    /// breakers in `breakers`.
    pub fn check_with_breakers<P: FaultPropagation + ?Sized>(
        &self,
        scheme: &ProtectionScheme,
        network: &Network,
        zone_name: &str,
        scenario: &FaultScenario,
        propagation: &P,
        breakers: &mut BreakerBank,
    ) -> ProtectionResult<CoordinationResult> {
        let zone = scheme.zone(zone_name).ok_or_else(|| {
            ProtectionError::Reference(format!(
                "scenario '{}' faults unknown zone '{zone_name}'",
                scenario.id
            ))
        })?;
        let fault = Fault { scenario, zone };
        let required_margin = self.required_margin(scheme, scenario);

        let mut tripped = Vec::new();
        for id in zone.members() {
            let device = scheme.device(id.as_str()).ok_or_else(|| {
                ProtectionError::Reference(format!("zone '{zone_name}' lists unknown device '{id}'"))
            })?;
            if device.kind() == DeviceKind::Breaker {
                continue;
            }
            let measurement = propagation.measure(network, device, &fault)?;
            let trip = device.decide(&measurement)?;
            self.telemetry.record(TelemetryEvent::DeviceDecision {
                device: id.clone(),
                measurement: measurement.kind(),
                trip,
            });
            if trip {
                tripped.push(DeviceTrip {
                    device: id.clone(),
                    operating_time: device.operating_time(),
                });
            }
        }
        tripped.sort_by(|a, b| {
            a.operating_time
                .value()
                .total_cmp(&b.operating_time.value())
                .then_with(|| a.device.cmp(&b.device))
        });

        let mut opened_breakers = Vec::new();
        for trip in &tripped {
            if let Some(breaker) = breakers.trip(trip.device.as_str())? {
                self.telemetry.record(TelemetryEvent::BreakerOpened {
                    breaker: breaker.clone(),
                    by: trip.device.clone(),
                });
                opened_breakers.push(breaker);
            }
        }

        let pairs = tripped
            .windows(2)
            .map(|w| {
                let margin = w[1].operating_time - w[0].operating_time;
                PairCheck {
                    primary: w[0].device.clone(),
                    backup: w[1].device.clone(),
                    margin,
                    passed: meets(margin, required_margin),
                }
            })
            .collect();

        let (outcome, primary, backup, tied) = classify(&tripped, required_margin);
        let margin = match (&primary, &backup) {
            (Some(p), Some(b)) => Some(b.operating_time - p.operating_time),
            _ => None,
        };

        self.telemetry.record(TelemetryEvent::CoordinationChecked {
            zone: zone_name.to_string(),
            scenario: scenario.id.clone(),
            outcome,
        });

        Ok(CoordinationResult {
            zone: zone_name.to_string(),
            scenario: scenario.id.clone(),
            outcome,
            required_margin,
            primary,
            backup,
            margin,
            tripped,
            pairs,
            tied,
            opened_breakers,
        })
    }

    /// Check every scenario in parallel. Each scenario works on its own copy
    /// of the scheme's breaker bank.
    pub fn check_all<P: FaultPropagation + ?Sized>(
        &self,
        scheme: &ProtectionScheme,
        network: &Network,
        scenarios: &[FaultScenario],
        propagation: &P,
    ) -> ProtectionResult<CoordinationReport> {
        let base = scheme.breaker_bank();
        let results = scenarios
            .par_iter()
            .map(|scenario| {
                let mut breakers = base.isolated();
                self.check_with_breakers(
                    scheme,
                    network,
                    &scenario.zone,
                    scenario,
                    propagation,
                    &mut breakers,
                )
            })
            .collect::<ProtectionResult<Vec<_>>>()?;

        let report = CoordinationReport::from_results(results);
        self.telemetry.record(TelemetryEvent::RunFinished {
            scenarios: report.results.len(),
            passed: report.passed(),
        });
        Ok(report)
    }
}

fn meets(margin: Seconds, required: Seconds) -> bool {
    margin.value() + TIME_TOLERANCE >= required.value()
}

fn same_time(a: &DeviceTrip, b: &DeviceTrip) -> bool {
    (a.operating_time - b.operating_time).abs().value() <= TIME_TOLERANCE
}

type Classified = (
    CoordinationOutcome,
    Option<DeviceTrip>,
    Option<DeviceTrip>,
    Vec<DeviceId>,
);

/// Outcome for a trip sequence already sorted fastest first.
fn classify(tripped: &[DeviceTrip], required: Seconds) -> Classified {
    let Some(first) = tripped.first() else {
        return (CoordinationOutcome::NoTrip, None, None, Vec::new());
    };
    if tripped.len() == 1 {
        return (
            CoordinationOutcome::UncoordinatedSingleTrip,
            Some(first.clone()),
            None,
            Vec::new(),
        );
    }

    let primary_ties: Vec<DeviceId> = tripped
        .iter()
        .take_while(|t| same_time(t, first))
        .map(|t| t.device.clone())
        .collect();
    if primary_ties.len() > 1 {
        return (
            CoordinationOutcome::AmbiguousCoordination,
            Some(first.clone()),
            None,
            primary_ties,
        );
    }

    let second = &tripped[1];
    let backup_ties: Vec<DeviceId> = tripped[1..]
        .iter()
        .take_while(|t| same_time(t, second))
        .map(|t| t.device.clone())
        .collect();
    if backup_ties.len() > 1 {
        return (
            CoordinationOutcome::AmbiguousCoordination,
            Some(first.clone()),
            Some(second.clone()),
            backup_ties,
        );
    }

    let outcome = if meets(second.operating_time - first.operating_time, required) {
        CoordinationOutcome::Coordinated
    } else {
        CoordinationOutcome::MarginViolation
    };
    (outcome, Some(first.clone()), Some(second.clone()), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(id: &str, time: f64) -> DeviceTrip {
        DeviceTrip {
            device: id.into(),
            operating_time: Seconds(time),
        }
    }

    #[test]
    fn classify_margin() {
        let (outcome, p, b, _) = classify(&[trip("P", 0.2), trip("B", 0.5)], DEFAULT_MARGIN);
        assert_eq!(outcome, CoordinationOutcome::Coordinated);
        assert_eq!(p.unwrap().device.as_str(), "P");
        assert_eq!(b.unwrap().device.as_str(), "B");

        let (outcome, ..) = classify(&[trip("P", 0.2), trip("B", 0.3)], DEFAULT_MARGIN);
        assert_eq!(outcome, CoordinationOutcome::MarginViolation);
    }

    #[test]
    fn exact_margin_passes_despite_float_noise() {
        // 0.6 - 0.4 is 0.19999999999999996 in binary floating point
        let (outcome, ..) = classify(&[trip("P", 0.4), trip("B", 0.6)], DEFAULT_MARGIN);
        assert_eq!(outcome, CoordinationOutcome::Coordinated);
    }

    #[test]
    fn classify_edge_cases() {
        assert_eq!(classify(&[], DEFAULT_MARGIN).0, CoordinationOutcome::NoTrip);
        assert_eq!(
            classify(&[trip("P", 0.2)], DEFAULT_MARGIN).0,
            CoordinationOutcome::UncoordinatedSingleTrip
        );

        let (outcome, _, _, tied) = classify(
            &[trip("P", 0.2), trip("B1", 0.5), trip("B2", 0.5), trip("C", 0.9)],
            DEFAULT_MARGIN,
        );
        assert_eq!(outcome, CoordinationOutcome::AmbiguousCoordination);
        assert_eq!(tied, vec![DeviceId::new("B1"), DeviceId::new("B2")]);

        let (outcome, _, backup, tied) =
            classify(&[trip("P1", 0.2), trip("P2", 0.2), trip("B", 0.5)], DEFAULT_MARGIN);
        assert_eq!(outcome, CoordinationOutcome::AmbiguousCoordination);
        assert!(backup.is_none());
        assert_eq!(tied.len(), 2);
    }

    #[test]
    fn report_scores() {
        let result = |zone: &str, outcome| CoordinationResult {
            zone: zone.into(),
            scenario: "s".into(),
            outcome,
            required_margin: DEFAULT_MARGIN,
            primary: None,
            backup: None,
            margin: None,
            tripped: vec![],
            pairs: vec![],
            tied: vec![],
            opened_breakers: vec![],
        };
        let report = CoordinationReport::from_results(vec![
            result("A", CoordinationOutcome::Coordinated),
            result("A", CoordinationOutcome::NoTrip),
            result("B", CoordinationOutcome::Coordinated),
            result("C", CoordinationOutcome::MarginViolation),
        ]);
        assert_eq!(report.passed(), 2);
        assert!((report.score - 0.5).abs() < 1e-12);
        assert!((report.zone_score - 1.0 / 3.0).abs() < 1e-12);
        assert!(report.summary().starts_with("Coordination: 2/4 scenarios passed"));

        let empty = CoordinationReport::from_results(vec![]);
        assert_eq!(empty.score, 0.0);
        assert_eq!(empty.zone_score, 0.0);
    }

    #[test]
    fn into_error_only_for_ambiguous() {
        let mut result = CoordinationResult {
            zone: "Z".into(),
            scenario: "s".into(),
            outcome: CoordinationOutcome::MarginViolation,
            required_margin: DEFAULT_MARGIN,
            primary: None,
            backup: None,
            margin: None,
            tripped: vec![trip("B1", 0.5), trip("B2", 0.5)],
            pairs: vec![],
            tied: vec!["B1".into(), "B2".into()],
            opened_breakers: vec![],
        };
        assert!(result.clone().into_error().is_ok());
        result.outcome = CoordinationOutcome::AmbiguousCoordination;
        match result.into_error() {
            Err(ProtectionError::AmbiguousCoordination { zone, tied, time }) => {
                assert_eq!(zone, "Z");
                assert_eq!(tied.len(), 2);
                assert_eq!(time, Seconds(0.5));
            }
            other => panic!("expected ambiguity error, got {other:?}"),
        }
    }
}
