//! Fault propagation: what each device sees during a fault.
//!
//! The coordination checker does not own a short-circuit model. It asks a
//! [`FaultPropagation`] for each device's reading. Two implementations ship
//! here: [`ScriptedPropagation`] replays readings written into the scenario,
//! and [`AttenuatingPropagation`] is a coarse distance-based estimate that
//! needs no power-flow solution.

use relaygrid_core::topology::bus_distances;
use relaygrid_core::{Amperes, Network, PerUnit};

use crate::device::{DeviceKind, ProtectionDevice};
use crate::error::{ProtectionError, ProtectionResult};
use crate::fault::FaultScenario;
use crate::measurement::{FlowDirection, Measurement};
use crate::zone::ProtectionZone;

/// A fault located in a zone.
#[derive(Debug, Clone, Copy)]
pub struct Fault<'a> {
    pub scenario: &'a FaultScenario,
    pub zone: &'a ProtectionZone,
}

pub trait FaultPropagation: Send + Sync {
    /// Reading presented to `device` while `fault` is on the network.
    fn measure(
        &self,
        network: &Network,
        device: &ProtectionDevice,
        fault: &Fault<'_>,
    ) -> ProtectionResult<Measurement>;
}

/// Uses only the readings scripted in the scenario.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedPropagation;

impl FaultPropagation for ScriptedPropagation {
    fn measure(
        &self,
        _network: &Network,
        device: &ProtectionDevice,
        fault: &Fault<'_>,
    ) -> ProtectionResult<Measurement> {
        fault
            .scenario
            .scripted(device.id())
            .copied()
            .ok_or_else(|| ProtectionError::MissingMeasurement {
                device: device.id().clone(),
                scenario: fault.scenario.id.clone(),
            })
    }
}

/// Fault current that decays with distance from the faulted zone.
///
/// At `h` hops from the nearer zone boundary bus a device sees
/// `base * (1 + 9 * severity) / (h + 1)` amperes flowing forward, and a
/// voltage of `1 - 0.9 * severity / (h + 1)` pu, floored at `min_voltage`.
/// Differential relays whose element touches the zone see the full fault
/// current as imbalance; elsewhere they see a balanced through-fault.
/// Scripted readings in the scenario win over the estimate.
#[derive(Debug, Clone, Copy)]
pub struct AttenuatingPropagation {
    pub base_current: Amperes,
    pub min_voltage: PerUnit,
}

impl Default for AttenuatingPropagation {
    fn default() -> Self {
        Self {
            base_current: Amperes(1000.0),
            min_voltage: PerUnit(0.1),
        }
    }
}

impl AttenuatingPropagation {
    pub fn with_base_current(base_current: Amperes) -> Self {
        Self {
            base_current,
            ..Self::default()
        }
    }

    /// Fewest hops from either zone boundary bus to any bus of the device's
    /// element. `None` when the element is unreachable from the fault.
    fn hops(network: &Network, device: &ProtectionDevice, zone: &ProtectionZone) -> Option<usize> {
        let element_buses = network.element_buses(device.element())?;
        zone.buses()
            .iter()
            .filter_map(|boundary| {
                let distances = bus_distances(network, *boundary);
                element_buses
                    .iter()
                    .filter_map(|bus| distances.get(bus).copied())
                    .min()
            })
            .min()
    }

    pub fn fault_current(&self, fault: &Fault<'_>, hops: usize) -> Amperes {
        self.base_current * fault.scenario.severity.current_multiplier() / (hops as f64 + 1.0)
    }

    pub fn fault_voltage(&self, fault: &Fault<'_>, hops: usize) -> PerUnit {
        let dip = 0.9 * fault.scenario.severity.value() / (hops as f64 + 1.0);
        PerUnit(1.0 - dip).max(self.min_voltage)
    }
}

impl FaultPropagation for AttenuatingPropagation {
    fn measure(
        &self,
        network: &Network,
        device: &ProtectionDevice,
        fault: &Fault<'_>,
    ) -> ProtectionResult<Measurement> {
        if let Some(scripted) = fault.scenario.scripted(device.id()) {
            return Ok(*scripted);
        }
        let hops = Self::hops(network, device, fault.zone);
        let current = hops.map_or(0.0, |h| self.fault_current(fault, h).value());
        let measurement = match device.kind() {
            DeviceKind::Overcurrent | DeviceKind::Fuse => Measurement::current(current),
            DeviceKind::Directional => Measurement::directional(current, FlowDirection::Forward),
            DeviceKind::Differential => {
                let inside = network
                    .element_buses(device.element())
                    .is_some_and(|buses| buses.iter().any(|bus| fault.zone.covers_bus(*bus)));
                if inside {
                    Measurement::differential(current, 0.0)
                } else {
                    Measurement::differential(current, current)
                }
            }
            DeviceKind::Undervoltage | DeviceKind::Overvoltage => {
                let pu = hops.map_or(1.0, |h| self.fault_voltage(fault, h).value());
                Measurement::voltage(pu)
            }
            DeviceKind::Breaker => Measurement::command(false),
        };
        Ok(measurement)
    }
}
