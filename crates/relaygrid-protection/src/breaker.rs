//! Breaker position, kept apart from the immutable device records.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::device::{DeviceId, DeviceKind, ProtectionDevice};
use crate::error::{ProtectionError, ProtectionResult};
use crate::measurement::Measurement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakerPosition {
    Open,
    #[default]
    Closed,
}

/// Position of one breaker. Starts closed; only [`open`](Self::open),
/// [`close`](Self::close) and [`apply`](Self::apply) move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BreakerState {
    position: BreakerPosition,
}

impl BreakerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.position = BreakerPosition::Open;
    }

    pub fn close(&mut self) {
        self.position = BreakerPosition::Closed;
    }

    /// Apply a trip command: `true` opens, `false` leaves the breaker as is.
    /// Returns whether the breaker is open afterwards.
    pub fn apply(&mut self, open: bool) -> bool {
        if open {
            self.open();
        }
        self.is_open()
    }

    pub fn is_open(&self) -> bool {
        self.position == BreakerPosition::Open
    }

    pub fn position(&self) -> BreakerPosition {
        self.position
    }
}

/// Breaker positions for one scheme, plus the relay to breaker couplings.
///
/// Each concurrently evaluated fault scenario works on its own clone, so
/// breakers opened in one scenario stay closed in every other.
#[derive(Debug, Clone, Default)]
pub struct BreakerBank {
    breakers: BTreeMap<DeviceId, (ProtectionDevice, BreakerState)>,
    couplings: BTreeMap<DeviceId, DeviceId>,
}

impl BreakerBank {
    /// Collect every breaker among `devices` (all closed) and every relay
    /// coupling that points at one of them.
    pub fn from_devices<'a>(devices: impl IntoIterator<Item = &'a ProtectionDevice>) -> Self {
        let mut bank = BreakerBank::default();
        let mut relays = Vec::new();
        for device in devices {
            if device.kind() == DeviceKind::Breaker {
                bank.breakers
                    .insert(device.id().clone(), (device.clone(), BreakerState::new()));
            } else if let Some(breaker) = device.trips() {
                relays.push((device.id().clone(), breaker.clone()));
            }
        }
        bank.couplings = relays
            .into_iter()
            .filter(|(_, breaker)| bank.breakers.contains_key(breaker))
            .collect();
        bank
    }

    /// Fresh copy for an independent scenario.
    pub fn isolated(&self) -> Self {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    pub fn state(&self, id: &str) -> Option<&BreakerState> {
        self.breakers.get(id).map(|(_, state)| state)
    }

    pub fn is_open(&self, id: &str) -> ProtectionResult<bool> {
        self.state(id)
            .map(BreakerState::is_open)
            .ok_or_else(|| unknown_breaker(id))
    }

    /// Present an open/hold command to a breaker and apply its decision.
    pub fn command(&mut self, id: &str, open: bool) -> ProtectionResult<bool> {
        let (device, state) = self.breakers.get_mut(id).ok_or_else(|| unknown_breaker(id))?;
        let decision = device.decide(&Measurement::command(open))?;
        Ok(state.apply(decision))
    }

    pub fn close(&mut self, id: &str) -> ProtectionResult<()> {
        let (_, state) = self.breakers.get_mut(id).ok_or_else(|| unknown_breaker(id))?;
        state.close();
        Ok(())
    }

    /// Open the breaker `relay` is coupled to. Returns that breaker's id, or
    /// `None` when the relay has no coupled breaker.
    pub fn trip(&mut self, relay: &str) -> ProtectionResult<Option<DeviceId>> {
        let Some(breaker) = self.couplings.get(relay).cloned() else {
            return Ok(None);
        };
        self.command(breaker.as_str(), true)?;
        Ok(Some(breaker))
    }

    pub fn coupled_breaker(&self, relay: &str) -> Option<&DeviceId> {
        self.couplings.get(relay)
    }

    pub fn open_breakers(&self) -> Vec<DeviceId> {
        self.breakers
            .iter()
            .filter(|(_, (_, state))| state.is_open())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

fn unknown_breaker(id: &str) -> ProtectionError {
    ProtectionError::Reference(format!("no breaker named '{id}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaygrid_core::{Amperes, BusId, ElementRef, Seconds};

    fn bank() -> BreakerBank {
        let b4 = ElementRef::Bus(BusId::new(4));
        let devices = vec![
            ProtectionDevice::overcurrent("51_B4", b4, Amperes(300.0), Seconds(0.4))
                .unwrap()
                .with_breaker("DJ_51_B4"),
            ProtectionDevice::overcurrent("51_B4_ALT", b4, Amperes(350.0), Seconds(0.6)).unwrap(),
            ProtectionDevice::breaker("DJ_51_B4", b4).unwrap(),
        ];
        BreakerBank::from_devices(&devices)
    }

    #[test]
    fn state_transitions() {
        let mut state = BreakerState::new();
        assert!(!state.is_open());
        state.open();
        assert!(state.is_open());
        state.open();
        assert!(state.is_open());
        state.close();
        assert!(!state.is_open());
        assert!(!state.apply(false));
        assert!(state.apply(true));
        assert!(state.apply(false));
        assert_eq!(state.position(), BreakerPosition::Open);
    }

    #[test]
    fn command_goes_through_decide() {
        let mut bank = bank();
        assert_eq!(bank.len(), 1);
        assert!(!bank.command("DJ_51_B4", false).unwrap());
        assert!(bank.command("DJ_51_B4", true).unwrap());
        assert!(bank.is_open("DJ_51_B4").unwrap());
        bank.close("DJ_51_B4").unwrap();
        assert!(!bank.is_open("DJ_51_B4").unwrap());

        let err = bank.command("51_B4", true).unwrap_err();
        assert!(matches!(err, ProtectionError::Reference(_)));
    }

    #[test]
    fn trip_opens_coupled_breaker_only() {
        let mut bank = bank();
        assert_eq!(bank.trip("51_B4_ALT").unwrap(), None);
        assert!(bank.open_breakers().is_empty());
        assert_eq!(
            bank.trip("51_B4").unwrap(),
            Some(DeviceId::new("DJ_51_B4"))
        );
        assert_eq!(bank.open_breakers(), vec![DeviceId::new("DJ_51_B4")]);
    }

    #[test]
    fn isolated_copies_do_not_share_state() {
        let base = bank();
        let mut a = base.isolated();
        let b = base.isolated();
        a.trip("51_B4").unwrap();
        assert!(a.is_open("DJ_51_B4").unwrap());
        assert!(!b.is_open("DJ_51_B4").unwrap());
        assert!(!base.is_open("DJ_51_B4").unwrap());
    }
}
