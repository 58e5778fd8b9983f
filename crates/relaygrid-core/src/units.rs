//! Compile-time unit safety for the quantities protection settings are written in.
//!
//! Relay pickups are set in amperes, voltage elements in per-unit, operating
//! times in seconds, and equipment ratings in MVA at a nominal kV. Keeping each
//! of these as its own newtype stops a current pickup from being compared to a
//! voltage reading or a time margin from being added to a rating.
//!
//! All types are `#[repr(transparent)]` over `f64`.
//!
//! ```
//! use relaygrid_core::units::{Amperes, Kilovolts, MegavoltAmperes, Seconds};
//!
//! let pickup = Amperes(600.0);
//! assert!(Amperes(650.0) >= pickup);
//!
//! let margin = Seconds(0.5) - Seconds(0.2);
//! assert!((margin.value() - 0.3).abs() < 1e-12);
//!
//! // 25 MVA at 13.8 kV is roughly 1046 A per phase
//! let rated = MegavoltAmperes(25.0).rated_current(Kilovolts(13.8));
//! assert!((rated.value() - 1045.9).abs() < 0.1);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Implements the arithmetic every unit type shares.
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.3} {}", self.0, $unit_name)
            }
        }

        impl $type {
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            #[inline]
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

// =============================================================================
// Power Units
// =============================================================================

/// Active power in megawatts (MW)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl_unit_ops!(Megawatts, "MW");

/// Reactive power in megavolt-amperes reactive (Mvar)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Megavars(pub f64);

impl_unit_ops!(Megavars, "Mvar");

/// Apparent power in megavolt-amperes (MVA)
///
/// Line and transformer thermal ratings are given in MVA; protection
/// settings need them in amperes, see [`MegavoltAmperes::rated_current`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MegavoltAmperes(pub f64);

impl_unit_ops!(MegavoltAmperes, "MVA");

impl MegavoltAmperes {
    /// Three-phase line current at the given line-to-line voltage:
    /// `I = S / (√3 · V)`.
    ///
    /// Returns zero amperes for a non-positive base voltage.
    #[inline]
    pub fn rated_current(self, base_kv: Kilovolts) -> Amperes {
        if base_kv.0 <= 0.0 {
            return Amperes(0.0);
        }
        Amperes(self.0 * 1_000.0 / (3.0_f64.sqrt() * base_kv.0))
    }
}

// =============================================================================
// Voltage Units
// =============================================================================

/// Voltage magnitude in per-unit (pu)
///
/// Under/overvoltage elements are set in per-unit of the bus nominal voltage.
/// Normal operating range is typically 0.95 - 1.05 pu.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PerUnit(pub f64);

impl_unit_ops!(PerUnit, "pu");

/// Voltage in kilovolts (kV)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kilovolts(pub f64);

impl_unit_ops!(Kilovolts, "kV");

// =============================================================================
// Current and Time Units
// =============================================================================

/// RMS current in amperes (A)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Amperes(pub f64);

impl_unit_ops!(Amperes, "A");

/// Time in seconds (s)
///
/// Used for relay operating times and coordination margins.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Seconds(pub f64);

impl_unit_ops!(Seconds, "s");

impl Seconds {
    pub const ZERO: Self = Self(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amperes_arithmetic() {
        let a = Amperes(650.0);
        let b = Amperes(600.0);

        assert_eq!((a - b).value(), 50.0);
        assert_eq!((a + b).value(), 1250.0);
        assert_eq!((-a).abs().value(), 650.0);
        assert_eq!((b * 2.0).value(), 1200.0);
        assert_eq!(a / Amperes(325.0), 2.0);
    }

    #[test]
    fn test_rated_current() {
        let s = MegavoltAmperes(100.0);
        let i = s.rated_current(Kilovolts(138.0));
        // 100 MVA / (sqrt(3) * 138 kV) = 418.4 A
        assert!((i.value() - 418.37).abs() < 0.01);
        assert_eq!(s.rated_current(Kilovolts(0.0)).value(), 0.0);
    }

    #[test]
    fn test_seconds_ordering_and_sum() {
        assert!(Seconds(0.2) < Seconds(0.3));
        assert_eq!(Seconds::ZERO + Seconds(0.25), Seconds(0.25));
        let total: Seconds = vec![Seconds(0.1), Seconds(0.2)].into_iter().sum();
        assert!((total.value() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Amperes(600.0)), "600.000 A");
        assert_eq!(format!("{}", Seconds(0.2)), "0.200 s");
        assert_eq!(format!("{}", PerUnit(1.0)), "1.000 pu");
    }
}
