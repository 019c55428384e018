pub mod errors;

pub use errors::{BrickError, BrickErrorCategory, BrickResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Positive,
    Negative,
}

impl Parity {
    pub const fn from_sign(sign: i64) -> Option<Self> {
        match sign {
            1 => Some(Self::Positive),
            -1 => Some(Self::Negative),
            _ => None,
        }
    }

    pub const fn sign(self) -> i32 {
        match self {
            Self::Positive => 1,
            Self::Negative => -1,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Self::Positive => '+',
            Self::Negative => '-',
        }
    }
}

/// Total angular momentum and parity of a level group.
///
/// The spin is stored doubled so half-integer values compare exactly and
/// `0+` stays distinct from `0-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JPi {
    twice_spin: u32,
    parity: Parity,
}

impl JPi {
    pub fn new(spin: f64, parity: Parity) -> Option<Self> {
        if !spin.is_finite() || spin < 0.0 {
            return None;
        }
        let doubled = spin * 2.0;
        let rounded = doubled.round();
        if (doubled - rounded).abs() > 1.0e-9 || rounded > u32::MAX as f64 {
            return None;
        }
        Some(Self {
            twice_spin: rounded as u32,
            parity,
        })
    }

    pub fn spin(self) -> f64 {
        f64::from(self.twice_spin) / 2.0
    }

    pub const fn parity(self) -> Parity {
        self.parity
    }
}

impl Display for JPi {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}{}", self.spin(), self.parity.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::{JPi, Parity};

    #[test]
    fn half_integer_spins_are_accepted() {
        let jpi = JPi::new(1.5, Parity::Negative).expect("3/2- is valid");
        assert_eq!(jpi.spin(), 1.5);
        assert_eq!(jpi.to_string(), "1.5-");
    }

    #[test]
    fn non_half_integer_and_negative_spins_are_rejected() {
        assert!(JPi::new(0.3, Parity::Positive).is_none());
        assert!(JPi::new(-0.5, Parity::Positive).is_none());
        assert!(JPi::new(f64::NAN, Parity::Positive).is_none());
    }

    #[test]
    fn zero_spin_keeps_parity_distinct() {
        let positive = JPi::new(0.0, Parity::Positive).expect("0+");
        let negative = JPi::new(0.0, Parity::Negative).expect("0-");
        assert_ne!(positive, negative);
    }

    #[test]
    fn parity_sign_round_trips() {
        assert_eq!(Parity::from_sign(1), Some(Parity::Positive));
        assert_eq!(Parity::from_sign(-1), Some(Parity::Negative));
        assert_eq!(Parity::from_sign(0), None);
        assert_eq!(Parity::Negative.sign(), -1);
    }
}
