//! # Long Identifiers (LIDs)
//!
//! A LID is a 32-bit logical address for a meter quantity:
//!
//! ```text
//! bits 31-28: class     (1 energy, 2 demand, 3 diagnostic, 4 voltage quality)
//! bits 27-24: reserved
//! bits 23-16: quantity  (0-based within the class)
//! bits 15-12: phase     (0 aggregate, 1-3 phase A-C)
//! bits 11-8:  rate      (0 total, n = TOU rate n)
//! bits  7-0:  reserved
//! ```
//!
//! [`resolve`] maps a LID to a table location using the active
//! [`MeterLayout`](crate::tables::layout::MeterLayout); [`LidResolver`] reads
//! and writes values through a transport.

pub mod resolver;

pub use resolver::{resolve, LidLocation, LidResolver};

use std::fmt;
use std::str::FromStr;

const CLASS_SHIFT: u32 = 28;
const QUANTITY_SHIFT: u32 = 16;
const PHASE_SHIFT: u32 = 12;
const RATE_SHIFT: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LidClass {
    Energy,
    Demand,
    Diagnostic,
    VoltageQuality,
}

impl LidClass {
    pub fn code(self) -> u32 {
        match self {
            LidClass::Energy => 1,
            LidClass::Demand => 2,
            LidClass::Diagnostic => 3,
            LidClass::VoltageQuality => 4,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(LidClass::Energy),
            2 => Some(LidClass::Demand),
            3 => Some(LidClass::Diagnostic),
            4 => Some(LidClass::VoltageQuality),
            _ => None,
        }
    }

    /// Counters can be preset or cleared; registers cannot.
    pub fn is_writable(self) -> bool {
        matches!(self, LidClass::Diagnostic | LidClass::VoltageQuality)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lid(pub u32);

impl Lid {
    pub fn new(class: LidClass, quantity: u8, phase: u8, rate: u8) -> Self {
        Lid(class.code() << CLASS_SHIFT
            | u32::from(quantity) << QUANTITY_SHIFT
            | u32::from(phase & 0x0F) << PHASE_SHIFT
            | u32::from(rate & 0x0F) << RATE_SHIFT)
    }

    pub fn energy(quantity: u8, phase: u8, rate: u8) -> Self {
        Self::new(LidClass::Energy, quantity, phase, rate)
    }

    pub fn demand(quantity: u8, phase: u8, rate: u8) -> Self {
        Self::new(LidClass::Demand, quantity, phase, rate)
    }

    pub fn diagnostic(counter: u8) -> Self {
        Self::new(LidClass::Diagnostic, counter, 0, 0)
    }

    pub fn voltage_quality(quantity: u8, phase: u8) -> Self {
        Self::new(LidClass::VoltageQuality, quantity, phase, 0)
    }

    pub fn class(self) -> Option<LidClass> {
        LidClass::from_code(self.0 >> CLASS_SHIFT)
    }

    pub fn quantity(self) -> u8 {
        (self.0 >> QUANTITY_SHIFT) as u8
    }

    pub fn phase(self) -> u8 {
        ((self.0 >> PHASE_SHIFT) & 0x0F) as u8
    }

    pub fn rate(self) -> u8 {
        ((self.0 >> RATE_SHIFT) & 0x0F) as u8
    }
}

impl From<u32> for Lid {
    fn from(value: u32) -> Self {
        Lid(value)
    }
}

impl fmt::Display for Lid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl FromStr for Lid {
    type Err = std::num::ParseIntError;

    /// Accepts `0x`-prefixed hex or decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).map(Lid),
            None => s.parse().map(Lid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_layout() {
        let lid = Lid::demand(3, 2, 5);
        assert_eq!(lid.0, 0x2003_2500);
        assert_eq!(lid.class(), Some(LidClass::Demand));
        assert_eq!((lid.quantity(), lid.phase(), lid.rate()), (3, 2, 5));
        assert_eq!(Lid(0x9000_0000).class(), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("0x10000000".parse::<Lid>().unwrap(), Lid(0x1000_0000));
        assert_eq!("268435456".parse::<Lid>().unwrap(), Lid(0x1000_0000));
        assert!("0xZZ".parse::<Lid>().is_err());
        assert_eq!(Lid::diagnostic(1).to_string(), "0x30010000");
    }
}
