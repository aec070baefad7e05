//! # Utility Modules
//!
//! Common helpers used throughout the psem-rs crate: hex formatting of table
//! payloads and meter-relative date arithmetic.

pub mod dates;
pub mod hex;

pub use dates::{date_from_reference_days, days_since_reference, from_meter_year, to_meter_year};
pub use hex::{decode_hex, encode_hex, format_hex_compact, pretty_hex, HexError};
