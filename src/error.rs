//! # PSEM Error Handling
//!
//! This module defines the PsemError enum, which represents the errors that can
//! occur while reading or decoding meter tables. Reconfiguration operations do
//! not surface these directly; they convert them into their own closed result
//! enumerations (see [`crate::reconfigure::result`]).

use crate::psem::transport::{PsemResponse, TransportError};
use crate::schedule::ScheduleError;
use thiserror::Error;

/// Represents the different error types that can occur in the PSEM crate.
#[derive(Debug, Error)]
pub enum PsemError {
    /// A table or sub-block was shorter than its layout requires.
    #[error("Table {table} truncated: expected {expected} bytes, got {actual}")]
    TruncatedTable {
        table: u16,
        expected: usize,
        actual: usize,
    },

    /// The transport failed or the device rejected the request.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Reading a LID failed on the device.
    #[error("LID 0x{lid:08X} read failed: {response}")]
    LidRead { lid: u32, response: TransportError },

    /// The LID does not map to any location on this meter.
    #[error("Invalid LID: 0x{0:08X}")]
    InvalidLid(u32),

    /// The LID maps to a read-only quantity.
    #[error("LID 0x{0:08X} is not writable")]
    LidNotWritable(u32),

    /// The model string in GENERAL_MFG_ID matches no known layout.
    #[error("Unknown meter model: {0:?}")]
    UnknownMeterModel(String),

    /// A field value does not fit its encoded width.
    #[error("Invalid value {value} for field {field}")]
    InvalidField { field: &'static str, value: u64 },

    /// A schedule file could not be used.
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// A meter image could not be loaded or saved.
    #[error("Meter image error: {0}")]
    Image(String),

    /// A session configuration file could not be read.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PsemError {
    /// Returns the device response carried by this error, if any.
    pub fn response(&self) -> Option<PsemResponse> {
        match self {
            PsemError::Transport(TransportError::Response(r)) => Some(*r),
            PsemError::LidRead {
                response: TransportError::Response(r),
                ..
            } => Some(*r),
            _ => None,
        }
    }

    /// True if the underlying transport timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            PsemError::Transport(TransportError::Timeout)
                | PsemError::LidRead {
                    response: TransportError::Timeout,
                    ..
                }
        )
    }
}
