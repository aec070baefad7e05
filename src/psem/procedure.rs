//! # Procedure Orchestrator
//!
//! Every configuration change goes through the same three steps:
//!
//! 1. `OPEN_CONFIG_FILE` (no parameters) puts the device in a staging state.
//! 2. One or more sub-block writes, in ascending table offset order. The
//!    device firmware validates writes as they arrive, so the order cannot be
//!    changed after the fact.
//! 3. `CLOSE_CONFIG_FILE` with a 4-byte data-reset bitmask validates and swaps
//!    in the staged configuration.
//!
//! No rollback is attempted. A failed write leaves the configuration open on
//! the device, which is reported as [`CommitResult::ProtocolError`] so the
//! caller retries the whole operation from the top.

use crate::constants::{MFG_PROC_CLOSE_CONFIG_FILE, MFG_PROC_OPEN_CONFIG_FILE};
use crate::psem::transport::{ProcedureResponse, ProcedureResult, PsemResponse, Transport, TransportError};
use crate::util::hex::{format_hex_compact, pretty_hex};
use bitflags::bitflags;
use log::{debug, error, info, log_enabled, trace, warn, Level};

bitflags! {
    /// Data-reset bitmask passed to `CLOSE_CONFIG_FILE`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DataResetFlags: u32 {
        const BILLING_DATA = 0x0000_0001;
        const LOAD_PROFILE = 0x0000_0002;
        const HISTORY_LOG = 0x0000_0004;
        const SELF_READS = 0x0000_0008;
        const VOLTAGE_QUALITY = 0x0000_0010;
        const DIAGNOSTICS = 0x0000_0020;
    }
}

impl DataResetFlags {
    /// Little-endian procedure parameter.
    pub fn to_params(self) -> [u8; 4] {
        self.bits().to_le_bytes()
    }
}

/// One staged write: a table, an optional byte offset, and the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWrite {
    pub table: u16,
    /// `None` writes the complete table.
    pub offset: Option<u32>,
    pub data: Vec<u8>,
    /// Sub-block name used in log messages.
    pub label: &'static str,
}

impl TableWrite {
    pub fn full(table: u16, data: Vec<u8>, label: &'static str) -> Self {
        Self {
            table,
            offset: None,
            data,
            label,
        }
    }

    pub fn at(table: u16, offset: u32, data: Vec<u8>, label: &'static str) -> Self {
        Self {
            table,
            offset: Some(offset),
            data,
            label,
        }
    }

    fn sort_key(&self) -> (u16, u32) {
        (self.table, self.offset.unwrap_or(0))
    }
}

/// Outcome of a complete open/write/close sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    Success,
    /// Open or close was refused for lack of security clearance.
    SecurityError,
    /// A sub-block write failed or the link dropped; the device may be left
    /// with an open configuration.
    ProtocolError,
    /// The device stopped answering; its state must be re-verified.
    IoTimeout,
    /// Open or close failed for another reason.
    GeneralError,
}

impl CommitResult {
    pub fn is_success(self) -> bool {
        self == CommitResult::Success
    }
}

/// Orders writes by table and ascending offset.
///
/// The sort is stable so writes to the same location keep their order.
pub fn order_writes(writes: &mut [TableWrite]) {
    writes.sort_by_key(TableWrite::sort_key);
}

/// Runs the open/write/close sequence.
pub fn commit<T: Transport + ?Sized>(
    transport: &mut T,
    mut writes: Vec<TableWrite>,
    reset: DataResetFlags,
) -> CommitResult {
    order_writes(&mut writes);

    debug!("Opening configuration for {} write(s)", writes.len());
    match transport.execute_procedure(MFG_PROC_OPEN_CONFIG_FILE, &[]) {
        Ok(resp) => match resp.result {
            ProcedureResult::Completed => {}
            ProcedureResult::NoAuthorization => {
                warn!("OPEN_CONFIG_FILE refused: no authorization");
                return CommitResult::SecurityError;
            }
            other => {
                warn!("OPEN_CONFIG_FILE failed: {:?}", other);
                return CommitResult::GeneralError;
            }
        },
        Err(e) => return transport_failure("OPEN_CONFIG_FILE", &e),
    }

    for write in &writes {
        debug!(
            "Writing {} ({} bytes) to table {} offset {:?}: {}",
            write.label,
            write.data.len(),
            write.table,
            write.offset,
            format_hex_compact(&write.data[..write.data.len().min(32)])
        );
        if log_enabled!(Level::Trace) {
            trace!("{}", pretty_hex(&write.data, write.offset.unwrap_or(0) as usize, 16));
        }

        let outcome = match write.offset {
            Some(offset) => transport.write_table_range(write.table, offset, &write.data),
            None => transport.write_table(write.table, &write.data),
        };

        match outcome {
            Ok(PsemResponse::Ok) => {}
            Ok(resp) => {
                error!(
                    "Write of {} rejected with {}; configuration left open on the device",
                    write.label, resp
                );
                return CommitResult::ProtocolError;
            }
            Err(e) => {
                error!(
                    "Write of {} failed: {}; configuration left open on the device",
                    write.label, e
                );
                return match e {
                    TransportError::Timeout => CommitResult::IoTimeout,
                    _ => CommitResult::ProtocolError,
                };
            }
        }
    }

    match transport.execute_procedure(MFG_PROC_CLOSE_CONFIG_FILE, &reset.to_params()) {
        Ok(resp) => match resp.result {
            ProcedureResult::Completed => {
                info!("Configuration committed ({} write(s))", writes.len());
                CommitResult::Success
            }
            ProcedureResult::NoAuthorization => {
                warn!("CLOSE_CONFIG_FILE refused: no authorization");
                CommitResult::SecurityError
            }
            other => {
                warn!("CLOSE_CONFIG_FILE failed: {:?}", other);
                CommitResult::GeneralError
            }
        },
        Err(e) => transport_failure("CLOSE_CONFIG_FILE", &e),
    }
}

/// Executes a single procedure and logs the outcome.
pub fn execute<T: Transport + ?Sized>(
    transport: &mut T,
    procedure: u16,
    params: &[u8],
) -> Result<ProcedureResponse, TransportError> {
    debug!("Executing procedure {} params {}", procedure, format_hex_compact(params));
    let resp = transport.execute_procedure(procedure, params)?;
    if resp.result != ProcedureResult::Completed {
        warn!("Procedure {} returned {:?}", procedure, resp.result);
    }
    Ok(resp)
}

fn transport_failure(step: &str, e: &TransportError) -> CommitResult {
    error!("{} failed: {}", step, e);
    match e {
        TransportError::Timeout => CommitResult::IoTimeout,
        TransportError::Response(PsemResponse::Isc) => CommitResult::SecurityError,
        _ => CommitResult::ProtocolError,
    }
}
