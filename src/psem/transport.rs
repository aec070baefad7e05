//! # PSEM Transport Facade
//!
//! The configuration engine never talks to a serial or optical port itself.
//! Everything it needs from a logged-on session is captured by the
//! [`Transport`] trait: full and partial table reads, full and offset table
//! writes, and procedure execution. Each call is a blocking round-trip.

use std::fmt;
use thiserror::Error;

/// Response codes returned by the device for a table request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PsemResponse {
    /// Request accepted
    Ok,
    /// Insufficient security clearance
    Isc,
    /// Operation not possible (also returned for duplicate passwords)
    Onp,
    /// Any other rejection
    Err,
}

impl PsemResponse {
    /// The PSEM response byte.
    pub fn code(self) -> u8 {
        match self {
            PsemResponse::Ok => 0x00,
            PsemResponse::Err => 0x01,
            PsemResponse::Isc => 0x03,
            PsemResponse::Onp => 0x04,
        }
    }

    pub fn is_ok(self) -> bool {
        self == PsemResponse::Ok
    }
}

impl fmt::Display for PsemResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PsemResponse::Ok => "OK",
            PsemResponse::Isc => "ISC",
            PsemResponse::Onp => "ONP",
            PsemResponse::Err => "ERR",
        };
        write!(f, "{name} (0x{:02X})", self.code())
    }
}

/// Failures of a single transport call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The device answered with a non-OK response.
    #[error("device responded {0}")]
    Response(PsemResponse),

    /// No answer within the link timeout; device state is unknown.
    #[error("timed out waiting for the device")]
    Timeout,

    /// The link itself failed (port closed, session dropped).
    #[error("link failure: {0}")]
    Link(String),
}

/// Result codes of a C12.19 procedure (Table 8 RESULT_CODE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProcedureResult {
    Completed,
    NotFullyCompleted,
    InvalidParameter,
    ConflictWithSetup,
    TimingConstraint,
    NoAuthorization,
    Unrecognized,
}

impl ProcedureResult {
    pub fn code(self) -> u8 {
        match self {
            ProcedureResult::Completed => 0,
            ProcedureResult::NotFullyCompleted => 1,
            ProcedureResult::InvalidParameter => 2,
            ProcedureResult::ConflictWithSetup => 3,
            ProcedureResult::TimingConstraint => 4,
            ProcedureResult::NoAuthorization => 5,
            ProcedureResult::Unrecognized => 6,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => ProcedureResult::Completed,
            1 => ProcedureResult::NotFullyCompleted,
            2 => ProcedureResult::InvalidParameter,
            3 => ProcedureResult::ConflictWithSetup,
            4 => ProcedureResult::TimingConstraint,
            5 => ProcedureResult::NoAuthorization,
            _ => ProcedureResult::Unrecognized,
        }
    }
}

/// Outcome of a procedure call: result code plus any response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureResponse {
    pub result: ProcedureResult,
    pub data: Vec<u8>,
}

impl ProcedureResponse {
    pub fn completed() -> Self {
        Self {
            result: ProcedureResult::Completed,
            data: Vec::new(),
        }
    }

    pub fn with_result(result: ProcedureResult) -> Self {
        Self {
            result,
            data: Vec::new(),
        }
    }
}

/// Capability consumed from the session layer.
///
/// Reads return the table bytes or a [`TransportError`]; a non-OK device
/// response to a read arrives as [`TransportError::Response`]. Writes report
/// the device response directly so callers can branch on ISC/ONP.
pub trait Transport {
    /// Read a complete table.
    fn read_table(&mut self, table: u16) -> Result<Vec<u8>, TransportError>;

    /// Read `length` bytes of a table starting at `offset`.
    fn read_table_range(
        &mut self,
        table: u16,
        offset: u32,
        length: usize,
    ) -> Result<Vec<u8>, TransportError>;

    /// Write a complete table.
    fn write_table(&mut self, table: u16, data: &[u8]) -> Result<PsemResponse, TransportError>;

    /// Write `data` into a table at `offset`.
    fn write_table_range(
        &mut self,
        table: u16,
        offset: u32,
        data: &[u8],
    ) -> Result<PsemResponse, TransportError>;

    /// Execute a procedure with the given parameter bytes.
    fn execute_procedure(
        &mut self,
        procedure: u16,
        params: &[u8],
    ) -> Result<ProcedureResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_table(&mut self, table: u16) -> Result<Vec<u8>, TransportError> {
        (**self).read_table(table)
    }

    fn read_table_range(
        &mut self,
        table: u16,
        offset: u32,
        length: usize,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).read_table_range(table, offset, length)
    }

    fn write_table(&mut self, table: u16, data: &[u8]) -> Result<PsemResponse, TransportError> {
        (**self).write_table(table, data)
    }

    fn write_table_range(
        &mut self,
        table: u16,
        offset: u32,
        data: &[u8],
    ) -> Result<PsemResponse, TransportError> {
        (**self).write_table_range(table, offset, data)
    }

    fn execute_procedure(
        &mut self,
        procedure: u16,
        params: &[u8],
    ) -> Result<ProcedureResponse, TransportError> {
        (**self).execute_procedure(procedure, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedure_result_codes_round_trip() {
        for code in 0..=6u8 {
            assert_eq!(ProcedureResult::from_code(code).code(), code);
        }
        assert_eq!(ProcedureResult::from_code(42), ProcedureResult::Unrecognized);
    }

    #[test]
    fn response_display_includes_code() {
        assert_eq!(PsemResponse::Isc.to_string(), "ISC (0x03)");
    }
}
