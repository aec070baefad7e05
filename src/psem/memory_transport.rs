//! In-memory meter simulator.
//!
//! `MemoryTransport` holds table images keyed by table number and answers
//! [`Transport`] calls against them the way a logged-on meter does:
//!
//! - writes to the configuration table are only accepted between
//!   `OPEN_CONFIG_FILE` and `CLOSE_CONFIG_FILE`; they are staged and applied
//!   on close,
//! - legacy password records are rejected with ONP when they duplicate the
//!   password of another level,
//! - `RESET_PASSWORDS`, `SET_DATE_TIME` and `CLEAR_HISTORY_LOG` act on the
//!   stored tables.
//!
//! Every call is appended to a journal so tests can assert on the exact
//! sequence, and faults (procedure results, write responses, timeouts, link
//! loss, security lock) can be injected.

use crate::constants::*;
use crate::psem::transport::{ProcedureResponse, ProcedureResult, PsemResponse, Transport, TransportError};
use crate::util::hex::format_hex_compact;
use log::{debug, trace};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A transport call as seen by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    ReadTable { table: u16 },
    ReadTableRange { table: u16, offset: u32, length: usize },
    WriteTable { table: u16, data: Vec<u8> },
    WriteTableRange { table: u16, offset: u32, data: Vec<u8> },
    Procedure { procedure: u16, params: Vec<u8> },
}

impl TransportCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            TransportCall::WriteTable { .. } | TransportCall::WriteTableRange { .. }
        )
    }

    /// Table touched by a read or write.
    pub fn table(&self) -> Option<u16> {
        match self {
            TransportCall::ReadTable { table }
            | TransportCall::ReadTableRange { table, .. }
            | TransportCall::WriteTable { table, .. }
            | TransportCall::WriteTableRange { table, .. } => Some(*table),
            TransportCall::Procedure { .. } => None,
        }
    }
}

/// Selects calls for timeout injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Read(u16),
    Write(u16),
    Procedure(u16),
}

#[derive(Debug, Clone)]
struct StagedWrite {
    table: u16,
    offset: Option<u32>,
    data: Vec<u8>,
}

/// Simulated meter answering [`Transport`] calls from table images.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    tables: BTreeMap<u16, Vec<u8>>,
    journal: Vec<TransportCall>,
    config_open: bool,
    staged: Vec<StagedWrite>,
    locked: bool,
    link_down: bool,
    protected: HashSet<u16>,
    procedure_results: HashMap<u16, ProcedureResult>,
    write_responses: HashMap<u16, PsemResponse>,
    timeouts: HashSet<CallKind>,
    last_reset_flags: Option<u32>,
    history_log_clears: u32,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a simulator from table images.
    pub fn with_tables(tables: BTreeMap<u16, Vec<u8>>) -> Self {
        Self {
            tables,
            ..Self::default()
        }
    }

    pub fn tables(&self) -> &BTreeMap<u16, Vec<u8>> {
        &self.tables
    }

    pub fn table(&self, table: u16) -> Option<&[u8]> {
        self.tables.get(&table).map(Vec::as_slice)
    }

    /// Replaces a table image directly, bypassing the journal.
    pub fn set_table(&mut self, table: u16, data: Vec<u8>) {
        self.tables.insert(table, data);
    }

    pub fn journal(&self) -> &[TransportCall] {
        &self.journal
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// All journaled writes, in call order.
    pub fn writes(&self) -> Vec<&TransportCall> {
        self.journal.iter().filter(|c| c.is_write()).collect()
    }

    /// Journaled procedure numbers, in call order.
    pub fn procedures(&self) -> Vec<u16> {
        self.journal
            .iter()
            .filter_map(|c| match c {
                TransportCall::Procedure { procedure, .. } => Some(*procedure),
                _ => None,
            })
            .collect()
    }

    /// True while a configuration is open and not yet closed.
    pub fn config_open(&self) -> bool {
        self.config_open
    }

    /// Data-reset bitmask passed to the last successful close.
    pub fn last_reset_flags(&self) -> Option<u32> {
        self.last_reset_flags
    }

    pub fn history_log_clears(&self) -> u32 {
        self.history_log_clears
    }

    /// With the lock set, configuration and password procedures answer
    /// `NoAuthorization` and writes to protected tables answer ISC.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Writes to `table` answer ISC while the meter is locked.
    pub fn protect_table(&mut self, table: u16) {
        self.protected.insert(table);
    }

    pub fn set_link_down(&mut self, down: bool) {
        self.link_down = down;
    }

    /// Forces the result of every later call to `procedure`.
    pub fn set_procedure_result(&mut self, procedure: u16, result: ProcedureResult) {
        self.procedure_results.insert(procedure, result);
    }

    /// Forces the response of every later write to `table`.
    pub fn set_write_response(&mut self, table: u16, response: PsemResponse) {
        self.write_responses.insert(table, response);
    }

    /// Makes every later matching call time out.
    pub fn fail_with_timeout(&mut self, kind: CallKind) {
        self.timeouts.insert(kind);
    }

    pub fn clear_faults(&mut self) {
        self.procedure_results.clear();
        self.write_responses.clear();
        self.timeouts.clear();
        self.link_down = false;
    }

    fn check_link(&self, kind: CallKind) -> Result<(), TransportError> {
        if self.link_down {
            return Err(TransportError::Link("simulated link down".into()));
        }
        if self.timeouts.contains(&kind) {
            debug!("Simulated timeout on {:?}", kind);
            return Err(TransportError::Timeout);
        }
        Ok(())
    }

    fn is_locked_table(&self, table: u16) -> bool {
        self.locked
            && (self.protected.contains(&table)
                || table == STD_TABLE_SECURITY
                || table == MFG_TABLE_LEGACY_PASSWORDS)
    }

    fn write_response(&self, table: u16) -> Option<PsemResponse> {
        if let Some(resp) = self.write_responses.get(&table) {
            return Some(*resp);
        }
        if self.is_locked_table(table) {
            return Some(PsemResponse::Isc);
        }
        None
    }

    fn apply_write(&mut self, table: u16, offset: Option<u32>, data: &[u8]) -> PsemResponse {
        match offset {
            None => {
                self.tables.insert(table, data.to_vec());
                PsemResponse::Ok
            }
            Some(offset) => {
                let Some(image) = self.tables.get_mut(&table) else {
                    return PsemResponse::Err;
                };
                let start = offset as usize;
                match image.get_mut(start..start + data.len()) {
                    Some(dest) => {
                        dest.copy_from_slice(data);
                        PsemResponse::Ok
                    }
                    None => PsemResponse::Err,
                }
            }
        }
    }

    fn write(&mut self, table: u16, offset: Option<u32>, data: &[u8]) -> Result<PsemResponse, TransportError> {
        self.check_link(CallKind::Write(table))?;
        if let Some(resp) = self.write_response(table) {
            debug!("Write to table {} answered {}", table, resp);
            return Ok(resp);
        }

        trace!("Table {} write at {:?}: {}", table, offset, format_hex_compact(data));

        match table {
            MFG_TABLE_CONFIG | STD_TABLE_SECURITY if self.config_open => {
                self.staged.push(StagedWrite {
                    table,
                    offset,
                    data: data.to_vec(),
                });
                Ok(PsemResponse::Ok)
            }
            MFG_TABLE_CONFIG | STD_TABLE_SECURITY => Ok(PsemResponse::Onp),
            MFG_TABLE_LEGACY_PASSWORDS => Ok(self.write_legacy_password(data)),
            _ => Ok(self.apply_write(table, offset, data)),
        }
    }

    /// Stores one `{level, password}` record in the legacy password image,
    /// one fixed-width slot per level.
    fn write_legacy_password(&mut self, record: &[u8]) -> PsemResponse {
        let Some((&level, password)) = record.split_first() else {
            return PsemResponse::Err;
        };
        if !(1..=PASSWORD_LEVELS as u8).contains(&level) {
            return PsemResponse::Err;
        }

        let len = password.len();
        let image = self
            .tables
            .entry(MFG_TABLE_LEGACY_PASSWORDS)
            .or_insert_with(|| vec![0; PASSWORD_LEVELS * len]);
        if image.len() != PASSWORD_LEVELS * len {
            return PsemResponse::Err;
        }

        let slot = usize::from(level - 1);
        let set = password.iter().any(|&b| b != 0);
        let duplicate = set
            && image
                .chunks_exact(len)
                .enumerate()
                .any(|(i, stored)| i != slot && stored == password);
        if duplicate {
            debug!("Legacy password for level {} duplicates another level", level);
            return PsemResponse::Onp;
        }

        image[slot * len..(slot + 1) * len].copy_from_slice(password);
        PsemResponse::Ok
    }

    fn run_procedure(&mut self, procedure: u16, params: &[u8]) -> ProcedureResult {
        if let Some(result) = self.procedure_results.get(&procedure) {
            return *result;
        }

        match procedure {
            MFG_PROC_OPEN_CONFIG_FILE => {
                if self.locked {
                    return ProcedureResult::NoAuthorization;
                }
                self.config_open = true;
                self.staged.clear();
                ProcedureResult::Completed
            }
            MFG_PROC_CLOSE_CONFIG_FILE => {
                if self.locked {
                    return ProcedureResult::NoAuthorization;
                }
                if !self.config_open {
                    return ProcedureResult::ConflictWithSetup;
                }
                let Ok(flags) = <[u8; CLOSE_CONFIG_PARAM_LEN]>::try_from(params) else {
                    return ProcedureResult::InvalidParameter;
                };
                for staged in std::mem::take(&mut self.staged) {
                    if self.apply_write(staged.table, staged.offset, &staged.data) != PsemResponse::Ok {
                        return ProcedureResult::NotFullyCompleted;
                    }
                }
                self.config_open = false;
                self.last_reset_flags = Some(u32::from_le_bytes(flags));
                ProcedureResult::Completed
            }
            MFG_PROC_RESET_PASSWORDS => {
                if self.locked {
                    return ProcedureResult::NoAuthorization;
                }
                if let Some(image) = self.tables.get_mut(&MFG_TABLE_LEGACY_PASSWORDS) {
                    image.fill(0);
                }
                ProcedureResult::Completed
            }
            MFG_PROC_CLEAR_HISTORY_LOG => {
                if self.locked {
                    return ProcedureResult::NoAuthorization;
                }
                self.history_log_clears += 1;
                ProcedureResult::Completed
            }
            STD_PROC_SET_DATE_TIME => self.set_date_time(params),
            _ => ProcedureResult::Unrecognized,
        }
    }

    /// SET_DATE_TIME: `[mask, yy, mm, dd, hh, mi, ss, qualifier]`.
    fn set_date_time(&mut self, params: &[u8]) -> ProcedureResult {
        let [mask, date_time @ .., qualifier] = params else {
            return ProcedureResult::InvalidParameter;
        };
        if date_time.len() != CLOCK_TABLE_LEN - 1 {
            return ProcedureResult::InvalidParameter;
        }
        let clock = self
            .tables
            .entry(STD_TABLE_CLOCK)
            .or_insert_with(|| vec![0; CLOCK_TABLE_LEN]);
        if clock.len() < CLOCK_TABLE_LEN {
            clock.resize(CLOCK_TABLE_LEN, 0);
        }
        if mask & SET_DATE_TIME_MASK_DATE != 0 {
            clock[..3].copy_from_slice(&date_time[..3]);
        }
        if mask & SET_DATE_TIME_MASK_TIME != 0 {
            clock[3..6].copy_from_slice(&date_time[3..6]);
        }
        if mask & SET_DATE_TIME_MASK_DOW != 0 {
            clock[6] = *qualifier;
        }

        if let Some(status) = self.tables.get_mut(&STD_TABLE_ED_MODE_STATUS) {
            if let Some(std_status1) = status.get_mut(1..3) {
                let flags = u16::from_le_bytes([std_status1[0], std_status1[1]]) & !ED_STD_STATUS1_CLOCK_ERROR;
                std_status1.copy_from_slice(&flags.to_le_bytes());
            }
        }
        ProcedureResult::Completed
    }
}

impl Transport for MemoryTransport {
    fn read_table(&mut self, table: u16) -> Result<Vec<u8>, TransportError> {
        self.journal.push(TransportCall::ReadTable { table });
        self.check_link(CallKind::Read(table))?;
        self.tables
            .get(&table)
            .cloned()
            .ok_or(TransportError::Response(PsemResponse::Err))
    }

    fn read_table_range(
        &mut self,
        table: u16,
        offset: u32,
        length: usize,
    ) -> Result<Vec<u8>, TransportError> {
        self.journal.push(TransportCall::ReadTableRange {
            table,
            offset,
            length,
        });
        self.check_link(CallKind::Read(table))?;
        let start = offset as usize;
        self.tables
            .get(&table)
            .and_then(|image| image.get(start..start + length))
            .map(<[u8]>::to_vec)
            .ok_or(TransportError::Response(PsemResponse::Err))
    }

    fn write_table(&mut self, table: u16, data: &[u8]) -> Result<PsemResponse, TransportError> {
        self.journal.push(TransportCall::WriteTable {
            table,
            data: data.to_vec(),
        });
        self.write(table, None, data)
    }

    fn write_table_range(
        &mut self,
        table: u16,
        offset: u32,
        data: &[u8],
    ) -> Result<PsemResponse, TransportError> {
        self.journal.push(TransportCall::WriteTableRange {
            table,
            offset,
            data: data.to_vec(),
        });
        self.write(table, Some(offset), data)
    }

    fn execute_procedure(
        &mut self,
        procedure: u16,
        params: &[u8],
    ) -> Result<ProcedureResponse, TransportError> {
        self.journal.push(TransportCall::Procedure {
            procedure,
            params: params.to_vec(),
        });
        self.check_link(CallKind::Procedure(procedure))?;
        let result = self.run_procedure(procedure, params);
        debug!("Procedure {} -> {:?}", procedure, result);
        Ok(ProcedureResponse::with_result(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_writes_need_open() {
        let mut meter = MemoryTransport::new();
        meter.set_table(MFG_TABLE_CONFIG, vec![0; 8]);

        assert_eq!(
            meter.write_table_range(MFG_TABLE_CONFIG, 2, &[1, 2]).unwrap(),
            PsemResponse::Onp
        );

        meter.execute_procedure(MFG_PROC_OPEN_CONFIG_FILE, &[]).unwrap();
        meter.write_table_range(MFG_TABLE_CONFIG, 2, &[1, 2]).unwrap();
        assert_eq!(meter.table(MFG_TABLE_CONFIG).unwrap(), &[0; 8]);

        let resp = meter
            .execute_procedure(MFG_PROC_CLOSE_CONFIG_FILE, &[0; 4])
            .unwrap();
        assert_eq!(resp.result, ProcedureResult::Completed);
        assert_eq!(meter.table(MFG_TABLE_CONFIG).unwrap(), &[0, 0, 1, 2, 0, 0, 0, 0]);
        assert!(!meter.config_open());
    }

    #[test]
    fn test_legacy_duplicate_rejected() {
        let mut meter = MemoryTransport::new();
        assert_eq!(
            meter.write_table(MFG_TABLE_LEGACY_PASSWORDS, &[1, b'A', b'B']).unwrap(),
            PsemResponse::Ok
        );
        assert_eq!(
            meter.write_table(MFG_TABLE_LEGACY_PASSWORDS, &[2, b'A', b'B']).unwrap(),
            PsemResponse::Onp
        );

        meter.execute_procedure(MFG_PROC_RESET_PASSWORDS, &[]).unwrap();
        assert_eq!(
            meter.write_table(MFG_TABLE_LEGACY_PASSWORDS, &[2, b'A', b'B']).unwrap(),
            PsemResponse::Ok
        );
    }

    #[test]
    fn test_fault_injection() {
        let mut meter = MemoryTransport::new();
        meter.fail_with_timeout(CallKind::Read(1));
        assert_eq!(meter.read_table(1), Err(TransportError::Timeout));

        meter.set_locked(true);
        let resp = meter.execute_procedure(MFG_PROC_OPEN_CONFIG_FILE, &[]).unwrap();
        assert_eq!(resp.result, ProcedureResult::NoAuthorization);
        assert_eq!(
            meter.write_table(STD_TABLE_SECURITY, &[0; 4]).unwrap(),
            PsemResponse::Isc
        );

        meter.set_link_down(true);
        assert!(matches!(meter.read_table(3), Err(TransportError::Link(_))));
        assert_eq!(meter.journal().len(), 4);
    }

    #[test]
    fn test_set_date_time_mask() {
        let mut meter = MemoryTransport::new();
        meter.set_table(STD_TABLE_CLOCK, vec![20, 1, 1, 0, 0, 0, 3]);
        meter
            .execute_procedure(STD_PROC_SET_DATE_TIME, &[SET_DATE_TIME_MASK_TIME, 26, 10, 16, 8, 30, 0, 5])
            .unwrap();
        assert_eq!(meter.table(STD_TABLE_CLOCK).unwrap(), &[20, 1, 1, 8, 30, 0, 3]);
    }
}
