//! # Password Reconfiguration
//!
//! Two firmware generations store passwords differently:
//!
//! - **Legacy** firmware takes one `{level, password}` record at a time
//!   through the manufacturer password table and rejects a password that
//!   duplicates another level's. All passwords are cleared with
//!   `RESET_PASSWORDS` first, then written tertiary first, primary last.
//! - **Standard** firmware keeps all levels in SECURITY (Table 42), which is
//!   read, modified and written back through the open/write/close commit.
//!
//! The backend is chosen once per session from the firmware revision.

use crate::constants::{MFG_PROC_RESET_PASSWORDS, MFG_TABLE_LEGACY_PASSWORDS, PASSWORD_LEVELS, STD_TABLE_SECURITY};
use crate::error::PsemError;
use crate::psem::procedure::{commit, execute, DataResetFlags, TableWrite};
use crate::psem::transport::{ProcedureResult, Transport, TransportError};
use crate::reconfigure::result::PasswordReconfigResult;
use crate::tables::security::{legacy_password_record, PasswordLevel, SecurityTable};
use log::{debug, info, warn};

/// Order in which legacy firmware receives password levels.
pub const LEGACY_WRITE_ORDER: [PasswordLevel; PASSWORD_LEVELS] = [
    PasswordLevel::Tertiary,
    PasswordLevel::Secondary,
    PasswordLevel::Limited,
    PasswordLevel::Primary,
];

/// Password reconfiguration as implemented by one firmware generation.
pub trait PasswordReconfigure {
    /// Replaces the passwords of every level, primary first in `passwords`.
    fn reconfigure_passwords(
        &self,
        transport: &mut dyn Transport,
        passwords: &[&str],
    ) -> PasswordReconfigResult;

    /// Replaces only the tertiary password.
    fn reconfigure_tertiary(&self, transport: &mut dyn Transport, password: &str) -> PasswordReconfigResult;
}

fn transport_result(err: &TransportError) -> PasswordReconfigResult {
    PasswordReconfigResult::from_error(&PsemError::Transport(err.clone()))
}

/// Pre-standard-security firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacySecurity {
    pub password_len: usize,
}

impl LegacySecurity {
    fn write_level(&self, transport: &mut dyn Transport, level: PasswordLevel, password: &str) -> PasswordReconfigResult {
        let record = legacy_password_record(level, password, self.password_len);
        debug!("Writing {} password ({} bytes)", level.name(), record.len());
        match transport.write_table(MFG_TABLE_LEGACY_PASSWORDS, &record) {
            Ok(resp) => PasswordReconfigResult::from_response(resp),
            Err(e) => transport_result(&e),
        }
    }
}

impl PasswordReconfigure for LegacySecurity {
    fn reconfigure_passwords(
        &self,
        transport: &mut dyn Transport,
        passwords: &[&str],
    ) -> PasswordReconfigResult {
        match execute(transport, MFG_PROC_RESET_PASSWORDS, &[]) {
            Ok(resp) => match resp.result {
                ProcedureResult::Completed => {}
                ProcedureResult::NoAuthorization => return PasswordReconfigResult::SecurityError,
                _ => return PasswordReconfigResult::ProtocolError,
            },
            Err(e) => return transport_result(&e),
        }

        // Each level is attempted even after an earlier level failed; the
        // outcome of the last write is reported.
        let mut result = PasswordReconfigResult::Success;
        for level in LEGACY_WRITE_ORDER {
            let Some(password) = passwords.get(level.slot()).filter(|p| !p.is_empty()) else {
                continue;
            };
            result = self.write_level(transport, level, password);
            if !result.is_success() {
                warn!("Legacy {} password write failed: {}", level.name(), result);
            }
        }
        result
    }

    fn reconfigure_tertiary(&self, transport: &mut dyn Transport, password: &str) -> PasswordReconfigResult {
        self.write_level(transport, PasswordLevel::Tertiary, password)
    }
}

/// Firmware with the standard SECURITY table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardSecurity {
    pub password_len: usize,
}

impl StandardSecurity {
    fn update<F>(&self, transport: &mut dyn Transport, edit: F) -> PasswordReconfigResult
    where
        F: FnOnce(&mut SecurityTable),
    {
        let mut table = match transport
            .read_table(STD_TABLE_SECURITY)
            .map_err(PsemError::from)
            .and_then(|bytes| SecurityTable::decode(&bytes, self.password_len))
        {
            Ok(table) => table,
            Err(e) => {
                warn!("Reading the security table failed: {}", e);
                return PasswordReconfigResult::from_error(&e);
            }
        };

        edit(&mut table);

        let writes = vec![TableWrite::full(STD_TABLE_SECURITY, table.encode().to_vec(), "security")];
        PasswordReconfigResult::from_commit(commit(transport, writes, DataResetFlags::empty()))
    }
}

impl PasswordReconfigure for StandardSecurity {
    fn reconfigure_passwords(
        &self,
        transport: &mut dyn Transport,
        passwords: &[&str],
    ) -> PasswordReconfigResult {
        // Levels missing from the list are cleared, matching the legacy reset.
        self.update(transport, |table| {
            for level in PasswordLevel::ALL {
                table.set_password(level, passwords.get(level.slot()).copied().unwrap_or(""));
            }
        })
    }

    fn reconfigure_tertiary(&self, transport: &mut dyn Transport, password: &str) -> PasswordReconfigResult {
        self.update(transport, |table| table.set_password(PasswordLevel::Tertiary, password))
    }
}

/// The password backend of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityBackend {
    Legacy(LegacySecurity),
    Standard(StandardSecurity),
}

impl SecurityBackend {
    /// Firmware at or above `standard_from` uses the standard security table.
    pub fn select(firmware_revision: f32, standard_from: f32, password_len: usize) -> Self {
        if firmware_revision < standard_from {
            SecurityBackend::Legacy(LegacySecurity { password_len })
        } else {
            SecurityBackend::Standard(StandardSecurity { password_len })
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, SecurityBackend::Legacy(_))
    }

    fn inner(&self) -> &dyn PasswordReconfigure {
        match self {
            SecurityBackend::Legacy(b) => b,
            SecurityBackend::Standard(b) => b,
        }
    }
}

impl PasswordReconfigure for SecurityBackend {
    fn reconfigure_passwords(
        &self,
        transport: &mut dyn Transport,
        passwords: &[&str],
    ) -> PasswordReconfigResult {
        if passwords.len() > PASSWORD_LEVELS {
            warn!(
                "{} passwords supplied, only {} levels exist; extra entries ignored",
                passwords.len(),
                PASSWORD_LEVELS
            );
        }
        let passwords = &passwords[..passwords.len().min(PASSWORD_LEVELS)];
        let result = self.inner().reconfigure_passwords(transport, passwords);
        info!("Password reconfiguration: {}", result);
        result
    }

    fn reconfigure_tertiary(&self, transport: &mut dyn Transport, password: &str) -> PasswordReconfigResult {
        let result = self.inner().reconfigure_tertiary(transport, password);
        info!("Tertiary password reconfiguration: {}", result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        assert!(SecurityBackend::select(4.999, 5.0, 20).is_legacy());
        assert!(!SecurityBackend::select(5.0, 5.0, 20).is_legacy());
        assert!(!SecurityBackend::select(6.01, 5.0, 20).is_legacy());
    }

    #[test]
    fn test_legacy_order() {
        let order: Vec<usize> = LEGACY_WRITE_ORDER.iter().map(|l| l.slot()).collect();
        assert_eq!(order, vec![3, 2, 1, 0]);
    }
}
