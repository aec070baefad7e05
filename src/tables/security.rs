//! Password tables.
//!
//! Standard-security firmware keeps its passwords in SECURITY (Table 42),
//! four `{password, access}` entries. Older firmware takes one
//! `{level, password}` record at a time through the manufacturer legacy
//! password table. Password bytes are held in [`Zeroizing`] buffers so they
//! are wiped when dropped.

use crate::constants::{PASSWORD_LEVELS, STD_TABLE_SECURITY};
use crate::error::PsemError;
use std::fmt;
use zeroize::Zeroizing;

/// Access levels, in Table 42 slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordLevel {
    Primary,
    Limited,
    Secondary,
    Tertiary,
}

impl PasswordLevel {
    pub const ALL: [PasswordLevel; PASSWORD_LEVELS] = [
        PasswordLevel::Primary,
        PasswordLevel::Limited,
        PasswordLevel::Secondary,
        PasswordLevel::Tertiary,
    ];

    /// Slot in Table 42 and index in a caller-supplied password list.
    pub fn slot(self) -> usize {
        match self {
            PasswordLevel::Primary => 0,
            PasswordLevel::Limited => 1,
            PasswordLevel::Secondary => 2,
            PasswordLevel::Tertiary => 3,
        }
    }

    /// Level byte carried by a legacy password record.
    pub fn legacy_code(self) -> u8 {
        self.slot() as u8 + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            PasswordLevel::Primary => "primary",
            PasswordLevel::Limited => "limited",
            PasswordLevel::Secondary => "secondary",
            PasswordLevel::Tertiary => "tertiary",
        }
    }
}

/// NUL-pads or truncates a password to the fixed field width.
pub fn pad_password(password: &str, len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    let bytes = password.as_bytes();
    let used = bytes.len().min(len);
    out[..used].copy_from_slice(&bytes[..used]);
    out
}

/// One legacy password record: the level byte followed by the padded password.
pub fn legacy_password_record(level: PasswordLevel, password: &str, len: usize) -> Zeroizing<Vec<u8>> {
    let mut record = Zeroizing::new(Vec::with_capacity(1 + len));
    record.push(level.legacy_code());
    record.extend_from_slice(&pad_password(password, len));
    record
}

#[derive(Clone, PartialEq, Eq)]
pub struct SecurityEntry {
    pub password: Zeroizing<Vec<u8>>,
    pub access: u8,
}

impl SecurityEntry {
    pub fn is_set(&self) -> bool {
        self.password.iter().any(|&b| b != 0)
    }
}

impl fmt::Debug for SecurityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityEntry")
            .field("password", &if self.is_set() { "<set>" } else { "<empty>" })
            .field("access", &self.access)
            .finish()
    }
}

/// SECURITY (Table 42)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityTable {
    pub entries: Vec<SecurityEntry>,
}

impl SecurityTable {
    pub fn table_len(password_len: usize) -> usize {
        PASSWORD_LEVELS * (password_len + 1)
    }

    /// Four empty entries with default access bits.
    pub fn empty(password_len: usize) -> Self {
        Self {
            entries: PasswordLevel::ALL
                .iter()
                .map(|level| SecurityEntry {
                    password: Zeroizing::new(vec![0; password_len]),
                    access: level.legacy_code(),
                })
                .collect(),
        }
    }

    pub fn entry(&self, level: PasswordLevel) -> Option<&SecurityEntry> {
        self.entries.get(level.slot())
    }

    /// Replaces the password of one level; an empty string clears it.
    pub fn set_password(&mut self, level: PasswordLevel, password: &str) {
        if let Some(entry) = self.entries.get_mut(level.slot()) {
            let len = entry.password.len();
            entry.password = pad_password(password, len);
        }
    }

    /// Level whose stored password matches `password`, if any.
    pub fn level_for(&self, password: &[u8]) -> Option<PasswordLevel> {
        PasswordLevel::ALL.into_iter().find(|level| {
            self.entry(*level)
                .map_or(false, |e| e.is_set() && e.password.as_slice() == password)
        })
    }

    pub fn decode(bytes: &[u8], password_len: usize) -> Result<Self, PsemError> {
        let expected = Self::table_len(password_len);
        if bytes.len() < expected {
            return Err(PsemError::TruncatedTable {
                table: STD_TABLE_SECURITY,
                expected,
                actual: bytes.len(),
            });
        }
        let entries = bytes[..expected]
            .chunks_exact(password_len + 1)
            .map(|chunk| SecurityEntry {
                password: Zeroizing::new(chunk[..password_len].to_vec()),
                access: chunk[password_len],
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn encode(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::new());
        for entry in &self.entries {
            out.extend_from_slice(&entry.password);
            out.push(entry.access);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_and_truncate() {
        assert_eq!(&pad_password("ABC", 5)[..], b"ABC\0\0");
        assert_eq!(&pad_password("ABCDEFG", 5)[..], b"ABCDE");
    }

    #[test]
    fn test_legacy_record() {
        let record = legacy_password_record(PasswordLevel::Tertiary, "PW", 4);
        assert_eq!(&record[..], &[4, b'P', b'W', 0, 0]);
    }

    #[test]
    fn test_set_and_clear() {
        let mut table = SecurityTable::empty(20);
        table.set_password(PasswordLevel::Secondary, "SECRET");
        assert!(table.entry(PasswordLevel::Secondary).unwrap().is_set());
        assert_eq!(
            table.level_for(&pad_password("SECRET", 20)),
            Some(PasswordLevel::Secondary)
        );

        let decoded = SecurityTable::decode(&table.encode(), 20).unwrap();
        assert_eq!(decoded, table);

        table.set_password(PasswordLevel::Secondary, "");
        assert!(!table.entry(PasswordLevel::Secondary).unwrap().is_set());
    }

    #[test]
    fn test_debug_hides_password() {
        let mut table = SecurityTable::empty(8);
        table.set_password(PasswordLevel::Primary, "HUNTER2");
        assert!(!format!("{:?}", table).contains("HUNTER2"));
    }
}
