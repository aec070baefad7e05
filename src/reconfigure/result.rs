//! Closed outcome enumerations of the reconfiguration operations.
//!
//! Codes are stable: `0..10` are success variants, `10..20` are
//! operation-specific failures, and `20..24` are the shared security,
//! protocol, timeout and general failures every family carries.

use crate::error::PsemError;
use crate::psem::procedure::CommitResult;
use crate::psem::transport::PsemResponse;
use serde::Serialize;
use std::fmt;

macro_rules! reconfig_result {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal => $desc:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(self) -> u8 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: u8) -> Option<Self> {
                Self::ALL.iter().copied().find(|r| r.code() == code)
            }

            pub fn description(self) -> &'static str {
                match self {
                    $($name::$variant => $desc),+
                }
            }

            pub fn is_success(self) -> bool {
                self.code() < 10
            }

            /// Maps a commit outcome onto this family.
            pub fn from_commit(result: CommitResult) -> Self {
                match result {
                    CommitResult::Success => $name::Success,
                    CommitResult::SecurityError => $name::SecurityError,
                    CommitResult::ProtocolError => $name::ProtocolError,
                    CommitResult::IoTimeout => $name::IoTimeout,
                    CommitResult::GeneralError => $name::GeneralError,
                }
            }

            /// Maps an error raised while preparing the operation.
            pub fn from_error(err: &PsemError) -> Self {
                if err.is_timeout() {
                    $name::IoTimeout
                } else if err.response() == Some(PsemResponse::Isc) {
                    $name::SecurityError
                } else {
                    $name::ProtocolError
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} ({})", self.description(), self.code())
            }
        }
    };
}

reconfig_result! {
    /// Outcome of a password or tertiary-password reconfiguration.
    PasswordReconfigResult {
        Success = 0 => "passwords reconfigured",
        /// A password duplicated the one stored at another level (ONP).
        DuplicateSecurityError = 10 => "duplicate password rejected",
        SecurityError = 20 => "insufficient security clearance",
        ProtocolError = 21 => "protocol error",
        IoTimeout = 22 => "device timed out",
        GeneralError = 23 => "reconfiguration failed",
    }
}

impl PasswordReconfigResult {
    /// Maps the device response to a single legacy password write.
    pub fn from_response(response: PsemResponse) -> Self {
        match response {
            PsemResponse::Ok => PasswordReconfigResult::Success,
            PsemResponse::Isc => PasswordReconfigResult::SecurityError,
            PsemResponse::Onp => PasswordReconfigResult::DuplicateSecurityError,
            PsemResponse::Err => PasswordReconfigResult::ProtocolError,
        }
    }
}

reconfig_result! {
    /// Outcome of a TOU/calendar reconfiguration.
    TouReconfigResult {
        Success = 0 => "TOU schedule reconfigured",
        /// The device has no TOU configuration; nothing was written.
        SuccessNotConfiguredForTou = 1 => "device not configured for TOU",
        /// A DST file was supplied but the device does not apply DST.
        SuccessDstNotApplicable = 2 => "TOU reconfigured, DST not applicable",
        /// The schedule runs past the device's calendar capacity.
        SuccessScheduleTruncated = 3 => "TOU reconfigured, schedule truncated",
        ClockNotRunning = 10 => "device clock not running",
        DstDataMissing = 11 => "DST data missing",
        ScheduleNotValid = 12 => "schedule not valid",
        ScheduleNotSupported = 13 => "schedule not supported by device",
        ScheduleExpired = 14 => "schedule expired",
        SecurityError = 20 => "insufficient security clearance",
        ProtocolError = 21 => "protocol error",
        IoTimeout = 22 => "device timed out",
        GeneralError = 23 => "reconfiguration failed",
    }
}

reconfig_result! {
    /// Outcome of writing a custom (billing) schedule.
    CsReconfigResult {
        Success = 0 => "custom schedule written",
        /// More dates than the device holds; the first `capacity` were written.
        SuccessScheduleTruncated = 1 => "custom schedule written, truncated",
        ErrorFileNotFound = 10 => "custom schedule not found or empty",
        SecurityError = 20 => "insufficient security clearance",
        ProtocolError = 21 => "protocol error",
        IoTimeout = 22 => "device timed out",
        GeneralError = 23 => "reconfiguration failed",
    }
}

reconfig_result! {
    /// Outcome of setting the device clock.
    ClockReconfigResult {
        Success = 0 => "clock set",
        /// The time cannot be represented by the meter.
        InvalidTime = 10 => "time out of range for device",
        SecurityError = 20 => "insufficient security clearance",
        ProtocolError = 21 => "protocol error",
        IoTimeout = 22 => "device timed out",
        GeneralError = 23 => "procedure failed",
    }
}

reconfig_result! {
    /// Outcome of a single maintenance procedure such as clearing the history log.
    ProcedureReconfigResult {
        Success = 0 => "procedure completed",
        SecurityError = 20 => "insufficient security clearance",
        ProtocolError = 21 => "protocol error",
        IoTimeout = 22 => "device timed out",
        GeneralError = 23 => "procedure failed",
    }
}
