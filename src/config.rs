//! Session configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields a working configuration.

use crate::constants::DEFAULT_REFERENCE_YEAR;
use crate::error::PsemError;
use crate::tables::layout::DeviceType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Firmware revision from which passwords live in the standard SECURITY table.
pub const DEFAULT_STANDARD_SECURITY_FROM: f32 = 5.0;

/// Years of custom schedule dates written ahead of the device clock.
pub const DEFAULT_CUSTOM_SCHEDULE_HORIZON_YEARS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Year the meter's year bytes and billing day counts are relative to.
    pub reference_year: i32,
    pub standard_security_from: f32,
    pub custom_schedule_horizon_years: u32,
    /// Replaces the device type derived from the model string.
    pub device_type_override: Option<DeviceType>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reference_year: DEFAULT_REFERENCE_YEAR,
            standard_security_from: DEFAULT_STANDARD_SECURITY_FROM,
            custom_schedule_horizon_years: DEFAULT_CUSTOM_SCHEDULE_HORIZON_YEARS,
            device_type_override: None,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, PsemError> {
        serde_json::from_str(json).map_err(|e| PsemError::Config(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PsemError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| PsemError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SessionConfig::from_json(r#"{"device_type_override": "BASIC"}"#).unwrap();
        assert_eq!(config.reference_year, 2000);
        assert_eq!(config.custom_schedule_horizon_years, 5);
        assert_eq!(config.device_type_override, Some(DeviceType::Basic));
        assert_eq!(SessionConfig::from_json("{}").unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            SessionConfig::from_json("{\"reference_year\": \"x\"}"),
            Err(PsemError::Config(_))
        ));
    }
}
