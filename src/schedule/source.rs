//! Schedule source implementations.

use crate::schedule::{
    CustomSchedule, CustomScheduleFile, DstSchedule, ScheduleError, ScheduleSource, TouSchedule,
};
use log::debug;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Reads schedules from JSON files. Relative paths resolve against `root`
/// when one is set.
#[derive(Debug, Clone, Default)]
pub struct JsonScheduleSource {
    root: Option<PathBuf>,
}

impl JsonScheduleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path),
            None => PathBuf::from(path),
        }
    }

    fn load<T: DeserializeOwned>(&self, path: &str) -> Result<T, ScheduleError> {
        let full = self.resolve(path);
        debug!("Loading schedule from {}", full.display());
        let json = fs::read_to_string(&full)
            .map_err(|e| ScheduleError::NotFound(format!("{}: {e}", full.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| ScheduleError::Parse(format!("{}: {e}", full.display())))
    }
}

impl ScheduleSource for JsonScheduleSource {
    fn tou_schedule(&self, path: &str) -> Result<TouSchedule, ScheduleError> {
        let schedule: TouSchedule = self.load(path)?;
        schedule.validate()?;
        Ok(schedule)
    }

    fn dst_schedule(&self, path: &str) -> Result<DstSchedule, ScheduleError> {
        let schedule: DstSchedule = self.load(path)?;
        schedule.validate()?;
        Ok(schedule)
    }

    fn custom_schedule(&self, path: &str, name: &str) -> Result<CustomSchedule, ScheduleError> {
        let file: CustomScheduleFile = self.load(path)?;
        let schedule = file.find(name)?.clone();
        schedule.validate()?;
        Ok(schedule)
    }
}

/// Serves schedules registered under path keys.
#[derive(Debug, Clone, Default)]
pub struct MemoryScheduleSource {
    tou: HashMap<String, TouSchedule>,
    dst: HashMap<String, DstSchedule>,
    custom: HashMap<String, CustomScheduleFile>,
}

impl MemoryScheduleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tou(mut self, path: &str, schedule: TouSchedule) -> Self {
        self.tou.insert(path.to_string(), schedule);
        self
    }

    pub fn with_dst(mut self, path: &str, schedule: DstSchedule) -> Self {
        self.dst.insert(path.to_string(), schedule);
        self
    }

    pub fn with_custom(mut self, path: &str, file: CustomScheduleFile) -> Self {
        self.custom.insert(path.to_string(), file);
        self
    }
}

impl ScheduleSource for MemoryScheduleSource {
    fn tou_schedule(&self, path: &str) -> Result<TouSchedule, ScheduleError> {
        let schedule = self
            .tou
            .get(path)
            .cloned()
            .ok_or_else(|| ScheduleError::NotFound(path.to_string()))?;
        schedule.validate()?;
        Ok(schedule)
    }

    fn dst_schedule(&self, path: &str) -> Result<DstSchedule, ScheduleError> {
        let schedule = self
            .dst
            .get(path)
            .cloned()
            .ok_or_else(|| ScheduleError::NotFound(path.to_string()))?;
        schedule.validate()?;
        Ok(schedule)
    }

    fn custom_schedule(&self, path: &str, name: &str) -> Result<CustomSchedule, ScheduleError> {
        let file = self
            .custom
            .get(path)
            .ok_or_else(|| ScheduleError::NotFound(path.to_string()))?;
        let schedule = file.find(name)?.clone();
        schedule.validate()?;
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_json_errors_are_classified() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonScheduleSource::with_root(dir.path());

        assert!(matches!(
            source.dst_schedule("missing.json"),
            Err(ScheduleError::NotFound(_))
        ));

        let mut file = fs::File::create(dir.path().join("broken.json")).unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            source.tou_schedule("broken.json"),
            Err(ScheduleError::Parse(_))
        ));
    }

    #[test]
    fn test_custom_schedule_by_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("cs.json"),
            r#"{"schedules": [{"name": "quarterly", "dates": ["2026-04-01"]}]}"#,
        )
        .unwrap();
        let source = JsonScheduleSource::with_root(dir.path());

        let schedule = source.custom_schedule("cs.json", "quarterly").unwrap();
        assert_eq!(schedule.dates.len(), 1);
        assert!(matches!(
            source.custom_schedule("cs.json", "monthly"),
            Err(ScheduleError::UnknownSchedule(_))
        ));
    }
}
