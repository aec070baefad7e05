mod meter_support;

use meter_support::*;
use psem_rs::constants::{
    MFG_PROC_CLEAR_HISTORY_LOG, MFG_TABLE_CONFIG, STD_PROC_SET_DATE_TIME, STD_TABLE_GENERAL_MFG_ID,
};
use psem_rs::psem::{CallKind, TransportCall};
use psem_rs::tables::{ConstantsConfig, GeneralMfgId};
use psem_rs::{
    ClockReconfigResult, CsReconfigResult, Device, DeviceType, JsonScheduleSource, MemoryScheduleSource,
    MeterFamily, MeterImage, MeterProfile, ProcedureReconfigResult, PsemError, SessionConfig,
    TouReconfigResult,
};

fn config_reads(device: &Device<psem_rs::MemoryTransport>) -> usize {
    device
        .transport()
        .journal()
        .iter()
        .filter(|c| matches!(c, TransportCall::ReadTableRange { table, .. } if *table == MFG_TABLE_CONFIG))
        .count()
}

#[test]
fn test_open_single_phase() {
    let device = open_meter(MeterProfile::default(), MemoryScheduleSource::new());

    assert_eq!(device.identity().model, "SPA1");
    assert_eq!(device.identity().serial_number, "000000000001");
    assert_eq!(device.layout().family, MeterFamily::SinglePhase);
    assert_eq!(device.device_type(), DeviceType::Advanced);
    assert_eq!(device.header().calendar_years, 5);
    assert!(device.header().calendar_first());
}

#[test]
fn test_open_polyphase_basic() {
    let profile = MeterProfile {
        family: MeterFamily::Polyphase,
        device_type: DeviceType::Basic,
        calendar_years: 10,
        ..MeterProfile::default()
    };
    let device = open_meter(profile, MemoryScheduleSource::new());

    assert_eq!(device.identity().model, "PPB1");
    assert_eq!(device.layout().family, MeterFamily::Polyphase);
    assert_eq!(device.device_type(), DeviceType::Basic);
    assert_eq!(device.header().calendar_years, 10);
}

#[test]
fn test_device_type_override() {
    let transport = MeterProfile::default().build().unwrap();
    let config = SessionConfig {
        device_type_override: Some(DeviceType::Basic),
        ..SessionConfig::default()
    };
    let device = Device::open(transport, config, Box::new(MemoryScheduleSource::new())).unwrap();
    assert_eq!(device.device_type(), DeviceType::Basic);
}

#[test]
fn test_open_unknown_model() {
    let profile = MeterProfile::default();
    let mut transport = profile.build().unwrap();
    let identity = GeneralMfgId {
        model: "ZZA1".into(),
        ..profile.identity()
    };
    transport.set_table(STD_TABLE_GENERAL_MFG_ID, identity.encode());

    let result = Device::open(transport, SessionConfig::default(), Box::new(MemoryScheduleSource::new()));
    assert!(matches!(result, Err(PsemError::UnknownMeterModel(model)) if model == "ZZA1"));
}

#[test]
fn test_open_link_down() {
    let mut transport = MeterProfile::default().build().unwrap();
    transport.set_link_down(true);

    let result = Device::open(transport, SessionConfig::default(), Box::new(MemoryScheduleSource::new()));
    assert!(matches!(result, Err(PsemError::Transport(_))));
}

#[test]
fn test_blocks_are_cached_until_invalidated() {
    let profile = MeterProfile::default();
    let mut transport = profile.build().unwrap();
    let header = profile.header();
    let constants = ConstantsConfig {
        program_id: 17,
        customer_id: "CUSTOMER-9".into(),
        ct_ratio: 200,
        vt_ratio: 1,
        register_multiplier: 10,
        demand_interval_minutes: 15,
        demand_subintervals: 3,
        cold_load_pickup_minutes: 5,
    };
    let mut config = transport.table(MFG_TABLE_CONFIG).unwrap().to_vec();
    let bytes = constants.encode();
    let start = header.constants as usize;
    config[start..start + bytes.len()].copy_from_slice(&bytes);
    transport.set_table(MFG_TABLE_CONFIG, config);

    let mut device = Device::open(transport, SessionConfig::default(), Box::new(MemoryScheduleSource::new())).unwrap();
    device.transport_mut().clear_journal();

    assert_eq!(device.constants_config().unwrap(), &constants);
    assert_eq!(device.constants_config().unwrap().ct_ratio, 200);
    assert_eq!(config_reads(&device), 1);

    device.invalidate_table(MFG_TABLE_CONFIG);
    device.constants_config().unwrap();
    assert_eq!(config_reads(&device), 2);
}

#[test]
fn test_blank_blocks_decode() {
    let mut device = open_quiet(MeterProfile::default(), MemoryScheduleSource::new());

    assert!(device.display_config().unwrap().active_items().is_empty());
    assert_eq!(device.history_log_config().unwrap().enabled_events().count(), 0);
    assert!(!device.option_board_config().unwrap().is_installed());
    assert!(device.billing_schedule().unwrap().entries.iter().all(|&d| d == 0));
    assert_eq!(device.tou_config().unwrap().tou_id, 1);
    assert!(!device.calendar_config().unwrap().dst_enabled());
    assert!(device.ed_mode_status().unwrap().clock_running());
}

#[test]
fn test_set_clock_restarts_stopped_clock() {
    let profile = MeterProfile {
        clock_running: false,
        ..MeterProfile::default()
    };
    let source = MemoryScheduleSource::new().with_tou(TOU_PATH, two_season_schedule(2026, 3));
    let mut device = open_quiet(profile, source);

    assert!(!device.ed_mode_status().unwrap().clock_running());
    assert_eq!(device.reconfigure_tou(TOU_PATH, None), TouReconfigResult::ClockNotRunning);

    let now = date_time(2026, 3, 1, 8, 0);
    assert_eq!(device.set_clock(now), ClockReconfigResult::Success);

    let params = device
        .transport()
        .journal()
        .iter()
        .find_map(|c| match c {
            TransportCall::Procedure { procedure, params } if *procedure == STD_PROC_SET_DATE_TIME => {
                Some(params.clone())
            }
            _ => None,
        })
        .unwrap();
    // 2026-03-01 is a Sunday
    assert_eq!(params, vec![0x07, 26, 3, 1, 8, 0, 0, 0x00]);

    assert_eq!(device.clock().unwrap().date_time, now);
    assert!(device.ed_mode_status().unwrap().clock_running());
    assert_eq!(device.reconfigure_tou(TOU_PATH, None), TouReconfigResult::Success);
}

#[test]
fn test_set_clock_keeps_dst_flag() {
    let mut device = open_quiet(MeterProfile::default(), MemoryScheduleSource::new());
    let mut clock = device.transport().table(psem_rs::constants::STD_TABLE_CLOCK).unwrap().to_vec();
    clock[6] |= psem_rs::constants::CLOCK_QUAL_DST_FLAG;
    device.transport_mut().set_table(psem_rs::constants::STD_TABLE_CLOCK, clock);

    assert_eq!(device.set_clock(date_time(2026, 7, 4, 12, 0)), ClockReconfigResult::Success);
    assert!(device.clock().unwrap().dst_active());
}

#[test]
fn test_set_clock_out_of_range() {
    let mut device = open_quiet(MeterProfile::default(), MemoryScheduleSource::new());

    assert_eq!(device.set_clock(date_time(1999, 12, 31, 23, 0)), ClockReconfigResult::InvalidTime);
    assert!(device.transport().procedures().is_empty());
}

#[test]
fn test_set_clock_timeout() {
    let mut device = open_quiet(MeterProfile::default(), MemoryScheduleSource::new());
    device
        .transport_mut()
        .fail_with_timeout(CallKind::Procedure(STD_PROC_SET_DATE_TIME));

    assert_eq!(device.set_clock(date_time(2026, 2, 1, 0, 0)), ClockReconfigResult::IoTimeout);
}

#[test]
fn test_clear_history_log() {
    let mut device = open_quiet(MeterProfile::default(), MemoryScheduleSource::new());

    assert_eq!(device.clear_history_log(), ProcedureReconfigResult::Success);
    assert_eq!(device.transport().history_log_clears(), 1);
    assert_eq!(device.transport().procedures(), vec![MFG_PROC_CLEAR_HISTORY_LOG]);

    device.transport_mut().set_locked(true);
    assert_eq!(device.clear_history_log(), ProcedureReconfigResult::SecurityError);
    assert_eq!(device.transport().history_log_clears(), 1);
}

#[test]
fn test_json_schedules_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("tou.json"),
        serde_json::to_string_pretty(&two_season_schedule(2026, 3)).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("billing.json"),
        r#"{"schedules": [
            {"name": "quarterly", "dates": ["2026-04-01", "2026-07-01"],
             "recurrence": {"start": "2026-10-01", "day": 1, "interval_months": 3, "end": "2027-04-01"}}
        ]}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let transport = MeterProfile::default().build().unwrap();
    let schedules = JsonScheduleSource::with_root(dir.path());
    let mut device = Device::open(transport, SessionConfig::default(), Box::new(schedules)).unwrap();

    assert_eq!(device.reconfigure_tou("tou.json", None), TouReconfigResult::Success);
    assert_eq!(device.reconfigure_tou("broken.json", None), TouReconfigResult::ScheduleNotValid);
    assert_eq!(device.tou_status().unwrap().current_season, Some(1));

    assert_eq!(
        device.write_custom_schedule("billing.json", "quarterly"),
        CsReconfigResult::Success
    );
    // April, July, October, January, April
    assert_eq!(device.billing_schedule().unwrap().dates().len(), 5);
}

#[test]
fn test_meter_image_survives_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meter.json");
    let source = MemoryScheduleSource::new().with_tou(TOU_PATH, two_season_schedule(2026, 3));

    let mut device = open_meter(MeterProfile::default(), source);
    assert_eq!(device.reconfigure_tou(TOU_PATH, None), TouReconfigResult::Success);
    MeterImage::from_transport(device.transport()).save(&path).unwrap();

    let transport = MeterImage::load(&path).unwrap().into_transport().unwrap();
    let mut reopened = Device::open(transport, SessionConfig::default(), Box::new(MemoryScheduleSource::new())).unwrap();
    assert_eq!(reopened.tou_config().unwrap().tou_id, 42);
    assert_eq!(reopened.calendar_config().unwrap().calendar_id, 42);
}

#[test]
fn test_session_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, r#"{"reference_year": 2000, "custom_schedule_horizon_years": 2}"#).unwrap();

    let config = SessionConfig::load(&path).unwrap();
    assert_eq!(config.custom_schedule_horizon_years, 2);
    assert_eq!(config.standard_security_from, 5.0);

    assert!(matches!(
        SessionConfig::load(dir.path().join("missing.json")),
        Err(PsemError::Config(_))
    ));
}
