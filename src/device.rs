//! # Device Session
//!
//! [`Device`] is the main entry point: it owns a [`Transport`], reads the
//! identity and configuration header once when opened, selects the meter
//! layout and password backend, and exposes lazily cached table accessors
//! alongside the reconfiguration operations.
//!
//! A session is not shared between threads; every operation takes
//! `&mut self`, so an open/write/close sequence can never interleave with
//! another call on the same device.

use crate::config::SessionConfig;
use crate::constants::{
    MFG_TABLE_CONFIG, STD_TABLE_CLOCK, STD_TABLE_ED_MODE_STATUS, STD_TABLE_GENERAL_MFG_ID,
};
use crate::error::PsemError;
use crate::lid::{Lid, LidResolver};
use crate::psem::transport::Transport;
use crate::reconfigure::{
    self, ClockReconfigResult, CsReconfigResult, CustomScheduleTarget, PasswordReconfigResult,
    PasswordReconfigure, ProcedureReconfigResult, SecurityBackend, TouDeviceState, TouReconfigResult,
};
use crate::schedule::ScheduleSource;
use crate::tables::{
    device_type_for_model, layout_for_model, BillingSchedule, CalendarConfig, ConfigBlock, ConfigHeader,
    ConstantsConfig, DeviceType, DisplayConfig, EdModeStatus, GeneralMfgId, HistoryLogConfig, MeterClock,
    MeterLayout, OptionBoardConfig, TableCell, TouConfig, TouStatus,
};
use chrono::NaiveDateTime;
use log::{debug, info};

const CONFIG_SOURCES: &[u16] = &[MFG_TABLE_CONFIG];
const STATUS_SOURCES: &[u16] = &[STD_TABLE_ED_MODE_STATUS];
const CLOCK_SOURCES: &[u16] = &[STD_TABLE_CLOCK];
const TOU_STATUS_SOURCES: &[u16] = &[MFG_TABLE_CONFIG, STD_TABLE_CLOCK];

fn read_block<T: Transport + ?Sized>(
    transport: &mut T,
    layout: &MeterLayout,
    header: &ConfigHeader,
    block: ConfigBlock,
) -> Result<Vec<u8>, PsemError> {
    let offset = header.offset(block);
    let len = layout.block_len(block, usize::from(header.calendar_years));
    debug!("Reading {} block: {} bytes at offset {}", block.label(), len, offset);
    Ok(transport.read_table_range(MFG_TABLE_CONFIG, offset, len)?)
}

fn read_calendar<T: Transport + ?Sized>(
    transport: &mut T,
    layout: &MeterLayout,
    header: &ConfigHeader,
) -> Result<CalendarConfig, PsemError> {
    let bytes = read_block(transport, layout, header, ConfigBlock::Calendar)?;
    CalendarConfig::decode(&bytes, layout, usize::from(header.calendar_years))
}

fn read_tou<T: Transport + ?Sized>(
    transport: &mut T,
    layout: &MeterLayout,
    header: &ConfigHeader,
) -> Result<TouConfig, PsemError> {
    let bytes = read_block(transport, layout, header, ConfigBlock::Tou)?;
    TouConfig::decode(&bytes, layout)
}

fn read_clock<T: Transport + ?Sized>(transport: &mut T, reference_year: i32) -> Result<MeterClock, PsemError> {
    let bytes = transport.read_table(STD_TABLE_CLOCK)?;
    MeterClock::decode(&bytes, reference_year)
}

/// A configuration session with one meter.
pub struct Device<T: Transport> {
    transport: T,
    config: SessionConfig,
    identity: GeneralMfgId,
    layout: &'static MeterLayout,
    device_type: DeviceType,
    header: ConfigHeader,
    security: SecurityBackend,
    schedules: Box<dyn ScheduleSource>,

    constants: TableCell<ConstantsConfig>,
    billing: TableCell<BillingSchedule>,
    display: TableCell<DisplayConfig>,
    history_log: TableCell<HistoryLogConfig>,
    calendar: TableCell<CalendarConfig>,
    tou: TableCell<TouConfig>,
    option_board: TableCell<OptionBoardConfig>,
    status: TableCell<EdModeStatus>,
    clock: TableCell<MeterClock>,
    tou_status: TableCell<TouStatus>,
}

impl<T: Transport> Device<T> {
    /// Opens a session: reads GENERAL_MFG_ID and the configuration header,
    /// then selects the layout, device type and password backend.
    pub fn open(
        mut transport: T,
        config: SessionConfig,
        schedules: Box<dyn ScheduleSource>,
    ) -> Result<Self, PsemError> {
        let identity = GeneralMfgId::decode(&transport.read_table(STD_TABLE_GENERAL_MFG_ID)?)?;
        let model = identity.model.text();
        let layout = layout_for_model(&model)?;
        let device_type = config
            .device_type_override
            .unwrap_or_else(|| device_type_for_model(&model));

        let header_bytes = transport.read_table_range(MFG_TABLE_CONFIG, 0, layout.header_len())?;
        let header = ConfigHeader::decode(&header_bytes, layout)?;

        let security = SecurityBackend::select(
            identity.firmware_revision(),
            config.standard_security_from,
            layout.password_len,
        );

        info!(
            "Opened {} meter {} (model {}, firmware {:.3}, {:?}, {} security)",
            identity.manufacturer,
            identity.serial_number,
            identity.model,
            identity.firmware_revision(),
            device_type,
            if security.is_legacy() { "legacy" } else { "standard" }
        );

        Ok(Self {
            transport,
            config,
            identity,
            layout,
            device_type,
            header,
            security,
            schedules,
            constants: TableCell::new(CONFIG_SOURCES),
            billing: TableCell::new(CONFIG_SOURCES),
            display: TableCell::new(CONFIG_SOURCES),
            history_log: TableCell::new(CONFIG_SOURCES),
            calendar: TableCell::new(CONFIG_SOURCES),
            tou: TableCell::new(CONFIG_SOURCES),
            option_board: TableCell::new(CONFIG_SOURCES),
            status: TableCell::new(STATUS_SOURCES),
            clock: TableCell::new(CLOCK_SOURCES),
            tou_status: TableCell::new(TOU_STATUS_SOURCES),
        })
    }

    pub fn identity(&self) -> &GeneralMfgId {
        &self.identity
    }

    pub fn layout(&self) -> &'static MeterLayout {
        self.layout
    }

    pub fn header(&self) -> &ConfigHeader {
        &self.header
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn security_backend(&self) -> SecurityBackend {
        self.security
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Direct transport access. Writes made through it are not seen by the
    /// caches until [`Device::invalidate_table`] is called.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    // Cached table accessors

    pub fn constants_config(&mut self) -> Result<&ConstantsConfig, PsemError> {
        let Self { transport, layout, header, constants, .. } = self;
        constants.get_or_try_load(|| {
            ConstantsConfig::decode(&read_block(transport, layout, header, ConfigBlock::Constants)?)
        })
    }

    pub fn billing_schedule(&mut self) -> Result<&BillingSchedule, PsemError> {
        let Self { transport, layout, header, billing, .. } = self;
        billing.get_or_try_load(|| {
            BillingSchedule::decode(
                &read_block(transport, layout, header, ConfigBlock::BillingSchedule)?,
                layout,
            )
        })
    }

    pub fn display_config(&mut self) -> Result<&DisplayConfig, PsemError> {
        let Self { transport, layout, header, display, .. } = self;
        display.get_or_try_load(|| {
            DisplayConfig::decode(&read_block(transport, layout, header, ConfigBlock::Display)?, layout)
        })
    }

    pub fn history_log_config(&mut self) -> Result<&HistoryLogConfig, PsemError> {
        let Self { transport, layout, header, history_log, .. } = self;
        history_log.get_or_try_load(|| {
            HistoryLogConfig::decode(&read_block(transport, layout, header, ConfigBlock::HistoryLog)?, layout)
        })
    }

    pub fn calendar_config(&mut self) -> Result<&CalendarConfig, PsemError> {
        let Self { transport, layout, header, calendar, .. } = self;
        calendar.get_or_try_load(|| read_calendar(transport, layout, header))
    }

    pub fn tou_config(&mut self) -> Result<&TouConfig, PsemError> {
        let Self { transport, layout, header, tou, .. } = self;
        tou.get_or_try_load(|| read_tou(transport, layout, header))
    }

    pub fn option_board_config(&mut self) -> Result<&OptionBoardConfig, PsemError> {
        let Self { transport, layout, header, option_board, .. } = self;
        option_board.get_or_try_load(|| {
            OptionBoardConfig::decode(&read_block(transport, layout, header, ConfigBlock::OptionBoard)?, layout)
        })
    }

    pub fn ed_mode_status(&mut self) -> Result<&EdModeStatus, PsemError> {
        let Self { transport, status, .. } = self;
        status.get_or_try_load(|| EdModeStatus::decode(&transport.read_table(STD_TABLE_ED_MODE_STATUS)?))
    }

    pub fn clock(&mut self) -> Result<&MeterClock, PsemError> {
        let Self { transport, config, clock, .. } = self;
        clock.get_or_try_load(|| read_clock(transport, config.reference_year))
    }

    /// Status derived from the programmed calendar, TOU block and clock.
    pub fn tou_status(&mut self) -> Result<&TouStatus, PsemError> {
        let Self {
            transport,
            config,
            layout,
            header,
            calendar,
            tou,
            clock,
            tou_status,
            ..
        } = self;
        tou_status.get_or_try_load(|| {
            let calendar = calendar.get_or_try_load(|| read_calendar(transport, layout, header))?;
            let tou = tou.get_or_try_load(|| read_tou(transport, layout, header))?;
            let clock = clock.get_or_try_load(|| read_clock(transport, config.reference_year))?;
            Ok(TouStatus::derive(calendar, tou, clock, config.reference_year))
        })
    }

    /// Drops every cached value derived from `table`.
    pub fn invalidate_table(&mut self, table: u16) {
        debug!("Invalidating caches derived from table {}", table);
        self.constants.invalidate_table(table);
        self.billing.invalidate_table(table);
        self.display.invalidate_table(table);
        self.history_log.invalidate_table(table);
        self.calendar.invalidate_table(table);
        self.tou.invalidate_table(table);
        self.option_board.invalidate_table(table);
        self.status.invalidate_table(table);
        self.clock.invalidate_table(table);
        self.tou_status.invalidate_table(table);
    }

    /// Drops every cached value.
    pub fn invalidate(&mut self) {
        for table in [MFG_TABLE_CONFIG, STD_TABLE_ED_MODE_STATUS, STD_TABLE_CLOCK] {
            self.invalidate_table(table);
        }
    }

    // LIDs

    pub fn read_lid(&mut self, lid: Lid) -> Result<u32, PsemError> {
        LidResolver::new(&mut self.transport, self.layout).read(lid)
    }

    pub fn read_lids(&mut self, lids: &[Lid]) -> Result<Vec<u32>, PsemError> {
        LidResolver::new(&mut self.transport, self.layout).read_many(lids)
    }

    pub fn write_lid(&mut self, lid: Lid, value: u32) -> Result<(), PsemError> {
        LidResolver::new(&mut self.transport, self.layout).write(lid, value)
    }

    // Reconfiguration

    /// Replaces all passwords; `passwords[0]` is the primary level.
    ///
    /// Levels given as empty strings or left off the end of the list end up
    /// cleared on both security backends.
    pub fn reconfigure_passwords(&mut self, passwords: &[&str]) -> PasswordReconfigResult {
        self.security.reconfigure_passwords(&mut self.transport, passwords)
    }

    pub fn reconfigure_tertiary_password(&mut self, password: &str) -> PasswordReconfigResult {
        self.security.reconfigure_tertiary(&mut self.transport, password)
    }

    /// Drops the cached clock and status so the next read sees the device's
    /// current time.
    fn refresh_clock(&mut self) {
        self.invalidate_table(STD_TABLE_CLOCK);
        self.invalidate_table(STD_TABLE_ED_MODE_STATUS);
    }

    fn tou_inputs(&mut self) -> Result<(bool, i32, TouConfig, CalendarConfig), PsemError> {
        let clock_running = self.ed_mode_status()?.clock_running();
        let current_year = self.clock()?.year();
        let tou = self.tou_config()?.clone();
        let calendar = self.calendar_config()?.clone();
        Ok((clock_running, current_year, tou, calendar))
    }

    /// Loads the TOU schedule at `tou_file` (and the DST schedule at
    /// `dst_file`, if any) and programs the calendar and TOU blocks.
    pub fn reconfigure_tou(&mut self, tou_file: &str, dst_file: Option<&str>) -> TouReconfigResult {
        self.refresh_clock();
        let (clock_running, current_year, tou, calendar) = match self.tou_inputs() {
            Ok(inputs) => inputs,
            Err(e) => return TouReconfigResult::from_error(&e),
        };

        let state = TouDeviceState {
            layout: self.layout,
            header: &self.header,
            device_type: self.device_type,
            clock_running,
            current_year,
            reference_year: self.config.reference_year,
            tou: &tou,
            calendar: &calendar,
        };
        let result = reconfigure::reconfigure_tou(
            &mut self.transport,
            &*self.schedules,
            &state,
            tou_file,
            dst_file,
        );

        self.invalidate_table(MFG_TABLE_CONFIG);
        info!("TOU reconfiguration: {}", result);
        result
    }

    /// Writes the custom schedule `name` from the file at `path` into the
    /// billing schedule.
    pub fn write_custom_schedule(&mut self, path: &str, name: &str) -> CsReconfigResult {
        self.refresh_clock();
        let today = match self.clock() {
            Ok(clock) => clock.date(),
            Err(e) => return CsReconfigResult::from_error(&e),
        };

        let target = CustomScheduleTarget {
            layout: self.layout,
            header: &self.header,
            today,
            horizon_years: self.config.custom_schedule_horizon_years,
            reference_year: self.config.reference_year,
        };
        let result = reconfigure::write_custom_schedule(
            &mut self.transport,
            &*self.schedules,
            &target,
            path,
            name,
        );

        self.invalidate_table(MFG_TABLE_CONFIG);
        info!("Custom schedule reconfiguration: {}", result);
        result
    }

    /// Sets the device clock, keeping the current DST flag when the clock
    /// can be read.
    pub fn set_clock(&mut self, date_time: NaiveDateTime) -> ClockReconfigResult {
        self.refresh_clock();
        let dst_active = self.clock().map(MeterClock::dst_active).unwrap_or(false);
        let result = reconfigure::set_clock(&mut self.transport, date_time, dst_active, self.config.reference_year);
        self.refresh_clock();
        result
    }

    pub fn clear_history_log(&mut self) -> ProcedureReconfigResult {
        reconfigure::clear_history_log(&mut self.transport)
    }
}
