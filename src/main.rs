use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use psem_rs::{
    init_logger_with_level, log_debug, log_error, log_info, Device, DeviceType, JsonScheduleSource, Lid, MemoryTransport,
    MeterFamily, MeterImage, MeterProfile, SessionConfig,
};
use psem_rs::util::pretty_hex;
use std::fmt::Display;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "psem-cli")]
#[command(about = "Configure ANSI C12.19 meters through a simulated meter image")]
struct Cli {
    /// Meter image file
    #[arg(short, long, default_value = "meter.json")]
    image: PathBuf,

    /// Session configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory schedule paths are resolved against
    #[arg(long)]
    schedule_root: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Family {
    SinglePhase,
    Polyphase,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a blank meter image
    Init {
        #[arg(long, value_enum, default_value = "single-phase")]
        family: Family,
        /// Basic instead of Advanced device
        #[arg(long)]
        basic: bool,
        #[arg(long, default_value = "5")]
        fw_version: u8,
        #[arg(long, default_value = "2")]
        fw_revision: u8,
        #[arg(long, default_value = "5")]
        calendar_years: u8,
        /// Zero leaves the meter unconfigured for TOU
        #[arg(long, default_value = "1")]
        tou_id: u16,
        #[arg(long)]
        dst: bool,
        /// Lay the TOU block out before the calendar block
        #[arg(long)]
        tou_first: bool,
        /// Mark the meter clock as stopped
        #[arg(long)]
        clock_stopped: bool,
    },
    /// Show identity, header and TOU status
    Header,
    /// Read one or more LIDs (hex with 0x prefix, or decimal)
    ReadLid { lids: Vec<String> },
    /// Replace all passwords, primary first
    Passwords { passwords: Vec<String> },
    /// Replace the tertiary password
    TertiaryPassword { password: String },
    /// Program a TOU schedule
    Tou {
        tou_file: String,
        #[arg(long)]
        dst: Option<String>,
    },
    /// Write a custom billing schedule
    CustomSchedule { path: String, name: String },
    /// Set the meter clock, e.g. 2026-03-01T08:00:00
    SetClock { date_time: NaiveDateTime },
    /// Clear the history log
    ClearLog,
    /// Hex dump of a table payload from the image
    DumpTable { table: u16 },
}

fn open_device(cli: &Cli) -> Result<Device<MemoryTransport>> {
    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    let schedules = match &cli.schedule_root {
        Some(root) => JsonScheduleSource::with_root(root),
        None => JsonScheduleSource::new(),
    };
    let transport = MeterImage::load(&cli.image)
        .and_then(MeterImage::into_transport)
        .with_context(|| format!("loading meter image {}", cli.image.display()))?;
    Ok(Device::open(transport, config, Box::new(schedules))?)
}

fn save_device(device: &Device<MemoryTransport>, path: &Path) -> Result<()> {
    MeterImage::from_transport(device.transport())
        .save(path)
        .with_context(|| format!("saving meter image {}", path.display()))
}

/// Saves the image and turns a failure result into an error exit.
fn finish<R: Display>(device: &Device<MemoryTransport>, path: &Path, result: R, success: bool) -> Result<()> {
    save_device(device, path)?;
    if !success {
        log_error(&format!("Command failed: {result}"));
        bail!("{result}");
    }
    log_info(&result.to_string());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger_with_level(match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    });

    if let Commands::Init {
        family,
        basic,
        fw_version,
        fw_revision,
        calendar_years,
        tou_id,
        dst,
        tou_first,
        clock_stopped,
    } = &cli.command
    {
        let profile = MeterProfile {
            family: match family {
                Family::SinglePhase => MeterFamily::SinglePhase,
                Family::Polyphase => MeterFamily::Polyphase,
            },
            device_type: if *basic { DeviceType::Basic } else { DeviceType::Advanced },
            fw_version: *fw_version,
            fw_revision: *fw_revision,
            calendar_years: *calendar_years,
            tou_id: *tou_id,
            dst_enabled: *dst,
            tou_before_calendar: *tou_first,
            clock_running: !*clock_stopped,
            ..MeterProfile::default()
        };
        let meter = profile.build()?;
        MeterImage::from_transport(&meter).save(&cli.image)?;
        log_info(&format!("Created {} meter image {}", profile.model(), cli.image.display()));
        return Ok(());
    }

    let mut device = open_device(&cli)?;
    let image = cli.image.as_path();

    match &cli.command {
        // Init never opens a device
        Commands::Init { .. } => {}
        Commands::Header => {
            println!("{:#?}", device.identity());
            println!("{:#?}", device.header());
            println!("device type: {:?}", device.device_type());
            println!("security: {:?}", device.security_backend());
            let status = device.tou_status()?.clone();
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::ReadLid { lids } => {
            let lids = lids
                .iter()
                .map(|s| s.parse::<Lid>().with_context(|| format!("bad LID {s:?}")))
                .collect::<Result<Vec<_>>>()?;
            for (lid, value) in lids.iter().zip(device.read_lids(&lids)?) {
                println!("{lid}: {value}");
            }
        }
        Commands::Passwords { passwords } => {
            let passwords: Vec<&str> = passwords.iter().map(String::as_str).collect();
            let result = device.reconfigure_passwords(&passwords);
            finish(&device, image, result, result.is_success())?;
        }
        Commands::TertiaryPassword { password } => {
            let result = device.reconfigure_tertiary_password(password);
            finish(&device, image, result, result.is_success())?;
        }
        Commands::Tou { tou_file, dst } => {
            let result = device.reconfigure_tou(tou_file, dst.as_deref());
            finish(&device, image, result, result.is_success())?;
        }
        Commands::CustomSchedule { path, name } => {
            let result = device.write_custom_schedule(path, name);
            finish(&device, image, result, result.is_success())?;
        }
        Commands::SetClock { date_time } => {
            let result = device.set_clock(*date_time);
            finish(&device, image, result, result.is_success())?;
        }
        Commands::ClearLog => {
            let result = device.clear_history_log();
            finish(&device, image, result, result.is_success())?;
        }
        Commands::DumpTable { table } => {
            let data = device
                .transport()
                .table(*table)
                .with_context(|| format!("table {table} not in image"))?;
            log_debug(&format!("Table {table}: {} bytes", data.len()));
            println!("{}", pretty_hex(data, 0, 16));
        }
    }

    Ok(())
}
