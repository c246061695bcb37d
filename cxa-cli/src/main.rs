//! CXA amplifier control from the command line
//!
//! Reads the device configuration, builds the amplifier facade, and either
//! runs one command or keeps polling (`watch`), which is the role a home
//! automation host's scheduler plays.
//!
//! Usage:
//!   cxa status
//!   cxa on
//!   cxa source USB
//!   cxa sound-mode AB
//!   cxa volume up
//!   cxa watch --interval 10
//!   cxa --simulate status --json

mod settings;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cxa_device::{setup, setup_with_transport, CxaDevice, DeviceConfig};
use cxa_sim::{SimulatedTransport, VirtualAmplifier};
use tracing::info;

/// Control a Cambridge Audio CXA61/CXA81 amplifier
#[derive(Parser)]
#[command(name = "cxa", version, about)]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/cxa/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Talk to a virtual amplifier instead of the configured transport
    #[arg(long, global = true)]
    simulate: bool,

    /// Print status as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the amplifier and print its state
    Status,
    /// Power on
    On,
    /// Power off (standby)
    Off,
    /// Mute the output
    Mute,
    /// Unmute the output
    Unmute,
    /// Select an input by label (see `sources`)
    Source { label: String },
    /// Select speaker outputs: A, AB or B
    SoundMode { label: String },
    /// List the inputs of the configured model
    Sources,
    /// List the speaker output modes
    SoundModes,
    /// Step the volume through the companion streamer
    Volume {
        #[arg(value_enum)]
        direction: Direction,
    },
    /// Poll repeatedly and print state changes
    Watch {
        /// Seconds between polls
        #[arg(long, default_value_t = 30)]
        interval: u64,

        /// Stop after this many polls (default: run until interrupted)
        #[arg(long)]
        count: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Up,
    Down,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cxa=info,cxa_protocol=info,cxa_transport=info,cxa_device=info,cxa_sim=info".into()
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = settings::load(cli.config.as_deref(), cli.simulate)?;
    let mut device = connect(&config, cli.simulate)?;

    match cli.command {
        Command::Status => {
            device.refresh();
            print_status(&device, cli.json)?;
        }
        Command::On => device.turn_on(),
        Command::Off => device.turn_off(),
        Command::Mute => device.mute(true),
        Command::Unmute => device.mute(false),
        Command::Source { label } => device.select_source(&label)?,
        Command::SoundMode { label } => device.select_sound_mode(&label)?,
        Command::Sources => print_list(&device.source_list(), cli.json)?,
        Command::SoundModes => print_list(&device.sound_mode_list(), cli.json)?,
        Command::Volume { direction } => match direction {
            Direction::Up => device.volume_up()?,
            Direction::Down => device.volume_down()?,
        },
        Command::Watch { interval, count } => watch(&mut device, interval, count, cli.json)?,
    }

    Ok(())
}

/// Build the device, swapping in a virtual amplifier for `--simulate`
fn connect(config: &DeviceConfig, simulate: bool) -> Result<CxaDevice> {
    let mut registered = None;

    if simulate {
        let profile = config.validate()?;
        let amp = VirtualAmplifier::new(config.name.clone(), profile);
        setup_with_transport(config, Box::new(SimulatedTransport::new(amp)), |device| {
            registered = Some(device)
        })?;
    } else {
        setup(config, |device| registered = Some(device))
            .with_context(|| format!("Failed to set up {}", config.name))?;
    }

    registered.context("No device was registered")
}

fn print_status(device: &CxaDevice, json: bool) -> Result<()> {
    let status = device.status();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("{status}");
    }
    Ok(())
}

fn print_list(labels: &[&str], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(labels)?);
    } else {
        for label in labels {
            println!("{label}");
        }
    }
    Ok(())
}

/// The polling loop: refresh, report changes, sleep
fn watch(device: &mut CxaDevice, interval: u64, count: Option<u64>, json: bool) -> Result<()> {
    let interval = Duration::from_secs(interval.max(1));
    info!(device = device.name(), ?interval, "Watching amplifier");

    let mut last = None;
    let mut polls = 0;
    loop {
        device.refresh();
        polls += 1;

        let state = device.state().clone();
        if last.as_ref() != Some(&state) {
            print_status(device, json)?;
            last = Some(state);
        }

        if count.is_some_and(|count| polls >= count) {
            return Ok(());
        }
        thread::sleep(interval);
    }
}
