//! Button driven backlight controller for JDI DRM display panels.
//!
//! There is no public code API for you to use! However, the command
//! line interface should be stable.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;

use crate::backlight::BacklightPort;
use crate::backlight::SysfsBacklight;
use crate::debounce::Debouncer;
use crate::flags::Cli;
use crate::flags::Command;
use crate::flags::RunFlags;
use crate::flags::Switch;
use crate::monitor::InactivityConfig;
use crate::params::DriverParams;
use crate::state::Snapshot;
use crate::state::StateMachine;
use crate::status::Report;

mod backlight;
mod debounce;
mod errors;
mod flags;
mod input;
mod ladder;
mod monitor;
mod params;
mod state;
mod status;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Some(Command::Run(ref run)) => run_controller(&cli, run),
        None | Some(Command::Status) => show_status(&cli),
        Some(Command::Powersave {
            disable,
            timeout_ms,
        }) => {
            let params = driver_params(&cli)?;
            if disable {
                params
                    .disable_powersave()
                    .context("failed to disable power save")?;
            } else {
                params
                    .enable_powersave(timeout_ms)
                    .context("failed to enable power save")?;
            }
            Ok(())
        }
        Some(Command::Dither { state }) => {
            let params = driver_params(&cli)?;
            params
                .set_dither(state == Switch::On)
                .context("failed to set dithering")?;
            Ok(())
        }
    }
}

fn driver_params(cli: &Cli) -> anyhow::Result<DriverParams> {
    let params = DriverParams::new(cli.params_dir.clone());
    if !params.available() {
        anyhow::bail!(
            "JDI driver not loaded: {} is missing",
            cli.params_dir.display()
        );
    }
    Ok(params)
}

/// Set up and run the daemon. Missing backlight hardware is fatal
/// here; there is nothing meaningful to control without it.
fn run_controller(cli: &Cli, run: &RunFlags) -> anyhow::Result<()> {
    if let Some(wait) = run.wait {
        if !utils::wait_for_file(&cli.backlight_dir, Duration::from_millis(wait.into())) {
            anyhow::bail!(
                "backlight node {} did not appear within {wait}ms",
                cli.backlight_dir.display()
            );
        }
    }
    let port = SysfsBacklight::new(cli.backlight_dir.clone());
    if !port.available() {
        anyhow::bail!(
            "no backlight found at {}; nothing to control",
            cli.backlight_dir.display()
        );
    }

    let mut machine = StateMachine::new(cli.ladder.clone(), port);
    machine.sync_from_hardware(Instant::now());

    let sources = input::build_sources(run);
    let debouncer = Debouncer::new(Duration::from_millis(run.debounce_ms));
    let idle = InactivityConfig {
        timeout: Duration::from_secs(run.dim_timeout),
        check_interval: Duration::from_secs(1),
    };

    monitor::install_signal_handlers()?;
    let machine = Arc::new(Mutex::new(machine));
    monitor::run(Arc::clone(&machine), sources, debouncer, idle)?;

    // Final report on the way out.
    let machine = machine.lock().unwrap_or_else(|e| e.into_inner());
    let params = DriverParams::new(cli.params_dir.clone());
    status::print_report(
        "JDI Backlight Controller",
        &Report {
            snapshot: machine.snapshot(Instant::now()),
            ladder: machine.ladder(),
            dim_timeout: Some(idle.timeout),
            params: Some(&params),
            power_state: machine.port().power_state(),
            show_idle: true,
        },
    );
    Ok(())
}

/// One-shot status. Reads the hardware, never writes: status reporting
/// must not drive transitions.
fn show_status(cli: &Cli) -> anyhow::Result<()> {
    let port = SysfsBacklight::new(cli.backlight_dir.clone());
    if !port.available() {
        anyhow::bail!("no backlight found at {}", cli.backlight_dir.display());
    }
    let raw = port
        .read_level()
        .context("cannot read current brightness")?;
    let snapshot = Snapshot {
        index: cli.ladder.sync_index(raw),
        value: raw,
        is_on: raw > 0,
        max: port.max_or_fallback(),
        idle_for: Duration::ZERO,
    };
    let params = DriverParams::new(cli.params_dir.clone());
    status::print_report(
        "JDI Display Status",
        &Report {
            snapshot,
            ladder: &cli.ladder,
            dim_timeout: None,
            params: Some(&params),
            power_state: port.power_state(),
            show_idle: false,
        },
    );
    Ok(())
}
