//! clap argument parsing

use std::path::PathBuf;

use crate::ladder::Ladder;

#[derive(Debug, clap::Parser)]
#[command(version, about, long_about = None)]
/// Button driven brightness control and auto-dim for JDI display
/// panels.
pub(crate) struct Cli {
    /// Backlight sysfs directory.
    #[clap(long, default_value = "/sys/class/backlight/jdi-backlight")]
    pub backlight_dir: PathBuf,
    /// Driver module parameter directory.
    #[clap(long, default_value = "/sys/module/jdi_drm_enhanced/parameters")]
    pub params_dir: PathBuf,
    /// Brightness ladder: comma separated raw levels, strictly
    /// increasing, starting at 0.
    #[clap(long, default_value = "0,1,3,6")]
    pub ladder: Ladder,
    /// Enable extra verbosity!
    #[clap(short, long)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum Command {
    /// Run the button and auto-dim controller.
    Run(RunFlags),
    /// Show backlight and driver status (the default).
    Status,
    /// Configure the driver's automatic panel power save.
    Powersave {
        /// Turn auto power save off instead of on.
        #[clap(long)]
        disable: bool,
        /// Idle timeout before the panel sleeps, in milliseconds.
        #[clap(long, default_value_t = 120_000)]
        timeout_ms: u32,
    },
    /// Turn hardware dithering on or off.
    Dither {
        #[clap(value_enum)]
        state: Switch,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Switch {
    On,
    Off,
}

#[derive(Debug, clap::Args)]
pub(crate) struct RunFlags {
    /// Path to the evdev node for the brightness button. Autodetected
    /// from /dev/input when omitted.
    #[clap(short = 'i', long)]
    pub input_device: Option<PathBuf>,
    /// Key code reported by the brightness button.
    #[clap(long, default_value_t = 240)]
    pub key_code: u16,
    /// GPIO line of the primary (cycle) button, used when no evdev
    /// node is available.
    #[clap(long, default_value_t = 17)]
    pub cycle_gpio: u32,
    /// GPIO line of the power (toggle) button. Disabled when equal to
    /// the cycle line.
    #[clap(long, default_value_t = 27)]
    pub power_gpio: u32,
    /// Seconds of inactivity before the display is dimmed.
    #[clap(short, long, default_value_t = 300)]
    pub dim_timeout: u64,
    /// Debounce interval for button presses, in milliseconds.
    #[clap(long, default_value_t = 300)]
    pub debounce_ms: u64,
    /// Sample interval for GPIO polling, in milliseconds.
    #[clap(long, default_value_t = 100)]
    pub gpio_poll_ms: u64,
    /// Run without hardware buttons (simulated input source).
    #[clap(long)]
    pub simulate: bool,
    /// Timeout in milliseconds to wait during startup for the
    /// backlight node to appear.
    ///
    /// This can help with late loaded kernel modules.
    #[clap(short, long)]
    pub wait: Option<u32>,
}
