//! Plain text status reports, used by the status command and the final
//! report on shutdown.

use std::time::Duration;

use crate::ladder::Ladder;
use crate::params::DriverParams;
use crate::state::Snapshot;

pub(crate) struct Report<'a> {
    pub snapshot: Snapshot,
    pub ladder: &'a Ladder,
    /// Auto-dim timeout of a running controller; absent for the
    /// one-shot status command.
    pub dim_timeout: Option<Duration>,
    pub params: Option<&'a DriverParams>,
    pub power_state: Option<u32>,
    /// Last-activity age only means something while the controller
    /// runs.
    pub show_idle: bool,
}

pub(crate) fn print_report(title: &str, report: &Report) {
    let rule = "=".repeat(50);
    println!("{rule}");
    println!("{title}");
    println!("{rule}");

    let snap = &report.snapshot;
    let state = if snap.is_on { "ON" } else { "OFF" };
    println!("Brightness: {}/{} ({state})", snap.value, snap.max);
    println!("Ladder: {} (index {})", report.ladder, snap.index);
    if let Some(timeout) = report.dim_timeout {
        println!("Auto-dim timeout: {}s", timeout.as_secs());
    }
    if report.show_idle {
        println!("Last activity: {:.1}s ago", snap.idle_for.as_secs_f64());
    }
    match report.power_state {
        Some(0) => println!("Power state: Normal"),
        Some(v) => println!("Power state: Suspended ({v})"),
        None => {}
    }
    if let Some(params) = report.params {
        if params.available() {
            println!("Driver parameters:");
            for (key, value) in params.entries() {
                let rendered = match value.as_str() {
                    "Y" => "Y (ON)".to_owned(),
                    "N" => "N (OFF)".to_owned(),
                    _ => value,
                };
                println!("  {key:15}: {rendered}");
            }
        }
    }
    println!("{rule}");
}
