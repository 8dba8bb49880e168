//! Button input sources and the probe/fallback chain.
//!
//! Three variants produce raw button edges: reading the gpio-keys evdev
//! node registered by the device tree overlay, sampling an exported
//! GPIO line through sysfs, and a simulated source that never fires so
//! the controller can run without hardware. Selection happens once at
//! startup with an explicit fallback order: evdev, then GPIO polling,
//! then simulation.

use std::os::fd::AsFd;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use evdev_rs::enums::EventCode;
use evdev_rs::util::event_code_to_int;
use evdev_rs::Device;
use evdev_rs::DeviceWrapper;
use evdev_rs::ReadFlag;
use log::debug;
use log::info;
use log::warn;
use nix::poll::poll;
use nix::poll::PollFd;
use nix::poll::PollFlags;
use nix::poll::PollTimeout;
use smallvec::SmallVec;

use crate::errors::InputError;
use crate::flags::RunFlags;
use crate::utils::read_trimmed;

/// Identifies one configured input source, for debouncing and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SourceId(pub u32);

/// Which state machine transition a button drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ButtonRole {
    Cycle,
    Power,
}

/// One raw, not yet debounced level transition.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawEdge {
    pub source: SourceId,
    pub at: Instant,
    pub pressed: bool,
}

pub(crate) enum InputSource {
    GpioPoll(GpioLine),
    EventDevice(EventDevice),
    Simulated(Simulated),
}

impl InputSource {
    /// Block up to `timeout` for one edge. `None` means no event, which
    /// is not an error; only real I/O failures are.
    pub fn poll(&mut self, timeout: Duration) -> Result<Option<RawEdge>, InputError> {
        match self {
            InputSource::GpioPoll(s) => s.poll(timeout),
            InputSource::EventDevice(s) => s.poll(timeout),
            InputSource::Simulated(s) => s.poll(timeout),
        }
    }

    pub fn role(&self) -> ButtonRole {
        match self {
            InputSource::GpioPoll(s) => s.role,
            InputSource::EventDevice(s) => s.role,
            InputSource::Simulated(s) => s.role,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            InputSource::GpioPoll(s) => format!("gpio line {} ({:?})", s.line, s.role),
            InputSource::EventDevice(s) => {
                format!("evdev {} ({:?})", s.path.display(), s.role)
            }
            InputSource::Simulated(s) => format!("simulated input ({:?})", s.role),
        }
    }
}

/// Polled sysfs GPIO line. The line is wired active-low with a pull-up,
/// so a falling edge is a press.
pub(crate) struct GpioLine {
    id: SourceId,
    role: ButtonRole,
    line: u32,
    value_path: PathBuf,
    sample_interval: Duration,
    /// Previous sample; edge detection needs it, a single read is not
    /// enough.
    prev: Option<bool>,
}

impl GpioLine {
    pub fn open(
        id: SourceId,
        role: ButtonRole,
        line: u32,
        sample_interval: Duration,
    ) -> Result<Self, InputError> {
        let value_path = PathBuf::from(format!("/sys/class/gpio/gpio{line}/value"));
        if !value_path.exists() {
            return Err(InputError::SourceUnavailable {
                reason: format!("gpio line {line} is not exported"),
            });
        }
        Ok(Self {
            id,
            role,
            line,
            value_path,
            sample_interval,
            prev: None,
        })
    }

    fn read_level(&self) -> Result<bool, InputError> {
        let text = read_trimmed(&self.value_path).map_err(|source| InputError::InputIo {
            path: self.value_path.display().to_string(),
            source,
        })?;
        Ok(text != "0")
    }

    fn poll(&mut self, timeout: Duration) -> Result<Option<RawEdge>, InputError> {
        thread::sleep(timeout.min(self.sample_interval));
        let level = self.read_level()?;
        let edge = detect_edge(self.prev, level);
        self.prev = Some(level);
        Ok(edge.map(|falling| RawEdge {
            source: self.id,
            at: Instant::now(),
            pressed: falling,
        }))
    }
}

/// Edge detection over consecutive samples. `Some(true)` for a falling
/// edge (press on an active-low line), `Some(false)` for a rising edge,
/// `None` when the level is unchanged or not yet known.
fn detect_edge(prev: Option<bool>, level: bool) -> Option<bool> {
    match prev {
        Some(p) if p && !level => Some(true),
        Some(p) if !p && level => Some(false),
        _ => None,
    }
}

/// Kernel input-event stream for the brightness button.
pub(crate) struct EventDevice {
    id: SourceId,
    role: ButtonRole,
    path: PathBuf,
    dev: Device,
    key_code: u32,
}

impl EventDevice {
    pub fn open(
        id: SourceId,
        role: ButtonRole,
        path: &Path,
        key_code: u16,
    ) -> Result<Self, InputError> {
        let dev = Device::new_from_path(path).map_err(|source| InputError::InputIo {
            path: path.display().to_string(),
            source,
        })?;
        info!(
            "monitoring {} ({})",
            path.display(),
            dev.name().unwrap_or("unnamed")
        );
        Ok(Self {
            id,
            role,
            path: path.to_path_buf(),
            dev,
            key_code: u32::from(key_code),
        })
    }

    fn poll(&mut self, timeout: Duration) -> Result<Option<RawEdge>, InputError> {
        let mut fds = [PollFd::new(self.dev.file().as_fd(), PollFlags::POLLIN)];
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(nix::errno::Errno::EINTR) => return Ok(None),
            Err(err) => {
                return Err(InputError::InputIo {
                    path: self.path.display().to_string(),
                    source: err.into(),
                })
            }
        }
        let (_status, event) =
            self.dev
                .next_event(ReadFlag::NORMAL)
                .map_err(|source| InputError::InputIo {
                    path: self.path.display().to_string(),
                    source,
                })?;
        if press_matches(&event.event_code, event.value, self.key_code) {
            return Ok(Some(RawEdge {
                source: self.id,
                at: Instant::now(),
                pressed: true,
            }));
        }
        // Unrelated keys from a shared node must not trigger anything.
        if let EventCode::EV_KEY(_) = event.event_code {
            if event.value == 1 {
                debug!(
                    "ignoring key press with code {} (want {})",
                    event_code_to_int(&event.event_code).1,
                    self.key_code
                );
            }
        }
        Ok(None)
    }
}

/// Does this event record represent a press of the configured button?
/// Only EV_KEY records with value 1 (press, not release or autorepeat)
/// and a matching code count; everything else is discarded.
fn press_matches(code: &EventCode, value: i32, wanted: u32) -> bool {
    if value != 1 {
        return false;
    }
    match code {
        EventCode::EV_KEY(_) => event_code_to_int(code).1 == wanted,
        _ => false,
    }
}

/// Source that never produces edges, so the controller can run and be
/// tested without physical buttons.
pub(crate) struct Simulated {
    #[allow(unused)]
    id: SourceId,
    role: ButtonRole,
}

impl Simulated {
    fn poll(&mut self, timeout: Duration) -> Result<Option<RawEdge>, InputError> {
        thread::sleep(timeout);
        Ok(None)
    }
}

/// Locate the gpio-keys event node for the brightness button by
/// scanning /dev/input, matching on the device name the overlay
/// registers.
fn discover_event_device() -> Option<PathBuf> {
    let entries = std::fs::read_dir("/dev/input").ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("event"))
        })
        .collect();
    candidates.sort();
    for path in candidates {
        match Device::new_from_path(&path) {
            Ok(dev) => {
                let name = dev.name().unwrap_or_default();
                if name.contains("gpio-keys") || name.contains("Brightness Button") {
                    return Some(path);
                }
            }
            Err(err) => debug!("skipping {}: {err}", path.display()),
        }
    }
    None
}

/// Build the input source set for a run. Fallback order for the primary
/// button: configured/discovered evdev node, then the cycle GPIO line,
/// then simulation as a last resort. The power button only ever comes
/// from its GPIO line and is skipped when absent or equal to the
/// primary. This never fails: a controller without buttons still runs
/// the inactivity monitor.
pub(crate) fn build_sources(flags: &RunFlags) -> SmallVec<[InputSource; 3]> {
    let mut sources: SmallVec<[InputSource; 3]> = SmallVec::new();
    let mut next_id = 0u32;
    let mut take_id = || {
        let id = SourceId(next_id);
        next_id += 1;
        id
    };
    let sample_interval = Duration::from_millis(flags.gpio_poll_ms);

    if flags.simulate {
        info!("running with simulated input only");
        sources.push(InputSource::Simulated(Simulated {
            id: take_id(),
            role: ButtonRole::Cycle,
        }));
        return sources;
    }

    let evdev_path = flags.input_device.clone().or_else(discover_event_device);
    match evdev_path {
        Some(path) => match EventDevice::open(take_id(), ButtonRole::Cycle, &path, flags.key_code)
        {
            Ok(dev) => sources.push(InputSource::EventDevice(dev)),
            Err(err) => warn!("cannot open {}: {err}", path.display()),
        },
        None => debug!("no gpio-keys event device found"),
    }

    if sources.is_empty() {
        match GpioLine::open(
            take_id(),
            ButtonRole::Cycle,
            flags.cycle_gpio,
            sample_interval,
        ) {
            Ok(line) => sources.push(InputSource::GpioPoll(line)),
            Err(err) => warn!("no cycle button: {err}"),
        }
    }

    if flags.power_gpio != flags.cycle_gpio {
        match GpioLine::open(
            take_id(),
            ButtonRole::Power,
            flags.power_gpio,
            sample_interval,
        ) {
            Ok(line) => sources.push(InputSource::GpioPoll(line)),
            Err(err) => warn!("no power button: {err}"),
        }
    } else {
        debug!("power button disabled (same line as cycle button)");
    }

    if sources.is_empty() {
        warn!("no hardware input available, falling back to simulated input");
        sources.push(InputSource::Simulated(Simulated {
            id: take_id(),
            role: ButtonRole::Cycle,
        }));
    }
    sources
}

#[cfg(test)]
mod tests {
    use evdev_rs::util::int_to_event_code;

    use super::*;

    const EV_SYN: u32 = 0;
    const EV_KEY: u32 = 1;
    const BRIGHTNESS_CODE: u32 = 240;

    #[test]
    fn edge_detection_needs_history() {
        assert_eq!(detect_edge(None, true), None);
        assert_eq!(detect_edge(None, false), None);
    }

    #[test]
    fn falling_edge_is_a_press() {
        assert_eq!(detect_edge(Some(true), false), Some(true));
        assert_eq!(detect_edge(Some(false), true), Some(false));
        assert_eq!(detect_edge(Some(true), true), None);
        assert_eq!(detect_edge(Some(false), false), None);
    }

    #[test]
    fn matching_key_press_is_actionable() {
        let code = int_to_event_code(EV_KEY, BRIGHTNESS_CODE);
        assert!(press_matches(&code, 1, BRIGHTNESS_CODE));
    }

    #[test]
    fn other_key_codes_are_ignored() {
        let code = int_to_event_code(EV_KEY, 99);
        assert!(!press_matches(&code, 1, BRIGHTNESS_CODE));
    }

    #[test]
    fn releases_and_repeats_are_ignored() {
        let code = int_to_event_code(EV_KEY, BRIGHTNESS_CODE);
        assert!(!press_matches(&code, 0, BRIGHTNESS_CODE));
        assert!(!press_matches(&code, 2, BRIGHTNESS_CODE));
    }

    #[test]
    fn non_key_records_are_ignored() {
        let code = int_to_event_code(EV_SYN, 0);
        assert!(!press_matches(&code, 1, BRIGHTNESS_CODE));
    }

    #[test]
    fn simulated_source_never_fires() {
        let mut src = Simulated {
            id: SourceId(0),
            role: ButtonRole::Cycle,
        };
        assert!(src.poll(Duration::from_millis(1)).unwrap().is_none());
    }
}
