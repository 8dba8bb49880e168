//! Abstraction for the backlight in /sys

use std::path::PathBuf;

use crate::errors::hardware_io;
use crate::errors::HardwareError;
use crate::utils::read_trimmed;
use crate::utils::write_str;

const BRIGHTNESS: &str = "brightness";
const MAX_BRIGHTNESS: &str = "max_brightness";
const BL_POWER: &str = "bl_power";

/// Max brightness assumed when the hardware will not tell us. Matches
/// the JDI panel's PWM range.
pub(crate) const FALLBACK_MAX: u32 = 6;

/// Boundary over the physical brightness control files. The state
/// machine only talks to the hardware through this.
pub(crate) trait BacklightPort {
    /// True iff both the brightness and max_brightness nodes exist.
    fn available(&self) -> bool;
    fn read_level(&self) -> Result<u32, HardwareError>;
    /// Repeated writes of the same value are harmless at this layer.
    fn write_level(&mut self, value: u32) -> Result<(), HardwareError>;
    fn read_max(&self) -> Result<u32, HardwareError>;

    fn max_or_fallback(&self) -> u32 {
        self.read_max().unwrap_or(FALLBACK_MAX)
    }
}

#[derive(Debug)]
pub(crate) struct SysfsBacklight {
    /// Backlight class directory, e.g. /sys/class/backlight/jdi-backlight
    dir: PathBuf,
}

impl SysfsBacklight {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn node(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read_int(&self, name: &str) -> Result<u32, HardwareError> {
        let path = self.node(name);
        let text = read_trimmed(&path).map_err(|e| hardware_io(&path, e))?;
        text.parse().map_err(|source| HardwareError::Malformed {
            path: path.display().to_string(),
            source,
        })
    }

    /// Kernel power state of the panel if the bl_power node exists.
    /// 0 means unblanked.
    pub fn power_state(&self) -> Option<u32> {
        self.read_int(BL_POWER).ok()
    }
}

impl BacklightPort for SysfsBacklight {
    fn available(&self) -> bool {
        self.node(BRIGHTNESS).exists() && self.node(MAX_BRIGHTNESS).exists()
    }

    fn read_level(&self) -> Result<u32, HardwareError> {
        self.read_int(BRIGHTNESS)
    }

    fn write_level(&mut self, value: u32) -> Result<(), HardwareError> {
        let path = self.node(BRIGHTNESS);
        write_str(&path, &value.to_string()).map_err(|e| hardware_io(&path, e))
    }

    fn read_max(&self) -> Result<u32, HardwareError> {
        self.read_int(MAX_BRIGHTNESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_backlight(tag: &str) -> SysfsBacklight {
        let dir = std::env::temp_dir().join(format!(
            "jdi-backlightd-bl-{tag}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        SysfsBacklight::new(dir)
    }

    fn seed(bl: &SysfsBacklight, name: &str, content: &str) {
        std::fs::write(bl.node(name), content).unwrap();
    }

    #[test]
    fn reads_and_writes_levels() {
        let mut bl = scratch_backlight("rw");
        seed(&bl, BRIGHTNESS, "3\n");
        seed(&bl, MAX_BRIGHTNESS, "6\n");
        assert!(bl.available());
        assert_eq!(bl.read_level().unwrap(), 3);
        assert_eq!(bl.read_max().unwrap(), 6);
        bl.write_level(1).unwrap();
        assert_eq!(bl.read_level().unwrap(), 1);
    }

    #[test]
    fn missing_node_is_unavailable() {
        let bl = scratch_backlight("missing");
        assert!(!bl.available());
        assert!(matches!(
            bl.read_level(),
            Err(HardwareError::Unavailable { .. })
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let bl = scratch_backlight("garbage");
        seed(&bl, BRIGHTNESS, "not-a-number\n");
        assert!(matches!(
            bl.read_level(),
            Err(HardwareError::Malformed { .. })
        ));
    }

    #[test]
    fn max_falls_back_when_unreadable() {
        let bl = scratch_backlight("nomax");
        assert_eq!(bl.max_or_fallback(), FALLBACK_MAX);
    }

    #[test]
    fn power_state_is_optional() {
        let bl = scratch_backlight("power");
        assert_eq!(bl.power_state(), None);
        seed(&bl, BL_POWER, "0\n");
        assert_eq!(bl.power_state(), Some(0));
    }
}
