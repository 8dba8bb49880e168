//! Driver module parameter access: power save, dithering, auto clear.
//!
//! Plain key/value text nodes under the jdi_drm_enhanced module
//! parameter directory. Booleans are Y/N as the kernel renders them.

use std::path::PathBuf;

use log::info;

use crate::errors::hardware_io;
use crate::errors::HardwareError;
use crate::utils::read_trimmed;
use crate::utils::write_str;

const PARAM_KEYS: [&str; 5] = [
    "auto_power_save",
    "idle_timeout",
    "dither",
    "auto_clear",
    "color",
];

#[derive(Debug)]
pub(crate) struct DriverParams {
    dir: PathBuf,
}

impl DriverParams {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// True iff the driver module is loaded.
    pub fn available(&self) -> bool {
        self.dir.exists()
    }

    pub fn read(&self, key: &str) -> Result<String, HardwareError> {
        let path = self.dir.join(key);
        read_trimmed(&path).map_err(|e| hardware_io(&path, e))
    }

    pub fn write(&self, key: &str, value: &str) -> Result<(), HardwareError> {
        let path = self.dir.join(key);
        write_str(&path, value).map_err(|e| hardware_io(&path, e))
    }

    pub fn enable_powersave(&self, timeout_ms: u32) -> Result<(), HardwareError> {
        self.write("auto_power_save", "Y")?;
        self.write("idle_timeout", &timeout_ms.to_string())?;
        info!(
            "auto power save enabled, panel sleeps after {}s idle",
            timeout_ms / 1000
        );
        Ok(())
    }

    pub fn disable_powersave(&self) -> Result<(), HardwareError> {
        self.write("auto_power_save", "N")?;
        info!("auto power save disabled");
        Ok(())
    }

    pub fn set_dither(&self, on: bool) -> Result<(), HardwareError> {
        self.write("dither", if on { "1" } else { "0" })
    }

    /// All readable parameters, for status output.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        PARAM_KEYS
            .iter()
            .filter_map(|&key| self.read(key).ok().map(|value| (key, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_params(tag: &str) -> DriverParams {
        let dir = std::env::temp_dir().join(format!(
            "jdi-backlightd-params-{tag}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        for key in PARAM_KEYS {
            std::fs::write(dir.join(key), "0\n").unwrap();
        }
        DriverParams::new(dir)
    }

    #[test]
    fn powersave_writes_both_keys() {
        let params = scratch_params("psave");
        params.enable_powersave(120_000).unwrap();
        assert_eq!(params.read("auto_power_save").unwrap(), "Y");
        assert_eq!(params.read("idle_timeout").unwrap(), "120000");
        params.disable_powersave().unwrap();
        assert_eq!(params.read("auto_power_save").unwrap(), "N");
    }

    #[test]
    fn dither_is_a_numeric_switch() {
        let params = scratch_params("dither");
        params.set_dither(true).unwrap();
        assert_eq!(params.read("dither").unwrap(), "1");
        params.set_dither(false).unwrap();
        assert_eq!(params.read("dither").unwrap(), "0");
    }

    #[test]
    fn entries_skip_unreadable_keys() {
        let params = scratch_params("entries");
        std::fs::remove_file(params.dir.join("color")).unwrap();
        let entries = params.entries();
        assert_eq!(entries.len(), PARAM_KEYS.len() - 1);
        assert!(entries.iter().all(|(key, _)| *key != "color"));
    }

    #[test]
    fn missing_module_dir_is_unavailable() {
        let params = DriverParams::new(std::env::temp_dir().join("jdi-backlightd-no-such-module"));
        assert!(!params.available());
        assert!(matches!(
            params.read("dither"),
            Err(HardwareError::Unavailable { .. })
        ));
    }
}
