//! Small sysfs helpers shared by the backlight port, the driver
//! parameter interface and GPIO polling.

use std::fs::OpenOptions;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use std::time::Instant;

/// Read a sysfs node as text, with trailing whitespace stripped.
pub(crate) fn read_trimmed(path: &Path) -> std::io::Result<String> {
    let mut f = OpenOptions::new().read(true).open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(buf.trim().to_owned())
}

/// Write a value to a sysfs node. The node must already exist; sysfs
/// files are never created by us.
pub(crate) fn write_str(path: &Path, value: &str) -> std::io::Result<()> {
    let mut f = OpenOptions::new().write(true).open(path)?;
    f.write_all(value.as_bytes())?;
    Ok(())
}

/// Wait for a sysfs node to show up. Late loaded kernel modules can
/// make the backlight directory appear well after we are started.
pub(crate) fn wait_for_file(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(250));
    }
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("jdi-backlightd-utils-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn read_strips_trailing_newline() {
        let p = scratch("value");
        std::fs::write(&p, "42\n").unwrap();
        assert_eq!(read_trimmed(&p).unwrap(), "42");
    }

    #[test]
    fn write_requires_existing_node() {
        let p = scratch("missing-node");
        let _ = std::fs::remove_file(&p);
        assert!(write_str(&p, "1").is_err());
    }
}
