//! Error types

use std::io;
use std::num::ParseIntError;
use std::path::Path;

use snafu::prelude::*;

/// Failures at the backlight/driver sysfs boundary.
///
/// These are caught at the port and never unwind past the state
/// machine: a missing node is fatal at startup only, everything in
/// steady state is logged and recovered.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum HardwareError {
    #[snafu(display("{path}: node missing or unreadable: {source}"))]
    Unavailable { path: String, source: io::Error },
    #[snafu(display("{path}: does not hold an integer: {source}"))]
    Malformed { path: String, source: ParseIntError },
    #[snafu(display("{path}: permission denied (run as root or fix udev rules): {source}"))]
    PermissionDenied { path: String, source: io::Error },
}

/// Map an I/O failure on a sysfs node onto the hardware taxonomy.
pub(crate) fn hardware_io(path: &Path, source: io::Error) -> HardwareError {
    let path = path.display().to_string();
    match source.kind() {
        io::ErrorKind::PermissionDenied => HardwareError::PermissionDenied { path, source },
        _ => HardwareError::Unavailable { path, source },
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum InputError {
    #[snafu(display("no usable input source: {reason}"))]
    SourceUnavailable { reason: String },
    #[snafu(display("{path}: input read failed: {source}"))]
    InputIo { path: String, source: io::Error },
}
