//! The brightness state machine.
//!
//! Owns the current ladder index and is the only component that writes
//! brightness through the backlight port. Button dispatch and the
//! inactivity monitor both enter through methods on this type while it
//! sits behind one mutex, so a cycle/toggle and a timer dim can never
//! interleave; activity concurrent with an expiry wins because both
//! paths take the same lock.

use std::time::Duration;
use std::time::Instant;

use log::debug;
use log::info;
use log::warn;

use crate::backlight::BacklightPort;
use crate::errors::HardwareError;
use crate::ladder::Ladder;
use crate::ladder::DIM_INDEX;

/// Read-only view of the machine for status reporting.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Snapshot {
    pub index: usize,
    pub value: u32,
    pub is_on: bool,
    pub max: u32,
    pub idle_for: Duration,
}

pub(crate) struct StateMachine<B> {
    ladder: Ladder,
    port: B,
    index: usize,
    /// Index in effect before the last transition to OFF; toggle
    /// restores it.
    last_on_index: Option<usize>,
    last_activity: Instant,
    /// Cleared once the inactivity monitor has fired for the current
    /// idle period; any activity re-arms it.
    dim_armed: bool,
}

impl<B: BacklightPort> StateMachine<B> {
    pub fn new(ladder: Ladder, port: B) -> Self {
        let index = ladder.medium_index();
        Self {
            ladder,
            port,
            index,
            last_on_index: None,
            last_activity: Instant::now(),
            dim_armed: true,
        }
    }

    /// Reconcile with whatever level the hardware currently reports.
    /// Unreadable or unparsable hardware keeps the default index.
    pub fn sync_from_hardware(&mut self, at: Instant) {
        match self.port.read_level() {
            Ok(raw) => self.apply_hardware_sync(raw, at),
            Err(err) => warn!(
                "cannot read current brightness, keeping index {}: {err}",
                self.index
            ),
        }
    }

    /// Map a raw hardware value onto the ladder: the nearest index
    /// whose level does not exceed it, clamped to the top.
    pub fn apply_hardware_sync(&mut self, raw: u32, at: Instant) {
        let index = self.ladder.sync_index(raw);
        info!(
            "hardware reports {raw}, syncing to index {index} (level {})",
            self.ladder.value(index)
        );
        self.commit(index, Some(at));
    }

    /// Primary button: advance one step, wrapping from the top back to
    /// OFF.
    pub fn cycle(&mut self, at: Instant) {
        let next = (self.index + 1) % self.ladder.len();
        self.commit(next, Some(at));
    }

    /// Power button: OFF restores the remembered on level (or the
    /// ladder's medium if none is remembered), anything else turns the
    /// display off.
    pub fn toggle(&mut self, at: Instant) {
        let next = if self.index == 0 {
            self.last_on_index.unwrap_or_else(|| self.ladder.medium_index())
        } else {
            0
        };
        self.commit(next, Some(at));
    }

    /// Inactivity expiry. Dims at most once per idle period and
    /// deliberately does not count as activity. Returns whether a dim
    /// actually happened.
    pub fn dim_if_idle(&mut self, now: Instant, timeout: Duration) -> bool {
        if !self.dim_armed {
            return false;
        }
        if now.saturating_duration_since(self.last_activity) < timeout {
            return false;
        }
        self.dim_armed = false;
        if self.index <= DIM_INDEX {
            return false;
        }
        self.force_dim();
        true
    }

    /// Dim to the low level. No-op at or below it: inactivity never
    /// turns the display fully off, and never refreshes activity.
    pub fn force_dim(&mut self) {
        if self.index > DIM_INDEX {
            self.commit(DIM_INDEX, None);
        }
    }

    fn commit(&mut self, next: usize, activity: Option<Instant>) {
        if next == 0 && self.index > 0 {
            self.last_on_index = Some(self.index);
        }
        self.index = next;
        if let Some(at) = activity {
            self.last_activity = at;
            self.dim_armed = true;
        }
        let value = self.ladder.value(next);
        debug!("index {next} -> level {value}");
        // The in-memory index is intended state and stands even when
        // the write fails; the next status read surfaces the
        // disagreement.
        if let Err(err) = self.port.write_level(value) {
            match err {
                HardwareError::PermissionDenied { .. } => {
                    warn!("brightness write rejected: {err}")
                }
                _ => warn!("brightness write skipped: {err}"),
            }
        }
    }

    pub fn snapshot(&self, now: Instant) -> Snapshot {
        let value = self.ladder.value(self.index);
        Snapshot {
            index: self.index,
            value,
            is_on: value > 0,
            max: self.port.max_or_fallback(),
            idle_for: now.saturating_duration_since(self.last_activity),
        }
    }

    pub fn ladder(&self) -> &Ladder {
        &self.ladder
    }

    pub fn port(&self) -> &B {
        &self.port
    }
}
