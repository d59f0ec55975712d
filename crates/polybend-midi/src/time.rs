//! Timestamps and clocks.
//!
//! All times are milliseconds on a monotonic clock, the same unit the output
//! ports schedule against.

use std::str::FromStr;
use std::time::Instant;

use atomic_float::AtomicF64;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;

use crate::error::Error;

/// When a note should start.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum NoteTime {
    /// The moment the note is sent.
    #[default]
    Now,
    /// Absolute timestamp in milliseconds.
    At(f64),
    /// Milliseconds after a reference "now".
    After(f64),
}

impl NoteTime {
    #[inline]
    pub fn resolve(self, now: f64) -> f64 {
        match self {
            NoteTime::Now => now,
            NoteTime::At(time) => time,
            NoteTime::After(delta) => now + delta,
        }
    }
}

impl From<f64> for NoteTime {
    fn from(time: f64) -> Self {
        NoteTime::At(time)
    }
}

impl FromStr for NoteTime {
    type Err = Error;

    /// `"+250"` is relative, `"1200.5"` is absolute.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || Error::InvalidTime(s.to_string());
        if let Some(relative) = trimmed.strip_prefix('+') {
            let delta: f64 = relative.trim().parse().map_err(|_| invalid())?;
            if !delta.is_finite() {
                return Err(invalid());
            }
            Ok(NoteTime::After(delta))
        } else {
            let time: f64 = trimmed.parse().map_err(|_| invalid())?;
            if !time.is_finite() {
                return Err(invalid());
            }
            Ok(NoteTime::At(time))
        }
    }
}

/// Source of "now" for an output.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Monotonic wall clock, milliseconds since `epoch`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Share an epoch with another component (e.g. a hardware output thread).
    pub fn from_epoch(epoch: Instant) -> Self {
        Self { epoch }
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to. Used for offline rendering and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicF64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: AtomicF64::new(start),
        }
    }

    pub fn set(&self, time: f64) {
        self.now.store(time, Ordering::Release);
    }

    pub fn advance(&self, delta: f64) {
        self.now.fetch_add(delta, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.load(Ordering::Acquire)
    }
}
