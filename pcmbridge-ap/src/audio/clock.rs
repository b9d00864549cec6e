//! Playback clock
//!
//! Models the output device consuming audio in real time. A [`PlaybackClock`]
//! knows how long one quantum of a given format takes to play; a [`Pacer`]
//! actually lets that time elapse.
//!
//! The playback loop is paced by the clock alone, never by the producer: a
//! slow producer sees backpressure, not a faster or slower clock.

use crate::error::{Error, Result};
use pcmbridge_common::timing;
use pcmbridge_common::StreamFormat;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lets a playback period elapse
///
/// Implementations must be shareable across playback threads.
pub trait Pacer: Send + Sync {
    /// Block the calling playback thread for `interval`
    fn pace(&self, interval: Duration);
}

/// Real-time pacing with `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepPacer;

impl Pacer for SleepPacer {
    fn pace(&self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Virtual-time pacing for tests
///
/// Returns immediately and accumulates the time that would have elapsed.
/// The loop still cannot run ahead of the producer: every drain needs a full
/// quantum written first.
#[derive(Debug, Default)]
pub struct VirtualPacer {
    elapsed_nanos: AtomicU64,
    periods: AtomicU64,
}

impl VirtualPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total virtual time elapsed across all paced periods
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::Acquire))
    }

    /// Number of `pace` calls
    pub fn periods(&self) -> u64 {
        self.periods.load(Ordering::Acquire)
    }
}

impl Pacer for VirtualPacer {
    fn pace(&self, interval: Duration) {
        let nanos = u64::try_from(interval.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::AcqRel);
        self.periods.fetch_add(1, Ordering::AcqRel);
    }
}

/// Converts a player's quantum into a playback period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackClock {
    format: StreamFormat,
    quantum_bytes: u64,
    interval: Duration,
}

impl PlaybackClock {
    /// Clock for `quantum_bytes` of audio in `format`
    ///
    /// # Errors
    /// `Error::InvalidFormat` for a zero quantum or an invalid format.
    pub fn new(format: StreamFormat, quantum_bytes: u64) -> Result<Self> {
        format
            .validate()
            .map_err(|e| Error::InvalidFormat(e.to_string()))?;
        if quantum_bytes == 0 {
            return Err(Error::InvalidFormat(
                "buffer quantum must be positive".to_string(),
            ));
        }
        Ok(Self {
            format,
            quantum_bytes,
            interval: timing::bytes_to_duration(quantum_bytes, &format),
        })
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn quantum_bytes(&self) -> u64 {
        self.quantum_bytes
    }

    /// Real time one quantum takes to play
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Real time `bytes` take to play in this clock's format
    pub fn duration_of(&self, bytes: u64) -> Duration {
        timing::bytes_to_duration(bytes, &self.format)
    }

    /// Elapse one playback period on `pacer`
    pub fn pace(&self, pacer: &dyn Pacer) {
        pacer.pace(self.interval);
    }
}
