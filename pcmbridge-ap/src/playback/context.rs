//! Audio Context
//!
//! Opens the (simulated) output device: fixes the device-wide stream format
//! and default quantum, and owns the [`PlayerRegistry`] every player of this
//! device lives in.

use crate::audio::clock::{Pacer, PlaybackClock, SleepPacer};
use crate::error::Result;
use crate::playback::registry::PlayerRegistry;
use pcmbridge_common::{PlayerId, StreamFormat};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// An open output device
#[derive(Debug)]
pub struct AudioContext {
    format: StreamFormat,
    quantum_bytes: u64,
    registry: PlayerRegistry,
    closed: AtomicBool,
}

impl AudioContext {
    /// Open with the half-second default quantum, paced in real time
    pub fn open(format: StreamFormat) -> Result<Self> {
        Self::open_with(format, None, Arc::new(SleepPacer))
    }

    /// Open with an explicit quantum (or the default) and pacer
    ///
    /// # Errors
    /// `Error::InvalidFormat` for an invalid format or zero quantum.
    pub fn open_with(
        format: StreamFormat,
        quantum_bytes: Option<u64>,
        pacer: Arc<dyn Pacer>,
    ) -> Result<Self> {
        let quantum_bytes = quantum_bytes.unwrap_or_else(|| format.default_quantum_bytes());
        let clock = PlaybackClock::new(format, quantum_bytes)?;

        info!(
            "Audio context opened: {}, quantum {} bytes ({:?} per period)",
            format,
            quantum_bytes,
            clock.interval()
        );

        Ok(Self {
            format,
            quantum_bytes,
            registry: PlayerRegistry::with_pacer(pacer),
            closed: AtomicBool::new(false),
        })
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn quantum_bytes(&self) -> u64 {
        self.quantum_bytes
    }

    /// Create a player using the context's format and quantum
    pub fn create_player(&self) -> Result<PlayerId> {
        self.registry.create_with_quantum(self.format, self.quantum_bytes)
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close every player and join every playback thread. Idempotent.
    ///
    /// Players created after close still work and are closed on drop.
    pub fn close(&self) {
        let remaining = self.registry.len();
        self.registry.close_all();
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Audio context closed ({} players were open)", remaining);
        }
    }
}

impl Drop for AudioContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::VirtualPacer;

    #[test]
    fn test_open_uses_half_second_quantum() {
        let ctx = AudioContext::open(StreamFormat::cd_quality()).unwrap();
        assert_eq!(ctx.quantum_bytes(), 88_200);
        assert_eq!(ctx.format(), StreamFormat::cd_quality());
    }

    #[test]
    fn test_open_rejects_zero_quantum() {
        let result = AudioContext::open_with(
            StreamFormat::cd_quality(),
            Some(0),
            Arc::new(VirtualPacer::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_open_rejects_overflowing_format() {
        let format = StreamFormat {
            sample_rate_hz: u32::MAX,
            channel_count: u32::MAX,
            bytes_per_sample: u32::MAX,
        };
        assert!(AudioContext::open_with(format, None, Arc::new(VirtualPacer::new())).is_err());
    }

    #[test]
    fn test_close_closes_players() {
        let ctx = AudioContext::open_with(
            StreamFormat::cd_quality(),
            Some(4096),
            Arc::new(VirtualPacer::new()),
        )
        .unwrap();
        let id = ctx.create_player().unwrap();
        assert_eq!(ctx.registry().stats(id).unwrap().pending_bytes, 0);

        ctx.close();
        assert!(ctx.is_closed());
        assert!(ctx.registry().is_empty());
        ctx.close();
    }
}
