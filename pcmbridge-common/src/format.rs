//! PCM stream format
//!
//! A player's format is fixed at creation. Everything the pipeline knows about
//! the audio it moves is in here: the samples themselves are opaque bytes.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// CD-quality sample rate
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;

/// Stereo
pub const DEFAULT_CHANNEL_COUNT: u32 = 2;

/// 16-bit samples
pub const DEFAULT_BYTES_PER_SAMPLE: u32 = 2;

/// Format of one player's PCM byte stream
///
/// All three fields are positive; use [`StreamFormat::new`] to get a
/// validated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamFormat {
    /// Frames per second
    pub sample_rate_hz: u32,
    /// Interleaved channels per frame
    pub channel_count: u32,
    /// Bytes per single-channel sample
    pub bytes_per_sample: u32,
}

impl StreamFormat {
    /// Create a validated stream format
    ///
    /// # Errors
    /// `Error::InvalidInput` if any field is zero or the byte rate overflows `u64`.
    pub fn new(sample_rate_hz: u32, channel_count: u32, bytes_per_sample: u32) -> Result<Self> {
        let format = Self {
            sample_rate_hz,
            channel_count,
            bytes_per_sample,
        };
        format.validate()?;
        Ok(format)
    }

    /// 44.1kHz, stereo, 16-bit
    pub const fn cd_quality() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            channel_count: DEFAULT_CHANNEL_COUNT,
            bytes_per_sample: DEFAULT_BYTES_PER_SAMPLE,
        }
    }

    /// Check that every field is positive and the byte rate fits `u64`
    ///
    /// Formats built through struct literals or deserialization skip
    /// [`StreamFormat::new`], so callers that accept external formats run this.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate_hz == 0 {
            return Err(Error::InvalidInput("sample_rate_hz must be positive".to_string()));
        }
        if self.channel_count == 0 {
            return Err(Error::InvalidInput("channel_count must be positive".to_string()));
        }
        if self.bytes_per_sample == 0 {
            return Err(Error::InvalidInput("bytes_per_sample must be positive".to_string()));
        }
        if (self.sample_rate_hz as u64)
            .checked_mul(self.bytes_per_frame())
            .is_none()
        {
            return Err(Error::InvalidInput(format!(
                "byte rate of {} overflows u64",
                self
            )));
        }
        Ok(())
    }

    /// Bytes in one interleaved frame (all channels)
    pub fn bytes_per_frame(&self) -> u64 {
        self.channel_count as u64 * self.bytes_per_sample as u64
    }

    /// Bytes consumed per second of playback
    ///
    /// Exact for validated formats; saturates at `u64::MAX` otherwise.
    pub fn bytes_per_second(&self) -> u64 {
        (self.sample_rate_hz as u64).saturating_mul(self.bytes_per_frame())
    }

    /// Default buffer quantum: half a second of audio
    ///
    /// Never zero for a valid format.
    pub fn default_quantum_bytes(&self) -> u64 {
        (self.bytes_per_second() / 2).max(1)
    }
}

impl Default for StreamFormat {
    fn default() -> Self {
        Self::cd_quality()
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz/{}ch/{}-bit",
            self.sample_rate_hz,
            self.channel_count,
            self.bytes_per_sample as u64 * 8
        )
    }
}
