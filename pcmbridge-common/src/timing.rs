//! Byte-count based timing for PCM playback
//!
//! The playback clock measures progress in bytes of the player's stream. A
//! byte count converts to real time through the format's byte rate:
//!
//! ```text
//! duration = bytes / (sample_rate_hz × channel_count × bytes_per_sample)
//! ```
//!
//! Conversions are done in integer nanoseconds (`u128` intermediates), so
//! they truncate instead of accumulating floating-point error.
//!
//! # Examples
//!
//! ```rust
//! use pcmbridge_common::timing::*;
//! use pcmbridge_common::StreamFormat;
//! use std::time::Duration;
//!
//! let cd = StreamFormat::cd_quality(); // 176,400 bytes/s
//!
//! // One second of audio
//! assert_eq!(bytes_to_duration(176_400, &cd), Duration::from_secs(1));
//!
//! // A 4096-byte quantum is ~23.2ms
//! let quantum = bytes_to_duration(4096, &cd);
//! assert_eq!(quantum.as_micros(), 23_219);
//!
//! // And back, truncating to whole frames
//! assert_eq!(duration_to_bytes(Duration::from_millis(500), &cd), 88_200);
//! ```

use crate::StreamFormat;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Real-time duration of `bytes` bytes of audio in `format`
pub fn bytes_to_duration(bytes: u64, format: &StreamFormat) -> Duration {
    let bytes_per_second = format.bytes_per_second() as u128;
    if bytes_per_second == 0 {
        return Duration::ZERO;
    }
    let nanos = bytes as u128 * NANOS_PER_SEC / bytes_per_second;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Bytes played in `duration`, rounded down to a whole frame
pub fn duration_to_bytes(duration: Duration, format: &StreamFormat) -> u64 {
    let frames = duration_to_frames(duration, format);
    frames.saturating_mul(format.bytes_per_frame())
}

/// Whole frames played in `duration`
pub fn duration_to_frames(duration: Duration, format: &StreamFormat) -> u64 {
    let frames = duration.as_nanos() * format.sample_rate_hz as u128 / NANOS_PER_SEC;
    u64::try_from(frames).unwrap_or(u64::MAX)
}

/// Whole frames contained in `bytes` (partial trailing frame ignored)
pub fn bytes_to_frames(bytes: u64, format: &StreamFormat) -> u64 {
    match format.bytes_per_frame() {
        0 => 0,
        bytes_per_frame => bytes / bytes_per_frame,
    }
}

/// Bytes to milliseconds (truncating), for logs and the API
pub fn bytes_to_ms(bytes: u64, format: &StreamFormat) -> u64 {
    bytes_to_duration(bytes, format).as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cd() -> StreamFormat {
        StreamFormat::cd_quality()
    }

    #[test]
    fn test_one_second() {
        assert_eq!(bytes_to_duration(176_400, &cd()), Duration::from_secs(1));
        assert_eq!(duration_to_bytes(Duration::from_secs(1), &cd()), 176_400);
    }

    #[test]
    fn test_quantum_4096_is_about_23ms() {
        let d = bytes_to_duration(4096, &cd());
        // 4096 / 176400 = 0.0232199...s
        assert_eq!(d.as_nanos(), 23_219_954);
        assert_eq!(bytes_to_ms(4096, &cd()), 23);
    }

    #[test]
    fn test_zero_bytes() {
        assert_eq!(bytes_to_duration(0, &cd()), Duration::ZERO);
        assert_eq!(duration_to_bytes(Duration::ZERO, &cd()), 0);
    }

    #[test]
    fn test_duration_to_bytes_is_frame_aligned() {
        // 1ms @ 44.1kHz = 44.1 frames -> 44 frames -> 176 bytes
        assert_eq!(duration_to_frames(Duration::from_millis(1), &cd()), 44);
        assert_eq!(duration_to_bytes(Duration::from_millis(1), &cd()), 176);
    }

    #[test]
    fn test_bytes_to_frames_ignores_partial_frame() {
        assert_eq!(bytes_to_frames(4097, &cd()), 1024);
        assert_eq!(bytes_to_frames(3, &cd()), 0);
    }

    #[test]
    fn test_mono_8bit() {
        let format = StreamFormat::new(8_000, 1, 1).unwrap();
        assert_eq!(bytes_to_duration(4_000, &format), Duration::from_millis(500));
    }

    #[test]
    fn test_large_byte_count_does_not_overflow() {
        let d = bytes_to_duration(u64::MAX, &cd());
        assert!(d > Duration::from_secs(1_000_000));
    }
}
