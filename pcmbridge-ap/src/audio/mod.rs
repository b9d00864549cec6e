//! Playback clock and pacing

pub mod clock;

pub use clock::{Pacer, PlaybackClock, SleepPacer, VirtualPacer};
