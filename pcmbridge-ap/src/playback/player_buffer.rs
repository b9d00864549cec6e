//! Player Buffer
//!
//! Synchronized state machine between one producer thread and one playback
//! thread. The buffer does not hold sample data: PCM bytes are opaque, so the
//! only shared quantity is the number of bytes written but not yet played.
//!
//! ## Design
//!
//! ```text
//! producer ── write(len) ──► pending_bytes ──► drain_quantum() ── playback loop
//!            (waits on                          (waits on
//!             space_available)                   quantum_ready)
//! ```
//!
//! - Writable when `(pending < quantum || closed) && !paused`
//! - Drainable when `(pending >= quantum || closed) && !paused`
//! - `close()` wins every race: both waits wake, observe `closed` and return
//!   without touching `pending_bytes`
//!
//! ## Thread Safety
//!
//! All mutable state (pending bytes, flags, volume, counters) lives behind one
//! mutex. Every state change happens under that mutex and is followed by a
//! notify, and every waiter re-checks its predicate under the same mutex, so
//! no wakeup can be missed. Nothing here ever takes a second lock.

use parking_lot::{Condvar, Mutex};
use pcmbridge_common::events::PlayerState;
use pcmbridge_common::StreamFormat;
use std::time::{Duration, Instant};
use tracing::trace;

/// Called with the pending byte count after each drained quantum
///
/// Runs on the playback thread while the buffer lock is held, so it must not
/// call back into the same buffer. Publishing to a channel is fine.
pub type DrainCallback = Box<dyn Fn(u64) + Send + Sync>;

/// Result of a blocking write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Bytes were added to the pending count
    Written,
    /// Buffer was closed before space became available; nothing was added
    Closed,
}

/// Result of one drain step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// One quantum was consumed; `pending_bytes` is what remains
    Drained { pending_bytes: u64 },
    /// Buffer closed; the playback loop must exit
    Closed,
}

/// Counter snapshot for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerStats {
    /// Bytes accepted by write since creation
    pub total_bytes_written: u64,
    /// Bytes consumed by the playback loop since creation
    pub total_bytes_drained: u64,
    /// Number of quanta consumed
    pub quanta_drained: u64,
    /// Bytes written but not yet played
    pub pending_bytes: u64,
}

struct BufferState {
    pending_bytes: u64,
    paused: bool,
    closed: bool,
    volume: f64,
    total_bytes_written: u64,
    total_bytes_drained: u64,
    quanta_drained: u64,
}

impl BufferState {
    fn writable(&self, quantum_bytes: u64) -> bool {
        (self.pending_bytes < quantum_bytes || self.closed) && !self.paused
    }

    fn drainable(&self, quantum_bytes: u64) -> bool {
        (self.pending_bytes >= quantum_bytes || self.closed) && !self.paused
    }

    fn player_state(&self) -> PlayerState {
        if self.closed {
            PlayerState::Closed
        } else if self.paused {
            PlayerState::Paused
        } else {
            PlayerState::Active
        }
    }
}

/// One player's synchronized byte accounting
pub struct PlayerBuffer {
    format: StreamFormat,
    quantum_bytes: u64,
    state: Mutex<BufferState>,
    /// Producer waits here for room (or close / resume)
    space_available: Condvar,
    /// Playback loop waits here for a full quantum (or close / resume)
    quantum_ready: Condvar,
    on_drained: Option<DrainCallback>,
}

impl std::fmt::Debug for PlayerBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PlayerBuffer")
            .field("format", &self.format)
            .field("quantum_bytes", &self.quantum_bytes)
            .field("pending_bytes", &state.pending_bytes)
            .field("paused", &state.paused)
            .field("closed", &state.closed)
            .field("volume", &state.volume)
            .finish()
    }
}

impl PlayerBuffer {
    /// Create an empty, active buffer
    ///
    /// `quantum_bytes` must be positive; [`PlaybackClock::new`] is where
    /// callers validate it.
    ///
    /// [`PlaybackClock::new`]: crate::audio::clock::PlaybackClock::new
    pub fn new(format: StreamFormat, quantum_bytes: u64) -> Self {
        Self {
            format,
            quantum_bytes,
            state: Mutex::new(BufferState {
                pending_bytes: 0,
                paused: false,
                closed: false,
                volume: 1.0,
                total_bytes_written: 0,
                total_bytes_drained: 0,
                quanta_drained: 0,
            }),
            space_available: Condvar::new(),
            quantum_ready: Condvar::new(),
            on_drained: None,
        }
    }

    /// Attach the per-drain notification
    pub fn with_drain_callback(mut self, callback: DrainCallback) -> Self {
        self.on_drained = Some(callback);
        self
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn quantum_bytes(&self) -> u64 {
        self.quantum_bytes
    }

    /// Add `len` bytes, blocking until the buffer is writable or closed
    ///
    /// Single-producer: concurrent writers are not serialized against each
    /// other beyond the lock, and may overshoot the quantum together.
    pub fn write(&self, len: u64) -> WriteOutcome {
        let mut state = self.state.lock();
        while !state.writable(self.quantum_bytes) {
            self.space_available.wait(&mut state);
        }
        if state.closed {
            return WriteOutcome::Closed;
        }

        state.pending_bytes = state.pending_bytes.saturating_add(len);
        state.total_bytes_written = state.total_bytes_written.saturating_add(len);
        trace!(
            "write {} bytes: pending={}/{}",
            len,
            state.pending_bytes,
            self.quantum_bytes
        );
        drop(state);

        self.quantum_ready.notify_one();
        WriteOutcome::Written
    }

    /// Non-blocking writability check
    pub fn is_writable(&self) -> bool {
        self.state.lock().writable(self.quantum_bytes)
    }

    /// Wait until writable (or closed) for at most `timeout`
    ///
    /// Returns the writability predicate at the time of return. Does not
    /// modify the buffer.
    pub fn wait_writable(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.writable(self.quantum_bytes) {
            if self.space_available.wait_until(&mut state, deadline).timed_out() {
                return state.writable(self.quantum_bytes);
            }
        }
        true
    }

    /// Stop draining and stop accepting writes; no-op once closed
    ///
    /// Returns the state before the call.
    pub fn pause(&self) -> PlayerState {
        self.set_paused(true)
    }

    /// Undo [`PlayerBuffer::pause`]; no-op once closed
    ///
    /// Returns the state before the call.
    pub fn resume(&self) -> PlayerState {
        self.set_paused(false)
    }

    fn set_paused(&self, paused: bool) -> PlayerState {
        let previous = {
            let mut state = self.state.lock();
            let previous = state.player_state();
            if state.closed {
                return previous;
            }
            state.paused = paused;
            previous
        };
        self.notify_all();
        previous
    }

    /// Close the buffer, waking every waiter. Idempotent.
    ///
    /// `immediate` is accepted for interface symmetry; pending bytes are
    /// never flushed either way.
    ///
    /// Returns the bytes that were still pending.
    pub fn close(&self, immediate: bool) -> u64 {
        let unplayed = {
            let mut state = self.state.lock();
            state.paused = false;
            state.closed = true;
            trace!(
                "close(immediate={}): {} bytes unplayed",
                immediate,
                state.pending_bytes
            );
            state.pending_bytes
        };
        self.notify_all();
        unplayed
    }

    /// Consume one quantum, blocking until one is available
    ///
    /// Stalls (without returning) while paused. Invokes the drain callback
    /// under the lock, then wakes the producer.
    pub fn drain_quantum(&self) -> DrainOutcome {
        let mut state = self.state.lock();
        while !state.drainable(self.quantum_bytes) {
            self.quantum_ready.wait(&mut state);
        }
        if state.closed {
            return DrainOutcome::Closed;
        }

        state.pending_bytes -= self.quantum_bytes;
        state.total_bytes_drained += self.quantum_bytes;
        state.quanta_drained += 1;
        let pending_bytes = state.pending_bytes;
        if let Some(callback) = &self.on_drained {
            callback(pending_bytes);
        }
        drop(state);

        self.space_available.notify_all();
        DrainOutcome::Drained { pending_bytes }
    }

    /// Bytes written but not yet played
    pub fn unplayed_buffer_size(&self) -> u64 {
        self.state.lock().pending_bytes
    }

    /// Informational volume (default 1.0); does not affect pacing
    pub fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    /// Set the volume attribute, clamped to `[0.0, 1.0]`
    ///
    /// NaN is ignored.
    pub fn set_volume(&self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        self.state.lock().volume = volume.clamp(0.0, 1.0);
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Current state machine state
    pub fn state(&self) -> PlayerState {
        self.state.lock().player_state()
    }

    /// Counter snapshot
    pub fn stats(&self) -> PlayerStats {
        let state = self.state.lock();
        PlayerStats {
            total_bytes_written: state.total_bytes_written,
            total_bytes_drained: state.total_bytes_drained,
            quanta_drained: state.quanta_drained,
            pending_bytes: state.pending_bytes,
        }
    }

    fn notify_all(&self) {
        self.space_available.notify_all();
        self.quantum_ready.notify_all();
    }
}
