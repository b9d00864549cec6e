//! Playback Loop
//!
//! One dedicated OS thread per player, standing in for the output device:
//!
//! ```text
//! loop {
//!     drain one quantum      (blocks until a full quantum is pending, or closed)
//!     notify producer        (drain callback, wakes blocked write)
//!     sleep one period       (quantum / bytes_per_second)
//! }
//! ```
//!
//! The thread exits when it observes the buffer closed. Shutdown is
//! close-then-join, so by the time [`PlaybackLoop::join`] returns nothing
//! touches the buffer from this side any more.

use crate::audio::clock::{Pacer, PlaybackClock};
use crate::error::{Error, Result};
use crate::playback::player_buffer::{DrainOutcome, PlayerBuffer};
use pcmbridge_common::PlayerId;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

/// Handle to a running playback thread
pub struct PlaybackLoop {
    player_id: PlayerId,
    buffer: Arc<PlayerBuffer>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PlaybackLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackLoop")
            .field("player_id", &self.player_id)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

impl PlaybackLoop {
    /// Start the playback thread for `buffer`
    ///
    /// # Errors
    /// `Error::InvalidFormat` if the buffer's quantum is zero, `Error::Thread`
    /// if the OS refuses to spawn the thread.
    pub fn spawn(
        player_id: PlayerId,
        buffer: Arc<PlayerBuffer>,
        pacer: Arc<dyn Pacer>,
    ) -> Result<Self> {
        let clock = PlaybackClock::new(buffer.format(), buffer.quantum_bytes())?;
        let worker_buffer = Arc::clone(&buffer);

        let handle = thread::Builder::new()
            .name(format!("pcm-playback-{}", player_id.as_u64()))
            .spawn(move || Self::run(player_id, worker_buffer, clock, pacer))
            .map_err(|e| Error::Thread(format!("failed to spawn playback thread: {}", e)))?;

        debug!(
            "Playback thread started for {} ({} bytes every {:?})",
            player_id,
            clock.quantum_bytes(),
            clock.interval()
        );

        Ok(Self {
            player_id,
            buffer,
            thread: Some(handle),
        })
    }

    fn run(
        player_id: PlayerId,
        buffer: Arc<PlayerBuffer>,
        clock: PlaybackClock,
        pacer: Arc<dyn Pacer>,
    ) {
        loop {
            match buffer.drain_quantum() {
                DrainOutcome::Drained { pending_bytes } => {
                    trace!("{} drained quantum, {} bytes pending", player_id, pending_bytes);
                }
                DrainOutcome::Closed => {
                    debug!("{} playback thread observed close", player_id);
                    break;
                }
            }
            clock.pace(pacer.as_ref());
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// True once the thread has returned (or was already joined)
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Close the buffer and wait for the thread to exit
    ///
    /// The thread may be mid-sleep; this waits at most one period.
    pub fn shutdown(mut self) -> Result<()> {
        self.buffer.close(false);
        self.join_thread()
    }

    /// Wait for the thread to exit; the buffer must already be closed
    pub fn join(mut self) -> Result<()> {
        self.join_thread()
    }

    fn join_thread(&mut self) -> Result<()> {
        let Some(handle) = self.thread.take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(()) => {
                debug!("Playback thread for {} joined", self.player_id);
                Ok(())
            }
            Err(e) => {
                error!("Playback thread for {} panicked: {:?}", self.player_id, e);
                Err(Error::Thread(format!(
                    "playback thread for {} panicked",
                    self.player_id
                )))
            }
        }
    }
}

impl Drop for PlaybackLoop {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.buffer.close(false);
            let _ = self.join_thread();
        }
    }
}
