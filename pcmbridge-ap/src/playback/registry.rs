//! Player Registry
//!
//! Maps opaque [`PlayerId`]s to live players.
//!
//! - Ids start at 1, strictly increase, and are never reused after close
//! - The map lock is held only to look up, insert or remove an entry. Every
//!   operation clones the player's `Arc` first and releases the lock, so a
//!   write blocked on one player never stalls operations on another
//! - Operations on an unknown (or closed) id fail with
//!   [`Error::PlayerNotFound`]

use crate::audio::clock::{Pacer, SleepPacer};
use crate::error::{Error, Result};
use crate::playback::player::{AudioPlayer, Player};
use crate::playback::player_buffer::{PlayerStats, WriteOutcome};
use parking_lot::RwLock;
use pcmbridge_common::events::{PlayerState, DEFAULT_EVENT_CAPACITY};
use pcmbridge_common::{EventBus, PlayerEvent, PlayerId, StreamFormat};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Owns every live player
pub struct PlayerRegistry {
    /// Map of player id -> player
    players: RwLock<HashMap<PlayerId, Arc<Player>>>,

    /// Next id to hand out
    next_id: AtomicU64,

    /// Shared by every playback thread
    pacer: Arc<dyn Pacer>,

    events: EventBus,
}

impl std::fmt::Debug for PlayerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerRegistry")
            .field("players", &self.players.read().len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerRegistry {
    /// Registry pacing playback in real time
    pub fn new() -> Self {
        Self::with_pacer(Arc::new(SleepPacer))
    }

    /// Registry pacing playback with `pacer`
    pub fn with_pacer(pacer: Arc<dyn Pacer>) -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            pacer,
            events: EventBus::new(DEFAULT_EVENT_CAPACITY),
        }
    }

    /// Create a player with the half-second default quantum
    pub fn create(&self, format: StreamFormat) -> Result<PlayerId> {
        self.create_with_quantum(format, format.default_quantum_bytes())
    }

    /// Create a player and start its playback thread
    ///
    /// # Errors
    /// `Error::InvalidFormat` for an invalid format or zero quantum,
    /// `Error::Thread` if the thread cannot be spawned. A failed create still
    /// consumes an id.
    pub fn create_with_quantum(&self, format: StreamFormat, quantum_bytes: u64) -> Result<PlayerId> {
        let id = PlayerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let player = Player::spawn(
            id,
            format,
            quantum_bytes,
            Arc::clone(&self.pacer),
            self.events.clone(),
        )?;
        self.players.write().insert(id, Arc::new(player));
        Ok(id)
    }

    /// Look up a player; the lock is released before returning
    pub fn get(&self, id: PlayerId) -> Result<Arc<Player>> {
        self.players
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::PlayerNotFound(id))
    }

    /// Blocking write of `data.len()` bytes
    pub fn write(&self, id: PlayerId, data: &[u8]) -> Result<WriteOutcome> {
        Ok(self.get(id)?.write(data))
    }

    /// Blocking write of a byte count
    pub fn write_len(&self, id: PlayerId, len: u64) -> Result<WriteOutcome> {
        Ok(self.get(id)?.write_len(len))
    }

    pub fn pause(&self, id: PlayerId) -> Result<()> {
        self.get(id)?.pause();
        Ok(())
    }

    pub fn resume(&self, id: PlayerId) -> Result<()> {
        self.get(id)?.play();
        Ok(())
    }

    pub fn is_writable(&self, id: PlayerId) -> Result<bool> {
        Ok(self.get(id)?.is_writable())
    }

    pub fn set_volume(&self, id: PlayerId, volume: f64) -> Result<()> {
        self.get(id)?.set_volume(volume);
        Ok(())
    }

    pub fn volume(&self, id: PlayerId) -> Result<f64> {
        Ok(self.get(id)?.volume())
    }

    pub fn unplayed_buffer_size(&self, id: PlayerId) -> Result<u64> {
        Ok(self.get(id)?.unplayed_buffer_size())
    }

    pub fn state(&self, id: PlayerId) -> Result<PlayerState> {
        Ok(self.get(id)?.state())
    }

    pub fn stats(&self, id: PlayerId) -> Result<PlayerStats> {
        Ok(self.get(id)?.stats())
    }

    /// Close a player, join its thread and retire its id
    ///
    /// The entry is removed under the lock; closing and joining happen after
    /// it is released. Returns the bytes that were never played.
    pub fn close(&self, id: PlayerId, immediate: bool) -> Result<u64> {
        let player = self
            .players
            .write()
            .remove(&id)
            .ok_or(Error::PlayerNotFound(id))?;
        player.close(immediate)
    }

    /// Close every player, logging (not returning) individual failures
    pub fn close_all(&self) {
        let players: Vec<Arc<Player>> = self.players.write().drain().map(|(_, p)| p).collect();
        if players.is_empty() {
            return;
        }
        debug!("Closing {} players", players.len());
        for player in players {
            if let Err(e) = player.close(true) {
                warn!("Failed to close {}: {}", player.id(), e);
            }
        }
    }

    /// Ids of live players, ascending
    pub fn ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.players.read().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.players.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.read().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

impl Drop for PlayerRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}
