//! Event types for the pcmbridge event system
//!
//! Player lifecycle and drain notifications are published on an [`EventBus`].
//! The playback threads only ever publish; producers subscribe and react on
//! their own thread.

mod player_types;

pub use player_types::{PlayerId, PlayerState};

use crate::StreamFormat;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default event bus capacity
///
/// A lagging subscriber loses the oldest events once this many are queued.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Player event types
///
/// Serialized with a `type` tag so a JSON stream of events is self-describing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// A player was created and its playback thread started
    PlayerCreated {
        player_id: PlayerId,
        format: StreamFormat,
        /// Bytes consumed per playback period
        quantum_bytes: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The playback thread consumed one quantum
    ///
    /// This is the "written" notification the producer uses to top the
    /// buffer back up.
    QuantumDrained {
        player_id: PlayerId,
        /// Always the player's quantum
        bytes: u64,
        /// Bytes still pending after this drain
        pending_bytes: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Player state changed (Active ⇄ Paused)
    PlayerStateChanged {
        player_id: PlayerId,
        old_state: PlayerState,
        new_state: PlayerState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Player volume attribute changed
    VolumeChanged {
        player_id: PlayerId,
        volume: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Player closed and its playback thread joined
    PlayerClosed {
        player_id: PlayerId,
        /// Whether the caller asked for an immediate close
        immediate: bool,
        /// Bytes that were pending (never played) at close
        unplayed_bytes: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Player the event refers to
    pub fn player_id(&self) -> PlayerId {
        match self {
            PlayerEvent::PlayerCreated { player_id, .. }
            | PlayerEvent::QuantumDrained { player_id, .. }
            | PlayerEvent::PlayerStateChanged { player_id, .. }
            | PlayerEvent::VolumeChanged { player_id, .. }
            | PlayerEvent::PlayerClosed { player_id, .. } => *player_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Event distribution bus for player events
///
/// Wraps `tokio::sync::broadcast`:
/// - publishing never blocks, so it is safe from playback threads
/// - any number of subscribers
/// - slow subscribers observe `RecvError::Lagged` instead of stalling playback
///
/// Sending does not need a runtime; receivers can use `recv().await`,
/// `blocking_recv()` or `try_recv()`.
///
/// # Examples
///
/// ```
/// use pcmbridge_common::events::{EventBus, PlayerEvent, PlayerId, PlayerState};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(PlayerEvent::PlayerStateChanged {
///     player_id: PlayerId(1),
///     old_state: PlayerState::Active,
///     new_state: PlayerState::Paused,
///     timestamp: chrono::Utc::now(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.player_id(), PlayerId(1));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drained(id: u64) -> PlayerEvent {
        PlayerEvent::QuantumDrained {
            player_id: PlayerId(id),
            bytes: 4096,
            pending_bytes: 0,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(8);
        assert!(bus.emit(drained(1)).is_err());
        // Lossy variant swallows it
        bus.emit_lossy(drained(1));
    }

    #[test]
    fn test_every_subscriber_receives() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.emit(drained(7)).unwrap(), 2);
        assert_eq!(a.try_recv().unwrap().player_id(), PlayerId(7));
        assert_eq!(b.try_recv().unwrap().player_id(), PlayerId(7));
    }

    #[test]
    fn test_slow_subscriber_lags_instead_of_blocking() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.emit_lossy(drained(i));
        }
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(3))
        ));
        assert_eq!(rx.try_recv().unwrap().player_id(), PlayerId(3));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        assert_eq!(EventBus::new(0).capacity(), 1);
    }

    #[test]
    fn test_serialized_tag() {
        let json = serde_json::to_value(drained(3)).unwrap();
        assert_eq!(json["type"], "QuantumDrained");
        assert_eq!(json["player_id"], 3);
        assert_eq!(json["bytes"], 4096);
    }

    #[test]
    fn test_player_state_display() {
        assert_eq!(PlayerState::Paused.to_string(), "paused");
        assert_eq!(PlayerId(12).to_string(), "player#12");
    }
}
