//! Test helpers for pcmbridge-ap integration tests
//!
//! - Polling waits with a deadline (no bare sleeps in assertions)
//! - Event collection from a player registry

#![allow(dead_code)]

use pcmbridge_ap::{PlayerEvent, PlayerId};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Upper bound for any single wait in the integration tests
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll `condition` every millisecond until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Everything currently queued on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
        }
    }
}

/// Number of `QuantumDrained` events for `id` in `events`
pub fn drain_count(events: &[PlayerEvent], id: PlayerId) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PlayerEvent::QuantumDrained { player_id, .. } if *player_id == id))
        .count()
}
