//! Integration tests for PlayerBuffer backpressure, pause and close
//!
//! Covers byte conservation, the writability predicate as seen through the
//! public API, close racing a blocked write, and the pause scenario with a
//! real playback thread.

mod helpers;

use helpers::{wait_until, WAIT_TIMEOUT};
use pcmbridge_ap::playback::PlaybackLoop;
use pcmbridge_ap::{
    DrainOutcome, PlayerBuffer, PlayerId, SleepPacer, StreamFormat, VirtualPacer, WriteOutcome,
};
use pcmbridge_common::events::PlayerState;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const QUANTUM: u64 = 4096;

fn new_buffer() -> Arc<PlayerBuffer> {
    Arc::new(PlayerBuffer::new(StreamFormat::cd_quality(), QUANTUM))
}

#[test]
fn test_pending_is_written_minus_drained() {
    let buf = new_buffer();
    let mut written = 0u64;
    let mut drained = 0u64;

    for len in [100u64, 4000, 5000, 1, 8192, 3] {
        while !buf.is_writable() {
            assert!(matches!(buf.drain_quantum(), DrainOutcome::Drained { .. }));
            drained += QUANTUM;
        }
        assert_eq!(buf.write(len), WriteOutcome::Written);
        written += len;
        assert_eq!(buf.unplayed_buffer_size(), written - drained);
    }

    while buf.unplayed_buffer_size() >= QUANTUM {
        buf.drain_quantum();
        drained += QUANTUM;
    }
    let stats = buf.stats();
    assert_eq!(stats.total_bytes_written, written);
    assert_eq!(stats.total_bytes_drained, drained);
    assert_eq!(stats.pending_bytes, written - drained);
    assert!(stats.pending_bytes < QUANTUM);
}

#[test]
fn test_is_writable_through_every_reachable_state() {
    let buf = new_buffer();

    // Active, below quantum
    assert!(buf.is_writable());
    buf.write(QUANTUM - 1);
    assert!(buf.is_writable());

    // Active, at quantum
    buf.write(1);
    assert!(!buf.is_writable());

    // Paused, at quantum
    buf.pause();
    assert!(!buf.is_writable());

    // Paused, below quantum
    buf.resume();
    buf.drain_quantum();
    buf.pause();
    assert_eq!(buf.unplayed_buffer_size(), 0);
    assert!(!buf.is_writable());

    // Closed (close clears paused)
    buf.close(false);
    assert_eq!(buf.state(), PlayerState::Closed);
    assert!(buf.is_writable());
}

#[test]
fn test_close_releases_blocked_write_without_mutation() {
    let buf = new_buffer();
    buf.write(QUANTUM);
    assert!(!buf.is_writable());

    let writer = {
        let buf = Arc::clone(&buf);
        thread::spawn(move || buf.write(512))
    };

    // Give the writer time to park on the condvar
    thread::sleep(Duration::from_millis(50));
    assert!(!writer.is_finished());

    let start = Instant::now();
    buf.close(false);
    assert_eq!(writer.join().unwrap(), WriteOutcome::Closed);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(buf.unplayed_buffer_size(), QUANTUM);
}

#[test]
fn test_close_releases_write_blocked_by_pause() {
    let buf = new_buffer();
    buf.pause();

    let writer = {
        let buf = Arc::clone(&buf);
        thread::spawn(move || buf.write(10))
    };
    thread::sleep(Duration::from_millis(30));
    assert!(!writer.is_finished());

    buf.close(true);
    assert_eq!(writer.join().unwrap(), WriteOutcome::Closed);
    assert_eq!(buf.unplayed_buffer_size(), 0);
}

#[test]
fn test_resume_releases_write_blocked_by_pause() {
    let buf = new_buffer();
    buf.pause();

    let writer = {
        let buf = Arc::clone(&buf);
        thread::spawn(move || buf.write(10))
    };
    thread::sleep(Duration::from_millis(30));
    assert!(!writer.is_finished());

    buf.resume();
    assert_eq!(writer.join().unwrap(), WriteOutcome::Written);
    assert_eq!(buf.unplayed_buffer_size(), 10);
}

#[test]
fn test_pause_scenario_with_playback_thread() {
    let buf = new_buffer();

    buf.write(QUANTUM - 1);
    assert!(buf.is_writable());
    buf.write(1);
    assert_eq!(buf.unplayed_buffer_size(), QUANTUM);
    assert!(!buf.is_writable());

    // Pause before any playback thread exists, so nothing can drain early
    buf.pause();
    let playback =
        PlaybackLoop::spawn(PlayerId(1), Arc::clone(&buf), Arc::new(SleepPacer)).unwrap();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(buf.unplayed_buffer_size(), QUANTUM);
    assert_eq!(buf.stats().quanta_drained, 0);

    buf.resume();
    assert!(wait_until(WAIT_TIMEOUT, || buf.unplayed_buffer_size() == 0));
    assert_eq!(buf.stats().quanta_drained, 1);
    assert!(buf.is_writable());

    playback.shutdown().unwrap();
}

#[test]
fn test_pause_never_drains_partial_quantum() {
    let buf = new_buffer();
    let playback =
        PlaybackLoop::spawn(PlayerId(1), Arc::clone(&buf), Arc::new(VirtualPacer::new())).unwrap();

    buf.write(QUANTUM / 2);
    for _ in 0..20 {
        buf.pause();
        buf.resume();
    }
    thread::sleep(Duration::from_millis(20));
    assert_eq!(buf.unplayed_buffer_size(), QUANTUM / 2);
    assert_eq!(buf.stats().quanta_drained, 0);

    playback.shutdown().unwrap();
    assert_eq!(buf.unplayed_buffer_size(), QUANTUM / 2);
}
