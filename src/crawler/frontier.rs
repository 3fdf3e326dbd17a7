//! The crawl frontier: discovered-but-not-yet-visited URLs.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;

/// FIFO frontier with a visited set and fetch-slot accounting.
///
/// A single lock guards the queue, the seen set, and both counters, so the
/// check-and-insert on discovery and the slot claim on dequeue are atomic
/// under concurrent workers. `capacity` is the page ceiling: the number of
/// fetches that will ever start, successful or not.
pub struct Frontier {
    state: Mutex<State>,
    wake: Notify,
    capacity: usize,
}

#[derive(Default)]
struct State {
    queue: VecDeque<String>,
    seen: HashSet<String>,
    started: usize,
    in_flight: usize,
    closed: bool,
}

impl Frontier {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            wake: Notify::new(),
            capacity,
        }
    }

    fn locked(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueues a URL if it has never been seen and fetch capacity remains.
    /// Returns true when the URL entered the queue.
    pub fn offer(&self, url: &str) -> bool {
        let mut state = self.locked();
        if state.closed || state.started >= self.capacity {
            return false;
        }
        if !state.seen.insert(url.to_string()) {
            return false;
        }
        state.queue.push_back(url.to_string());
        drop(state);
        self.wake.notify_one();
        true
    }

    /// Claims the next URL for fetching. Returns `None` once the crawl is
    /// complete: ceiling reached, frontier closed, or queue drained with no
    /// fetch in flight left to discover more.
    pub async fn claim(&self) -> Option<FetchSlot<'_>> {
        loop {
            {
                let mut state = self.locked();
                if state.closed || state.started >= self.capacity {
                    return None;
                }
                if let Some(url) = state.queue.pop_front() {
                    state.started += 1;
                    state.in_flight += 1;
                    return Some(FetchSlot { frontier: self, url });
                }
                if state.in_flight == 0 {
                    return None;
                }
            }
            // Queue is empty but in-flight fetches may still discover
            // links. Wait for a wake-up, re-checking periodically.
            tokio::select! {
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(25)) => {}
            }
        }
    }

    /// Stops the crawl early: pending queue entries are abandoned and no
    /// further claims succeed. In-flight slots drain normally.
    pub fn close(&self) {
        self.locked().closed = true;
        self.wake.notify_waiters();
    }

    /// Number of fetches that have started.
    pub fn pages_started(&self) -> usize {
        self.locked().started
    }

    /// URLs waiting in the queue.
    pub fn queued(&self) -> usize {
        self.locked().queue.len()
    }
}

/// A claimed fetch slot. Dropping it releases the slot and wakes idle
/// workers so they re-check the queue.
pub struct FetchSlot<'a> {
    frontier: &'a Frontier,
    url: String,
}

impl FetchSlot<'_> {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for FetchSlot<'_> {
    fn drop(&mut self) {
        let mut state = self.frontier.locked();
        state.in_flight -= 1;
        drop(state);
        self.frontier.wake.notify_waiters();
    }
}
