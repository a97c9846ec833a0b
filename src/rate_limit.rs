use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

// How often the idle sweep may run
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);
// Clients with no request newer than this are dropped by the sweep
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(86_400);

/// Per-client sliding-window request history.
///
/// Each client identifier maps to the arrival times of its admitted requests.
/// The check-then-act sequence in [`ClientRegistry::record_and_check`] runs
/// while holding the map's write guard for that key, so concurrent calls for
/// the same client serialize and never over-admit.
pub struct ClientRegistry {
    clients: DashMap<String, VecDeque<Instant>>,
    last_cleanup: Mutex<Instant>,
    cleanup_interval: Duration,
    idle_ttl: Duration,
}

impl ClientRegistry {
    pub fn new(cleanup_interval: Duration, idle_ttl: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            last_cleanup: Mutex::new(Instant::now()),
            cleanup_interval,
            idle_ttl,
        }
    }

    /// Record a request from `client_id` and report whether it is over the limit.
    ///
    /// Returns `true` when the client already has `max_requests` requests inside
    /// the last `window` (the request is rejected and not recorded), `false` when
    /// the request is admitted and its timestamp appended.
    pub fn record_and_check(&self, client_id: &str, max_requests: u32, window: Duration) -> bool {
        self.record_and_check_at(client_id, max_requests, window, Instant::now())
    }

    /// Same as [`record_and_check`](Self::record_and_check) with an explicit clock reading.
    pub fn record_and_check_at(
        &self,
        client_id: &str,
        max_requests: u32,
        window: Duration,
        now: Instant,
    ) -> bool {
        // must run before taking the entry guard: retain() locks every shard
        self.maybe_cleanup(now);

        let mut history = self.clients.entry(client_id.to_owned()).or_default();

        history.retain(|t| now.saturating_duration_since(*t) < window);

        if history.len() >= max_requests as usize {
            return true;
        }

        history.push_back(now);
        false
    }

    /// Drop clients idle for longer than the idle TTL, at most once per cleanup interval.
    ///
    /// Returns how many clients were removed. A sweep already running on another
    /// thread makes this a no-op.
    pub fn maybe_cleanup(&self, now: Instant) -> usize {
        let Some(mut last_cleanup) = self.last_cleanup.try_lock() else {
            return 0;
        };

        if now.saturating_duration_since(*last_cleanup) <= self.cleanup_interval {
            return 0;
        }

        let before = self.clients.len();
        let idle_ttl = self.idle_ttl;
        self.clients.retain(|_, history| {
            history
                .iter()
                .any(|t| now.saturating_duration_since(*t) <= idle_ttl)
        });
        *last_cleanup = now;

        let removed = before.saturating_sub(self.clients.len());
        debug!(removed, remaining = self.clients.len(), "idle client sweep complete");
        removed
    }

    // Number of tracked clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    // Recorded timestamps for a client, without trimming
    pub fn history_len(&self, client_id: &str) -> Option<usize> {
        self.clients.get(client_id).map(|history| history.len())
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CLEANUP_INTERVAL, DEFAULT_IDLE_TTL)
    }
}
