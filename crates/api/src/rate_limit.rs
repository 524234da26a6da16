use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug)]
struct Hits {
    by_client: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

/// Sliding-window request limiter keyed by client address.
#[derive(Debug, Clone)]
pub struct ClientRateLimiter {
    hits: Arc<Mutex<Hits>>,
    window: Duration,
    max_requests: usize,
}

impl ClientRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            hits: Arc::new(Mutex::new(Hits {
                by_client: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            window,
            max_requests,
        }
    }

    pub fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Instant::now())
    }

    /// Clients with at least one request still inside the window.
    pub fn tracked_clients(&self) -> usize {
        self.hits.lock().by_client.len()
    }

    fn allow_at(&self, client: &str, now: Instant) -> bool {
        let mut guard = self.hits.lock();

        // At most one full sweep per window keeps idle clients from piling up.
        if now.saturating_duration_since(guard.last_sweep) > self.window {
            let window = self.window;
            guard.by_client.retain(|_, recent| {
                recent
                    .back()
                    .is_some_and(|last| now.saturating_duration_since(*last) <= window)
            });
            guard.last_sweep = now;
        }

        let recent = guard.by_client.entry(client.to_string()).or_default();
        while recent
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) > self.window)
        {
            recent.pop_front();
        }

        if recent.len() >= self.max_requests {
            return false;
        }

        recent.push_back(now);
        true
    }
}
