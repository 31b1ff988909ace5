//! Per-user sliding-window rate limiter.
//!
//! Shared by every session worker of one agent process. The table is the
//! only cross-session mutable state, so it lives behind a `Mutex`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::transport::UserId;

/// Sliding-window counter keyed by user id.
///
/// `admit` keeps at most `limit` timestamps per user, all younger than
/// `window`. Users whose window drained are dropped by [`RateLimiter::sweep`].
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    windows: Mutex<HashMap<UserId, VecDeque<Instant>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Records an event for `user` at `now` if the user is under the limit.
    ///
    /// Returns `false` when the event must be rejected; rejected events are
    /// not recorded.
    pub fn admit(&self, user: UserId, now: Instant) -> bool {
        let mut windows = self.lock();
        let stamps = windows.entry(user).or_default();
        prune(stamps, now, self.window);
        if stamps.len() >= self.limit {
            tracing::debug!(user, limit = self.limit, "rate limit reached");
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Drops expired timestamps and forgets users with an empty window.
    ///
    /// Returns the number of users evicted.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, stamps| {
            prune(stamps, now, self.window);
            !stamps.is_empty()
        });
        before - windows.len()
    }

    /// Number of users currently holding a window.
    #[must_use]
    pub fn tracked_users(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, VecDeque<Instant>>> {
        // A panic elsewhere cannot leave a window half-updated, so the data
        // is still usable after poisoning.
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = stamps.front() {
        if now.saturating_duration_since(*oldest) >= window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}
