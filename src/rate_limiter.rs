use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied { retry_after: Duration },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_calls: usize,
    pub period: Duration,
}

/// Sliding-window limiter keyed by user id. Windows are pruned lazily when
/// the user is next seen; `sweep` drops idle users entirely.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<u64, VecDeque<DateTime<Utc>>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, user_id: u64, now: DateTime<Utc>) -> Verdict {
        if !self.config.enabled {
            return Verdict::Allowed;
        }

        let mut windows = self.windows.lock();
        match windows.get_mut(&user_id) {
            Some(window) => self.judge(window, now),
            None => Verdict::Allowed,
        }
    }

    /// Callers must `check` first. The pair is not atomic: two racing calls
    /// can both pass `check` and push a user one call over the limit.
    pub fn record(&self, user_id: u64, now: DateTime<Utc>) {
        if !self.config.enabled {
            return;
        }

        self.windows.lock().entry(user_id).or_default().push_back(now);
    }

    /// `check` and `record` under a single lock acquisition. Denied calls are
    /// not recorded.
    pub fn check_and_record(&self, user_id: u64, now: DateTime<Utc>) -> Verdict {
        if !self.config.enabled {
            return Verdict::Allowed;
        }

        let mut windows = self.windows.lock();
        let window = windows.entry(user_id).or_default();

        let verdict = self.judge(window, now);
        if verdict.is_allowed() {
            window.push_back(now);
        }
        verdict
    }

    /// Drops users whose whole window has expired. Returns how many were
    /// dropped.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();

        windows.retain(|_, window| {
            self.prune(window, now);
            !window.is_empty()
        });

        before - windows.len()
    }

    pub fn tracked_users(&self) -> usize {
        self.windows.lock().len()
    }

    fn judge(&self, window: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) -> Verdict {
        self.prune(window, now);

        if window.len() < self.config.max_calls {
            return Verdict::Allowed;
        }

        let period = self.period();
        let retry_after = match window.front() {
            Some(oldest) => period.checked_sub(&(now - *oldest)).unwrap_or(period),
            None => period,
        };

        // A clock that stepped backwards can push the oldest entry past `now`.
        let retry_after = retry_after
            .clamp(chrono::Duration::milliseconds(1), period)
            .to_std()
            .unwrap_or(self.config.period);

        Verdict::Denied { retry_after }
    }

    /// An entry stays in the window while `now - entry < period`.
    fn prune(&self, window: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        let period = self.period();
        while let Some(oldest) = window.front() {
            if now - *oldest >= period {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    fn period(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.period).unwrap_or(chrono::Duration::MAX)
    }
}
