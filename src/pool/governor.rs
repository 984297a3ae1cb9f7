//! Credential pool and rate governor.
//!
//! One `CredentialPool` backs a single API family (Gemini or OpenAI). Mixed
//! mode runs two independent pools side by side; see `driver`.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use super::credential::{unix_now, Credential, ErrorKind};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("timed out waiting for an available credential")]
    Timeout,
    #[error("every credential in the pool has been exhausted for this session")]
    Exhausted,
}

/// Read-only view of pool health, for reporting and `--check-api`.
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub size: usize,
    pub skipped: usize,
    pub cooling: usize,
    pub session_fatal: bool,
}

struct Inner {
    credentials: Vec<Credential>,
    global_recent_request_times: VecDeque<u64>,
    global_rpm_limit: u32,
    round_robin_cursor: usize,
    session_fatal: bool,
}

/// Thread-safe rate-limited credential pool for one API family.
pub struct CredentialPool {
    inner: Mutex<Inner>,
    acquire_timeout: Duration,
    debug: bool,
}

impl CredentialPool {
    pub fn new(credentials: Vec<Credential>, global_rpm_limit: u32, debug: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                credentials,
                global_recent_request_times: VecDeque::new(),
                global_rpm_limit: global_rpm_limit.max(1),
                round_robin_cursor: 0,
                session_fatal: false,
            }),
            acquire_timeout: Duration::from_secs(30),
            debug,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().credentials.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().credentials.len()
    }

    pub fn is_session_fatal(&self) -> bool {
        self.inner.lock().unwrap().session_fatal
    }

    /// Blocks until a credential clears all quota rules, the pool is
    /// exhausted, or `acquire_timeout` elapses.
    pub fn acquire(&self) -> Result<String, PoolError> {
        let deadline = std::time::Instant::now() + self.acquire_timeout;
        let mut poll_count: u32 = 0;

        loop {
            if let Some(winner) = self.try_select() {
                return Ok(winner);
            }
            if self.inner.lock().unwrap().session_fatal {
                return Err(PoolError::Exhausted);
            }
            if std::time::Instant::now() >= deadline {
                return Err(PoolError::Timeout);
            }

            poll_count += 1;
            let k = poll_count / 3;
            let backoff = Duration::from_secs_f64((0.5 * 2f64.powi(k as i32)).min(5.0));
            thread::sleep(backoff);
        }
    }

    /// Non-blocking single pass of the §4.1 selection algorithm. Returns the
    /// winning key, having already recorded its timestamp in both windows.
    fn try_select(&self) -> Option<String> {
        let now = unix_now();
        let mut guard = self.inner.lock().unwrap();

        while let Some(&front) = guard.global_recent_request_times.front() {
            if now.saturating_sub(front) >= 60 {
                guard.global_recent_request_times.pop_front();
            } else {
                break;
            }
        }
        if guard.global_recent_request_times.len() as u32 >= guard.global_rpm_limit {
            return None;
        }

        let pool_size = guard.credentials.len();
        if pool_size == 0 {
            return None;
        }
        let cursor = guard.round_robin_cursor;

        let mut best_idx: Option<usize> = None;
        let mut best_score = f64::NEG_INFINITY;

        for i in 0..pool_size {
            let cred = &mut guard.credentials[i];
            if !cred.is_available(now) {
                continue;
            }
            cred.evict_stale(now);
            if cred.window_len() as u32 >= cred.rpm_limit {
                continue;
            }

            let distance = (i + pool_size - cursor) % pool_size;
            let rotation_weight = 1.0 - (distance as f64 / pool_size as f64);
            let fill_ratio = cred.window_len() as f64 / cred.rpm_limit as f64;
            let score = 0.5 * cred.ema_success_rate - 0.3 * fill_ratio + 0.2 * rotation_weight;

            if score > best_score {
                best_score = score;
                best_idx = Some(i);
            }
        }

        let idx = best_idx?;
        guard.credentials[idx].record_request(now);
        guard.global_recent_request_times.push_back(now);
        guard.round_robin_cursor = (idx + 1) % pool_size;
        Some(guard.credentials[idx].key.clone())
    }

    pub fn report_success(&self, key: &str) {
        let mut guard = self.inner.lock().unwrap();
        if let Some(cred) = guard.credentials.iter_mut().find(|c| c.key == key) {
            cred.report_success();
        }
    }

    pub fn report_error(&self, key: &str, kind: ErrorKind) {
        let now = unix_now();
        let mut guard = self.inner.lock().unwrap();
        let Some(cred) = guard.credentials.iter_mut().find(|c| c.key == key) else {
            return;
        };
        let became_skipped = cred.report_error(kind, now);
        if became_skipped && self.debug {
            eprintln!("DEBUG: credential {} exhausted after {} errors", redact(key), cred.total_errors);
        }

        if became_skipped {
            let all_skipped = guard.credentials.iter().all(|c| c.skipped);
            if all_skipped && !guard.session_fatal {
                guard.session_fatal = true;
                eprintln!("WARNING: all credentials in this pool are exhausted; further chapters for this family will fail");
            }
        }
    }

    /// Returns a clone of the named credential's current static+runtime
    /// state, for callers (the adapter) that need its fields after the pool
    /// lock has been released.
    pub fn credential_snapshot(&self, key: &str) -> Option<Credential> {
        self.inner.lock().unwrap().credentials.iter().find(|c| c.key == key).cloned()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let now = unix_now();
        let guard = self.inner.lock().unwrap();
        PoolSnapshot {
            size: guard.credentials.len(),
            skipped: guard.credentials.iter().filter(|c| c.skipped).count(),
            cooling: guard
                .credentials
                .iter()
                .filter(|c| !c.skipped && c.cooling_until > now)
                .count(),
            session_fatal: guard.session_fatal,
        }
    }

    /// Static concurrency ceiling derived from the pool's configured RPMs,
    /// per §4.1. Drives the Batch Driver's default worker count.
    pub fn max_concurrency(&self) -> usize {
        let guard = self.inner.lock().unwrap();
        let n = guard.credentials.len();
        if n == 0 {
            return 1;
        }
        let total_rpm: u32 = guard.credentials.iter().map(|c| c.rpm_limit).sum();
        let raw = if n == 1 {
            (total_rpm as f64 / 5.0).floor().max(1.0) as usize
        } else {
            let by_rpm = (total_rpm as f64 / 10.0).floor().max(1.0) as usize;
            // multi-credential pools never drop below half the credential count
            by_rpm.max(n / 2)
        };
        let cap = if n > 5 { 20 } else { 10 };
        raw.min(cap).max(1)
    }
}

/// Masks everything but the last 4 characters of a credential key for logs.
fn redact(key: &str) -> String {
    if key.len() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", &key[key.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(rpm: u32, n: usize) -> CredentialPool {
        let creds = (0..n)
            .map(|i| Credential::new(format!("key{i}"), None, None, rpm))
            .collect();
        CredentialPool::new(creds, 100, false)
    }

    #[test]
    fn acquire_returns_immediately_when_capacity_available() {
        let pool = pool_of(5, 1);
        let key = pool.acquire().unwrap();
        assert_eq!(key, "key0");
    }

    #[test]
    fn report_error_escalates_to_skipped_and_session_fatal_single_credential() {
        let pool = pool_of(100, 1);
        for _ in 0..20 {
            pool.report_error("key0", ErrorKind::General);
        }
        assert!(pool.is_session_fatal());
        assert!(matches!(pool.acquire(), Err(PoolError::Exhausted)));
    }

    #[test]
    fn failover_leaves_healthy_credential_untouched() {
        let pool = pool_of(100, 2);
        pool.report_error("key0", ErrorKind::General);
        let snap = pool.snapshot();
        assert_eq!(snap.size, 2);
        assert_eq!(snap.skipped, 0);
    }

    #[test]
    fn max_concurrency_is_never_zero_and_respects_cap() {
        let pool = pool_of(1000, 1);
        assert!(pool.max_concurrency() <= 10);
        assert!(pool.max_concurrency() >= 1);

        let big_pool = pool_of(1000, 10);
        assert!(big_pool.max_concurrency() <= 20);
    }

    #[test]
    fn empty_pool_has_concurrency_floor_of_one() {
        let pool = CredentialPool::new(Vec::new(), 20, false);
        assert_eq!(pool.max_concurrency(), 1);
    }

    #[test]
    fn credential_at_its_own_rpm_limit_is_excluded_from_selection() {
        let pool = pool_of(3, 1);
        let now = unix_now();
        {
            let mut guard = pool.inner.lock().unwrap();
            let cred = &mut guard.credentials[0];
            cred.record_request(now);
            cred.record_request(now);
            cred.record_request(now);
        }
        assert!(pool.try_select().is_none());
    }

    #[test]
    fn global_window_at_limit_blocks_every_credential() {
        let pool = pool_of(100, 2);
        let now = unix_now();
        {
            let mut guard = pool.inner.lock().unwrap();
            guard.global_rpm_limit = 1;
            guard.global_recent_request_times.push_back(now);
        }
        assert!(pool.try_select().is_none());
    }
}
