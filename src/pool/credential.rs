//! A single credential's static identity plus its runtime quota state.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default RPM assigned to a credential when the config omits `rpm`.
pub const DEFAULT_RPM: u32 = 5;

/// RPM assigned to the single synthetic credential created from a CLI
/// `-k`/`--openai-key` override.
pub const DEFAULT_KEY_RPM: u32 = 5;

/// Error categories `report_error` distinguishes; drives cooldown policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimit,
    InvalidKey,
    General,
}

/// Threshold at which a credential is permanently benched for the session.
const SESSION_FATAL_ERROR_THRESHOLD: u32 = 20;

/// One API key plus its endpoint/model configuration and the rolling
/// quota/health state the governor mutates.
#[derive(Debug, Clone)]
pub struct Credential {
    pub key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub rpm_limit: u32,

    pub(crate) recent_request_times: VecDeque<u64>,
    pub total_errors: u32,
    pub consecutive_errors: u32,
    pub cooling_until: u64,
    pub ema_success_rate: f64,
    pub skipped: bool,
}

impl Credential {
    pub fn new(key: impl Into<String>, base_url: Option<String>, model: Option<String>, rpm_limit: u32) -> Self {
        Self {
            key: key.into(),
            base_url,
            model,
            rpm_limit: rpm_limit.max(1),
            recent_request_times: VecDeque::new(),
            total_errors: 0,
            consecutive_errors: 0,
            cooling_until: 0,
            ema_success_rate: 1.0,
            skipped: false,
        }
    }

    /// Drop timestamps older than the 60-second rolling window.
    pub(crate) fn evict_stale(&mut self, now: u64) {
        while let Some(&front) = self.recent_request_times.front() {
            if now.saturating_sub(front) >= 60 {
                self.recent_request_times.pop_front();
            } else {
                break;
            }
        }
    }

    pub(crate) fn window_len(&self) -> usize {
        self.recent_request_times.len()
    }

    pub(crate) fn record_request(&mut self, now: u64) {
        self.recent_request_times.push_back(now);
    }

    pub fn is_available(&self, now: u64) -> bool {
        !self.skipped && self.cooling_until <= now
    }

    pub fn report_success(&mut self) {
        self.consecutive_errors = 0;
        self.ema_success_rate = self.ema_success_rate * 0.9 + 0.1;
    }

    /// Applies §4.1's error policy and returns true if this transition pushed
    /// the credential into `skipped`.
    pub fn report_error(&mut self, kind: ErrorKind, now: u64) -> bool {
        self.total_errors += 1;
        self.consecutive_errors += 1;
        self.ema_success_rate *= 0.9;

        if self.total_errors >= SESSION_FATAL_ERROR_THRESHOLD {
            self.skipped = true;
            return true;
        }

        match kind {
            ErrorKind::RateLimit => {
                let exp = self.consecutive_errors.saturating_sub(1).min(4);
                let secs = 60u64.saturating_mul(1u64 << exp).min(3600);
                self.cooling_until = now + secs;
            }
            ErrorKind::InvalidKey => {
                self.cooling_until = now + 3600;
            }
            ErrorKind::General => {
                if self.consecutive_errors >= 5 {
                    let exp = self.consecutive_errors.saturating_sub(5).min(4);
                    let secs = 30u64.saturating_mul(1u64 << exp).min(1800);
                    self.cooling_until = now + secs;
                }
            }
        }
        false
    }
}

/// Wall-clock seconds since the Unix epoch, used as the governor's `now`.
///
/// Tests inject their own clock instead of calling this, so the governor's
/// selection logic never depends on it directly.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_credential_has_full_ema_and_no_cooldown() {
        let c = Credential::new("k", None, None, 10);
        assert_eq!(c.ema_success_rate, 1.0);
        assert!(c.is_available(0));
    }

    #[test]
    fn report_success_resets_consecutive_and_raises_ema() {
        let mut c = Credential::new("k", None, None, 10);
        c.ema_success_rate = 0.5;
        c.consecutive_errors = 3;
        c.report_success();
        assert_eq!(c.consecutive_errors, 0);
        assert!((c.ema_success_rate - 0.55).abs() < 1e-9);
    }

    #[test]
    fn rate_limit_errors_cool_with_exponential_backoff() {
        let mut c = Credential::new("k", None, None, 10);
        c.report_error(ErrorKind::RateLimit, 1000);
        assert_eq!(c.cooling_until, 1060); // 60 * 2^0
        c.report_error(ErrorKind::RateLimit, 1060);
        assert_eq!(c.cooling_until, 1060 + 120); // 60 * 2^1
    }

    #[test]
    fn invalid_key_cools_for_an_hour() {
        let mut c = Credential::new("k", None, None, 10);
        c.report_error(ErrorKind::InvalidKey, 0);
        assert_eq!(c.cooling_until, 3600);
    }

    #[test]
    fn general_errors_do_not_cool_until_five_consecutive() {
        let mut c = Credential::new("k", None, None, 10);
        for _ in 0..4 {
            c.report_error(ErrorKind::General, 0);
        }
        assert_eq!(c.cooling_until, 0);
        c.report_error(ErrorKind::General, 0);
        assert_eq!(c.cooling_until, 30);
    }

    #[test]
    fn twenty_errors_mark_skipped_regardless_of_kind() {
        let mut c = Credential::new("k", None, None, 10);
        let mut became_skipped = false;
        for _ in 0..20 {
            became_skipped = c.report_error(ErrorKind::General, 0);
        }
        assert!(c.skipped);
        assert!(became_skipped);
        assert!(!c.is_available(0));
    }
}
