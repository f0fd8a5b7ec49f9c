//! Rate limiting for provider API calls
//!
//! Providers enforce quotas two ways: a fixed per-minute allowance and
//! live response-header feedback. The limiter honors both: a local
//! windowed counter gates admission before a call, and
//! `observe_response_headers` reacts to the provider's own remaining-quota
//! signal after one.

use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::RateLimitsConfig;

/// Remaining-quota header reported by the firmographics provider
pub const REMAINING_HEADER: &str = "x-minute-requests-left";
/// Epoch-seconds timestamp at which the provider's window resets
pub const RESET_HEADER: &str = "x-rate-limit-reset";

/// Ceiling on how long a reported reset time may push us to sleep.
/// Provider windows are a minute; anything far beyond that is a bad header.
const MAX_HEADER_SLEEP: Duration = Duration::from_secs(90);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    Denied,
}

/// Windowed per-service request counter. All counts reset together when
/// the 60s window rolls over, mirroring the providers' minute quotas.
#[derive(Debug)]
pub struct RateLimiter {
    counts: HashMap<String, u32>,
    window_started: Instant,
    window: Duration,
    ceilings: HashMap<String, u32>,
    default_ceiling: u32,
}

impl RateLimiter {
    pub fn from_config(config: &RateLimitsConfig) -> Self {
        let mut ceilings = HashMap::new();
        ceilings.insert(
            crate::providers::FIRMOGRAPHICS_SERVICE.to_string(),
            config.firmographics_per_minute,
        );
        ceilings.insert(
            crate::providers::BREACH_LIST_SERVICE.to_string(),
            config.breach_per_minute,
        );

        Self {
            counts: HashMap::new(),
            window_started: Instant::now(),
            window: Duration::from_secs(60),
            ceilings,
            default_ceiling: config.default_per_minute,
        }
    }

    fn ceiling_for(&self, service: &str) -> u32 {
        self.ceilings
            .get(service)
            .copied()
            .unwrap_or(self.default_ceiling)
    }

    /// Count one prospective request against the service's window.
    /// Denial does not consume a slot.
    pub fn check(&mut self, service: &str) -> Admission {
        let now = Instant::now();
        if now.duration_since(self.window_started) > self.window {
            self.counts.clear();
            self.window_started = now;
        }

        let ceiling = self.ceiling_for(service);
        let count = self.counts.entry(service.to_string()).or_insert(0);
        if *count >= ceiling {
            Admission::Denied
        } else {
            *count += 1;
            Admission::Granted
        }
    }
}

/// Thread-safe admission gate shared by every worker calling a provider.
#[derive(Debug, Clone)]
pub struct SharedRateLimiter {
    inner: Arc<Mutex<RateLimiter>>,
    cooldown: Duration,
    low_water_mark: u32,
}

impl SharedRateLimiter {
    pub fn from_config(config: &RateLimitsConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimiter::from_config(config))),
            cooldown: Duration::from_secs(config.cooldown_secs),
            low_water_mark: config.low_water_mark,
        }
    }

    /// Admission gate. A denied caller is held for the cooldown before the
    /// denial is returned; the lock is released first, so only that worker
    /// waits, not the pool.
    pub async fn admit(&self, service: &str) -> bool {
        let decision = {
            let mut limiter = self.inner.lock().await;
            limiter.check(service)
        };

        match decision {
            Admission::Granted => true,
            Admission::Denied => {
                info!(
                    "Rate ceiling reached for {}, cooling down {:?}",
                    service, self.cooldown
                );
                sleep(self.cooldown).await;
                false
            }
        }
    }

    /// React to the provider's quota feedback. When remaining requests drop
    /// below the low-water mark, sleep until the reported reset time has
    /// passed so the next call lands in a fresh window.
    pub async fn observe_response_headers(&self, headers: &HeaderMap) {
        let Some(remaining) = header_u64(headers, REMAINING_HEADER) else {
            return;
        };

        if remaining >= self.low_water_mark as u64 {
            return;
        }

        let Some(reset_epoch) = header_u64(headers, RESET_HEADER) else {
            debug!("Provider reports {} requests left but no reset time", remaining);
            return;
        };

        let now_epoch = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs(),
            Err(_) => return,
        };

        if reset_epoch + 1 <= now_epoch {
            return;
        }

        let wait = Duration::from_secs(reset_epoch + 1 - now_epoch).min(MAX_HEADER_SLEEP);
        warn!(
            "Provider quota nearly exhausted ({} left), sleeping {:?} until reset",
            remaining, wait
        );
        sleep(wait).await;
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Backoff schedule for provider retry loops: base^attempt seconds for a
/// zero-indexed attempt (1s, 2s, 4s, ... with the default base of 2).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    backoff_base_secs: u64,
}

impl RetryPolicy {
    const MAX_BACKOFF: Duration = Duration::from_secs(60);

    pub fn new(max_attempts: u32, backoff_base_secs: u64) -> Self {
        Self {
            max_attempts,
            backoff_base_secs,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let secs = self.backoff_base_secs.saturating_pow(attempt);
        Duration::from_secs(secs).min(Self::MAX_BACKOFF)
    }
}
