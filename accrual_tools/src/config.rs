use std::time::Duration;

use gm_common::helpers::parse_positive;
use log::*;

const DEFAULT_ACCRUAL_ADDRESS: &str = "http://localhost:8085";
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_RETRY_WAIT: Duration = Duration::from_millis(1000);
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
/// Retry waits double after every failed attempt, up to this ceiling.
pub const MAX_RETRY_WAIT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct AccrualConfig {
    /// Base URL of the accrual system, e.g. `http://localhost:8085`.
    pub base_url: String,
    /// How many times a request is retried after a connection-level failure.
    pub retries: u32,
    /// The wait before the first retry.
    pub retry_wait: Duration,
    pub timeout: Duration,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ACCRUAL_ADDRESS.to_string(),
            retries: DEFAULT_RETRIES,
            retry_wait: DEFAULT_RETRY_WAIT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl AccrualConfig {
    pub fn new(address: &str) -> Self {
        Self { base_url: normalize_address(address), ..Default::default() }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("GM_ACCRUAL_SYSTEM_ADDRESS").map(|a| normalize_address(&a)).unwrap_or_else(|_| {
            warn!("🪛️ GM_ACCRUAL_SYSTEM_ADDRESS not set, using {DEFAULT_ACCRUAL_ADDRESS} as default");
            DEFAULT_ACCRUAL_ADDRESS.to_string()
        });
        let retries =
            std::env::var("GM_ACCRUAL_RETRIES").ok().and_then(|s| s.trim().parse::<u32>().ok()).unwrap_or_else(|| {
                info!("🪛️ GM_ACCRUAL_RETRIES not set or invalid, using {DEFAULT_RETRIES} as default");
                DEFAULT_RETRIES
            });
        let retry_wait = parse_positive::<u64>(std::env::var("GM_ACCRUAL_RETRY_WAIT_MS").ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| {
                info!(
                    "🪛️ GM_ACCRUAL_RETRY_WAIT_MS not set or invalid, using {}ms as default",
                    DEFAULT_RETRY_WAIT.as_millis()
                );
                DEFAULT_RETRY_WAIT
            });
        let timeout = parse_positive::<u64>(std::env::var("GM_ACCRUAL_TIMEOUT_MS").ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| {
                info!(
                    "🪛️ GM_ACCRUAL_TIMEOUT_MS not set or invalid, using {}ms as default",
                    DEFAULT_TIMEOUT.as_millis()
                );
                DEFAULT_TIMEOUT
            });
        Self { base_url, retries, retry_wait, timeout }
    }

    pub fn with_retries(mut self, retries: u32, retry_wait: Duration) -> Self {
        self.retries = retries;
        self.retry_wait = retry_wait;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The wait before retry number `attempt` (starting at 1).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_wait.saturating_mul(factor).min(MAX_RETRY_WAIT)
    }
}

/// Accepts bare `host:port` addresses as well as full URLs.
fn normalize_address(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}
