use std::time::Duration;

use fanout_core::executor::traits::BackoffStrategy;
use fanout_core::executor::types::RetryConfig;
use rand::Rng;

/// `base × 2^(attempt-1)`, capped at `max_delay_ms`, with optional ± jitter.
pub struct ExponentialBackoffPlugin {
    config: RetryConfig,
}

/// `base × attempt`, capped at `max_delay_ms`.
pub struct LinearRetryPlugin {
    config: RetryConfig,
}

impl ExponentialBackoffPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    fn capped_ms(&self, attempt: u32) -> u64 {
        let exp = 1u64 << attempt.saturating_sub(1).min(30);
        self.config
            .base_delay_ms
            .saturating_mul(exp)
            .min(self.config.max_delay_ms)
    }
}

impl LinearRetryPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl BackoffStrategy for ExponentialBackoffPlugin {
    fn name(&self) -> &str {
        "exponential-backoff"
    }

    fn delay(&self, attempt: u32) -> Duration {
        let capped = self.capped_ms(attempt) as f64;
        let jitter = self.config.jitter.clamp(0.0, 1.0);
        let ms = if jitter > 0.0 && capped > 0.0 {
            let range = capped * jitter;
            let offset = rand::thread_rng().gen_range(-range..range);
            (capped + offset).max(0.0)
        } else {
            capped
        };
        Duration::from_millis(ms as u64)
    }
}

impl BackoffStrategy for LinearRetryPlugin {
    fn name(&self) -> &str {
        "linear"
    }

    fn delay(&self, attempt: u32) -> Duration {
        let multiplier = attempt.max(1) as u64;
        let delay = self
            .config
            .base_delay_ms
            .saturating_mul(multiplier)
            .min(self.config.max_delay_ms);
        Duration::from_millis(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(strategy: &str, base: u64, max: u64, jitter: f64) -> RetryConfig {
        RetryConfig {
            strategy: strategy.to_string(),
            base_delay_ms: base,
            max_delay_ms: max,
            max_retries: 3,
            jitter,
        }
    }

    #[test]
    fn test_exponential_backoff() {
        let plugin = ExponentialBackoffPlugin::new(cfg("exponential-backoff", 100, 1000, 0.0));
        assert_eq!(plugin.delay(1).as_millis(), 100);
        assert_eq!(plugin.delay(2).as_millis(), 200);
        assert_eq!(plugin.delay(3).as_millis(), 400);
        assert_eq!(plugin.delay(10).as_millis(), 1000);
    }

    #[test]
    fn test_exponential_jitter_stays_in_range() {
        let plugin = ExponentialBackoffPlugin::new(cfg("exponential-backoff", 1000, 60_000, 0.25));
        for _ in 0..50 {
            let ms = plugin.delay(2).as_millis();
            assert!((1500..=2500).contains(&ms), "{ms}");
        }
    }

    #[test]
    fn test_linear_backoff() {
        let plugin = LinearRetryPlugin::new(cfg("linear", 50, 200, 0.0));
        assert_eq!(plugin.delay(1).as_millis(), 50);
        assert_eq!(plugin.delay(3).as_millis(), 150);
        assert_eq!(plugin.delay(9).as_millis(), 200);
    }
}
