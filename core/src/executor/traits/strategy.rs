use std::time::Duration;

/// Pluggable per-attempt retry delay.
pub trait BackoffStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Delay to wait after the given 1-based attempt failed.
    fn delay(&self, attempt: u32) -> Duration;
}
