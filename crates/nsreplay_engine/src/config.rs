//! Configuration for the batch executor.

use std::time::Duration;

/// Configuration for batch execution.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Largest accepted batch (0 = unlimited).
    pub max_batch_ops: usize,
    /// Batches taking longer than this are logged at warn level.
    pub slow_batch_threshold: Option<Duration>,
}

impl ExecutorConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest accepted batch.
    #[must_use]
    pub fn with_max_batch_ops(mut self, max: usize) -> Self {
        self.max_batch_ops = max;
        self
    }

    /// Sets the slow batch threshold.
    #[must_use]
    pub fn with_slow_batch_threshold(mut self, threshold: Duration) -> Self {
        self.slow_batch_threshold = Some(threshold);
        self
    }

    /// Disables slow batch warnings.
    #[must_use]
    pub fn without_slow_batch_warning(mut self) -> Self {
        self.slow_batch_threshold = None;
        self
    }

    pub(crate) fn accepts(&self, len: usize) -> bool {
        self.max_batch_ops == 0 || len <= self.max_batch_ops
    }

    pub(crate) fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_batch_threshold.is_some_and(|t| elapsed > t)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_batch_ops: 0,
            slow_batch_threshold: Some(Duration::from_secs(1)),
        }
    }
}
