//! Store configuration.

/// Configuration for a [`crate::MemoryStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Largest number of documents accepted by one insert call (0 = unlimited).
    pub max_insert_batch: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_insert_batch: 0,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest accepted insert call.
    #[must_use]
    pub const fn max_insert_batch(mut self, value: usize) -> Self {
        self.max_insert_batch = value;
        self
    }

    /// Returns true if an insert of `len` documents is within limits.
    pub(crate) fn accepts_insert(&self, len: usize) -> bool {
        self.max_insert_batch == 0 || len <= self.max_insert_batch
    }
}
