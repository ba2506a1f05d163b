//! Store batch limits.

/// Size bounds of the target store's atomic batches and delete pages.
///
/// Passed explicitly into each engine call so different store products can
/// use different ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Smallest accepted import batch size.
    pub min_batch_size: usize,
    /// Largest accepted import batch size (the store's batch ceiling).
    pub max_batch_size: usize,
    /// Batch size used when the caller gives none.
    pub default_batch_size: usize,
    /// Documents fetched per page by the recursive deleter.
    pub delete_page_size: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            min_batch_size: 1,
            max_batch_size: 500,
            default_batch_size: 500,
            delete_page_size: 500,
        }
    }
}

impl BatchLimits {
    /// Returns `true` if `size` lies in `[min_batch_size, max_batch_size]`.
    #[must_use]
    pub const fn accepts(&self, size: usize) -> bool {
        size >= self.min_batch_size && size <= self.max_batch_size
    }

    /// Checks the limits are self-consistent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] describing the first problem.
    pub fn validate(&self) -> crate::Result<()> {
        if self.min_batch_size == 0 {
            return Err(crate::Error::InvalidInput(
                "min_batch_size must be at least 1".to_string(),
            ));
        }
        if self.min_batch_size > self.max_batch_size {
            return Err(crate::Error::InvalidInput(format!(
                "min_batch_size {} exceeds max_batch_size {}",
                self.min_batch_size, self.max_batch_size
            )));
        }
        if !self.accepts(self.default_batch_size) {
            return Err(crate::Error::InvalidInput(format!(
                "default_batch_size {} is outside [{}, {}]",
                self.default_batch_size, self.min_batch_size, self.max_batch_size
            )));
        }
        if self.delete_page_size == 0 {
            return Err(crate::Error::InvalidInput(
                "delete_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
