/// Run-time configuration of an [`ArrayStore`](super::ArrayStore).
#[derive(Debug, Clone)]
pub struct ArrayStoreConfig {
    /// Per-record reads selecting more than this many records return a lazy,
    /// restartable sequence instead of a materialized vector.
    pub lazy_read_threshold: usize,
    /// Records fetched per pager round trip while a lazy sequence is consumed.
    pub lazy_batch_size: usize,
}

impl Default for ArrayStoreConfig {
    fn default() -> Self {
        Self {
            lazy_read_threshold: 10_000,
            lazy_batch_size: 256,
        }
    }
}

impl ArrayStoreConfig {
    pub fn with_lazy_read_threshold(mut self, threshold: usize) -> Self {
        self.lazy_read_threshold = threshold;
        self
    }

    pub fn with_lazy_batch_size(mut self, batch: usize) -> Self {
        self.lazy_batch_size = batch.max(1);
        self
    }
}
