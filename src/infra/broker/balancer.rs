//! Partition selection by bytes written.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Sends each record to the partition that has received the fewest
/// payload bytes so far. Ties go to the lowest partition id.
#[derive(Debug, Default)]
pub struct LeastBytes {
    written: Mutex<HashMap<i32, u64>>,
}

impl LeastBytes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose a partition for a record of `size` bytes and account for it.
    ///
    /// Returns `None` when `partitions` is empty.
    pub fn balance(&self, size: usize, partitions: &[i32]) -> Option<i32> {
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);

        // Partitions that disappeared from metadata stop counting
        written.retain(|partition, _| partitions.contains(partition));

        let chosen = partitions
            .iter()
            .copied()
            .min_by_key(|partition| (written.get(partition).copied().unwrap_or(0), *partition))?;

        *written.entry(chosen).or_insert(0) += size as u64;
        Some(chosen)
    }

    /// Bytes accounted to `partition` so far
    pub fn bytes_written(&self, partition: i32) -> u64 {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&partition)
            .copied()
            .unwrap_or(0)
    }
}
