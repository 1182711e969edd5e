// Process-wide handle to the current index

use std::sync::Arc;

use parking_lot::RwLock;

use super::Index;

/// Holds the index visible to queries.
///
/// Readers take an `Arc` snapshot and query it without holding the lock, so a
/// replacement never disturbs an in-flight query: it sees either the old or
/// the new index in full.
#[derive(Debug)]
pub struct SharedIndex {
    current: RwLock<Arc<Index>>,
}

impl SharedIndex {
    pub fn new(index: Index) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn snapshot(&self) -> Arc<Index> {
        Arc::clone(&self.current.read())
    }

    /// Swap in a freshly built index, returning the previous one.
    pub fn replace(&self, index: Index) -> Arc<Index> {
        let mut guard = self.current.write();
        std::mem::replace(&mut *guard, Arc::new(index))
    }
}
