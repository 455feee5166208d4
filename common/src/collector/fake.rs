// In-memory session for collector tests

use crate::errors::RemoteError;
use crate::models::{FsCapacity, WalkEntry};
use crate::sftp::{MemoryTree, RemoteSession, Walker};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct FakeSession {
    tree: MemoryTree,
    capacities: HashMap<String, FsCapacity>,
    closed: Arc<AtomicUsize>,
    panic_on_walk: bool,
}

impl FakeSession {
    pub fn new(tree: MemoryTree) -> Self {
        Self {
            tree,
            capacities: HashMap::new(),
            closed: Arc::new(AtomicUsize::new(0)),
            panic_on_walk: false,
        }
    }

    /// Capacity queries for paths not registered here fail
    pub fn with_capacity(mut self, path: &str, capacity: FsCapacity) -> Self {
        self.capacities.insert(path.to_string(), capacity);
        self
    }

    pub fn with_close_counter(mut self, closed: Arc<AtomicUsize>) -> Self {
        self.closed = closed;
        self
    }

    pub fn panicking_on_walk(mut self) -> Self {
        self.panic_on_walk = true;
        self
    }
}

impl RemoteSession for FakeSession {
    fn capacity(&self, path: &str) -> Result<FsCapacity, RemoteError> {
        self.capacities
            .get(path)
            .copied()
            .ok_or_else(|| RemoteError::capacity(path, "statvfs not supported"))
    }

    fn walk<'a>(
        &'a self,
        root: &str,
    ) -> Box<dyn Iterator<Item = Result<WalkEntry, RemoteError>> + 'a> {
        if self.panic_on_walk {
            panic!("walk failed for {}", root);
        }
        Box::new(Walker::new(&self.tree, root))
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
