// Data shared between the SFTP layer and the stat collector

/// Raw reply of a capacity (`statvfs`) query, in fragment units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsCapacity {
    pub fragment_size: u64,
    pub total_blocks: u64,
    pub free_blocks: u64,
}

impl FsCapacity {
    pub fn total_space_bytes(&self) -> u64 {
        self.fragment_size.saturating_mul(self.total_blocks)
    }

    pub fn free_space_bytes(&self) -> u64 {
        self.fragment_size.saturating_mul(self.free_blocks)
    }
}

/// Capacity of the filesystem containing a configured path
#[derive(Debug, Clone, PartialEq)]
pub struct FilesystemStat {
    pub path: String,
    pub total_space_bytes: f64,
    pub free_space_bytes: f64,
}

impl FilesystemStat {
    pub fn from_capacity(path: impl Into<String>, capacity: FsCapacity) -> Self {
        Self {
            path: path.into(),
            total_space_bytes: capacity.total_space_bytes() as f64,
            free_space_bytes: capacity.free_space_bytes() as f64,
        }
    }
}

/// Number and total size of the non-directory objects below a path
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStat {
    pub path: String,
    pub object_count: f64,
    pub object_size_bytes: f64,
}

impl ObjectStat {
    pub fn new(path: impl Into<String>, totals: ObjectTotals) -> Self {
        Self {
            path: path.into(),
            object_count: totals.count as f64,
            object_size_bytes: totals.size as f64,
        }
    }
}

/// One entry yielded by a remote traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
}

impl WalkEntry {
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            size,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            size: 0,
        }
    }
}

/// Accumulated object count and byte size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectTotals {
    pub count: u64,
    pub size: u64,
}

impl ObjectTotals {
    pub fn add(&mut self, size: u64) {
        self.count += 1;
        self.size = self.size.saturating_add(size);
    }
}
