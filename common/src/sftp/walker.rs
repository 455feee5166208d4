// Depth-first traversal of a remote directory tree

use crate::errors::RemoteError;
use crate::models::WalkEntry;

/// Type and size of a directory entry, without following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    pub is_dir: bool,
    pub size: u64,
}

/// The two remote calls a traversal needs
pub trait DirectoryReader {
    fn lstat(&self, path: &str) -> Result<EntryStat, RemoteError>;

    /// Children of `path` as full paths, without `.` and `..`
    fn read_dir(&self, path: &str) -> Result<Vec<(String, EntryStat)>, RemoteError>;
}

enum Pending {
    Root(String),
    Entry(String, EntryStat),
}

/// Iterator over every entry below (and including) a root path.
///
/// Each directory is listed when it is visited and its children are visited
/// in lexical order. A failed `lstat` or listing yields one `Err` and prunes
/// only that subtree.
pub struct Walker<'a, R: ?Sized> {
    reader: &'a R,
    stack: Vec<Pending>,
}

impl<'a, R: DirectoryReader + ?Sized> Walker<'a, R> {
    pub fn new(reader: &'a R, root: &str) -> Self {
        Self {
            reader,
            stack: vec![Pending::Root(root.to_string())],
        }
    }
}

impl<R: DirectoryReader + ?Sized> Iterator for Walker<'_, R> {
    type Item = Result<WalkEntry, RemoteError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (path, stat) = match self.stack.pop()? {
            Pending::Root(path) => match self.reader.lstat(&path) {
                Ok(stat) => (path, stat),
                Err(e) => return Some(Err(e)),
            },
            Pending::Entry(path, stat) => (path, stat),
        };

        if !stat.is_dir {
            return Some(Ok(WalkEntry::file(path, stat.size)));
        }

        match self.reader.read_dir(&path) {
            Ok(mut children) => {
                // Reverse order so that pop() visits them ascending
                children.sort_by(|a, b| b.0.cmp(&a.0));
                self.stack.extend(
                    children
                        .into_iter()
                        .map(|(child, stat)| Pending::Entry(child, stat)),
                );
                Some(Ok(WalkEntry::dir(path)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::collections::{BTreeMap, HashSet};

    /// In-memory tree used by traversal and collector tests
    #[derive(Debug, Clone, Default)]
    pub struct MemoryTree {
        entries: BTreeMap<String, EntryStat>,
        unreadable: HashSet<String>,
    }

    impl MemoryTree {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn dir(mut self, path: &str) -> Self {
            self.entries.insert(
                path.to_string(),
                EntryStat {
                    is_dir: true,
                    size: 0,
                },
            );
            self
        }

        pub fn file(mut self, path: &str, size: u64) -> Self {
            self.entries.insert(
                path.to_string(),
                EntryStat {
                    is_dir: false,
                    size,
                },
            );
            self
        }

        /// Listing or stat-ing this path fails
        pub fn unreadable(mut self, path: &str) -> Self {
            self.unreadable.insert(path.to_string());
            self
        }

        fn parent(path: &str) -> &str {
            match path.rfind('/') {
                Some(0) => "/",
                Some(idx) => &path[..idx],
                None => "",
            }
        }
    }

    impl DirectoryReader for MemoryTree {
        fn lstat(&self, path: &str) -> Result<EntryStat, RemoteError> {
            if self.unreadable.contains(path) {
                return Err(RemoteError::walk(path, "permission denied"));
            }
            self.entries
                .get(path)
                .copied()
                .ok_or_else(|| RemoteError::walk(path, "no such file"))
        }

        fn read_dir(&self, path: &str) -> Result<Vec<(String, EntryStat)>, RemoteError> {
            if self.unreadable.contains(path) {
                return Err(RemoteError::walk(path, "permission denied"));
            }
            Ok(self
                .entries
                .iter()
                .filter(|(p, _)| p.as_str() != path && Self::parent(p) == path)
                .map(|(p, s)| (p.clone(), *s))
                .collect())
        }
    }
}
