//! Directory tree traversal state shared by the filesystem engines.
//!
//! A [`TreeWalk`] carries the visitor that receives every listed entry,
//! the recursion bound, the set of directories already entered and the
//! number of subtrees that could not be listed.

use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Default bound on directory nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// The kind of a listed directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
    Symlink,
    VolumeLabel,
    Other,
}

/// One entry reported during a directory walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Nesting level, 0 for entries of the root directory.
    pub depth: usize,
    pub name: String,
    pub kind: NodeKind,
    /// Size in bytes as recorded in the entry's metadata, when known.
    pub size: u64,
}

impl TreeNode {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// Renders the node as one line of the tree listing.
impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            write!(f, "│   ")?;
        }
        write!(f, "├── {}", self.name)
    }
}

/// Reasons for refusing to descend into a directory.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WalkError {
    #[error("directory nesting exceeds {0} levels")]
    TooDeep(usize),
    #[error("directory at {0} is reached a second time")]
    Revisited(u64),
}

/// Mutable state of one directory walk.
pub struct TreeWalk<'a> {
    visit: &'a mut dyn FnMut(&TreeNode),
    max_depth: usize,
    visited: HashSet<u64>,
    failures: usize,
}

impl<'a> TreeWalk<'a> {
    pub fn new(max_depth: usize, visit: &'a mut dyn FnMut(&TreeNode)) -> Self {
        Self {
            visit,
            max_depth,
            visited: HashSet::new(),
            failures: 0,
        }
    }

    /// Reports an entry to the visitor.
    pub fn emit(&mut self, node: TreeNode) {
        (self.visit)(&node);
    }

    /// Registers the directory identified by `key` (an inode number or a
    /// first cluster) before listing it at `depth`.
    ///
    /// # Errors
    /// - `WalkError::TooDeep` if `depth` is beyond the configured bound.
    /// - `WalkError::Revisited` if the directory was already entered.
    pub fn enter(&mut self, key: u64, depth: usize) -> Result<(), WalkError> {
        if depth > self.max_depth {
            return Err(WalkError::TooDeep(self.max_depth));
        }
        if !self.visited.insert(key) {
            return Err(WalkError::Revisited(key));
        }
        Ok(())
    }

    /// Counts a subtree that could not be listed.
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn failures(&self) -> usize {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_rejects_revisit() {
        let mut visit = |_: &TreeNode| {};
        let mut walk = TreeWalk::new(4, &mut visit);
        assert!(walk.enter(2, 0).is_ok());
        assert_eq!(walk.enter(2, 1), Err(WalkError::Revisited(2)));
    }

    #[test]
    fn test_enter_rejects_depth() {
        let mut visit = |_: &TreeNode| {};
        let mut walk = TreeWalk::new(1, &mut visit);
        assert!(walk.enter(7, 1).is_ok());
        assert_eq!(walk.enter(8, 2), Err(WalkError::TooDeep(1)));
    }

    #[test]
    fn test_node_line() {
        let node = TreeNode {
            depth: 2,
            name: "NOTES.TXT".to_string(),
            kind: NodeKind::File,
            size: 3,
        };
        assert_eq!(node.to_string(), "│   │   ├── NOTES.TXT");
    }
}
