//! Path → worktree lookup for status events.

use std::path::{Path, PathBuf};

use crate::projects::WorktreeId;

/// Longest-prefix table of worktree roots.
///
/// Matching is per path component, so `/src/app-feat` never resolves to a
/// worktree at `/src/app`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreePaths {
    entries: Vec<(PathBuf, WorktreeId)>,
}

impl WorktreePaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole table.
    pub fn set_paths<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = (WorktreeId, PathBuf)>,
    {
        let mut entries: Vec<(PathBuf, WorktreeId)> =
            paths.into_iter().map(|(id, path)| (path, id)).collect();
        // Deepest roots first so the first hit is the longest prefix.
        entries.sort_by(|a, b| {
            b.0.components()
                .count()
                .cmp(&a.0.components().count())
                .then_with(|| a.0.cmp(&b.0))
        });
        self.entries = entries;
    }

    pub fn resolve(&self, path: &Path) -> Option<&WorktreeId> {
        self.entries
            .iter()
            .find(|(root, _)| path.starts_with(root))
            .map(|(_, id)| id)
    }

    pub fn path_of(&self, worktree: &WorktreeId) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(_, id)| id == worktree)
            .map(|(path, _)| path.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
