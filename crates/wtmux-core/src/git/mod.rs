//! Uncommitted-change counts for the pane header badge.

pub mod errors;

use std::path::Path;

use git2::{Repository, Status, StatusOptions};
use tracing::debug;

pub use errors::GitError;

/// Source of a worktree's changed-file count.
pub trait ChangedFiles: Send + Sync {
    fn changed_file_count(&self, path: &Path) -> Result<usize, GitError>;
}

/// `git status` via libgit2, untracked files included, ignored excluded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git2ChangedFiles;

impl ChangedFiles for Git2ChangedFiles {
    fn changed_file_count(&self, path: &Path) -> Result<usize, GitError> {
        let repo = Repository::open(path).map_err(|e| {
            debug!(event = "core.git.open_failed", path = %path.display(), error = %e);
            GitError::RepositoryNotFound {
                path: path.display().to_string(),
            }
        })?;

        let mut opts = StatusOptions::new();
        opts.include_untracked(true);
        opts.recurse_untracked_dirs(true);
        opts.include_ignored(false);

        let statuses = repo.statuses(Some(&mut opts))?;
        let count = statuses
            .iter()
            .filter(|entry| entry.status() != Status::CURRENT && !entry.status().contains(Status::IGNORED))
            .count();

        debug!(event = "core.git.changed_files_counted", path = %path.display(), count = count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo(dir: &Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        repo
    }

    fn commit_all(repo: &Repository) {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = repo.signature().unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
    }

    #[test]
    fn test_counts_modified_and_untracked() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        std::fs::write(dir.path().join("a.txt"), "one").unwrap();
        std::fs::write(dir.path().join("b.txt"), "one").unwrap();
        commit_all(&repo);

        assert_eq!(Git2ChangedFiles.changed_file_count(dir.path()).unwrap(), 0);

        std::fs::write(dir.path().join("a.txt"), "two").unwrap();
        std::fs::write(dir.path().join("new.txt"), "new").unwrap();
        assert_eq!(Git2ChangedFiles.changed_file_count(dir.path()).unwrap(), 2);
    }

    #[test]
    fn test_ignored_files_do_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        std::fs::write(dir.path().join(".gitignore"), "target/\n").unwrap();
        commit_all(&repo);

        std::fs::create_dir(dir.path().join("target")).unwrap();
        std::fs::write(dir.path().join("target").join("out"), "x").unwrap();
        assert_eq!(Git2ChangedFiles.changed_file_count(dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_not_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let result = Git2ChangedFiles.changed_file_count(dir.path());
        assert!(matches!(result, Err(GitError::RepositoryNotFound { .. })));
    }
}
