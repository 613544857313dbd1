use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ProjectConfig;

/// Stable identity of a project (usually derived from the repository path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identity of a worktree: the unit of scoping for sessions and status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorktreeId(String);

impl WorktreeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorktreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorktreeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A checked-out working copy of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worktree {
    pub id: WorktreeId,
    pub path: PathBuf,
    pub branch: String,
}

impl Worktree {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            id: WorktreeId::new(id),
            path: path.into(),
            branch: branch.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub repo_path: PathBuf,
    pub worktrees: Vec<Worktree>,
    #[serde(default)]
    pub config: ProjectConfig,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, repo_path: impl Into<PathBuf>) -> Self {
        Self {
            id: ProjectId::new(id),
            name: name.into(),
            repo_path: repo_path.into(),
            worktrees: Vec::new(),
            config: ProjectConfig::default(),
        }
    }

    pub fn with_worktree(mut self, worktree: Worktree) -> Self {
        self.worktrees.push(worktree);
        self
    }

    pub fn with_config(mut self, config: ProjectConfig) -> Self {
        self.config = config;
        self
    }

    pub fn worktree(&self, id: &WorktreeId) -> Option<&Worktree> {
        self.worktrees.iter().find(|w| &w.id == id)
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.worktrees.iter().any(|w| path.starts_with(&w.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_as_inner_string() {
        assert_eq!(WorktreeId::new("app/main").to_string(), "app/main");
        assert_eq!(ProjectId::new("app").to_string(), "app");
    }

    #[test]
    fn test_worktree_id_serializes_transparently() {
        let id = WorktreeId::new("app/feature");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"app/feature\"");
    }

    #[test]
    fn test_project_lookup() {
        let project = Project::new("app", "App", "/src/app")
            .with_worktree(Worktree::new("app/main", "/src/app", "main"))
            .with_worktree(Worktree::new("app/feat", "/src/app-feat", "feat"));

        assert_eq!(
            project.worktree(&WorktreeId::new("app/feat")).unwrap().branch,
            "feat"
        );
        assert!(project.worktree(&WorktreeId::new("other")).is_none());
        assert!(project.contains_path(Path::new("/src/app-feat/src")));
        assert!(!project.contains_path(Path::new("/src/other")));
    }
}
