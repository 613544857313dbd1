use std::path::PathBuf;

use tracing::info;

use super::errors::ProjectError;
use super::types::{Project, ProjectId, Worktree, WorktreeId};

/// In-memory catalog of known projects and their worktrees.
///
/// Answers the structural questions the session core needs: which project a
/// worktree belongs to, which worktrees are its siblings, and where it lives
/// on disk. Persistence is owned by the embedding application.
#[derive(Debug, Clone, Default)]
pub struct ProjectCatalog {
    projects: Vec<Project>,
}

impl ProjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, project: Project) -> Result<(), ProjectError> {
        if self.projects.iter().any(|p| p.id == project.id) {
            return Err(ProjectError::AlreadyExists {
                id: project.id.to_string(),
            });
        }
        for worktree in &project.worktrees {
            if let Some(owner) = self.project_of(&worktree.id) {
                return Err(ProjectError::WorktreeAlreadyRegistered {
                    id: worktree.id.to_string(),
                    project: owner.id.to_string(),
                });
            }
        }

        info!(
            event = "core.projects.add_completed",
            project_id = %project.id,
            worktree_count = project.worktrees.len()
        );
        self.projects.push(project);
        Ok(())
    }

    pub fn remove(&mut self, id: &ProjectId) -> Result<Project, ProjectError> {
        let index = self
            .projects
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| ProjectError::NotFound { id: id.to_string() })?;
        Ok(self.projects.remove(index))
    }

    pub fn add_worktree(&mut self, project: &ProjectId, worktree: Worktree) -> Result<(), ProjectError> {
        if let Some(owner) = self.project_of(&worktree.id) {
            return Err(ProjectError::WorktreeAlreadyRegistered {
                id: worktree.id.to_string(),
                project: owner.id.to_string(),
            });
        }
        let target = self
            .projects
            .iter_mut()
            .find(|p| &p.id == project)
            .ok_or_else(|| ProjectError::NotFound {
                id: project.to_string(),
            })?;
        target.worktrees.push(worktree);
        Ok(())
    }

    pub fn remove_worktree(&mut self, worktree: &WorktreeId) -> Option<Worktree> {
        for project in &mut self.projects {
            if let Some(index) = project.worktrees.iter().position(|w| &w.id == worktree) {
                return Some(project.worktrees.remove(index));
            }
        }
        None
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| &p.id == id)
    }

    pub fn project_of(&self, worktree: &WorktreeId) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.worktrees.iter().any(|w| &w.id == worktree))
    }

    pub fn worktree(&self, id: &WorktreeId) -> Option<&Worktree> {
        self.projects.iter().find_map(|p| p.worktree(id))
    }

    /// Other worktrees of the same project, in catalog order.
    pub fn siblings(&self, worktree: &WorktreeId) -> Vec<&Worktree> {
        match self.project_of(worktree) {
            Some(project) => project
                .worktrees
                .iter()
                .filter(|w| &w.id != worktree)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every registered worktree path, used to build the status lookup table.
    pub fn worktree_paths(&self) -> Vec<(WorktreeId, PathBuf)> {
        self.projects
            .iter()
            .flat_map(|p| p.worktrees.iter())
            .map(|w| (w.id.clone(), w.path.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ProjectCatalog {
        let mut catalog = ProjectCatalog::new();
        catalog
            .add(
                Project::new("app", "App", "/src/app")
                    .with_worktree(Worktree::new("app/main", "/src/app", "main"))
                    .with_worktree(Worktree::new("app/a", "/wt/app-a", "a"))
                    .with_worktree(Worktree::new("app/b", "/wt/app-b", "b")),
            )
            .unwrap();
        catalog
            .add(
                Project::new("lib", "Lib", "/src/lib")
                    .with_worktree(Worktree::new("lib/main", "/src/lib", "main")),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_siblings_exclude_self_and_other_projects() {
        let catalog = catalog();
        let siblings: Vec<&str> = catalog
            .siblings(&WorktreeId::new("app/a"))
            .iter()
            .map(|w| w.id.as_str())
            .collect();
        assert_eq!(siblings, vec!["app/main", "app/b"]);
        assert!(catalog.siblings(&WorktreeId::new("lib/main")).is_empty());
        assert!(catalog.siblings(&WorktreeId::new("unknown")).is_empty());
    }

    #[test]
    fn test_duplicate_project_rejected() {
        let mut catalog = catalog();
        let err = catalog
            .add(Project::new("app", "Again", "/elsewhere"))
            .unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists { .. }));
    }

    #[test]
    fn test_worktree_cannot_belong_to_two_projects() {
        let mut catalog = catalog();
        let err = catalog
            .add_worktree(
                &ProjectId::new("lib"),
                Worktree::new("app/a", "/wt/dup", "dup"),
            )
            .unwrap_err();
        assert!(matches!(err, ProjectError::WorktreeAlreadyRegistered { .. }));
    }

    #[test]
    fn test_add_and_remove_worktree() {
        let mut catalog = catalog();
        catalog
            .add_worktree(&ProjectId::new("lib"), Worktree::new("lib/x", "/wt/lib-x", "x"))
            .unwrap();
        assert_eq!(catalog.siblings(&WorktreeId::new("lib/main")).len(), 1);
        let removed = catalog.remove_worktree(&WorktreeId::new("lib/x")).unwrap();
        assert_eq!(removed.branch, "x");
        assert!(catalog.worktree(&WorktreeId::new("lib/x")).is_none());
    }

    #[test]
    fn test_worktree_paths() {
        let catalog = catalog();
        let paths = catalog.worktree_paths();
        assert_eq!(paths.len(), 4);
        assert!(paths.contains(&(WorktreeId::new("app/b"), PathBuf::from("/wt/app-b"))));
    }
}
