//! Cross-worktree runner conflicts.
//!
//! Sibling worktrees of one project usually run the same dev servers on the
//! same ports, so launching in one while another is live needs a decision.

use serde::Serialize;
use tracing::info;

use super::backend::ProcessBackend;
use super::registry::SessionRegistry;
use super::runners::RunnerSelection;
use super::types::{Session, SessionId, SessionKind};
use crate::projects::{ProjectCatalog, WorktreeId};

/// A sibling worktree that has running runners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub worktree: WorktreeId,
    pub running: Vec<SessionId>,
    /// Ports observed on the sibling's running runners.
    pub ports: Vec<u16>,
}

/// A launch held back by a conflict.
///
/// Only [`check_launch`] produces one, so confirming a switch always refers
/// to a conflict that was actually detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingLaunch {
    worktree: WorktreeId,
    selection: PendingSelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum PendingSelection {
    Defaults,
    Named(String),
    All,
}

impl PendingLaunch {
    pub fn worktree(&self) -> &WorktreeId {
        &self.worktree
    }

    pub fn selection(&self) -> RunnerSelection {
        match &self.selection {
            PendingSelection::Defaults => RunnerSelection::Defaults,
            PendingSelection::Named(name) => RunnerSelection::Named(name.clone()),
            PendingSelection::All => RunnerSelection::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchDecision {
    Proceed,
    Conflict {
        conflict: Conflict,
        configured_ports: Vec<u16>,
        pending: PendingLaunch,
    },
}

/// The first sibling (catalog order) with a running runner, if any.
pub fn find_conflict<B: ProcessBackend>(
    catalog: &ProjectCatalog,
    registry: &SessionRegistry<B>,
    worktree: &WorktreeId,
) -> Option<Conflict> {
    catalog.siblings(worktree).into_iter().find_map(|sibling| {
        let running = registry.running_runners(&sibling.id);
        if running.is_empty() {
            return None;
        }
        let mut ports: Vec<u16> = running
            .iter()
            .flat_map(|s| s.listening_ports.iter().copied())
            .collect();
        ports.sort_unstable();
        ports.dedup();
        Some(Conflict {
            worktree: sibling.id.clone(),
            running: running.iter().map(|s| s.id.clone()).collect(),
            ports,
        })
    })
}

/// Configured ports of the worktree's project, for the conflict prompt.
pub fn conflicting_ports(catalog: &ProjectCatalog, worktree: &WorktreeId) -> Vec<u16> {
    catalog
        .project_of(worktree)
        .map(|p| p.config.configured_ports())
        .unwrap_or_default()
}

pub fn check_launch<B: ProcessBackend>(
    catalog: &ProjectCatalog,
    registry: &SessionRegistry<B>,
    worktree: &WorktreeId,
    selection: &RunnerSelection,
) -> LaunchDecision {
    match find_conflict(catalog, registry, worktree) {
        None => LaunchDecision::Proceed,
        Some(conflict) => {
            info!(
                event = "core.runners.conflict_detected",
                worktree = %worktree,
                sibling = %conflict.worktree,
                running = conflict.running.len(),
            );
            LaunchDecision::Conflict {
                configured_ports: conflicting_ports(catalog, worktree),
                pending: PendingLaunch {
                    worktree: worktree.clone(),
                    selection: match selection {
                        RunnerSelection::Defaults => PendingSelection::Defaults,
                        RunnerSelection::Named(name) => PendingSelection::Named(name.clone()),
                        RunnerSelection::All => PendingSelection::All,
                    },
                },
                conflict,
            }
        }
    }
}

/// Stop and remove every runner session on every sibling worktree.
pub fn remove_sibling_runners<B: ProcessBackend>(
    catalog: &ProjectCatalog,
    registry: &mut SessionRegistry<B>,
    worktree: &WorktreeId,
) -> Vec<Session> {
    let siblings: Vec<WorktreeId> = catalog
        .siblings(worktree)
        .iter()
        .map(|w| w.id.clone())
        .collect();
    let removed = registry
        .remove_group(|s| s.kind == SessionKind::Runner && siblings.contains(&s.worktree));
    info!(
        event = "core.runners.siblings_cleared",
        worktree = %worktree,
        removed = removed.len(),
    );
    removed
}
