use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use super::paths::WorktreePaths;
use super::types::{AgentStatus, StatusEvent, StatusKind};
use crate::projects::WorktreeId;

/// One clearable status slot: a worktree plus the column or agent session
/// that reported it (empty for worktree-level reports).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClearScope {
    pub worktree: WorktreeId,
    pub sub_scope: String,
}

/// Timer work for the runtime. A `Schedule` replaces any earlier timer of
/// the same scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearEffect {
    Schedule {
        scope: ClearScope,
        ticket: u64,
        after: Duration,
    },
    Cancel {
        scope: ClearScope,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub worktree: WorktreeId,
    pub previous: AgentStatus,
    pub current: AgentStatus,
}

impl StatusUpdate {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Worst-wins status per worktree, fed by agent status reports.
///
/// `Done` decays to `Idle` after `clear_after` unless something newer
/// arrives first. Timers are not run here: scheduling decisions are queued
/// as [`ClearEffect`]s and a fired timer comes back through
/// [`fire_clear`](Self::fire_clear) with its ticket.
#[derive(Debug)]
pub struct StatusAggregator {
    paths: WorktreePaths,
    worktrees: HashMap<WorktreeId, HashMap<String, AgentStatus>>,
    pending: HashMap<ClearScope, u64>,
    next_ticket: u64,
    clear_after: Duration,
    version: u64,
    effects: Vec<ClearEffect>,
}

impl StatusAggregator {
    pub fn new(clear_after: Duration) -> Self {
        Self {
            paths: WorktreePaths::new(),
            worktrees: HashMap::new(),
            pending: HashMap::new(),
            next_ticket: 0,
            clear_after,
            version: 0,
            effects: Vec::new(),
        }
    }

    pub fn set_paths<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = (WorktreeId, PathBuf)>,
    {
        self.paths.set_paths(paths);
    }

    pub fn paths(&self) -> &WorktreePaths {
        &self.paths
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn clear_after(&self) -> Duration {
        self.clear_after
    }

    /// Aggregate of a worktree; `Idle` when nothing is known.
    pub fn aggregate(&self, worktree: &WorktreeId) -> AgentStatus {
        self.worktrees
            .get(worktree)
            .and_then(|scopes| scopes.values().copied().max())
            .unwrap_or_default()
    }

    /// Non-idle aggregates, sorted by worktree.
    pub fn statuses(&self) -> Vec<(WorktreeId, AgentStatus)> {
        let mut statuses: Vec<_> = self
            .worktrees
            .keys()
            .map(|w| (w.clone(), self.aggregate(w)))
            .filter(|(_, status)| *status != AgentStatus::Idle)
            .collect();
        statuses.sort();
        statuses
    }

    /// Drain queued timer work.
    pub fn take_effects(&mut self) -> Vec<ClearEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Apply a report. `None` when its cwd is not inside a known worktree.
    pub fn apply(&mut self, event: &StatusEvent) -> Option<StatusUpdate> {
        let Some(worktree) = self.paths.resolve(&event.cwd).cloned() else {
            debug!(
                event = "core.status.unresolved_cwd",
                cwd = %event.cwd.display(),
            );
            return None;
        };
        let sub_scope = event
            .column_id
            .clone()
            .or_else(|| event.session_id.clone())
            .unwrap_or_default();
        let scope = ClearScope {
            worktree: worktree.clone(),
            sub_scope,
        };
        let previous = self.aggregate(&worktree);

        self.cancel(&scope);
        match event.kind {
            StatusKind::Status(status) => {
                self.worktrees
                    .entry(worktree.clone())
                    .or_default()
                    .insert(scope.sub_scope.clone(), status);
                if status == AgentStatus::Done {
                    self.schedule(scope);
                }
            }
            StatusKind::SessionEnded => {
                if let Some(scopes) = self.worktrees.get_mut(&worktree) {
                    scopes.remove(&scope.sub_scope);
                    if scopes.is_empty() {
                        self.worktrees.remove(&worktree);
                    }
                }
            }
        }
        self.version += 1;

        let update = StatusUpdate {
            current: self.aggregate(&worktree),
            worktree,
            previous,
        };
        debug!(
            event = "core.status.apply_completed",
            worktree = %update.worktree,
            status = %event.kind.as_str(),
            aggregate = %update.current,
        );
        Some(update)
    }

    /// A clear timer fired. Demotes `Done` to `Idle` only if `ticket` is
    /// still the scope's current one.
    pub fn fire_clear(&mut self, scope: &ClearScope, ticket: u64) -> Option<StatusUpdate> {
        if self.pending.get(scope) != Some(&ticket) {
            debug!(
                event = "core.status.clear_stale",
                worktree = %scope.worktree,
                ticket = ticket,
            );
            return None;
        }
        self.pending.remove(scope);

        let previous = self.aggregate(&scope.worktree);
        let status = self
            .worktrees
            .get_mut(&scope.worktree)
            .and_then(|scopes| scopes.get_mut(&scope.sub_scope))?;
        if *status != AgentStatus::Done {
            return None;
        }
        *status = AgentStatus::Idle;
        self.version += 1;

        info!(
            event = "core.status.clear_fired",
            worktree = %scope.worktree,
            sub_scope = %scope.sub_scope,
        );
        Some(StatusUpdate {
            worktree: scope.worktree.clone(),
            previous,
            current: self.aggregate(&scope.worktree),
        })
    }

    /// An agent's terminal process died: anything still busy becomes `Done`.
    pub fn process_exited(&mut self, worktree: &WorktreeId) -> Option<StatusUpdate> {
        let previous = self.aggregate(worktree);
        let scopes = self.worktrees.get_mut(worktree)?;
        let mut demoted: Vec<String> = scopes
            .iter()
            .filter(|(_, status)| **status > AgentStatus::Done)
            .map(|(sub, _)| sub.clone())
            .collect();
        if demoted.is_empty() {
            return None;
        }
        demoted.sort();
        for sub in &demoted {
            scopes.insert(sub.clone(), AgentStatus::Done);
        }
        for sub in demoted {
            let scope = ClearScope {
                worktree: worktree.clone(),
                sub_scope: sub,
            };
            self.cancel(&scope);
            self.schedule(scope);
        }
        self.version += 1;
        Some(StatusUpdate {
            worktree: worktree.clone(),
            previous,
            current: self.aggregate(worktree),
        })
    }

    /// Cancel every pending clear of a worktree. Scopes still `Done` are
    /// cleared right away since no timer is left to do it.
    pub fn cancel_worktree(&mut self, worktree: &WorktreeId) -> Option<StatusUpdate> {
        let mut scopes: Vec<ClearScope> = self
            .pending
            .keys()
            .filter(|s| &s.worktree == worktree)
            .cloned()
            .collect();
        if scopes.is_empty() {
            return None;
        }
        scopes.sort();

        let previous = self.aggregate(worktree);
        let mut cleared = false;
        for scope in scopes {
            self.cancel(&scope);
            if let Some(status) = self
                .worktrees
                .get_mut(worktree)
                .and_then(|subs| subs.get_mut(&scope.sub_scope))
                && *status == AgentStatus::Done
            {
                *status = AgentStatus::Idle;
                cleared = true;
            }
        }
        if !cleared {
            return None;
        }
        self.version += 1;
        debug!(event = "core.status.clears_cancelled", worktree = %worktree);
        Some(StatusUpdate {
            worktree: worktree.clone(),
            previous,
            current: self.aggregate(worktree),
        })
    }

    /// Forget a worktree entirely (it left the catalog).
    pub fn remove_worktree(&mut self, worktree: &WorktreeId) -> bool {
        self.cancel_worktree(worktree);
        let removed = self.worktrees.remove(worktree).is_some();
        if removed {
            self.version += 1;
        }
        removed
    }

    fn schedule(&mut self, scope: ClearScope) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.pending.insert(scope.clone(), ticket);
        self.effects.push(ClearEffect::Schedule {
            scope,
            ticket,
            after: self.clear_after,
        });
    }

    fn cancel(&mut self, scope: &ClearScope) {
        if self.pending.remove(scope).is_some() {
            self.effects.push(ClearEffect::Cancel {
                scope: scope.clone(),
            });
        }
    }
}
