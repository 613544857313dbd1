use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::config::WtmuxConfig;
use crate::layout::{
    ColumnId, DragPayload, DropIntent, DropTarget, DropZone, LayoutTree, PaneId, Point,
    Reconciler, Size, WindowId, resolve_drop, zone,
};
use crate::projects::{Project, ProjectCatalog, ProjectId, Worktree, WorktreeId};
use crate::sessions::conflicts::{check_launch, remove_sibling_runners};
use crate::sessions::runners::plan_launch;
use crate::sessions::{
    LaunchDecision, NewSession, PendingLaunch, ProcessBackend, ProcessExit, RunnerSelection,
    Session, SessionError, SessionId, SessionKind, SessionRegistry, StartOutcome, TabScope,
};
use crate::state::errors::DispatchError;
use crate::state::events::{Event, StateSnapshot};
use crate::state::store::Store;
use crate::state::types::Command;
use crate::status::{ClearEffect, ClearScope, RawStatusEvent, StatusAggregator, StatusUpdate};

/// What a live pane is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneAttachment {
    /// Tab group the pane displays; `None` while the pane is unbound.
    pub scope: Option<TabScope>,
}

/// The single owner of all mutable app state.
///
/// Commands come in through [`Store::dispatch`]; process exits, port
/// observations, status events and clear timers come in through the
/// `handle_*` methods. Every change bumps [`AppStore::version`].
pub struct AppStore<B: ProcessBackend> {
    config: WtmuxConfig,
    catalog: ProjectCatalog,
    registry: SessionRegistry<B>,
    layout: LayoutTree,
    aggregator: StatusAggregator,
    attachments: Reconciler<PaneId, PaneAttachment>,
    tab_counters: HashMap<TabScope, u32>,
    version: u64,
}

impl<B: ProcessBackend> AppStore<B> {
    pub fn new(config: WtmuxConfig, backend: B) -> Self {
        let layout = LayoutTree::new(config.layout.max_columns());
        let aggregator = StatusAggregator::new(config.status.done_clear_after());
        Self {
            config,
            catalog: ProjectCatalog::new(),
            registry: SessionRegistry::new(backend),
            layout,
            aggregator,
            attachments: Reconciler::new(),
            tab_counters: HashMap::new(),
            version: 0,
        }
    }

    pub fn config(&self) -> &WtmuxConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ProjectCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &SessionRegistry<B> {
        &self.registry
    }

    pub fn layout(&self) -> &LayoutTree {
        &self.layout
    }

    pub fn aggregator(&self) -> &StatusAggregator {
        &self.aggregator
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.registry.backend_mut()
    }

    pub fn attachment(&self, pane: PaneId) -> Option<&PaneAttachment> {
        self.attachments.get(&pane)
    }

    /// Monotonic change counter for pull-based consumers.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let mut sessions: Vec<Session> = self.registry.sessions().cloned().collect();
        sessions.sort_by(|a, b| a.id.cmp(&b.id));
        StateSnapshot {
            version: self.version,
            windows: self.layout.windows().to_vec(),
            focused: self.layout.focused(),
            sessions,
            statuses: self.aggregator.statuses(),
        }
    }

    // --- runtime notifications ---

    pub fn handle_process_exit(&mut self, exit: ProcessExit) -> Vec<Event> {
        let Some((kind, worktree, had_ports)) = self.registry.get(&exit.session_id).map(|s| {
            (
                s.kind,
                s.worktree.clone(),
                !s.listening_ports.is_empty(),
            )
        }) else {
            debug!(event = "core.state.exit_unknown", session_id = %exit.session_id);
            return Vec::new();
        };
        let Some(state) =
            self.registry
                .handle_process_exit(&exit.session_id, exit.run, exit.exit_code)
        else {
            return Vec::new();
        };

        let mut events = vec![Event::SessionExited {
            id: exit.session_id.clone(),
            state,
            exit_code: exit.exit_code,
        }];
        if had_ports {
            events.push(Event::PortsChanged {
                id: exit.session_id,
                ports: Vec::new(),
            });
        }
        // Agents run inside terminal tabs.
        if kind == SessionKind::Tab {
            events.extend(status_event(self.aggregator.process_exited(&worktree)));
        }
        self.commit(events)
    }

    /// Merge ports observed for a run of a session.
    pub fn handle_ports(&mut self, id: &SessionId, run: u64, ports: &[u16]) -> Vec<Event> {
        if !self.registry.update_ports(id, run, ports) {
            return Vec::new();
        }
        let ports = self.registry.get(id).map(Session::ports).unwrap_or_default();
        debug!(event = "core.state.ports_changed", session_id = %id, ports = ?ports);
        self.commit(vec![Event::PortsChanged {
            id: id.clone(),
            ports,
        }])
    }

    pub fn handle_status(&mut self, raw: RawStatusEvent) -> Vec<Event> {
        let status = raw.status.clone();
        let Some(event) = raw.into_event() else {
            debug!(event = "core.state.status_ignored", status = %status);
            return Vec::new();
        };
        let update = self.aggregator.apply(&event);
        let events = status_event(update).into_iter().collect();
        self.commit(events)
    }

    pub fn handle_clear(&mut self, scope: &ClearScope, ticket: u64) -> Vec<Event> {
        let update = self.aggregator.fire_clear(scope, ticket);
        let events = status_event(update).into_iter().collect();
        self.commit(events)
    }

    /// Timer work requested by the aggregator since the last call.
    pub fn take_clear_effects(&mut self) -> Vec<ClearEffect> {
        self.aggregator.take_effects()
    }

    /// Panes bound to a known worktree, with the worktree's path.
    pub fn changed_files_targets(&self) -> Vec<(PaneId, PathBuf)> {
        self.layout
            .panes()
            .filter_map(|pane| {
                let worktree = self.catalog.worktree(pane.worktree()?)?;
                Some((pane.id(), worktree.path.clone()))
            })
            .collect()
    }

    pub fn handle_changed_files(&mut self, pane: PaneId, count: Option<usize>) -> Vec<Event> {
        match self.layout.pane(pane) {
            Some(p) if p.changed_files() != count => {}
            _ => return Vec::new(),
        }
        self.layout.set_changed_files(pane, count);
        self.commit(vec![Event::ChangedFilesUpdated { pane, count }])
    }

    /// Running sessions with their run and pid, for port scans.
    pub fn running_pids(&self) -> Vec<(SessionId, u64, u32)> {
        self.registry.running_pids()
    }

    /// Terminate every running session. Returns how many were signalled.
    pub fn shutdown(&mut self) -> usize {
        let stopped = self.registry.stop_all();
        info!(event = "core.state.shutdown_completed", stopped = stopped);
        stopped
    }

    fn commit(&mut self, events: Vec<Event>) -> Vec<Event> {
        if !events.is_empty() {
            self.version += 1;
        }
        events
    }

    // --- projects ---

    fn register_project(&mut self, project: Project) -> Result<Vec<Event>, DispatchError> {
        let id = project.id.clone();
        self.catalog.add(project)?;
        self.refresh_paths();
        info!(event = "core.state.project_registered", project_id = %id);
        let mut events = vec![Event::ProjectRegistered { id }];
        // Panes may already show worktrees of this project.
        events.extend(self.sync_layout());
        Ok(events)
    }

    fn remove_project(&mut self, id: ProjectId) -> Result<Vec<Event>, DispatchError> {
        let project = self.catalog.remove(&id)?;
        let mut events = Vec::new();
        for worktree in &project.worktrees {
            events.extend(self.drop_worktree(&worktree.id));
        }
        self.refresh_paths();
        events.push(Event::ProjectRemoved { id });
        Ok(events)
    }

    fn add_worktree(
        &mut self,
        project: ProjectId,
        worktree: Worktree,
    ) -> Result<Vec<Event>, DispatchError> {
        let id = worktree.id.clone();
        self.catalog.add_worktree(&project, worktree)?;
        self.refresh_paths();
        Ok(vec![Event::WorktreeAdded { worktree: id }])
    }

    fn remove_worktree(&mut self, worktree: WorktreeId) -> Vec<Event> {
        if self.catalog.remove_worktree(&worktree).is_none() {
            debug!(event = "core.state.remove_worktree_unknown", worktree = %worktree);
            return Vec::new();
        }
        let mut events = self.drop_worktree(&worktree);
        self.refresh_paths();
        events.push(Event::WorktreeRemoved { worktree });
        events
    }

    /// Remove everything attached to a worktree that left the catalog.
    fn drop_worktree(&mut self, worktree: &WorktreeId) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .registry
            .remove_group(|s| &s.worktree == worktree)
            .into_iter()
            .map(|s| Event::SessionRemoved { id: s.id })
            .collect();
        self.tab_counters.retain(|scope, _| scope.worktree() != worktree);

        if self.aggregator.remove_worktree(worktree) {
            events.push(Event::StatusChanged {
                worktree: worktree.clone(),
                status: Default::default(),
            });
        }

        let bound: Vec<PaneId> = self
            .layout
            .panes()
            .filter(|p| p.worktree() == Some(worktree))
            .map(|p| p.id())
            .collect();
        for pane in bound {
            self.layout.assign_worktree(pane, None);
            if let Some(attachment) = self.attachments.get_mut(&pane) {
                attachment.scope = None;
            }
            events.push(Event::PaneAssigned {
                pane,
                worktree: None,
            });
        }
        events
    }

    fn refresh_paths(&mut self) {
        self.aggregator.set_paths(self.catalog.worktree_paths());
    }

    // --- tabs and sessions ---

    /// Open a terminal tab in the pane's worktree and make it active.
    fn open_tab(&mut self, pane: PaneId) -> Result<Vec<Event>, DispatchError> {
        let Some(scope) = pane_scope(&self.layout, pane) else {
            debug!(event = "core.state.open_tab_unbound", pane_id = %pane);
            return Ok(Vec::new());
        };
        let worktree_id = scope.worktree().clone();
        let Some(worktree) = self.catalog.worktree(&worktree_id) else {
            warn!(event = "core.state.open_tab_unknown_worktree", worktree = %worktree_id);
            return Ok(Vec::new());
        };
        let working_dir = worktree.path.clone();
        let start_command = self
            .catalog
            .project_of(&worktree_id)
            .and_then(|p| p.config.terminal_start_command.clone());

        let n = self.next_tab_number(&scope, pane);
        let mut new = NewSession::tab(&worktree_id, pane, n, working_dir)
            .with_command(start_command)
            .with_env("WTMUX_WORKTREE", worktree_id.as_str());
        if let Some(position) = self.layout.position(pane) {
            new = new.with_env("WTMUX_COLUMN_ID", position.column.to_string());
        }
        let id = new.id.clone();

        let mut events = created_events(self.registry.create(new)?);
        self.registry.set_active(&id);
        events.push(self.sync_active_tab(&scope));
        Ok(events)
    }

    /// Tab numbers are never reused within a scope.
    fn next_tab_number(&mut self, scope: &TabScope, pane: PaneId) -> u32 {
        let counter = self.tab_counters.entry(scope.clone()).or_insert(0);
        loop {
            *counter += 1;
            if !self
                .registry
                .contains(&SessionId::tab(scope.worktree(), pane, *counter))
            {
                return *counter;
            }
        }
    }

    fn start_session(&mut self, id: SessionId) -> Result<Vec<Event>, DispatchError> {
        match self.registry.start(&id)? {
            StartOutcome::Started { run, pid } => Ok(vec![Event::SessionStarted { id, run, pid }]),
            StartOutcome::AlreadyRunning | StartOutcome::Unknown => Ok(Vec::new()),
        }
    }

    fn restart_session(&mut self, id: SessionId) -> Result<Vec<Event>, DispatchError> {
        match self.registry.restart(&id)? {
            StartOutcome::Started { run, .. } => Ok(vec![Event::SessionRestarted { id, run }]),
            StartOutcome::AlreadyRunning | StartOutcome::Unknown => Ok(Vec::new()),
        }
    }

    fn close_session(&mut self, id: SessionId) -> Vec<Event> {
        let Some(session) = self.registry.remove(&id) else {
            debug!(event = "core.state.close_session_unknown", session_id = %id);
            return Vec::new();
        };
        let mut events = vec![Event::SessionRemoved { id }];
        events.push(self.sync_active_tab(&session.scope));
        events
    }

    fn rename_session(&mut self, id: SessionId, title: String) -> Result<Vec<Event>, DispatchError> {
        match self.registry.rename(&id, &title) {
            Ok(()) => {}
            Err(SessionError::NotFound { .. }) => {
                debug!(event = "core.state.rename_session_unknown", session_id = %id);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        }
        let title = self
            .registry
            .get(&id)
            .map(|s| s.title.clone())
            .unwrap_or(title);
        Ok(vec![Event::SessionRenamed { id, title }])
    }

    fn move_tab(&mut self, id: SessionId, to_index: usize) -> Vec<Event> {
        if !self.registry.move_tab(&id, to_index) {
            return Vec::new();
        }
        match self.registry.get(&id) {
            Some(session) => vec![Event::TabsReordered {
                scope: session.scope.clone(),
            }],
            None => Vec::new(),
        }
    }

    fn select_tab(&mut self, id: SessionId) -> Vec<Event> {
        if !self.registry.set_active(&id) {
            debug!(event = "core.state.select_tab_unknown", session_id = %id);
            return Vec::new();
        }
        match self.registry.get(&id).map(|s| s.scope.clone()) {
            Some(scope) => vec![self.sync_active_tab(&scope)],
            None => Vec::new(),
        }
    }

    /// Mirror the registry's active tab of `scope` into the pane showing it.
    fn sync_active_tab(&mut self, scope: &TabScope) -> Event {
        let active = self.registry.active(scope).cloned();
        if let TabScope::Pane { pane, worktree } = scope
            && self
                .layout
                .pane(*pane)
                .is_some_and(|p| p.worktree() == Some(worktree))
        {
            self.layout.set_active_tab(*pane, active.clone());
        }
        Event::ActiveTabChanged {
            scope: scope.clone(),
            id: active,
        }
    }

    // --- runners ---

    fn launch(
        &mut self,
        worktree: WorktreeId,
        selection: RunnerSelection,
    ) -> Result<Vec<Event>, DispatchError> {
        if self.catalog.worktree(&worktree).is_none() {
            warn!(event = "core.state.launch_unknown_worktree", worktree = %worktree);
            return Ok(Vec::new());
        }
        match check_launch(&self.catalog, &self.registry, &worktree, &selection) {
            LaunchDecision::Proceed => self.launch_runners(&worktree, &selection),
            LaunchDecision::Conflict {
                conflict,
                configured_ports,
                pending,
            } => Ok(vec![Event::LaunchConflict {
                conflict,
                configured_ports,
                pending,
            }]),
        }
    }

    /// Remove the siblings' runners, then perform the held-back launch.
    pub fn resolve_and_switch(
        &mut self,
        pending: PendingLaunch,
    ) -> Result<Vec<Event>, DispatchError> {
        let worktree = pending.worktree().clone();
        let siblings: Vec<WorktreeId> = self
            .catalog
            .siblings(&worktree)
            .iter()
            .map(|w| w.id.clone())
            .collect();

        let removed = remove_sibling_runners(&self.catalog, &mut self.registry, &worktree);
        let cleared: Vec<Event> = siblings
            .iter()
            .filter_map(|sibling| status_event(self.aggregator.cancel_worktree(sibling)))
            .collect();

        let removed: Vec<SessionId> = removed.into_iter().map(|s| s.id).collect();
        let mut events: Vec<Event> = removed
            .iter()
            .map(|id| Event::SessionRemoved { id: id.clone() })
            .collect();
        events.push(Event::SiblingRunnersCleared {
            worktree: worktree.clone(),
            removed,
        });
        events.extend(cleared);
        events.extend(self.launch_runners(&worktree, &pending.selection())?);
        Ok(events)
    }

    /// Create or start runner sessions in display order.
    fn launch_runners(
        &mut self,
        worktree: &WorktreeId,
        selection: &RunnerSelection,
    ) -> Result<Vec<Event>, DispatchError> {
        let Some(worktree) = self.catalog.worktree(worktree).cloned() else {
            return Ok(Vec::new());
        };
        let configs = self
            .catalog
            .project_of(&worktree.id)
            .map(|p| p.config.run_configurations.clone())
            .unwrap_or_default();

        let mut events = Vec::new();
        let mut started = Vec::new();
        for (index, plan) in plan_launch(&worktree, &configs, selection)
            .into_iter()
            .enumerate()
        {
            let id = plan.new.id.clone();
            if self.registry.contains(&id) {
                if plan.start {
                    match self.registry.start(&id) {
                        Ok(StartOutcome::Started { run, pid }) => {
                            events.push(Event::SessionStarted {
                                id: id.clone(),
                                run,
                                pid,
                            });
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(event = "core.state.runner_start_failed", session_id = %id, error = %e);
                            events.push(Event::SessionFailedToStart {
                                id: id.clone(),
                                message: e.to_string(),
                            });
                        }
                    }
                }
            } else {
                events.extend(created_events(self.registry.create(plan.new)?));
            }
            self.registry.move_tab(&id, index);
            if self.registry.get(&id).is_some_and(Session::is_running) && plan.start {
                started.push(id);
            }
        }

        info!(
            event = "core.state.runners_launched",
            worktree = %worktree.id,
            started = started.len(),
        );
        events.push(Event::RunnersLaunched {
            worktree: worktree.id,
            started,
        });
        Ok(events)
    }

    fn stop_runners(&mut self, worktree: WorktreeId) -> Vec<Event> {
        let running: Vec<SessionId> = self
            .registry
            .running_runners(&worktree)
            .iter()
            .map(|s| s.id.clone())
            .collect();
        running
            .into_iter()
            .filter_map(|id| match self.registry.stop(&id) {
                Ok(true) => Some(Event::SessionStopRequested { id }),
                Ok(false) => None,
                Err(e) => {
                    warn!(event = "core.state.runner_stop_failed", session_id = %id, error = %e);
                    None
                }
            })
            .collect()
    }

    fn run_setup(&mut self, pane: PaneId) -> Result<Vec<Event>, DispatchError> {
        let Some(scope) = pane_scope(&self.layout, pane) else {
            debug!(event = "core.state.setup_unbound", pane_id = %pane);
            return Ok(Vec::new());
        };
        let worktree_id = scope.worktree().clone();
        let Some(worktree) = self.catalog.worktree(&worktree_id).cloned() else {
            return Ok(Vec::new());
        };
        let Some(command) = self
            .catalog
            .project_of(&worktree_id)
            .and_then(|p| p.config.setup_command_line())
        else {
            info!(event = "core.state.setup_skipped", worktree = %worktree_id);
            return Ok(Vec::new());
        };

        let id = SessionId::setup(&worktree_id);
        if self.registry.contains(&id) {
            return self.restart_session(id);
        }
        let new = NewSession::setup(&worktree_id, pane, command, worktree.path);
        let mut events = created_events(self.registry.create(new)?);
        self.registry.set_active(&id);
        events.push(self.sync_active_tab(&scope));
        Ok(events)
    }

    // --- layout ---

    /// Reconcile pane attachments after a structural edit.
    fn sync_layout(&mut self) -> Vec<Event> {
        let layout = &self.layout;
        let diff = self.attachments.sync(
            layout.pane_ids(),
            |pane| PaneAttachment {
                scope: pane_scope(layout, *pane),
            },
            |pane, _| debug!(event = "core.state.pane_detached", pane_id = %pane),
        );

        let mut events = vec![Event::LayoutChanged {
            added: diff.added,
            removed: diff.removed,
        }];
        for pane in self.layout.pane_ids() {
            events.extend(self.attach(pane));
        }
        events
    }

    /// Point a pane's attachment at its current scope, opening the first
    /// tab of a scope that has none.
    fn attach(&mut self, pane: PaneId) -> Vec<Event> {
        let scope = pane_scope(&self.layout, pane);
        if let Some(attachment) = self.attachments.get_mut(&pane) {
            attachment.scope = scope.clone();
        }
        let Some(scope) = scope else {
            return Vec::new();
        };

        if self.registry.sessions_in(&scope).is_empty() {
            return match self.open_tab(pane) {
                Ok(events) => events,
                Err(e) => {
                    warn!(event = "core.state.first_tab_failed", pane_id = %pane, error = %e);
                    Vec::new()
                }
            };
        }

        let active = self.registry.active(&scope);
        let shown = self.layout.pane(pane).and_then(|p| p.active_tab());
        if active == shown {
            return Vec::new();
        }
        vec![self.sync_active_tab(&scope)]
    }

    fn add_column(
        &mut self,
        window: WindowId,
        worktree: Option<WorktreeId>,
        after: Option<ColumnId>,
    ) -> Vec<Event> {
        match self.layout.add_column(window, worktree, after) {
            Some(_) => self.sync_layout(),
            None => Vec::new(),
        }
    }

    fn assign_worktree(&mut self, pane: PaneId, worktree: Option<WorktreeId>) -> Vec<Event> {
        match self.layout.assign_worktree(pane, worktree.clone()) {
            Some(previous) if previous != worktree => {
                let mut events = vec![Event::PaneAssigned { pane, worktree }];
                events.extend(self.sync_layout());
                events
            }
            _ => Vec::new(),
        }
    }

    fn close_pane(&mut self, pane: PaneId, stop_sessions: bool) -> Vec<Event> {
        if self.layout.remove_pane(pane).is_none() {
            debug!(event = "core.state.close_pane_unknown", pane_id = %pane);
            return Vec::new();
        }
        let mut events = Vec::new();
        if stop_sessions {
            events.extend(self.remove_pane_sessions(&[pane]));
        }
        events.extend(self.sync_layout());
        events
    }

    fn close_column(&mut self, column: ColumnId, stop_sessions: bool) -> Vec<Event> {
        let Some(panes) = self.layout.remove_column(column) else {
            debug!(event = "core.state.close_column_unknown", column_id = %column);
            return Vec::new();
        };
        let ids: Vec<PaneId> = panes.iter().map(|p| p.id()).collect();
        let mut events = Vec::new();
        if stop_sessions {
            events.extend(self.remove_pane_sessions(&ids));
        }
        events.extend(self.sync_layout());
        events
    }

    fn remove_pane_sessions(&mut self, panes: &[PaneId]) -> Vec<Event> {
        self.tab_counters
            .retain(|scope, _| scope.pane().is_none_or(|p| !panes.contains(&p)));
        self.registry
            .remove_group(|s| s.scope.pane().is_some_and(|p| panes.contains(&p)))
            .into_iter()
            .map(|s| Event::SessionRemoved { id: s.id })
            .collect()
    }

    fn column_changed(&mut self, column: ColumnId, changed: bool) -> Vec<Event> {
        if changed {
            vec![Event::ColumnChanged { column }]
        } else {
            Vec::new()
        }
    }

    fn hover_drop(&mut self, pane: PaneId, pointer: Point, bounds: Size) -> Vec<Event> {
        if self.layout.pane(pane).is_none() {
            return Vec::new();
        }
        let zone = zone(pointer, bounds);
        if self.layout.pane(pane).is_some_and(|p| p.drop_zone() == zone) {
            return Vec::new();
        }
        self.layout.clear_drop_zones();
        self.layout.set_drop_zone(pane, zone);
        vec![Event::DropHint {
            pane: Some(pane),
            zone,
        }]
    }

    fn cancel_drag(&mut self) -> Vec<Event> {
        if self.layout.panes().all(|p| p.drop_zone() == DropZone::None) {
            return Vec::new();
        }
        self.layout.clear_drop_zones();
        vec![Event::DropHint {
            pane: None,
            zone: DropZone::None,
        }]
    }

    fn drop(
        &mut self,
        target: DropTarget,
        pointer: Point,
        bounds: Size,
        payload: DragPayload,
    ) -> Vec<Event> {
        let zone = zone(pointer, bounds);
        let intent = resolve_drop(&self.layout, target, zone, &payload);
        let mut events = self.cancel_drag();
        if intent == DropIntent::Nothing {
            return events;
        }
        let Some(focus) = self.layout.apply_drop(&intent) else {
            debug!(event = "core.state.drop_refused", intent = ?intent);
            return events;
        };
        events.push(Event::DropApplied { intent });
        events.extend(self.sync_layout());
        if self.layout.focus_pane(focus) {
            events.push(Event::PaneFocused { pane: focus });
        }
        events
    }

    fn execute(&mut self, cmd: Command) -> Result<Vec<Event>, DispatchError> {
        match cmd {
            Command::RegisterProject { project } => self.register_project(project),
            Command::RemoveProject { id } => self.remove_project(id),
            Command::AddWorktree { project, worktree } => self.add_worktree(project, worktree),
            Command::RemoveWorktree { worktree } => Ok(self.remove_worktree(worktree)),

            Command::OpenTab { pane } => self.open_tab(pane),
            Command::StartSession { id } => self.start_session(id),
            Command::StopSession { id } => Ok(if self.registry.stop(&id)? {
                vec![Event::SessionStopRequested { id }]
            } else {
                Vec::new()
            }),
            Command::RestartSession { id } => self.restart_session(id),
            Command::ResetSession { id } => Ok(if self.registry.reset(&id) {
                vec![Event::SessionReset { id }]
            } else {
                Vec::new()
            }),
            Command::CloseSession { id } => Ok(self.close_session(id)),
            Command::RenameSession { id, title } => self.rename_session(id, title),
            Command::MoveTab { id, to_index } => Ok(self.move_tab(id, to_index)),
            Command::SelectTab { id } => Ok(self.select_tab(id)),

            Command::LaunchRunners {
                worktree,
                selection,
            } => self.launch(worktree, selection),
            Command::ConfirmSwitch { pending } => self.resolve_and_switch(pending),
            Command::StopRunners { worktree } => Ok(self.stop_runners(worktree)),
            Command::RunSetup { pane } => self.run_setup(pane),

            Command::AddWindow { worktree } => {
                self.layout.add_window(worktree);
                Ok(self.sync_layout())
            }
            Command::AddColumn {
                window,
                worktree,
                after,
            } => Ok(self.add_column(window, worktree, after)),
            Command::SplitPane { pane } => Ok(match self.layout.split_pane(pane) {
                Some(_) => self.sync_layout(),
                None => Vec::new(),
            }),
            Command::AssignWorktree { pane, worktree } => Ok(self.assign_worktree(pane, worktree)),
            Command::MovePane {
                pane,
                column,
                index,
            } => Ok(if self.layout.move_pane(pane, column, index) {
                self.sync_layout()
            } else {
                Vec::new()
            }),
            Command::ClosePane {
                pane,
                stop_sessions,
            } => Ok(self.close_pane(pane, stop_sessions)),
            Command::CloseColumn {
                column,
                stop_sessions,
            } => Ok(self.close_column(column, stop_sessions)),
            Command::MinimizeColumn { column } => {
                let changed = self.layout.minimize_column(column);
                Ok(self.column_changed(column, changed))
            }
            Command::RestoreColumn { column } => {
                let changed = self.layout.restore_column(column);
                Ok(self.column_changed(column, changed))
            }
            Command::ToggleSidePanel { column } => {
                let changed = self.layout.toggle_side_panel(column).is_some();
                Ok(self.column_changed(column, changed))
            }
            Command::ToggleRunnerPanel { column } => {
                let changed = self.layout.toggle_runner_panel(column).is_some();
                Ok(self.column_changed(column, changed))
            }
            Command::FocusPane { pane } => Ok(if self.layout.focus_pane(pane) {
                vec![Event::PaneFocused { pane }]
            } else {
                Vec::new()
            }),

            Command::HoverDrop {
                pane,
                pointer,
                bounds,
            } => Ok(self.hover_drop(pane, pointer, bounds)),
            Command::Drop {
                target,
                pointer,
                bounds,
                payload,
            } => Ok(self.drop(target, pointer, bounds, payload)),
            Command::CancelDrag => Ok(self.cancel_drag()),

            Command::Snapshot => Ok(vec![Event::Snapshot(Box::new(self.snapshot()))]),
        }
    }
}

impl<B: ProcessBackend> Store for AppStore<B> {
    type Error = DispatchError;

    fn dispatch(&mut self, cmd: Command) -> Result<Vec<Event>, DispatchError> {
        debug!(event = "core.state.dispatch_started", command = ?cmd);

        let snapshot = matches!(cmd, Command::Snapshot);
        let result = self.execute(cmd);

        match &result {
            Ok(events) => {
                if !events.is_empty() && !snapshot {
                    self.version += 1;
                }
                debug!(
                    event = "core.state.dispatch_completed",
                    event_count = events.len(),
                    version = self.version,
                )
            }
            Err(e) => error!(event = "core.state.dispatch_failed", error = %e),
        }

        result
    }
}

fn pane_scope(layout: &LayoutTree, pane: PaneId) -> Option<TabScope> {
    let worktree = layout.pane(pane)?.worktree()?.clone();
    Some(TabScope::Pane { pane, worktree })
}

fn created_events(session: &Session) -> Vec<Event> {
    let mut events = vec![Event::SessionCreated {
        id: session.id.clone(),
        kind: session.kind,
        title: session.title.clone(),
        state: session.state,
    }];
    if session.is_running() {
        events.push(Event::SessionStarted {
            id: session.id.clone(),
            run: session.run,
            pid: session.pid,
        });
    } else if let Some(message) = &session.last_error {
        events.push(Event::SessionFailedToStart {
            id: session.id.clone(),
            message: message.clone(),
        });
    }
    events
}

fn status_event(update: Option<StatusUpdate>) -> Option<Event> {
    update.filter(StatusUpdate::changed).map(|u| Event::StatusChanged {
        worktree: u.worktree,
        status: u.current,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProjectConfig, RunConfiguration};
    use crate::sessions::{SessionError, SessionState};
    use crate::sessions::backend::test_helpers::FakeBackend;
    use crate::status::AgentStatus;

    fn project() -> Project {
        let config = ProjectConfig {
            run_configurations: vec![
                RunConfiguration::new("web", "npm run dev")
                    .with_auto_start(true)
                    .with_port(3000),
                RunConfiguration::new("storybook", "npm run storybook"),
            ],
            setup_commands: vec!["npm install".to_string()],
            terminal_start_command: Some("claude".to_string()),
            ..Default::default()
        };
        Project::new("app", "app", "/src/app")
            .with_worktree(Worktree::new("main", "/src/app", "main"))
            .with_worktree(Worktree::new("feat", "/src/app-feat", "feat"))
            .with_config(config)
    }

    fn store() -> AppStore<FakeBackend> {
        let mut store = AppStore::new(WtmuxConfig::default(), FakeBackend::new());
        store
            .dispatch(Command::RegisterProject { project: project() })
            .unwrap();
        store
    }

    fn wt(id: &str) -> WorktreeId {
        WorktreeId::new(id)
    }

    fn first_pane(store: &AppStore<FakeBackend>) -> PaneId {
        store.layout().pane_ids()[0]
    }

    fn store_with_pane(worktree: &str) -> (AppStore<FakeBackend>, PaneId) {
        let mut store = store();
        let window = store.layout().windows()[0].id();
        store
            .dispatch(Command::AddColumn {
                window,
                worktree: Some(wt(worktree)),
                after: None,
            })
            .unwrap();
        let pane = first_pane(&store);
        (store, pane)
    }

    #[test]
    fn test_bound_pane_gets_first_tab_with_start_command() {
        let (store, pane) = store_with_pane("main");

        let scope = TabScope::Pane {
            pane,
            worktree: wt("main"),
        };
        let tabs = store.registry().sessions_in(&scope);
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].title, "Terminal");
        assert_eq!(tabs[0].command.as_deref(), Some("claude"));
        assert_eq!(tabs[0].state, SessionState::Running);
        assert_eq!(
            store.layout().pane(pane).unwrap().active_tab(),
            Some(&tabs[0].id)
        );
        assert!(
            tabs[0]
                .env
                .iter()
                .any(|(k, _)| k == "WTMUX_COLUMN_ID")
        );
    }

    #[test]
    fn test_open_tab_numbers_and_titles_are_unique() {
        let (mut store, pane) = store_with_pane("main");
        store.dispatch(Command::OpenTab { pane }).unwrap();

        let scope = TabScope::Pane {
            pane,
            worktree: wt("main"),
        };
        let titles: Vec<String> = store
            .registry()
            .sessions_in(&scope)
            .iter()
            .map(|s| s.title.clone())
            .collect();
        assert_eq!(titles, vec!["Terminal", "Terminal 2"]);
        let second = SessionId::tab(&wt("main"), pane, 2);
        assert_eq!(store.registry().active(&scope), Some(&second));
    }

    #[test]
    fn test_split_keeps_existing_attachment() {
        let (mut store, pane) = store_with_pane("main");
        let before = store.attachment(pane).cloned();

        let events = store.dispatch(Command::SplitPane { pane }).unwrap();
        let new_pane = match &events[0] {
            Event::LayoutChanged { added, removed } => {
                assert!(removed.is_empty());
                added[0]
            }
            other => panic!("unexpected event: {other:?}"),
        };

        assert_eq!(store.attachment(pane).cloned(), before);
        assert_ne!(new_pane, pane);
        let scope = TabScope::Pane {
            pane: new_pane,
            worktree: wt("main"),
        };
        assert_eq!(store.registry().sessions_in(&scope).len(), 1);
    }

    #[test]
    fn test_launch_in_sibling_reports_conflict_then_switches() {
        let (mut store, _) = store_with_pane("main");
        store
            .dispatch(Command::LaunchRunners {
                worktree: wt("main"),
                selection: RunnerSelection::Defaults,
            })
            .unwrap();
        let main_web = SessionId::runner(&wt("main"), "web");
        assert!(store.registry().get(&main_web).unwrap().is_running());

        let events = store
            .dispatch(Command::LaunchRunners {
                worktree: wt("feat"),
                selection: RunnerSelection::Defaults,
            })
            .unwrap();
        let pending = match &events[..] {
            [
                Event::LaunchConflict {
                    conflict,
                    configured_ports,
                    pending,
                },
            ] => {
                assert_eq!(conflict.worktree, wt("main"));
                assert_eq!(configured_ports, &vec![3000]);
                pending.clone()
            }
            other => panic!("unexpected events: {other:?}"),
        };
        assert!(
            store
                .registry()
                .get(&SessionId::runner(&wt("feat"), "web"))
                .is_none()
        );

        store.dispatch(Command::ConfirmSwitch { pending }).unwrap();
        assert!(store.registry().get(&main_web).is_none());
        assert!(store.registry().runners_for(&wt("main")).is_empty());
        let feat_web = store
            .registry()
            .get(&SessionId::runner(&wt("feat"), "web"))
            .unwrap();
        assert!(feat_web.is_running());
        let storybook = store
            .registry()
            .get(&SessionId::runner(&wt("feat"), "storybook"))
            .unwrap();
        assert_eq!(storybook.state, SessionState::Idle);
    }

    #[test]
    fn test_stale_exit_is_ignored_and_current_exit_applies() {
        let mut store = store();
        store
            .dispatch(Command::LaunchRunners {
                worktree: wt("main"),
                selection: RunnerSelection::Defaults,
            })
            .unwrap();
        let id = SessionId::runner(&wt("main"), "web");
        store
            .dispatch(Command::RestartSession { id: id.clone() })
            .unwrap();
        assert_eq!(store.registry().get(&id).unwrap().run, 2);

        let stale = store.handle_process_exit(ProcessExit {
            session_id: id.clone(),
            run: 1,
            exit_code: 143,
        });
        assert!(stale.is_empty());
        assert!(store.registry().get(&id).unwrap().is_running());

        let events = store.handle_process_exit(ProcessExit {
            session_id: id.clone(),
            run: 2,
            exit_code: 1,
        });
        assert_eq!(
            events[0],
            Event::SessionExited {
                id: id.clone(),
                state: SessionState::Failed,
                exit_code: 1,
            }
        );
    }

    #[test]
    fn test_ports_cleared_on_exit() {
        let mut store = store();
        store
            .dispatch(Command::LaunchRunners {
                worktree: wt("main"),
                selection: RunnerSelection::Defaults,
            })
            .unwrap();
        let id = SessionId::runner(&wt("main"), "web");
        let events = store.handle_ports(&id, 1, &[3000, 3001]);
        assert_eq!(
            events,
            vec![Event::PortsChanged {
                id: id.clone(),
                ports: vec![3000, 3001],
            }]
        );
        assert!(store.handle_ports(&id, 1, &[3000]).is_empty());

        let events = store.handle_process_exit(ProcessExit {
            session_id: id.clone(),
            run: 1,
            exit_code: 0,
        });
        assert!(events.contains(&Event::PortsChanged {
            id: id.clone(),
            ports: vec![],
        }));
        assert!(store.registry().get(&id).unwrap().listening_ports.is_empty());
    }

    #[test]
    fn test_tab_exit_demotes_busy_agent_to_done() {
        let (mut store, pane) = store_with_pane("main");
        store.handle_status(RawStatusEvent {
            status: "working".to_string(),
            cwd: "/src/app".to_string(),
            session_id: None,
            column_id: None,
            timestamp: None,
        });
        assert_eq!(store.aggregator().aggregate(&wt("main")), AgentStatus::Working);

        let tab = SessionId::tab(&wt("main"), pane, 1);
        let events = store.handle_process_exit(ProcessExit {
            session_id: tab,
            run: 1,
            exit_code: 0,
        });
        assert!(events.contains(&Event::StatusChanged {
            worktree: wt("main"),
            status: AgentStatus::Done,
        }));
    }

    #[test]
    fn test_close_pane_with_stop_removes_its_sessions() {
        let (mut store, pane) = store_with_pane("main");
        let tab = SessionId::tab(&wt("main"), pane, 1);

        let events = store
            .dispatch(Command::ClosePane {
                pane,
                stop_sessions: true,
            })
            .unwrap();
        assert!(events.contains(&Event::SessionRemoved { id: tab.clone() }));
        assert!(store.registry().get(&tab).is_none());
        assert!(store.attachment(pane).is_none());
        assert_eq!(store.layout().windows().len(), 1);
        assert!(store.layout().windows()[0].columns().is_empty());
    }

    #[test]
    fn test_close_pane_without_stop_keeps_sessions() {
        let (mut store, pane) = store_with_pane("main");
        let tab = SessionId::tab(&wt("main"), pane, 1);
        store
            .dispatch(Command::ClosePane {
                pane,
                stop_sessions: false,
            })
            .unwrap();
        assert!(store.registry().get(&tab).is_some());
    }

    #[test]
    fn test_rename_collision_keeps_original_title() {
        let (mut store, pane) = store_with_pane("main");
        store.dispatch(Command::OpenTab { pane }).unwrap();
        let second = SessionId::tab(&wt("main"), pane, 2);

        let err = store
            .dispatch(Command::RenameSession {
                id: second.clone(),
                title: "Terminal".to_string(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Session(SessionError::TitleTaken { .. })
        ));
        assert_eq!(store.registry().get(&second).unwrap().title, "Terminal 2");
    }

    #[test]
    fn test_rename_unknown_session_is_ignored() {
        let (mut store, pane) = store_with_pane("main");
        let events = store
            .dispatch(Command::RenameSession {
                id: SessionId::tab(&wt("main"), pane, 9),
                title: "Server".to_string(),
            })
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_sidebar_drop_on_center_assigns_and_opens_tab() {
        let mut store = store();
        let window = store.layout().windows()[0].id();
        store
            .dispatch(Command::AddColumn {
                window,
                worktree: None,
                after: None,
            })
            .unwrap();
        let pane = first_pane(&store);
        assert!(store.registry().is_empty());

        let events = store
            .dispatch(Command::Drop {
                target: DropTarget::Pane(pane),
                pointer: Point { x: 50.0, y: 10.0 },
                bounds: Size {
                    width: 100.0,
                    height: 100.0,
                },
                payload: DragPayload {
                    worktree: wt("feat"),
                    source_pane: None,
                },
            })
            .unwrap();
        assert!(events.contains(&Event::PaneFocused { pane }));
        assert_eq!(
            store.layout().pane(pane).unwrap().worktree(),
            Some(&wt("feat"))
        );
        assert_eq!(
            store.attachment(pane).unwrap().scope,
            Some(TabScope::Pane {
                pane,
                worktree: wt("feat"),
            })
        );
        assert_eq!(store.registry().len(), 1);
    }

    #[test]
    fn test_hover_sets_single_drop_hint() {
        let (mut store, pane) = store_with_pane("main");
        let other = match &store.dispatch(Command::SplitPane { pane }).unwrap()[0] {
            Event::LayoutChanged { added, .. } => added[0],
            other => panic!("unexpected event: {other:?}"),
        };
        let bounds = Size {
            width: 100.0,
            height: 100.0,
        };
        store
            .dispatch(Command::HoverDrop {
                pane,
                pointer: Point { x: 10.0, y: 0.0 },
                bounds,
            })
            .unwrap();
        store
            .dispatch(Command::HoverDrop {
                pane: other,
                pointer: Point { x: 90.0, y: 0.0 },
                bounds,
            })
            .unwrap();
        assert_eq!(store.layout().pane(pane).unwrap().drop_zone(), DropZone::None);
        assert_eq!(store.layout().pane(other).unwrap().drop_zone(), DropZone::Right);

        store.dispatch(Command::CancelDrag).unwrap();
        assert_eq!(store.layout().pane(other).unwrap().drop_zone(), DropZone::None);
    }

    #[test]
    fn test_version_bumps_only_on_change() {
        let (mut store, _) = store_with_pane("main");
        let version = store.version();

        store.dispatch(Command::Snapshot).unwrap();
        assert_eq!(store.version(), version);

        store
            .dispatch(Command::StopRunners { worktree: wt("main") })
            .unwrap();
        assert_eq!(store.version(), version);

        store
            .dispatch(Command::LaunchRunners {
                worktree: wt("main"),
                selection: RunnerSelection::Defaults,
            })
            .unwrap();
        assert_eq!(store.version(), version + 1);
    }

    #[test]
    fn test_remove_worktree_unbinds_panes_and_removes_sessions() {
        let (mut store, pane) = store_with_pane("feat");
        let tab = SessionId::tab(&wt("feat"), pane, 1);

        let events = store
            .dispatch(Command::RemoveWorktree { worktree: wt("feat") })
            .unwrap();
        assert!(events.contains(&Event::SessionRemoved { id: tab.clone() }));
        assert!(events.contains(&Event::PaneAssigned {
            pane,
            worktree: None,
        }));
        assert_eq!(store.layout().pane(pane).unwrap().worktree(), None);
        assert!(store.catalog().worktree(&wt("feat")).is_none());
    }

    #[test]
    fn test_run_setup_creates_then_restarts() {
        let (mut store, pane) = store_with_pane("main");
        let id = SessionId::setup(&wt("main"));

        store.dispatch(Command::RunSetup { pane }).unwrap();
        let setup = store.registry().get(&id).unwrap();
        assert_eq!(setup.command.as_deref(), Some("npm install"));
        assert!(setup.is_running());

        let events = store.dispatch(Command::RunSetup { pane }).unwrap();
        assert_eq!(
            events,
            vec![Event::SessionRestarted {
                id: id.clone(),
                run: 2,
            }]
        );
    }

    #[test]
    fn test_unknown_ids_are_no_ops() {
        let mut store = store();
        let ghost = SessionId::from_raw("tab:main:pane-99:1");
        assert!(
            store
                .dispatch(Command::StartSession { id: ghost.clone() })
                .unwrap()
                .is_empty()
        );
        assert!(
            store
                .dispatch(Command::CloseSession { id: ghost })
                .unwrap()
                .is_empty()
        );
        assert!(
            store
                .dispatch(Command::FocusPane {
                    pane: PaneId::new(99),
                })
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_snapshot_lists_sessions_sorted() {
        let (mut store, _) = store_with_pane("main");
        store
            .dispatch(Command::LaunchRunners {
                worktree: wt("main"),
                selection: RunnerSelection::All,
            })
            .unwrap();
        let snapshot = store.snapshot();
        let ids: Vec<&str> = snapshot.sessions.iter().map(|s| s.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(snapshot.windows.len(), 1);
    }
}
