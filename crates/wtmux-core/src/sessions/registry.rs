use std::collections::{BTreeSet, HashMap};

use tracing::{debug, error, info, warn};

use super::backend::{ProcessBackend, SpawnRequest};
use super::errors::SessionError;
use super::types::{
    NewSession, Session, SessionId, SessionKind, SessionState, StartOutcome, TabScope,
};
use crate::projects::WorktreeId;

/// Owns every session and the process backend behind them.
///
/// All mutation goes through `&mut self`; the control loop is the only
/// owner, so no interior locking is needed.
pub struct SessionRegistry<B: ProcessBackend> {
    sessions: HashMap<SessionId, Session>,
    /// Tab order per scope.
    tabs: HashMap<TabScope, Vec<SessionId>>,
    active: HashMap<TabScope, SessionId>,
    backend: B,
}

impl<B: ProcessBackend> SessionRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            sessions: HashMap::new(),
            tabs: HashMap::new(),
            active: HashMap::new(),
            backend,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Register a session and, unless deferred, start it immediately.
    ///
    /// A spawn failure leaves the session registered in `Idle` with
    /// `last_error` set so it can be retried.
    pub fn create(&mut self, new: NewSession) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&new.id) {
            return Err(SessionError::AlreadyExists {
                id: new.id.to_string(),
            });
        }

        let base_title = new
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_title(&new));
        let title = self.unique_title(&new.scope, &base_title);

        // Setup commands always run at creation.
        let defer = new.defer_execution && new.kind != SessionKind::Setup;
        let id = new.id.clone();
        let worktree = new.worktree().clone();
        let session = Session {
            id: new.id,
            kind: new.kind,
            state: SessionState::Idle,
            worktree,
            scope: new.scope.clone(),
            title,
            command: new.command,
            working_dir: new.working_dir,
            env: new.env,
            defer_execution: defer,
            listening_ports: BTreeSet::new(),
            pid: None,
            run: 0,
            exit_code: None,
            last_error: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            started_at: None,
        };

        info!(
            event = "core.session.create_completed",
            session_id = %id,
            kind = %session.kind,
            deferred = defer,
        );

        self.sessions.insert(id.clone(), session);
        self.tabs.entry(new.scope.clone()).or_default().push(id.clone());
        self.active.entry(new.scope).or_insert_with(|| id.clone());

        if !defer && let Err(e) = self.start(&id) {
            warn!(
                event = "core.session.initial_start_failed",
                session_id = %id,
                error = %e,
            );
        }

        self.sessions.get(&id).ok_or_else(|| SessionError::NotFound {
            id: id.to_string(),
        })
    }

    /// Spawn a new run. Finished sessions are reset to idle first.
    pub fn start(&mut self, id: &SessionId) -> Result<StartOutcome, SessionError> {
        let Some(session) = self.sessions.get_mut(id) else {
            warn!(event = "core.session.start_unknown", session_id = %id);
            return Ok(StartOutcome::Unknown);
        };

        match session.state {
            SessionState::Running => return Ok(StartOutcome::AlreadyRunning),
            SessionState::Succeeded | SessionState::Failed => {
                transition(session, SessionState::Idle);
            }
            SessionState::Idle => {}
        }

        let run = session.run + 1;
        let request = SpawnRequest {
            session_id: id.clone(),
            run,
            command: session.command.clone(),
            interactive: session.kind == SessionKind::Tab,
            working_dir: session.working_dir.clone(),
            env: session.env.clone(),
        };

        match self.backend.spawn(request) {
            Ok(spawned) => {
                session.run = run;
                session.pid = spawned.pid;
                session.exit_code = None;
                session.last_error = None;
                session.listening_ports.clear();
                session.started_at = Some(chrono::Utc::now().to_rfc3339());
                transition(session, SessionState::Running);
                info!(
                    event = "core.session.start_completed",
                    session_id = %id,
                    run = run,
                    pid = ?spawned.pid,
                );
                Ok(StartOutcome::Started {
                    run,
                    pid: spawned.pid,
                })
            }
            Err(e) => {
                session.last_error = Some(e.to_string());
                error!(
                    event = "core.session.start_failed",
                    session_id = %id,
                    error = %e,
                );
                Err(e)
            }
        }
    }

    /// Request termination. The state changes only when the exit arrives.
    /// Returns `false` when there was nothing to stop.
    pub fn stop(&mut self, id: &SessionId) -> Result<bool, SessionError> {
        let Some(session) = self.sessions.get_mut(id) else {
            warn!(event = "core.session.stop_unknown", session_id = %id);
            return Ok(false);
        };
        if !session.is_running() {
            debug!(event = "core.session.stop_skipped", session_id = %id, state = %session.state);
            return Ok(false);
        }

        info!(event = "core.session.stop_started", session_id = %id, run = session.run);
        if let Err(e) = self.backend.terminate(id) {
            session.last_error = Some(e.to_string());
            return Err(e);
        }
        Ok(true)
    }

    /// Kill the current run, if any, and start a fresh one in place.
    ///
    /// If the current run cannot be killed the session is left untouched
    /// and the error is returned.
    ///
    /// The old run's exit notification is ignored because its run number
    /// no longer matches.
    pub fn restart(&mut self, id: &SessionId) -> Result<StartOutcome, SessionError> {
        let Some(session) = self.sessions.get_mut(id) else {
            warn!(event = "core.session.restart_unknown", session_id = %id);
            return Ok(StartOutcome::Unknown);
        };

        if session.is_running() {
            let old_run = session.run;
            if let Err(e) = self.backend.terminate(id) {
                warn!(
                    event = "core.session.restart_terminate_failed",
                    session_id = %id,
                    error = %e,
                );
                session.last_error = Some(e.to_string());
                return Err(e);
            }
            self.backend.release(id, old_run);
            session.pid = None;
            session.exit_code = None;
            session.listening_ports.clear();
            transition(session, SessionState::Failed);
            info!(event = "core.session.restart_killed", session_id = %id, run = old_run);
        }

        self.start(id)
    }

    /// Apply an exit notification. Returns the new state, or `None` when
    /// the notification was stale or for an unknown session.
    pub fn handle_process_exit(
        &mut self,
        id: &SessionId,
        run: u64,
        exit_code: i32,
    ) -> Option<SessionState> {
        let Some(session) = self.sessions.get_mut(id) else {
            debug!(event = "core.session.exit_unknown", session_id = %id, run = run);
            return None;
        };
        if session.run != run || !session.is_running() {
            debug!(
                event = "core.session.exit_stale",
                session_id = %id,
                run = run,
                current_run = session.run,
            );
            return None;
        }

        let next = SessionState::from_exit_code(exit_code);
        transition(session, next);
        session.exit_code = Some(exit_code);
        session.pid = None;
        session.listening_ports.clear();
        self.backend.release(id, run);

        info!(
            event = "core.session.exit_completed",
            session_id = %id,
            run = run,
            exit_code = exit_code,
            state = %next,
        );
        Some(next)
    }

    /// Return a finished session to idle without starting it.
    pub fn reset(&mut self, id: &SessionId) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) if session.state.is_terminal() => {
                transition(session, SessionState::Idle);
                session.exit_code = None;
                true
            }
            _ => false,
        }
    }

    /// Remove a session, terminating any live process.
    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let session = self.sessions.remove(id)?;
        if session.is_running()
            && let Err(e) = self.backend.terminate(id)
        {
            warn!(event = "core.session.remove_terminate_failed", session_id = %id, error = %e);
        }
        self.backend.forget(id);

        if let Some(order) = self.tabs.get_mut(&session.scope) {
            let position = order.iter().position(|t| t == id);
            order.retain(|t| t != id);
            if self.active.get(&session.scope) == Some(id) {
                // Neighbour to the left takes focus, else the new first tab.
                let next = position
                    .and_then(|p| order.get(p.saturating_sub(1)).or_else(|| order.first()))
                    .cloned();
                match next {
                    Some(next) => {
                        self.active.insert(session.scope.clone(), next);
                    }
                    None => {
                        self.active.remove(&session.scope);
                    }
                }
            }
            if order.is_empty() {
                self.tabs.remove(&session.scope);
            }
        }

        info!(event = "core.session.remove_completed", session_id = %id);
        Some(session)
    }

    /// Remove every session matching `predicate`.
    pub fn remove_group<F>(&mut self, predicate: F) -> Vec<Session>
    where
        F: Fn(&Session) -> bool,
    {
        let mut ids: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| predicate(s))
            .map(|s| s.id.clone())
            .collect();
        ids.sort();
        ids.iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Terminate every running session; used at shutdown.
    pub fn stop_all(&mut self) -> usize {
        let mut ids: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| s.is_running())
            .map(|s| s.id.clone())
            .collect();
        ids.sort();
        ids.iter()
            .filter(|id| match self.stop(id) {
                Ok(stopped) => stopped,
                Err(e) => {
                    warn!(event = "core.session.stop_all_failed", session_id = %id, error = %e);
                    false
                }
            })
            .count()
    }

    pub fn rename(&mut self, id: &SessionId, title: &str) -> Result<(), SessionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SessionError::InvalidTitle);
        }
        let scope = self
            .sessions
            .get(id)
            .map(|s| s.scope.clone())
            .ok_or_else(|| SessionError::NotFound { id: id.to_string() })?;
        if self
            .sessions_in(&scope)
            .iter()
            .any(|s| &s.id != id && s.title == title)
        {
            return Err(SessionError::TitleTaken {
                title: title.to_string(),
            });
        }
        if let Some(session) = self.sessions.get_mut(id) {
            session.title = title.to_string();
        }
        Ok(())
    }

    pub fn set_active(&mut self, id: &SessionId) -> bool {
        let Some(session) = self.sessions.get(id) else {
            return false;
        };
        self.active.insert(session.scope.clone(), id.clone());
        true
    }

    pub fn active(&self, scope: &TabScope) -> Option<&SessionId> {
        self.active.get(scope)
    }

    /// Move a tab to `to_index` within its own scope (clamped).
    pub fn move_tab(&mut self, id: &SessionId, to_index: usize) -> bool {
        let Some(scope) = self.sessions.get(id).map(|s| s.scope.clone()) else {
            return false;
        };
        let Some(order) = self.tabs.get_mut(&scope) else {
            return false;
        };
        let Some(from) = order.iter().position(|t| t == id) else {
            return false;
        };
        let tab = order.remove(from);
        let to = to_index.min(order.len());
        order.insert(to, tab);
        from != to
    }

    /// Merge newly observed ports into the current run. Stale runs and
    /// non-running sessions are ignored. Returns whether the set grew.
    pub fn update_ports(&mut self, id: &SessionId, run: u64, ports: &[u16]) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };
        if session.run != run || !session.is_running() {
            return false;
        }
        let before = session.listening_ports.len();
        session.listening_ports.extend(ports.iter().copied());
        session.listening_ports.len() != before
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Sessions of a scope in tab order.
    pub fn sessions_in(&self, scope: &TabScope) -> Vec<&Session> {
        self.tabs
            .get(scope)
            .map(|order| order.iter().filter_map(|id| self.sessions.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn runners_for(&self, worktree: &WorktreeId) -> Vec<&Session> {
        self.sessions_in(&TabScope::Runners(worktree.clone()))
    }

    pub fn running_runners(&self, worktree: &WorktreeId) -> Vec<&Session> {
        self.runners_for(worktree)
            .into_iter()
            .filter(|s| s.is_running())
            .collect()
    }

    /// `(id, run, pid)` of every running session with a known pid.
    pub fn running_pids(&self) -> Vec<(SessionId, u64, u32)> {
        let mut pids: Vec<_> = self
            .sessions
            .values()
            .filter(|s| s.is_running())
            .filter_map(|s| s.pid.map(|pid| (s.id.clone(), s.run, pid)))
            .collect();
        pids.sort();
        pids
    }

    /// Whether any session matching `predicate` has a live process.
    pub fn has_live_processes<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Session) -> bool,
    {
        self.sessions
            .values()
            .any(|s| s.is_running() && predicate(s))
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn unique_title(&self, scope: &TabScope, base: &str) -> String {
        let taken: Vec<&str> = self
            .sessions_in(scope)
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        if !taken.contains(&base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{} {}", base, n))
            .find(|candidate| !taken.contains(&candidate.as_str()))
            .unwrap_or_else(|| base.to_string())
    }
}

fn default_title(new: &NewSession) -> String {
    match new.kind {
        SessionKind::Tab => "Terminal".to_string(),
        SessionKind::Setup => "Setup".to_string(),
        SessionKind::Runner => new.command.clone().unwrap_or_else(|| "Runner".to_string()),
    }
}

fn transition(session: &mut Session, next: SessionState) {
    debug_assert!(
        session.state.can_transition_to(next),
        "illegal transition {} -> {}",
        session.state,
        next
    );
    debug!(
        event = "core.session.state_changed",
        session_id = %session.id,
        from = %session.state,
        to = %next,
    );
    session.state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PaneId;
    use crate::sessions::backend::test_helpers::FakeBackend;

    fn worktree() -> WorktreeId {
        WorktreeId::new("app/feat")
    }

    fn runner(name: &str, command: &str) -> NewSession {
        NewSession::runner(&worktree(), name, command, "/src/app-feat")
    }

    fn registry() -> (SessionRegistry<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::new();
        (SessionRegistry::new(backend.clone()), backend)
    }

    #[test]
    fn test_create_duplicate_id_fails() {
        let (mut registry, _) = registry();
        registry.create(runner("web", "npm run dev")).unwrap();
        let err = registry.create(runner("web", "npm run dev")).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_deferred_session_stays_idle() {
        let (mut registry, backend) = registry();
        let session = registry.create(runner("web", "npm run dev")).unwrap();
        assert_eq!(session.state, SessionState::Idle);
        assert_eq!(backend.spawn_count(&session.id), 0);
    }

    #[test]
    fn test_undeferred_session_starts_immediately() {
        let (mut registry, backend) = registry();
        let session = registry
            .create(runner("web", "npm run dev").deferred(false))
            .unwrap();
        assert_eq!(session.state, SessionState::Running);
        assert_eq!(session.run, 1);
        assert!(session.pid.is_some());
        assert_eq!(backend.spawn_count(&session.id), 1);
    }

    #[test]
    fn test_setup_runs_even_when_deferred() {
        let (mut registry, _) = registry();
        let new = NewSession::setup(&worktree(), PaneId::new(1), "npm install", "/src").deferred(true);
        let session = registry.create(new).unwrap();
        assert_eq!(session.state, SessionState::Running);
        assert!(!session.defer_execution);
    }

    #[test]
    fn test_spawn_failure_leaves_idle_with_error() {
        let (mut registry, backend) = registry();
        backend.fail_command("bad");
        let session = registry.create(runner("web", "bad").deferred(false)).unwrap();
        assert_eq!(session.state, SessionState::Idle);
        assert!(session.last_error.is_some());
        assert_eq!(session.run, 0);
    }

    #[test]
    fn test_start_twice_reports_already_running() {
        let (mut registry, backend) = registry();
        let id = registry.create(runner("web", "npm run dev")).unwrap().id.clone();
        assert!(matches!(registry.start(&id).unwrap(), StartOutcome::Started { run: 1, .. }));
        assert_eq!(registry.start(&id).unwrap(), StartOutcome::AlreadyRunning);
        assert_eq!(backend.spawn_count(&id), 1);
    }

    #[test]
    fn test_start_unknown_is_ignored() {
        let (mut registry, _) = registry();
        let outcome = registry.start(&SessionId::from_raw("runner:x:y")).unwrap();
        assert_eq!(outcome, StartOutcome::Unknown);
    }

    #[test]
    fn test_exit_code_decides_terminal_state() {
        let (mut registry, _) = registry();
        let ok = registry.create(runner("ok", "true").deferred(false)).unwrap().id.clone();
        let bad = registry.create(runner("bad", "false").deferred(false)).unwrap().id.clone();

        assert_eq!(registry.handle_process_exit(&ok, 1, 0), Some(SessionState::Succeeded));
        assert_eq!(registry.handle_process_exit(&bad, 1, 2), Some(SessionState::Failed));
        assert_eq!(registry.get(&bad).unwrap().exit_code, Some(2));
        assert_eq!(registry.get(&bad).unwrap().pid, None);
    }

    #[test]
    fn test_stop_waits_for_exit_notification() {
        let (mut registry, backend) = registry();
        let id = registry.create(runner("web", "npm run dev").deferred(false)).unwrap().id.clone();

        assert!(registry.stop(&id).unwrap());
        assert_eq!(backend.terminated(), vec![id.clone()]);
        assert_eq!(registry.get(&id).unwrap().state, SessionState::Running);

        registry.handle_process_exit(&id, 1, 143);
        assert_eq!(registry.get(&id).unwrap().state, SessionState::Failed);
        assert!(!registry.stop(&id).unwrap());
    }

    #[test]
    fn test_restart_ignores_stale_exit_of_previous_run() {
        let (mut registry, backend) = registry();
        let id = registry.create(runner("web", "npm run dev").deferred(false)).unwrap().id.clone();

        let outcome = registry.restart(&id).unwrap();
        assert!(matches!(outcome, StartOutcome::Started { run: 2, .. }));
        assert_eq!(backend.spawn_count(&id), 2);

        // The killed first run reports late; it must not touch run 2.
        assert_eq!(registry.handle_process_exit(&id, 1, 143), None);
        let session = registry.get(&id).unwrap();
        assert_eq!(session.state, SessionState::Running);
        assert_eq!(session.run, 2);
    }

    #[test]
    fn test_restart_keeps_current_run_when_kill_fails() {
        let (mut registry, backend) = registry();
        let id = registry.create(runner("web", "npm run dev").deferred(false)).unwrap().id.clone();
        backend.fail_terminate(&id);

        let err = registry.restart(&id).unwrap_err();
        assert!(matches!(err, SessionError::TerminateFailed { .. }));
        assert_eq!(backend.spawn_count(&id), 1);
        let session = registry.get(&id).unwrap();
        assert_eq!(session.state, SessionState::Running);
        assert_eq!(session.run, 1);
        assert!(session.pid.is_some());
        assert!(session.last_error.is_some());

        // The surviving run still reports its own exit.
        assert_eq!(registry.handle_process_exit(&id, 1, 0), Some(SessionState::Succeeded));
    }

    #[test]
    fn test_restart_of_finished_session_starts_new_run() {
        let (mut registry, _) = registry();
        let id = registry.create(runner("web", "npm test").deferred(false)).unwrap().id.clone();
        registry.handle_process_exit(&id, 1, 1);

        let outcome = registry.restart(&id).unwrap();
        assert!(matches!(outcome, StartOutcome::Started { run: 2, .. }));
        assert_eq!(registry.get(&id).unwrap().exit_code, None);
    }

    #[test]
    fn test_ports_union_within_run_and_clear_on_exit() {
        let (mut registry, _) = registry();
        let id = registry.create(runner("web", "npm run dev").deferred(false)).unwrap().id.clone();

        assert!(registry.update_ports(&id, 1, &[3000]));
        assert!(registry.update_ports(&id, 1, &[5173]));
        assert!(!registry.update_ports(&id, 1, &[3000]));
        assert_eq!(registry.get(&id).unwrap().ports(), vec![3000, 5173]);

        // Stale run observations are dropped.
        assert!(!registry.update_ports(&id, 7, &[9999]));

        registry.handle_process_exit(&id, 1, 0);
        assert!(registry.get(&id).unwrap().listening_ports.is_empty());
        assert!(!registry.update_ports(&id, 1, &[3000]));
    }

    #[test]
    fn test_remove_running_session_terminates_and_forgets() {
        let (mut registry, backend) = registry();
        let id = registry.create(runner("web", "npm run dev").deferred(false)).unwrap().id.clone();

        let removed = registry.remove(&id).unwrap();
        assert_eq!(removed.id, id);
        assert!(registry.get(&id).is_none());
        assert_eq!(backend.terminated(), vec![id.clone()]);
        assert_eq!(backend.log.lock().unwrap().forgotten, vec![id]);
    }

    #[test]
    fn test_remove_group_by_worktree() {
        let (mut registry, _) = registry();
        registry.create(runner("web", "a")).unwrap();
        registry.create(runner("api", "b")).unwrap();
        let other = WorktreeId::new("app/main");
        registry
            .create(NewSession::runner(&other, "web", "a", "/src/app"))
            .unwrap();

        let removed = registry.remove_group(|s| s.worktree == worktree());
        assert_eq!(removed.len(), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.runners_for(&worktree()).is_empty());
    }

    #[test]
    fn test_titles_are_unique_within_scope() {
        let (mut registry, _) = registry();
        let wt = worktree();
        let pane = PaneId::new(1);
        let first = registry.create(NewSession::tab(&wt, pane, 1, "/src")).unwrap().title.clone();
        let second = registry.create(NewSession::tab(&wt, pane, 2, "/src")).unwrap().title.clone();
        assert_eq!(first, "Terminal");
        assert_eq!(second, "Terminal 2");

        let second_id = SessionId::tab(&wt, pane, 2);
        let err = registry.rename(&second_id, "Terminal").unwrap_err();
        assert!(matches!(err, SessionError::TitleTaken { .. }));
        assert!(matches!(registry.rename(&second_id, "  ").unwrap_err(), SessionError::InvalidTitle));
        registry.rename(&second_id, "Server").unwrap();
        assert_eq!(registry.get(&second_id).unwrap().title, "Server");

        // Another pane is a different scope; the same title is fine there.
        let elsewhere = registry
            .create(NewSession::tab(&wt, PaneId::new(2), 1, "/src").with_title("Server"))
            .unwrap();
        assert_eq!(elsewhere.title, "Server");
    }

    #[test]
    fn test_active_tab_moves_to_neighbour_on_remove() {
        let (mut registry, _) = registry();
        let wt = worktree();
        let pane = PaneId::new(1);
        let scope = TabScope::Pane { pane, worktree: wt.clone() };
        for n in 1..=3 {
            registry.create(NewSession::tab(&wt, pane, n, "/src")).unwrap();
        }
        assert_eq!(registry.active(&scope), Some(&SessionId::tab(&wt, pane, 1)));

        registry.set_active(&SessionId::tab(&wt, pane, 2));
        registry.remove(&SessionId::tab(&wt, pane, 2));
        assert_eq!(registry.active(&scope), Some(&SessionId::tab(&wt, pane, 1)));

        registry.remove(&SessionId::tab(&wt, pane, 1));
        assert_eq!(registry.active(&scope), Some(&SessionId::tab(&wt, pane, 3)));

        registry.remove(&SessionId::tab(&wt, pane, 3));
        assert_eq!(registry.active(&scope), None);
        assert!(registry.sessions_in(&scope).is_empty());
    }

    #[test]
    fn test_move_tab_reorders_within_scope() {
        let (mut registry, _) = registry();
        registry.create(runner("a", "a")).unwrap();
        registry.create(runner("b", "b")).unwrap();
        registry.create(runner("c", "c")).unwrap();

        assert!(registry.move_tab(&SessionId::runner(&worktree(), "c"), 0));
        let order: Vec<_> = registry
            .runners_for(&worktree())
            .iter()
            .map(|s| s.title.clone())
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);

        assert!(registry.move_tab(&SessionId::runner(&worktree(), "c"), 99));
        let last = registry.runners_for(&worktree()).last().unwrap().title.clone();
        assert_eq!(last, "c");
    }

    #[test]
    fn test_reset_only_from_terminal_states() {
        let (mut registry, _) = registry();
        let id = registry.create(runner("web", "x").deferred(false)).unwrap().id.clone();
        assert!(!registry.reset(&id));
        registry.handle_process_exit(&id, 1, 0);
        assert!(registry.reset(&id));
        assert_eq!(registry.get(&id).unwrap().state, SessionState::Idle);
    }

    #[test]
    fn test_running_pids_and_live_process_query() {
        let (mut registry, _) = registry();
        registry.create(runner("web", "x").deferred(false)).unwrap();
        registry.create(runner("idle", "y")).unwrap();

        let pids = registry.running_pids();
        assert_eq!(pids.len(), 1);
        assert_eq!(pids[0].0, SessionId::runner(&worktree(), "web"));
        assert!(registry.has_live_processes(|s| s.worktree == worktree()));
        assert!(!registry.has_live_processes(|s| s.kind == SessionKind::Tab));
        assert_eq!(registry.stop_all(), 1);
    }
}
