//! The control loop: single writer of the app state.
//!
//! Everything that mutates state arrives as a [`ControlMessage`] on one
//! channel and is applied in order. Slow work (port scans, git status) runs
//! on blocking tasks and posts its results back as messages.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::WtmuxConfig;
use crate::events;
use crate::git::{ChangedFiles, Git2ChangedFiles};
use crate::layout::PaneId;
use crate::sessions::{
    PortScanner, ProcessBackend, ProcessExit, PtyBackend, SessionId, SystemPortScanner,
};
use crate::state::{AppStore, Command, DispatchError, Event, Store};
use crate::status::{ClearEffect, ClearScope, RawStatusEvent, StatusError, StatusFileWatcher};

const EVENT_CAPACITY: usize = 256;

pub enum ControlMessage {
    Dispatch {
        command: Command,
        reply: oneshot::Sender<Result<Vec<Event>, DispatchError>>,
    },
    ProcessExited(ProcessExit),
    PortsObserved {
        session_id: SessionId,
        run: u64,
        ports: BTreeSet<u16>,
    },
    Status(RawStatusEvent),
    ClearFired {
        scope: ClearScope,
        ticket: u64,
    },
    RefreshChangedFiles,
    ChangedFilesCounted {
        pane: PaneId,
        count: Option<usize>,
    },
    Shutdown {
        reply: oneshot::Sender<usize>,
    },
}

/// Cloneable sender side of the control loop.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<ControlMessage>,
    events: broadcast::Sender<Event>,
}

impl ControlHandle {
    pub async fn dispatch(&self, command: Command) -> Result<Vec<Event>, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ControlMessage::Dispatch { command, reply })
            .map_err(|_| DispatchError::ControlLoopClosed)?;
        rx.await.map_err(|_| DispatchError::ControlLoopClosed)?
    }

    pub fn send_status(&self, raw: RawStatusEvent) -> Result<(), DispatchError> {
        self.send(ControlMessage::Status(raw))
    }

    pub fn refresh_changed_files(&self) -> Result<(), DispatchError> {
        self.send(ControlMessage::RefreshChangedFiles)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Forward every write of the status file into the loop.
    pub fn watch_status_file(&self, path: &Path) -> Result<StatusFileWatcher, StatusError> {
        let tx = self.tx.clone();
        StatusFileWatcher::spawn(path, move |raw| {
            if tx.send(ControlMessage::Status(raw)).is_err() {
                debug!(event = "core.runtime.status_dropped");
            }
        })
    }

    /// Stop every running session and end the loop. Returns how many
    /// sessions were signalled.
    pub async fn shutdown(&self) -> Result<usize, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlMessage::Shutdown { reply })?;
        rx.await.map_err(|_| DispatchError::ControlLoopClosed)
    }

    fn send(&self, msg: ControlMessage) -> Result<(), DispatchError> {
        self.tx
            .send(msg)
            .map_err(|_| DispatchError::ControlLoopClosed)
    }
}

pub struct ControlLoop<B: ProcessBackend + 'static> {
    store: AppStore<B>,
    rx: mpsc::UnboundedReceiver<ControlMessage>,
    // Weak so the loop ends once every handle is dropped.
    tx: mpsc::WeakUnboundedSender<ControlMessage>,
    exits: mpsc::UnboundedReceiver<ProcessExit>,
    events: broadcast::Sender<Event>,
    scanner: Option<Arc<dyn PortScanner>>,
    changed_files: Option<Arc<dyn ChangedFiles>>,
    scan_in_flight: Arc<AtomicBool>,
    // Keyed by scope, tagged with the ticket the timer will fire.
    timers: HashMap<ClearScope, (u64, JoinHandle<()>)>,
}

impl<B: ProcessBackend + 'static> ControlLoop<B> {
    /// `exits` is the receiving end of the channel the backend reports
    /// process exits on.
    pub fn new(
        store: AppStore<B>,
        exits: mpsc::UnboundedReceiver<ProcessExit>,
    ) -> (Self, ControlHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let control = Self {
            store,
            rx,
            tx: tx.downgrade(),
            exits,
            events: events.clone(),
            scanner: None,
            changed_files: None,
            scan_in_flight: Arc::new(AtomicBool::new(false)),
            timers: HashMap::new(),
        };
        (control, ControlHandle { tx, events })
    }

    pub fn with_port_scanner(mut self, scanner: Arc<dyn PortScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn with_changed_files(mut self, changed_files: Arc<dyn ChangedFiles>) -> Self {
        self.changed_files = Some(changed_files);
        self
    }

    /// Run until shutdown or until every handle is dropped. Returns the
    /// final state.
    pub async fn run(mut self) -> AppStore<B> {
        let ports = &self.store.config().ports;
        let scanning = self.scanner.is_some() && ports.enabled();
        let mut ticker = tokio::time::interval(ports.scan_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(event = "core.runtime.loop_started", port_scan = scanning);

        loop {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(ControlMessage::Shutdown { reply }) => {
                        let stopped = self.store.shutdown();
                        events::log_app_shutdown(stopped);
                        let _ = reply.send(stopped);
                        break;
                    }
                    Some(msg) => self.handle(msg),
                    None => {
                        debug!(event = "core.runtime.handles_dropped");
                        events::log_app_shutdown(self.store.shutdown());
                        break;
                    }
                },
                Some(exit) = self.exits.recv() => self.handle(ControlMessage::ProcessExited(exit)),
                _ = ticker.tick(), if scanning => self.scan_ports(),
            }
        }

        for (_, (_, timer)) in self.timers.drain() {
            timer.abort();
        }
        info!(event = "core.runtime.loop_stopped", version = self.store.version());
        self.store
    }

    fn handle(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::Dispatch { command, reply } => {
                let result = self.store.dispatch(command);
                if let Ok(events) = &result {
                    self.publish(events);
                }
                if reply.send(result).is_err() {
                    debug!(event = "core.runtime.reply_dropped");
                }
            }
            ControlMessage::ProcessExited(exit) => {
                let events = self.store.handle_process_exit(exit);
                self.publish(&events);
            }
            ControlMessage::PortsObserved {
                session_id,
                run,
                ports,
            } => {
                let ports: Vec<u16> = ports.into_iter().collect();
                let events = self.store.handle_ports(&session_id, run, &ports);
                self.publish(&events);
            }
            ControlMessage::Status(raw) => {
                let events = self.store.handle_status(raw);
                self.publish(&events);
            }
            ControlMessage::ClearFired { scope, ticket } => {
                if self.timers.get(&scope).is_some_and(|(current, _)| *current == ticket) {
                    self.timers.remove(&scope);
                }
                let events = self.store.handle_clear(&scope, ticket);
                self.publish(&events);
            }
            ControlMessage::RefreshChangedFiles => self.count_changed_files(),
            ControlMessage::ChangedFilesCounted { pane, count } => {
                let events = self.store.handle_changed_files(pane, count);
                self.publish(&events);
            }
            ControlMessage::Shutdown { reply } => {
                let _ = reply.send(self.store.shutdown());
            }
        }
        self.apply_clear_effects();
    }

    fn publish(&self, events: &[Event]) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event.clone());
        }
    }

    fn apply_clear_effects(&mut self) {
        for effect in self.store.take_clear_effects() {
            match effect {
                ClearEffect::Schedule {
                    scope,
                    ticket,
                    after,
                } => {
                    if let Some((_, previous)) = self.timers.remove(&scope) {
                        previous.abort();
                    }
                    let tx = self.tx.clone();
                    let fired = scope.clone();
                    let timer = tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        if let Some(tx) = tx.upgrade() {
                            let _ = tx.send(ControlMessage::ClearFired {
                                scope: fired,
                                ticket,
                            });
                        }
                    });
                    debug!(
                        event = "core.runtime.clear_scheduled",
                        worktree = %scope.worktree,
                        ticket = ticket,
                    );
                    self.timers.insert(scope, (ticket, timer));
                }
                ClearEffect::Cancel { scope } => {
                    if let Some((_, timer)) = self.timers.remove(&scope) {
                        timer.abort();
                    }
                }
            }
        }
    }

    fn scan_ports(&mut self) {
        let Some(scanner) = self.scanner.clone() else {
            return;
        };
        let targets = self.store.running_pids();
        if targets.is_empty() {
            return;
        }
        if self.scan_in_flight.swap(true, Ordering::AcqRel) {
            debug!(event = "core.runtime.port_scan_skipped");
            return;
        }

        let tx = self.tx.clone();
        let in_flight = Arc::clone(&self.scan_in_flight);
        tokio::task::spawn_blocking(move || {
            for (session_id, run, pid) in targets {
                match scanner.listening_ports(pid) {
                    Ok(ports) if ports.is_empty() => {}
                    Ok(ports) => {
                        let Some(tx) = tx.upgrade() else { break };
                        let _ = tx.send(ControlMessage::PortsObserved {
                            session_id,
                            run,
                            ports,
                        });
                    }
                    Err(e) => {
                        warn!(
                            event = "core.runtime.port_scan_failed",
                            session_id = %session_id,
                            error = %e,
                        );
                    }
                }
            }
            in_flight.store(false, Ordering::Release);
        });
    }

    fn count_changed_files(&mut self) {
        let Some(changed_files) = self.changed_files.clone() else {
            return;
        };
        let targets = self.store.changed_files_targets();
        let tx = self.tx.clone();
        tokio::task::spawn_blocking(move || {
            for (pane, path) in targets {
                let count = match changed_files.changed_file_count(&path) {
                    Ok(count) => Some(count),
                    Err(e) => {
                        debug!(
                            event = "core.runtime.changed_files_failed",
                            path = %path.display(),
                            error = %e,
                        );
                        None
                    }
                };
                let Some(tx) = tx.upgrade() else { break };
                let _ = tx.send(ControlMessage::ChangedFilesCounted { pane, count });
            }
        });
    }
}

/// Start a control loop over real PTYs, `lsof` port scans and libgit2.
///
/// Must be called from within a tokio runtime.
pub fn start(config: WtmuxConfig) -> (ControlHandle, JoinHandle<AppStore<PtyBackend>>) {
    let (exit_tx, exit_rx) = mpsc::unbounded_channel();
    let backend = PtyBackend::new(&config.terminal, exit_tx);
    let store = AppStore::new(config, backend);
    let (control, handle) = ControlLoop::new(store, exit_rx);
    let control = control
        .with_port_scanner(Arc::new(SystemPortScanner::new()))
        .with_changed_files(Arc::new(Git2ChangedFiles));
    (handle, tokio::spawn(control.run()))
}
