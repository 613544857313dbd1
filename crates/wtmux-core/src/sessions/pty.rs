use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use portable_pty::{ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use super::backend::{ProcessBackend, ProcessExit, SpawnRequest, SpawnedProcess};
use super::errors::SessionError;
use super::types::SessionId;
use crate::config::TerminalConfig;

const OUTPUT_CHANNEL_CAPACITY: usize = 256;
const READ_BUFFER_SIZE: usize = 4096;

/// Handle to one live PTY run.
struct ManagedPty {
    run: u64,
    pid: Option<u32>,
    master: Box<dyn MasterPty + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    output: broadcast::Sender<Vec<u8>>,
}

impl std::fmt::Debug for ManagedPty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedPty")
            .field("run", &self.run)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// PTY-backed process host. Each session runs under `$SHELL` in its own
/// pseudo-terminal and process group.
pub struct PtyBackend {
    ptys: HashMap<SessionId, ManagedPty>,
    shell: String,
    size: PtySize,
    exit_tx: mpsc::UnboundedSender<ProcessExit>,
}

impl PtyBackend {
    pub fn new(terminal: &TerminalConfig, exit_tx: mpsc::UnboundedSender<ProcessExit>) -> Self {
        Self {
            ptys: HashMap::new(),
            shell: terminal.shell(),
            size: PtySize {
                rows: terminal.rows(),
                cols: terminal.cols(),
                pixel_width: 0,
                pixel_height: 0,
            },
            exit_tx,
        }
    }

    fn command_for(&self, request: &SpawnRequest) -> CommandBuilder {
        let mut cmd = CommandBuilder::new(&self.shell);
        match (&request.command, request.interactive) {
            (Some(command), false) => {
                cmd.arg("-lc");
                cmd.arg(command);
            }
            _ => {
                cmd.arg("-l");
            }
        }
        cmd.cwd(&request.working_dir);
        cmd.env("TERM", "xterm-256color");
        cmd.env("COLORTERM", "truecolor");
        cmd.env("WTMUX_SESSION_ID", request.session_id.as_str());
        for (key, value) in &request.env {
            cmd.env(key, value);
        }
        cmd
    }

    /// Write bytes to the session's terminal input.
    pub fn write_input(&self, session_id: &SessionId, data: &[u8]) -> Result<(), SessionError> {
        let pty = self.ptys.get(session_id).ok_or_else(|| SessionError::NotFound {
            id: session_id.to_string(),
        })?;
        write_all(&pty.writer, data)
    }

    pub fn resize(&mut self, session_id: &SessionId, rows: u16, cols: u16) -> Result<(), SessionError> {
        let pty = self
            .ptys
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound {
                id: session_id.to_string(),
            })?;
        pty.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SessionError::PtyError {
                message: format!("resize: {}", e),
            })?;
        debug!(
            event = "core.pty.resize_completed",
            session_id = %session_id,
            rows = rows,
            cols = cols,
        );
        Ok(())
    }

    /// Subscribe to live output of the session's current run.
    pub fn subscribe_output(&self, session_id: &SessionId) -> Option<broadcast::Receiver<Vec<u8>>> {
        self.ptys.get(session_id).map(|pty| pty.output.subscribe())
    }

    pub fn count(&self) -> usize {
        self.ptys.len()
    }
}

impl ProcessBackend for PtyBackend {
    fn spawn(&mut self, request: SpawnRequest) -> Result<SpawnedProcess, SessionError> {
        let session_id = request.session_id.clone();
        let spawn_error = |message: String| SessionError::SpawnFailed {
            id: session_id.to_string(),
            message,
        };

        let pair = native_pty_system()
            .openpty(self.size)
            .map_err(|e| spawn_error(format!("openpty: {}", e)))?;

        info!(
            event = "core.pty.spawn_started",
            session_id = %session_id,
            run = request.run,
            command = ?request.command,
            interactive = request.interactive,
        );

        let mut child = pair
            .slave
            .spawn_command(self.command_for(&request))
            .map_err(|e| spawn_error(format!("spawn: {}", e)))?;
        // The slave end must close in this process or the reader never sees EOF.
        drop(pair.slave);

        let pid = child.process_id();
        let killer = child.clone_killer();

        let (writer, reader) = match (pair.master.take_writer(), pair.master.try_clone_reader()) {
            (Ok(writer), Ok(reader)) => (writer, reader),
            (Err(e), _) | (_, Err(e)) => {
                if let Err(kill_err) = child.kill() {
                    error!(
                        event = "core.pty.spawn_cleanup_failed",
                        session_id = %session_id,
                        error = %kill_err,
                    );
                }
                return Err(spawn_error(format!("pty handles: {}", e)));
            }
        };
        let writer = Arc::new(Mutex::new(writer));

        if request.interactive
            && let Some(command) = &request.command
        {
            let line = format!("{}\n", command);
            if let Err(e) = write_all(&writer, line.as_bytes()) {
                warn!(
                    event = "core.pty.initial_command_failed",
                    session_id = %session_id,
                    error = %e,
                );
            }
        }

        let (output, _) = broadcast::channel(OUTPUT_CHANNEL_CAPACITY);
        let reader_output = output.clone();
        let exit_tx = self.exit_tx.clone();
        let thread_session = session_id.clone();
        let run = request.run;

        std::thread::Builder::new()
            .name(format!("pty-{}", session_id))
            .spawn(move || {
                pump_output(reader, &reader_output);
                let exit_code = match child.wait() {
                    Ok(status) => exit_code_of(status.success(), status.exit_code()),
                    Err(e) => {
                        error!(
                            event = "core.pty.wait_failed",
                            session_id = %thread_session,
                            error = %e,
                        );
                        -1
                    }
                };
                debug!(
                    event = "core.pty.process_exited",
                    session_id = %thread_session,
                    run = run,
                    exit_code = exit_code,
                );
                let _ = exit_tx.send(ProcessExit {
                    session_id: thread_session,
                    run,
                    exit_code,
                });
            })
            .map_err(|e| spawn_error(format!("reader thread: {}", e)))?;

        self.ptys.insert(
            session_id.clone(),
            ManagedPty {
                run,
                pid,
                master: pair.master,
                killer,
                writer,
                output,
            },
        );

        info!(
            event = "core.pty.spawn_completed",
            session_id = %session_id,
            run = run,
            pid = ?pid,
        );

        Ok(SpawnedProcess { pid })
    }

    fn terminate(&mut self, session_id: &SessionId) -> Result<(), SessionError> {
        let pty = self
            .ptys
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound {
                id: session_id.to_string(),
            })?;

        info!(
            event = "core.pty.terminate_started",
            session_id = %session_id,
            pid = ?pty.pid,
        );

        // Signal the whole group so dev-server grandchildren go down too.
        if let Some(pid) = pty.pid
            && let Ok(raw) = i32::try_from(pid)
        {
            match killpg(Pid::from_raw(raw), Signal::SIGTERM) {
                Ok(()) => return Ok(()),
                Err(errno) => warn!(
                    event = "core.pty.killpg_failed",
                    session_id = %session_id,
                    error = %errno,
                ),
            }
        }

        pty.killer
            .kill()
            .map_err(|e| SessionError::TerminateFailed {
                id: session_id.to_string(),
                message: e.to_string(),
            })
    }

    fn release(&mut self, session_id: &SessionId, run: u64) {
        if self.ptys.get(session_id).is_some_and(|pty| pty.run == run) {
            self.ptys.remove(session_id);
            debug!(
                event = "core.pty.release_completed",
                session_id = %session_id,
                run = run,
            );
        }
    }

    fn forget(&mut self, session_id: &SessionId) {
        if let Some(mut pty) = self.ptys.remove(session_id) {
            // Best effort: a removed session must not leave a live process behind.
            if let Err(e) = pty.killer.kill() {
                debug!(
                    event = "core.pty.forget_kill_skipped",
                    session_id = %session_id,
                    error = %e,
                );
            }
        }
    }
}

fn write_all(writer: &Arc<Mutex<Box<dyn Write + Send>>>, data: &[u8]) -> Result<(), SessionError> {
    let mut writer = writer.lock().map_err(|e| SessionError::PtyError {
        message: format!("lock writer: {}", e),
    })?;
    writer
        .write_all(data)
        .and_then(|_| writer.flush())
        .map_err(|e| SessionError::PtyError {
            message: format!("write stdin: {}", e),
        })
}

/// Copy PTY output to subscribers until EOF. Linux reports EOF on the
/// master as EIO once the child side closes.
fn pump_output(mut reader: Box<dyn Read + Send>, output: &broadcast::Sender<Vec<u8>>) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                // No subscribers is fine.
                let _ = output.send(buf[..n].to_vec());
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

/// Signal deaths report no useful code; map them to -1 so they count as failures.
fn exit_code_of(success: bool, code: u32) -> i32 {
    if success {
        0
    } else if code == 0 {
        -1
    } else {
        i32::try_from(code).unwrap_or(-1)
    }
}
