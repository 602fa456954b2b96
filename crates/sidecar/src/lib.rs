//! Lifecycle management for the Python story-generation backend.
//!
//! The backend is an external process whose only synchronization contract is
//! textual: it prints a readiness marker on stdout once its HTTP listener is
//! accepting connections. `Supervisor::start` spawns the process, scans its
//! output for that marker, and races the scan against a startup deadline and
//! against the process exiting early. `stop` tears down the whole process
//! tree and is safe on every exit path (it also runs from `Drop`).

use crossbeam_channel::{unbounded, RecvTimeoutError};
use parking_lot::Mutex;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct SidecarConfig {
    /// Interpreter or launcher to run.
    pub program: String,
    /// Entry-point script handed to `program` as its first argument. Checked
    /// for existence before anything is spawned.
    pub script: PathBuf,
    /// Extra arguments appended after the script.
    pub args: Vec<String>,
    pub workdir: PathBuf,
    /// Port the backend listens on; part of one of the readiness markers.
    pub port: u16,
    pub ready_timeout: Duration,
}

impl SidecarConfig {
    /// Standard layout: `backend/start.py` under the install root, run with
    /// the platform's python, working directory at the install root.
    pub fn python_backend(install_root: &Path) -> Self {
        let python = if cfg!(target_os = "windows") {
            "python"
        } else {
            "python3"
        };
        Self {
            program: python.to_string(),
            script: install_root.join("backend").join("start.py"),
            args: Vec::new(),
            workdir: install_root.to_path_buf(),
            port: DEFAULT_PORT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("backend entry point not found: {0}")]
    MissingArtifact(PathBuf),
    #[error("failed to spawn backend: {0}")]
    SpawnFailure(String),
    #[error("backend did not become ready within {0:?}")]
    StartupTimeout(Duration),
    #[error("backend exited with code {code} before becoming ready")]
    PrematureExit { code: i32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SidecarState {
    NotStarted,
    Starting,
    Ready,
    Failed,
    Stopped,
}

pub struct Supervisor {
    cfg: SidecarConfig,
    child: Option<Child>,
    state: SidecarState,
    log_buf: Arc<Mutex<Vec<String>>>,
}

impl Supervisor {
    pub fn new(cfg: SidecarConfig) -> Self {
        Self {
            cfg,
            child: None,
            state: SidecarState::NotStarted,
            log_buf: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn state(&self) -> SidecarState {
        self.state
    }

    pub fn config(&self) -> &SidecarConfig {
        &self.cfg
    }

    /// Last `max_lines` of captured backend output, for a diagnostics view.
    pub fn logs(&self, max_lines: usize) -> Vec<String> {
        let buf = self.log_buf.lock();
        let start = buf.len().saturating_sub(max_lines);
        buf[start..].to_vec()
    }

    /// Brings the backend to ready or fails. Resolves exactly once: the first
    /// readiness marker wins; otherwise the deadline or an early exit does.
    pub fn start(&mut self) -> Result<(), StartupError> {
        if !self.cfg.script.exists() {
            self.state = SidecarState::Failed;
            return Err(StartupError::MissingArtifact(self.cfg.script.clone()));
        }
        self.state = SidecarState::Starting;

        let mut cmd = Command::new(&self.cfg.program);
        cmd.arg(&self.cfg.script)
            .args(&self.cfg.args)
            .current_dir(&self.cfg.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            // Own process group, so stop() can signal the whole tree.
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        tracing::info!(
            target: "sidecar",
            "starting backend: {} {}",
            self.cfg.program,
            self.cfg.script.display()
        );
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.state = SidecarState::Failed;
                return Err(StartupError::SpawnFailure(e.to_string()));
            }
        };

        // Line events for the readiness scan come from stdout only; stderr is
        // captured for diagnostics and never drives a state change.
        let (tx, rx) = unbounded::<String>();
        if let Some(out) = child.stdout.take() {
            let log_buf = self.log_buf.clone();
            thread::spawn(move || {
                for line in BufReader::new(out).lines().map_while(Result::ok) {
                    tracing::debug!(target: "sidecar", "[O] {line}");
                    log_buf.lock().push(format!("[O] {line}"));
                    let _ = tx.send(line);
                }
            });
        }
        if let Some(err) = child.stderr.take() {
            let log_buf = self.log_buf.clone();
            thread::spawn(move || {
                for line in BufReader::new(err).lines().map_while(Result::ok) {
                    tracing::debug!(target: "sidecar", "[E] {line}");
                    log_buf.lock().push(format!("[E] {line}"));
                }
            });
        }

        let deadline = Instant::now() + self.cfg.ready_timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                kill_tree(&mut child);
                self.state = SidecarState::Failed;
                return Err(StartupError::StartupTimeout(self.cfg.ready_timeout));
            }
            let slice = (deadline - now).min(Duration::from_millis(100));
            match rx.recv_timeout(slice) {
                Ok(line) => {
                    if is_ready_line(&line, self.cfg.port) {
                        tracing::info!(target: "sidecar", "backend ready: {line}");
                        self.child = Some(child);
                        self.state = SidecarState::Ready;
                        return Ok(());
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    match child.try_wait() {
                        Ok(Some(status)) => {
                            self.state = SidecarState::Failed;
                            return Err(StartupError::PrematureExit {
                                code: status.code().unwrap_or(-1),
                            });
                        }
                        Ok(None) => {}
                        Err(e) => {
                            kill_tree(&mut child);
                            self.state = SidecarState::Failed;
                            return Err(StartupError::SpawnFailure(e.to_string()));
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // stdout closed without a marker. The process may still
                    // be running, so keep the deadline in force instead of
                    // blocking on wait().
                    loop {
                        match child.try_wait() {
                            Ok(Some(status)) => {
                                self.state = SidecarState::Failed;
                                return Err(StartupError::PrematureExit {
                                    code: status.code().unwrap_or(-1),
                                });
                            }
                            Ok(None) => {}
                            Err(e) => {
                                kill_tree(&mut child);
                                self.state = SidecarState::Failed;
                                return Err(StartupError::SpawnFailure(e.to_string()));
                            }
                        }
                        if Instant::now() >= deadline {
                            kill_tree(&mut child);
                            self.state = SidecarState::Failed;
                            return Err(StartupError::StartupTimeout(self.cfg.ready_timeout));
                        }
                        thread::sleep(Duration::from_millis(20));
                    }
                }
            }
        }
    }

    /// Terminates the backend and all of its descendants. Idempotent; safe
    /// when start was never called or already failed.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::info!(target: "sidecar", "stopping backend (pid {})", child.id());
            kill_tree(&mut child);
        }
        self.state = SidecarState::Stopped;
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn is_ready_line(line: &str, port: u16) -> bool {
    line.contains("Uvicorn running on")
        || line.contains("Application startup complete")
        || line.contains(&format!("http://127.0.0.1:{port}"))
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    // The child runs in its own process group; signal the group so any
    // grandchildren go down with it.
    let pid = child.id();
    let _ = Command::new("kill")
        .args(["-TERM", &format!("-{pid}")])
        .status();
    let deadline = Instant::now() + Duration::from_millis(500);
    while Instant::now() < deadline {
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        thread::sleep(Duration::from_millis(20));
    }
    let _ = Command::new("kill")
        .args(["-KILL", &format!("-{pid}")])
        .status();
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(windows)]
fn kill_tree(child: &mut Child) {
    let _ = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &child.id().to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    let _ = child.kill();
    let _ = child.wait();
}
