//! Managed node process

use crate::description::OutputMode;
use crate::runtime::package::CommandLine;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// Process status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Process is pending start
    Pending,
    /// Process is running
    Running,
    /// Process has stopped with exit code
    Stopped(Option<i32>),
    /// Process failed to start
    Failed,
}

impl ProcessStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessStatus::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, ProcessStatus::Stopped(_) | ProcessStatus::Failed)
    }
}

/// Configuration for spawning a node process
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Display name (for logging)
    pub name: String,
    pub command: CommandLine,
    pub output: OutputMode,
}

/// Event emitted by a managed process
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Started { pid: u32 },
    /// Process output line (stdout or stderr)
    Output { line: String, is_stderr: bool },
    Exited { code: Option<i32> },
    Failed { error: String },
}

/// Events are tagged with the display name of the process
pub type EventSender = mpsc::UnboundedSender<(String, ProcessEvent)>;

/// A node child process
pub struct ManagedProcess {
    pub config: ProcessConfig,
    pub status: ProcessStatus,
    pub pid: Option<u32>,
    pub started_at: Option<Instant>,
    child: Option<Child>,
    event_tx: Option<EventSender>,
}

impl ManagedProcess {
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            config,
            status: ProcessStatus::Pending,
            pid: None,
            started_at: None,
            child: None,
            event_tx: None,
        }
    }

    /// Set the event sender for this process
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: ProcessEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send((self.config.name.clone(), event));
        }
    }

    /// Forward each line of a child pipe as an output event
    fn forward_lines<R>(&self, reader: R, is_stderr: bool)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let name = self.config.name.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx.send((name.clone(), ProcessEvent::Output { line, is_stderr }));
            }
        });
    }

    /// Spawn the process
    pub async fn start(&mut self) -> Result<(), ProcessError> {
        if self.status.is_running() {
            return Err(ProcessError::AlreadyRunning(self.config.name.clone()));
        }

        log::info!("[{}] Starting: {}", self.config.name, self.config.command);

        let mut cmd = Command::new(&self.config.command.program);
        cmd.args(&self.config.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match cmd.spawn() {
            Ok(mut child) => {
                let pid = child.id().unwrap_or(0);
                self.pid = Some(pid);
                self.status = ProcessStatus::Running;
                self.started_at = Some(Instant::now());
                self.emit(ProcessEvent::Started { pid });

                if let Some(stdout) = child.stdout.take() {
                    self.forward_lines(stdout, false);
                }
                if let Some(stderr) = child.stderr.take() {
                    self.forward_lines(stderr, true);
                }

                self.child = Some(child);
                Ok(())
            }
            Err(e) => {
                self.status = ProcessStatus::Failed;
                self.emit(ProcessEvent::Failed {
                    error: format!("Failed to spawn process: {}", e),
                });

                Err(ProcessError::SpawnFailed {
                    name: self.config.name.clone(),
                    source: e,
                })
            }
        }
    }

    /// Stop the process gracefully (SIGTERM, then SIGKILL after timeout)
    pub async fn stop(&mut self, timeout: Duration) -> Result<(), ProcessError> {
        let Some(mut child) = self.child.take() else {
            return Err(ProcessError::NotRunning(self.config.name.clone()));
        };

        log::info!("[{}] Stopping process...", self.config.name);

        #[cfg(unix)]
        {
            self.signal(nix::sys::signal::Signal::SIGTERM);
        }

        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
        }

        let code = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status.code(),
            Ok(Err(e)) => {
                log::error!("[{}] Error waiting for process: {}", self.config.name, e);
                None
            }
            Err(_) => {
                log::warn!(
                    "[{}] Process did not exit gracefully, forcing kill",
                    self.config.name
                );
                let _ = child.kill().await;
                None
            }
        };

        self.status = ProcessStatus::Stopped(code);
        self.pid = None;
        self.emit(ProcessEvent::Exited { code });

        Ok(())
    }

    #[cfg(unix)]
    fn signal(&self, signal: nix::sys::signal::Signal) {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        if let Some(pid) = self.pid {
            if let Err(e) = kill(Pid::from_raw(pid as i32), signal) {
                log::debug!("[{}] Failed to send {:?}: {}", self.config.name, signal, e);
            }
        }
    }

    /// Poll the child and update the status if it has exited
    pub fn check_status(&mut self) -> ProcessStatus {
        if let Some(child) = &mut self.child {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let code = status.code();
                    self.status = ProcessStatus::Stopped(code);
                    self.pid = None;
                    self.child = None;
                    self.emit(ProcessEvent::Exited { code });
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!(
                        "[{}] Error checking process status: {}",
                        self.config.name,
                        e
                    );
                }
            }
        }

        self.status
    }

    pub fn uptime(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }
}

/// Errors that can occur with managed processes
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Process '{0}' is already running")]
    AlreadyRunning(String),

    #[error("Failed to spawn process '{name}': {source}")]
    SpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process '{0}' is not running")]
    NotRunning(String),
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn config(program: &str, args: &[&str]) -> ProcessConfig {
        ProcessConfig {
            name: "test".to_string(),
            command: CommandLine {
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            },
            output: OutputMode::Screen,
        }
    }

    #[tokio::test]
    async fn test_output_and_exit_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut process =
            ManagedProcess::new(config("/bin/sh", &["-c", "echo hello"])).with_event_sender(tx);

        process.start().await.unwrap();
        assert!(process.status.is_running());

        let mut saw_output = false;
        while let Some((name, event)) = rx.recv().await {
            assert_eq!(name, "test");
            if let ProcessEvent::Output { line, is_stderr } = event {
                assert_eq!(line, "hello");
                assert!(!is_stderr);
                saw_output = true;
                break;
            }
        }
        assert!(saw_output);

        for _ in 0..50 {
            if process.check_status().is_stopped() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(process.status, ProcessStatus::Stopped(Some(0)));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let mut process = ManagedProcess::new(config("/nonexistent/fleet/binary", &[]));

        let result = process.start().await;
        assert!(matches!(result, Err(ProcessError::SpawnFailed { .. })));
        assert_eq!(process.status, ProcessStatus::Failed);
    }

    #[tokio::test]
    async fn test_stop_long_running() {
        let mut process = ManagedProcess::new(config("/bin/sh", &["-c", "sleep 30"]));

        process.start().await.unwrap();
        process.stop(Duration::from_secs(2)).await.unwrap();
        assert!(process.status.is_stopped());
        assert!(process.pid.is_none());
    }
}
