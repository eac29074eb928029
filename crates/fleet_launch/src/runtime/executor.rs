//! Launch executor - starts nodes, fires timers and shuts everything down

use crate::description::OutputMode;
use crate::runtime::package::PackageIndex;
use crate::runtime::plan::{ResolvedNode, ResolvedPlan};
use crate::runtime::process::{ManagedProcess, ProcessConfig, ProcessEvent, ProcessStatus};
use indexmap::IndexMap;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Launch executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Time a process gets between SIGTERM and SIGKILL
    pub shutdown_timeout: Duration,
    /// How often process exits are polled
    pub poll_interval: Duration,
    /// Where node executables are looked up
    pub package_index: PackageIndex,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            package_index: PackageIndex::from_env(),
        }
    }
}

/// A timer armed at launch, not fired yet
#[derive(Debug)]
struct PendingTimer {
    deadline: Instant,
    delay_sec: f64,
    nodes: Vec<ResolvedNode>,
}

/// Launch executor state
pub struct Executor {
    config: ExecutorConfig,
    plan: ResolvedPlan,
    /// Started processes, in start order, keyed by display name
    processes: IndexMap<String, ManagedProcess>,
    pending: Vec<PendingTimer>,
    event_tx: mpsc::UnboundedSender<(String, ProcessEvent)>,
    event_rx: mpsc::UnboundedReceiver<(String, ProcessEvent)>,
}

impl Executor {
    pub fn new(plan: ResolvedPlan, config: ExecutorConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            config,
            plan,
            processes: IndexMap::new(),
            pending: Vec::new(),
            event_tx,
            event_rx,
        }
    }

    pub fn plan(&self) -> &ResolvedPlan {
        &self.plan
    }

    /// Arm every scheduled timer and start the immediate nodes.
    ///
    /// Timers are armed first so their delays count from the launch, not
    /// from the end of the immediate starts. A node that fails to spawn is
    /// logged and does not stop the others.
    pub async fn launch(&mut self) -> Result<(), ExecutorError> {
        if self.plan.immediate().next().is_none() && self.plan.timers().next().is_none() {
            return Err(ExecutorError::NothingToLaunch);
        }

        let launched_at = Instant::now();
        self.pending.clear();
        for entry in self.plan.timers() {
            let delay_sec = entry.delay_sec.unwrap_or(0.0);
            let Some(deadline) = launched_at.checked_add(entry.delay()) else {
                log::warn!(
                    "Timer after {}s is beyond the clock range and will never fire",
                    delay_sec
                );
                continue;
            };
            self.pending.push(PendingTimer {
                deadline,
                delay_sec,
                nodes: entry.nodes.clone(),
            });
        }

        for entry in self.plan.unscheduled() {
            for node in &entry.nodes {
                log::info!("[{}] Declared but not scheduled", node.display_name());
            }
        }

        let immediate: Vec<ResolvedNode> = self
            .plan
            .immediate()
            .flat_map(|entry| entry.nodes.iter().cloned())
            .collect();

        log::info!(
            "Launching {} node(s) now, {} timer(s) armed",
            immediate.len(),
            self.pending.len()
        );

        for node in &immediate {
            self.start_node(node).await;
        }

        Ok(())
    }

    async fn start_node(&mut self, node: &ResolvedNode) {
        let name = node.display_name();
        let config = ProcessConfig {
            name: name.clone(),
            command: self.config.package_index.command_for(node),
            output: node.output,
        };

        let mut process = ManagedProcess::new(config).with_event_sender(self.event_tx.clone());
        if let Err(e) = process.start().await {
            log::error!("[{}] {}", name, e);
        }

        if self.processes.contains_key(&name) {
            log::warn!("[{}] Started again, replacing the previous process", name);
        }
        self.processes.insert(name, process);
    }

    /// Start the nodes of every timer whose deadline has passed
    async fn fire_due_timers(&mut self) {
        let now = Instant::now();
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|timer| timer.deadline <= now);
        self.pending = pending;

        for timer in due {
            log::info!("Timer fired after {}s", timer.delay_sec);
            for node in &timer.nodes {
                self.start_node(node).await;
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|timer| timer.deadline).min()
    }

    pub fn pending_timers(&self) -> usize {
        self.pending.len()
    }

    fn output_mode(&self, name: &str) -> OutputMode {
        self.processes
            .get(name)
            .map(|p| p.config.output)
            .unwrap_or_default()
    }

    fn log_event(&self, name: &str, event: ProcessEvent) {
        match event {
            ProcessEvent::Output { line, is_stderr } => {
                let level = output_level(self.output_mode(name), is_stderr);
                log::log!(level, "[{}] {}", name, line);
            }
            ProcessEvent::Exited { code } => {
                log::info!("[{}] Process exited with code: {:?}", name, code);
            }
            ProcessEvent::Failed { error } => {
                log::error!("[{}] Process failed: {}", name, error);
            }
            ProcessEvent::Started { pid } => {
                log::info!("[{}] Process started with PID: {}", name, pid);
            }
        }
    }

    /// Drive timers and process events until shutdown is requested, or until
    /// every started process has stopped and no timer is pending
    pub async fn wait(&mut self, mut shutdown_rx: watch::Receiver<()>) {
        loop {
            let next_deadline = self.next_deadline();
            let timer = async move {
                match next_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = shutdown_rx.changed() => {
                    log::info!("Shutdown signal received");
                    break;
                }

                event = self.event_rx.recv() => {
                    if let Some((name, event)) = event {
                        self.log_event(&name, event);
                    }
                }

                _ = timer => {
                    self.fire_due_timers().await;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    let mut all_stopped = true;
                    for process in self.processes.values_mut() {
                        if process.check_status().is_running() {
                            all_stopped = false;
                        }
                    }
                    if all_stopped && self.pending.is_empty() {
                        log::info!("All processes have stopped");
                        break;
                    }
                }
            }
        }

        while let Ok((name, event)) = self.event_rx.try_recv() {
            self.log_event(&name, event);
        }
    }

    /// Cancel pending timers and stop all processes in reverse start order
    pub async fn shutdown(&mut self) {
        if !self.pending.is_empty() {
            log::info!("Cancelling {} pending timer(s)", self.pending.len());
            self.pending.clear();
        }

        log::info!("Shutting down all processes...");

        for (name, process) in self.processes.iter_mut().rev() {
            if process.check_status().is_running() {
                if let Some(uptime) = process.uptime() {
                    log::debug!("[{}] Up for {:.1}s", name, uptime.as_secs_f64());
                }
                if let Err(e) = process.stop(self.config.shutdown_timeout).await {
                    log::error!("[{}] Error stopping process: {}", name, e);
                }
            }
        }

        log::info!("All processes shut down");
    }

    /// Status of every started process, in start order
    pub fn status(&self) -> Vec<(&str, ProcessStatus)> {
        self.processes
            .iter()
            .map(|(name, proc)| (name.as_str(), proc.status))
            .collect()
    }
}

/// Log level for a line of node output
fn output_level(mode: OutputMode, is_stderr: bool) -> log::Level {
    match (mode.is_visible(), is_stderr) {
        (false, _) => log::Level::Debug,
        (true, true) => log::Level::Warn,
        (true, false) => log::Level::Info,
    }
}

/// Errors that can occur in the executor
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Nothing to launch: every node is disabled")]
    NothingToLaunch,
}
