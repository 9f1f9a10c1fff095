//! The live execution map and its per-execution monitor tasks.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use tollgate_actionblocks::{ActionBlock, ActionBlockConfig, ActionBlockRegistry, BlockSource};
use tollgate_core::{ExecutionId, Timestamp};

use crate::error::{SupervisorError, SupervisorResult};
use crate::execution::{CompletionResult, ExecutionSnapshot, ExecutionStatus};
use crate::launcher::{ChildChannel, LaunchSpec, ProcessLauncher};
use crate::message::{ChildEvent, ChildMessage, SupervisorMessage};

/// How long a child has to complete the registration handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Graceful-shutdown window before a forced kill.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
/// Delay between a terminal state and map removal, so late messages
/// referencing the execution id still resolve.
pub const CLEANUP_GRACE: Duration = Duration::from_secs(1);

/// Timer configuration for the supervisor.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorTimeouts {
    /// Handshake deadline.
    pub connect: Duration,
    /// Graceful-shutdown window.
    pub shutdown: Duration,
    /// Post-terminal cleanup delay.
    pub cleanup_grace: Duration,
}

impl Default for SupervisorTimeouts {
    fn default() -> Self {
        Self {
            connect: CONNECT_TIMEOUT,
            shutdown: SHUTDOWN_TIMEOUT,
            cleanup_grace: CLEANUP_GRACE,
        }
    }
}

/// Control requests to a monitor task.
enum ControlRequest {
    /// Graceful stop, escalating to a kill after the shutdown window.
    Stop {
        /// Acked once termination has converged.
        ack: oneshot::Sender<()>,
    },
}

/// One live execution tracked by the supervisor.
struct ExecutionEntry {
    name: String,
    block_id: String,
    thread_id: String,
    status: ExecutionStatus,
    started_at: Timestamp,
    /// Taken by the single `wait_for_completion` caller.
    completion: Option<oneshot::Receiver<CompletionResult>>,
    /// To the monitor task; gone once the monitor finished.
    control: mpsc::UnboundedSender<ControlRequest>,
}

/// Launches, tracks, and reaps side executions.
///
/// `start_side_execution` does not return until the child has completed
/// its registration handshake; completion is observed exactly once through
/// `wait_for_completion`. Every path — explicit completion, bare exit,
/// graceful or forced stop — converges on cleanup.
pub struct SideExecutionSupervisor {
    blocks: Arc<ActionBlockRegistry>,
    launcher: Arc<dyn ProcessLauncher>,
    executions: Arc<DashMap<ExecutionId, ExecutionEntry>>,
    timeouts: SupervisorTimeouts,
    gateway_port: Option<u16>,
}

impl SideExecutionSupervisor {
    /// Create a supervisor with default timers.
    #[must_use]
    pub fn new(blocks: Arc<ActionBlockRegistry>, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self::with_timeouts(blocks, launcher, SupervisorTimeouts::default())
    }

    /// Create a supervisor with explicit timers.
    #[must_use]
    pub fn with_timeouts(
        blocks: Arc<ActionBlockRegistry>,
        launcher: Arc<dyn ProcessLauncher>,
        timeouts: SupervisorTimeouts,
    ) -> Self {
        Self {
            blocks,
            launcher,
            executions: Arc::new(DashMap::new()),
            timeouts,
            gateway_port: None,
        }
    }

    /// Advertise a gateway port to children.
    #[must_use]
    pub fn with_gateway_port(mut self, port: u16) -> Self {
        self.gateway_port = Some(port);
        self
    }

    /// Number of live executions.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.executions.len()
    }

    /// Snapshot of every live execution.
    #[must_use]
    pub fn list(&self) -> Vec<ExecutionSnapshot> {
        self.executions
            .iter()
            .map(|entry| ExecutionSnapshot {
                execution_id: *entry.key(),
                name: entry.name.clone(),
                block_id: entry.block_id.clone(),
                thread_id: entry.thread_id.clone(),
                status: entry.status,
                started_at: entry.started_at,
            })
            .collect()
    }

    /// Status of one execution, if it is still tracked.
    #[must_use]
    pub fn status(&self, id: ExecutionId) -> Option<ExecutionStatus> {
        self.executions.get(&id).map(|entry| entry.status)
    }

    /// Validate, launch, and handshake one side execution.
    ///
    /// Returns the execution id only after the child has sent its
    /// registration message. A child that neither registers nor exits
    /// within the connect timeout is force-stopped and the call fails.
    ///
    /// # Errors
    ///
    /// Fails when the block directory does not validate, the process
    /// cannot be spawned, or the handshake times out.
    pub async fn start_side_execution(
        &self,
        block_path: &Path,
        thread_id: &str,
        parent_agent_id: Option<&str>,
        parent_instance_id: Option<&str>,
        thread_context: Value,
        params: Value,
    ) -> SupervisorResult<ExecutionId> {
        // Catch a broken block before any OS resource is consumed.
        let report = self.blocks.validate(block_path);
        if !report.valid {
            return Err(SupervisorError::InvalidBlock {
                path: block_path.display().to_string(),
                reasons: report.errors.join("; "),
            });
        }
        let block = match self.blocks.get_by_path(block_path) {
            Some(block) => block,
            None => {
                // Valid on disk but not in the discovery map (e.g. an ad hoc
                // path): load the config directly.
                let config = ActionBlockConfig::load(block_path)
                    .map_err(SupervisorError::Launch)?;
                Arc::new(ActionBlock::from_config(
                    config,
                    block_path.to_path_buf(),
                    BlockSource::Project,
                ))
            },
        };

        let execution_id = ExecutionId::new();
        let spec = LaunchSpec {
            execution_id,
            block_id: block.id.clone(),
            block_name: block.name.clone(),
            block_path: block.path.clone(),
            entry_point: block.entry_point.clone(),
            thread_id: thread_id.to_string(),
            parent_agent_id: parent_agent_id.map(str::to_owned),
            parent_instance_id: parent_instance_id.map(str::to_owned),
            gateway_port: self.gateway_port,
        };
        let mut channel = self.launcher.launch(&spec).await?;

        let (completion_tx, completion_rx) = oneshot::channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        self.executions.insert(
            execution_id,
            ExecutionEntry {
                name: block.name.clone(),
                block_id: block.id.clone(),
                thread_id: thread_id.to_string(),
                status: ExecutionStatus::Starting,
                started_at: Timestamp::now(),
                completion: Some(completion_rx),
                control: control_tx,
            },
        );
        info!(%execution_id, block = %block.name, %thread_id, "Side execution starting");

        // Hold the caller until the child registers.
        match self.handshake(execution_id, &mut channel).await {
            Ok(()) => {},
            Err(e) => {
                let _ = channel.kill.send(());
                self.executions.remove(&execution_id);
                return Err(e);
            },
        }

        self.set_status(execution_id, ExecutionStatus::Running);
        let start = SupervisorMessage::Start {
            params,
            thread_context,
        };
        if channel.to_child.send(start).is_err() {
            warn!(%execution_id, "Child channel closed right after handshake");
        }

        let executions = Arc::clone(&self.executions);
        let timeouts = self.timeouts;
        tokio::spawn(monitor(
            executions,
            execution_id,
            channel,
            control_rx,
            completion_tx,
            timeouts,
        ));

        Ok(execution_id)
    }

    /// Wait until the child registers, exits, or the connect timer expires.
    async fn handshake(
        &self,
        execution_id: ExecutionId,
        channel: &mut ChildChannel,
    ) -> SupervisorResult<()> {
        let deadline = tokio::time::sleep(self.timeouts.connect);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                event = channel.from_child.recv() => match event {
                    Some(ChildEvent::Message(ChildMessage::Register { execution_id: id }))
                        if id == execution_id =>
                    {
                        debug!(%execution_id, "Handshake complete");
                        return Ok(());
                    },
                    Some(ChildEvent::Message(msg)) => {
                        debug!(%execution_id, ?msg, "Pre-handshake message ignored");
                    },
                    Some(ChildEvent::Exited { code }) => {
                        return Err(SupervisorError::ExitedBeforeHandshake {
                            id: execution_id,
                            code,
                        });
                    },
                    Some(ChildEvent::Fault(e)) => {
                        return Err(SupervisorError::Launch(format!(
                            "channel fault before handshake: {e}"
                        )));
                    },
                    None => {
                        return Err(SupervisorError::ExitedBeforeHandshake {
                            id: execution_id,
                            code: None,
                        });
                    },
                },
                () = &mut deadline => {
                    warn!(%execution_id, "Handshake timed out — force-stopping child");
                    return Err(SupervisorError::HandshakeTimeout {
                        id: execution_id,
                        seconds: self.timeouts.connect.as_secs(),
                    });
                },
            }
        }
    }

    /// Wait for the execution to reach a terminal state.
    ///
    /// Resolves with the explicit completion message when the child sends
    /// one, or a result synthesized from the exit code (0 is implicit
    /// success). May be awaited once per execution.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids, a second concurrent wait, or a monitor that
    /// went away without resolving.
    pub async fn wait_for_completion(
        &self,
        id: ExecutionId,
    ) -> SupervisorResult<CompletionResult> {
        let rx = {
            let mut entry = self
                .executions
                .get_mut(&id)
                .ok_or(SupervisorError::UnknownExecution(id))?;
            entry
                .completion
                .take()
                .ok_or(SupervisorError::AlreadyAwaited(id))?
        };
        rx.await.map_err(|_| SupervisorError::ChannelClosed(id))
    }

    /// Stop one execution: graceful signal, shutdown window, then kill.
    ///
    /// Converges to cleanup in every case; stopping an execution that has
    /// already reached a terminal state is a no-op.
    ///
    /// # Errors
    ///
    /// Fails only for ids the supervisor has never tracked or already
    /// cleaned up.
    pub async fn stop_side_execution(&self, id: ExecutionId) -> SupervisorResult<()> {
        let control = {
            let entry = self
                .executions
                .get(&id)
                .ok_or(SupervisorError::UnknownExecution(id))?;
            entry.control.clone()
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if control.send(ControlRequest::Stop { ack: ack_tx }).is_err() {
            // Monitor already finished; the execution is terminal.
            return Ok(());
        }
        // Ack may be dropped if the monitor raced to completion.
        let _ = ack_rx.await;
        Ok(())
    }

    /// Stop every live execution concurrently and wait for convergence.
    pub async fn shutdown_all(&self) {
        let ids: Vec<ExecutionId> = self.executions.iter().map(|e| *e.key()).collect();
        if ids.is_empty() {
            return;
        }
        info!(count = ids.len(), "Stopping all side executions");
        let stops = ids.into_iter().map(|id| self.stop_side_execution(id));
        for result in futures::future::join_all(stops).await {
            if let Err(e) = result {
                debug!(error = %e, "Execution vanished during shutdown sweep");
            }
        }
    }

    fn set_status(&self, id: ExecutionId, status: ExecutionStatus) {
        if let Some(mut entry) = self.executions.get_mut(&id) {
            entry.status = status;
        }
    }
}

/// Drive one execution to a terminal state, then clean up after a grace
/// delay.
async fn monitor(
    executions: Arc<DashMap<ExecutionId, ExecutionEntry>>,
    execution_id: ExecutionId,
    mut channel: ChildChannel,
    mut control_rx: mpsc::UnboundedReceiver<ControlRequest>,
    completion_tx: oneshot::Sender<CompletionResult>,
    timeouts: SupervisorTimeouts,
) {
    let mut completion_tx = Some(completion_tx);
    let mut stop_ack: Option<oneshot::Sender<()>> = None;
    let mut control_open = true;

    let result = loop {
        tokio::select! {
            event = channel.from_child.recv() => match event {
                Some(ChildEvent::Message(ChildMessage::Complete {
                    success, result, error, ..
                })) => {
                    break if success {
                        CompletionResult::success(result)
                    } else {
                        CompletionResult::failure(
                            error.unwrap_or_else(|| "block reported failure".into()),
                        )
                    };
                },
                Some(ChildEvent::Message(ChildMessage::Register { .. })) => {
                    debug!(%execution_id, "Duplicate registration ignored");
                },
                Some(ChildEvent::Exited { code }) => {
                    break CompletionResult::from_exit(code);
                },
                Some(ChildEvent::Fault(e)) => {
                    warn!(%execution_id, error = %e, "Child channel fault");
                    break CompletionResult::failure(format!("process channel fault: {e}"));
                },
                None => {
                    break CompletionResult::failure("process channel closed");
                },
            },
            req = control_rx.recv(), if control_open => {
                if let Some(ControlRequest::Stop { ack }) = req {
                    set_status(&executions, execution_id, ExecutionStatus::Stopping);
                    stop_ack = Some(ack);
                    break stop_child(execution_id, &mut channel, timeouts.shutdown).await;
                }
                control_open = false;
            },
        }
    };

    let status = if result.success {
        ExecutionStatus::Completed
    } else {
        ExecutionStatus::Failed
    };
    set_status(&executions, execution_id, status);
    info!(%execution_id, %status, "Side execution finished");

    if let Some(tx) = completion_tx.take()
        && tx.send(result).is_err()
    {
        debug!(%execution_id, "No completion waiter");
    }
    if let Some(ack) = stop_ack.take() {
        let _ = ack.send(());
    }

    // Let late messages referencing this id still find the entry.
    tokio::time::sleep(timeouts.cleanup_grace).await;
    executions.remove(&execution_id);
    debug!(%execution_id, "Execution cleaned up");
}

/// Graceful stop: shutdown message, bounded wait, then forced kill.
async fn stop_child(
    execution_id: ExecutionId,
    channel: &mut ChildChannel,
    shutdown_timeout: Duration,
) -> CompletionResult {
    let _ = channel.to_child.send(SupervisorMessage::Shutdown);

    let graceful = tokio::time::timeout(shutdown_timeout, async {
        loop {
            match channel.from_child.recv().await {
                Some(ChildEvent::Exited { code }) => break Some(code),
                Some(_) => {},
                None => break None,
            }
        }
    })
    .await;

    match graceful {
        Ok(Some(code)) => {
            debug!(%execution_id, ?code, "Child closed gracefully");
            CompletionResult::failure("stopped")
        },
        Ok(None) => CompletionResult::failure("stopped"),
        Err(_) => {
            warn!(%execution_id, "Graceful shutdown window expired — killing");
            let _ = channel.kill.send(());
            // Best-effort wait for the kill to land.
            let _ = tokio::time::timeout(shutdown_timeout, async {
                loop {
                    match channel.from_child.recv().await {
                        Some(ChildEvent::Exited { .. }) | None => break,
                        Some(_) => {},
                    }
                }
            })
            .await;
            CompletionResult::failure("stopped (forced)")
        },
    }
}

fn set_status(
    executions: &DashMap<ExecutionId, ExecutionEntry>,
    id: ExecutionId,
    status: ExecutionStatus,
) {
    if let Some(mut entry) = executions.get_mut(&id) {
        entry.status = status;
    }
}
