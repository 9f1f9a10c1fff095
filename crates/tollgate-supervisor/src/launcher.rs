//! Process launching behind a trait, so the supervisor is testable
//! without forking.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use tollgate_core::ExecutionId;

use crate::error::{SupervisorError, SupervisorResult};
use crate::message::{ChildEvent, ChildMessage, SupervisorMessage};

/// Everything needed to launch one side execution.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// The execution id the child must register with.
    pub execution_id: ExecutionId,
    /// Originating action block id.
    pub block_id: String,
    /// Block name, for logging.
    pub block_name: String,
    /// Absolute block directory; also the child's working directory.
    pub block_path: PathBuf,
    /// Entry point relative to the block directory.
    pub entry_point: String,
    /// Owning thread id.
    pub thread_id: String,
    /// Parent agent id, when spawned on behalf of an agent.
    pub parent_agent_id: Option<String>,
    /// Parent agent instance id.
    pub parent_instance_id: Option<String>,
    /// Gateway port the child may connect back to.
    pub gateway_port: Option<u16>,
}

/// The bidirectional channel to one launched child.
///
/// `to_child` carries structured messages; `from_child` surfaces inbound
/// messages, process exit, and channel faults; `kill` forces termination.
#[derive(Debug)]
pub struct ChildChannel {
    /// Structured messages to the child.
    pub to_child: mpsc::UnboundedSender<SupervisorMessage>,
    /// Messages, exit, and faults from the child.
    pub from_child: mpsc::UnboundedReceiver<ChildEvent>,
    /// Force-kill signal.
    pub kill: mpsc::UnboundedSender<()>,
}

/// Launches side executions.
///
/// The production launcher forks OS processes; tests substitute a fake
/// that fabricates channels.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Launch a child for `spec` and wire up its message channel.
    ///
    /// # Errors
    ///
    /// Returns an error when the process cannot be spawned.
    async fn launch(&self, spec: &LaunchSpec) -> SupervisorResult<ChildChannel>;
}

/// Map an entry point to its interpreter invocation.
fn interpreter_for(entry: &Path) -> (String, Vec<String>) {
    let entry_str = entry.display().to_string();
    match entry.extension().and_then(|e| e.to_str()) {
        Some("js" | "mjs" | "cjs") => ("node".to_string(), vec![entry_str]),
        Some("py") => ("python3".to_string(), vec![entry_str]),
        Some("sh") => ("sh".to_string(), vec![entry_str]),
        _ => (entry_str, Vec::new()),
    }
}

/// The production launcher: one `tokio::process` child per execution.
///
/// The child runs in the block directory with a minimal environment
/// carrying the execution id, thread id, parent ids, and block identity.
/// Structured messages travel as JSON lines over stdin/stdout; stdout
/// lines that are not messages, and all of stderr, are logged and never
/// surfaced to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl TokioLauncher {
    /// Create the launcher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Host variables the child still needs to run at all.
const INHERITED_ENV: [&str; 3] = ["PATH", "HOME", "LANG"];

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> SupervisorResult<ChildChannel> {
        let entry = spec.block_path.join(&spec.entry_point);
        let (program, args) = interpreter_for(&entry);

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .current_dir(&spec.block_path)
            .env_clear()
            .env("TOLLGATE_EXECUTION_ID", spec.execution_id.0.to_string())
            .env("TOLLGATE_BLOCK_ID", &spec.block_id)
            .env("TOLLGATE_BLOCK_PATH", spec.block_path.display().to_string())
            .env("TOLLGATE_THREAD_ID", &spec.thread_id)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        for key in INHERITED_ENV {
            if let Ok(value) = std::env::var(key) {
                cmd.env(key, value);
            }
        }
        if let Some(parent) = &spec.parent_agent_id {
            cmd.env("TOLLGATE_PARENT_AGENT_ID", parent);
        }
        if let Some(instance) = &spec.parent_instance_id {
            cmd.env("TOLLGATE_PARENT_INSTANCE_ID", instance);
        }
        if let Some(port) = spec.gateway_port {
            cmd.env("TOLLGATE_GATEWAY_PORT", port.to_string());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| SupervisorError::Launch(format!("{program}: {e}")))?;

        debug!(
            execution_id = %spec.execution_id,
            block = %spec.block_name,
            %program,
            "Child process spawned"
        );

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SupervisorError::Launch("child stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SupervisorError::Launch("child stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SupervisorError::Launch("child stderr not captured".into()))?;

        let (to_child_tx, mut to_child_rx) = mpsc::unbounded_channel::<SupervisorMessage>();
        let (from_child_tx, from_child_rx) = mpsc::unbounded_channel::<ChildEvent>();
        let (kill_tx, mut kill_rx) = mpsc::unbounded_channel::<()>();

        // Stderr is captured and logged, never surfaced.
        let execution_id = spec.execution_id;
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(%execution_id, "child stderr: {line}");
            }
        });

        // I/O task owning the child: stdin writes, stdout parsing, exit.
        tokio::spawn(async move {
            let mut stdout_lines = BufReader::new(stdout).lines();
            let mut stdout_done = false;
            let mut messages_open = true;
            // The kill channel gets its own flag: the supervisor may queue
            // a kill and drop its end in the same instant, and the queued
            // kill must still be delivered after the message side closes.
            let mut kill_open = true;
            let exit_code = loop {
                tokio::select! {
                    msg = to_child_rx.recv(), if messages_open => {
                        if let Some(msg) = msg {
                            if let Ok(mut line) = serde_json::to_vec(&msg) {
                                line.push(b'\n');
                                if let Err(e) = stdin.write_all(&line).await {
                                    warn!(%execution_id, error = %e, "Write to child failed");
                                }
                            }
                        } else {
                            messages_open = false;
                        }
                    },
                    kill = kill_rx.recv(), if kill_open => {
                        match kill {
                            Some(()) => {
                                if let Err(e) = child.start_kill() {
                                    warn!(%execution_id, error = %e, "Kill failed");
                                }
                            },
                            None => kill_open = false,
                        }
                    },
                    line = stdout_lines.next_line(), if !stdout_done => {
                        match line {
                            Ok(Some(line)) => forward_line(&from_child_tx, execution_id, &line),
                            Ok(None) => stdout_done = true,
                            Err(e) => {
                                stdout_done = true;
                                let _ = from_child_tx.send(ChildEvent::Fault(e.to_string()));
                            },
                        }
                    },
                    status = child.wait() => {
                        // Drain buffered messages before reporting the exit.
                        while let Ok(Some(line)) = stdout_lines.next_line().await {
                            forward_line(&from_child_tx, execution_id, &line);
                        }
                        break status.ok().and_then(|s| s.code());
                    },
                }
            };
            let _ = from_child_tx.send(ChildEvent::Exited { code: exit_code });
        });

        Ok(ChildChannel {
            to_child: to_child_tx,
            from_child: from_child_rx,
            kill: kill_tx,
        })
    }
}

/// Parse one stdout line: structured messages are forwarded, anything else
/// is block output and only logged.
fn forward_line(
    events: &mpsc::UnboundedSender<ChildEvent>,
    execution_id: ExecutionId,
    line: &str,
) {
    match serde_json::from_str::<ChildMessage>(line) {
        Ok(msg) => {
            let _ = events.send(ChildEvent::Message(msg));
        },
        Err(_) => debug!(%execution_id, "child stdout: {line}"),
    }
}
