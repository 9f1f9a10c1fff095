//! Request dispatch: routing, permission gating, approval, execution.
//!
//! Every request follows the same pipeline: resolve the route for its
//! event category, forward proxied requests to the owning peer, gate
//! local requests through the permission authority (suspending on `Ask`
//! for the approval workflow), then execute. Each pipeline stage failure
//! becomes a failure response to the origin; no request goes unanswered.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use tollgate_actionblocks::ActionBlockRegistry;
use tollgate_approval::{ApprovalOutcome, ApprovalWorkflow};
use tollgate_connections::{Connection, ConnectionRegistry};
use tollgate_core::{
    AccessKind, ConnectionId, ConnectionRole, GatewayError, GatewayResult, Notification,
    RequestEnvelope, RequestPayload, ResponseEnvelope, ServerFrame,
};
use tollgate_permissions::{Decision, PermissionAuthority, PermissionScope};
use tollgate_routing::{ProxyRoutingEngine, ProxyTarget, Route};
use tollgate_supervisor::{SideExecutionSupervisor, SupervisorError};

use crate::executor::RequestExecutor;
use crate::services::Services;

/// Dispatches one request at a time through route, gate, and execute.
pub struct RequestDispatcher {
    registry: Arc<ConnectionRegistry>,
    authority: Arc<PermissionAuthority>,
    routing: Arc<ProxyRoutingEngine>,
    blocks: Arc<ActionBlockRegistry>,
    approval: Arc<ApprovalWorkflow>,
    supervisor: Arc<SideExecutionSupervisor>,
    executor: Arc<dyn RequestExecutor>,
}

impl RequestDispatcher {
    /// Wire a dispatcher over an existing service graph.
    #[must_use]
    pub fn new(services: &Services, executor: Arc<dyn RequestExecutor>) -> Self {
        Self {
            registry: Arc::clone(&services.registry),
            authority: Arc::clone(&services.authority),
            routing: Arc::clone(&services.routing),
            blocks: Arc::clone(&services.blocks),
            approval: Arc::clone(&services.approval),
            supervisor: Arc::clone(&services.supervisor),
            executor,
        }
    }

    /// Run one request to completion and answer the origin.
    ///
    /// The response goes back on the origin's outbound channel whatever
    /// happens in between; only an origin that disconnected mid-flight
    /// gets nothing, and that is logged.
    pub async fn dispatch(&self, origin_id: ConnectionId, envelope: RequestEnvelope) {
        let Some(origin) = self.registry.get(origin_id) else {
            warn!(origin = %origin_id, "Request from unregistered connection dropped");
            return;
        };

        let request_id = envelope.request_id;
        let operation = envelope.payload.operation();
        let response = match self.handle(&origin, envelope).await {
            Ok(data) => {
                debug!(%request_id, operation, "Request completed");
                ResponseEnvelope::ok(request_id, data)
            },
            Err(err) => {
                if err.is_rejection() {
                    info!(%request_id, operation, %err, "Request rejected");
                } else {
                    warn!(%request_id, operation, %err, "Request failed");
                }
                ResponseEnvelope::err(request_id, err.to_string())
            },
        };

        if !self.registry.send(origin_id, &ServerFrame::Response(response)) {
            warn!(%request_id, origin = %origin_id, "Origin disconnected before its response");
        }
    }

    async fn handle(
        &self,
        origin: &Arc<Connection>,
        envelope: RequestEnvelope,
    ) -> GatewayResult<Value> {
        let category = envelope.payload.category();
        if let Route::Proxy { target } = self.routing.resolve(category) {
            return self.forward(origin, envelope, target);
        }
        self.authorize(origin, &envelope.payload).await?;
        self.execute(origin, &envelope.payload).await
    }

    /// Hand a proxied request to the peer that owns this origin.
    ///
    /// The bridge peer is the origin's parent application when one is
    /// connected, else any console. The peer relays to its proxy target;
    /// the gateway only certifies the hand-off.
    fn forward(
        &self,
        origin: &Arc<Connection>,
        envelope: RequestEnvelope,
        target: ProxyTarget,
    ) -> GatewayResult<Value> {
        let operation = envelope.payload.operation();
        let Some(peer) = self.registry.approval_target(origin) else {
            return Err(GatewayError::Transport(format!(
                "no peer connected to proxy {operation} to {target}"
            )));
        };

        let frame = ServerFrame::Forward {
            origin: origin.id,
            envelope,
        };
        if !self.registry.send(peer.id, &frame) {
            return Err(GatewayError::Transport(format!(
                "proxy peer {} disconnected before {operation} could be forwarded",
                peer.id
            )));
        }
        debug!(operation, peer = %peer.id, %target, "Request forwarded");
        Ok(json!({
            "forwarded": true,
            "target": target,
            "peer": peer.id,
        }))
    }

    /// Gate a local payload through grants, trust, and approval.
    async fn authorize(
        &self,
        origin: &Arc<Connection>,
        payload: &RequestPayload,
    ) -> GatewayResult<()> {
        let Some(scope) = scope_for(payload) else {
            return Ok(());
        };

        match self.authority.evaluate(&scope) {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(GatewayError::rejected(format!("{scope} denied by policy"))),
            Decision::Ask => {
                if self.trusted_resource(&scope) {
                    debug!(%scope, "Resource in a trusted folder, approval skipped");
                    return Ok(());
                }
                match self.approval.request_approval(origin, scope).await {
                    ApprovalOutcome::Approved | ApprovalOutcome::Bypassed => Ok(()),
                    ApprovalOutcome::Rejected { reason } => Err(GatewayError::rejected(reason)),
                }
            },
        }
    }

    /// Whether the scope's resource is a path inside a trusted folder.
    fn trusted_resource(&self, scope: &PermissionScope) -> bool {
        let path = Path::new(&scope.resource);
        path.is_absolute() && self.authority.is_folder_trusted(path)
    }

    /// Run an authorized payload.
    ///
    /// Action-block operations resolve against the supervisor directly;
    /// everything else goes to the configured executor.
    async fn execute(
        &self,
        origin: &Arc<Connection>,
        payload: &RequestPayload,
    ) -> GatewayResult<Value> {
        match payload {
            RequestPayload::ListActionBlocks => Ok(self.list_blocks()),
            RequestPayload::StartActionBlock {
                name,
                thread_id,
                params,
            } => self.start_block(origin, name, thread_id, params.clone()).await,
            RequestPayload::StopSideExecution { execution_id } => {
                self.supervisor
                    .stop_side_execution(*execution_id)
                    .await
                    .map_err(supervisor_error)?;
                Ok(json!({ "stopped": true }))
            },
            RequestPayload::JobState { .. } => Err(GatewayError::validation(
                "job state is never resolved locally",
            )),
            other => self.executor.execute(origin, other).await,
        }
    }

    fn list_blocks(&self) -> Value {
        let blocks: Vec<Value> = self
            .blocks
            .list()
            .into_iter()
            .map(|block| {
                json!({
                    "id": block.id,
                    "name": block.name,
                    "description": block.description,
                    "version": block.version,
                    "source": block.kind(),
                    "path": block.path,
                })
            })
            .collect();
        json!({ "blocks": blocks })
    }

    async fn start_block(
        &self,
        origin: &Arc<Connection>,
        name: &str,
        thread_id: &str,
        params: Value,
    ) -> GatewayResult<Value> {
        let block = self
            .blocks
            .get(name)
            .ok_or_else(|| GatewayError::not_found(format!("action block '{name}'")))?;

        let execution_id = self
            .supervisor
            .start_side_execution(
                &block.path,
                thread_id,
                origin.instance_id.as_deref(),
                origin.parent_instance_id.as_deref(),
                json!({ "threadId": thread_id }),
                params,
            )
            .await
            .map_err(supervisor_error)?;

        // One watcher per execution: resolve the completion and tell the
        // observers, whichever way the child ends.
        let supervisor = Arc::clone(&self.supervisor);
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let (success, result) = match supervisor.wait_for_completion(execution_id).await {
                Ok(completion) => (completion.success, completion.result),
                Err(err) => {
                    warn!(%execution_id, %err, "Completion watcher lost its execution");
                    (false, None)
                },
            };
            let finished = ServerFrame::Notification(Notification::ExecutionFinished {
                execution_id,
                success,
                result,
            });
            registry.broadcast(ConnectionRole::Console, &finished);
            registry.broadcast(ConnectionRole::Application, &finished);
        });

        info!(%execution_id, block = %block.name, thread_id, "Side execution started");
        Ok(json!({ "executionId": execution_id }))
    }
}

/// The permission scope a payload must clear, if it is gated at all.
///
/// Inference and the read-only side-execution operations are ungated;
/// stopping an execution is bounded by knowing its id.
fn scope_for(payload: &RequestPayload) -> Option<PermissionScope> {
    match payload {
        RequestPayload::ReadFile { path } => {
            Some(PermissionScope::new("read_file", path, AccessKind::Read))
        },
        RequestPayload::WriteFile { path, .. } => {
            Some(PermissionScope::new("write_file", path, AccessKind::Write))
        },
        RequestPayload::DeleteFile { path } => {
            Some(PermissionScope::new("delete_file", path, AccessKind::Write))
        },
        RequestPayload::ExecuteCommand { command, .. } => Some(PermissionScope::new(
            "execute_command",
            command,
            AccessKind::Execute,
        )),
        RequestPayload::Git { args } => Some(PermissionScope::new(
            "git",
            args.first().map_or("", String::as_str),
            AccessKind::Execute,
        )),
        RequestPayload::StartActionBlock { name, .. } => {
            Some(PermissionScope::new("action_block", name, AccessKind::Execute))
        },
        RequestPayload::Inference { .. }
        | RequestPayload::ListActionBlocks
        | RequestPayload::StopSideExecution { .. }
        | RequestPayload::JobState { .. } => None,
    }
}

/// Map supervisor failures onto the gateway taxonomy.
fn supervisor_error(err: SupervisorError) -> GatewayError {
    match err {
        SupervisorError::InvalidBlock { path, reasons } => GatewayError::validation(format!(
            "action block at {path} is not runnable: {reasons}"
        )),
        SupervisorError::HandshakeTimeout { id, seconds } => GatewayError::Timeout {
            operation: format!("handshake for execution {id}"),
            seconds,
        },
        SupervisorError::UnknownExecution(id) => {
            GatewayError::not_found(format!("execution {id}"))
        },
        other => GatewayError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tollgate_connections::{OutboundReceiver, outbound_channel};
    use tollgate_core::{ClientFrame, RegisterInfo};
    use tollgate_routing::DeploymentProfile;
    use tollgate_supervisor::{
        ChildChannel, ChildEvent, ChildMessage, LaunchSpec, ProcessLauncher, SupervisorResult,
    };

    use crate::config::GatewayConfig;
    use crate::executor::NullExecutor;

    /// Launcher whose children register immediately and then complete
    /// with success, without any OS process.
    struct InstantLauncher;

    #[async_trait]
    impl ProcessLauncher for InstantLauncher {
        async fn launch(&self, spec: &LaunchSpec) -> SupervisorResult<ChildChannel> {
            let (to_child, _inbox) = tokio::sync::mpsc::unbounded_channel();
            let (events_tx, from_child) = tokio::sync::mpsc::unbounded_channel();
            let (kill, _kill_rx) = tokio::sync::mpsc::unbounded_channel();

            let execution_id = spec.execution_id;
            let _ = events_tx.send(ChildEvent::Message(ChildMessage::Register { execution_id }));
            let _ = events_tx.send(ChildEvent::Message(ChildMessage::Complete {
                execution_id,
                success: true,
                result: Some(json!({ "done": true })),
                error: None,
            }));
            Ok(ChildChannel {
                to_child,
                from_child,
                kill,
            })
        }
    }

    struct Fixture {
        services: Services,
        dispatcher: RequestDispatcher,
    }

    impl Fixture {
        fn new(profile: DeploymentProfile) -> Self {
            Self::with_config(GatewayConfig {
                profile,
                ..GatewayConfig::default()
            })
        }

        fn with_config(config: GatewayConfig) -> Self {
            let services =
                Services::build_with_launcher(&config, None, Arc::new(InstantLauncher));
            let dispatcher = RequestDispatcher::new(&services, Arc::new(NullExecutor));
            Self {
                services,
                dispatcher,
            }
        }

        fn connect(
            &self,
            role: ConnectionRole,
            parent_id: Option<ConnectionId>,
        ) -> (ConnectionId, OutboundReceiver) {
            let (tx, rx) = outbound_channel();
            let connection = Connection::from_register(
                RegisterInfo {
                    role,
                    project: None,
                    thread_id: None,
                    instance_id: None,
                    parent_instance_id: None,
                    parent_id,
                },
                tx,
            );
            let id = connection.id;
            self.services.registry.register(connection);
            (id, rx)
        }
    }

    fn recv_frame(rx: &mut OutboundReceiver) -> ServerFrame {
        let bytes = rx.try_recv().expect("expected a queued frame");
        serde_json::from_slice(&bytes).expect("frame must parse")
    }

    fn response_of(frame: ServerFrame) -> ResponseEnvelope {
        match frame {
            ServerFrame::Response(response) => response,
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_allowed_read_reaches_the_executor() {
        let fixture = Fixture::new(DeploymentProfile::Interactive);
        let (agent, mut rx) = fixture.connect(ConnectionRole::Agent, None);

        // Reads are Allow by default policy; NullExecutor then reports
        // the missing adapter, proving the gate was passed.
        let envelope = RequestEnvelope::new(RequestPayload::ReadFile {
            path: "/tmp/in.txt".into(),
        });
        fixture.dispatcher.dispatch(agent, envelope).await;

        let response = response_of(recv_frame(&mut rx));
        assert!(!response.success);
        assert!(
            response
                .error
                .as_deref()
                .is_some_and(|e| e.contains("no local executor"))
        );
    }

    #[tokio::test]
    async fn test_write_without_approver_is_bypassed() {
        let fixture = Fixture::new(DeploymentProfile::Interactive);
        let (agent, mut rx) = fixture.connect(ConnectionRole::Agent, None);

        // Writes Ask; with no console connected the approval is bypassed
        // and the request reaches the executor.
        let envelope = RequestEnvelope::new(RequestPayload::WriteFile {
            path: "/tmp/out.txt".into(),
            content: "data".into(),
        });
        fixture.dispatcher.dispatch(agent, envelope).await;

        let response = response_of(recv_frame(&mut rx));
        assert!(
            response
                .error
                .as_deref()
                .is_some_and(|e| e.contains("write_file"))
        );
    }

    #[tokio::test]
    async fn test_denied_scope_is_rejected_without_execution() {
        let fixture = Fixture::new(DeploymentProfile::Interactive);
        let (agent, mut rx) = fixture.connect(ConnectionRole::Agent, None);

        fixture
            .services
            .authority
            .add_policy(tollgate_permissions::PermissionPolicy::new(
                "lockdown",
                vec![tollgate_permissions::PermissionRule::policy_rule(
                    "execute_command",
                    "*",
                    AccessKind::Execute,
                    Decision::Deny,
                    50,
                )],
                Decision::Deny,
            ))
            .unwrap();

        let envelope = RequestEnvelope::new(RequestPayload::ExecuteCommand {
            command: "rm".into(),
            args: vec!["-rf".into(), "/".into()],
        });
        fixture.dispatcher.dispatch(agent, envelope).await;

        let response = response_of(recv_frame(&mut rx));
        assert!(!response.success);
        assert!(
            response
                .error
                .as_deref()
                .is_some_and(|e| e.contains("denied by policy"))
        );
    }

    #[tokio::test]
    async fn test_ask_suspends_until_console_approves() {
        let fixture = Fixture::new(DeploymentProfile::Interactive);
        let (agent, mut agent_rx) = fixture.connect(ConnectionRole::Agent, None);
        let (console, mut console_rx) = fixture.connect(ConnectionRole::Console, None);

        let dispatcher = Arc::new(fixture.dispatcher);
        let approval = Arc::clone(&fixture.services.approval);

        let envelope = RequestEnvelope::new(RequestPayload::WriteFile {
            path: "/tmp/gated.txt".into(),
            content: "data".into(),
        });
        let running = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.dispatch(agent, envelope).await }
        });
        tokio::task::yield_now().await;

        // The console got the approval prompt, not the agent.
        let ServerFrame::Notification(Notification::ApprovalRequested {
            message_id, tool, ..
        }) = recv_frame(&mut console_rx)
        else {
            panic!("console should see the approval request");
        };
        assert_eq!(tool, "write_file");
        assert!(agent_rx.try_recv().is_err());

        assert!(approval.handle_confirmation(message_id, "Approve"));
        running.await.unwrap();

        // Approved and executed (NullExecutor reports the adapter gap).
        let response = response_of(recv_frame(&mut agent_rx));
        assert!(
            response
                .error
                .as_deref()
                .is_some_and(|e| e.contains("no local executor"))
        );
        // The console sees the resolution broadcast.
        let ServerFrame::Notification(Notification::ApprovalResolved { approved, .. }) =
            recv_frame(&mut console_rx)
        else {
            panic!("console should see the resolution");
        };
        assert!(approved);
        let _ = console;
    }

    #[tokio::test]
    async fn test_trusted_folder_skips_approval() {
        let fixture = Fixture::new(DeploymentProfile::Interactive);
        let (agent, mut agent_rx) = fixture.connect(ConnectionRole::Agent, None);
        let (_console, mut console_rx) = fixture.connect(ConnectionRole::Console, None);

        fixture
            .services
            .authority
            .grant_folder_trust("/workspace", tollgate_core::TrustLevel::Full, "console")
            .unwrap();

        let envelope = RequestEnvelope::new(RequestPayload::WriteFile {
            path: "/workspace/src/main.rs".into(),
            content: "fn main() {}".into(),
        });
        fixture.dispatcher.dispatch(agent, envelope).await;

        // No prompt; the request went straight through the gate.
        assert!(console_rx.try_recv().is_err());
        let response = response_of(recv_frame(&mut agent_rx));
        assert!(
            response
                .error
                .as_deref()
                .is_some_and(|e| e.contains("no local executor"))
        );
    }

    #[tokio::test]
    async fn test_proxied_category_is_forwarded_to_console() {
        let fixture = Fixture::new(DeploymentProfile::Headless);
        let (agent, mut agent_rx) = fixture.connect(ConnectionRole::Agent, None);
        let (console, mut console_rx) = fixture.connect(ConnectionRole::Console, None);

        // In the headless profile LLM inference is proxied to the cloud.
        let envelope = RequestEnvelope::new(RequestPayload::Inference {
            prompt: "summarize".into(),
        });
        let request_id = envelope.request_id;
        fixture.dispatcher.dispatch(agent, envelope).await;

        let ServerFrame::Forward {
            origin,
            envelope: forwarded,
        } = recv_frame(&mut console_rx)
        else {
            panic!("console should receive the forward");
        };
        assert_eq!(origin, agent);
        assert_eq!(forwarded.request_id, request_id);

        let response = response_of(recv_frame(&mut agent_rx));
        assert!(response.success);
        let _ = console;
    }

    #[tokio::test]
    async fn test_forward_prefers_parent_application() {
        let fixture = Fixture::new(DeploymentProfile::Headless);
        let (app, mut app_rx) = fixture.connect(ConnectionRole::Application, None);
        let (_console, mut console_rx) = fixture.connect(ConnectionRole::Console, None);
        let (agent, mut agent_rx) = fixture.connect(ConnectionRole::Agent, Some(app));

        let envelope = RequestEnvelope::new(RequestPayload::JobState {
            job_id: "job-1".into(),
        });
        fixture.dispatcher.dispatch(agent, envelope).await;

        assert!(matches!(
            recv_frame(&mut app_rx),
            ServerFrame::Forward { .. }
        ));
        assert!(console_rx.try_recv().is_err());
        assert!(response_of(recv_frame(&mut agent_rx)).success);
    }

    #[tokio::test]
    async fn test_proxy_without_any_peer_fails_with_a_response() {
        let fixture = Fixture::new(DeploymentProfile::Headless);
        let (agent, mut agent_rx) = fixture.connect(ConnectionRole::Agent, None);

        let envelope = RequestEnvelope::new(RequestPayload::JobState {
            job_id: "job-2".into(),
        });
        fixture.dispatcher.dispatch(agent, envelope).await;

        let response = response_of(recv_frame(&mut agent_rx));
        assert!(!response.success);
        assert!(
            response
                .error
                .as_deref()
                .is_some_and(|e| e.contains("no peer"))
        );
    }

    #[tokio::test]
    async fn test_list_blocks_empty_registry() {
        let fixture = Fixture::new(DeploymentProfile::Interactive);
        let (agent, mut rx) = fixture.connect(ConnectionRole::Agent, None);

        let envelope = RequestEnvelope::new(RequestPayload::ListActionBlocks);
        fixture.dispatcher.dispatch(agent, envelope).await;

        let response = response_of(recv_frame(&mut rx));
        assert!(response.success);
        assert_eq!(response.data, Some(json!({ "blocks": [] })));
    }

    #[tokio::test]
    async fn test_start_unknown_block_is_not_found() {
        let fixture = Fixture::new(DeploymentProfile::Interactive);
        let (agent, mut rx) = fixture.connect(ConnectionRole::Agent, None);

        let envelope = RequestEnvelope::new(RequestPayload::StartActionBlock {
            name: "missing".into(),
            thread_id: "t1".into(),
            params: Value::Null,
        });
        fixture.dispatcher.dispatch(agent, envelope).await;

        let response = response_of(recv_frame(&mut rx));
        assert!(!response.success);
        assert!(
            response
                .error
                .as_deref()
                .is_some_and(|e| e.contains("not found"))
        );
    }

    #[tokio::test]
    async fn test_start_block_runs_and_notifies_observers() {
        let project = tempfile::tempdir().unwrap();
        let block_dir = project.path().join(".codebolt/actionblocks/hello");
        std::fs::create_dir_all(block_dir.join("dist")).unwrap();
        std::fs::write(
            block_dir.join("actionblock.yml"),
            "name: hello\ndescription: demo block\n",
        )
        .unwrap();
        std::fs::write(block_dir.join("dist/index.js"), "// entry\n").unwrap();

        let fixture = Fixture::with_config(GatewayConfig {
            project_path: Some(project.path().to_path_buf()),
            ..GatewayConfig::default()
        });
        let (agent, mut agent_rx) = fixture.connect(ConnectionRole::Agent, None);
        let (_console, mut console_rx) = fixture.connect(ConnectionRole::Console, None);

        // Pre-grant so the console is not prompted.
        fixture
            .services
            .authority
            .grant_permission(
                &PermissionScope::new("action_block", "hello", AccessKind::Execute),
                false,
            )
            .unwrap();

        let envelope = RequestEnvelope::new(RequestPayload::StartActionBlock {
            name: "hello".into(),
            thread_id: "t1".into(),
            params: json!({ "x": 1 }),
        });
        fixture.dispatcher.dispatch(agent, envelope).await;

        let response = response_of(recv_frame(&mut agent_rx));
        assert!(response.success);
        assert!(
            response
                .data
                .as_ref()
                .and_then(|d| d.get("executionId"))
                .is_some()
        );

        // The watcher broadcasts the terminal state to observers.
        let frame = tokio::time::timeout(std::time::Duration::from_secs(2), console_rx.recv())
            .await
            .expect("finish notification within bound")
            .expect("console channel open");
        let frame: ServerFrame = serde_json::from_slice(&frame).unwrap();
        let ServerFrame::Notification(Notification::ExecutionFinished {
            success, result, ..
        }) = frame
        else {
            panic!("expected an execution-finished notification, got {frame:?}");
        };
        assert!(success);
        // The child's completion payload rides along to the observers.
        assert_eq!(result, Some(json!({ "done": true })));
    }

    #[tokio::test]
    async fn test_stop_unknown_execution_is_not_found() {
        let fixture = Fixture::new(DeploymentProfile::Interactive);
        let (agent, mut rx) = fixture.connect(ConnectionRole::Agent, None);

        let envelope = RequestEnvelope::new(RequestPayload::StopSideExecution {
            execution_id: tollgate_core::ExecutionId::new(),
        });
        fixture.dispatcher.dispatch(agent, envelope).await;

        let response = response_of(recv_frame(&mut rx));
        assert!(!response.success);
        assert!(
            response
                .error
                .as_deref()
                .is_some_and(|e| e.contains("not found"))
        );
    }

    #[test]
    fn test_scope_mapping() {
        let scope = scope_for(&RequestPayload::Git {
            args: vec!["push".into()],
        })
        .unwrap();
        assert_eq!(scope.tool, "git");
        assert_eq!(scope.resource, "push");
        assert_eq!(scope.access, AccessKind::Execute);

        assert!(scope_for(&RequestPayload::Inference { prompt: "p".into() }).is_none());
        assert!(scope_for(&RequestPayload::ListActionBlocks).is_none());
    }

    #[test]
    fn test_supervisor_error_mapping() {
        let err = supervisor_error(SupervisorError::HandshakeTimeout {
            id: tollgate_core::ExecutionId::new(),
            seconds: 30,
        });
        assert!(matches!(err, GatewayError::Timeout { seconds: 30, .. }));

        let err = supervisor_error(SupervisorError::UnknownExecution(
            tollgate_core::ExecutionId::new(),
        ));
        assert!(matches!(err, GatewayError::NotFound { .. }));
    }

    // Used by the socket server but exercised here: confirmation frames
    // decode next to request frames without ambiguity.
    #[test]
    fn test_client_frame_decoding_is_closed() {
        let raw = json!({
            "type": "confirmation",
            "messageId": tollgate_core::ApprovalId::new(),
            "userMessage": "approve",
        });
        let frame: ClientFrame = serde_json::from_value(raw).unwrap();
        assert!(matches!(frame, ClientFrame::Confirmation { .. }));

        let bogus = json!({ "type": "selfDestruct" });
        assert!(serde_json::from_value::<ClientFrame>(bogus).is_err());
    }
}
