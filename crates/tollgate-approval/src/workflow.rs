//! The pending-approval map and its resolution paths.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use tollgate_connections::{Connection, ConnectionRegistry};
use tollgate_core::{ApprovalId, ConnectionId, ConnectionRole, Notification, ServerFrame};
use tollgate_permissions::{PermissionAuthority, PermissionScope};

use crate::outcome::ApprovalOutcome;

/// How long a suspended request waits for a human decision (5 minutes).
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// One suspended request awaiting a decision.
struct PendingApproval {
    /// The connection whose request is suspended.
    origin: ConnectionId,
    /// The scope a grant will be committed for on approval.
    scope: PermissionScope,
    /// Resolved exactly once, by decision or timeout.
    waiter: oneshot::Sender<ApprovalOutcome>,
}

/// Suspends requests pending human approval and resolves them.
///
/// Approval commits a permanent grant for the exact scope before the
/// waiter is released, so a repeat of the same request passes the
/// authority without asking again.
pub struct ApprovalWorkflow {
    registry: Arc<ConnectionRegistry>,
    authority: Arc<PermissionAuthority>,
    pending: DashMap<ApprovalId, PendingApproval>,
    timeout: Duration,
}

impl ApprovalWorkflow {
    /// Create a workflow with the default timeout.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, authority: Arc<PermissionAuthority>) -> Self {
        Self::with_timeout(registry, authority, DEFAULT_APPROVAL_TIMEOUT)
    }

    /// Create a workflow with an explicit timeout.
    #[must_use]
    pub fn with_timeout(
        registry: Arc<ConnectionRegistry>,
        authority: Arc<PermissionAuthority>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            authority,
            pending: DashMap::new(),
            timeout,
        }
    }

    /// Number of approvals currently suspended.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Suspend a request until a human decides.
    ///
    /// Resolves the approval target for `origin` (its parent application,
    /// else any console). With no target at all the workflow is bypassed:
    /// standalone mode has no human approver and the request proceeds.
    /// Otherwise an `ApprovalRequested` notification is pushed to the
    /// target and this call parks until a decision or the timeout. Timeout
    /// is a rejection; the pending entry is removed in every path.
    pub async fn request_approval(
        &self,
        origin: &Connection,
        scope: PermissionScope,
    ) -> ApprovalOutcome {
        let Some(target) = self.registry.approval_target(origin) else {
            debug!(origin = %origin.id, %scope, "No approver connected — bypassing approval");
            return ApprovalOutcome::Bypassed;
        };

        let message_id = ApprovalId::new();
        let (waiter, mut rx) = oneshot::channel();
        self.pending.insert(
            message_id,
            PendingApproval {
                origin: origin.id,
                scope: scope.clone(),
                waiter,
            },
        );

        let requested = ServerFrame::Notification(Notification::ApprovalRequested {
            message_id,
            tool: scope.tool.clone(),
            resource: scope.resource.clone(),
            origin: origin.id,
        });
        if !self.registry.send(target.id, &requested) {
            // Target transport died between resolution and push. Fail
            // closed rather than silently executing a gated operation.
            self.pending.remove(&message_id);
            warn!(%message_id, target = %target.id, "Approval target unreachable");
            return ApprovalOutcome::Rejected {
                reason: "approval target unreachable".into(),
            };
        }
        info!(%message_id, origin = %origin.id, target = %target.id, %scope, "Approval requested");

        match tokio::time::timeout(self.timeout, &mut rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                // Waiter dropped without a send; treat as rejection.
                self.pending.remove(&message_id);
                ApprovalOutcome::Rejected {
                    reason: "approval channel closed".into(),
                }
            },
            Err(_) => {
                if self.pending.remove(&message_id).is_some() {
                    warn!(%message_id, "Approval timed out");
                    self.notify_resolved(message_id, false, Some("approval timed out"));
                    ApprovalOutcome::Rejected {
                        reason: "approval timed out".into(),
                    }
                } else {
                    // A resolution won the race; its send is imminent.
                    match rx.await {
                        Ok(outcome) => outcome,
                        Err(_) => ApprovalOutcome::Rejected {
                            reason: "approval channel closed".into(),
                        },
                    }
                }
            },
        }
    }

    /// Completion path 1: a free-text confirmation.
    ///
    /// Only the literal, case-insensitive value `"approve"` proceeds;
    /// anything else rejects with the user's message as the reason.
    /// Returns whether a pending approval with this id existed.
    pub fn handle_confirmation(&self, message_id: ApprovalId, user_message: &str) -> bool {
        let approved = user_message.trim().eq_ignore_ascii_case("approve");
        let reason = if approved {
            None
        } else {
            Some(format!("rejected by user: {user_message}"))
        };
        self.resolve(message_id, approved, reason)
    }

    /// Completion path 2: a structured state notification.
    ///
    /// `"approved"` proceeds; any other state rejects.
    pub fn handle_state(&self, message_id: ApprovalId, state: &str) -> bool {
        let approved = state == "approved";
        let reason = if approved {
            None
        } else {
            Some(format!("rejected with state: {state}"))
        };
        self.resolve(message_id, approved, reason)
    }

    /// Take the pending entry, commit the grant on approval, release the
    /// waiter, and notify observers.
    fn resolve(&self, message_id: ApprovalId, approved: bool, reason: Option<String>) -> bool {
        let Some((_, pending)) = self.pending.remove(&message_id) else {
            warn!(%message_id, "Decision for unknown or already-resolved approval dropped");
            return false;
        };

        let outcome = if approved {
            // Commit before releasing the waiter so a repeat of the same
            // request sees the grant.
            if let Err(e) = self.authority.grant_permission(&pending.scope, true) {
                warn!(%message_id, error = %e, "Failed to commit approval grant");
            }
            info!(%message_id, origin = %pending.origin, scope = %pending.scope, "Approved");
            ApprovalOutcome::Approved
        } else {
            let reason = reason.unwrap_or_else(|| "rejected".into());
            info!(%message_id, origin = %pending.origin, %reason, "Rejected");
            ApprovalOutcome::Rejected { reason }
        };

        self.notify_resolved(message_id, approved, outcome.rejection_reason());
        if pending.waiter.send(outcome).is_err() {
            debug!(%message_id, "Waiter gone before resolution delivery");
        }
        true
    }

    /// Broadcast the resolution to observing consoles and applications.
    fn notify_resolved(&self, message_id: ApprovalId, approved: bool, reason: Option<&str>) {
        let frame = ServerFrame::Notification(Notification::ApprovalResolved {
            message_id,
            approved,
            reason: reason.map(str::to_owned),
        });
        self.registry.broadcast(ConnectionRole::Console, &frame);
        self.registry.broadcast(ConnectionRole::Application, &frame);
    }
}
