//! The seam between dispatch and concrete operation adapters.
//!
//! The dispatcher owns routing, permission gating, and approval; it hands
//! an already-authorized payload to a [`RequestExecutor`] for the actual
//! file, shell, git, or inference work. Deployments wire their own adapter
//! into [`Services`]; the stock binary ships with [`NullExecutor`], which
//! answers every locally routed operation with a validation error instead
//! of going silent.
//!
//! [`Services`]: crate::services::Services

use async_trait::async_trait;
use serde_json::Value;

use tollgate_connections::Connection;
use tollgate_core::{GatewayError, GatewayResult, RequestPayload};

/// Executes an authorized, locally routed request payload.
///
/// Implementations never see denied or unapproved requests; by the time a
/// payload reaches `execute`, every gate has passed. Action-block
/// operations are resolved inside the dispatcher and never reach an
/// executor.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Perform the operation and produce the response data.
    ///
    /// # Errors
    ///
    /// Any error becomes a failure response to the origin; it must
    /// describe the fault well enough for the requester to act on it.
    async fn execute(&self, origin: &Connection, payload: &RequestPayload)
    -> GatewayResult<Value>;
}

/// An executor with no adapters attached.
///
/// Every call fails with a validation error naming the operation, so a
/// misconfigured deployment produces explicit responses rather than
/// dropped requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullExecutor;

#[async_trait]
impl RequestExecutor for NullExecutor {
    async fn execute(
        &self,
        _origin: &Connection,
        payload: &RequestPayload,
    ) -> GatewayResult<Value> {
        Err(GatewayError::validation(format!(
            "no local executor is configured for {}",
            payload.operation()
        )))
    }
}
