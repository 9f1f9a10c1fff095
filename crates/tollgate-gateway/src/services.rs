//! The composition root.
//!
//! Every subsystem is constructed here, once, and handed to its consumers
//! as an `Arc`. Nothing below this module reaches for a global: the
//! dispatcher, the socket server, and the binary all receive their
//! dependencies from a [`Services`] value, and tests build one with an
//! in-memory authority and a fake process launcher.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use tollgate_actionblocks::ActionBlockRegistry;
use tollgate_approval::ApprovalWorkflow;
use tollgate_connections::ConnectionRegistry;
use tollgate_core::dirs::TollgateHome;
use tollgate_permissions::PermissionAuthority;
use tollgate_routing::ProxyRoutingEngine;
use tollgate_supervisor::{ProcessLauncher, SideExecutionSupervisor, TokioLauncher};

use crate::config::GatewayConfig;

/// `permission_store` value that disables persistence.
pub const MEMORY_STORE: &str = ":memory:";

/// The gateway's wired subsystem graph.
///
/// Construction order matters only at build time; afterwards each field is
/// an independent handle and the struct is cheap to clone piecewise.
pub struct Services {
    /// Connected peers and their outbound channels.
    pub registry: Arc<ConnectionRegistry>,
    /// Permission grants, folder trust, and policies.
    pub authority: Arc<PermissionAuthority>,
    /// The active local/proxy decision table.
    pub routing: Arc<ProxyRoutingEngine>,
    /// Discovered action blocks.
    pub blocks: Arc<ActionBlockRegistry>,
    /// Human-in-the-loop approval workflow.
    pub approval: Arc<ApprovalWorkflow>,
    /// Side execution lifecycle supervisor.
    pub supervisor: Arc<SideExecutionSupervisor>,
}

impl Services {
    /// Wire the production graph for `config`.
    ///
    /// The permission store lands in `home` unless the config overrides
    /// it; a [`MEMORY_STORE`] override keeps grants session-only. The
    /// supervisor launches real OS processes.
    #[must_use]
    pub fn build(config: &GatewayConfig, home: Option<&TollgateHome>) -> Self {
        Self::build_with_launcher(config, home, Arc::new(TokioLauncher::new()))
    }

    /// Wire the graph with an injected process launcher.
    ///
    /// This is the test entry point: everything else is identical to the
    /// production graph.
    #[must_use]
    pub fn build_with_launcher(
        config: &GatewayConfig,
        home: Option<&TollgateHome>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let authority = Arc::new(build_authority(config, home));
        let routing = Arc::new(ProxyRoutingEngine::new(config.profile));
        let blocks = Arc::new(ActionBlockRegistry::init(config.project_path.as_deref()));
        let approval = Arc::new(ApprovalWorkflow::with_timeout(
            Arc::clone(&registry),
            Arc::clone(&authority),
            config.approval_timeout(),
        ));
        let supervisor = Arc::new(SideExecutionSupervisor::with_timeouts(
            Arc::clone(&blocks),
            launcher,
            config.supervisor_timeouts(),
        ));

        info!(
            profile = ?config.profile,
            blocks = blocks.list().len(),
            "Gateway services wired"
        );
        Self {
            registry,
            authority,
            routing,
            blocks,
            approval,
            supervisor,
        }
    }
}

fn build_authority(config: &GatewayConfig, home: Option<&TollgateHome>) -> PermissionAuthority {
    match (&config.permission_store, home) {
        (Some(path), _) if path.as_path() == Path::new(MEMORY_STORE) => {
            PermissionAuthority::in_memory()
        },
        (Some(path), _) => PermissionAuthority::with_store(path),
        (None, Some(home)) => PermissionAuthority::with_store(home.permission_store_path()),
        (None, None) => PermissionAuthority::in_memory(),
    }
}
