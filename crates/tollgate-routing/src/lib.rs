//! Proxy routing for the Tollgate execution gateway.
//!
//! Decides, per event category and deployment profile, whether a request is
//! handled by the gateway itself or forwarded to a proxy target. The two
//! decision tables are static data, not branching logic: adding a category
//! is a one-line row per table. The active table is chosen once at process
//! start and is immutable thereafter.
//!
//! # Invariant
//!
//! [`EventCategory::JobEvent`] is pinned to `Proxy` in **both** tables. Job
//! state requires durable external storage and must never resolve locally.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use tollgate_core::EventCategory;

/// The operating mode that selects which routing table is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentProfile {
    /// Interactive console front end attached.
    Interactive,
    /// Headless worker with no console.
    Headless,
}

/// Where a proxied request is forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyTarget {
    /// The cloud executor.
    Cloud,
    /// The hosting application.
    App,
}

impl fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloud => f.write_str("cloud"),
            Self::App => f.write_str("app"),
        }
    }
}

/// The routing decision for one event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "proxyType", rename_all = "lowercase")]
pub enum Route {
    /// Handle in the gateway itself.
    Local,
    /// Forward to an external executor.
    Proxy {
        /// The forwarding target.
        #[serde(rename = "primaryProxy")]
        target: ProxyTarget,
    },
}

impl Route {
    /// Whether this decision keeps the request local.
    #[must_use]
    pub fn is_local(self) -> bool {
        matches!(self, Self::Local)
    }
}

/// Shorthand rows for the tables below.
const LOCAL: Route = Route::Local;
const CLOUD: Route = Route::Proxy {
    target: ProxyTarget::Cloud,
};
const APP: Route = Route::Proxy {
    target: ProxyTarget::App,
};

/// Routing table for the interactive-console profile.
const INTERACTIVE_TABLE: [(EventCategory, Route); 25] = [
    (EventCategory::FsEvent, LOCAL),
    (EventCategory::GitEvent, LOCAL),
    (EventCategory::BrowserEvent, APP),
    (EventCategory::TerminalEvent, LOCAL),
    (EventCategory::LlmEvent, LOCAL),
    (EventCategory::TaskEvent, LOCAL),
    (EventCategory::JobEvent, CLOUD),
    (EventCategory::HookEvent, LOCAL),
    (EventCategory::NotificationEvent, APP),
    (EventCategory::HistoryEvent, LOCAL),
    (EventCategory::CodemapEvent, LOCAL),
    (EventCategory::MemoryEvent, LOCAL),
    (EventCategory::VectordbEvent, LOCAL),
    (EventCategory::CrawlerEvent, APP),
    (EventCategory::DebugEvent, APP),
    (EventCategory::TokenizerEvent, LOCAL),
    (EventCategory::ChatEvent, APP),
    (EventCategory::StateEvent, LOCAL),
    (EventCategory::ProjectEvent, LOCAL),
    (EventCategory::MessageEvent, APP),
    (EventCategory::AgentEvent, LOCAL),
    (EventCategory::ToolEvent, LOCAL),
    (EventCategory::OrchestratorEvent, LOCAL),
    (EventCategory::SideExecutionEvent, LOCAL),
    (EventCategory::AppEvent, APP),
];

/// Routing table for the headless profile.
const HEADLESS_TABLE: [(EventCategory, Route); 25] = [
    (EventCategory::FsEvent, LOCAL),
    (EventCategory::GitEvent, LOCAL),
    (EventCategory::BrowserEvent, CLOUD),
    (EventCategory::TerminalEvent, LOCAL),
    (EventCategory::LlmEvent, CLOUD),
    (EventCategory::TaskEvent, CLOUD),
    (EventCategory::JobEvent, CLOUD),
    (EventCategory::HookEvent, LOCAL),
    (EventCategory::NotificationEvent, CLOUD),
    (EventCategory::HistoryEvent, CLOUD),
    (EventCategory::CodemapEvent, LOCAL),
    (EventCategory::MemoryEvent, CLOUD),
    (EventCategory::VectordbEvent, CLOUD),
    (EventCategory::CrawlerEvent, CLOUD),
    (EventCategory::DebugEvent, LOCAL),
    (EventCategory::TokenizerEvent, LOCAL),
    (EventCategory::ChatEvent, CLOUD),
    (EventCategory::StateEvent, CLOUD),
    (EventCategory::ProjectEvent, LOCAL),
    (EventCategory::MessageEvent, CLOUD),
    (EventCategory::AgentEvent, CLOUD),
    (EventCategory::ToolEvent, LOCAL),
    (EventCategory::OrchestratorEvent, CLOUD),
    (EventCategory::SideExecutionEvent, LOCAL),
    (EventCategory::AppEvent, CLOUD),
];

/// The routing engine: one immutable table, chosen at construction.
#[derive(Debug, Clone)]
pub struct ProxyRoutingEngine {
    profile: DeploymentProfile,
    table: HashMap<EventCategory, Route>,
}

impl ProxyRoutingEngine {
    /// Build the engine for a deployment profile.
    #[must_use]
    pub fn new(profile: DeploymentProfile) -> Self {
        let rows = match profile {
            DeploymentProfile::Interactive => &INTERACTIVE_TABLE,
            DeploymentProfile::Headless => &HEADLESS_TABLE,
        };
        Self {
            profile,
            table: rows.iter().copied().collect(),
        }
    }

    /// The profile this engine was built for.
    #[must_use]
    pub fn profile(&self) -> DeploymentProfile {
        self.profile
    }

    /// Resolve the routing decision for an event category.
    ///
    /// Total over [`EventCategory`]: every category has a row in both
    /// tables, so an unknown category is unrepresentable.
    #[must_use]
    pub fn resolve(&self, category: EventCategory) -> Route {
        // Both tables cover EventCategory::ALL; see tests.
        self.table.get(&category).copied().unwrap_or(CLOUD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_cover_every_category() {
        for profile in [DeploymentProfile::Interactive, DeploymentProfile::Headless] {
            let engine = ProxyRoutingEngine::new(profile);
            assert_eq!(engine.table.len(), EventCategory::ALL.len());
            for cat in EventCategory::ALL {
                // Resolve must not fall back for any known category.
                let _ = engine.resolve(cat);
                assert!(engine.table.contains_key(&cat), "missing row for {cat}");
            }
        }
    }

    #[test]
    fn test_job_event_always_proxies() {
        for profile in [DeploymentProfile::Interactive, DeploymentProfile::Headless] {
            let engine = ProxyRoutingEngine::new(profile);
            let route = engine.resolve(EventCategory::JobEvent);
            assert!(
                !route.is_local(),
                "jobEvent must never resolve locally ({profile:?})"
            );
        }
    }

    #[test]
    fn test_fs_local_in_both_profiles() {
        for profile in [DeploymentProfile::Interactive, DeploymentProfile::Headless] {
            let engine = ProxyRoutingEngine::new(profile);
            assert!(engine.resolve(EventCategory::FsEvent).is_local());
        }
    }

    #[test]
    fn test_profiles_differ_where_expected() {
        let interactive = ProxyRoutingEngine::new(DeploymentProfile::Interactive);
        let headless = ProxyRoutingEngine::new(DeploymentProfile::Headless);

        assert!(interactive.resolve(EventCategory::LlmEvent).is_local());
        assert_eq!(
            headless.resolve(EventCategory::LlmEvent),
            Route::Proxy {
                target: ProxyTarget::Cloud
            }
        );
    }

    #[test]
    fn test_route_wire_shape() {
        // The wire shape matches the routing profile contract:
        // {"proxyType": "local"} | {"proxyType": "proxy", "primaryProxy": ...}
        let local = serde_json::to_value(Route::Local).unwrap();
        assert_eq!(local["proxyType"], "local");

        let proxied = serde_json::to_value(Route::Proxy {
            target: ProxyTarget::App,
        })
        .unwrap();
        assert_eq!(proxied["proxyType"], "proxy");
        assert_eq!(proxied["primaryProxy"], "app");
    }
}
