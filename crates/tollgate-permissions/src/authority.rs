//! The permission authority: session grants, persistent grants, folder
//! trust, and policy evaluation behind one synchronous interface.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info, warn};

use tollgate_core::TrustLevel;

use crate::error::{PermissionError, PermissionResult};
use crate::policy::{self, PermissionPolicy, default_policies};
use crate::rule::{Decision, PermissionRule};
use crate::scope::PermissionScope;
use crate::store::{PermissionDocument, PermissionStore};
use crate::trust::{self, TrustedFolder};

/// Evaluates and persists capability grants, folder trust, and policies.
///
/// Grant lookups check session grants first, then persistent grants, then
/// policy rules; the first valid (non-expired) hit decides. No match
/// anywhere yields [`Decision::Ask`] — the authority fails closed rather
/// than defaulting to allow.
pub struct PermissionAuthority {
    /// Session grants (in-memory, cleared on process exit).
    session: RwLock<HashMap<String, PermissionRule>>,
    /// Persistent grants (flushed to the store on every mutation).
    persistent: RwLock<HashMap<String, PermissionRule>>,
    /// Folder trust records.
    trusted: RwLock<HashMap<String, TrustedFolder>>,
    /// Named policies.
    policies: RwLock<HashMap<String, PermissionPolicy>>,
    /// Durable storage; `None` for in-memory-only authorities.
    store: Option<PermissionStore>,
}

impl PermissionAuthority {
    /// An in-memory authority with the default policies seeded.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            session: RwLock::new(HashMap::new()),
            persistent: RwLock::new(HashMap::new()),
            trusted: RwLock::new(HashMap::new()),
            policies: RwLock::new(seeded_policy_map(HashMap::new())),
            store: None,
        }
    }

    /// An authority backed by the JSON document at `path`.
    ///
    /// Load is best-effort: a missing or corrupt file yields an empty
    /// state. The three default policies are seeded if absent.
    #[must_use]
    pub fn with_store(path: impl AsRef<Path>) -> Self {
        let store = PermissionStore::new(path.as_ref());
        let doc = store.load();
        info!(
            path = %store.path().display(),
            grants = doc.granted_permissions.len(),
            folders = doc.trusted_folders.len(),
            policies = doc.policies.len(),
            "Permission authority initialized"
        );
        Self {
            session: RwLock::new(HashMap::new()),
            persistent: RwLock::new(doc.granted_permissions),
            trusted: RwLock::new(doc.trusted_folders),
            policies: RwLock::new(seeded_policy_map(doc.policies)),
            store: Some(store),
        }
    }

    // -- Grants --

    /// Evaluate a scope: session grants, persistent grants, then policies.
    ///
    /// Touches the matched grant's last-used stamp on a hit.
    #[must_use]
    pub fn evaluate(&self, scope: &PermissionScope) -> Decision {
        let key = scope.key();

        if let Some(decision) = self.table_decision(&self.session, &key, scope) {
            return decision;
        }
        if let Some(decision) = self.table_decision(&self.persistent, &key, scope) {
            return decision;
        }

        match self.policies.read() {
            Ok(policies) => policy::evaluate(&policies, scope).unwrap_or(Decision::Ask),
            Err(e) => {
                warn!(error = %e, "Policy lock poisoned — failing closed");
                Decision::Ask
            },
        }
    }

    /// Whether an explicit, valid allow exists or a policy allows the scope.
    #[must_use]
    pub fn has_permission(&self, scope: &PermissionScope) -> bool {
        self.evaluate(scope) == Decision::Allow
    }

    /// Grant an exact-scope allow rule.
    ///
    /// Persistent grants are flushed to the store immediately; flush
    /// failures are logged and leave the grant valid in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if an interior lock is poisoned.
    pub fn grant_permission(
        &self,
        scope: &PermissionScope,
        persistent: bool,
    ) -> PermissionResult<()> {
        let rule = PermissionRule::allow(scope);
        let table = if persistent {
            &self.persistent
        } else {
            &self.session
        };
        {
            let mut grants = table
                .write()
                .map_err(|e| PermissionError::Lock(e.to_string()))?;
            grants.insert(scope.key(), rule);
        }
        debug!(%scope, persistent, "Permission granted");
        if persistent {
            self.flush();
        }
        Ok(())
    }

    /// Remove a grant from both tables and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if an interior lock is poisoned.
    pub fn revoke_permission(&self, scope: &PermissionScope) -> PermissionResult<()> {
        let key = scope.key();
        {
            let mut session = self
                .session
                .write()
                .map_err(|e| PermissionError::Lock(e.to_string()))?;
            session.remove(&key);
        }
        {
            let mut persistent = self
                .persistent
                .write()
                .map_err(|e| PermissionError::Lock(e.to_string()))?;
            persistent.remove(&key);
        }
        debug!(%scope, "Permission revoked");
        self.flush();
        Ok(())
    }

    /// Clear all session grants.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lock is poisoned.
    pub fn clear_session(&self) -> PermissionResult<()> {
        let mut session = self
            .session
            .write()
            .map_err(|e| PermissionError::Lock(e.to_string()))?;
        session.clear();
        Ok(())
    }

    // -- Folder trust --

    /// Record a folder trust decision and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the trust lock is poisoned.
    pub fn grant_folder_trust(
        &self,
        path: impl Into<String>,
        level: TrustLevel,
        trusted_by: impl Into<String>,
    ) -> PermissionResult<()> {
        let record = TrustedFolder::new(path, level, trusted_by);
        let key = record.path.clone();
        {
            let mut trusted = self
                .trusted
                .write()
                .map_err(|e| PermissionError::Lock(e.to_string()))?;
            trusted.insert(key.clone(), record);
        }
        info!(path = %key, %level, "Folder trust granted");
        self.flush();
        Ok(())
    }

    /// Whether operations under `path` bypass per-operation approval.
    #[must_use]
    pub fn is_folder_trusted(&self, path: &Path) -> bool {
        match self.trusted.read() {
            Ok(trusted) => trust::is_trusted(&trusted, path),
            Err(e) => {
                warn!(error = %e, "Trust lock poisoned — treating as untrusted");
                false
            },
        }
    }

    /// The trust level applying to `path`, if any entry decides it.
    #[must_use]
    pub fn folder_trust(&self, path: &Path) -> Option<TrustLevel> {
        self.trusted
            .read()
            .ok()
            .and_then(|trusted| trust::effective_trust(&trusted, path))
    }

    // -- Policies --

    /// Insert or replace a policy and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy lock is poisoned.
    pub fn add_policy(&self, policy: PermissionPolicy) -> PermissionResult<()> {
        {
            let mut policies = self
                .policies
                .write()
                .map_err(|e| PermissionError::Lock(e.to_string()))?;
            policies.insert(policy.name.clone(), policy);
        }
        self.flush();
        Ok(())
    }

    /// Remove a policy by name and flush. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy lock is poisoned.
    pub fn remove_policy(&self, name: &str) -> PermissionResult<bool> {
        let removed = {
            let mut policies = self
                .policies
                .write()
                .map_err(|e| PermissionError::Lock(e.to_string()))?;
            policies.remove(name).is_some()
        };
        if removed {
            self.flush();
        }
        Ok(removed)
    }

    // -- Internals --

    /// Exact-key lookup in one grant table; touches last-used on a hit.
    fn table_decision(
        &self,
        table: &RwLock<HashMap<String, PermissionRule>>,
        key: &str,
        scope: &PermissionScope,
    ) -> Option<Decision> {
        let mut grants = match table.write() {
            Ok(g) => g,
            Err(e) => {
                warn!(error = %e, "Grant lock poisoned — skipping table");
                return None;
            },
        };
        let rule = grants.get_mut(key)?;
        if !rule.matches(scope) {
            // Expired grant: leave it for the next flush cycle to drop.
            return None;
        }
        rule.touch();
        Some(rule.decision)
    }

    /// Drop expired grants from both tables. Runs on every flush so a
    /// saved document never carries dead rules.
    fn prune_expired(&self) {
        for table in [&self.session, &self.persistent] {
            match table.write() {
                Ok(mut grants) => grants.retain(|_, rule| !rule.is_expired()),
                Err(e) => warn!(error = %e, "Grant lock poisoned — skipping prune"),
            }
        }
    }

    /// Write the whole document to the store, if one is configured.
    ///
    /// Write failures are logged only; the in-memory state stays
    /// authoritative for the session.
    fn flush(&self) {
        self.prune_expired();
        let Some(store) = &self.store else {
            return;
        };
        let mut doc = PermissionDocument {
            granted_permissions: self
                .persistent
                .read()
                .map(|g| g.clone())
                .unwrap_or_default(),
            trusted_folders: self.trusted.read().map(|t| t.clone()).unwrap_or_default(),
            policies: self.policies.read().map(|p| p.clone()).unwrap_or_default(),
            last_saved: None,
        };
        if let Err(e) = store.save(&mut doc) {
            warn!(error = %e, "Failed to flush permission store");
        }
    }
}

impl std::fmt::Debug for PermissionAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.read().map(|g| g.len()).unwrap_or(0);
        let persistent = self.persistent.read().map(|g| g.len()).unwrap_or(0);
        let trusted = self.trusted.read().map(|t| t.len()).unwrap_or(0);
        let policies = self.policies.read().map(|p| p.len()).unwrap_or(0);
        f.debug_struct("PermissionAuthority")
            .field("session_grants", &session)
            .field("persistent_grants", &persistent)
            .field("trusted_folders", &trusted)
            .field("policies", &policies)
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

/// Seed the three default policies into `existing` where absent.
fn seeded_policy_map(
    mut existing: HashMap<String, PermissionPolicy>,
) -> HashMap<String, PermissionPolicy> {
    for policy in default_policies() {
        existing.entry(policy.name.clone()).or_insert(policy);
    }
    existing
}
