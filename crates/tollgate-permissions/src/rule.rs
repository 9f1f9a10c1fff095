//! Permission rules: the unit both grants and policies are made of.

use globset::Glob;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use tollgate_core::{AccessKind, Timestamp};

use crate::scope::PermissionScope;

/// Priority assigned to rules created by an explicit grant.
pub const GRANT_PRIORITY: i32 = 100;

/// What a matching rule decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Proceed without asking.
    Allow,
    /// Refuse outright.
    Deny,
    /// Suspend and ask a human.
    Ask,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
            Self::Ask => f.write_str("ask"),
        }
    }
}

/// One permission rule.
///
/// The scope triple may be partially wildcarded: `tool` and `resource`
/// accept the literal `*` (and `resource` any glob pattern);
/// [`AccessKind::All`] covers every access kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRule {
    /// Unique rule id.
    pub id: Uuid,
    /// Higher wins when several rules match.
    pub priority: i32,
    /// What this rule decides.
    pub decision: Decision,
    /// Tool name or `*`.
    pub tool: String,
    /// Resource path, glob pattern, or `*`.
    pub resource: String,
    /// Access kind; `All` matches any.
    pub access: AccessKind,
    /// Optional expiry; expired rules never match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    /// When the rule was created.
    pub created_at: Timestamp,
    /// When the rule last authorized a request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<Timestamp>,
}

impl PermissionRule {
    /// An allow rule for an exact scope, as created by an explicit grant.
    #[must_use]
    pub fn allow(scope: &PermissionScope) -> Self {
        Self {
            id: Uuid::new_v4(),
            priority: GRANT_PRIORITY,
            decision: Decision::Allow,
            tool: scope.tool.clone(),
            resource: scope.resource.clone(),
            access: scope.access,
            expires_at: None,
            created_at: Timestamp::now(),
            last_used_at: None,
        }
    }

    /// A policy rule with an explicit priority and decision.
    #[must_use]
    pub fn policy_rule(
        tool: impl Into<String>,
        resource: impl Into<String>,
        access: AccessKind,
        decision: Decision,
        priority: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            priority,
            decision,
            tool: tool.into(),
            resource: resource.into(),
            access,
            expires_at: None,
            created_at: Timestamp::now(),
            last_used_at: None,
        }
    }

    /// Whether this rule has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|t| t.is_past())
    }

    /// Whether this rule's (possibly wildcarded) scope covers `scope`.
    ///
    /// Expired rules never match.
    #[must_use]
    pub fn matches(&self, scope: &PermissionScope) -> bool {
        if self.is_expired() {
            return false;
        }
        if self.tool != "*" && self.tool != scope.tool {
            return false;
        }
        if !self.access.covers(scope.access) {
            return false;
        }
        resource_matches(&self.resource, &scope.resource)
    }

    /// Record that this rule just authorized a request.
    pub fn touch(&mut self) {
        self.last_used_at = Some(Timestamp::now());
    }
}

/// Match a rule resource pattern against a concrete resource.
///
/// `*` matches anything; an exact string matches itself; anything else is
/// treated as a glob.
fn resource_matches(pattern: &str, resource: &str) -> bool {
    if pattern == "*" || pattern == resource {
        return true;
    }
    match Glob::new(pattern) {
        Ok(glob) => glob.compile_matcher().is_match(resource),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scope(tool: &str, resource: &str, access: AccessKind) -> PermissionScope {
        PermissionScope::new(tool, resource, access)
    }

    #[test]
    fn test_exact_match() {
        let s = scope("write_file", "/tmp/x.txt", AccessKind::Write);
        let rule = PermissionRule::allow(&s);
        assert!(rule.matches(&s));
        assert!(!rule.matches(&scope("write_file", "/tmp/y.txt", AccessKind::Write)));
    }

    #[test]
    fn test_tool_wildcard() {
        let rule = PermissionRule::policy_rule(
            "*",
            "/tmp/x.txt",
            AccessKind::Write,
            Decision::Allow,
            10,
        );
        assert!(rule.matches(&scope("write_file", "/tmp/x.txt", AccessKind::Write)));
        assert!(rule.matches(&scope("delete_file", "/tmp/x.txt", AccessKind::Write)));
    }

    #[test]
    fn test_resource_glob() {
        let rule =
            PermissionRule::policy_rule("write_file", "/tmp/*", AccessKind::Write, Decision::Allow, 10);
        assert!(rule.matches(&scope("write_file", "/tmp/x.txt", AccessKind::Write)));
        assert!(!rule.matches(&scope("write_file", "/etc/passwd", AccessKind::Write)));
    }

    #[test]
    fn test_access_all_covers_everything() {
        let rule =
            PermissionRule::policy_rule("git", "*", AccessKind::All, Decision::Ask, 10);
        assert!(rule.matches(&scope("git", "repo", AccessKind::Read)));
        assert!(rule.matches(&scope("git", "repo", AccessKind::Execute)));
    }

    #[test]
    fn test_access_kind_must_be_covered() {
        let rule =
            PermissionRule::policy_rule("fs", "*", AccessKind::Read, Decision::Allow, 10);
        assert!(!rule.matches(&scope("fs", "/tmp", AccessKind::Write)));
    }

    #[test]
    fn test_expired_rule_never_matches() {
        let s = scope("write_file", "/tmp/x.txt", AccessKind::Write);
        let mut rule = PermissionRule::allow(&s);
        rule.expires_at = Some(Timestamp(chrono::Utc::now() - Duration::seconds(5)));
        assert!(rule.is_expired());
        assert!(!rule.matches(&s));
    }

    #[test]
    fn test_future_expiry_still_matches() {
        let s = scope("write_file", "/tmp/x.txt", AccessKind::Write);
        let mut rule = PermissionRule::allow(&s);
        rule.expires_at = Some(Timestamp(chrono::Utc::now() + Duration::hours(1)));
        assert!(!rule.is_expired());
        assert!(rule.matches(&s));
    }

    #[test]
    fn test_touch_records_use() {
        let s = scope("read_file", "/tmp/x.txt", AccessKind::Read);
        let mut rule = PermissionRule::allow(&s);
        assert!(rule.last_used_at.is_none());
        rule.touch();
        assert!(rule.last_used_at.is_some());
    }

    #[test]
    fn test_rule_serialization_roundtrip() {
        let rule = PermissionRule::allow(&scope("git", "/repo", AccessKind::Execute));
        let json = serde_json::to_string(&rule).unwrap();
        let back: PermissionRule = serde_json::from_str(&json).unwrap();
        assert_eq!(rule, back);
    }
}
