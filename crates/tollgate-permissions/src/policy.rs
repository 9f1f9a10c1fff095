//! Named permission policies.
//!
//! A policy is an ordered set of rules plus a default decision. Evaluation
//! collects matching rules across every *enabled* policy, sorts by priority
//! descending, and applies the top rule's decision. No match at all returns
//! `None`; the authority treats that as [`Decision::Ask`] (fail-closed).
//!
//! The three seeded defaults are data, not hardcoded branches: new tools
//! are added by inserting rules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use tollgate_core::AccessKind;

use crate::rule::{Decision, PermissionRule};
use crate::scope::PermissionScope;

/// A named, priority-ordered set of permission rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionPolicy {
    /// Unique policy name.
    pub name: String,
    /// The rules this policy contributes.
    pub rules: Vec<PermissionRule>,
    /// Recorded default for the policy's own scope of tools.
    pub default_decision: Decision,
    /// Disabled policies contribute no rules.
    pub enabled: bool,
}

impl PermissionPolicy {
    /// Create an enabled policy.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        rules: Vec<PermissionRule>,
        default_decision: Decision,
    ) -> Self {
        Self {
            name: name.into(),
            rules,
            default_decision,
            enabled: true,
        }
    }
}

/// Evaluate a scope against all enabled policies.
///
/// Returns the highest-priority matching rule's decision, or `None` when no
/// rule matches anywhere.
#[must_use]
pub fn evaluate(
    policies: &HashMap<String, PermissionPolicy>,
    scope: &PermissionScope,
) -> Option<Decision> {
    let mut matching: Vec<&PermissionRule> = policies
        .values()
        .filter(|p| p.enabled)
        .flat_map(|p| p.rules.iter())
        .filter(|r| r.matches(scope))
        .collect();
    matching.sort_by(|a, b| b.priority.cmp(&a.priority));
    matching.first().map(|r| r.decision)
}

/// Priority for the seeded default rules; low so explicit grants (priority
/// 100) always win.
const DEFAULT_RULE_PRIORITY: i32 = 10;

/// The three policies seeded on first startup.
///
/// Read-only tools default to allow; write and execute tools default to ask.
#[must_use]
pub fn default_policies() -> Vec<PermissionPolicy> {
    let read_tools = ["read_file", "list_directory", "search_files", "git_status"];
    let write_tools = ["write_file", "delete_file", "create_directory", "move_file"];
    let execute_tools = ["execute_command", "git", "action_block"];

    let read_rules = read_tools
        .iter()
        .map(|tool| {
            PermissionRule::policy_rule(
                *tool,
                "*",
                AccessKind::Read,
                Decision::Allow,
                DEFAULT_RULE_PRIORITY,
            )
        })
        .collect();
    let write_rules = write_tools
        .iter()
        .map(|tool| {
            PermissionRule::policy_rule(
                *tool,
                "*",
                AccessKind::Write,
                Decision::Ask,
                DEFAULT_RULE_PRIORITY,
            )
        })
        .collect();
    let execute_rules = execute_tools
        .iter()
        .map(|tool| {
            PermissionRule::policy_rule(
                *tool,
                "*",
                AccessKind::Execute,
                Decision::Ask,
                DEFAULT_RULE_PRIORITY,
            )
        })
        .collect();

    vec![
        PermissionPolicy::new("default-read", read_rules, Decision::Allow),
        PermissionPolicy::new("default-write", write_rules, Decision::Ask),
        PermissionPolicy::new("default-execute", execute_rules, Decision::Ask),
    ]
}
