//! Remediation Rules
//!
//! Declarative first-match rules mapping event fields to a remediation
//! name. Rules are loaded once from the policy file and never change at
//! runtime.

pub mod actions;

pub use actions::{RemediationKind, Resolver};

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Partial predicate over an event; omitted fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Case-insensitive substring of `details.description`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_contains: Option<String>,
}

impl RuleMatch {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(event_type) = &self.event_type {
            if event.event_type != *event_type {
                return false;
            }
        }

        if let Some(status) = &self.status {
            if event.status.as_str() != status {
                return false;
            }
        }

        if let Some(source) = &self.source {
            if event.source() != Some(source.as_str()) {
                return false;
            }
        }

        if let Some(needle) = &self.description_contains {
            let haystack = event.description().unwrap_or_default().to_lowercase();
            if !haystack.contains(&needle.to_lowercase()) {
                return false;
            }
        }

        true
    }
}

/// `{match, action}` entry from the policy file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationRule {
    #[serde(rename = "match", default)]
    pub matcher: RuleMatch,
    pub action: String,
}

impl RemediationRule {
    pub fn new(matcher: RuleMatch, action: &str) -> Self {
        Self {
            matcher,
            action: action.to_string(),
        }
    }
}

/// Action of the first rule matching `event`, in declaration order
pub fn find_remediation_action<'a>(event: &Event, rules: &'a [RemediationRule]) -> Option<&'a str> {
    rules
        .iter()
        .find(|rule| rule.matcher.matches(event))
        .map(|rule| rule.action.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_rule(source: &str, action: &str) -> RemediationRule {
        RemediationRule::new(
            RuleMatch {
                source: Some(source.to_string()),
                ..Default::default()
            },
            action,
        )
    }

    #[test]
    fn test_first_match_then_catch_all() {
        let rules = vec![
            source_rule("DiskMonitor", "clear_temp_files"),
            RemediationRule::new(RuleMatch::default(), "generic_retry"),
        ];

        let disk = Event::new(1, "fail").with_source("DiskMonitor");
        let other = Event::new(2, "fail").with_source("Scheduler");
        let no_source = Event::new(3, "fail");

        assert_eq!(find_remediation_action(&disk, &rules), Some("clear_temp_files"));
        assert_eq!(find_remediation_action(&other, &rules), Some("generic_retry"));
        assert_eq!(find_remediation_action(&no_source, &rules), Some("generic_retry"));
    }

    #[test]
    fn test_no_rules_no_action() {
        let event = Event::new(1, "fail").with_source("DiskMonitor");
        assert_eq!(find_remediation_action(&event, &[]), None);
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let rules = vec![
            source_rule("DiskMonitor", "first"),
            source_rule("DiskMonitor", "second"),
        ];
        let event = Event::new(1, "fail").with_source("DiskMonitor");
        assert_eq!(find_remediation_action(&event, &rules), Some("first"));
    }

    #[test]
    fn test_all_fields_must_match() {
        let rule = RemediationRule::new(
            RuleMatch {
                event_type: Some("job_issue".into()),
                status: Some("fail".into()),
                source: Some("Updater".into()),
                description_contains: Some("Update Failed".into()),
            },
            "retry",
        );
        let rules = [rule];

        let hit = Event::new(1, "fail")
            .with_source("Updater")
            .with_description("update failed due to network error.");
        assert_eq!(find_remediation_action(&hit, &rules), Some("retry"));

        let wrong_status = hit.clone();
        let wrong_status = Event {
            status: "stuck".into(),
            ..wrong_status
        };
        assert_eq!(find_remediation_action(&wrong_status, &rules), None);

        let wrong_type = hit.clone().with_event_type("heartbeat");
        assert_eq!(find_remediation_action(&wrong_type, &rules), None);

        let no_description = Event::new(1, "fail").with_source("Updater");
        assert_eq!(find_remediation_action(&no_description, &rules), None);
    }

    #[test]
    fn test_rule_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            remediation_rules: Vec<RemediationRule>,
        }

        let doc: Doc = toml::from_str(
            r#"
            [[remediation_rules]]
            action = "clear_temp_files"
            match = { source = "DiskMonitor" }

            [[remediation_rules]]
            action = "generic_retry"
            "#,
        )
        .unwrap();

        assert_eq!(doc.remediation_rules.len(), 2);
        assert_eq!(doc.remediation_rules[0].matcher.source.as_deref(), Some("DiskMonitor"));
        assert_eq!(doc.remediation_rules[1].matcher, RuleMatch::default());
    }
}
