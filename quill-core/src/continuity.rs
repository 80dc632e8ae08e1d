//! Continuity issues and tolerant parsing of the continuity agent's reply.
//!
//! The model is asked for `{"errors": [...]}` but routinely wraps it in
//! Markdown fences, adds prose around it, or renames the fields. Parsing
//! accepts all of that and records whether the reply could be read at all.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// How serious a continuity issue is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    #[default]
    Warning,
}

impl Severity {
    fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" | "error" | "high" | "severe" => Severity::Critical,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
        })
    }
}

/// An inconsistency between scene text and the bible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuityIssue {
    pub severity: Severity,
    /// Category, e.g. "Character Inconsistency".
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
}

const DEFAULT_KIND: &str = "General Issue";
const DEFAULT_MESSAGE: &str = "No description provided.";

impl ContinuityIssue {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::default(),
            kind: kind.into(),
            message: message.into(),
            quote: None,
        }
    }

    /// Build from one element of the `errors` array, accepting the field
    /// spellings the model is known to use.
    pub fn from_value(value: &Value) -> Self {
        if let Some(text) = value.as_str() {
            return Self::new(DEFAULT_KIND, text);
        }

        let kind = first_string(value, &["type", "Type", "kind", "issue"])
            .unwrap_or_else(|| DEFAULT_KIND.to_string());
        let message = first_string(
            value,
            &["description", "Description", "message", "detail"],
        )
        .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());
        let severity = first_string(value, &["severity", "Severity"])
            .map(|s| Severity::parse(&s))
            .unwrap_or_default();
        let quote = first_string(value, &["quote", "Quote", "excerpt"]);

        Self {
            severity,
            kind,
            message,
            quote,
        }
    }

    /// Whether the issue concerns a character.
    pub fn is_character_issue(&self) -> bool {
        self.kind.to_lowercase().contains("character")
            || self.message.to_lowercase().contains("character")
    }
}

fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

/// Result of a continuity check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContinuityReport {
    pub issues: Vec<ContinuityIssue>,
    /// The reply could not be read as JSON. `issues` is empty in that case,
    /// which does not mean the scene is clean.
    pub unparsed: bool,
}

impl ContinuityReport {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn unparsed() -> Self {
        Self {
            issues: Vec::new(),
            unparsed: true,
        }
    }

    pub fn with_issues(issues: Vec<ContinuityIssue>) -> Self {
        Self {
            issues,
            unparsed: false,
        }
    }

    /// True only when the reply was read and listed nothing.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && !self.unparsed
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Strip Markdown fences and surrounding prose from a JSON reply.
pub fn clean_json(text: &str) -> &str {
    let text = text.trim();
    if text.is_empty() {
        return "{}";
    }

    let text = fenced_block(text).unwrap_or(text);

    match (text.find('{'), text.rfind('}')) {
        (Some(first), Some(last)) if last > first => &text[first..=last],
        _ => text,
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// Parse the continuity agent's reply.
///
/// A missing `errors` field is a clean report. Unreadable JSON is an empty
/// report flagged as `unparsed`.
pub fn parse_report(text: &str) -> ContinuityReport {
    let cleaned = clean_json(text);

    let value: Value = match serde_json::from_str(cleaned) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "continuity reply was not valid JSON");
            return ContinuityReport::unparsed();
        }
    };

    let errors = value
        .get("errors")
        .or_else(|| value.get("Errors"))
        .and_then(Value::as_array);

    match errors {
        Some(items) => {
            ContinuityReport::with_issues(items.iter().map(ContinuityIssue::from_value).collect())
        }
        None => ContinuityReport::clean(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_json_fenced() {
        let reply = "Here you go:\n```json\n{\"errors\": []}\n```\nAnything else?";
        assert_eq!(clean_json(reply), "{\"errors\": []}");
    }

    #[test]
    fn test_clean_json_prose() {
        let reply = "Sure! {\"errors\": [{\"type\": \"x\"}]} Hope this helps.";
        assert_eq!(clean_json(reply), "{\"errors\": [{\"type\": \"x\"}]}");
    }

    #[test]
    fn test_clean_json_empty() {
        assert_eq!(clean_json("   "), "{}");
    }

    #[test]
    fn test_missing_errors_key_is_clean() {
        let report = parse_report(r#"{"status": "ok"}"#);
        assert!(report.issues.is_empty());
        assert!(!report.unparsed);
        assert!(report.is_clean());
    }

    #[test]
    fn test_unparseable_reply_is_flagged() {
        let report = parse_report("I could not find any problems.");
        assert!(report.issues.is_empty());
        assert!(report.unparsed);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_field_spellings() {
        let reply = r#"{"errors": [
            {"type": "Character Inconsistency", "description": "Kaito is dead."},
            {"Type": "Location", "Description": "Wrong city."},
            {"issue": "Timeline", "detail": "Night became day."},
            {"severity": "critical", "message": "Aria has no eye.", "quote": "her cybernetic eye"},
            {}
        ]}"#;
        let report = parse_report(reply);
        assert_eq!(report.len(), 5);

        assert_eq!(report.issues[0].kind, "Character Inconsistency");
        assert!(report.issues[0].is_character_issue());
        assert_eq!(report.issues[1].message, "Wrong city.");
        assert_eq!(report.issues[2].kind, "Timeline");
        assert_eq!(report.issues[2].message, "Night became day.");
        assert_eq!(report.issues[3].severity, Severity::Critical);
        assert_eq!(report.issues[3].quote.as_deref(), Some("her cybernetic eye"));
        assert_eq!(report.issues[4].kind, "General Issue");
        assert_eq!(report.issues[4].message, "No description provided.");
        assert_eq!(report.issues[4].severity, Severity::Warning);
    }

    #[test]
    fn test_string_entries() {
        let report = parse_report(r#"{"errors": ["Aria appears twice"]}"#);
        assert_eq!(report.issues[0].message, "Aria appears twice");
        assert_eq!(report.issues[0].kind, "General Issue");
    }
}
