//! Lint report data model shared between the rule engine and the API layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sentinel element id for findings that concern the document as a whole
/// rather than a single model element.
pub const DOCUMENT_SCOPE_ID: &str = "root";

/// Raw category a rule reports its findings under.
///
/// `rule-error` marks findings synthesized by the engine when a rule itself
/// failed to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Error,
    Warn,
    Info,
    RuleError,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Error => "error",
            Category::Warn => "warn",
            Category::Info => "info",
            Category::RuleError => "rule-error",
        }
    }
}

/// Client-facing severity of a normalized issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// A single rule violation as produced by the rule engine.
///
/// `element_id` is absent for document-level findings; `category` is absent
/// when a rule reported nothing usable, in which case classification falls
/// back to the configured default severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFinding {
    pub element_id: Option<String>,
    pub message: String,
    pub category: Option<Category>,
}

/// Findings grouped by rule name.
pub type RuleReports = BTreeMap<String, Vec<RawFinding>>;

/// One deduplicated, severity-classified issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NormalizedIssue {
    pub rule: String,
    /// Element id, or `"root"` for document-level findings.
    pub id: String,
    pub message: String,
    pub severity: Severity,
}

/// Overall verdict of a lint run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LintStatus {
    Ok,
    Error,
}

/// Response payload for a lint request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LintOutcome {
    pub status: LintStatus,
    pub issues: Vec<NormalizedIssue>,
}
