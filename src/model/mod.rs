pub mod config;
pub mod report;

pub use config::{Config, RuleConfig, SeverityConfig};
pub use report::{
    Category, LintOutcome, LintStatus, NormalizedIssue, RawFinding, RuleReports, Severity,
    DOCUMENT_SCOPE_ID,
};
