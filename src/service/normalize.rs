//! Result normalizer: raw per-rule findings to the client-facing report.

use std::collections::HashSet;

use crate::model::{
    LintOutcome, LintStatus, NormalizedIssue, RuleReports, SeverityConfig, DOCUMENT_SCOPE_ID,
};

/// Flatten, classify and deduplicate raw rule reports.
///
/// Severity resolution order per finding: per-rule override, then category
/// mapping, then the default fallback. Findings sharing a (rule, id,
/// message) triple collapse to the first occurrence; the rule engine may
/// evaluate overlapping scopes and report the same violation twice. The
/// outcome status is `error` iff any kept issue falls in the configured
/// blocking set.
pub fn normalize(reports: &RuleReports, table: &SeverityConfig) -> LintOutcome {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    let mut blocking = false;

    for (rule, findings) in reports {
        for finding in findings {
            let id = finding
                .element_id
                .clone()
                .unwrap_or_else(|| DOCUMENT_SCOPE_ID.to_string());

            if !seen.insert((rule.clone(), id.clone(), finding.message.clone())) {
                continue;
            }

            let severity = table.classify(rule, finding.category);
            blocking = blocking || table.is_blocking(severity, finding.category);

            issues.push(NormalizedIssue {
                rule: rule.clone(),
                id,
                message: finding.message.clone(),
                severity,
            });
        }
    }

    let status = if blocking {
        LintStatus::Error
    } else {
        LintStatus::Ok
    };

    LintOutcome { status, issues }
}
