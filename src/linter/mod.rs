//! Rule engine evaluating a fixed, named rule set over a parsed document.
//!
//! The engine is built once at startup from [`RuleConfig`] and holds no
//! per-request state; `run` borrows everything it needs.

mod rules;

use crate::bpmn::{Definitions, Process};
use crate::model::{Category, RawFinding, RuleConfig, RuleReports};

/// Scope handed to a rule for one evaluation pass.
pub struct ProcessScope<'a> {
    pub definitions: &'a Definitions,
    pub process: &'a Process,
}

/// Non-fatal failure raised by a rule; recorded as a `rule-error` finding
/// instead of aborting the run.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RuleFailure(pub String);

pub(crate) trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Category findings of this rule are reported under.
    fn category(&self) -> Category;

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure>;
}

/// Collects findings for one rule during one evaluation pass.
pub struct Reporter {
    category: Category,
    findings: Vec<RawFinding>,
}

impl Reporter {
    fn new(category: Category) -> Self {
        Self {
            category,
            findings: Vec::new(),
        }
    }

    pub fn report<S: AsRef<str>>(&mut self, element_id: Option<S>, message: impl Into<String>) {
        self.findings.push(RawFinding {
            element_id: element_id.map(|id| id.as_ref().to_string()),
            message: message.into(),
            category: Some(self.category),
        });
    }
}

/// The rule engine.
pub struct Linter {
    rules: Vec<Box<dyn Rule>>,
}

impl Linter {
    /// Build the enabled rule registry from the configured preset and
    /// per-rule toggles.
    pub fn new(config: &RuleConfig) -> Self {
        let rules: Vec<Box<dyn Rule>> = rules::preset(&config.preset)
            .into_iter()
            .filter(|rule| config.overrides.get(rule.name()).copied().unwrap_or(true))
            .collect();
        Self { rules }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Evaluate every enabled rule over every process pass of the document.
    ///
    /// A process referenced by a collaboration participant is evaluated a
    /// second time, so the same violation can legitimately be reported more
    /// than once; downstream normalization collapses the duplicates.
    pub fn run(&self, definitions: &Definitions) -> RuleReports {
        let mut reports = RuleReports::new();

        for process in definitions.evaluation_passes() {
            let scope = ProcessScope {
                definitions,
                process,
            };
            for rule in &self.rules {
                let mut reporter = Reporter::new(rule.category());
                if let Err(failure) = rule.check(&scope, &mut reporter) {
                    tracing::warn!(rule = rule.name(), error = %failure, "Rule evaluation failed");
                    reporter.findings.push(RawFinding {
                        element_id: None,
                        message: format!("Rule failed: {failure}"),
                        category: Some(Category::RuleError),
                    });
                }
                if !reporter.findings.is_empty() {
                    reports
                        .entry(rule.name().to_string())
                        .or_default()
                        .append(&mut reporter.findings);
                }
            }
        }

        reports
    }
}
