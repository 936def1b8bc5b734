//! Lint orchestration: parse, evaluate, normalize.

use crate::bpmn::{self, ParseError};
use crate::linter::Linter;
use crate::model::{Config, LintOutcome, SeverityConfig};
use crate::service::normalize::normalize;

#[derive(Debug, thiserror::Error)]
pub enum LintServiceError {
    #[error("failed to parse BPMN document: {0}")]
    Parse(#[from] ParseError),
}

/// Service wiring the document parser and the rule engine together.
///
/// Constructed once at startup; both collaborators are immutable and safe to
/// share across concurrent requests.
pub struct LintService {
    linter: Linter,
    severity: SeverityConfig,
}

impl LintService {
    pub fn new(config: &Config) -> Self {
        Self {
            linter: Linter::new(&config.rules),
            severity: config.severity.clone(),
        }
    }

    /// Number of rules the engine was built with.
    pub fn rule_count(&self) -> usize {
        self.linter.rule_count()
    }

    /// Lint one BPMN XML document.
    pub fn lint(&self, xml: &str) -> Result<LintOutcome, LintServiceError> {
        let definitions = bpmn::parse(xml)?;
        tracing::debug!(
            definitions = definitions.id.as_deref().unwrap_or("<anonymous>"),
            processes = definitions.processes().count(),
            "Parsed BPMN document"
        );
        let reports = self.linter.run(&definitions);
        Ok(normalize(&reports, &self.severity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LintStatus, Severity};

    const CLEAN_PROCESS: &str = r#"
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="D">
  <process id="P1" name="Clean">
    <startEvent id="Start1"/>
    <task id="Task1" name="Work"/>
    <endEvent id="End1"/>
    <sequenceFlow id="Flow1" sourceRef="Start1" targetRef="Task1"/>
    <sequenceFlow id="Flow2" sourceRef="Task1" targetRef="End1"/>
  </process>
  <BPMNDiagram id="Diagram1">
    <BPMNPlane id="Plane1" bpmnElement="P1">
      <BPMNShape id="S1" bpmnElement="Start1"/>
      <BPMNShape id="S2" bpmnElement="Task1"/>
      <BPMNShape id="S3" bpmnElement="End1"/>
      <BPMNEdge id="E1" bpmnElement="Flow1"/>
      <BPMNEdge id="E2" bpmnElement="Flow2"/>
    </BPMNPlane>
  </BPMNDiagram>
</definitions>"#;

    fn service() -> LintService {
        LintService::new(&Config::default())
    }

    #[test]
    fn test_clean_document_lints_ok() {
        let outcome = service().lint(CLEAN_PROCESS).unwrap();

        assert_eq!(outcome.status, LintStatus::Ok);
        assert!(outcome.issues.is_empty(), "unexpected: {:?}", outcome.issues);
    }

    #[test]
    fn test_missing_events_produce_blocking_issues() {
        let xml = r#"
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="D">
  <process id="P1">
    <task id="Task1" name="Work"/>
  </process>
</definitions>"#;

        let outcome = service().lint(xml).unwrap();

        assert_eq!(outcome.status, LintStatus::Error);
        let rules: Vec<_> = outcome.issues.iter().map(|i| i.rule.as_str()).collect();
        assert!(rules.contains(&"start-event-required"));
        assert!(rules.contains(&"end-event-required"));
        assert!(rules.contains(&"no-disconnected"));
    }

    #[test]
    fn test_participant_duplicates_are_collapsed() {
        let xml = r#"
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="D">
  <collaboration id="C1">
    <participant id="Part1" processRef="P1"/>
  </collaboration>
  <process id="P1">
    <task id="Task1" name="Work"/>
  </process>
</definitions>"#;

        let outcome = service().lint(xml).unwrap();

        // each violation appears once even though P1 is evaluated twice
        let missing_end: Vec<_> = outcome
            .issues
            .iter()
            .filter(|issue| issue.rule == "end-event-required")
            .collect();
        assert_eq!(missing_end.len(), 1);
    }

    #[test]
    fn test_rule_override_downgrades_severity() {
        let mut config = Config::default();
        config
            .severity
            .rule_overrides
            .insert("no-bpmndi".to_string(), Severity::Info);

        let xml = r#"
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="D">
  <process id="P1">
    <startEvent id="Start1"/>
    <endEvent id="End1"/>
    <sequenceFlow id="Flow1" sourceRef="Start1" targetRef="End1"/>
  </process>
</definitions>"#;

        let outcome = LintService::new(&config).lint(xml).unwrap();

        assert_eq!(outcome.status, LintStatus::Ok);
        assert!(outcome
            .issues
            .iter()
            .all(|issue| issue.rule == "no-bpmndi" && issue.severity == Severity::Info));
    }

    #[test]
    fn test_parse_failure_surfaces_as_service_error() {
        let err = service().lint("<workflow/>").unwrap_err();
        assert!(matches!(err, LintServiceError::Parse(_)));
    }
}
