//! The built-in rule set.
//!
//! Rule names, categories and messages follow the conventions of the
//! "recommended" configuration of common BPMN linters: structural rules
//! report errors, style rules report warnings.

use std::collections::HashMap;

use crate::bpmn::{FlowNode, FlowNodeKind, GatewayKind, RootElement};
use crate::model::Category;

use super::{ProcessScope, Reporter, Rule, RuleFailure};

/// Resolve a named preset to its rule list.
pub(crate) fn preset(name: &str) -> Vec<Box<dyn Rule>> {
    match name {
        "recommended" => recommended(),
        other => {
            tracing::warn!(preset = other, "Unknown rule preset, falling back to \"recommended\"");
            recommended()
        }
    }
}

fn recommended() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(StartEventRequired),
        Box::new(EndEventRequired),
        Box::new(SingleBlankStartEvent),
        Box::new(SingleEventDefinition),
        Box::new(NoDisconnected),
        Box::new(NoDuplicateSequenceFlows),
        Box::new(NoImplicitSplit),
        Box::new(NoGatewayJoinFork),
        Box::new(NoInclusiveGateway),
        Box::new(ConditionalFlows),
        Box::new(LabelRequired),
        Box::new(NoBpmndi),
        Box::new(FakeJoin),
        Box::new(SuperfluousGateway),
    ]
}

struct StartEventRequired;

impl Rule for StartEventRequired {
    fn name(&self) -> &'static str {
        "start-event-required"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            let has_start = flow_scope
                .nodes
                .iter()
                .any(|node| matches!(node.kind, FlowNodeKind::StartEvent));
            if !has_start {
                let message = if flow_scope.is_sub_process {
                    "Sub process is missing required start event"
                } else {
                    "Process is missing required start event"
                };
                reporter.report(flow_scope.id, message);
            }
        }
        Ok(())
    }
}

struct EndEventRequired;

impl Rule for EndEventRequired {
    fn name(&self) -> &'static str {
        "end-event-required"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            let has_end = flow_scope
                .nodes
                .iter()
                .any(|node| matches!(node.kind, FlowNodeKind::EndEvent));
            if !has_end {
                let message = if flow_scope.is_sub_process {
                    "Sub process is missing required end event"
                } else {
                    "Process is missing required end event"
                };
                reporter.report(flow_scope.id, message);
            }
        }
        Ok(())
    }
}

struct SingleBlankStartEvent;

impl Rule for SingleBlankStartEvent {
    fn name(&self) -> &'static str {
        "single-blank-start-event"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            let blank_starts = flow_scope
                .nodes
                .iter()
                .filter(|node| {
                    matches!(node.kind, FlowNodeKind::StartEvent)
                        && node.event_definitions.is_empty()
                })
                .count();
            if blank_starts > 1 {
                reporter.report(flow_scope.id, "Process has multiple blank start events");
            }
        }
        Ok(())
    }
}

struct SingleEventDefinition;

impl Rule for SingleEventDefinition {
    fn name(&self) -> &'static str {
        "single-event-definition"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            for node in flow_scope.nodes {
                if node.is_event() && node.event_definitions.len() > 1 {
                    reporter.report(Some(&node.id), "Event has multiple event definitions");
                }
            }
        }
        Ok(())
    }
}

struct NoDisconnected;

impl Rule for NoDisconnected {
    fn name(&self) -> &'static str {
        "no-disconnected"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            let degrees = flow_scope.degrees();
            for node in flow_scope.nodes {
                // Boundary events are connected through their attachment;
                // event sub-processes are triggered, not wired.
                if node.attached_to_ref.is_some() {
                    continue;
                }
                if let FlowNodeKind::SubProcess(sub) = &node.kind {
                    if sub.triggered_by_event {
                        continue;
                    }
                }
                let Some(node_degrees) = degrees.get(node.id.as_str()) else {
                    continue;
                };
                if node_degrees.incoming.is_empty() && node_degrees.outgoing.is_empty() {
                    reporter.report(Some(&node.id), "Element is not connected");
                }
            }
        }
        Ok(())
    }
}

struct NoDuplicateSequenceFlows;

impl Rule for NoDuplicateSequenceFlows {
    fn name(&self) -> &'static str {
        "no-duplicate-sequence-flows"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            let mut seen: HashMap<(&str, &str), &str> = HashMap::new();
            for flow in flow_scope.flows {
                let (Some(source), Some(target)) =
                    (flow.source_ref.as_deref(), flow.target_ref.as_deref())
                else {
                    continue;
                };
                if seen.insert((source, target), &flow.id).is_some() {
                    reporter.report(Some(&flow.id), "Flow is a duplicate");
                }
            }
        }
        Ok(())
    }
}

struct NoImplicitSplit;

impl Rule for NoImplicitSplit {
    fn name(&self) -> &'static str {
        "no-implicit-split"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            let degrees = flow_scope.degrees();
            for node in flow_scope.nodes {
                if node.is_gateway() {
                    continue;
                }
                let Some(node_degrees) = degrees.get(node.id.as_str()) else {
                    continue;
                };
                if node_degrees.outgoing.len() > 1
                    && node_degrees.outgoing.iter().any(|flow| !flow.has_condition)
                {
                    reporter.report(Some(&node.id), "Flow splits implicitly");
                }
            }
        }
        Ok(())
    }
}

struct NoGatewayJoinFork;

impl Rule for NoGatewayJoinFork {
    fn name(&self) -> &'static str {
        "no-gateway-join-fork"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            let degrees = flow_scope.degrees();
            for node in flow_scope.nodes {
                if !node.is_gateway() {
                    continue;
                }
                let Some(node_degrees) = degrees.get(node.id.as_str()) else {
                    continue;
                };
                if node_degrees.incoming.len() > 1 && node_degrees.outgoing.len() > 1 {
                    reporter.report(Some(&node.id), "Gateway forks and joins");
                }
            }
        }
        Ok(())
    }
}

struct NoInclusiveGateway;

impl Rule for NoInclusiveGateway {
    fn name(&self) -> &'static str {
        "no-inclusive-gateway"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            for node in flow_scope.nodes {
                if matches!(node.kind, FlowNodeKind::Gateway(GatewayKind::Inclusive)) {
                    reporter.report(Some(&node.id), "Inclusive gateways are discouraged");
                }
            }
        }
        Ok(())
    }
}

struct ConditionalFlows;

impl Rule for ConditionalFlows {
    fn name(&self) -> &'static str {
        "conditional-flows"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            let by_id: HashMap<&str, &FlowNode> = flow_scope
                .nodes
                .iter()
                .map(|node| (node.id.as_str(), node))
                .collect();
            for flow in flow_scope.flows {
                if !flow.has_condition {
                    continue;
                }
                let Some(source) = flow
                    .source_ref
                    .as_deref()
                    .and_then(|id| by_id.get(id).copied())
                else {
                    continue;
                };
                let allowed = source.is_activity()
                    || matches!(
                        source.kind,
                        FlowNodeKind::Gateway(GatewayKind::Exclusive | GatewayKind::Inclusive)
                    );
                if !allowed {
                    reporter.report(Some(&flow.id), "Sequence flow condition is not allowed");
                }
            }
        }
        Ok(())
    }
}

struct LabelRequired;

impl Rule for LabelRequired {
    fn name(&self) -> &'static str {
        "label-required"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            let degrees = flow_scope.degrees();
            for node in flow_scope.nodes {
                let needs_label = match &node.kind {
                    FlowNodeKind::Task | FlowNodeKind::CallActivity => true,
                    // Blank events are allowed to stay unlabeled; typed ones
                    // carry meaning and need a name
                    _ if node.is_event() => !node.event_definitions.is_empty(),
                    // Forking gateways represent decisions; joins do not
                    FlowNodeKind::Gateway(_) => degrees
                        .get(node.id.as_str())
                        .map(|d| d.outgoing.len() > 1)
                        .unwrap_or(false),
                    _ => false,
                };
                if needs_label && is_blank(node.name.as_deref()) {
                    reporter.report(Some(&node.id), "Element is missing label/name");
                }
            }
        }

        // Pools represent named partners; an unnamed participant says nothing
        for root in &scope.definitions.root_elements {
            if let RootElement::Collaboration(collaboration) = root {
                for participant in &collaboration.participants {
                    if is_blank(participant.name.as_deref()) {
                        reporter
                            .report(participant.id.as_deref(), "Element is missing label/name");
                    }
                }
            }
        }
        Ok(())
    }
}

fn is_blank(name: Option<&str>) -> bool {
    name.map(|name| name.trim().is_empty()).unwrap_or(true)
}

struct NoBpmndi;

impl Rule for NoBpmndi {
    fn name(&self) -> &'static str {
        "no-bpmndi"
    }

    fn category(&self) -> Category {
        Category::Error
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        let refs = &scope.definitions.diagram_refs;
        for flow_scope in scope.process.scopes() {
            for node in flow_scope.nodes {
                if !refs.contains(&node.id) {
                    reporter.report(Some(&node.id), "Element is missing bpmndi");
                }
            }
            for flow in flow_scope.flows {
                if !refs.contains(&flow.id) {
                    reporter.report(Some(&flow.id), "Element is missing bpmndi");
                }
            }
        }
        Ok(())
    }
}

struct FakeJoin;

impl Rule for FakeJoin {
    fn name(&self) -> &'static str {
        "fake-join"
    }

    fn category(&self) -> Category {
        Category::Warn
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            let degrees = flow_scope.degrees();
            for node in flow_scope.nodes {
                if node.is_gateway() {
                    continue;
                }
                let Some(node_degrees) = degrees.get(node.id.as_str()) else {
                    continue;
                };
                if node_degrees.incoming.len() > 1 {
                    reporter.report(Some(&node.id), "Incoming flows do not join");
                }
            }
        }
        Ok(())
    }
}

struct SuperfluousGateway;

impl Rule for SuperfluousGateway {
    fn name(&self) -> &'static str {
        "superfluous-gateway"
    }

    fn category(&self) -> Category {
        Category::Warn
    }

    fn check(&self, scope: &ProcessScope<'_>, reporter: &mut Reporter)
        -> Result<(), RuleFailure> {
        for flow_scope in scope.process.scopes() {
            let degrees = flow_scope.degrees();
            for node in flow_scope.nodes {
                if !node.is_gateway() {
                    continue;
                }
                let Some(node_degrees) = degrees.get(node.id.as_str()) else {
                    continue;
                };
                if node_degrees.incoming.len() == 1 && node_degrees.outgoing.len() == 1 {
                    reporter.report(
                        Some(&node.id),
                        "Gateway is superfluous. It only has one source and target.",
                    );
                }
            }
        }
        Ok(())
    }
}
