//! Typed element tree for a parsed BPMN 2.0 document.
//!
//! Only the parts of the metamodel the lint rules look at are materialized.
//! Root elements the linter does not inspect are kept as opaque entries;
//! artifacts (annotations, associations, lanes) are skipped entirely.

use std::collections::{BTreeSet, HashMap};

/// Root of a parsed document. The XML root element must be `definitions`.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub id: Option<String>,
    /// Top-level model elements in document order.
    pub root_elements: Vec<RootElement>,
    /// Element ids referenced by `bpmndi` shapes, edges and planes.
    pub diagram_refs: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub enum RootElement {
    Process(Process),
    Collaboration(Collaboration),
    /// Root elements the linter does not inspect (messages, signals, ...).
    Other { type_name: String },
}

#[derive(Debug, Clone, Default)]
pub struct Process {
    pub id: Option<String>,
    pub flow_nodes: Vec<FlowNode>,
    pub sequence_flows: Vec<SequenceFlow>,
}

#[derive(Debug, Clone, Default)]
pub struct Collaboration {
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: Option<String>,
    pub name: Option<String>,
    pub process_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FlowNode {
    pub id: String,
    pub name: Option<String>,
    pub kind: FlowNodeKind,
    /// Event definition element names (`messageEventDefinition`, ...).
    pub event_definitions: Vec<String>,
    /// Set on boundary events; the activity the event is attached to.
    pub attached_to_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FlowNodeKind {
    StartEvent,
    EndEvent,
    IntermediateCatchEvent,
    IntermediateThrowEvent,
    BoundaryEvent,
    /// All task types collapse here; the distinction is irrelevant to the
    /// shipped rules.
    Task,
    CallActivity,
    SubProcess(SubProcess),
    Gateway(GatewayKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    Exclusive,
    Parallel,
    Inclusive,
    Complex,
    EventBased,
}

#[derive(Debug, Clone, Default)]
pub struct SubProcess {
    pub triggered_by_event: bool,
    pub flow_nodes: Vec<FlowNode>,
    pub sequence_flows: Vec<SequenceFlow>,
}

#[derive(Debug, Clone)]
pub struct SequenceFlow {
    pub id: String,
    pub source_ref: Option<String>,
    pub target_ref: Option<String>,
    pub has_condition: bool,
}

impl FlowNode {
    pub fn is_event(&self) -> bool {
        matches!(
            self.kind,
            FlowNodeKind::StartEvent
                | FlowNodeKind::EndEvent
                | FlowNodeKind::IntermediateCatchEvent
                | FlowNodeKind::IntermediateThrowEvent
                | FlowNodeKind::BoundaryEvent
        )
    }

    pub fn is_gateway(&self) -> bool {
        matches!(self.kind, FlowNodeKind::Gateway(_))
    }

    pub fn is_activity(&self) -> bool {
        matches!(
            self.kind,
            FlowNodeKind::Task | FlowNodeKind::CallActivity | FlowNodeKind::SubProcess(_)
        )
    }
}

/// One evaluation scope: a process, or an expanded sub-process within one.
#[derive(Debug, Clone, Copy)]
pub struct FlowScope<'a> {
    pub id: Option<&'a str>,
    pub is_sub_process: bool,
    pub nodes: &'a [FlowNode],
    pub flows: &'a [SequenceFlow],
}

/// Incoming and outgoing sequence flows of one node within a scope.
#[derive(Debug, Default)]
pub struct Degrees<'a> {
    pub incoming: Vec<&'a SequenceFlow>,
    pub outgoing: Vec<&'a SequenceFlow>,
}

impl<'a> FlowScope<'a> {
    /// Connectivity per node id, derived from the scope's sequence flows.
    pub fn degrees(&self) -> HashMap<&'a str, Degrees<'a>> {
        let mut map: HashMap<&'a str, Degrees<'a>> = self
            .nodes
            .iter()
            .map(|node| (node.id.as_str(), Degrees::default()))
            .collect();

        for flow in self.flows {
            if let Some(degrees) = flow.source_ref.as_deref().and_then(|id| map.get_mut(id)) {
                degrees.outgoing.push(flow);
            }
            if let Some(degrees) = flow.target_ref.as_deref().and_then(|id| map.get_mut(id)) {
                degrees.incoming.push(flow);
            }
        }

        map
    }
}

impl Process {
    /// The process itself plus every nested expanded sub-process, in
    /// document order.
    pub fn scopes(&self) -> Vec<FlowScope<'_>> {
        let mut scopes = vec![FlowScope {
            id: self.id.as_deref(),
            is_sub_process: false,
            nodes: &self.flow_nodes,
            flows: &self.sequence_flows,
        }];
        collect_sub_scopes(&self.flow_nodes, &mut scopes);
        scopes
    }
}

fn collect_sub_scopes<'a>(nodes: &'a [FlowNode], scopes: &mut Vec<FlowScope<'a>>) {
    for node in nodes {
        if let FlowNodeKind::SubProcess(sub) = &node.kind {
            scopes.push(FlowScope {
                id: Some(&node.id),
                is_sub_process: true,
                nodes: &sub.flow_nodes,
                flows: &sub.sequence_flows,
            });
            collect_sub_scopes(&sub.flow_nodes, scopes);
        }
    }
}

impl Definitions {
    /// Top-level processes in document order.
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.root_elements.iter().filter_map(|root| match root {
            RootElement::Process(process) => Some(process),
            _ => None,
        })
    }

    /// Every process evaluation pass: root processes first, then processes
    /// referenced again through collaboration participants. A process that
    /// backs a participant is therefore visited twice; the normalizer
    /// collapses the duplicated findings.
    pub fn evaluation_passes(&self) -> Vec<&Process> {
        let mut passes: Vec<&Process> = self.processes().collect();

        let by_id: HashMap<&str, &Process> = self
            .processes()
            .filter_map(|process| process.id.as_deref().map(|id| (id, process)))
            .collect();

        for root in &self.root_elements {
            if let RootElement::Collaboration(collaboration) = root {
                for participant in &collaboration.participants {
                    if let Some(process) = participant
                        .process_ref
                        .as_deref()
                        .and_then(|id| by_id.get(id).copied())
                    {
                        passes.push(process);
                    }
                }
            }
        }

        passes
    }
}
