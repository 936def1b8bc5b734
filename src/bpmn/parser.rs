//! BPMN 2.0 XML parsing built on `quick-xml` event streaming.
//!
//! Namespace handling is deliberately loose: elements are matched on local
//! names, so `bpmn:process`, `bpmn2:process` and `process` all parse the
//! same way. Subtrees the element model does not capture are skipped.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::bpmn::model::{
    Collaboration, Definitions, FlowNode, FlowNodeKind, GatewayKind, Participant, Process,
    RootElement, SequenceFlow, SubProcess,
};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid XML attribute: {0}")]
    Attr(#[from] AttrError),

    #[error("root element is <{0}>, expected <definitions>")]
    NotDefinitions(String),

    #[error("document contains no XML root element")]
    NoRootElement,

    #[error("<{element}> is missing required attribute \"{attribute}\"")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
}

/// Parse a BPMN 2.0 XML document into its element tree.
pub fn parse(xml: &str) -> Result<Definitions, ParseError> {
    Parser::new(xml).run()
}

enum ContainerFrame {
    Process(Process),
    SubProcess {
        id: String,
        name: Option<String>,
        sub: SubProcess,
    },
}

impl ContainerFrame {
    fn push_node(&mut self, node: FlowNode) {
        match self {
            ContainerFrame::Process(process) => process.flow_nodes.push(node),
            ContainerFrame::SubProcess { sub, .. } => sub.flow_nodes.push(node),
        }
    }

    fn push_flow(&mut self, flow: SequenceFlow) {
        match self {
            ContainerFrame::Process(process) => process.sequence_flows.push(flow),
            ContainerFrame::SubProcess { sub, .. } => sub.sequence_flows.push(flow),
        }
    }
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
    definitions: Definitions,
    saw_root: bool,
    containers: Vec<ContainerFrame>,
    collaboration: Option<Collaboration>,
    /// Event node kept open to collect its event definition children.
    node: Option<FlowNode>,
    /// Sequence flow kept open to detect a condition expression child.
    flow: Option<SequenceFlow>,
    /// Nesting depth of bpmndi diagram/plane elements.
    in_diagram: usize,
}

impl<'a> Parser<'a> {
    fn new(xml: &'a str) -> Self {
        Self {
            reader: Reader::from_str(xml),
            definitions: Definitions::default(),
            saw_root: false,
            containers: Vec::new(),
            collaboration: None,
            node: None,
            flow: None,
            in_diagram: 0,
        }
    }

    fn run(mut self) -> Result<Definitions, ParseError> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => self.open(&e, false)?,
                Event::Empty(e) => self.open(&e, true)?,
                Event::End(e) => self.close(e.local_name().as_ref()),
                Event::Eof => break,
                _ => {}
            }
        }

        if !self.saw_root {
            return Err(ParseError::NoRootElement);
        }
        Ok(self.definitions)
    }

    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<(), ParseError> {
        let local_name = e.local_name();
        let local = local_name.as_ref();

        if !self.saw_root {
            if local != b"definitions" {
                return Err(ParseError::NotDefinitions(
                    String::from_utf8_lossy(local).into_owned(),
                ));
            }
            self.definitions.id = attr(e, "id")?;
            self.saw_root = true;
            return Ok(());
        }

        // Condition expression of the currently open sequence flow
        if local == b"conditionExpression" && self.flow.is_some() {
            if let Some(flow) = &mut self.flow {
                flow.has_condition = true;
            }
            return self.skip(e, empty);
        }

        // Event definition of the currently open event node
        if local.ends_with(b"EventDefinition") && self.node.is_some() {
            if let Some(node) = &mut self.node {
                node.event_definitions
                    .push(String::from_utf8_lossy(local).into_owned());
            }
            return self.skip(e, empty);
        }

        // Diagram interchange: only the element references matter
        match local {
            b"BPMNDiagram" => {
                if !empty {
                    self.in_diagram += 1;
                }
                return Ok(());
            }
            b"BPMNPlane" => {
                if let Some(reference) = attr(e, "bpmnElement")? {
                    self.definitions.diagram_refs.insert(reference);
                }
                if !empty {
                    self.in_diagram += 1;
                }
                return Ok(());
            }
            b"BPMNShape" | b"BPMNEdge" => {
                if let Some(reference) = attr(e, "bpmnElement")? {
                    self.definitions.diagram_refs.insert(reference);
                }
                return self.skip(e, empty);
            }
            _ => {}
        }

        if !self.containers.is_empty() {
            return self.open_flow_element(e, local, empty);
        }

        if self.collaboration.is_some() {
            if local == b"participant" {
                let participant = Participant {
                    id: attr(e, "id")?,
                    name: attr(e, "name")?,
                    process_ref: attr(e, "processRef")?,
                };
                if let Some(collaboration) = &mut self.collaboration {
                    collaboration.participants.push(participant);
                }
            }
            // Message flows and extension content are not linted
            return self.skip(e, empty);
        }

        // Definitions level
        match local {
            b"process" => {
                let process = Process {
                    id: attr(e, "id")?,
                    ..Default::default()
                };
                if empty {
                    self.definitions.root_elements.push(RootElement::Process(process));
                } else {
                    self.containers.push(ContainerFrame::Process(process));
                }
                Ok(())
            }
            b"collaboration" => {
                let collaboration = Collaboration {
                    participants: Vec::new(),
                };
                if empty {
                    self.definitions
                        .root_elements
                        .push(RootElement::Collaboration(collaboration));
                } else {
                    self.collaboration = Some(collaboration);
                }
                Ok(())
            }
            _ if self.in_diagram > 0 => self.skip(e, empty),
            _ => {
                self.definitions.root_elements.push(RootElement::Other {
                    type_name: String::from_utf8_lossy(local).into_owned(),
                });
                self.skip(e, empty)
            }
        }
    }

    /// Handle an element inside a process or sub-process container.
    fn open_flow_element(
        &mut self,
        e: &BytesStart<'_>,
        local: &[u8],
        empty: bool,
    ) -> Result<(), ParseError> {
        if let Some(kind) = event_kind(local) {
            let attached_to_ref = if local == b"boundaryEvent" {
                attr(e, "attachedToRef")?
            } else {
                None
            };
            let node = FlowNode {
                id: require_id(e, local)?,
                name: attr(e, "name")?,
                kind,
                event_definitions: Vec::new(),
                attached_to_ref,
            };
            if empty {
                self.push_node(node);
            } else {
                self.node = Some(node);
            }
            return Ok(());
        }

        if matches!(local, b"subProcess" | b"adHocSubProcess" | b"transaction") {
            let id = require_id(e, local)?;
            let name = attr(e, "name")?;
            let sub = SubProcess {
                triggered_by_event: attr(e, "triggeredByEvent")?.as_deref() == Some("true"),
                ..Default::default()
            };
            if empty {
                self.push_node(FlowNode {
                    id,
                    name,
                    kind: FlowNodeKind::SubProcess(sub),
                    event_definitions: Vec::new(),
                    attached_to_ref: None,
                });
            } else {
                self.containers.push(ContainerFrame::SubProcess { id, name, sub });
            }
            return Ok(());
        }

        if let Some(kind) = plain_node_kind(local) {
            let node = FlowNode {
                id: require_id(e, local)?,
                name: attr(e, "name")?,
                kind,
                event_definitions: Vec::new(),
                attached_to_ref: None,
            };
            self.push_node(node);
            return self.skip(e, empty);
        }

        if local == b"sequenceFlow" {
            let flow = SequenceFlow {
                id: require_id(e, local)?,
                source_ref: attr(e, "sourceRef")?,
                target_ref: attr(e, "targetRef")?,
                has_condition: false,
            };
            if empty {
                self.push_flow(flow);
            } else {
                self.flow = Some(flow);
            }
            return Ok(());
        }

        // Lanes, data objects, artifacts, documentation, extensions, ...
        self.skip(e, empty)
    }

    fn close(&mut self, local: &[u8]) {
        if event_kind(local).is_some() {
            if let Some(node) = self.node.take() {
                self.push_node(node);
            }
            return;
        }

        match local {
            b"sequenceFlow" => {
                if let Some(flow) = self.flow.take() {
                    self.push_flow(flow);
                }
            }
            b"process" => {
                if let Some(ContainerFrame::Process(process)) = self.containers.pop() {
                    self.definitions.root_elements.push(RootElement::Process(process));
                }
            }
            b"subProcess" | b"adHocSubProcess" | b"transaction" => {
                if let Some(ContainerFrame::SubProcess { id, name, sub }) = self.containers.pop() {
                    self.push_node(FlowNode {
                        id,
                        name,
                        kind: FlowNodeKind::SubProcess(sub),
                        event_definitions: Vec::new(),
                        attached_to_ref: None,
                    });
                }
            }
            b"collaboration" => {
                if let Some(collaboration) = self.collaboration.take() {
                    self.definitions
                        .root_elements
                        .push(RootElement::Collaboration(collaboration));
                }
            }
            b"BPMNDiagram" | b"BPMNPlane" => {
                self.in_diagram = self.in_diagram.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn push_node(&mut self, node: FlowNode) {
        if let Some(container) = self.containers.last_mut() {
            container.push_node(node);
        }
    }

    fn push_flow(&mut self, flow: SequenceFlow) {
        if let Some(container) = self.containers.last_mut() {
            container.push_flow(flow);
        }
    }

    fn skip(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<(), ParseError> {
        if !empty {
            self.reader.read_to_end(e.name())?;
        }
        Ok(())
    }
}

fn event_kind(local: &[u8]) -> Option<FlowNodeKind> {
    match local {
        b"startEvent" => Some(FlowNodeKind::StartEvent),
        b"endEvent" => Some(FlowNodeKind::EndEvent),
        b"intermediateCatchEvent" => Some(FlowNodeKind::IntermediateCatchEvent),
        b"intermediateThrowEvent" => Some(FlowNodeKind::IntermediateThrowEvent),
        b"boundaryEvent" => Some(FlowNodeKind::BoundaryEvent),
        _ => None,
    }
}

fn plain_node_kind(local: &[u8]) -> Option<FlowNodeKind> {
    match local {
        b"task" | b"userTask" | b"serviceTask" | b"scriptTask" | b"manualTask"
        | b"businessRuleTask" | b"sendTask" | b"receiveTask" => Some(FlowNodeKind::Task),
        b"callActivity" => Some(FlowNodeKind::CallActivity),
        b"exclusiveGateway" => Some(FlowNodeKind::Gateway(GatewayKind::Exclusive)),
        b"parallelGateway" => Some(FlowNodeKind::Gateway(GatewayKind::Parallel)),
        b"inclusiveGateway" => Some(FlowNodeKind::Gateway(GatewayKind::Inclusive)),
        b"complexGateway" => Some(FlowNodeKind::Gateway(GatewayKind::Complex)),
        b"eventBasedGateway" => Some(FlowNodeKind::Gateway(GatewayKind::EventBased)),
        _ => None,
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, ParseError> {
    for attribute in e.attributes() {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn require_id(e: &BytesStart<'_>, local: &[u8]) -> Result<String, ParseError> {
    attr(e, "id")?.ok_or_else(|| ParseError::MissingAttribute {
        element: String::from_utf8_lossy(local).into_owned(),
        attribute: "id",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_PROCESS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
                  xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI"
                  id="Defs1">
  <bpmn:process id="P1" name="Order handling" isExecutable="true">
    <bpmn:startEvent id="Start1" name="Order received"/>
    <bpmn:task id="Task1" name="Check order"/>
    <bpmn:endEvent id="End1" name="Order done"/>
    <bpmn:sequenceFlow id="Flow1" sourceRef="Start1" targetRef="Task1"/>
    <bpmn:sequenceFlow id="Flow2" sourceRef="Task1" targetRef="End1"/>
  </bpmn:process>
  <bpmndi:BPMNDiagram id="Diagram1">
    <bpmndi:BPMNPlane id="Plane1" bpmnElement="P1">
      <bpmndi:BPMNShape id="Shape1" bpmnElement="Start1"/>
      <bpmndi:BPMNShape id="Shape2" bpmnElement="Task1"/>
      <bpmndi:BPMNShape id="Shape3" bpmnElement="End1"/>
      <bpmndi:BPMNEdge id="Edge1" bpmnElement="Flow1"/>
      <bpmndi:BPMNEdge id="Edge2" bpmnElement="Flow2"/>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn:definitions>
"#;

    #[test]
    fn test_parses_simple_process() {
        let definitions = parse(SIMPLE_PROCESS).unwrap();

        assert_eq!(definitions.id.as_deref(), Some("Defs1"));
        let processes: Vec<_> = definitions.processes().collect();
        assert_eq!(processes.len(), 1);

        let process = processes[0];
        assert_eq!(process.id.as_deref(), Some("P1"));
        assert_eq!(process.flow_nodes.len(), 3);
        assert_eq!(process.sequence_flows.len(), 2);
        assert_eq!(process.flow_nodes[1].name.as_deref(), Some("Check order"));
        assert!(matches!(process.flow_nodes[2].kind, FlowNodeKind::EndEvent));
    }

    #[test]
    fn test_collects_diagram_references() {
        let definitions = parse(SIMPLE_PROCESS).unwrap();

        for id in ["P1", "Start1", "Task1", "End1", "Flow1", "Flow2"] {
            assert!(definitions.diagram_refs.contains(id), "missing {id}");
        }
    }

    #[test]
    fn test_parses_typed_start_event_and_condition() {
        let xml = r#"
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="D">
  <process id="P1">
    <startEvent id="Start1">
      <messageEventDefinition id="Msg1"/>
    </startEvent>
    <exclusiveGateway id="Gw1"/>
    <sequenceFlow id="Flow1" sourceRef="Gw1" targetRef="End1">
      <conditionExpression>amount &gt; 100</conditionExpression>
    </sequenceFlow>
    <endEvent id="End1"/>
  </process>
</definitions>"#;

        let definitions = parse(xml).unwrap();
        let process = definitions.processes().next().unwrap();

        assert_eq!(
            process.flow_nodes[0].event_definitions,
            vec!["messageEventDefinition".to_string()]
        );
        assert!(process.sequence_flows[0].has_condition);
    }

    #[test]
    fn test_parses_nested_sub_process() {
        let xml = r#"
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="D">
  <process id="P1">
    <subProcess id="Sub1" name="Inner">
      <startEvent id="SubStart"/>
      <endEvent id="SubEnd"/>
      <sequenceFlow id="SubFlow" sourceRef="SubStart" targetRef="SubEnd"/>
    </subProcess>
  </process>
</definitions>"#;

        let definitions = parse(xml).unwrap();
        let process = definitions.processes().next().unwrap();

        assert_eq!(process.flow_nodes.len(), 1);
        let FlowNodeKind::SubProcess(sub) = &process.flow_nodes[0].kind else {
            panic!("expected sub-process");
        };
        assert_eq!(sub.flow_nodes.len(), 2);
        assert_eq!(sub.sequence_flows.len(), 1);
    }

    #[test]
    fn test_parses_boundary_event_attachment() {
        let xml = r#"
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="D">
  <process id="P1">
    <task id="Task1"/>
    <boundaryEvent id="Boundary1" attachedToRef="Task1">
      <errorEventDefinition id="Err1"/>
    </boundaryEvent>
  </process>
</definitions>"#;

        let definitions = parse(xml).unwrap();
        let process = definitions.processes().next().unwrap();
        let boundary = &process.flow_nodes[1];

        assert!(matches!(boundary.kind, FlowNodeKind::BoundaryEvent));
        assert_eq!(boundary.attached_to_ref.as_deref(), Some("Task1"));
        assert_eq!(boundary.event_definitions.len(), 1);
    }

    #[test]
    fn test_parses_collaboration_participants() {
        let xml = r#"
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="D">
  <collaboration id="C1">
    <participant id="Part1" name="Customer" processRef="P1"/>
  </collaboration>
  <process id="P1"/>
  <message id="Msg1"/>
</definitions>"#;

        let definitions = parse(xml).unwrap();

        assert_eq!(definitions.root_elements.len(), 3);
        let RootElement::Collaboration(collaboration) = &definitions.root_elements[0] else {
            panic!("expected collaboration");
        };
        assert_eq!(collaboration.participants.len(), 1);
        assert_eq!(
            collaboration.participants[0].process_ref.as_deref(),
            Some("P1")
        );
        assert!(matches!(
            &definitions.root_elements[2],
            RootElement::Other { type_name, .. } if type_name == "message"
        ));
    }

    #[test]
    fn test_rejects_non_definitions_root() {
        let err = parse("<workflow id=\"W1\"/>").unwrap_err();
        assert!(matches!(err, ParseError::NotDefinitions(name) if name == "workflow"));
    }

    #[test]
    fn test_rejects_document_without_root() {
        assert!(matches!(parse(""), Err(ParseError::NoRootElement)));
        assert!(matches!(parse("not xml at all"), Err(ParseError::NoRootElement)));
    }

    #[test]
    fn test_rejects_malformed_xml() {
        let xml = "<definitions id=\"D\"><process id=\"P1\"></definitions>";
        assert!(matches!(parse(xml), Err(ParseError::Xml(_))));
    }

    #[test]
    fn test_rejects_flow_node_without_id() {
        let xml = r#"
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="D">
  <process id="P1">
    <task name="unidentified"/>
  </process>
</definitions>"#;

        let err = parse(xml).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingAttribute { element, attribute: "id" } if element == "task"
        ));
    }
}
