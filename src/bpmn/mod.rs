//! In-process BPMN document collaborator: XML text in, element tree out.

pub mod model;
pub mod parser;

pub use model::{
    Collaboration, Definitions, Degrees, FlowNode, FlowNodeKind, FlowScope, GatewayKind,
    Participant, Process, RootElement, SequenceFlow, SubProcess,
};
pub use parser::{parse, ParseError};
