use crate::{ChainError, Value, ValueType};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub type ChainId = Uuid;
pub type ElementId = Uuid;

/// Declarative description of one registrable process: a graph of elements
/// and the wiring between them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub id: ChainId,
    pub title: String,
    pub description: Option<String>,
    pub elements: Vec<Element>,
    pub data_links: Vec<DataLink>,
    pub flow_links: Vec<FlowLink>,
    /// Declared external inputs, exposed as outputs of the Start sentinel
    pub inputs: Vec<Parameter>,
    /// Declared external outputs, exposed as inputs of the End sentinel
    pub outputs: Vec<Parameter>,
}

impl Chain {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            elements: Vec::new(),
            data_links: Vec::new(),
            flow_links: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn add_element(&mut self, kind: ElementKind) -> ElementId {
        let element = Element {
            id: Uuid::new_v4(),
            kind,
        };
        let id = element.id;
        self.elements.push(element);
        id
    }

    pub fn link_data(
        &mut self,
        source_element: ElementId,
        source_output: impl Into<String>,
        target_element: ElementId,
        target_input: impl Into<String>,
    ) {
        self.data_links.push(DataLink {
            source_element,
            source_output: source_output.into(),
            target_element,
            target_input: target_input.into(),
        });
    }

    pub fn link_flow(&mut self, source_element: ElementId, target_element: ElementId) {
        self.flow_links.push(FlowLink {
            source_element,
            target_element,
        });
    }

    pub fn find_element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn start(&self) -> Option<&Element> {
        self.elements
            .iter()
            .find(|e| matches!(e.kind, ElementKind::Start))
    }

    pub fn end(&self) -> Option<&Element> {
        self.elements
            .iter()
            .find(|e| matches!(e.kind, ElementKind::End))
    }

    /// Find the single execution element. Zero or more than one is a
    /// topology error, not a silent pick.
    pub fn resolve_execution_element(&self) -> Result<&Element, ChainError> {
        let mut execs = self
            .elements
            .iter()
            .filter(|e| matches!(e.kind, ElementKind::Execution { .. }));

        match (execs.next(), execs.next()) {
            (None, _) => Err(ChainError::MissingExecutionElement),
            (Some(element), None) => Ok(element),
            (Some(_), Some(_)) => {
                let count = self
                    .elements
                    .iter()
                    .filter(|e| matches!(e.kind, ElementKind::Execution { .. }))
                    .count();
                Err(ChainError::MultipleExecutionElements(count))
            }
        }
    }

    /// Check every structural invariant at once and report all violations,
    /// so a caller can surface every problem in a single pass.
    pub fn validate(&self) -> ValidationReport {
        let mut violations = Vec::new();

        let starts = self
            .elements
            .iter()
            .filter(|e| matches!(e.kind, ElementKind::Start))
            .count();
        match starts {
            0 => violations.push(Violation::MissingStart),
            1 => {}
            _ => violations.push(Violation::DuplicateStart),
        }

        let ends = self
            .elements
            .iter()
            .filter(|e| matches!(e.kind, ElementKind::End))
            .count();
        match ends {
            0 => violations.push(Violation::MissingEnd),
            1 => {}
            _ => violations.push(Violation::DuplicateEnd),
        }

        let execs = self
            .elements
            .iter()
            .filter(|e| matches!(e.kind, ElementKind::Execution { .. }))
            .count();
        match execs {
            0 => violations.push(Violation::MissingExecutionElement),
            1 => {}
            count => violations.push(Violation::MultipleExecutionElements { count }),
        }

        let by_id: HashMap<ElementId, &Element> =
            self.elements.iter().map(|e| (e.id, e)).collect();

        for link in &self.data_links {
            let source = by_id.get(&link.source_element);
            let target = by_id.get(&link.target_element);
            if source.is_none() {
                violations.push(Violation::UnknownElement {
                    element: link.source_element,
                });
            }
            if target.is_none() {
                violations.push(Violation::UnknownElement {
                    element: link.target_element,
                });
            }
            if let (Some(source), Some(target)) = (source, target) {
                let source_type = self.port_type(source, &link.source_output, true);
                let target_type = self.port_type(target, &link.target_input, false);
                if let (Some(source_type), Some(target_type)) = (source_type, target_type) {
                    if !source_type.compatible(target_type) {
                        violations.push(Violation::TypeMismatch {
                            source_output: link.source_output.clone(),
                            target_input: link.target_input.clone(),
                            source: source_type,
                            target: target_type,
                        });
                    }
                }
            }
        }

        for link in &self.flow_links {
            for id in [link.source_element, link.target_element] {
                if !by_id.contains_key(&id) {
                    violations.push(Violation::UnknownElement { element: id });
                }
            }
            if let Some(target) = by_id.get(&link.target_element) {
                if matches!(target.kind, ElementKind::Start) {
                    violations.push(Violation::StartHasIncoming);
                }
            }
            if let Some(source) = by_id.get(&link.source_element) {
                if matches!(source.kind, ElementKind::End) {
                    violations.push(Violation::EndHasOutgoing);
                }
            }
        }

        // Declared inputs leave through the Start sentinel.
        for input in &self.inputs {
            let wired = self.data_links.iter().any(|l| {
                l.source_output == input.code
                    && by_id
                        .get(&l.source_element)
                        .is_some_and(|e| matches!(e.kind, ElementKind::Start))
            });
            if !wired {
                violations.push(Violation::UnwiredInput {
                    code: input.code.clone(),
                });
            }
        }

        // Declared outputs arrive at the End sentinel from the execution
        // element, exactly once each.
        for output in &self.outputs {
            let count = self
                .data_links
                .iter()
                .filter(|l| {
                    l.target_input == output.code
                        && by_id
                            .get(&l.target_element)
                            .is_some_and(|e| matches!(e.kind, ElementKind::End))
                        && by_id
                            .get(&l.source_element)
                            .is_some_and(|e| matches!(e.kind, ElementKind::Execution { .. }))
                })
                .count();
            if count != 1 {
                violations.push(Violation::BadOutputWiring {
                    code: output.code.clone(),
                    count,
                });
            }
        }

        // A constant that feeds nothing is dead wiring.
        for element in &self.elements {
            if matches!(element.kind, ElementKind::Constant { .. }) {
                let connected = self
                    .data_links
                    .iter()
                    .any(|l| l.source_element == element.id);
                if !connected {
                    violations.push(Violation::DisconnectedConstant {
                        element: element.id,
                    });
                }
            }
        }

        self.check_flow_graph(&mut violations);

        ValidationReport { violations }
    }

    /// Cycle and reachability checks over the flow-link graph.
    fn check_flow_graph(&self, violations: &mut Vec<Violation>) {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for element in &self.elements {
            // Constants carry data, not flow.
            if matches!(element.kind, ElementKind::Constant { .. }) {
                continue;
            }
            index.insert(element.id, graph.add_node(element.id));
        }

        for link in &self.flow_links {
            if let (Some(&a), Some(&b)) = (
                index.get(&link.source_element),
                index.get(&link.target_element),
            ) {
                graph.add_edge(a, b, ());
            }
        }

        if toposort(&graph, None).is_err() {
            violations.push(Violation::CyclicFlow);
            return;
        }

        if let Some(start) = self.start() {
            let mut reached = HashSet::new();
            let mut bfs = Bfs::new(&graph, index[&start.id]);
            while let Some(nx) = bfs.next(&graph) {
                reached.insert(graph[nx]);
            }
            for (id, _) in &index {
                if !reached.contains(id) {
                    violations.push(Violation::Unreachable { element: *id });
                }
            }
        }
    }

    /// Statically known type of an element port, where one exists. Execution
    /// element ports are only described by the backend, not the chain.
    fn port_type(&self, element: &Element, code: &str, output: bool) -> Option<ValueType> {
        match &element.kind {
            ElementKind::Start if output => self
                .inputs
                .iter()
                .find(|p| p.code == code)
                .map(|p| p.value_type),
            ElementKind::End if !output => self
                .outputs
                .iter()
                .find(|p| p.code == code)
                .map(|p| p.value_type),
            ElementKind::Constant { value_type, .. } if output => Some(*value_type),
            _ => None,
        }
    }
}

/// Graph node of a chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
}

impl Element {
    pub fn backend_code(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Execution { backend_code } => Some(backend_code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ElementKind {
    Start,
    End,
    Constant {
        value_type: ValueType,
        value: Value,
    },
    /// The one node representing the external computation; the backend code
    /// is a namespaced string such as `docker.run-<uuid>` whose prefix
    /// selects the execution backend.
    Execution {
        backend_code: String,
    },
}

/// Input or output parameter specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub code: String,
    pub value_type: ValueType,
    pub title: Option<String>,
    pub description: Option<String>,
    pub min_occurs: u32,
    /// 0 means unbounded
    pub max_occurs: u32,
}

impl Parameter {
    pub fn required(code: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            code: code.into(),
            value_type,
            title: None,
            description: None,
            min_occurs: 1,
            max_occurs: 1,
        }
    }

    pub fn optional(code: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            min_occurs: 0,
            ..Self::required(code, value_type)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_occurs(mut self, min_occurs: u32, max_occurs: u32) -> Self {
        self.min_occurs = min_occurs;
        self.max_occurs = max_occurs;
        self
    }

    pub fn is_required(&self) -> bool {
        self.min_occurs >= 1
    }
}

/// Edge carrying a named value from one element's output to another
/// element's input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLink {
    pub source_element: ElementId,
    pub source_output: String,
    pub target_element: ElementId,
    pub target_input: String,
}

/// Edge declaring execution order between elements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowLink {
    pub source_element: ElementId,
    pub target_element: ElementId,
}

/// A single invariant violation found by [`Chain::validate`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("chain has no Start element")]
    MissingStart,

    #[error("chain has more than one Start element")]
    DuplicateStart,

    #[error("chain has no End element")]
    MissingEnd,

    #[error("chain has more than one End element")]
    DuplicateEnd,

    #[error("chain has no execution element")]
    MissingExecutionElement,

    #[error("chain has {count} execution elements, exactly one is required")]
    MultipleExecutionElements { count: usize },

    #[error("link references unknown element {element}")]
    UnknownElement { element: ElementId },

    #[error("data link {source_output} -> {target_input}: {source:?} is not compatible with {target:?}")]
    TypeMismatch {
        source_output: String,
        target_input: String,
        source: ValueType,
        target: ValueType,
    },

    #[error("declared input '{code}' is not the source of any data link")]
    UnwiredInput { code: String },

    #[error("declared output '{code}' must be fed by exactly one data link from the execution element, found {count}")]
    BadOutputWiring { code: String, count: usize },

    #[error("constant element {element} is not connected to any data link")]
    DisconnectedConstant { element: ElementId },

    #[error("flow links contain a cycle")]
    CyclicFlow,

    #[error("element {element} is not reachable from Start")]
    Unreachable { element: ElementId },

    #[error("Start element has incoming flow links")]
    StartHasIncoming,

    #[error("End element has outgoing flow links")]
    EndHasOutgoing,
}

/// All violations found in one validation pass
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.violations.is_empty() {
            return write!(f, "valid");
        }
        let messages: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}
