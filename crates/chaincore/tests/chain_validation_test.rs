use chaincore::{
    Chain, ChainError, ElementKind, Parameter, Value, ValueType, Violation,
};

/// A minimal well-formed chain: one docker execution element fed by an
/// image constant and one declared input, producing one declared output.
fn sample_chain() -> Chain {
    let mut chain = Chain::new("echo message");
    let start = chain.add_element(ElementKind::Start);
    let end = chain.add_element(ElementKind::End);
    let exec = chain.add_element(ElementKind::Execution {
        backend_code: "docker.run-3f2a".to_string(),
    });
    let image = chain.add_element(ElementKind::Constant {
        value_type: ValueType::String,
        value: Value::from("alpine"),
    });

    chain
        .inputs
        .push(Parameter::required("msg", ValueType::String));
    chain
        .outputs
        .push(Parameter::optional("result", ValueType::String));

    chain.link_data(image, "value", exec, "image");
    chain.link_data(start, "msg", exec, "msg");
    chain.link_data(exec, "result", end, "result");
    chain.link_flow(start, exec);
    chain.link_flow(exec, end);
    chain
}

#[test]
fn valid_chain_passes_validation() {
    let chain = sample_chain();
    let report = chain.validate();
    assert!(report.is_valid(), "unexpected violations: {}", report);
}

#[test]
fn resolves_single_execution_element() {
    let chain = sample_chain();
    let exec = chain.resolve_execution_element().unwrap();
    assert_eq!(exec.backend_code(), Some("docker.run-3f2a"));
}

#[test]
fn missing_execution_element_is_an_error() {
    let mut chain = Chain::new("empty");
    chain.add_element(ElementKind::Start);
    chain.add_element(ElementKind::End);

    assert!(matches!(
        chain.resolve_execution_element(),
        Err(ChainError::MissingExecutionElement)
    ));
    assert!(chain
        .validate()
        .violations
        .contains(&Violation::MissingExecutionElement));
}

#[test]
fn multiple_execution_elements_are_an_error() {
    let mut chain = sample_chain();
    chain.add_element(ElementKind::Execution {
        backend_code: "docker.run-9b1c".to_string(),
    });

    assert!(matches!(
        chain.resolve_execution_element(),
        Err(ChainError::MultipleExecutionElements(2))
    ));
    assert!(chain
        .validate()
        .violations
        .contains(&Violation::MultipleExecutionElements { count: 2 }));
}

#[test]
fn missing_sentinels_are_reported_together() {
    let mut chain = Chain::new("no sentinels");
    chain.add_element(ElementKind::Execution {
        backend_code: "docker.run-77aa".to_string(),
    });

    let report = chain.validate();
    assert!(report.violations.contains(&Violation::MissingStart));
    assert!(report.violations.contains(&Violation::MissingEnd));
}

#[test]
fn dangling_link_reference_is_reported() {
    let mut chain = sample_chain();
    let ghost = uuid::Uuid::new_v4();
    let exec = chain.resolve_execution_element().unwrap().id;
    chain.link_data(ghost, "out", exec, "in");

    let report = chain.validate();
    assert!(report
        .violations
        .contains(&Violation::UnknownElement { element: ghost }));
}

#[test]
fn unwired_declared_input_is_reported() {
    let mut chain = sample_chain();
    chain
        .inputs
        .push(Parameter::required("orphan", ValueType::String));

    let report = chain.validate();
    assert!(report.violations.contains(&Violation::UnwiredInput {
        code: "orphan".to_string()
    }));
}

#[test]
fn declared_output_without_link_is_reported() {
    let mut chain = sample_chain();
    chain
        .outputs
        .push(Parameter::optional("missing", ValueType::String));

    let report = chain.validate();
    assert!(report.violations.contains(&Violation::BadOutputWiring {
        code: "missing".to_string(),
        count: 0
    }));
}

#[test]
fn incompatible_link_types_are_reported() {
    let mut chain = sample_chain();
    let start = chain.start().unwrap().id;
    let end = chain.end().unwrap().id;
    chain
        .inputs
        .push(Parameter::required("count", ValueType::Number));
    chain
        .outputs
        .push(Parameter::optional("tally", ValueType::String));
    // Declared number input wired straight into a string output slot.
    chain.link_data(start, "count", end, "tally");

    let report = chain.validate();
    assert!(report.violations.iter().any(|v| matches!(
        v,
        Violation::TypeMismatch {
            source: ValueType::Number,
            target: ValueType::String,
            ..
        }
    )));
}

#[test]
fn cyclic_flow_is_reported() {
    let mut chain = sample_chain();
    let start = chain.start().unwrap().id;
    let exec = chain.resolve_execution_element().unwrap().id;
    chain.link_flow(exec, start);

    let report = chain.validate();
    assert!(report.violations.contains(&Violation::CyclicFlow));
    assert!(report.violations.contains(&Violation::StartHasIncoming));
}

#[test]
fn unreachable_element_is_reported() {
    let mut chain = sample_chain();
    // Dropping the Start->exec flow link strands the execution element.
    let start = chain.start().unwrap().id;
    chain.flow_links.retain(|l| l.source_element != start);

    let report = chain.validate();
    assert!(report
        .violations
        .iter()
        .any(|v| matches!(v, Violation::Unreachable { .. })));
}

#[test]
fn disconnected_constant_is_reported() {
    let mut chain = sample_chain();
    let orphan = chain.add_element(ElementKind::Constant {
        value_type: ValueType::Number,
        value: Value::from(3.0),
    });

    let report = chain.validate();
    assert!(report
        .violations
        .contains(&Violation::DisconnectedConstant { element: orphan }));
}

#[test]
fn chain_round_trips_through_json() {
    let chain = sample_chain();
    let json = serde_json::to_string(&chain).unwrap();
    let back: Chain = serde_json::from_str(&json).unwrap();
    assert_eq!(back.id, chain.id);
    assert_eq!(back.elements.len(), chain.elements.len());
    assert!(back.validate().is_valid());
}
