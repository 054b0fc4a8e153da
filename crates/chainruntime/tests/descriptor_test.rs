mod common;

use chaincore::{ChainError, ElementKind, Parameter, Value, ValueType};
use chainruntime::DescriptorFactory;

fn factory() -> DescriptorFactory {
    DescriptorFactory::new(common::stub_registry())
}

fn sample_fixed() -> Vec<(String, Value)> {
    vec![
        ("image".to_string(), Value::from("alpine")),
        ("command".to_string(), Value::from("echo result:$1")),
    ]
}

#[test]
fn compile_produces_a_valid_chain() {
    let factory = factory();
    let chain = factory
        .compile(
            "stub.run",
            sample_fixed(),
            vec![Parameter::required("msg", ValueType::String)],
            vec![Parameter::optional("out", ValueType::String)],
            "echo",
            Some("echoes a message".to_string()),
        )
        .unwrap();

    let report = chain.validate();
    assert!(report.is_valid(), "unexpected violations: {}", report);

    let exec = chain.resolve_execution_element().unwrap();
    assert!(exec.backend_code().unwrap().starts_with("stub.run-"));

    // One constant per fixed parameter.
    let constants = chain
        .elements
        .iter()
        .filter(|e| matches!(e.kind, ElementKind::Constant { .. }))
        .count();
    assert_eq!(constants, 2);
}

#[test]
fn compile_rejects_unknown_backend_kind() {
    let factory = factory();
    let result = factory.compile(
        "unknown.run",
        sample_fixed(),
        Vec::new(),
        Vec::new(),
        "nope",
        None,
    );
    assert!(matches!(result, Err(ChainError::UnknownBackend(_))));
}

#[test]
fn describe_lists_fixed_parameters_before_declared_ones() {
    let factory = factory();
    let chain = factory
        .compile(
            "stub.run",
            sample_fixed(),
            vec![
                Parameter::required("msg", ValueType::String),
                Parameter::optional("suffix", ValueType::String),
            ],
            vec![Parameter::optional("out", ValueType::String)],
            "echo",
            None,
        )
        .unwrap();

    let descriptor = factory.describe(&chain).unwrap();

    let input_codes: Vec<&str> = descriptor.inputs.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(input_codes, vec!["image", "command", "msg", "suffix"]);

    let output_codes: Vec<&str> = descriptor.outputs.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(output_codes, vec!["result", "out"]);
}

#[test]
fn describe_is_idempotent() {
    let factory = factory();
    let chain = factory
        .compile(
            "stub.run",
            sample_fixed(),
            vec![Parameter::required("msg", ValueType::String)],
            Vec::new(),
            "echo",
            None,
        )
        .unwrap();

    let first = factory.describe(&chain).unwrap();
    let second = factory.describe(&chain).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.inputs, second.inputs);
    assert_eq!(first.outputs, second.outputs);
}

#[test]
fn describe_rejects_unrecognized_backend_code() {
    let factory = factory();
    let mut chain = factory
        .compile(
            "stub.run",
            sample_fixed(),
            Vec::new(),
            Vec::new(),
            "echo",
            None,
        )
        .unwrap();

    for element in &mut chain.elements {
        if let ElementKind::Execution { backend_code } = &mut element.kind {
            *backend_code = "unknown.run-x".to_string();
        }
    }

    assert!(matches!(
        factory.describe(&chain),
        Err(ChainError::UnknownBackend(code)) if code == "unknown.run-x"
    ));
}

#[test]
fn descriptor_id_is_the_execution_element_code() {
    let factory = factory();
    let chain = factory
        .compile(
            "stub.run",
            sample_fixed(),
            Vec::new(),
            Vec::new(),
            "echo",
            None,
        )
        .unwrap();

    let descriptor = factory.describe(&chain).unwrap();
    let exec = chain.resolve_execution_element().unwrap();
    assert_eq!(descriptor.id, exec.backend_code().unwrap());
}
