//! Pattern and list-format collaborators driven through nodes

mod common;

use std::sync::Arc;

use common::{context, context_from_toml};
use spectree::backend::intl::{ListStyle, ListType};
use spectree::backend::{
    EngineConfig, Frame, JsError, JsObject, NodeFactory, PatternEngine, PropertyKey, Value,
};

#[test]
fn test_pattern_literal_and_exec() {
    let context = context();
    let factory = NodeFactory::new(&context);
    let node = factory.pattern_exec(
        factory.pattern_literal(r"(\d+)-(\d+)", "").unwrap(),
        factory.constant("range 10-25"),
        factory.constant(0),
    );
    let mut frame = Frame::new(&context, 0);

    let result = node.execute(&mut frame).unwrap();
    let groups = result.as_object().unwrap();
    assert_eq!(
        groups.elements(),
        vec![Value::string("10-25"), Value::string("10"), Value::string("25")]
    );
    assert_eq!(groups.get(&PropertyKey::name("index")), Value::Int(6));
}

#[test]
fn test_pattern_exec_no_match_is_null() {
    let context = context();
    let factory = NodeFactory::new(&context);
    let node = factory.pattern_exec(
        factory.pattern_literal("z+", "i").unwrap(),
        factory.constant("abc"),
        factory.constant(0),
    );
    let mut frame = Frame::new(&context, 0);
    assert_eq!(node.execute(&mut frame).unwrap(), Value::Null);
}

#[test]
fn test_pattern_literal_rejected_before_execution() {
    let context = context();
    let factory = NodeFactory::new(&context);

    let err = factory.pattern_literal("(unclosed", "").unwrap_err();
    assert!(matches!(err, JsError::PatternSyntax { ref pattern, .. } if pattern == "(unclosed"));
    assert!(err.to_string().starts_with("SyntaxError"));

    let err = factory.pattern_literal("a", "q").unwrap_err();
    assert!(matches!(err, JsError::PatternSyntax { .. }));
}

#[test]
fn test_compile_from_args() {
    let context = context();
    let engine = context.pattern_engine();

    let pattern = engine
        .compile_from_args(&[Value::string("^a"), Value::string("m")])
        .unwrap();
    assert_eq!(pattern.source(), "^a");
    assert!(pattern.flags().multiline);

    assert_eq!(
        engine.compile_from_args(&[]).unwrap_err(),
        JsError::Arity { expected: 2, actual: 0 }
    );
    assert!(matches!(
        engine.compile_from_args(&[Value::Int(1)]),
        Err(JsError::UnsupportedType(_))
    ));
    assert!(matches!(
        engine.compile_from_args(&[Value::string("a"), Value::Bool(true)]),
        Err(JsError::UnsupportedType(_))
    ));
}

#[test]
fn test_compiled_patterns_are_shared() {
    let context = context();
    let engine = context.pattern_engine();
    let a = engine.compile("x+y", "g").unwrap();
    let b = engine.compile("x+y", "g").unwrap();
    let c = engine.compile("x+y", "").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn test_list_format_init_resolves_locale() {
    let context = context();
    let factory = NodeFactory::new(&context);
    let options = JsObject::from_pairs([("type", Value::string("disjunction"))]);
    let node = factory.list_format_init(
        factory.constant("de-DE"),
        factory.constant(Value::Object(options)),
    );
    let mut frame = Frame::new(&context, 0);

    let Value::ListFormat(config) = node.execute(&mut frame).unwrap() else {
        panic!("expected a list format configuration");
    };
    assert_eq!(config.locale(), "de");
    assert_eq!(config.requested_locales(), ["de-DE".to_string()]);
    assert_eq!(config.list_type(), ListType::Disjunction);
    assert_eq!(config.style(), ListStyle::Long);
    assert!(!config.is_formatter_built());
}

#[test]
fn test_list_format_formatter_is_lazy() {
    let context = context();
    let config = context
        .list_format()
        .initialize(&Value::string("en"), &Value::Undefined)
        .unwrap();

    assert!(!config.is_formatter_built());
    assert_eq!(config.format(&["a", "b", "c"]).unwrap(), "a, b, and c");
    assert!(config.is_formatter_built());
    assert_eq!(config.format(&["a", "b"]).unwrap(), "a and b");
}

#[test]
fn test_list_format_unavailable_locale_falls_back() {
    let context = context_from_toml(
        r#"
[intl]
default_locale = "fr"
available_locales = ["en", "fr"]
"#,
    );
    let config = context
        .list_format()
        .initialize(&Value::string("ja-JP"), &Value::Undefined)
        .unwrap();
    assert_eq!(config.locale(), "fr");
}

#[test]
fn test_list_format_option_errors() {
    let context = context();
    let factory = NodeFactory::new(&context);
    let mut frame = Frame::new(&context, 0);

    let narrow = JsObject::from_pairs([
        ("type", Value::string("conjunction")),
        ("style", Value::string("narrow")),
    ]);
    let node = factory.list_format_init(
        factory.constant("en"),
        factory.constant(Value::Object(narrow)),
    );
    assert!(matches!(node.execute(&mut frame), Err(JsError::Range(_))));

    let node = factory.list_format_init(factory.constant("en"), factory.constant(Value::Null));
    let err = node.execute(&mut frame).unwrap_err();
    assert!(err.is_type_error());

    let bad = JsObject::from_pairs([("style", Value::string("tiny"))]);
    let node = factory.list_format_init(
        factory.constant("en"),
        factory.constant(Value::Object(bad)),
    );
    assert!(matches!(node.execute(&mut frame), Err(JsError::Range(_))));

    let node = factory.list_format_init(factory.constant("en-"), factory.constant(Value::Undefined));
    assert!(matches!(node.execute(&mut frame), Err(JsError::Range(_))));
}

#[test]
fn test_config_rejects_unusable_values() {
    assert!(EngineConfig::from_toml_str("[pattern]\ncache_capacity = 0\n").is_err());
    assert!(EngineConfig::from_toml_str("[execution]\nturbo = true\n").is_err());
    assert!(EngineConfig::from_toml_str(
        "[intl]\ndefault_locale = \"de\"\navailable_locales = [\"en\"]\n"
    )
    .is_err());

    let config = EngineConfig::from_toml_str("[execution]\nspeculation = false\n").unwrap();
    assert!(!config.execution.speculation);
    assert!(config.execution.strict == EngineConfig::default().execution.strict);
}
