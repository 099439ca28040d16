//! Tests for the compound element write and the node framework around it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use super::*;
use crate::backend::config::EngineConfig;
use crate::backend::context::Context;
use crate::backend::error::JsError;
use crate::backend::models::{JsObject, ObjectRef, PropertyKey};

const STRICT: StoreFlags = StoreFlags {
    strict: true,
    write_own: false,
};

fn compound(value: Node, write_index: Option<FrameSlot>) -> CompoundWriteElementNode {
    CompoundWriteElementNode::new(
        Node::constant(Value::Undefined),
        Node::constant(Value::Undefined),
        value,
        write_index,
        STRICT,
    )
}

fn object_with(values: Vec<Value>) -> (ObjectRef, Value) {
    let obj = JsObject::new_array(values);
    let value = Value::Object(obj.clone());
    (obj, value)
}

#[test]
fn test_store_at_canonical_index() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 0);
    let (obj, target) = object_with(vec![]);
    let node = compound(Node::constant(Value::Int(5)), None);

    let result = node
        .execute_with_target_and_index(&mut frame, &target, &Value::string("2"))
        .unwrap();

    assert_eq!(result, Value::Int(5));
    assert_eq!(obj.get(&PropertyKey::Index(2)), Value::Int(5));
    assert!(obj.get_named("2").is_none());
    let seen = node.to_array_index_helper().unwrap().seen();
    assert!(seen.string);
}

#[test]
fn test_undefined_target_fails_before_index_work() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 1);
    let node = compound(Node::constant(Value::Int(1)), Some(FrameSlot(0)));

    let err = node
        .execute_with_target_and_index(&mut frame, &Value::Undefined, &Value::string("0"))
        .unwrap_err();

    assert!(matches!(err, JsError::TypeCoercion(_)));
    assert!(node.require_coercible_helper().is_some());
    assert!(node.to_array_index_helper().is_none());
    assert_eq!(frame.get(FrameSlot(0)), Value::Undefined);
}

#[test]
fn test_index_child_not_evaluated_for_null_target() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 1);
    let node = Node::compound_write_element(
        Node::constant(Value::Null),
        Node::write_local(FrameSlot(0), Node::constant(Value::string("side effect"))),
        Node::constant(Value::Int(1)),
        None,
        STRICT,
    );

    assert!(matches!(node.execute(&mut frame), Err(JsError::TypeCoercion(_))));
    assert_eq!(frame.get(FrameSlot(0)), Value::Undefined);
}

#[test]
fn test_index_cache_visible_to_sibling_read() {
    let context = Arc::new(Context::default());
    let factory = NodeFactory::new(&context);
    let mut desc = FrameDescriptor::new();
    let obj_slot = desc.add_slot("obj");

    let node = factory.compound_element_assignment(
        &mut desc,
        BinaryOp::Add,
        factory.read_local(obj_slot),
        factory.constant("2"),
        factory.constant(5),
    );
    let cache = node.as_compound_write().unwrap().index_cache_slot().unwrap();

    let (obj, target) = object_with(vec![Value::Int(0), Value::Int(0), Value::Int(10)]);
    let mut frame = Frame::with_args(&context, desc.size(), &[target]);

    assert_eq!(node.execute(&mut frame).unwrap(), Value::Int(15));
    assert_eq!(frame.get(cache), Value::Int(2));
    assert_eq!(obj.get(&PropertyKey::Index(2)), Value::Int(15));
}

#[test]
fn test_prepare_returns_canonical_index() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 1);
    let (_, target) = object_with(vec![]);
    let node = compound(Node::constant(Value::Int(0)), Some(FrameSlot(0)));

    let key = node.prepare(&mut frame, &target, &Value::Double(3.0)).unwrap();
    assert_eq!(key, PropertyKey::Index(3));
    assert_eq!(frame.get(FrameSlot(0)), Value::Int(3));

    let key = node.prepare_int(&mut frame, &target, -1).unwrap();
    assert_eq!(key, PropertyKey::name("-1"));
    assert_eq!(frame.get(FrameSlot(0)), Value::Int(-1));
}

#[test]
fn test_int_entry_falls_back_on_division() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 0);
    let (obj, target) = object_with(vec![]);
    let division = Node::binary(
        BinaryOp::Div,
        Node::constant(Value::Int(5)),
        Node::constant(Value::Int(2)),
    );
    let node = compound(division, None);

    let result = node
        .execute_int_with_target_and_int_index(&mut frame, &target, 0)
        .unwrap();
    assert_eq!(result, Speculated::Unexpected(Value::Double(2.5)));
    assert_eq!(obj.store_count(), 1);

    let generic = node
        .execute_with_target_and_int_index(&mut frame, &target, 0)
        .unwrap();
    assert_eq!(generic, Value::Double(2.5));
    assert_eq!(obj.get(&PropertyKey::Index(0)), Value::Double(2.5));
    assert_eq!(node.base().value_speculation(), ValueKind::Double);
}

#[test]
fn test_execute_resolves_mismatch() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 0);
    let (_, target) = object_with(vec![]);
    let node = Node::compound_write_element(
        Node::constant(target),
        Node::constant(Value::Int(0)),
        Node::binary(BinaryOp::Div, Node::constant(Value::Int(5)), Node::constant(Value::Int(2))),
        None,
        STRICT,
    );
    assert_eq!(node.execute(&mut frame).unwrap(), Value::Double(2.5));
}

#[test]
fn test_typed_and_generic_entries_agree() {
    let context = Context::default();
    let values = [
        Value::Int(7),
        Value::Int(-3),
        Value::Double(2.5),
        Value::Double(-0.0),
        Value::string("s"),
        Value::Bool(true),
        Value::Null,
    ];
    let indices = [Value::Int(1), Value::string("1"), Value::Double(1.0), Value::string("x")];

    for value in &values {
        for index in &indices {
            let mut frame = Frame::new(&context, 0);
            let (generic_obj, generic_target) = object_with(vec![]);
            let (int_obj, int_target) = object_with(vec![]);
            let (double_obj, double_target) = object_with(vec![]);
            let key = PropertyKey::from_value(index);

            let generic = compound(Node::constant(value.clone()), None)
                .execute_with_target_and_index(&mut frame, &generic_target, index)
                .unwrap();
            let int = compound(Node::constant(value.clone()), None)
                .execute_int_with_target_and_index(&mut frame, &int_target, index)
                .unwrap();
            let double = compound(Node::constant(value.clone()), None)
                .execute_double_with_target_and_index(&mut frame, &double_target, index)
                .unwrap();

            assert_eq!(int.clone().into_value(), generic, "{} at {}", value, index);
            assert_eq!(double.clone().into_value(), generic, "{} at {}", value, index);
            assert_eq!(int.is_exact(), matches!(value, Value::Int(_)));
            assert_eq!(double.is_exact(), value.is_number());
            assert_eq!(generic_obj.get(&key), int_obj.get(&key));
            assert_eq!(generic_obj.get(&key), double_obj.get(&key));
        }
    }
}

#[test]
fn test_int_index_entries_agree() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 0);
    let node = compound(Node::constant(Value::Int(4)), None);

    for index in [0, 3, -2] {
        let (a, ta) = object_with(vec![]);
        let (b, tb) = object_with(vec![]);
        let generic = node.execute_with_target_and_int_index(&mut frame, &ta, index).unwrap();
        let typed = node.execute_int_with_target_and_int_index(&mut frame, &tb, index).unwrap();
        let double = node
            .execute_double_with_target_and_int_index(&mut frame, &tb, index)
            .unwrap();
        assert_eq!(typed, Speculated::Exact(4));
        assert_eq!(double, Speculated::Exact(4.0));
        assert_eq!(generic, Value::Int(4));
        let key = PropertyKey::from_int(index);
        assert_eq!(a.get(&key), b.get(&key));
    }
    assert!(node.to_array_index_helper().is_none());
}

#[test]
fn test_speculation_generalizes_monotonically() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 1);
    let (_, target) = object_with(vec![]);
    let node = Node::compound_write_element(
        Node::constant(target),
        Node::constant(Value::Int(0)),
        Node::read_local(FrameSlot(0)),
        None,
        STRICT,
    );
    let base = node.as_compound_write().unwrap().base();

    frame.set(FrameSlot(0), Value::Int(1));
    node.execute(&mut frame).unwrap();
    assert_eq!(base.value_speculation(), ValueKind::Int);

    frame.set(FrameSlot(0), Value::Double(0.5));
    assert_eq!(node.execute(&mut frame).unwrap(), Value::Double(0.5));
    assert_eq!(base.value_speculation(), ValueKind::Double);

    frame.set(FrameSlot(0), Value::string("s"));
    assert_eq!(node.execute(&mut frame).unwrap(), Value::string("s"));
    assert_eq!(base.value_speculation(), ValueKind::Generic);

    frame.set(FrameSlot(0), Value::Int(2));
    assert_eq!(node.execute(&mut frame).unwrap(), Value::Int(2));
    assert_eq!(base.value_speculation(), ValueKind::Generic);
}

#[test]
fn test_speculation_disabled_gives_same_results() {
    let mut config = EngineConfig::default();
    config.execution.speculation = false;
    let context = Context::new(config);
    let mut frame = Frame::new(&context, 0);
    assert!(!frame.speculating());

    let (obj, target) = object_with(vec![Value::Int(4)]);
    let node = Node::compound_write_element(
        Node::constant(target),
        Node::constant(Value::string("0")),
        Node::binary(BinaryOp::Mul, Node::constant(Value::Int(3)), Node::constant(Value::Double(0.5))),
        None,
        STRICT,
    );
    assert_eq!(node.execute(&mut frame).unwrap(), Value::Double(1.5));
    assert_eq!(obj.get(&PropertyKey::Index(0)), Value::Double(1.5));
}

#[test]
fn test_clone_uninitialized_is_independent() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 2);
    let node = compound(Node::read_local(FrameSlot(0)), Some(FrameSlot(1)));
    let (_, target) = object_with(vec![]);

    frame.set(FrameSlot(0), Value::Int(1));
    node.execute_with_target_and_index(&mut frame, &target, &Value::string("1"))
        .unwrap();
    assert!(node.to_array_index_helper().is_some());
    assert_eq!(node.base().value_speculation(), ValueKind::Int);

    let copy = node.clone_uninitialized();
    assert!(copy.require_coercible_helper().is_none());
    assert!(copy.to_array_index_helper().is_none());
    assert_eq!(copy.base().value_speculation(), ValueKind::Uninitialized);
    assert_eq!(copy.index_cache_slot(), node.index_cache_slot());
    assert_eq!(copy.base().flags(), node.base().flags());

    frame.set(FrameSlot(0), Value::string("s"));
    copy.execute_with_target_and_index(&mut frame, &target, &Value::Double(0.5))
        .unwrap();
    assert_eq!(copy.base().value_speculation(), ValueKind::Generic);
    assert_eq!(node.base().value_speculation(), ValueKind::Int);

    let original = node.to_array_index_helper().unwrap();
    let cloned = copy.to_array_index_helper().unwrap();
    assert!(!Arc::ptr_eq(original, cloned));
    assert!(!original.seen().double);
}

#[test]
fn test_clone_keeps_spans_and_tags() {
    let node = Node::binary(
        BinaryOp::Add,
        Node::constant(Value::Int(1)).with_span(SourceSpan::new(0, 1)),
        Node::constant(Value::Int(2)),
    )
    .with_span(SourceSpan::new(0, 5))
    .with_tags(TagSet::of(Tag::BinaryOperation));

    let copy = node.clone_uninitialized();
    assert_eq!(copy.to_string(), node.to_string());
    assert_eq!(copy.tags(), node.tags());
    assert_eq!(copy.children()[0].span(), Some(SourceSpan::new(0, 1)));
}

#[test]
fn test_lazy_helpers_race_to_one_instance() {
    const THREADS: usize = 8;
    let context = Context::default();
    let node = compound(Node::constant(Value::Int(1)), None);
    let barrier = Barrier::new(THREADS);
    let stores = AtomicUsize::new(0);

    let seen: Vec<(Arc<RequireObjectCoercibleNode>, Arc<ToArrayIndexNode>)> =
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let (node, context, barrier, stores) = (&node, &context, &barrier, &stores);
                    s.spawn(move || {
                        let mut frame = Frame::new(context, 0);
                        let (obj, target) = object_with(vec![]);
                        barrier.wait();
                        node.execute_with_target_and_index(&mut frame, &target, &Value::string("0"))
                            .unwrap();
                        stores.fetch_add(obj.store_count() as usize, Ordering::SeqCst);
                        (
                            Arc::clone(node.require_coercible_helper().unwrap()),
                            Arc::clone(node.to_array_index_helper().unwrap()),
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

    assert_eq!(stores.load(Ordering::SeqCst), THREADS);
    let coercible = node.require_coercible_helper().unwrap();
    let to_index = node.to_array_index_helper().unwrap();
    for (c, t) in &seen {
        assert!(Arc::ptr_eq(c, coercible));
        assert!(Arc::ptr_eq(t, to_index));
    }
}

#[derive(Default)]
struct Recorder {
    entered: AtomicUsize,
    returned: AtomicUsize,
    failed: AtomicUsize,
}

impl ExecutionListener for Recorder {
    fn on_enter(&self, _meta: &NodeMeta) {
        self.entered.fetch_add(1, Ordering::SeqCst);
    }

    fn on_return(&self, _meta: &NodeMeta, _value: &Value) {
        self.returned.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, _meta: &NodeMeta, _error: &JsError) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_instrumented_tree_reports_and_matches() {
    let context = Context::default();
    let recorder = Arc::new(Recorder::default());
    context.set_listener(recorder.clone());

    let (_, plain_target) = object_with(vec![Value::Int(1)]);
    let (_, instrumented_target) = object_with(vec![Value::Int(1)]);
    let build = |target: Value| {
        Node::compound_write_element(
            Node::constant(target),
            Node::constant(Value::Int(0)),
            Node::constant(Value::Int(41)),
            None,
            STRICT,
        )
        .with_span(SourceSpan::new(0, 10))
    };
    let plain = build(plain_target);
    let instrumented = build(instrumented_target).instrument(TagSet::of(Tag::WriteElementExpression));

    let mut frame = Frame::new(&context, 0);
    assert_eq!(
        plain.execute(&mut frame).unwrap(),
        instrumented.execute(&mut frame).unwrap()
    );
    assert_eq!(recorder.entered.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.returned.load(Ordering::SeqCst), 3);

    let failing = Node::binary(
        BinaryOp::Add,
        Node::read_element(Node::constant(Value::Undefined), Node::constant(Value::Int(0))),
        Node::constant(Value::Int(1)),
    )
    .instrument(TagSet::of(Tag::BinaryOperation));
    assert!(failing.execute(&mut frame).is_err());
    assert_eq!(recorder.failed.load(Ordering::SeqCst), 1);

    context.clear_listener();
    assert_eq!(instrumented.execute(&mut frame).unwrap(), Value::Int(41));
    assert_eq!(recorder.entered.load(Ordering::SeqCst), 4);
}

#[test]
fn test_widening_bumps_invalidation_epoch() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 1);
    let node = Node::binary(BinaryOp::Add, Node::read_local(FrameSlot(0)), Node::constant(Value::Int(1)));

    frame.set(FrameSlot(0), Value::Int(1));
    assert_eq!(node.execute(&mut frame).unwrap(), Value::Int(2));

    let before = invalidation_epoch();
    frame.set(FrameSlot(0), Value::Double(0.5));
    assert_eq!(node.execute(&mut frame).unwrap(), Value::Double(1.5));
    assert!(invalidation_epoch() > before);
}

#[test]
fn test_call_target_records_invalidation_epoch() {
    let context = Arc::new(Context::default());
    let node = Node::binary(BinaryOp::Add, Node::read_local(FrameSlot(0)), Node::constant(Value::Int(1)));
    let routine = CallTarget::new(node, 1, context);
    let created = routine.observed_epoch();
    assert!(created <= invalidation_epoch());

    assert_eq!(routine.call(&[Value::Int(1)]).unwrap(), Value::Int(2));
    assert!(routine.observed_epoch() >= created);

    let before = invalidation_epoch();
    assert_eq!(routine.call(&[Value::Double(0.5)]).unwrap(), Value::Double(1.5));
    assert!(routine.observed_epoch() > before);

    let shared = routine.clone();
    assert_eq!(shared.observed_epoch(), routine.observed_epoch());
}

#[test]
fn test_int_overflow_leaves_int_channel() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 0);
    let node = Node::binary(
        BinaryOp::Add,
        Node::constant(Value::Int(i32::MAX)),
        Node::constant(Value::Int(1)),
    );
    let result = node.execute_int(&mut frame).unwrap();
    assert_eq!(result, Speculated::Unexpected(Value::Double(2147483648.0)));
}

#[test]
fn test_compound_length_store_resizes_array() {
    let context = Arc::new(Context::default());
    let factory = NodeFactory::new(&context);
    let mut desc = FrameDescriptor::new();
    let arr = desc.add_slot("arr");
    let node = factory.compound_element_assignment(
        &mut desc,
        BinaryOp::Add,
        factory.read_local(arr),
        factory.constant("length"),
        factory.constant(1),
    );
    let (obj, target) = object_with(vec![Value::Int(1), Value::Int(2)]);
    let mut frame = Frame::with_args(&context, desc.size(), &[target.clone()]);

    assert_eq!(node.execute(&mut frame).unwrap(), Value::Int(3));
    assert_eq!(obj.length(), 3);
    assert_eq!(read_element(&target, &PropertyKey::name("length")).unwrap(), Value::Int(3));
    assert_eq!(obj.get(&PropertyKey::Index(2)), Value::Undefined);

    let shrink = factory.compound_element_assignment(
        &mut desc,
        BinaryOp::Sub,
        factory.read_local(arr),
        factory.constant("length"),
        factory.constant(2),
    );
    let mut frame = Frame::with_args(&context, desc.size(), &[target]);
    assert_eq!(shrink.execute(&mut frame).unwrap(), Value::Int(1));
    assert_eq!(obj.elements(), vec![Value::Int(1)]);
}

#[test]
fn test_compound_invalid_length_is_range_error() {
    let context = Context::default();
    let mut frame = Frame::new(&context, 0);
    let (obj, target) = object_with(vec![Value::Int(1)]);
    let node = compound(Node::constant(Value::Double(0.5)), None);

    let err = node
        .execute_with_target_and_index(&mut frame, &target, &Value::string("length"))
        .unwrap_err();
    assert!(matches!(err, JsError::Range(_)));
    assert_eq!(obj.length(), 1);
    assert_eq!(obj.store_count(), 0);
}
