//! Shared helpers for the integration tests
//!
//! - contexts built from TOML snippets
//! - `obj[index] op= rhs` routines
//! - a recording execution listener
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use spectree::backend::nodes::{BinaryOp, NodeMeta};
use spectree::backend::{
    CallTarget, Context, EngineConfig, ExecutionListener, FrameDescriptor, JsError, JsObject,
    NodeFactory, ObjectRef, Value,
};

/// Context with the default configuration
pub fn context() -> Arc<Context> {
    Arc::new(Context::default())
}

/// Context built from a TOML configuration snippet
pub fn context_from_toml(toml: &str) -> Arc<Context> {
    let config = EngineConfig::from_toml_str(toml).expect("test config should parse");
    Arc::new(Context::from_config(config).expect("test config should validate"))
}

/// Routine `(obj, index, rhs) => obj[index] op= rhs`, arguments in slots 0..3
pub fn compound_routine(context: &Arc<Context>, op: BinaryOp) -> CallTarget {
    compound_routine_with(&NodeFactory::new(context), op)
}

pub fn compound_routine_with(factory: &NodeFactory, op: BinaryOp) -> CallTarget {
    let mut frame = FrameDescriptor::new();
    let obj = frame.add_slot("obj");
    let index = frame.add_slot("index");
    let rhs = frame.add_slot("rhs");

    let node = factory.compound_element_assignment(
        &mut frame,
        op,
        factory.read_local(obj),
        factory.read_local(index),
        factory.read_local(rhs),
    );
    CallTarget::new(node, frame.size(), Arc::clone(factory.context()))
}

/// An array object and the value referring to it
pub fn array(values: Vec<Value>) -> (ObjectRef, Value) {
    let obj = JsObject::new_array(values);
    let value = Value::Object(obj.clone());
    (obj, value)
}

pub fn ints(values: &[i32]) -> Vec<Value> {
    values.iter().map(|&i| Value::Int(i)).collect()
}

/// Listener recording every event it sees
#[derive(Default)]
pub struct RecordingListener {
    entered: AtomicUsize,
    returned: Mutex<Vec<Value>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn returned(&self) -> Vec<Value> {
        self.returned.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl ExecutionListener for RecordingListener {
    fn on_enter(&self, _meta: &NodeMeta) {
        self.entered.fetch_add(1, Ordering::SeqCst);
    }

    fn on_return(&self, _meta: &NodeMeta, value: &Value) {
        self.returned.lock().push(value.clone());
    }

    fn on_error(&self, _meta: &NodeMeta, error: &JsError) {
        self.errors.lock().push(error.to_string());
    }
}
