//! Base element store: `target[index] = value`.
//!
//! [`WriteElementNode`] owns the target, index and value children and the
//! store itself. The compound write composes it and reuses the
//! `execute_*_with_target_and_key` family after running its own prologue.

use tracing::trace;

use crate::backend::error::{JsError, JsResult};
use crate::backend::models::{PropertyKey, StoreFlags, Value};

use super::frame::Frame;
use super::speculation::{SpeculationState, Speculated, ValueKind};
use super::{ChildMap, Node};

#[derive(Debug)]
pub struct WriteElementNode {
    target: Box<Node>,
    index: Box<Node>,
    value: Box<Node>,
    flags: StoreFlags,
    /// Kinds of values stored so far, picks the value channel
    value_state: SpeculationState,
    /// Kinds of index values seen so far, picks the index channel
    index_state: SpeculationState,
}

impl WriteElementNode {
    pub fn new(target: Node, index: Node, value: Node, flags: StoreFlags) -> Self {
        WriteElementNode {
            target: Box::new(target),
            index: Box::new(index),
            value: Box::new(value),
            flags,
            value_state: SpeculationState::new(),
            index_state: SpeculationState::new(),
        }
    }

    pub fn target(&self) -> &Node {
        &self.target
    }

    pub fn index(&self) -> &Node {
        &self.index
    }

    pub fn value(&self) -> &Node {
        &self.value
    }

    pub fn flags(&self) -> StoreFlags {
        self.flags
    }

    pub fn is_strict(&self) -> bool {
        self.flags.strict
    }

    pub fn is_write_own(&self) -> bool {
        self.flags.write_own
    }

    pub fn value_speculation(&self) -> ValueKind {
        self.value_state.kind()
    }

    pub fn index_speculation(&self) -> ValueKind {
        self.index_state.kind()
    }

    pub fn execute(&self, frame: &mut Frame<'_>) -> JsResult<Value> {
        let target = self.target.execute(frame)?;
        let key = self.execute_key(frame)?;
        self.execute_speculated(frame, &target, &key)
    }

    pub fn execute_int(&self, frame: &mut Frame<'_>) -> JsResult<Speculated<i32>> {
        let target = self.target.execute(frame)?;
        let key = self.execute_key(frame)?;
        self.execute_int_with_target_and_key(frame, &target, &key)
    }

    pub fn execute_double(&self, frame: &mut Frame<'_>) -> JsResult<Speculated<f64>> {
        let target = self.target.execute(frame)?;
        let key = self.execute_key(frame)?;
        self.execute_double_with_target_and_key(frame, &target, &key)
    }

    /// Evaluate the index child, on the int channel while indices stay ints
    pub(crate) fn execute_index(&self, frame: &mut Frame<'_>) -> JsResult<IndexValue> {
        if frame.speculating() && self.index_state.allows_int() {
            return Ok(match self.index.execute_int(frame)? {
                Speculated::Exact(i) => {
                    self.index_state.widen(ValueKind::Int);
                    IndexValue::Int(i)
                }
                Speculated::Unexpected(v) => {
                    self.index_state.observe(&v);
                    IndexValue::Generic(v)
                }
            });
        }
        let index = self.index.execute(frame)?;
        self.index_state.observe(&index);
        Ok(IndexValue::Generic(index))
    }

    fn execute_key(&self, frame: &mut Frame<'_>) -> JsResult<PropertyKey> {
        Ok(match self.execute_index(frame)? {
            IndexValue::Int(i) => PropertyKey::from_int(i),
            IndexValue::Generic(v) => PropertyKey::from_value(&v),
        })
    }

    /// Evaluate the value and store it, on the channel the stored values allow
    pub(crate) fn execute_speculated(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        key: &PropertyKey,
    ) -> JsResult<Value> {
        if !frame.speculating() {
            return self.execute_with_target_and_key(frame, target, key);
        }
        match self.value_state.kind() {
            ValueKind::Uninitialized | ValueKind::Int => Ok(self
                .execute_int_with_target_and_key(frame, target, key)?
                .into_value()),
            ValueKind::Double => Ok(self
                .execute_double_with_target_and_key(frame, target, key)?
                .into_value()),
            ValueKind::Generic => self.execute_with_target_and_key(frame, target, key),
        }
    }

    pub fn execute_with_target_and_key(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        key: &PropertyKey,
    ) -> JsResult<Value> {
        let value = self.value.execute(frame)?;
        self.value_state.observe(&value);
        self.store(target, key, value)
    }

    /// Store through the int channel
    ///
    /// When the value does not fit, it is stored anyway and handed back as
    /// `Unexpected`; the store is never repeated.
    pub fn execute_int_with_target_and_key(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        key: &PropertyKey,
    ) -> JsResult<Speculated<i32>> {
        match self.value.execute_int(frame)? {
            Speculated::Exact(i) => {
                self.value_state.widen(ValueKind::Int);
                self.store(target, key, Value::Int(i))?;
                Ok(Speculated::Exact(i))
            }
            Speculated::Unexpected(value) => {
                self.value_state.observe(&value);
                let stored = self.store(target, key, value)?;
                Ok(Speculated::<i32>::from_value(stored))
            }
        }
    }

    /// Store through the double channel; ints widen
    pub fn execute_double_with_target_and_key(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        key: &PropertyKey,
    ) -> JsResult<Speculated<f64>> {
        match self.value.execute_double(frame)? {
            Speculated::Exact(d) => {
                self.value_state.widen(ValueKind::Double);
                self.store(target, key, Value::Double(d))?;
                Ok(Speculated::Exact(d))
            }
            Speculated::Unexpected(value) => {
                self.value_state.observe(&value);
                let stored = self.store(target, key, value)?;
                Ok(Speculated::<f64>::from_value(stored))
            }
        }
    }

    /// The store itself; yields the assigned value
    pub fn store(&self, target: &Value, key: &PropertyKey, value: Value) -> JsResult<Value> {
        match target {
            Value::Object(obj) => {
                obj.put(key, value.clone(), self.flags)?;
                Ok(value)
            }
            Value::Undefined | Value::Null => Err(JsError::TypeCoercion(format!(
                "Cannot set properties of {} (setting '{}')",
                target.type_name(),
                key
            ))),
            primitive => {
                if self.flags.strict || self.flags.write_own {
                    return Err(JsError::Type(format!(
                        "Cannot create property '{}' on {} '{}'",
                        key,
                        primitive.type_name(),
                        primitive.to_display_string()
                    )));
                }
                trace!(target: "spectree::nodes", %key, "store to primitive ignored");
                Ok(value)
            }
        }
    }

    pub(crate) fn rebuild(&self, f: &mut ChildMap<'_>) -> Self {
        WriteElementNode::new(f(&self.target), f(&self.index), f(&self.value), self.flags)
    }
}

/// An evaluated index, still on the int channel when possible
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    Int(i32),
    Generic(Value),
}
