//! Compound indexed assignment: `target[index] op= value`.
//!
//! Every entry point runs the same protocol:
//!
//! 1. the target must be object-coercible, checked before any index work;
//! 2. a generic index is canonicalized by a lazily created
//!    [`ToArrayIndexNode`], an `i32` index is used as is;
//! 3. with an index cache configured, the canonical index is written to its
//!    frame slot so the sibling read inside `value` sees it;
//! 4. the value is computed and stored by the composed [`WriteElementNode`].
//!
//! The entry points differ only in the channel used for the index and for the
//! result. A typed entry point whose stored value does not fit its channel
//! still stores exactly once and returns [`Speculated::Unexpected`] with the
//! generic result.

use std::sync::Arc;

use tracing::trace;

use crate::backend::error::JsResult;
use crate::backend::models::{PropertyKey, StoreFlags, Value};

use super::frame::{Frame, FrameSlot};
use super::helpers::{FrameSlotWriter, RequireObjectCoercibleNode, ToArrayIndexNode};
use super::speculation::{LazyChild, Speculated};
use super::write_element::{IndexValue, WriteElementNode};
use super::{ChildMap, Node};

#[derive(Debug)]
pub struct CompoundWriteElementNode {
    base: WriteElementNode,
    write_index: Option<FrameSlotWriter>,
    require_coercible: LazyChild<RequireObjectCoercibleNode>,
    to_array_index: LazyChild<ToArrayIndexNode>,
}

impl CompoundWriteElementNode {
    pub fn new(
        target: Node,
        index: Node,
        value: Node,
        write_index: Option<FrameSlot>,
        flags: StoreFlags,
    ) -> Self {
        CompoundWriteElementNode {
            base: WriteElementNode::new(target, index, value, flags),
            write_index: write_index.map(FrameSlotWriter::new),
            require_coercible: LazyChild::new(),
            to_array_index: LazyChild::new(),
        }
    }

    pub fn base(&self) -> &WriteElementNode {
        &self.base
    }

    /// Slot receiving the canonical index, if any
    pub fn index_cache_slot(&self) -> Option<FrameSlot> {
        self.write_index.map(|w| w.slot())
    }

    pub fn require_coercible_helper(&self) -> Option<&Arc<RequireObjectCoercibleNode>> {
        self.require_coercible.get()
    }

    pub fn to_array_index_helper(&self) -> Option<&Arc<ToArrayIndexNode>> {
        self.to_array_index.get()
    }

    /// Evaluate all children and store
    ///
    /// The coercibility check runs before the index child is even evaluated.
    pub fn execute(&self, frame: &mut Frame<'_>) -> JsResult<Value> {
        let (target, key) = self.execute_prologue(frame)?;
        self.base.execute_speculated(frame, &target, &key)
    }

    pub fn execute_int(&self, frame: &mut Frame<'_>) -> JsResult<Speculated<i32>> {
        let (target, key) = self.execute_prologue(frame)?;
        self.base.execute_int_with_target_and_key(frame, &target, &key)
    }

    pub fn execute_double(&self, frame: &mut Frame<'_>) -> JsResult<Speculated<f64>> {
        let (target, key) = self.execute_prologue(frame)?;
        self.base.execute_double_with_target_and_key(frame, &target, &key)
    }

    fn execute_prologue(&self, frame: &mut Frame<'_>) -> JsResult<(Value, PropertyKey)> {
        let target = self.base.target().execute(frame)?;
        self.require_object_coercible(&target)?;
        let key = match self.base.execute_index(frame)? {
            IndexValue::Int(i) => self.cache_int_index(frame, i),
            IndexValue::Generic(v) => self.canonicalize_index(frame, &v),
        };
        Ok((target, key))
    }

    pub fn execute_with_target_and_index(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        index: &Value,
    ) -> JsResult<Value> {
        let key = self.prepare(frame, target, index)?;
        self.base.execute_with_target_and_key(frame, target, &key)
    }

    pub fn execute_with_target_and_int_index(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        index: i32,
    ) -> JsResult<Value> {
        let key = self.prepare_int(frame, target, index)?;
        self.base.execute_with_target_and_key(frame, target, &key)
    }

    pub fn execute_int_with_target_and_index(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        index: &Value,
    ) -> JsResult<Speculated<i32>> {
        let key = self.prepare(frame, target, index)?;
        self.base.execute_int_with_target_and_key(frame, target, &key)
    }

    pub fn execute_int_with_target_and_int_index(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        index: i32,
    ) -> JsResult<Speculated<i32>> {
        let key = self.prepare_int(frame, target, index)?;
        self.base.execute_int_with_target_and_key(frame, target, &key)
    }

    pub fn execute_double_with_target_and_index(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        index: &Value,
    ) -> JsResult<Speculated<f64>> {
        let key = self.prepare(frame, target, index)?;
        self.base.execute_double_with_target_and_key(frame, target, &key)
    }

    pub fn execute_double_with_target_and_int_index(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        index: i32,
    ) -> JsResult<Speculated<f64>> {
        let key = self.prepare_int(frame, target, index)?;
        self.base.execute_double_with_target_and_key(frame, target, &key)
    }

    /// Steps 1 to 3 of the protocol; returns the canonical index
    pub fn prepare(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        index: &Value,
    ) -> JsResult<PropertyKey> {
        self.require_object_coercible(target)?;
        Ok(self.canonicalize_index(frame, index))
    }

    pub fn prepare_int(
        &self,
        frame: &mut Frame<'_>,
        target: &Value,
        index: i32,
    ) -> JsResult<PropertyKey> {
        self.require_object_coercible(target)?;
        Ok(self.cache_int_index(frame, index))
    }

    #[inline]
    fn require_object_coercible(&self, target: &Value) -> JsResult<()> {
        self.require_coercible
            .get_or_publish(RequireObjectCoercibleNode::new)
            .execute(target)
    }

    fn canonicalize_index(&self, frame: &mut Frame<'_>, index: &Value) -> PropertyKey {
        let key = self
            .to_array_index
            .get_or_publish(ToArrayIndexNode::new)
            .execute(index);
        if let Some(writer) = &self.write_index {
            writer.write(frame, key.to_value());
        }
        key
    }

    fn cache_int_index(&self, frame: &mut Frame<'_>, index: i32) -> PropertyKey {
        if let Some(writer) = &self.write_index {
            writer.write(frame, Value::Int(index));
        }
        PropertyKey::from_int(index)
    }

    /// Same shape and flags, helpers unallocated, speculation reset
    pub fn clone_uninitialized(&self) -> Self {
        self.rebuild(&mut |child: &Node| child.clone_uninitialized())
    }

    pub(crate) fn rebuild(&self, f: &mut ChildMap<'_>) -> Self {
        trace!(target: "spectree::nodes", "rebuilding compound element write");
        CompoundWriteElementNode {
            base: self.base.rebuild(f),
            write_index: self.write_index,
            require_coercible: LazyChild::new(),
            to_array_index: LazyChild::new(),
        }
    }
}
