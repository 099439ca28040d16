//! Single-purpose helper nodes used by the element writes.
//!
//! Helpers are created lazily by their owner (see
//! [`LazyChild`](super::speculation::LazyChild)). Construction must stay free
//! of side effects because racing threads may each build one.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::backend::error::{JsError, JsResult};
use crate::backend::models::{PropertyKey, Value};

use super::frame::{Frame, FrameSlot};

/// Throws when the receiver is `null` or `undefined`
#[derive(Debug, Default)]
pub struct RequireObjectCoercibleNode;

impl RequireObjectCoercibleNode {
    pub fn new() -> Self {
        RequireObjectCoercibleNode
    }

    #[inline]
    pub fn execute(&self, target: &Value) -> JsResult<()> {
        if target.is_nullish() {
            return Err(JsError::TypeCoercion(format!(
                "Cannot convert {} to object",
                target.type_name()
            )));
        }
        Ok(())
    }
}

const SEEN_INT: u8 = 1;
const SEEN_DOUBLE: u8 = 1 << 1;
const SEEN_STRING: u8 = 1 << 2;
const SEEN_OTHER: u8 = 1 << 3;

/// Canonicalizes an index value into a [`PropertyKey`]
///
/// Accumulates which index kinds it has seen; the bits only ever get set.
#[derive(Debug, Default)]
pub struct ToArrayIndexNode {
    seen: AtomicU8,
}

/// Index kinds observed by a [`ToArrayIndexNode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexKinds {
    pub int: bool,
    pub double: bool,
    pub string: bool,
    pub other: bool,
}

impl ToArrayIndexNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execute(&self, index: &Value) -> PropertyKey {
        let bit = match index {
            Value::Int(_) => SEEN_INT,
            Value::Double(_) => SEEN_DOUBLE,
            Value::String(_) => SEEN_STRING,
            _ => SEEN_OTHER,
        };
        if self.seen.load(Ordering::Relaxed) & bit == 0 {
            self.seen.fetch_or(bit, Ordering::AcqRel);
        }
        PropertyKey::from_value(index)
    }

    pub fn seen(&self) -> IndexKinds {
        let bits = self.seen.load(Ordering::Acquire);
        IndexKinds {
            int: bits & SEEN_INT != 0,
            double: bits & SEEN_DOUBLE != 0,
            string: bits & SEEN_STRING != 0,
            other: bits & SEEN_OTHER != 0,
        }
    }
}

/// Writes a value into a fixed frame slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlotWriter {
    slot: FrameSlot,
}

impl FrameSlotWriter {
    pub fn new(slot: FrameSlot) -> Self {
        FrameSlotWriter { slot }
    }

    pub fn slot(&self) -> FrameSlot {
        self.slot
    }

    #[inline]
    pub fn write(&self, frame: &mut Frame<'_>, value: Value) {
        frame.set(self.slot, value);
    }
}
