//! Activation frames and their slot layout.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::backend::context::Context;
use crate::backend::models::Value;

/// Index of a local binding in a [`Frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSlot(pub usize);

impl FrameSlot {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Slot layout of one routine, built alongside its node tree
#[derive(Debug, Clone, Default)]
pub struct FrameDescriptor {
    names: Vec<Arc<str>>,
    temps: usize,
}

impl FrameDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named slot, reusing an existing slot of the same name
    pub fn add_slot(&mut self, name: &str) -> FrameSlot {
        if let Some(slot) = self.find_slot(name) {
            return slot;
        }
        self.push(Arc::from(name))
    }

    /// Add an anonymous slot for a desugaring temporary
    pub fn add_temp(&mut self) -> FrameSlot {
        let name = format!(":tmp{}", self.temps);
        self.temps += 1;
        self.push(Arc::from(name))
    }

    pub fn find_slot(&self, name: &str) -> Option<FrameSlot> {
        self.names
            .iter()
            .position(|n| &**n == name)
            .map(FrameSlot)
    }

    pub fn slot_name(&self, slot: FrameSlot) -> Option<&str> {
        self.names.get(slot.index()).map(|n| &**n)
    }

    pub fn size(&self) -> usize {
        self.names.len()
    }

    fn push(&mut self, name: Arc<str>) -> FrameSlot {
        let slot = FrameSlot(self.names.len());
        self.names.push(name);
        slot
    }
}

/// Locals of one activation
///
/// A frame belongs to exactly one executing thread; the node tree it runs
/// against may be shared.
pub struct Frame<'c> {
    context: &'c Context,
    speculating: bool,
    slots: SmallVec<[Value; 8]>,
}

impl<'c> Frame<'c> {
    pub fn new(context: &'c Context, size: usize) -> Self {
        let mut slots = SmallVec::with_capacity(size);
        slots.resize(size, Value::Undefined);
        Frame {
            context,
            speculating: context.speculation_enabled(),
            slots,
        }
    }

    /// Frame whose first slots hold `args`
    pub fn with_args(context: &'c Context, size: usize, args: &[Value]) -> Self {
        let mut frame = Frame::new(context, size.max(args.len()));
        for (slot, arg) in frame.slots.iter_mut().zip(args) {
            *slot = arg.clone();
        }
        frame
    }

    #[inline]
    pub fn context(&self) -> &'c Context {
        self.context
    }

    /// Whether typed entry points may be used for this activation
    #[inline]
    pub fn speculating(&self) -> bool {
        self.speculating
    }

    /// Slot value; slots never written read as `undefined`
    #[inline]
    pub fn get(&self, slot: FrameSlot) -> Value {
        self.slots
            .get(slot.index())
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    #[inline]
    pub fn set(&mut self, slot: FrameSlot, value: Value) {
        let i = slot.index();
        if i >= self.slots.len() {
            self.slots.resize(i + 1, Value::Undefined);
        }
        self.slots[i] = value;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("speculating", &self.speculating)
            .field("slots", &self.slots)
            .finish()
    }
}
