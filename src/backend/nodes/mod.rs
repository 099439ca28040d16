// Self-specializing execution nodes
//
// A tree is built once per syntactic occurrence and may then be executed by
// many threads at the same time. Each node kind is a variant of the closed
// `NodeKind` enum; `Node` adds the metadata every node carries.
//
// Three execution channels exist:
//   execute        -> Value
//   execute_int    -> Speculated<i32>
//   execute_double -> Speculated<f64>
// A typed channel hands back `Speculated::Unexpected(value)` when the result
// does not fit, and `execute` always resolves that to a plain value.

mod call_target;
mod collaborator;
mod compound_write;
mod expression;
mod factory;
mod frame;
mod helpers;
mod instrumentation;
mod meta;
mod speculation;
mod write_element;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use crate::backend::error::JsResult;
use crate::backend::models::{StoreFlags, Value};
use crate::backend::pattern::CompiledPattern;

pub use call_target::CallTarget;
pub use collaborator::{ListFormatInitNode, PatternExecNode};
pub use compound_write::CompoundWriteElementNode;
pub use expression::{read_element, BinaryNode, BinaryOp, ReadElementNode, WriteLocalNode};
pub use factory::NodeFactory;
pub use frame::{Frame, FrameDescriptor, FrameSlot};
pub use helpers::{FrameSlotWriter, IndexKinds, RequireObjectCoercibleNode, ToArrayIndexNode};
pub use instrumentation::{ExecutionListener, Materialized, TaggedNode};
pub use meta::{NodeMeta, SourceSpan, Tag, TagSet};
pub use speculation::{
    invalidation_epoch, transfer_to_interpreter_and_invalidate, LazyChild, SpeculationState,
    Speculated, ValueKind,
};
pub use write_element::{IndexValue, WriteElementNode};

/// Maps a child to its replacement when a node is rebuilt
pub(crate) type ChildMap<'f> = dyn FnMut(&Node) -> Node + 'f;

/// Node kinds
#[derive(Debug)]
pub enum NodeKind {
    Constant(Value),
    ReadLocal(FrameSlot),
    WriteLocal(WriteLocalNode),
    Binary(BinaryNode),
    ReadElement(ReadElementNode),
    WriteElement(WriteElementNode),
    CompoundWriteElement(CompoundWriteElementNode),
    Tagged(TaggedNode),
    Sequence(Vec<Node>),
    PatternLiteral(Arc<CompiledPattern>),
    PatternExec(PatternExecNode),
    ListFormatInit(ListFormatInitNode),
}

/// An execution node
#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    meta: NodeMeta,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            meta: NodeMeta::default(),
        }
    }

    pub fn constant(value: Value) -> Self {
        Node::new(NodeKind::Constant(value))
    }

    pub fn read_local(slot: FrameSlot) -> Self {
        Node::new(NodeKind::ReadLocal(slot))
    }

    pub fn write_local(slot: FrameSlot, value: Node) -> Self {
        Node::new(NodeKind::WriteLocal(WriteLocalNode::new(slot, value)))
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::new(NodeKind::Binary(BinaryNode::new(op, left, right)))
    }

    pub fn read_element(target: Node, index: Node) -> Self {
        Node::new(NodeKind::ReadElement(ReadElementNode::new(target, index)))
    }

    pub fn write_element(target: Node, index: Node, value: Node, flags: StoreFlags) -> Self {
        Node::new(NodeKind::WriteElement(WriteElementNode::new(
            target, index, value, flags,
        )))
    }

    pub fn compound_write_element(
        target: Node,
        index: Node,
        value: Node,
        write_index: Option<FrameSlot>,
        flags: StoreFlags,
    ) -> Self {
        Node::new(NodeKind::CompoundWriteElement(CompoundWriteElementNode::new(
            target,
            index,
            value,
            write_index,
            flags,
        )))
    }

    pub fn sequence(nodes: Vec<Node>) -> Self {
        Node::new(NodeKind::Sequence(nodes))
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.meta.span = Some(span);
        self
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.meta.tags = tags;
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    pub fn span(&self) -> Option<SourceSpan> {
        self.meta.span
    }

    pub fn tags(&self) -> TagSet {
        self.meta.tags
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.meta.tags.contains(tag)
    }

    pub fn is_materialized(&self) -> bool {
        self.meta.materialized
    }

    /// The compound write carried by this node, if it is one
    pub fn as_compound_write(&self) -> Option<&CompoundWriteElementNode> {
        match &self.kind {
            NodeKind::CompoundWriteElement(node) => Some(node),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Constant(_) => "const",
            NodeKind::ReadLocal(_) => "read",
            NodeKind::WriteLocal(_) => "write",
            NodeKind::Binary(_) => "binary",
            NodeKind::ReadElement(_) => "read-element",
            NodeKind::WriteElement(_) => "write-element",
            NodeKind::CompoundWriteElement(_) => "compound-write-element",
            NodeKind::Tagged(_) => "tagged",
            NodeKind::Sequence(_) => "seq",
            NodeKind::PatternLiteral(_) => "pattern",
            NodeKind::PatternExec(_) => "pattern-exec",
            NodeKind::ListFormatInit(_) => "list-format",
        }
    }

    pub fn execute(&self, frame: &mut Frame<'_>) -> JsResult<Value> {
        match &self.kind {
            NodeKind::Constant(v) => Ok(v.clone()),
            NodeKind::ReadLocal(slot) => Ok(frame.get(*slot)),
            NodeKind::WriteLocal(node) => node.execute(frame),
            NodeKind::Binary(node) => node.execute(frame),
            NodeKind::ReadElement(node) => node.execute(frame),
            NodeKind::WriteElement(node) => node.execute(frame),
            NodeKind::CompoundWriteElement(node) => node.execute(frame),
            NodeKind::Tagged(node) => node.execute(&self.meta, frame),
            NodeKind::Sequence(nodes) => {
                let mut last = Value::Undefined;
                for node in nodes {
                    last = node.execute(frame)?;
                }
                Ok(last)
            }
            NodeKind::PatternLiteral(p) => Ok(Value::Pattern(Arc::clone(p))),
            NodeKind::PatternExec(node) => node.execute(frame),
            NodeKind::ListFormatInit(node) => node.execute(frame),
        }
    }

    pub fn execute_int(&self, frame: &mut Frame<'_>) -> JsResult<Speculated<i32>> {
        match &self.kind {
            NodeKind::Constant(v) => Ok(Speculated::<i32>::from_value(v.clone())),
            NodeKind::ReadLocal(slot) => Ok(Speculated::<i32>::from_value(frame.get(*slot))),
            NodeKind::WriteLocal(node) => node.execute_int(frame),
            NodeKind::Binary(node) => node.execute_int(frame),
            NodeKind::WriteElement(node) => node.execute_int(frame),
            NodeKind::CompoundWriteElement(node) => node.execute_int(frame),
            NodeKind::Tagged(node) => node.execute_int(&self.meta, frame),
            NodeKind::Sequence(nodes) => match nodes.split_last() {
                Some((last, init)) => {
                    for node in init {
                        node.execute(frame)?;
                    }
                    last.execute_int(frame)
                }
                None => Ok(Speculated::Unexpected(Value::Undefined)),
            },
            _ => Ok(Speculated::<i32>::from_value(self.execute(frame)?)),
        }
    }

    pub fn execute_double(&self, frame: &mut Frame<'_>) -> JsResult<Speculated<f64>> {
        match &self.kind {
            NodeKind::Constant(v) => Ok(Speculated::<f64>::from_value(v.clone())),
            NodeKind::ReadLocal(slot) => Ok(Speculated::<f64>::from_value(frame.get(*slot))),
            NodeKind::WriteLocal(node) => node.execute_double(frame),
            NodeKind::Binary(node) => node.execute_double(frame),
            NodeKind::WriteElement(node) => node.execute_double(frame),
            NodeKind::CompoundWriteElement(node) => node.execute_double(frame),
            NodeKind::Tagged(node) => node.execute_double(&self.meta, frame),
            NodeKind::Sequence(nodes) => match nodes.split_last() {
                Some((last, init)) => {
                    for node in init {
                        node.execute(frame)?;
                    }
                    last.execute_double(frame)
                }
                None => Ok(Speculated::Unexpected(Value::Undefined)),
            },
            _ => Ok(Speculated::<f64>::from_value(self.execute(frame)?)),
        }
    }

    /// Direct children in evaluation order
    pub fn children(&self) -> SmallVec<[&Node; 4]> {
        match &self.kind {
            NodeKind::Constant(_) | NodeKind::ReadLocal(_) | NodeKind::PatternLiteral(_) => {
                SmallVec::new()
            }
            NodeKind::WriteLocal(node) => smallvec![node.value()],
            NodeKind::Binary(node) => smallvec![node.left(), node.right()],
            NodeKind::ReadElement(node) => smallvec![node.target(), node.index()],
            NodeKind::WriteElement(node) => smallvec![node.target(), node.index(), node.value()],
            NodeKind::CompoundWriteElement(node) => {
                let base = node.base();
                smallvec![base.target(), base.index(), base.value()]
            }
            NodeKind::Tagged(node) => smallvec![node.child()],
            NodeKind::Sequence(nodes) => nodes.iter().collect(),
            NodeKind::PatternExec(node) => node.children(),
            NodeKind::ListFormatInit(node) => node.children(),
        }
    }

    /// Fresh copy of this subtree: same shape, flags, spans and tags; no
    /// helpers allocated and no speculation recorded
    pub fn clone_uninitialized(&self) -> Node {
        Node {
            kind: self.rebuild_kind(&mut |child: &Node| child.clone_uninitialized()),
            meta: self.meta,
        }
    }

    /// This node's kind with every child replaced by `f(child)` and all
    /// per-node state reset
    pub(crate) fn rebuild_kind(&self, f: &mut ChildMap<'_>) -> NodeKind {
        match &self.kind {
            NodeKind::Constant(v) => NodeKind::Constant(v.clone()),
            NodeKind::ReadLocal(slot) => NodeKind::ReadLocal(*slot),
            NodeKind::WriteLocal(node) => NodeKind::WriteLocal(node.rebuild(f)),
            NodeKind::Binary(node) => NodeKind::Binary(node.rebuild(f)),
            NodeKind::ReadElement(node) => NodeKind::ReadElement(node.rebuild(f)),
            NodeKind::WriteElement(node) => NodeKind::WriteElement(node.rebuild(f)),
            NodeKind::CompoundWriteElement(node) => {
                NodeKind::CompoundWriteElement(node.rebuild(f))
            }
            NodeKind::Tagged(node) => NodeKind::Tagged(node.rebuild(f)),
            NodeKind::Sequence(nodes) => NodeKind::Sequence(nodes.iter().map(|n| f(n)).collect()),
            NodeKind::PatternLiteral(p) => NodeKind::PatternLiteral(Arc::clone(p)),
            NodeKind::PatternExec(node) => NodeKind::PatternExec(node.rebuild(f)),
            NodeKind::ListFormatInit(node) => NodeKind::ListFormatInit(node.rebuild(f)),
        }
    }
}

impl fmt::Display for Node {
    /// S-expression dump: `(name attrs children...)`, then `@span` and `*`
    /// for materialized nodes
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        match &self.kind {
            NodeKind::Constant(v) => write!(f, "const {}", v)?,
            NodeKind::ReadLocal(slot) => write!(f, "read {}", slot)?,
            NodeKind::WriteLocal(node) => write!(f, "write {}", node.slot())?,
            NodeKind::Binary(node) => write!(f, "{}", node.op())?,
            NodeKind::WriteElement(node) => {
                write!(f, "write-element")?;
                fmt_flags(f, node.flags())?;
            }
            NodeKind::CompoundWriteElement(node) => {
                write!(f, "compound-write-element")?;
                fmt_flags(f, node.base().flags())?;
                if let Some(slot) = node.index_cache_slot() {
                    write!(f, " ->{}", slot)?;
                }
            }
            NodeKind::Tagged(_) => write!(f, "tagged{}", self.meta.tags)?,
            NodeKind::PatternLiteral(p) => write!(f, "pattern /{}/{}", p.source(), p.flags())?,
            _ => write!(f, "{}", self.name())?,
        }
        for child in self.children() {
            write!(f, " {}", child)?;
        }
        write!(f, ")")?;
        if let Some(span) = self.meta.span {
            write!(f, "@{}", span)?;
        }
        if self.meta.materialized {
            write!(f, "*")?;
        }
        Ok(())
    }
}

fn fmt_flags(f: &mut fmt::Formatter<'_>, flags: StoreFlags) -> fmt::Result {
    match (flags.strict, flags.write_own) {
        (false, false) => Ok(()),
        (true, false) => write!(f, "[strict]"),
        (false, true) => write!(f, "[own]"),
        (true, true) => write!(f, "[strict,own]"),
    }
}
