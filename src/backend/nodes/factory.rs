//! Tree construction with the engine's defaults and the standard tags.

use std::sync::Arc;

use tracing::trace;

use crate::backend::context::Context;
use crate::backend::error::JsResult;
use crate::backend::models::{StoreFlags, Value};

use super::collaborator::{ListFormatInitNode, PatternExecNode};
use super::expression::BinaryOp;
use super::frame::{FrameDescriptor, FrameSlot};
use super::meta::{Tag, TagSet};
use super::{Node, NodeKind};

/// Builds node trees for one context
///
/// Store flags default to the context's strictness and can be overridden per
/// factory.
#[derive(Debug, Clone)]
pub struct NodeFactory {
    context: Arc<Context>,
    flags: StoreFlags,
}

fn expression(tag: Tag) -> TagSet {
    TagSet::of(Tag::Expression).with(tag)
}

impl NodeFactory {
    pub fn new(context: &Arc<Context>) -> Self {
        NodeFactory {
            flags: StoreFlags {
                strict: context.is_strict(),
                write_own: false,
            },
            context: Arc::clone(context),
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.flags.strict = strict;
        self
    }

    /// Element writes define own properties instead of assigning
    pub fn with_write_own(mut self, write_own: bool) -> Self {
        self.flags.write_own = write_own;
        self
    }

    pub fn flags(&self) -> StoreFlags {
        self.flags
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn constant(&self, value: impl Into<Value>) -> Node {
        Node::constant(value.into()).with_tags(expression(Tag::Literal))
    }

    pub fn read_local(&self, slot: FrameSlot) -> Node {
        Node::read_local(slot).with_tags(expression(Tag::ReadVariable))
    }

    pub fn write_local(&self, slot: FrameSlot, value: Node) -> Node {
        Node::write_local(slot, value).with_tags(expression(Tag::WriteVariable))
    }

    pub fn binary(&self, op: BinaryOp, left: Node, right: Node) -> Node {
        Node::binary(op, left, right).with_tags(expression(Tag::BinaryOperation))
    }

    pub fn read_element(&self, target: Node, index: Node) -> Node {
        Node::read_element(target, index).with_tags(expression(Tag::ReadElementExpression))
    }

    pub fn write_element(&self, target: Node, index: Node, value: Node) -> Node {
        Node::write_element(target, index, value, self.flags)
            .with_tags(expression(Tag::WriteElementExpression))
    }

    pub fn compound_write_element(
        &self,
        target: Node,
        index: Node,
        value: Node,
        write_index: Option<FrameSlot>,
    ) -> Node {
        Node::compound_write_element(target, index, value, write_index, self.flags)
            .with_tags(expression(Tag::WriteElementExpression))
    }

    /// Desugar `target[index] op= rhs`
    ///
    /// Target and canonical index are parked in two fresh temporaries so the
    /// read of the old value sees exactly what the write will use:
    ///
    /// ```text
    /// (compound-write-element (write $t target) index
    ///     (op (read-element (read $t) (read $i)) rhs) ->$i)
    /// ```
    pub fn compound_element_assignment(
        &self,
        frame: &mut FrameDescriptor,
        op: BinaryOp,
        target: Node,
        index: Node,
        rhs: Node,
    ) -> Node {
        let target_slot = frame.add_temp();
        let index_slot = frame.add_temp();
        trace!(
            target: "spectree::factory",
            %op, %target_slot, %index_slot,
            "desugared compound element assignment"
        );

        let old_value = self.read_element(self.read_local(target_slot), self.read_local(index_slot));
        self.compound_write_element(
            self.write_local(target_slot, target),
            index,
            self.binary(op, old_value, rhs),
            Some(index_slot),
        )
    }

    pub fn sequence(&self, nodes: Vec<Node>) -> Node {
        Node::sequence(nodes).with_tags(TagSet::of(Tag::Statement))
    }

    /// Literal holding a compiled matcher; syntax errors surface here, not
    /// when the literal runs
    pub fn pattern_literal(&self, pattern: &str, flags: &str) -> JsResult<Node> {
        let compiled = self.context.pattern_engine().compile(pattern, flags)?;
        Ok(Node::new(NodeKind::PatternLiteral(compiled)).with_tags(expression(Tag::Literal)))
    }

    pub fn pattern_exec(&self, pattern: Node, subject: Node, start: Node) -> Node {
        Node::new(NodeKind::PatternExec(PatternExecNode::new(pattern, subject, start)))
            .with_tags(expression(Tag::Call))
    }

    pub fn list_format_init(&self, locales: Node, options: Node) -> Node {
        Node::new(NodeKind::ListFormatInit(ListFormatInitNode::new(locales, options)))
            .with_tags(expression(Tag::Call))
    }
}
