//! Instrumentation: tagging wrappers, execution listeners and the
//! materialization of instrumented subtrees.
//!
//! Materialization never touches the tree it is called on. It returns either
//! the original node or a new subtree in which children lacking a source span
//! are wrapped in a [`TaggedNode`] carrying the parent's span.

use std::ops::Deref;

use tracing::debug;

use crate::backend::error::{JsError, JsResult};
use crate::backend::models::Value;

use super::frame::Frame;
use super::meta::{NodeMeta, SourceSpan, Tag, TagSet};
use super::speculation::Speculated;
use super::{ChildMap, Node, NodeKind};

/// Observer notified by tagged nodes
///
/// Installed on the [`Context`](crate::backend::context::Context); without one
/// tagged nodes only forward to their child.
pub trait ExecutionListener: Send + Sync {
    fn on_enter(&self, _meta: &NodeMeta) {}

    fn on_return(&self, _meta: &NodeMeta, _value: &Value) {}

    fn on_error(&self, _meta: &NodeMeta, _error: &JsError) {}
}

/// Wrapper that reports its child's execution to the listener
#[derive(Debug)]
pub struct TaggedNode {
    child: Box<Node>,
}

impl TaggedNode {
    pub fn new(child: Node) -> Self {
        TaggedNode {
            child: Box::new(child),
        }
    }

    /// Wrap `child` as an input expression of a node spanning `span`
    pub fn wrap(child: Node, span: Option<SourceSpan>) -> Node {
        Node {
            kind: NodeKind::Tagged(TaggedNode::new(child)),
            meta: NodeMeta {
                span,
                tags: TagSet::of(Tag::Expression),
                materialized: true,
            },
        }
    }

    pub fn child(&self) -> &Node {
        &self.child
    }

    pub fn execute(&self, meta: &NodeMeta, frame: &mut Frame<'_>) -> JsResult<Value> {
        let Some(listener) = frame.context().listener() else {
            return self.child.execute(frame);
        };
        listener.on_enter(meta);
        match self.child.execute(frame) {
            Ok(value) => {
                listener.on_return(meta, &value);
                Ok(value)
            }
            Err(err) => {
                listener.on_error(meta, &err);
                Err(err)
            }
        }
    }

    pub fn execute_int(&self, meta: &NodeMeta, frame: &mut Frame<'_>) -> JsResult<Speculated<i32>> {
        let Some(listener) = frame.context().listener() else {
            return self.child.execute_int(frame);
        };
        listener.on_enter(meta);
        match self.child.execute_int(frame) {
            Ok(result) => {
                let value = match &result {
                    Speculated::Exact(i) => Value::Int(*i),
                    Speculated::Unexpected(v) => v.clone(),
                };
                listener.on_return(meta, &value);
                Ok(result)
            }
            Err(err) => {
                listener.on_error(meta, &err);
                Err(err)
            }
        }
    }

    pub fn execute_double(
        &self,
        meta: &NodeMeta,
        frame: &mut Frame<'_>,
    ) -> JsResult<Speculated<f64>> {
        let Some(listener) = frame.context().listener() else {
            return self.child.execute_double(frame);
        };
        listener.on_enter(meta);
        match self.child.execute_double(frame) {
            Ok(result) => {
                let value = match &result {
                    Speculated::Exact(d) => Value::Double(*d),
                    Speculated::Unexpected(v) => v.clone(),
                };
                listener.on_return(meta, &value);
                Ok(result)
            }
            Err(err) => {
                listener.on_error(meta, &err);
                Err(err)
            }
        }
    }

    pub(crate) fn rebuild(&self, f: &mut ChildMap<'_>) -> Self {
        TaggedNode::new(f(&self.child))
    }
}

/// Result of [`Node::materialize`]
#[derive(Debug)]
pub enum Materialized<'a> {
    /// Nothing to do; the node itself
    Original(&'a Node),
    /// A new instrumented subtree
    Instrumented(Node),
}

impl Materialized<'_> {
    pub fn is_instrumented(&self) -> bool {
        matches!(self, Materialized::Instrumented(_))
    }

    /// Owned node; the original is cloned uninitialized
    pub fn into_node(self) -> Node {
        match self {
            Materialized::Original(node) => node.clone_uninitialized(),
            Materialized::Instrumented(node) => node,
        }
    }
}

impl Deref for Materialized<'_> {
    type Target = Node;

    fn deref(&self) -> &Node {
        match self {
            Materialized::Original(node) => node,
            Materialized::Instrumented(node) => node,
        }
    }
}

impl Node {
    /// Tag that makes this kind of node materializable
    fn materialization_tag(&self) -> Option<Tag> {
        match &self.kind {
            NodeKind::Binary(_) => Some(Tag::BinaryOperation),
            NodeKind::ReadElement(_) => Some(Tag::ReadElementExpression),
            NodeKind::WriteElement(_) | NodeKind::CompoundWriteElement(_) => {
                Some(Tag::WriteElementExpression)
            }
            _ => None,
        }
    }

    /// Some child lacks the source span tooling needs and is not wrapped yet
    pub fn materialization_needed(&self) -> bool {
        !self.meta.materialized
            && self
                .children()
                .iter()
                .any(|c| c.span().is_none() && !matches!(c.kind, NodeKind::Tagged(_)))
    }

    /// Instrumented copy of this node for `filter`, or the node itself
    ///
    /// Children without a span are wrapped in a tagged adapter; children with
    /// one are cloned uninitialized. The copy keeps this node's span and tags.
    /// Materializing the copy again returns it unchanged.
    pub fn materialize(&self, filter: TagSet) -> Materialized<'_> {
        let Some(tag) = self.materialization_tag() else {
            return Materialized::Original(self);
        };
        if !filter.contains(tag) || !self.materialization_needed() {
            return Materialized::Original(self);
        }

        let parent_span = self.meta.span;
        let kind = self.rebuild_kind(&mut |child: &Node| {
            if child.span().is_some() {
                child.clone_uninitialized()
            } else {
                TaggedNode::wrap(child.clone_uninitialized(), parent_span)
            }
        });
        debug!(target: "spectree::instrumentation", node = self.name(), ?tag, "materialized");
        Materialized::Instrumented(Node {
            kind,
            meta: NodeMeta {
                materialized: true,
                ..self.meta
            },
        })
    }

    /// Instrumented copy of the whole subtree
    pub fn instrument(&self, filter: TagSet) -> Node {
        let materialized = self.materialize(filter);
        Node {
            kind: materialized.rebuild_kind(&mut |child: &Node| child.instrument(filter)),
            meta: materialized.meta,
        }
    }
}
