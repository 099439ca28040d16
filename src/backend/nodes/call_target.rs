//! A shareable routine: one node tree plus its frame size.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::backend::context::Context;
use crate::backend::error::JsResult;
use crate::backend::models::Value;

use super::frame::Frame;
use super::speculation::invalidation_epoch;
use super::Node;

/// Root of an executable tree
///
/// Cloning a `CallTarget` shares the tree and its specialization; use
/// [`CallTarget::clone_uninitialized`] for an independent copy.
///
/// Every call records the invalidation epoch it finished at. A call during
/// which some node respecialized is traced with the epochs it saw.
#[derive(Debug, Clone)]
pub struct CallTarget {
    root: Arc<Node>,
    frame_size: usize,
    context: Arc<Context>,
    observed_epoch: Arc<AtomicU64>,
}

impl CallTarget {
    pub fn new(root: Node, frame_size: usize, context: Arc<Context>) -> Self {
        CallTarget {
            root: Arc::new(root),
            frame_size,
            context,
            observed_epoch: Arc::new(AtomicU64::new(invalidation_epoch())),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Highest invalidation epoch seen at the end of a call, or at creation
    pub fn observed_epoch(&self) -> u64 {
        self.observed_epoch.load(Ordering::Acquire)
    }

    pub fn call(&self, args: &[Value]) -> JsResult<Value> {
        let entered = invalidation_epoch();
        let mut frame = Frame::with_args(&self.context, self.frame_size, args);
        let result = self.root.execute(&mut frame);

        let exited = invalidation_epoch();
        if exited != entered {
            debug!(
                target: "spectree::call",
                entered, exited,
                root = self.root.name(),
                "specialization changed during call"
            );
        }
        self.observed_epoch.fetch_max(exited, Ordering::AcqRel);
        result
    }

    /// Run one activation per argument list on the rayon pool, all against
    /// this same tree; results are in input order
    pub fn call_parallel(&self, activations: &[Vec<Value>]) -> Vec<JsResult<Value>> {
        debug!(
            target: "spectree::call",
            activations = activations.len(),
            "parallel call"
        );
        activations.par_iter().map(|args| self.call(args)).collect()
    }

    /// Independent copy with no specialization state
    pub fn clone_uninitialized(&self) -> Self {
        CallTarget::new(
            self.root.clone_uninitialized(),
            self.frame_size,
            Arc::clone(&self.context),
        )
    }

    /// Copy whose tree is instrumented for `filter`
    pub fn instrumented(&self, filter: super::TagSet) -> Self {
        CallTarget::new(
            self.root.instrument(filter),
            self.frame_size,
            Arc::clone(&self.context),
        )
    }
}
