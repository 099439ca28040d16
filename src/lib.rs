//! spectree - self-specializing tree-interpreter nodes
//!
//! Execution nodes for a dynamic-language interpreter that specialize
//! themselves on the values they observe. The compound indexed assignment
//! (`container[index] op= value`) is the central node kind: it composes the
//! base element store, creates its helper nodes lazily and safely under
//! concurrent first use, and runs on typed `i32`/`f64` channels that fall back
//! to generic values without repeating any side effect.
//!
//! # Architecture
//!
//! 1. **Nodes** (`backend::nodes`)
//!    - Closed `NodeKind` enum with exhaustive dispatch
//!    - `execute`, `execute_int`, `execute_double` channels with
//!      `Speculated::Unexpected` as the mismatch signal
//!    - `clone_uninitialized` for independent copies, `materialize` and
//!      `instrument` for tooling
//!
//! 2. **Collaborators**
//!    - `backend::pattern`: compile-time validated matcher handles
//!    - `backend::intl`: list-format option validation and lazy formatters
//!
//! 3. **Ambient setup**: `backend::config` (TOML), `backend::logging`
//!    (tracing), `backend::context`
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use spectree::backend::*;
//! use spectree::backend::nodes::BinaryOp;
//!
//! let context = Arc::new(Context::default());
//! let factory = NodeFactory::new(&context);
//! let mut frame = FrameDescriptor::new();
//! let arr = frame.add_slot("arr");
//!
//! // arr["1"] *= 3
//! let node = factory.compound_element_assignment(
//!     &mut frame,
//!     BinaryOp::Mul,
//!     factory.read_local(arr),
//!     factory.constant("1"),
//!     factory.constant(3),
//! );
//! let target = CallTarget::new(node, frame.size(), context);
//!
//! let array = JsObject::new_array(vec![Value::Int(1), Value::Int(2)]);
//! let result = target.call(&[Value::Object(array.clone())]).unwrap();
//! assert_eq!(result, Value::Int(6));
//! assert_eq!(array.elements(), vec![Value::Int(1), Value::Int(6)]);
//! ```

pub mod backend;

pub use backend::{
    CallTarget, Context, EngineConfig, JsError, JsResult, Node, NodeFactory, Speculated, Value,
};
