// Backend: execution nodes and the collaborators they call
//
// - `nodes`: the self-specializing node tree (compound element write,
//   helpers, speculation, cloning, instrumentation)
// - `models`: values, property keys and the minimal object model
// - `pattern`: pattern compilation collaborator
// - `intl`: list-format locale/options collaborator
// - `context`, `config`, `logging`: ambient engine setup

pub mod config;
pub mod context;
pub mod error;
pub mod intl;
pub mod logging;
pub mod models;
pub mod nodes;
pub mod pattern;

pub use config::{ConfigError, EngineConfig};
pub use context::Context;
pub use error::{JsError, JsResult};
pub use intl::{ListFormatConfig, ListFormatInitializer, LocaleData};
pub use models::*;
pub use nodes::{
    CallTarget, CompoundWriteElementNode, ExecutionListener, Frame, FrameDescriptor, FrameSlot,
    Node, NodeFactory, NodeKind, Speculated, Tag, TagSet,
};
pub use pattern::{CompiledPattern, PatternEngine, RegexPatternEngine};
