//! Nodes delegating to the pattern engine and the list-format initializer.

use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use crate::backend::error::{JsError, JsResult};
use crate::backend::models::{JsObject, PropertyKey, StoreFlags, Value};

use super::frame::Frame;
use super::{ChildMap, Node};

/// `pattern.exec(subject, start)`
///
/// Yields an array of the whole match and its groups (unmatched groups are
/// `undefined`) with an `index` property, or `null` when nothing matches.
#[derive(Debug)]
pub struct PatternExecNode {
    pattern: Box<Node>,
    subject: Box<Node>,
    start: Box<Node>,
}

impl PatternExecNode {
    pub fn new(pattern: Node, subject: Node, start: Node) -> Self {
        PatternExecNode {
            pattern: Box::new(pattern),
            subject: Box::new(subject),
            start: Box::new(start),
        }
    }

    pub fn execute(&self, frame: &mut Frame<'_>) -> JsResult<Value> {
        let pattern = match self.pattern.execute(frame)? {
            Value::Pattern(p) => p,
            other => {
                return Err(JsError::Type(format!(
                    "{} is not a compiled pattern",
                    other.to_display_string()
                )))
            }
        };
        let subject = self.subject.execute(frame)?.to_display_string();
        let start = self.start.execute(frame)?.to_number();
        let start = if start.is_nan() || start <= 0.0 {
            0
        } else {
            start as usize
        };

        let Some(m) = pattern.execute(&subject, start) else {
            return Ok(Value::Null);
        };
        let groups = (0..=m.capture_count())
            .map(|i| match m.group_str(&subject, i) {
                Some(s) => Value::string(s),
                None => Value::Undefined,
            })
            .collect();
        let result = JsObject::new_array(groups);
        result.put(
            &PropertyKey::name("index"),
            Value::number(m.start() as f64),
            StoreFlags::default(),
        )?;
        Ok(Value::Object(result))
    }

    pub fn children(&self) -> SmallVec<[&Node; 4]> {
        smallvec![&*self.pattern, &*self.subject, &*self.start]
    }

    pub(crate) fn rebuild(&self, f: &mut ChildMap<'_>) -> Self {
        PatternExecNode {
            pattern: Box::new(f(&self.pattern)),
            subject: Box::new(f(&self.subject)),
            start: Box::new(f(&self.start)),
        }
    }
}

/// `new ListFormat(locales, options)`
#[derive(Debug)]
pub struct ListFormatInitNode {
    locales: Box<Node>,
    options: Box<Node>,
}

impl ListFormatInitNode {
    pub fn new(locales: Node, options: Node) -> Self {
        ListFormatInitNode {
            locales: Box::new(locales),
            options: Box::new(options),
        }
    }

    pub fn execute(&self, frame: &mut Frame<'_>) -> JsResult<Value> {
        let locales = self.locales.execute(frame)?;
        let options = self.options.execute(frame)?;
        let config = frame.context().list_format().initialize(&locales, &options)?;
        Ok(Value::ListFormat(Arc::new(config)))
    }

    pub fn children(&self) -> SmallVec<[&Node; 4]> {
        smallvec![&*self.locales, &*self.options]
    }

    pub(crate) fn rebuild(&self, f: &mut ChildMap<'_>) -> Self {
        ListFormatInitNode {
            locales: Box::new(f(&self.locales)),
            options: Box::new(f(&self.options)),
        }
    }
}
