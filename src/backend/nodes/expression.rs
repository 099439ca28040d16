//! Expression nodes surrounding the element writes: locals, arithmetic and
//! element reads.

use std::fmt;

use tracing::trace;

use crate::backend::error::{JsError, JsResult};
use crate::backend::models::{PropertyKey, Value};

use super::frame::{Frame, FrameSlot};
use super::speculation::{SpeculationState, Speculated, ValueKind};
use super::{ChildMap, Node};

/// Assigns its value to a local and yields it
#[derive(Debug)]
pub struct WriteLocalNode {
    slot: FrameSlot,
    value: Box<Node>,
}

impl WriteLocalNode {
    pub fn new(slot: FrameSlot, value: Node) -> Self {
        WriteLocalNode {
            slot,
            value: Box::new(value),
        }
    }

    pub fn slot(&self) -> FrameSlot {
        self.slot
    }

    pub fn value(&self) -> &Node {
        &self.value
    }

    pub fn execute(&self, frame: &mut Frame<'_>) -> JsResult<Value> {
        let value = self.value.execute(frame)?;
        frame.set(self.slot, value.clone());
        Ok(value)
    }

    pub fn execute_int(&self, frame: &mut Frame<'_>) -> JsResult<Speculated<i32>> {
        let result = self.value.execute_int(frame)?;
        let stored = match &result {
            Speculated::Exact(i) => Value::Int(*i),
            Speculated::Unexpected(v) => v.clone(),
        };
        frame.set(self.slot, stored);
        Ok(result)
    }

    pub fn execute_double(&self, frame: &mut Frame<'_>) -> JsResult<Speculated<f64>> {
        let result = self.value.execute_double(frame)?;
        let stored = match &result {
            Speculated::Exact(d) => Value::Double(*d),
            Speculated::Unexpected(v) => v.clone(),
        };
        frame.set(self.slot, stored);
        Ok(result)
    }

    pub(crate) fn rebuild(&self, f: &mut ChildMap<'_>) -> Self {
        WriteLocalNode {
            slot: self.slot,
            value: Box::new(f(&self.value)),
        }
    }
}

/// Arithmetic operator of a [`BinaryNode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    /// Result on the int channel, `None` when it does not fit an `i32`
    /// (overflow, fractions, NaN, negative zero)
    #[inline]
    pub fn apply_int(self, a: i32, b: i32) -> Option<i32> {
        match self {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => {
                let r = a.checked_mul(b)?;
                if r == 0 && (a < 0 || b < 0) {
                    None
                } else {
                    Some(r)
                }
            }
            BinaryOp::Div => {
                if b == 0 || (a == 0 && b < 0) {
                    return None;
                }
                match a.checked_rem(b) {
                    Some(0) => a.checked_div(b),
                    _ => None,
                }
            }
            BinaryOp::Rem => {
                let r = a.checked_rem(b)?;
                if r == 0 && a < 0 {
                    None
                } else {
                    Some(r)
                }
            }
        }
    }

    #[inline]
    pub fn apply_double(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Rem => a % b,
        }
    }

    /// Generic result for arbitrary operands
    pub fn apply(self, left: &Value, right: &Value) -> Value {
        if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
            if let Some(r) = self.apply_int(a, b) {
                return Value::Int(r);
            }
        }
        if self == BinaryOp::Add && (concatenates(left) || concatenates(right)) {
            let mut s = left.to_display_string();
            s.push_str(&right.to_display_string());
            return Value::string(&s);
        }
        Value::number(self.apply_double(left.to_number(), right.to_number()))
    }
}

/// Operands that turn `+` into string concatenation
fn concatenates(v: &Value) -> bool {
    matches!(
        v,
        Value::String(_) | Value::Object(_) | Value::Pattern(_) | Value::ListFormat(_)
    )
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Arithmetic with int/double speculation on its result
#[derive(Debug)]
pub struct BinaryNode {
    op: BinaryOp,
    left: Box<Node>,
    right: Box<Node>,
    state: SpeculationState,
}

impl BinaryNode {
    pub fn new(op: BinaryOp, left: Node, right: Node) -> Self {
        BinaryNode {
            op,
            left: Box::new(left),
            right: Box::new(right),
            state: SpeculationState::new(),
        }
    }

    pub fn op(&self) -> BinaryOp {
        self.op
    }

    pub fn left(&self) -> &Node {
        &self.left
    }

    pub fn right(&self) -> &Node {
        &self.right
    }

    pub fn speculation(&self) -> ValueKind {
        self.state.kind()
    }

    /// Run on the channel the observed results allow
    pub fn execute(&self, frame: &mut Frame<'_>) -> JsResult<Value> {
        if !frame.speculating() {
            return self.execute_generic(frame);
        }
        match self.state.kind() {
            ValueKind::Uninitialized | ValueKind::Int => Ok(self.execute_int(frame)?.into_value()),
            ValueKind::Double => Ok(self.execute_double(frame)?.into_value()),
            ValueKind::Generic => self.execute_generic(frame),
        }
    }

    pub fn execute_generic(&self, frame: &mut Frame<'_>) -> JsResult<Value> {
        let left = self.left.execute(frame)?;
        let right = self.right.execute(frame)?;
        let result = self.op.apply(&left, &right);
        self.state.observe(&result);
        Ok(result)
    }

    pub fn execute_int(&self, frame: &mut Frame<'_>) -> JsResult<Speculated<i32>> {
        let left = self.left.execute_int(frame)?;
        let right = self.right.execute_int(frame)?;
        let result = match (left, right) {
            (Speculated::Exact(a), Speculated::Exact(b)) => match self.op.apply_int(a, b) {
                Some(r) => {
                    self.state.widen(ValueKind::Int);
                    return Ok(Speculated::Exact(r));
                }
                None => Value::number(self.op.apply_double(a as f64, b as f64)),
            },
            (left, right) => self.op.apply(&left.into_value(), &right.into_value()),
        };
        trace!(target: "spectree::nodes", op = %self.op, %result, "int speculation missed");
        self.state.observe(&result);
        Ok(Speculated::<i32>::from_value(result))
    }

    pub fn execute_double(&self, frame: &mut Frame<'_>) -> JsResult<Speculated<f64>> {
        let left = self.left.execute_double(frame)?;
        let right = self.right.execute_double(frame)?;
        match (left, right) {
            (Speculated::Exact(a), Speculated::Exact(b)) => {
                self.state.widen(ValueKind::Double);
                Ok(Speculated::Exact(self.op.apply_double(a, b)))
            }
            (left, right) => {
                let result = self.op.apply(&left.into_value(), &right.into_value());
                self.state.observe(&result);
                Ok(Speculated::<f64>::from_value(result))
            }
        }
    }

    pub(crate) fn rebuild(&self, f: &mut ChildMap<'_>) -> Self {
        BinaryNode {
            op: self.op,
            left: Box::new(f(&self.left)),
            right: Box::new(f(&self.right)),
            state: SpeculationState::new(),
        }
    }
}

/// `target[index]`
#[derive(Debug)]
pub struct ReadElementNode {
    target: Box<Node>,
    index: Box<Node>,
}

impl ReadElementNode {
    pub fn new(target: Node, index: Node) -> Self {
        ReadElementNode {
            target: Box::new(target),
            index: Box::new(index),
        }
    }

    pub fn target(&self) -> &Node {
        &self.target
    }

    pub fn index(&self) -> &Node {
        &self.index
    }

    pub fn execute(&self, frame: &mut Frame<'_>) -> JsResult<Value> {
        let target = self.target.execute(frame)?;
        let index = self.index.execute(frame)?;
        read_element(&target, &PropertyKey::from_value(&index))
    }

    pub(crate) fn rebuild(&self, f: &mut ChildMap<'_>) -> Self {
        ReadElementNode {
            target: Box::new(f(&self.target)),
            index: Box::new(f(&self.index)),
        }
    }
}

/// Read `key` from `target`
pub fn read_element(target: &Value, key: &PropertyKey) -> JsResult<Value> {
    match target {
        Value::Object(obj) => Ok(obj.get(key)),
        Value::Undefined | Value::Null => Err(JsError::TypeCoercion(format!(
            "Cannot read properties of {} (reading '{}')",
            target.type_name(),
            key
        ))),
        Value::String(s) => Ok(match key {
            PropertyKey::Index(i) => s
                .chars()
                .nth(*i as usize)
                .map(|c| Value::string(c.encode_utf8(&mut [0; 4])))
                .unwrap_or(Value::Undefined),
            PropertyKey::Name(name) if &**name == "length" => {
                Value::number(s.chars().count() as f64)
            }
            PropertyKey::Name(_) => Value::Undefined,
        }),
        Value::Pattern(p) => Ok(match key {
            PropertyKey::Name(name) if &**name == "source" => Value::string(p.source()),
            PropertyKey::Name(name) if &**name == "flags" => Value::string(&p.flags().to_string()),
            _ => Value::Undefined,
        }),
        Value::ListFormat(config) => Ok(match key {
            PropertyKey::Name(name) if &**name == "locale" => Value::string(config.locale()),
            PropertyKey::Name(name) if &**name == "type" => Value::string(config.list_type().as_str()),
            PropertyKey::Name(name) if &**name == "style" => Value::string(config.style().as_str()),
            _ => Value::Undefined,
        }),
        Value::Bool(_) | Value::Int(_) | Value::Double(_) => Ok(Value::Undefined),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::models::JsObject;

    #[test]
    fn test_apply_int_edges() {
        assert_eq!(BinaryOp::Add.apply_int(i32::MAX, 1), None);
        assert_eq!(BinaryOp::Mul.apply_int(0, -3), None);
        assert_eq!(BinaryOp::Div.apply_int(6, 3), Some(2));
        assert_eq!(BinaryOp::Div.apply_int(5, 2), None);
        assert_eq!(BinaryOp::Div.apply_int(1, 0), None);
        assert_eq!(BinaryOp::Div.apply_int(i32::MIN, -1), None);
        assert_eq!(BinaryOp::Rem.apply_int(-4, 2), None);
        assert_eq!(BinaryOp::Rem.apply_int(7, 3), Some(1));
        assert_eq!(BinaryOp::Rem.apply_int(7, 0), None);
    }

    #[test]
    fn test_apply_generic() {
        assert_eq!(BinaryOp::Div.apply(&Value::Int(5), &Value::Int(2)), Value::Double(2.5));
        assert_eq!(BinaryOp::Add.apply(&Value::string("a"), &Value::Int(1)), Value::string("a1"));
        assert_eq!(BinaryOp::Mul.apply(&Value::string("3"), &Value::Int(2)), Value::Int(6));
        assert!(BinaryOp::Sub.apply(&Value::Undefined, &Value::Int(1)).to_number().is_nan());
        assert_eq!(BinaryOp::Add.apply(&Value::Bool(true), &Value::Null), Value::Int(1));
    }

    #[test]
    fn test_read_element_targets() {
        let arr = Value::Object(JsObject::new_array(vec![Value::Int(9)]));
        assert_eq!(read_element(&arr, &PropertyKey::Index(0)).unwrap(), Value::Int(9));
        assert_eq!(read_element(&arr, &PropertyKey::name("length")).unwrap(), Value::Int(1));

        let s = Value::string("héllo");
        assert_eq!(read_element(&s, &PropertyKey::Index(1)).unwrap(), Value::string("é"));
        assert_eq!(read_element(&s, &PropertyKey::name("length")).unwrap(), Value::Int(5));

        let err = read_element(&Value::Null, &PropertyKey::Index(0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: Cannot read properties of null (reading '0')"
        );
    }
}
