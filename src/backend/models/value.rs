use std::fmt;
use std::sync::Arc;

use crate::backend::intl::ListFormatConfig;
use crate::backend::pattern::CompiledPattern;

use super::object::ObjectRef;

/// A dynamic-language value as seen by the execution nodes
///
/// Numbers have two representations: `Int` for values that fit an `i32`
/// channel and `Double` for everything else. The typed entry points of the
/// nodes deliver the primitive directly instead of building a `Value`.
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    String(Arc<str>),
    Object(ObjectRef),
    /// A compiled matcher handle, held as an ordinary immutable value
    Pattern(Arc<CompiledPattern>),
    /// A validated list-format configuration
    ListFormat(Arc<ListFormatConfig>),
}

impl Value {
    /// Build a number, using the `Int` representation when it is exact
    ///
    /// `-0.0` stays a double so the sign survives.
    pub fn number(d: f64) -> Self {
        if d.fract() == 0.0
            && d >= i32::MIN as f64
            && d <= i32::MAX as f64
            && !(d == 0.0 && d.is_sign_negative())
        {
            Value::Int(d as i32)
        } else {
            Value::Double(d)
        }
    }

    pub fn string(s: &str) -> Self {
        Value::String(Arc::from(s))
    }

    /// `null` or `undefined`
    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Double(_))
    }

    /// Value of the int channel, `None` when the value is not an `Int`
    #[inline]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Value of the double channel; ints widen losslessly
    #[inline]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Name used by `typeof`-style messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Double(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) | Value::Pattern(_) | Value::ListFormat(_) => "object",
        }
    }

    /// Numeric conversion of this value
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Int(i) => *i as f64,
            Value::Double(d) => *d,
            Value::String(s) => string_to_number(s),
            Value::Object(_) | Value::Pattern(_) | Value::ListFormat(_) => f64::NAN,
        }
    }

    /// String conversion of this value
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Double(d) => number_to_string(*d),
            Value::String(s) => s.to_string(),
            Value::Object(obj) => obj.display_string(),
            Value::Pattern(p) => format!("/{}/{}", p.source(), p.flags()),
            Value::ListFormat(_) => "[object Intl.ListFormat]".to_string(),
        }
    }
}

/// Number-to-string conversion for doubles
pub fn number_to_string(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if d == 0.0 {
        "0".to_string()
    } else if d.fract() == 0.0 && d.abs() < 1e21 {
        format!("{:.0}", d)
    } else {
        format!("{}", d)
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    // Rust accepts "inf"/"nan" spellings that the language does not
    let lower = trimmed.to_ascii_lowercase();
    if lower.contains("inf") || lower.contains("nan") {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

impl PartialEq for Value {
    /// Strict equality: numbers compare by value across representations,
    /// reference types compare by identity
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Pattern(a), Value::Pattern(b)) => Arc::ptr_eq(a, b),
            (Value::ListFormat(a), Value::ListFormat(b)) => Arc::ptr_eq(a, b),
            (a, b) => match (a.as_double(), b.as_double()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other.to_display_string()),
        }
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}
