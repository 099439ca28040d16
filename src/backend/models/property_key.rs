use std::fmt;
use std::sync::Arc;

use super::value::Value;

/// Largest valid array index (2^32 - 2)
pub const MAX_ARRAY_INDEX: u32 = u32::MAX - 1;

/// A canonicalized element index: either an array index or a named key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Index(u32),
    Name(Arc<str>),
}

impl PropertyKey {
    pub fn name(name: &str) -> Self {
        PropertyKey::Name(Arc::from(name))
    }

    /// Key for a primitive int index; negative values are named keys
    #[inline]
    pub fn from_int(index: i32) -> Self {
        if index >= 0 {
            PropertyKey::Index(index as u32)
        } else {
            PropertyKey::Name(Arc::from(index.to_string()))
        }
    }

    /// Key for a double index; only integral values in range are array indices
    pub fn from_double(index: f64) -> Self {
        if index.fract() == 0.0 && index >= 0.0 && index <= MAX_ARRAY_INDEX as f64 {
            PropertyKey::Index(index as u32)
        } else {
            PropertyKey::Name(Arc::from(super::value::number_to_string(index)))
        }
    }

    /// Key for a string index; canonical numeric strings become array indices
    pub fn from_string(index: &str) -> Self {
        match parse_array_index(index) {
            Some(i) => PropertyKey::Index(i),
            None => PropertyKey::name(index),
        }
    }

    /// Canonicalize any value into a property key
    pub fn from_value(index: &Value) -> Self {
        match index {
            Value::Int(i) => PropertyKey::from_int(*i),
            Value::Double(d) => PropertyKey::from_double(*d),
            Value::String(s) => PropertyKey::from_string(s),
            other => PropertyKey::from_string(&other.to_display_string()),
        }
    }

    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            PropertyKey::Name(_) => None,
        }
    }

    /// The key as a value, the form written into an index cache slot
    pub fn to_value(&self) -> Value {
        match self {
            PropertyKey::Index(i) if *i <= i32::MAX as u32 => Value::Int(*i as i32),
            PropertyKey::Index(i) => Value::Double(*i as f64),
            PropertyKey::Name(name) => Value::String(Arc::clone(name)),
        }
    }
}

/// Parse a canonical array index string ("0", "17"; not "017", "+1", "1.0")
pub fn parse_array_index(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    let value: u64 = s.parse().ok()?;
    if value <= MAX_ARRAY_INDEX as u64 {
        Some(value as u32)
    } else {
        None
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(i) => write!(f, "{}", i),
            PropertyKey::Name(name) => write!(f, "{}", name),
        }
    }
}
