//! Minimal object model: indexed elements, named properties and the two
//! integrity flags the element store has to respect.
//!
//! Prototype lookup, accessors and per-property attributes are out of scope.
//! An object is either extensible or not, and either frozen or not.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::trace;

use crate::backend::error::{JsError, JsResult};

use super::property_key::{parse_array_index, PropertyKey};
use super::value::Value;

/// Shared handle to an object
pub type ObjectRef = Arc<JsObject>;

/// Indices further than this past the dense end go to the named table
const MAX_DENSE_GAP: u32 = 1024;

/// Kind of object, used for `length` bookkeeping and display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Ordinary,
    Array,
}

/// How an element store treats a rejected write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreFlags {
    /// Rejections throw instead of being ignored
    pub strict: bool,
    /// Define an own data property instead of assigning; rejections always throw
    pub write_own: bool,
}

#[derive(Debug)]
pub struct JsObject {
    class: ObjectClass,
    elements: RwLock<Vec<Option<Value>>>,
    properties: DashMap<Arc<str>, Value>,
    length: AtomicU32,
    extensible: AtomicBool,
    frozen: AtomicBool,
    /// Number of committed stores, observable by tooling and tests
    stores: AtomicU64,
}

impl JsObject {
    fn with_class(class: ObjectClass, elements: Vec<Option<Value>>) -> Self {
        let length = elements.len() as u32;
        JsObject {
            class,
            elements: RwLock::new(elements),
            properties: DashMap::new(),
            length: AtomicU32::new(length),
            extensible: AtomicBool::new(true),
            frozen: AtomicBool::new(false),
            stores: AtomicU64::new(0),
        }
    }

    /// Create an empty ordinary object
    pub fn new_ordinary() -> ObjectRef {
        Arc::new(Self::with_class(ObjectClass::Ordinary, Vec::new()))
    }

    /// Create an array holding `values`
    pub fn new_array(values: Vec<Value>) -> ObjectRef {
        Arc::new(Self::with_class(
            ObjectClass::Array,
            values.into_iter().map(Some).collect(),
        ))
    }

    /// Create an ordinary object from named properties
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> ObjectRef {
        let obj = Self::new_ordinary();
        for (name, value) in pairs {
            obj.properties.insert(Arc::from(name), value);
        }
        obj
    }

    pub fn class(&self) -> ObjectClass {
        self.class
    }

    /// Array length (one past the highest index ever stored)
    pub fn length(&self) -> u32 {
        self.length.load(Ordering::Acquire)
    }

    pub fn is_extensible(&self) -> bool {
        self.extensible.load(Ordering::Acquire)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub fn prevent_extensions(&self) {
        self.extensible.store(false, Ordering::Release);
    }

    /// Freeze: no new properties, no writes to existing ones
    pub fn freeze(&self) {
        self.prevent_extensions();
        self.frozen.store(true, Ordering::Release);
    }

    /// Number of stores committed to this object so far
    pub fn store_count(&self) -> u64 {
        self.stores.load(Ordering::Acquire)
    }

    /// Read a property; missing properties and holes read as `undefined`
    pub fn get(&self, key: &PropertyKey) -> Value {
        match key {
            PropertyKey::Index(i) => {
                if let Some(Some(value)) = self.elements.read().get(*i as usize) {
                    return value.clone();
                }
                self.get_named(&i.to_string()).unwrap_or(Value::Undefined)
            }
            PropertyKey::Name(name) => {
                if self.class == ObjectClass::Array && &**name == "length" {
                    return Value::number(self.length() as f64);
                }
                self.get_named(name).unwrap_or(Value::Undefined)
            }
        }
    }

    /// Read a named own property, `None` when absent
    pub fn get_named(&self, name: &str) -> Option<Value> {
        self.properties.get(name).map(|entry| entry.value().clone())
    }

    pub fn has_own(&self, key: &PropertyKey) -> bool {
        match key {
            PropertyKey::Index(i) => {
                matches!(self.elements.read().get(*i as usize), Some(Some(_)))
                    || self.properties.contains_key(i.to_string().as_str())
            }
            PropertyKey::Name(name) => {
                (self.class == ObjectClass::Array && &**name == "length")
                    || self.properties.contains_key(&**name)
            }
        }
    }

    fn is_length_key(&self, key: &PropertyKey) -> bool {
        self.class == ObjectClass::Array
            && matches!(key, PropertyKey::Name(name) if &**name == "length")
    }

    /// Store `value` under `key`
    ///
    /// A rejected store throws when `flags.strict` or `flags.write_own` is set
    /// and is silently dropped otherwise. Nothing is written when the store is
    /// rejected.
    ///
    /// Storing `length` on an array resizes it; elements at or past the new
    /// length are deleted. A value that is not a valid length is a
    /// `RangeError` in every mode.
    pub fn put(&self, key: &PropertyKey, value: Value, flags: StoreFlags) -> JsResult<()> {
        let new_length = if self.is_length_key(key) {
            Some(array_length(&value)?)
        } else {
            None
        };
        if let Some(reason) = self.rejection(key, flags.write_own) {
            if flags.strict || flags.write_own {
                return Err(JsError::Type(reason));
            }
            trace!(target: "spectree::object", %key, "store ignored: {}", reason);
            return Ok(());
        }

        match (key, new_length) {
            (_, Some(length)) => self.set_length(length),
            (PropertyKey::Index(i), None) => self.put_index(*i, value),
            (PropertyKey::Name(name), None) => {
                self.properties.insert(Arc::clone(name), value);
            }
        }
        self.stores.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn put_index(&self, index: u32, value: Value) {
        let mut elements = self.elements.write();
        let len = elements.len() as u32;
        if index < len {
            elements[index as usize] = Some(value);
        } else if index - len <= MAX_DENSE_GAP {
            elements.resize(index as usize, None);
            elements.push(Some(value));
        } else {
            drop(elements);
            self.properties.insert(Arc::from(index.to_string()), value);
        }
        if self.class == ObjectClass::Array {
            self.length.fetch_max(index + 1, Ordering::AcqRel);
        }
    }

    fn set_length(&self, new_length: u32) {
        let mut elements = self.elements.write();
        elements.truncate(new_length as usize);
        let old = self.length.swap(new_length, Ordering::AcqRel);
        if new_length < old {
            self.properties
                .retain(|name, _| parse_array_index(name).map_or(true, |i| i < new_length));
        }
        trace!(target: "spectree::object", old, new_length, "array length set");
    }

    fn rejection(&self, key: &PropertyKey, write_own: bool) -> Option<String> {
        if self.is_frozen() {
            return Some(if write_own {
                format!("Cannot redefine property: {}", key)
            } else {
                format!("Cannot assign to read only property '{}' of object", key)
            });
        }
        if !self.is_extensible() && !self.has_own(key) {
            return Some(if write_own {
                format!("Cannot define property {}, object is not extensible", key)
            } else {
                format!("Cannot add property {}, object is not extensible", key)
            });
        }
        None
    }

    /// Snapshot of the dense elements, holes as `undefined`
    pub fn elements(&self) -> Vec<Value> {
        self.elements
            .read()
            .iter()
            .map(|slot| slot.clone().unwrap_or(Value::Undefined))
            .collect()
    }

    pub(crate) fn display_string(&self) -> String {
        match self.class {
            ObjectClass::Ordinary => "[object Object]".to_string(),
            ObjectClass::Array => self
                .elements()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_display_string() })
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Validate a value stored to an array's `length`
fn array_length(value: &Value) -> JsResult<u32> {
    let number = value.to_number();
    if number.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&number) {
        Ok(number as u32)
    } else {
        Err(JsError::Range("Invalid array length".to_string()))
    }
}
