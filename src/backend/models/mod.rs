pub mod object;
pub mod property_key;
pub mod value;

pub use object::{JsObject, ObjectClass, ObjectRef, StoreFlags};
pub use property_key::{parse_array_index, PropertyKey, MAX_ARRAY_INDEX};
pub use value::{number_to_string, Value};
