//! Plain and tagged attribute values.
//!
//! Plain values arrive as ordinary JSON (`serde_json::Value`). The storage
//! service wants every attribute wrapped in a single-key type marker:
//!
//! ```text
//! "Alice"            -> {"S": "Alice"}
//! 42                 -> {"N": "42"}
//! {"city": "NYC"}    -> {"M": {"city": {"S": "NYC"}}}
//! ["a", {"id": 1}]   -> {"L": ["a", {"id": {"N": "1"}}]}
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record in its plain form.
pub type PlainItem = serde_json::Map<String, Value>;

/// One record in its tagged wire form.
pub type TaggedItem = IndexMap<String, AttributeValue>;

/// A tagged attribute value. Exactly one marker per value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String
    S(String),
    /// Number, as decimal text
    N(String),
    /// List
    L(Vec<ListElement>),
    /// Map
    M(TaggedItem),
}

/// An element inside an `L` value.
///
/// Under legacy list tagging only mapping elements are tagged (and appear as
/// bare tagged items); everything else is carried through as raw JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListElement {
    /// A fully tagged value (recursive list tagging only).
    Value(AttributeValue),
    /// A mapping element tagged as an item, without an `M` wrapper.
    Item(TaggedItem),
    /// An element passed through untagged.
    Raw(Value),
}

/// Name of the JSON type of `value`, used in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
