//! Conversion from plain items to tagged items.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::value::{AttributeValue, ListElement, PlainItem, TaggedItem, json_type_name};

/// Errors raised while tagging a plain item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// A value's type has no tagged representation
    #[error("unsupported type for key {key}: {found}")]
    UnsupportedType {
        /// Key holding the offending value
        key: String,
        /// Observed JSON type
        found: &'static str,
    },
    /// Nesting exceeded the configured limit
    #[error("nesting too deep for key {key}: limit is {limit}")]
    DepthExceeded {
        /// Key at which the limit was crossed
        key: String,
        /// Configured limit
        limit: usize,
    },
}

impl TagError {
    /// Key the error refers to.
    pub fn key(&self) -> &str {
        match self {
            TagError::UnsupportedType { key, .. } | TagError::DepthExceeded { key, .. } => key,
        }
    }
}

/// How list elements are tagged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListTagging {
    /// Only mapping elements are tagged; scalars and nested lists pass
    /// through raw. This is the wire shape existing callers depend on.
    #[default]
    Legacy,
    /// Every element is tagged as a full attribute value.
    Recursive,
}

/// Options controlling tagging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOptions {
    /// List element handling
    #[serde(default)]
    pub list_tagging: ListTagging,
    /// Maximum container nesting depth, unlimited when `None`
    #[serde(default)]
    pub max_depth: Option<usize>,
}

/// Tag every attribute of `item` using default options.
///
/// ```
/// use dynadispatch::{AttributeValue, tag_item};
/// use serde_json::json;
///
/// let item = json!({"n": 42}).as_object().cloned().unwrap_or_default();
/// let tagged = tag_item(&item).unwrap();
/// assert_eq!(tagged["n"], AttributeValue::N("42".into()));
/// ```
pub fn tag_item(item: &PlainItem) -> Result<TaggedItem, TagError> {
    tag_item_with(item, &TagOptions::default())
}

/// Tag every attribute of `item`.
pub fn tag_item_with(item: &PlainItem, options: &TagOptions) -> Result<TaggedItem, TagError> {
    Tagger { options }.item(item, 0)
}

/// Tag a single value as if it were the only attribute of an item.
pub fn tag_value(key: &str, value: &Value, options: &TagOptions) -> Result<AttributeValue, TagError> {
    Tagger { options }.value(key, value, 0)
}

struct Tagger<'a> {
    options: &'a TagOptions,
}

impl Tagger<'_> {
    fn item(&self, item: &PlainItem, depth: usize) -> Result<TaggedItem, TagError> {
        item.iter()
            .map(|(key, value)| Ok((key.clone(), self.value(key, value, depth)?)))
            .collect()
    }

    fn value(&self, key: &str, value: &Value, depth: usize) -> Result<AttributeValue, TagError> {
        match value {
            Value::String(s) => Ok(AttributeValue::S(s.clone())),
            Value::Number(n) => Ok(AttributeValue::N(n.to_string())),
            Value::Array(elements) => {
                self.descend(key, depth)?;
                let elements = elements
                    .iter()
                    .map(|element| self.element(key, element, depth + 1))
                    .collect::<Result<Vec<_>, TagError>>()?;
                Ok(AttributeValue::L(elements))
            }
            Value::Object(map) => {
                self.descend(key, depth)?;
                Ok(AttributeValue::M(self.item(map, depth + 1)?))
            }
            Value::Null | Value::Bool(_) => Err(TagError::UnsupportedType {
                key: key.to_string(),
                found: json_type_name(value),
            }),
        }
    }

    fn element(&self, key: &str, element: &Value, depth: usize) -> Result<ListElement, TagError> {
        match self.options.list_tagging {
            ListTagging::Legacy => match element {
                Value::Object(map) => Ok(ListElement::Item(self.item(map, depth)?)),
                other => Ok(ListElement::Raw(other.clone())),
            },
            ListTagging::Recursive => Ok(ListElement::Value(self.value(key, element, depth)?)),
        }
    }

    fn descend(&self, key: &str, depth: usize) -> Result<(), TagError> {
        match self.options.max_depth {
            Some(limit) if depth >= limit => Err(TagError::DepthExceeded {
                key: key.to_string(),
                limit,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain(value: Value) -> PlainItem {
        value.as_object().cloned().unwrap()
    }

    fn wire(item: &TaggedItem) -> Value {
        serde_json::to_value(item).unwrap()
    }

    #[test]
    fn test_string_passthrough() {
        let tagged = tag_item(&plain(json!({"name": "Alice"}))).unwrap();
        assert_eq!(wire(&tagged), json!({"name": {"S": "Alice"}}));
    }

    #[test]
    fn test_numbers_render_as_decimal_text() {
        let tagged = tag_item(&plain(json!({
            "n": 42,
            "x": 3.5,
            "neg": -7,
            "whole": 1.0,
            "big": u64::MAX,
        })))
        .unwrap();

        assert_eq!(
            wire(&tagged),
            json!({
                "n": {"N": "42"},
                "x": {"N": "3.5"},
                "neg": {"N": "-7"},
                "whole": {"N": "1.0"},
                "big": {"N": "18446744073709551615"},
            })
        );
    }

    #[test]
    fn test_nested_mapping_recursion() {
        let tagged = tag_item(&plain(json!({"addr": {"city": "NYC", "zip": {"code": 10001}}}))).unwrap();
        assert_eq!(
            wire(&tagged),
            json!({"addr": {"M": {
                "city": {"S": "NYC"},
                "zip": {"M": {"code": {"N": "10001"}}},
            }}})
        );
    }

    #[test]
    fn test_list_scalars_are_not_tagged() {
        // Legacy shape: scalar list elements stay raw inside the L wrapper.
        let tagged = tag_item(&plain(json!({"tags": ["a", "b", 3]}))).unwrap();
        assert_eq!(wire(&tagged), json!({"tags": {"L": ["a", "b", 3]}}));
    }

    #[test]
    fn test_list_mapping_elements_are_tagged_without_wrapper() {
        let tagged = tag_item(&plain(json!({"items": [{"id": 1}]}))).unwrap();
        assert_eq!(wire(&tagged), json!({"items": {"L": [{"id": {"N": "1"}}]}}));
    }

    #[test]
    fn test_list_passes_nested_lists_and_nulls_raw() {
        let tagged = tag_item(&plain(json!({"mixed": [[{"id": 1}], null, true]}))).unwrap();
        assert_eq!(
            wire(&tagged),
            json!({"mixed": {"L": [[{"id": 1}], null, true]}})
        );
    }

    #[test]
    fn test_unsupported_type_names_key() {
        let err = tag_item(&plain(json!({"ok": "x", "bad": null}))).unwrap_err();
        assert_eq!(
            err,
            TagError::UnsupportedType {
                key: "bad".to_string(),
                found: "null",
            }
        );
        assert_eq!(err.to_string(), "unsupported type for key bad: null");
    }

    #[test]
    fn test_unsupported_type_in_nested_mapping_names_inner_key() {
        let err = tag_item(&plain(json!({"outer": {"flag": false}}))).unwrap_err();
        assert_eq!(err.key(), "flag");
    }

    #[test]
    fn test_unsupported_type_inside_list_mapping() {
        let err = tag_item(&plain(json!({"items": [{"deleted": true}]}))).unwrap_err();
        assert_eq!(err.key(), "deleted");
    }

    #[test]
    fn test_preserves_keys_and_order() {
        let item = plain(json!({"z": 1, "a": "x", "m": {"q": 2, "b": 3}, "l": []}));
        let tagged = tag_item(&item).unwrap();

        let keys: Vec<_> = tagged.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m", "l"]);
        let AttributeValue::M(inner) = &tagged["m"] else {
            panic!("expected map");
        };
        let inner_keys: Vec<_> = inner.keys().cloned().collect();
        assert_eq!(inner_keys, vec!["q", "b"]);
    }

    #[test]
    fn test_empty_item() {
        assert!(tag_item(&PlainItem::new()).unwrap().is_empty());
    }

    #[test]
    fn test_double_application_mistags_wrappers() {
        let once = tag_item(&plain(json!({"n": 42}))).unwrap();
        let twice = tag_item(&plain(wire(&once))).unwrap();

        // The {"N": "42"} wrapper is itself a mapping, so it becomes M.
        assert_eq!(wire(&twice), json!({"n": {"M": {"N": {"S": "42"}}}}));
        assert_ne!(wire(&twice), wire(&once));
    }

    #[test]
    fn test_recursive_list_tagging() {
        let options = TagOptions {
            list_tagging: ListTagging::Recursive,
            ..TagOptions::default()
        };
        let tagged = tag_item_with(
            &plain(json!({"tags": ["a", 1, [2], {"id": 3}]})),
            &options,
        )
        .unwrap();

        assert_eq!(
            wire(&tagged),
            json!({"tags": {"L": [
                {"S": "a"},
                {"N": "1"},
                {"L": [{"N": "2"}]},
                {"M": {"id": {"N": "3"}}},
            ]}})
        );
    }

    #[test]
    fn test_recursive_list_tagging_rejects_null_elements() {
        let options = TagOptions {
            list_tagging: ListTagging::Recursive,
            ..TagOptions::default()
        };
        let err = tag_item_with(&plain(json!({"tags": ["a", null]})), &options).unwrap_err();
        assert_eq!(
            err,
            TagError::UnsupportedType {
                key: "tags".to_string(),
                found: "null",
            }
        );
    }

    #[test]
    fn test_max_depth() {
        let options = TagOptions {
            max_depth: Some(2),
            ..TagOptions::default()
        };
        let shallow = plain(json!({"a": {"b": {"c": 1}}}));
        assert!(tag_item_with(&shallow, &options).is_ok());

        let deep = plain(json!({"a": {"b": {"c": {"d": 1}}}}));
        let err = tag_item_with(&deep, &options).unwrap_err();
        assert_eq!(
            err,
            TagError::DepthExceeded {
                key: "c".to_string(),
                limit: 2,
            }
        );
    }

    #[test]
    fn test_max_depth_counts_list_levels() {
        let options = TagOptions {
            max_depth: Some(1),
            ..TagOptions::default()
        };
        let err = tag_item_with(&plain(json!({"items": [{"inner": {"x": 1}}]})), &options)
            .unwrap_err();
        assert_eq!(err.key(), "inner");
    }

    #[test]
    fn test_tag_value_matches_singleton_item() {
        let value = json!({"city": "NYC"});
        let options = TagOptions::default();

        let direct = tag_value("addr", &value, &options).unwrap();
        let mut item = PlainItem::new();
        item.insert("addr".to_string(), value);
        let via_item = tag_item(&item).unwrap();

        assert_eq!(Some(&direct), via_item.get("addr"));
    }
}
