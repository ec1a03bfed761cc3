//! Attribute update sets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tagger::{TagError, TagOptions, tag_value};
use crate::value::AttributeValue;

/// Action applied when an update entry doesn't name one.
pub const DEFAULT_ACTION: &str = "PUT";

/// A requested mutation of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEntry {
    /// New value, in plain form
    #[serde(rename = "Value", alias = "value")]
    pub value: Value,
    /// Update action, e.g. `PUT`, `ADD` or `DELETE`
    #[serde(
        rename = "Action",
        alias = "action",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub action: Option<String>,
}

impl UpdateEntry {
    /// Create an entry with no explicit action.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            action: None,
        }
    }

    /// Set the action.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// The action to apply, falling back to [`DEFAULT_ACTION`].
    pub fn resolved_action(&self) -> &str {
        self.action.as_deref().unwrap_or(DEFAULT_ACTION)
    }
}

/// Per-attribute requested mutations.
pub type UpdateSpec = IndexMap<String, UpdateEntry>;

/// A tagged attribute update. The action is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedUpdate {
    /// Tagged value
    #[serde(rename = "Value")]
    pub value: AttributeValue,
    /// Update action
    #[serde(rename = "Action")]
    pub action: String,
}

/// Tagged attribute updates, by attribute name.
pub type TaggedUpdateSpec = IndexMap<String, TaggedUpdate>;

/// Tag an update set using default tagging options.
pub fn tag_updates(updates: &UpdateSpec) -> Result<TaggedUpdateSpec, TagError> {
    tag_updates_with(updates, &TagOptions::default())
}

/// Tag an update set.
///
/// Each value is tagged as the sole attribute of a one-key item, so errors
/// name the attribute being updated. Actions are not checked against the
/// set the storage service accepts.
pub fn tag_updates_with(
    updates: &UpdateSpec,
    options: &TagOptions,
) -> Result<TaggedUpdateSpec, TagError> {
    updates
        .iter()
        .map(|(key, entry)| {
            let update = TaggedUpdate {
                value: tag_value(key, &entry.value, options)?,
                action: entry.resolved_action().to_string(),
            };
            Ok((key.clone(), update))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> UpdateSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_default_action_is_put() {
        let tagged = tag_updates(&spec(json!({"age": {"Value": 30}}))).unwrap();

        assert_eq!(tagged["age"].value, AttributeValue::N("30".to_string()));
        assert_eq!(tagged["age"].action, "PUT");
    }

    #[test]
    fn test_explicit_action_is_kept() {
        let tagged = tag_updates(&spec(json!({"age": {"Value": 30, "Action": "ADD"}}))).unwrap();

        assert_eq!(tagged["age"].value, AttributeValue::N("30".to_string()));
        assert_eq!(tagged["age"].action, "ADD");
    }

    #[test]
    fn test_lowercase_field_names_accepted() {
        let tagged = tag_updates(&spec(json!({"age": {"value": 30, "action": "ADD"}}))).unwrap();
        assert_eq!(tagged["age"].action, "ADD");
    }

    #[test]
    fn test_null_action_falls_back_to_default() {
        let tagged = tag_updates(&spec(json!({"age": {"Value": 30, "Action": null}}))).unwrap();
        assert_eq!(tagged["age"].action, DEFAULT_ACTION);
    }

    #[test]
    fn test_action_is_not_validated() {
        let mut updates = UpdateSpec::new();
        updates.insert(
            "name".to_string(),
            UpdateEntry::new(json!("Bob")).with_action("FROBNICATE"),
        );
        let tagged = tag_updates(&updates).unwrap();
        assert_eq!(tagged["name"].action, "FROBNICATE");
    }

    #[test]
    fn test_wire_shape() {
        let tagged = tag_updates(&spec(json!({
            "age": {"Value": 30},
            "address": {"Value": {"city": "NYC"}, "Action": "PUT"},
            "tags": {"Value": ["a"], "Action": "ADD"},
        })))
        .unwrap();

        assert_eq!(
            serde_json::to_value(&tagged).unwrap(),
            json!({
                "age": {"Value": {"N": "30"}, "Action": "PUT"},
                "address": {"Value": {"M": {"city": {"S": "NYC"}}}, "Action": "PUT"},
                "tags": {"Value": {"L": ["a"]}, "Action": "ADD"},
            })
        );
    }

    #[test]
    fn test_tag_error_names_update_key() {
        let err = tag_updates(&spec(json!({"ok": {"Value": 1}, "flag": {"Value": true}})))
            .unwrap_err();
        assert_eq!(
            err,
            TagError::UnsupportedType {
                key: "flag".to_string(),
                found: "bool",
            }
        );
    }

    #[test]
    fn test_missing_value_is_rejected_at_parse() {
        let result: Result<UpdateSpec, _> =
            serde_json::from_value(json!({"age": {"Action": "PUT"}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_options_are_forwarded() {
        let options = TagOptions {
            max_depth: Some(0),
            ..TagOptions::default()
        };
        let err = tag_updates_with(&spec(json!({"addr": {"Value": {"city": "NYC"}}})), &options)
            .unwrap_err();
        assert!(matches!(err, TagError::DepthExceeded { ref key, .. } if key == "addr"));
    }
}
