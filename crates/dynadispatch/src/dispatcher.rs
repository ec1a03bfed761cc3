//! Operation dispatch.
//!
//! An [`Event`] names an operation and carries a payload of storage request
//! parameters in plain form. The dispatcher tags the fields the storage
//! service needs tagged (`Item`, `Key`, `AttributeUpdates`), forwards the
//! request to a [`StorageClient`] and wraps the outcome in a [`Response`].
//!
//! | operation | storage call(s)             | tagged fields            |
//! |-----------|-----------------------------|--------------------------|
//! | `create`  | `put_item`, then `get_item` | `Item`                   |
//! | `read`    | `get_item`                  | `Key`                    |
//! | `update`  | `update_item`               | `Key`, `AttributeUpdates`|
//! | `delete`  | `delete_item`               | `Key`                    |
//! | `list`    | `scan`                      | none                     |
//! | `echo`    | none, answers `"Success"`   |                          |
//! | `ping`    | none, answers `"pong"`      |                          |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::client::{Params, StorageClient, StorageError};
use crate::config::DispatchConfig;
use crate::tagger::{TagError, tag_item_with};
use crate::updates::{UpdateSpec, tag_updates_with};
use crate::value::{TaggedItem, json_type_name};

/// Errors that can occur while dispatching an event
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The event document is malformed
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    /// The operation name is missing or not recognised
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
    /// A payload field the operation needs is absent
    #[error("missing payload field: {0}")]
    MissingField(&'static str),
    /// A payload field has the wrong shape
    #[error("invalid payload field {field}: {reason}")]
    InvalidField {
        /// Payload field name
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },
    /// A value couldn't be tagged
    #[error(transparent)]
    Tag(#[from] TagError),
    /// The storage service rejected or failed the call
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A result couldn't be encoded
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    /// Returns true if the error was caused by the caller's input rather
    /// than by the storage service.
    pub fn is_client_error(&self) -> bool {
        match self {
            DispatchError::InvalidEvent(_)
            | DispatchError::UnknownOperation(_)
            | DispatchError::MissingField(_)
            | DispatchError::InvalidField { .. }
            | DispatchError::Tag(_) => true,
            DispatchError::Storage(err) => !matches!(err, StorageError::Service(_)),
            DispatchError::Encode(_) => false,
        }
    }

    /// HTTP-style status code reported for this error.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() { 400 } else { 500 }
    }
}

/// A dispatchable operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Put an item and read it back
    Create,
    /// Get an item by key
    Read,
    /// Apply attribute updates to an item
    Update,
    /// Delete an item by key
    Delete,
    /// Scan a table
    List,
    /// Answer without touching storage
    Echo,
    /// Liveness check
    Ping,
}

impl Operation {
    /// Operation name as it appears in events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::Echo => "echo",
            Operation::Ping => "ping",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "read" => Ok(Operation::Read),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            "list" => Ok(Operation::List),
            "echo" => Ok(Operation::Echo),
            "ping" => Ok(Operation::Ping),
            other => Err(DispatchError::UnknownOperation(other.to_string())),
        }
    }
}

/// One incoming request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Operation name
    #[serde(default)]
    pub operation: Option<String>,
    /// Table to operate on; overrides `payload.TableName`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    /// Storage request parameters in plain form
    #[serde(default)]
    pub payload: Params,
}

impl Event {
    /// Create an event for `operation` with an empty payload.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Self::default()
        }
    }

    /// Set the table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    /// Set a payload field.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.payload.insert(name.into(), value);
        self
    }
}

/// The outcome of handling one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// 200 on success, 400 for caller errors, 500 for service errors
    pub status_code: u16,
    /// JSON text of the result, or `{"error": "..."}`
    pub body: String,
}

impl Response {
    fn from_result(result: Result<Value, DispatchError>) -> Self {
        let encoded =
            result.and_then(|value| serde_json::to_string(&value).map_err(DispatchError::from));
        match encoded {
            Ok(body) => Self {
                status_code: 200,
                body,
            },
            Err(err) => Self {
                status_code: err.status_code(),
                body: json!({ "error": err.to_string() }).to_string(),
            },
        }
    }

    /// Returns true for a 200 response.
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Routes events to a storage client
pub struct Dispatcher<C: StorageClient + ?Sized> {
    client: Arc<C>,
    config: DispatchConfig,
}

impl<C: StorageClient + ?Sized> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: StorageClient + ?Sized> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
        }
    }
}

impl<C: StorageClient + ?Sized> Dispatcher<C> {
    /// Create a dispatcher with default configuration.
    pub fn new(client: Arc<C>) -> Self {
        Self::with_config(client, DispatchConfig::default())
    }

    /// Create a dispatcher with the given configuration.
    pub fn with_config(client: Arc<C>, config: DispatchConfig) -> Self {
        Self { client, config }
    }

    /// Get a reference to the storage client.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Handle a raw event document. Never fails; errors become non-200
    /// responses.
    pub async fn handle(&self, event: Value) -> Response {
        let result = match serde_json::from_value::<Event>(event) {
            Ok(event) => self.dispatch(event).await,
            Err(e) => Err(DispatchError::InvalidEvent(e.to_string())),
        };
        if let Err(err) = &result {
            tracing::warn!(error = %err, client_error = err.is_client_error(), "dispatch failed");
        }
        Response::from_result(result)
    }

    /// Dispatch an event and return the storage service's raw response.
    pub async fn dispatch(&self, event: Event) -> Result<Value, DispatchError> {
        let operation: Operation = event
            .operation
            .as_deref()
            .ok_or_else(|| DispatchError::UnknownOperation("<missing>".to_string()))?
            .parse()?;

        let mut payload = event.payload;
        if let Some(table) = event.table_name {
            payload.insert("TableName".to_string(), Value::String(table));
        } else if let Some(table) = &self.config.default_table {
            if !payload.contains_key("TableName") {
                payload.insert("TableName".to_string(), Value::String(table.clone()));
            }
        }

        let table = payload.get("TableName").and_then(Value::as_str);
        tracing::debug!(operation = %operation, table = ?table, "dispatching");

        match operation {
            Operation::Create => self.create(payload).await,
            Operation::Read => {
                self.tag_field(&mut payload, "Key")?;
                Ok(self.client.get_item(payload).await?)
            }
            Operation::Update => {
                self.tag_field(&mut payload, "Key")?;
                self.tag_update_field(&mut payload)?;
                Ok(self.client.update_item(payload).await?)
            }
            Operation::Delete => {
                self.tag_field(&mut payload, "Key")?;
                Ok(self.client.delete_item(payload).await?)
            }
            Operation::List => Ok(self.client.scan(payload).await?),
            Operation::Echo => Ok(Value::String("Success".to_string())),
            Operation::Ping => Ok(Value::String("pong".to_string())),
        }
    }

    /// Put the item, then read it back by every attribute whose name
    /// contains "id".
    async fn create(&self, mut payload: Params) -> Result<Value, DispatchError> {
        let item = self.tag_field(&mut payload, "Item")?;
        let key: TaggedItem = item
            .into_iter()
            .filter(|(name, _)| name.to_lowercase().contains("id"))
            .collect();
        let table = payload.get("TableName").cloned();

        self.client.put_item(payload).await?;

        let mut get = Params::new();
        if let Some(table) = table {
            get.insert("TableName".to_string(), table);
        }
        get.insert("Key".to_string(), serde_json::to_value(&key)?);
        Ok(self.client.get_item(get).await?)
    }

    /// Replace the plain item at `payload[field]` with its tagged form.
    fn tag_field(
        &self,
        payload: &mut Params,
        field: &'static str,
    ) -> Result<TaggedItem, DispatchError> {
        let tagged = match payload.get(field) {
            Some(Value::Object(item)) => tag_item_with(item, &self.config.tag_options())?,
            Some(other) => {
                return Err(DispatchError::InvalidField {
                    field,
                    reason: format!("expected mapping, found {}", json_type_name(other)),
                });
            }
            None => return Err(DispatchError::MissingField(field)),
        };
        payload.insert(field.to_string(), serde_json::to_value(&tagged)?);
        Ok(tagged)
    }

    fn tag_update_field(&self, payload: &mut Params) -> Result<(), DispatchError> {
        const FIELD: &str = "AttributeUpdates";
        let raw = payload.get(FIELD).ok_or(DispatchError::MissingField(FIELD))?;
        let updates: UpdateSpec =
            serde_json::from_value(raw.clone()).map_err(|e| DispatchError::InvalidField {
                field: FIELD,
                reason: e.to_string(),
            })?;
        let tagged = tag_updates_with(&updates, &self.config.tag_options())?;
        payload.insert(FIELD.to_string(), serde_json::to_value(&tagged)?);
        Ok(())
    }
}
