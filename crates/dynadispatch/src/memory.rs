//! In-memory storage client.
//!
//! Holds tagged items per table and answers the same calls the storage
//! service does, with the same response shapes. Used by tests and by the CLI
//! when no remote service is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::client::{Params, StorageClient, StorageError};

#[derive(Debug, Default)]
struct Table {
    key_attributes: Vec<String>,
    items: Vec<Params>,
}

impl Table {
    fn new<I, S>(key_attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_attributes: key_attributes.into_iter().map(Into::into).collect(),
            items: Vec::new(),
        }
    }

    /// Key values of `item`, in key-attribute order.
    fn key_of(&self, item: &Params) -> Result<Vec<Value>, StorageError> {
        self.key_attributes
            .iter()
            .map(|name| {
                item.get(name).cloned().ok_or_else(|| {
                    StorageError::Validation(format!("missing key attribute {name}"))
                })
            })
            .collect()
    }

    /// Key values named by a `Key` parameter, which must hold exactly the
    /// key attributes.
    fn lookup_key(&self, key: &Params) -> Result<Vec<Value>, StorageError> {
        if key.len() != self.key_attributes.len() {
            return Err(StorageError::Validation(format!(
                "key must contain exactly the attributes {:?}",
                self.key_attributes
            )));
        }
        self.key_of(key)
    }

    fn position(&self, key: &[Value]) -> Option<usize> {
        self.items.iter().position(|item| {
            self.key_of(item).is_ok_and(|stored| {
                stored.len() == key.len()
                    && stored.iter().zip(key).all(|(a, b)| key_values_equal(a, b))
            })
        })
    }
}

/// Key attributes compare as values: `N` keys by number, so `1` and `1.0`
/// address the same item.
fn key_values_equal(a: &Value, b: &Value) -> bool {
    match (tagged_number(a), tagged_number(b)) {
        (Some(x), Some(y)) => numbers_equal(x, y),
        _ => a == b,
    }
}

fn numbers_equal(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    if let (Ok(x), Ok(y)) = (a.parse::<i128>(), b.parse::<i128>()) {
        return x == y;
    }
    matches!((a.parse::<f64>(), b.parse::<f64>()), (Ok(x), Ok(y)) if x == y)
}

/// A `StorageClient` that keeps every table in memory.
pub struct InMemoryStorage {
    tables: RwLock<HashMap<String, Table>>,
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStorage").finish_non_exhaustive()
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Create storage with no tables.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Declare a table keyed by `key_attributes`.
    pub fn with_table<I, S>(mut self, name: impl Into<String>, key_attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables
            .get_mut()
            .insert(name.into(), Table::new(key_attributes));
        self
    }

    /// Declare a table on storage that is already shared.
    pub async fn create_table<I, S>(&self, name: impl Into<String>, key_attributes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables
            .write()
            .await
            .insert(name.into(), Table::new(key_attributes));
    }

    /// Number of items in `table`, or `None` if it doesn't exist.
    pub async fn item_count(&self, table: &str) -> Option<usize> {
        self.tables.read().await.get(table).map(|t| t.items.len())
    }
}

fn table_name(params: &Params) -> Result<&str, StorageError> {
    params
        .get("TableName")
        .and_then(Value::as_str)
        .ok_or_else(|| StorageError::Validation("missing parameter TableName".to_string()))
}

fn object_param<'a>(params: &'a Params, name: &str) -> Result<&'a Params, StorageError> {
    match params.get(name) {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(StorageError::Validation(format!(
            "parameter {name} must be a mapping"
        ))),
        None => Err(StorageError::Validation(format!("missing parameter {name}"))),
    }
}

#[derive(Debug, Deserialize)]
struct WireUpdate {
    #[serde(rename = "Value", default)]
    value: Option<Value>,
    #[serde(rename = "Action", default)]
    action: Option<String>,
}

fn tagged_number(value: &Value) -> Option<&str> {
    value.get("N").and_then(Value::as_str)
}

fn add_numbers(current: &str, delta: &str) -> Result<String, StorageError> {
    if let (Ok(a), Ok(b)) = (current.parse::<i64>(), delta.parse::<i64>()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(sum.to_string());
        }
    }
    let parse = |s: &str| {
        s.parse::<f64>()
            .map_err(|_| StorageError::Validation(format!("invalid number: {s}")))
    };
    let sum = parse(current)? + parse(delta)?;
    serde_json::Number::from_f64(sum)
        .map(|n| n.to_string())
        .ok_or_else(|| StorageError::Validation("number out of range".to_string()))
}

/// Apply `ADD` of `delta` to the attribute `name` of `item`.
fn apply_add(item: &mut Params, name: &str, delta: Value) -> Result<(), StorageError> {
    let mismatch = || {
        StorageError::Validation(format!(
            "ADD on {name} requires number or list operands of the same type"
        ))
    };
    let Some(current) = item.get_mut(name) else {
        let addable =
            tagged_number(&delta).is_some() || delta.get("L").is_some_and(Value::is_array);
        if !addable {
            return Err(mismatch());
        }
        item.insert(name.to_string(), delta);
        return Ok(());
    };
    if let (Some(a), Some(b)) = (tagged_number(current), tagged_number(&delta)) {
        *current = json!({ "N": add_numbers(a, b)? });
        return Ok(());
    }
    match (current.get_mut("L"), delta.get("L")) {
        (Some(Value::Array(existing)), Some(Value::Array(extra))) => {
            existing.extend(extra.iter().cloned());
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

#[async_trait]
impl StorageClient for InMemoryStorage {
    async fn put_item(&self, params: Params) -> Result<Value, StorageError> {
        let name = table_name(&params)?;
        let item = object_param(&params, "Item")?;

        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(name)
            .ok_or_else(|| StorageError::ResourceNotFound(name.to_string()))?;
        let key = table.key_of(item)?;
        match table.position(&key) {
            Some(index) => table.items[index] = item.clone(),
            None => table.items.push(item.clone()),
        }
        tracing::debug!(table = %name, "put item");
        Ok(json!({}))
    }

    async fn get_item(&self, params: Params) -> Result<Value, StorageError> {
        let name = table_name(&params)?;
        let key = object_param(&params, "Key")?;

        let tables = self.tables.read().await;
        let table = tables
            .get(name)
            .ok_or_else(|| StorageError::ResourceNotFound(name.to_string()))?;
        let key = table.lookup_key(key)?;
        Ok(match table.position(&key) {
            Some(index) => json!({ "Item": table.items[index] }),
            None => json!({}),
        })
    }

    async fn update_item(&self, params: Params) -> Result<Value, StorageError> {
        let name = table_name(&params)?;
        let key_param = object_param(&params, "Key")?;
        let updates: IndexMap<String, WireUpdate> = match params.get("AttributeUpdates") {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| StorageError::Validation(format!("invalid AttributeUpdates: {e}")))?,
            None => IndexMap::new(),
        };

        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(name)
            .ok_or_else(|| StorageError::ResourceNotFound(name.to_string()))?;
        let key = table.lookup_key(key_param)?;

        let mut item = match table.position(&key) {
            Some(index) => table.items[index].clone(),
            None => key_param.clone(),
        };
        for (attribute, update) in updates {
            if table.key_attributes.contains(&attribute) {
                return Err(StorageError::Validation(format!(
                    "cannot update key attribute {attribute}"
                )));
            }
            let action = update.action.as_deref().unwrap_or("PUT");
            match (action, update.value) {
                ("PUT", Some(value)) => {
                    item.insert(attribute, value);
                }
                ("ADD", Some(value)) => apply_add(&mut item, &attribute, value)?,
                // There are no set types, so DELETE always removes the whole
                // attribute and any supplied value is ignored.
                ("DELETE", _) => {
                    item.shift_remove(&attribute);
                }
                ("PUT" | "ADD", None) => {
                    return Err(StorageError::Validation(format!(
                        "{action} on {attribute} requires a value"
                    )));
                }
                (other, _) => {
                    return Err(StorageError::Validation(format!(
                        "unknown update action {other}"
                    )));
                }
            }
        }

        match table.position(&key) {
            Some(index) => table.items[index] = item.clone(),
            None => table.items.push(item.clone()),
        }
        tracing::debug!(table = %name, "updated item");

        let return_all = params.get("ReturnValues").and_then(Value::as_str) == Some("ALL_NEW");
        Ok(if return_all {
            json!({ "Attributes": item })
        } else {
            json!({})
        })
    }

    async fn delete_item(&self, params: Params) -> Result<Value, StorageError> {
        let name = table_name(&params)?;
        let key = object_param(&params, "Key")?;

        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(name)
            .ok_or_else(|| StorageError::ResourceNotFound(name.to_string()))?;
        let key = table.lookup_key(key)?;
        if let Some(index) = table.position(&key) {
            table.items.remove(index);
        }
        Ok(json!({}))
    }

    async fn scan(&self, params: Params) -> Result<Value, StorageError> {
        let name = table_name(&params)?;
        let limit = params
            .get("Limit")
            .and_then(Value::as_u64)
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

        let tables = self.tables.read().await;
        let table = tables
            .get(name)
            .ok_or_else(|| StorageError::ResourceNotFound(name.to_string()))?;
        let items: Vec<&Params> = table.items.iter().take(limit).collect();
        Ok(json!({
            "Items": items,
            "Count": items.len(),
            "ScannedCount": items.len(),
        }))
    }
}
