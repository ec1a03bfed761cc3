//! Storage client trait.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Request parameters for a storage call, already tagged.
///
/// Keys use the storage service's parameter names (`TableName`, `Item`,
/// `Key`, `AttributeUpdates`, ...). Parameters the dispatcher doesn't touch
/// are forwarded as given.
pub type Params = serde_json::Map<String, Value>;

/// Errors reported by the storage service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The table doesn't exist
    #[error("requested resource not found: {0}")]
    ResourceNotFound(String),
    /// The request was rejected as malformed
    #[error("validation error: {0}")]
    Validation(String),
    /// The service failed to process a valid request
    #[error("service error: {0}")]
    Service(String),
}

/// Client for a key-value document storage service.
///
/// Each call takes the full parameter set and returns the service's raw
/// response document.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Create or replace an item.
    async fn put_item(&self, params: Params) -> Result<Value, StorageError>;

    /// Fetch an item by key.
    async fn get_item(&self, params: Params) -> Result<Value, StorageError>;

    /// Apply attribute updates to an item.
    async fn update_item(&self, params: Params) -> Result<Value, StorageError>;

    /// Delete an item by key.
    async fn delete_item(&self, params: Params) -> Result<Value, StorageError>;

    /// Read every item in a table.
    async fn scan(&self, params: Params) -> Result<Value, StorageError>;
}
