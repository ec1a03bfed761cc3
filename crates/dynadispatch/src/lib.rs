//! Dynadispatch: request dispatch for key-value document storage
//!
//! Dynadispatch turns a generic operation request into calls against a
//! key-value document storage service, converting items between their plain
//! JSON form and the service's type-tagged attribute-value form.
//!
//! The tagging core ([`tag_item`], [`tag_updates`]) is pure and has no I/O.
//! The [`Dispatcher`] sits on top of it and talks to any [`StorageClient`].

mod client;
mod config;
mod dispatcher;
mod memory;
mod tagger;
mod updates;
mod value;

pub use client::{Params, StorageClient, StorageError};
pub use config::{ConfigError, DEFAULT_MAX_DEPTH, DispatchConfig};
pub use dispatcher::{DispatchError, Dispatcher, Event, Operation, Response};
pub use memory::InMemoryStorage;
pub use tagger::{ListTagging, TagError, TagOptions, tag_item, tag_item_with, tag_value};
pub use updates::{
    DEFAULT_ACTION, TaggedUpdate, TaggedUpdateSpec, UpdateEntry, UpdateSpec, tag_updates,
    tag_updates_with,
};
pub use value::{AttributeValue, ListElement, PlainItem, TaggedItem, json_type_name};
