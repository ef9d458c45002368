//! Resource gateway seam: the hosted backend the board talks to.
//!
//! The trait exposes generic CRUD over the four remote collections plus the
//! object-storage upload used for post media. Payloads cross the seam as JSON
//! values; the typed models in `crate::model` live above it. `RestGateway`
//! speaks to the hosted service, `MemoryGateway` backs the test suite.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppResult;

mod memory;
mod rest;

pub use memory::MemoryGateway;
pub use rest::RestGateway;

/// Remote collections the client touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Posts,
    Comments,
    PostFlags,
    UserPreferences,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Posts => "posts",
            Collection::Comments => "comments",
            Collection::PostFlags => "post_flags",
            Collection::UserPreferences => "user_preferences",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality filters applied to a read, column by column.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub eq: Vec<(String, String)>,
}

impl Filter {
    pub fn none() -> Self { Self::default() }

    pub fn by(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self { eq: vec![(column.into(), value.into())] }
    }

    pub fn and(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.eq.push((column.into(), value.into()));
        self
    }
}

/// Sort order for a read.
#[derive(Debug, Clone)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), ascending: true }
    }
    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), ascending: false }
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Insert a record; the gateway assigns `id` and `created_at` and returns
    /// the stored representation.
    async fn create(&self, collection: Collection, fields: Value) -> AppResult<Value>;

    /// Read records matching `filter`, optionally ordered.
    async fn read(&self, collection: Collection, filter: Filter, order: Option<Order>) -> AppResult<Vec<Value>>;

    /// Read a single record by id; `NotFound` when absent.
    async fn read_one(&self, collection: Collection, id: &str) -> AppResult<Value>;

    /// Patch fields on a record by id, returning the updated representation.
    async fn update(&self, collection: Collection, id: &str, fields: Value) -> AppResult<Value>;

    /// Delete a record by id. Deleting an absent record is not an error.
    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()>;

    /// Insert-or-replace keyed on `key_column` (preferences upsert).
    async fn upsert(&self, collection: Collection, key_column: &str, fields: Value) -> AppResult<Value>;

    /// Store a media object under `name`, returning its public URL. Callers
    /// validate type and size first; the gateway performs no checks.
    async fn upload_media(&self, name: &str, content_type: &str, bytes: Vec<u8>) -> AppResult<String>;
}
