//! Resource identifiers and operation parameters.
//!
//! # Purpose
//! Wraps resource ids so ownership checks and extractors share one opaque,
//! comparable representation, and defines resource references whose
//! identity ignores metadata.
//!
//! # Key invariants
//! - `ResourceRef` equality and hashing use `(resource_type, id)` only.
//! - `ResourceId` preserves the caller-supplied value exactly.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Operation parameters handed to resource-id extractors.
pub type Params = BTreeMap<String, String>;

/// Opaque, comparable resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for ResourceId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for ResourceId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// Reference to one resource instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    pub resource_type: String,
    pub id: ResourceId,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl ResourceRef {
    pub fn new(resource_type: impl Into<String>, id: impl Into<ResourceId>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Policy object for this instance, `{type}/{id}`, so that `type/*` or
    /// `type/:id` patterns can match it.
    pub fn object(&self) -> String {
        format!("{}/{}", self.resource_type, self.id)
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.resource_type == other.resource_type && self.id == other.id
    }
}

impl Eq for ResourceRef {}

impl Hash for ResourceRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource_type.hash(state);
        self.id.hash(state);
    }
}
