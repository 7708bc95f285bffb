//! Shared ids, geometry and page snapshot types for lazyscope.
pub mod dom;
pub mod geometry;
pub mod paint;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use dom::{
    Capabilities, ElementKind, ElementSnapshot, MutationBatch, NetworkInfo, PageSnapshot,
};
pub use geometry::{Rect, Size, Viewport};
pub use paint::PaintEntry;

/// Shared error type for the lazyscope crates.
#[derive(Debug, Error, Clone)]
pub enum LazyscopeError {
    #[error("{message}")]
    Message { message: String },
    #[error("engine inactive")]
    Inactive,
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl LazyscopeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Identity of an element inside the inspected document, stable for the
/// lifetime of that element.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// Classification key of an image record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RecordKey(pub NodeId);

impl From<NodeId> for RecordKey {
    fn from(node: NodeId) -> Self {
        Self(node)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record:{}", self.0 .0)
    }
}

/// Identity of the visual host an overlay renderer attached to a record.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct HostId(pub String);

impl HostId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for HostId {
    fn default() -> Self {
        Self::new()
    }
}

/// One activation cycle of the engine on a page.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}
