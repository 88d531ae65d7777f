//! Tag model

use serde::{Deserialize, Serialize};

/// Shared label attached to posts and notes. Tags have no owner; only
/// administrators manage them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub title: String,
}

impl Tag {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}
