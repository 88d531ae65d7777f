//! Category model
//!
//! Categories belong to the user who created them; posts and notes point at
//! exactly one category.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
}

/// Input for creating a category
#[derive(Debug, Clone)]
pub struct CreateCategoryInput {
    pub author_id: i64,
    pub title: String,
}

impl CreateCategoryInput {
    pub fn new(author_id: i64, title: impl Into<String>) -> Self {
        Self {
            author_id,
            title: title.into(),
        }
    }
}
