//! Todo item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Private checklist entry; only its author may see or change it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodoItem {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a todo item
#[derive(Debug, Clone)]
pub struct CreateTodoItemInput {
    pub author_id: i64,
    pub title: String,
    pub completed: bool,
}

impl CreateTodoItemInput {
    pub fn new(author_id: i64, title: impl Into<String>) -> Self {
        Self {
            author_id,
            title: title.into(),
            completed: false,
        }
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

/// Input for updating a todo item
#[derive(Debug, Clone)]
pub struct UpdateTodoItemInput {
    pub title: String,
    pub completed: bool,
}

impl UpdateTodoItemInput {
    pub fn new(title: impl Into<String>, completed: bool) -> Self {
        Self {
            title: title.into(),
            completed,
        }
    }
}
