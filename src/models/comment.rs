//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntryKind;

/// The entry a comment hangs off. Exactly one of `comments.post_id` and
/// `comments.note_id` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum CommentTarget {
    Post(i64),
    Note(i64),
}

impl CommentTarget {
    pub fn for_entry(kind: EntryKind, id: i64) -> Self {
        match kind {
            EntryKind::Post => CommentTarget::Post(id),
            EntryKind::Note => CommentTarget::Note(id),
        }
    }

    pub fn kind(self) -> EntryKind {
        match self {
            CommentTarget::Post(_) => EntryKind::Post,
            CommentTarget::Note(_) => EntryKind::Note,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            CommentTarget::Post(id) | CommentTarget::Note(id) => id,
        }
    }

    /// Split into the `(post_id, note_id)` column pair
    pub fn columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            CommentTarget::Post(id) => (Some(id), None),
            CommentTarget::Note(id) => (None, Some(id)),
        }
    }

    /// Rebuild from the `(post_id, note_id)` column pair
    pub fn from_columns(post_id: Option<i64>, note_id: Option<i64>) -> Option<Self> {
        match (post_id, note_id) {
            (Some(id), None) => Some(CommentTarget::Post(id)),
            (None, Some(id)) => Some(CommentTarget::Note(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub target: CommentTarget,
    pub user_id: i64,
    /// Email of the commenting user, joined in for display
    pub author_email: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    pub target: CommentTarget,
    pub user_id: i64,
    pub content: String,
}

impl CreateCommentInput {
    pub fn new(target: CommentTarget, user_id: i64, content: impl Into<String>) -> Self {
        Self {
            target,
            user_id,
            content: content.into(),
        }
    }
}
