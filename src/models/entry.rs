//! Post and note model
//!
//! Posts and notes have identical columns and behaviour. They share the
//! `Entry` type; `EntryKind` picks the table, the tag join table and the URL
//! prefix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Category, Tag};

/// Which of the two entry tables a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Post,
    Note,
}

impl EntryKind {
    pub const ALL: [EntryKind; 2] = [EntryKind::Post, EntryKind::Note];

    /// Main table name
    pub fn table(self) -> &'static str {
        match self {
            EntryKind::Post => "posts",
            EntryKind::Note => "notes",
        }
    }

    /// Many-to-many table linking entries to tags
    pub fn tag_table(self) -> &'static str {
        match self {
            EntryKind::Post => "posts_tags",
            EntryKind::Note => "notes_tags",
        }
    }

    /// Foreign key column in the tag table and in `comments`
    pub fn fk_column(self) -> &'static str {
        match self {
            EntryKind::Post => "post_id",
            EntryKind::Note => "note_id",
        }
    }

    /// URL prefix, also used as the template directory variable
    pub fn route_prefix(self) -> &'static str {
        match self {
            EntryKind::Post => "/post",
            EntryKind::Note => "/note",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            EntryKind::Post => "post",
            EntryKind::Note => "note",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Post => "Post",
            EntryKind::Note => "Note",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A post or a note, loaded with its category and tags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: i64,
    pub kind: EntryKind,
    pub title: String,
    pub content: Option<String>,
    pub category: Category,
    pub author_id: i64,
    pub author_email: String,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub fn tag_ids(&self) -> Vec<i64> {
        self.tags.iter().map(|t| t.id).collect()
    }
}

/// Input for creating an entry
#[derive(Debug, Clone)]
pub struct CreateEntryInput {
    pub title: String,
    pub content: Option<String>,
    pub category_id: i64,
    pub author_id: i64,
    pub tag_ids: Vec<i64>,
}

impl CreateEntryInput {
    pub fn new(title: impl Into<String>, category_id: i64, author_id: i64) -> Self {
        Self {
            title: title.into(),
            content: None,
            category_id,
            author_id,
            tag_ids: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = tag_ids;
        self
    }
}

/// Input for updating an entry. Forms always submit every field, so this
/// replaces the title, content, category and tag set wholesale.
#[derive(Debug, Clone)]
pub struct UpdateEntryInput {
    pub title: String,
    pub content: Option<String>,
    pub category_id: i64,
    pub tag_ids: Vec<i64>,
}

impl UpdateEntryInput {
    pub fn new(title: impl Into<String>, category_id: i64) -> Self {
        Self {
            title: title.into(),
            content: None,
            category_id,
            tag_ids: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = tag_ids;
        self
    }
}

/// Unvalidated filter values taken from the query string
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FilterRequest {
    #[serde(default, rename = "filters_category_id")]
    pub category_id: Option<String>,
    #[serde(default, rename = "filters_tag_id")]
    pub tag_id: Option<String>,
}

/// Resolved list filters: only records that exist end up here
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryFilters {
    pub category: Option<Category>,
    pub tag: Option<Tag>,
}

impl EntryFilters {
    pub fn category_id(&self) -> Option<i64> {
        self.category.as_ref().map(|c| c.id)
    }

    pub fn tag_id(&self) -> Option<i64> {
        self.tag.as_ref().map(|t| t.id)
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.tag.is_none()
    }
}
