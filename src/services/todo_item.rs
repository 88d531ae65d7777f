//! Todo item service

use crate::db::repositories::TodoItemRepository;
use crate::models::{CreateTodoItemInput, ListParams, PagedResult, TodoItem, UpdateTodoItemInput};
use crate::services::validation::check_length;
use anyhow::Context;
use std::sync::Arc;

const TITLE_MIN_LEN: usize = 3;
const TITLE_MAX_LEN: usize = 255;
const DEFAULT_PER_PAGE: u32 = 10;

/// Error types for todo item service operations
#[derive(Debug, thiserror::Error)]
pub enum TodoItemServiceError {
    #[error("Todo item not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct TodoItemService {
    repo: Arc<dyn TodoItemRepository>,
    per_page: u32,
}

impl TodoItemService {
    pub fn new(repo: Arc<dyn TodoItemRepository>) -> Self {
        Self {
            repo,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub async fn create(
        &self,
        author_id: i64,
        title: &str,
        completed: bool,
    ) -> Result<TodoItem, TodoItemServiceError> {
        let title = validate_title(title)?;
        let input = CreateTodoItemInput::new(author_id, title).completed(completed);

        let item = self
            .repo
            .create(&input)
            .await
            .context("Failed to create todo item")?;

        Ok(item)
    }

    pub async fn get(&self, id: i64) -> Result<Option<TodoItem>, TodoItemServiceError> {
        let item = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get todo item")?;

        Ok(item)
    }

    pub async fn update(
        &self,
        id: i64,
        title: &str,
        completed: bool,
    ) -> Result<TodoItem, TodoItemServiceError> {
        let title = validate_title(title)?;
        if self.get(id).await?.is_none() {
            return Err(TodoItemServiceError::NotFound(id));
        }

        let item = self
            .repo
            .update(id, &UpdateTodoItemInput::new(title, completed))
            .await
            .context("Failed to update todo item")?;

        Ok(item)
    }

    pub async fn delete(&self, id: i64) -> Result<(), TodoItemServiceError> {
        if self.get(id).await?.is_none() {
            return Err(TodoItemServiceError::NotFound(id));
        }

        self.repo
            .delete(id)
            .await
            .context("Failed to delete todo item")?;

        Ok(())
    }

    /// One page of the author's todo items, by title
    pub async fn paginated_list(
        &self,
        author_id: i64,
        page: u32,
    ) -> Result<PagedResult<TodoItem>, TodoItemServiceError> {
        let params = ListParams::new(page, self.per_page);

        let items = self
            .repo
            .list_by_author(author_id, &params)
            .await
            .context("Failed to list todo items")?;
        let total = self
            .repo
            .count_by_author(author_id)
            .await
            .context("Failed to count todo items")?;

        Ok(PagedResult::new(items, total, &params))
    }
}

fn validate_title(title: &str) -> Result<String, TodoItemServiceError> {
    check_length("Title", title, TITLE_MIN_LEN, TITLE_MAX_LEN)
        .map_err(TodoItemServiceError::ValidationError)
}
