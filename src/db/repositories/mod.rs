//! Database repositories
//!
//! One repository per aggregate. Each exposes a trait used by the services
//! and a `Sqlx*Repository` that runs driver-specific SQL.

pub mod category;
pub mod comment;
pub mod entry;
pub mod session;
pub mod tag;
pub mod todo_item;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use entry::{EntryRepository, SqlxEntryRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use todo_item::{SqlxTodoItemRepository, TodoItemRepository};
pub use user::{SqlxUserRepository, UserRepository};
