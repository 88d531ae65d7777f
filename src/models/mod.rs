//! Data models
//!
//! Plain data shared by the repositories, services and web handlers:
//! - database entities (User, Session, Category, Tag, Entry, Comment, TodoItem)
//! - input structs consumed by the services
//! - pagination types

mod category;
mod comment;
mod entry;
mod pagination;
mod session;
mod tag;
mod todo_item;
mod user;

pub use category::{Category, CreateCategoryInput};
pub use comment::{Comment, CommentTarget, CreateCommentInput};
pub use entry::{CreateEntryInput, Entry, EntryFilters, EntryKind, FilterRequest, UpdateEntryInput};
pub use pagination::{ListParams, PagedResult};
pub use session::Session;
pub use tag::Tag;
pub use todo_item::{CreateTodoItemInput, TodoItem, UpdateTodoItemInput};
pub use user::{decode_roles, encode_roles, User, UserRole};
