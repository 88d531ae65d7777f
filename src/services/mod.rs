//! Services layer - business logic
//!
//! Services validate input, apply the ownership rules and coordinate the
//! repositories and the cache. Handlers never talk to repositories directly.

pub mod category;
pub mod comment;
pub mod entry;
pub mod password;
pub mod tag;
pub mod todo_item;
pub mod user;
pub mod validation;
pub mod voter;

pub use category::{CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use entry::{parse_id, EntryDraft, EntryService, EntryServiceError};
pub use password::{hash_password, verify_password};
pub use tag::{TagService, TagServiceError};
pub use todo_item::{TodoItemService, TodoItemServiceError};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
pub use voter::{can_access_owned, can_manage_entry, vote, Permission};
