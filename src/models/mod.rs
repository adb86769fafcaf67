//! Platform records and pagination tokens
//!
//! Notes and comments are decoded from API payloads but keep the raw JSON so
//! the sink can store fields the crawler does not interpret.

mod comment;
mod cursor;
mod note;
mod search;
mod task;

pub use comment::{Comment, CommentAuthor, CommentPage};
pub use cursor::{Cursor, CursorScope};
pub use note::{parse_count, InteractInfo, Note, NoteAuthor};
pub use search::{SearchPage, SearchQuery};
pub use task::{CrawlTask, OperationKind};
