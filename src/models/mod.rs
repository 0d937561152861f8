pub mod backend;
pub mod context;
pub mod message;
pub mod storage;

pub use backend::*;
pub use context::{Context, ContextId, default_title};
pub use message::{Message, PromptEntry, Role};
pub use storage::{Pagination, Range, RangeError};
