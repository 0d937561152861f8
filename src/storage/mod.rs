pub mod pointer;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context as _, Result};
use sqlite::Sqlite;
use thiserror::Error;

use crate::{
    config::{Configuration, current_context_path, database_path},
    models::{Context, ContextId, Message, Pagination, PromptEntry, Range},
};

pub use pointer::CurrentContext;

/// Typed failures of the store. Absence of a row is reported as `None` by the
/// lookup operations and never through this type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Context {0} not found.")]
    ContextNotFound(ContextId),

    #[error("context {0} does not exist, refusing to write messages")]
    MissingContext(ContextId),
}

/// Persistence of contexts, their messages and the current context pointer.
///
/// Every operation runs in its own transaction: writes touching several rows
/// are applied completely or not at all.
#[async_trait]
pub trait Storage {
    async fn create_context(&self, title: &str, messages: &[PromptEntry]) -> Result<Context>;
    async fn get_context(&self, id: ContextId) -> Result<Option<Context>>;
    async fn get_latest_context(&self) -> Result<Option<Context>>;
    async fn get_contexts(&self, page: Pagination) -> Result<Vec<Context>>;
    async fn get_contexts_in_range(&self, range: Range) -> Result<Vec<Context>>;
    async fn search_contexts(&self, text: &str, page: Pagination) -> Result<Vec<Context>>;
    async fn rename_context(&self, id: ContextId, title: &str) -> Result<Context>;
    async fn delete_context(&self, id: ContextId) -> Result<Option<Context>>;

    async fn add_message(&self, context_id: ContextId, message: PromptEntry) -> Result<Message>;
    async fn add_messages(
        &self,
        context_id: ContextId,
        messages: &[PromptEntry],
    ) -> Result<Vec<Message>>;
    async fn get_messages(&self, context_id: ContextId, page: Pagination) -> Result<Vec<Message>>;
    async fn delete_last_message(&self, context_id: ContextId) -> Result<Option<Message>>;

    async fn current_context_id(&self) -> Result<Option<ContextId>>;
    async fn set_current_context(&self, id: ContextId) -> Result<()>;
    async fn clear_current_context(&self) -> Result<()>;
}

pub type ArcStorage = Arc<dyn Storage + Send + Sync>;

pub async fn new_storage(config: &Configuration) -> Result<ArcStorage> {
    let db_path = database_path(config).wrap_err("resolving database path")?;
    let pointer_path = current_context_path(config).wrap_err("resolving pointer path")?;

    crate::config::init_parent_dir(&db_path)?;
    crate::config::init_parent_dir(&pointer_path)?;

    log::debug!("Opening context database at {}", db_path);
    let storage = Sqlite::new(Some(&db_path))
        .await?
        .with_pointer(CurrentContext::file(pointer_path));
    Ok(Arc::new(storage))
}
