#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::{Context as _, Result, eyre};
use tokio_rusqlite::{Connection, OpenFlags, Row, ToSql, Transaction, named_params, params};

use crate::{
    models::{Context, ContextId, Message, Pagination, PromptEntry, Range},
    storage::{CurrentContext, Storage, StorageError},
};

use super::migration::MIGRATION;

type DbResult<T> = std::result::Result<T, tokio_rusqlite::Error>;

const CONTEXT_COLUMNS: &str = "id, title, created_at";
const MESSAGE_COLUMNS: &str = "id, context_id, role, content, created_at, updated_at";

pub struct Sqlite {
    conn: Connection,
    current: CurrentContext,
}

impl Sqlite {
    /// Opens (or creates) the database at `path`, or an in-memory database
    /// when `path` is `None`, and applies the schema.
    pub async fn new(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            )
            .await
            .wrap_err(format!("opening database path: {}", path))?,
            None => Connection::open_in_memory()
                .await
                .wrap_err("opening in-memory database")?,
        };

        let ret = Self {
            conn,
            current: CurrentContext::default(),
        };
        ret.run_migration().await.wrap_err("running migration")?;
        Ok(ret)
    }

    pub fn with_pointer(mut self, current: CurrentContext) -> Self {
        self.current = current;
        self
    }

    async fn run_migration(&self) -> Result<()> {
        self.conn
            .call(|conn| Ok(conn.execute_batch(MIGRATION)?))
            .await
            .wrap_err("executing migration")?;
        Ok(())
    }
}

#[async_trait]
impl Storage for Sqlite {
    async fn create_context(&self, title: &str, messages: &[PromptEntry]) -> Result<Context> {
        let title = title.to_string();
        let messages = messages.to_vec();
        let context = self
            .conn
            .call(move |conn| {
                let now = now_nanos()?;
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO contexts (title, created_at) VALUES (:title, :created_at)",
                    named_params! {
                        ":title": title,
                        ":created_at": now,
                    },
                )?;
                let id = ContextId::new(tx.last_insert_rowid());
                insert_messages(&tx, id, &messages, now)?;
                tx.commit()?;
                Ok(Context::new(id, title).with_created_at(from_nanos(now)))
            })
            .await
            .wrap_err("creating context")?;

        log::debug!("Created context {} ({})", context.id(), context.title());
        Ok(context)
    }

    async fn get_context(&self, id: ContextId) -> Result<Option<Context>> {
        let context = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let context = select_context(&tx, id)?;
                tx.commit()?;
                Ok(context)
            })
            .await
            .wrap_err(format!("getting context {}", id))?;
        Ok(context)
    }

    async fn get_latest_context(&self) -> Result<Option<Context>> {
        let contexts = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let contexts = select_contexts(
                    &tx,
                    &format!(
                        r#"SELECT {CONTEXT_COLUMNS} FROM contexts
                ORDER BY created_at DESC, id DESC
                LIMIT 1"#
                    ),
                    &[],
                )?;
                tx.commit()?;
                Ok(contexts)
            })
            .await
            .wrap_err("getting latest context")?;
        Ok(contexts.into_iter().next())
    }

    async fn get_contexts(&self, page: Pagination) -> Result<Vec<Context>> {
        let contexts = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let contexts = select_context_page(&tx, page)?;
                tx.commit()?;
                Ok(contexts)
            })
            .await
            .wrap_err("listing contexts")?;
        Ok(contexts)
    }

    async fn get_contexts_in_range(&self, range: Range) -> Result<Vec<Context>> {
        let contexts = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let count: i64 =
                    tx.query_row("SELECT COUNT(*) FROM contexts", [], |row| row.get(0))?;
                let page = range.resolve(count.max(0) as usize);
                let contexts = select_context_page(&tx, page)?;
                tx.commit()?;
                Ok(contexts)
            })
            .await
            .wrap_err("listing contexts in range")?;
        Ok(contexts)
    }

    async fn search_contexts(&self, text: &str, page: Pagination) -> Result<Vec<Context>> {
        let text = text.to_string();
        let contexts = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let (limit, offset) = page_to_params(page);
                // instr keeps the match literal and case-sensitive, unlike LIKE
                let contexts = select_contexts(
                    &tx,
                    &format!(
                        r#"SELECT {CONTEXT_COLUMNS} FROM contexts
                WHERE EXISTS (
                    SELECT 1 FROM messages
                    WHERE messages.context_id = contexts.id
                    AND (:text = '' OR instr(messages.content, :text) > 0)
                )
                ORDER BY created_at, id
                LIMIT :limit OFFSET :offset"#
                    ),
                    named_params! {
                        ":text": text,
                        ":limit": limit,
                        ":offset": offset,
                    },
                )?;
                tx.commit()?;
                Ok(contexts)
            })
            .await
            .wrap_err("searching contexts")?;
        Ok(contexts)
    }

    async fn rename_context(&self, id: ContextId, title: &str) -> Result<Context> {
        let title = title.to_string();
        let context = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let affected_rows = tx.execute(
                    "UPDATE contexts SET title = :title WHERE id = :id",
                    named_params! {
                        ":title": title,
                        ":id": id.value(),
                    },
                )?;
                if affected_rows == 0 {
                    return Ok(None);
                }
                let context = select_context(&tx, id)?;
                tx.commit()?;
                Ok(context)
            })
            .await
            .wrap_err(format!("renaming context {}", id))?;

        let context = context.ok_or(StorageError::ContextNotFound(id))?;
        log::debug!("Renamed context {} to {}", id, context.title());
        Ok(context)
    }

    async fn delete_context(&self, id: ContextId) -> Result<Option<Context>> {
        let context = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let Some(context) = select_context(&tx, id)? else {
                    return Ok(None);
                };
                tx.execute(
                    "DELETE FROM messages WHERE context_id = ?",
                    params![id.value()],
                )?;
                tx.execute("DELETE FROM contexts WHERE id = ?", params![id.value()])?;
                tx.commit()?;
                Ok(Some(context))
            })
            .await
            .wrap_err(format!("deleting context {}", id))?;

        if context.is_some() {
            log::debug!("Deleted context {}", id);
            if self.current.get().await? == Some(id) {
                self.current
                    .clear()
                    .await
                    .wrap_err("clearing current context")?;
            }
        }
        Ok(context)
    }

    async fn add_message(&self, context_id: ContextId, message: PromptEntry) -> Result<Message> {
        self.add_messages(context_id, &[message])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| eyre!("message was not stored in context {}", context_id))
    }

    async fn add_messages(
        &self,
        context_id: ContextId,
        messages: &[PromptEntry],
    ) -> Result<Vec<Message>> {
        let messages = messages.to_vec();
        let stored = self
            .conn
            .call(move |conn| {
                let now = now_nanos()?;
                let tx = conn.transaction()?;
                if select_context(&tx, context_id)?.is_none() {
                    return Ok(None);
                }
                let stored = insert_messages(&tx, context_id, &messages, now)?;
                tx.commit()?;
                Ok(Some(stored))
            })
            .await
            .wrap_err(format!("adding messages to context {}", context_id))?;

        let stored = stored.ok_or(StorageError::MissingContext(context_id))?;
        log::debug!("Added {} messages to context {}", stored.len(), context_id);
        Ok(stored)
    }

    async fn get_messages(&self, context_id: ContextId, page: Pagination) -> Result<Vec<Message>> {
        let messages = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let (limit, offset) = page_to_params(page);
                let messages = select_messages(
                    &tx,
                    &format!(
                        r#"SELECT {MESSAGE_COLUMNS} FROM messages
                WHERE context_id = :context_id
                ORDER BY created_at, id
                LIMIT :limit OFFSET :offset"#
                    ),
                    named_params! {
                        ":context_id": context_id.value(),
                        ":limit": limit,
                        ":offset": offset,
                    },
                )?;
                tx.commit()?;
                Ok(messages)
            })
            .await
            .wrap_err(format!("getting messages of context {}", context_id))?;
        Ok(messages)
    }

    async fn delete_last_message(&self, context_id: ContextId) -> Result<Option<Message>> {
        let message = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let message = select_messages(
                    &tx,
                    &format!(
                        r#"SELECT {MESSAGE_COLUMNS} FROM messages
                WHERE context_id = :context_id
                ORDER BY created_at DESC, id DESC
                LIMIT 1"#
                    ),
                    named_params! { ":context_id": context_id.value() },
                )?
                .into_iter()
                .next();

                if let Some(message) = &message {
                    tx.execute("DELETE FROM messages WHERE id = ?", params![message.id()])?;
                }
                tx.commit()?;
                Ok(message)
            })
            .await
            .wrap_err(format!("deleting last message of context {}", context_id))?;

        if let Some(message) = &message {
            log::debug!(
                "Deleted {} message {} from context {}",
                message.role(),
                message.id(),
                context_id
            );
        }
        Ok(message)
    }

    async fn current_context_id(&self) -> Result<Option<ContextId>> {
        self.current.get().await
    }

    async fn set_current_context(&self, id: ContextId) -> Result<()> {
        self.current.set(id).await
    }

    async fn clear_current_context(&self) -> Result<()> {
        self.current.clear().await
    }
}

fn page_to_params(page: Pagination) -> (i64, i64) {
    // a negative LIMIT means no limit in SQLite
    let limit = page.limit().map(|l| l as i64).unwrap_or(-1);
    let offset = page.offset().unwrap_or(0) as i64;
    (limit, offset)
}

fn select_context_page(tx: &Transaction<'_>, page: Pagination) -> DbResult<Vec<Context>> {
    let (limit, offset) = page_to_params(page);
    select_contexts(
        tx,
        &format!(
            r#"SELECT {CONTEXT_COLUMNS} FROM contexts
            ORDER BY created_at, id
            LIMIT :limit OFFSET :offset"#
        ),
        named_params! {
            ":limit": limit,
            ":offset": offset,
        },
    )
}

fn select_context(tx: &Transaction<'_>, id: ContextId) -> DbResult<Option<Context>> {
    let contexts = select_contexts(
        tx,
        &format!("SELECT {CONTEXT_COLUMNS} FROM contexts WHERE id = :id"),
        named_params! { ":id": id.value() },
    )?;
    Ok(contexts.into_iter().next())
}

fn select_contexts(
    tx: &Transaction<'_>,
    query: &str,
    params: &[(&str, &dyn ToSql)],
) -> DbResult<Vec<Context>> {
    let mut stmt = tx.prepare(query)?;
    let mut rows = stmt.query(params)?;

    let mut contexts = vec![];
    while let Some(row) = rows.next()? {
        contexts.push(context_from_row(row)?);
    }
    Ok(contexts)
}

fn select_messages(
    tx: &Transaction<'_>,
    query: &str,
    params: &[(&str, &dyn ToSql)],
) -> DbResult<Vec<Message>> {
    let mut stmt = tx.prepare(query)?;
    let mut rows = stmt.query(params)?;

    let mut messages = vec![];
    while let Some(row) = rows.next()? {
        messages.push(message_from_row(row)?);
    }
    Ok(messages)
}

fn insert_messages(
    tx: &Transaction<'_>,
    context_id: ContextId,
    messages: &[PromptEntry],
    created_at: i64,
) -> DbResult<Vec<Message>> {
    let timestamp = from_nanos(created_at);
    let mut stmt = tx.prepare(
        r#"INSERT INTO messages (context_id, role, content, created_at, updated_at)
            VALUES (:context_id, :role, :content, :created_at, :created_at)"#,
    )?;

    let mut stored = Vec::with_capacity(messages.len());
    for message in messages {
        stmt.execute(named_params! {
            ":context_id": context_id.value(),
            ":role": message.role.as_str(),
            ":content": message.content,
            ":created_at": created_at,
        })?;
        stored.push(
            Message::new(context_id, message.role.clone(), message.content.clone())
                .with_id(tx.last_insert_rowid())
                .with_created_at(timestamp),
        );
    }
    Ok(stored)
}

fn context_from_row(row: &Row<'_>) -> DbResult<Context> {
    let id: i64 = row.get(0)?;
    let title: String = row.get(1)?;
    let created_at = from_nanos(row.get(2)?);
    Ok(Context::new(id, title).with_created_at(created_at))
}

fn message_from_row(row: &Row<'_>) -> DbResult<Message> {
    let id: i64 = row.get(0)?;
    let context_id: i64 = row.get(1)?;
    let role: String = row.get(2)?;
    let content: String = row.get(3)?;
    let created_at = from_nanos(row.get(4)?);
    let updated_at = from_nanos(row.get(5)?);

    Ok(Message::new(context_id, role, content)
        .with_id(id)
        .with_created_at(created_at)
        .with_updated_at(updated_at))
}

/// Timestamps are stored as nanoseconds since the epoch.
fn now_nanos() -> DbResult<i64> {
    Utc::now()
        .timestamp_nanos_opt()
        .ok_or_else(|| tokio_rusqlite::Error::Other(eyre!("current time out of range").into()))
}

fn from_nanos(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}
