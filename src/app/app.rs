#[cfg(test)]
#[path = "app_test.rs"]
mod tests;

use std::io::Write;

use eyre::{Context as _, Result};
use tokio::sync::mpsc;

use crate::{
    backend::ArcBackend,
    config::{Profile, constants::DEFAULT_MODEL},
    models::{
        BackendPrompt, Context, ContextId, Message, Pagination, PromptEntry, Range, Role,
        default_title,
    },
    storage::{ArcStorage, StorageError},
};

use super::render::{self, Table};

const SUMMARY_MESSAGES: usize = 3;
const SUMMARY_LINES: usize = 5;

/// Which context a command operates on.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Create a context, seeded with the profile prompt, and make it current.
    New(String),
    /// An explicit context id.
    Id(ContextId),
    /// The current context, falling back to the latest one, and creating a
    /// fresh context when the store is empty.
    Current,
}

/// Per request completion settings overriding the profile.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

pub struct App {
    storage: ArcStorage,
    backend: ArcBackend,
    profile: Profile,
}

impl App {
    pub fn new(storage: ArcStorage, backend: ArcBackend, profile: Profile) -> Self {
        Self {
            storage,
            backend,
            profile,
        }
    }

    pub async fn list_contexts(&self, range: Range, out: &mut impl Write) -> Result<()> {
        let contexts = self
            .storage
            .get_contexts_in_range(range)
            .await
            .wrap_err("listing contexts")?;

        let mut table = Table::new(&["ID", "Title", "Summary", "Created At"]);
        for context in contexts {
            let messages = self
                .storage
                .get_messages(
                    context.id(),
                    Pagination::default().with_limit(SUMMARY_MESSAGES),
                )
                .await
                .wrap_err(format!("getting messages of context {}", context.id()))?;

            table.add_row(vec![
                context.id().to_string(),
                context.title().to_string(),
                render::summary(&messages, SUMMARY_LINES),
                render::format_time(context.created_at()),
            ]);
        }
        table.write_to(out)
    }

    pub async fn search_contexts(&self, query: &str, out: &mut impl Write) -> Result<()> {
        let contexts = self
            .storage
            .search_contexts(query, Pagination::default())
            .await
            .wrap_err("searching contexts")?;

        let mut table = Table::new(&["ID", "Title", "Messages", "Created At"]);
        for context in contexts {
            let messages = self
                .storage
                .get_messages(context.id(), Pagination::default())
                .await
                .wrap_err(format!("getting messages of context {}", context.id()))?;

            let matches = messages
                .iter()
                .filter(|m| !m.content().is_empty())
                .filter_map(|m| {
                    render::snippet(m.content(), query)
                        .map(|snippet| format!("- {}: {}", m.role(), snippet))
                })
                .collect::<Vec<_>>();

            table.add_row(vec![
                context.id().to_string(),
                context.title().to_string(),
                matches.join("\n"),
                render::format_time(context.created_at()),
            ]);
        }
        table.write_to(out)
    }

    pub async fn switch_context(&self, id: ContextId) -> Result<Context> {
        let context = self.get_context(id).await?;
        self.storage
            .set_current_context(id)
            .await
            .wrap_err("updating current context")?;
        log::debug!("Switched to context {}", id);
        Ok(context)
    }

    /// Deletes every listed context and returns the ids that did not exist.
    pub async fn delete_contexts(&self, ids: &[ContextId]) -> Result<Vec<ContextId>> {
        let mut missing = Vec::new();
        for id in ids {
            let deleted = self
                .storage
                .delete_context(*id)
                .await
                .wrap_err(format!("deleting context {}", id))?;
            if deleted.is_none() {
                missing.push(*id);
            }
        }
        Ok(missing)
    }

    pub async fn resolve_context(&self, target: Target) -> Result<Context> {
        match target {
            Target::New(title) => {
                let title = if title.is_empty() {
                    default_title()
                } else {
                    title
                };
                let context = self
                    .storage
                    .create_context(&title, &self.profile.prompt)
                    .await
                    .wrap_err("creating context")?;
                self.storage
                    .set_current_context(context.id())
                    .await
                    .wrap_err("updating current context")?;
                Ok(context)
            }
            Target::Id(id) => self.get_context(id).await,
            Target::Current => {
                let current = self
                    .storage
                    .current_context_id()
                    .await
                    .wrap_err("reading current context")?;
                if let Some(id) = current {
                    return self.get_context(id).await;
                }

                let latest = self
                    .storage
                    .get_latest_context()
                    .await
                    .wrap_err("getting latest context")?;
                if let Some(context) = latest {
                    return Ok(context);
                }

                log::debug!("No context found, creating one");
                self.storage
                    .create_context(&default_title(), &[])
                    .await
                    .wrap_err("creating context")
            }
        }
    }

    pub async fn show_history(&self, context: &Context, out: &mut impl Write) -> Result<()> {
        let messages = self.messages(context.id()).await?;
        render::write_history(out, context, &messages)
    }

    pub async fn rename_context(&self, context: &Context, title: &str) -> Result<Context> {
        self.storage
            .rename_context(context.id(), title)
            .await
            .wrap_err(format!("renaming context {}", context.id()))
    }

    /// Removes messages from the end of the context until a user message has
    /// been removed. Returns the removed messages, newest first.
    pub async fn undo(&self, context: &Context) -> Result<Vec<Message>> {
        let mut removed = Vec::new();
        while let Some(message) = self
            .storage
            .delete_last_message(context.id())
            .await
            .wrap_err(format!("deleting last message of context {}", context.id()))?
        {
            let is_user = *message.role() == Role::User;
            removed.push(message);
            if is_user {
                break;
            }
        }
        Ok(removed)
    }

    pub async fn delete_context(&self, context: &Context) -> Result<()> {
        self.storage
            .delete_context(context.id())
            .await
            .wrap_err(format!("deleting context {}", context.id()))?;
        Ok(())
    }

    /// Sends the stored conversation plus `text` to the backend, streams the
    /// answer to `out` and stores the exchange. Nothing is stored when the
    /// completion fails.
    pub async fn ask(
        &self,
        context: &Context,
        text: &str,
        options: &AskOptions,
        out: &mut impl Write,
    ) -> Result<Vec<Message>> {
        let mut entries = self
            .messages(context.id())
            .await?
            .iter()
            .map(Message::to_prompt_entry)
            .collect::<Vec<_>>();

        let question = PromptEntry::user(text);
        entries.push(question.clone());

        let model = options
            .model
            .as_deref()
            .or(self.profile.model.as_deref())
            .unwrap_or(DEFAULT_MODEL);
        let prompt = BackendPrompt::new(entries)
            .with_model(model)
            .with_temperature(options.temperature.or(self.profile.temperature));

        log::debug!(
            "Asking {} with {} messages from context {}",
            model,
            prompt.messages().len(),
            context.id()
        );

        let (response_tx, mut response_rx) = mpsc::unbounded_channel();
        let completion = self.backend.get_completion(prompt, response_tx);
        let receive = async {
            let mut answer = String::new();
            while let Some(response) = response_rx.recv().await {
                out.write_all(response.text.as_bytes())?;
                out.flush()?;
                answer.push_str(&response.text);
                if response.done {
                    break;
                }
            }
            writeln!(out)?;
            Ok::<_, eyre::Report>(answer)
        };

        let (completion, answer) = tokio::join!(completion, receive);
        completion.wrap_err("getting completion")?;
        let answer = answer.wrap_err("writing completion")?;

        self.storage
            .add_messages(context.id(), &[question, PromptEntry::assistant(answer)])
            .await
            .wrap_err(format!("storing messages of context {}", context.id()))
    }

    async fn get_context(&self, id: ContextId) -> Result<Context> {
        self.storage
            .get_context(id)
            .await
            .wrap_err(format!("getting context {}", id))?
            .ok_or_else(|| StorageError::ContextNotFound(id).into())
    }

    async fn messages(&self, id: ContextId) -> Result<Vec<Message>> {
        self.storage
            .get_messages(id, Pagination::default())
            .await
            .wrap_err(format!("getting messages of context {}", id))
    }
}
