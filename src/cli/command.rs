#[cfg(test)]
#[path = "command_test.rs"]
mod tests;

use std::io::Write;

use clap::Parser;
use eyre::{Context, Result, bail};
use tokio::io::AsyncReadExt;

use crate::app::{App, AskOptions, Target};
use crate::config::{
    self, Configuration, constants::DEFAULT_PROFILE, load_configuration, lookup_config_path,
};
use crate::models::{ContextId, Range};
use crate::storage::StorageError;

const STDIN_INPUT: &str = "-";

#[derive(Debug, Parser)]
#[command(
    name = "hey",
    version,
    about,
    long_about = r#"Ask a language model from the terminal, keeping the conversation around

Default configuration file location looks up in the following order:
    * $XDG_CONFIG_HOME/hey/config.toml
    * $HOME/.config/hey/config.toml
    * $HOME/.hey/config.toml
"#,
    disable_version_flag = true
)]
pub struct Command {
    /// Input messages, joined with spaces. A single `-` reads from stdin
    inputs: Vec<String>,

    /// Create a new context, with an optional title
    #[arg(long, value_name = "TITLE", num_args = 0..=1, default_missing_value = "")]
    new: Option<String>,

    /// Context id to use instead of the current one
    #[arg(long, value_name = "ID")]
    context: Option<ContextId>,

    /// Show the messages of the context
    #[arg(long)]
    history: bool,

    /// List contexts, with an optional range such as `-5:`
    #[arg(
        long,
        value_name = "RANGE",
        num_args = 0..=1,
        default_missing_value = ":",
        allow_hyphen_values = true
    )]
    list: Option<String>,

    /// Search contexts by message content
    #[arg(long, value_name = "TEXT")]
    search: Option<String>,

    /// Delete the listed contexts, or the selected one when no id is given
    #[arg(long, value_name = "ID", num_args = 0..)]
    delete: Option<Vec<ContextId>>,

    /// Make a context the current one
    #[arg(long, value_name = "ID")]
    switch: Option<ContextId>,

    /// Remove the last exchange of the context
    #[arg(long)]
    undo: bool,

    /// Rename the context
    #[arg(long, value_name = "TITLE")]
    rename: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Profile name
    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Configuration file path
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Show the version
    #[arg(short, long)]
    version: bool,
}

impl Command {
    pub fn new() -> Command {
        Self::parse()
    }

    pub fn get_config(&self) -> Result<Configuration> {
        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| lookup_config_path().unwrap_or_default());

        if config_path.is_empty() {
            // No config path is specified just use the default config
            return Ok(Configuration::default());
        }
        load_configuration(config_path.as_str()).wrap_err("loading configuration")
    }

    pub fn version(&self) -> bool {
        self.version
    }

    pub fn print_version(&self) {
        println!("{}", config::version())
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub async fn run(&self, app: &App, out: &mut impl Write) -> Result<()> {
        if let Some(range) = &self.list {
            let range = range.parse::<Range>()?;
            return app.list_contexts(range, out).await;
        }

        if let Some(query) = self.search.as_deref().filter(|q| !q.is_empty()) {
            return app.search_contexts(query, out).await;
        }

        if let Some(id) = self.switch {
            app.switch_context(id).await?;
            return Ok(());
        }

        if let Some(ids) = self.delete.as_deref().filter(|ids| !ids.is_empty()) {
            let missing = app.delete_contexts(ids).await?;
            if !missing.is_empty() {
                let message = missing
                    .into_iter()
                    .map(|id| StorageError::ContextNotFound(id).to_string())
                    .collect::<Vec<_>>()
                    .join("\n");
                bail!(message);
            }
            return Ok(());
        }

        let context = app.resolve_context(self.target()).await?;
        log::debug!("Using context {}: {}", context.id(), context.title());

        if self.history {
            return app.show_history(&context, out).await;
        }

        if let Some(title) = &self.rename {
            app.rename_context(&context, title).await?;
            return Ok(());
        }

        if self.undo {
            let removed = app.undo(&context).await?;
            log::debug!(
                "Removed {} messages from context {}",
                removed.len(),
                context.id()
            );
            return Ok(());
        }

        if self.delete.is_some() {
            return app.delete_context(&context).await;
        }

        if self.inputs.is_empty() {
            return Ok(());
        }

        let text = self.input_text().await?;
        let options = AskOptions {
            model: self.model.clone(),
            temperature: self.temperature,
        };
        app.ask(&context, &text, &options, out).await?;
        Ok(())
    }

    fn target(&self) -> Target {
        match (&self.new, self.context) {
            (Some(title), _) => Target::New(title.clone()),
            (None, Some(id)) => Target::Id(id),
            (None, None) => Target::Current,
        }
    }

    async fn input_text(&self) -> Result<String> {
        if self.inputs.len() == 1 && self.inputs[0] == STDIN_INPUT {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .wrap_err("reading stdin")?;
            return Ok(text);
        }
        Ok(self.inputs.join(" "))
    }
}
