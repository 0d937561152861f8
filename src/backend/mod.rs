pub mod openai;

pub use openai::OpenAI;

#[cfg(test)]
use mockall::automock;

use crate::{
    config::Profile,
    models::{BackendPrompt, ResponseTx},
};
use async_trait::async_trait;
use eyre::Result;
use std::sync::Arc;

/// A completion provider. Implementations stream the answer as a sequence of
/// `BackendResponse` deltas on `response_tx`, the last one with `done` set,
/// and return once the stream is exhausted.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Backend {
    async fn get_completion(&self, prompt: BackendPrompt, response_tx: ResponseTx) -> Result<()>;
}

pub type ArcBackend = Arc<dyn Backend + Send + Sync>;

pub fn new_backend(profile: &Profile) -> ArcBackend {
    OpenAI::from(profile).into()
}
