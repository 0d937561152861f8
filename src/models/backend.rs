use tokio::sync::mpsc;

use super::PromptEntry;

#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub model: String,
    pub id: String,
    pub text: String,
    pub done: bool,
    pub usage: Option<BackendUsage>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BackendUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub type ResponseTx = mpsc::UnboundedSender<BackendResponse>;
pub type ResponseRx = mpsc::UnboundedReceiver<BackendResponse>;

#[derive(Debug, Clone, PartialEq)]
pub struct BackendPrompt {
    model: String,
    temperature: Option<f32>,
    messages: Vec<PromptEntry>,
}

impl BackendPrompt {
    pub fn new(messages: Vec<PromptEntry>) -> BackendPrompt {
        BackendPrompt {
            model: String::new(),
            temperature: None,
            messages,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn messages(&self) -> &[PromptEntry] {
        &self.messages
    }
}
