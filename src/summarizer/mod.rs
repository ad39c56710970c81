// src/summarizer/mod.rs — Thread summaries via the generation provider

pub mod prompt;

use std::sync::Arc;

use crate::infra::errors::DejaQError;
use crate::provider::Generator;
use crate::util::preview;
pub use prompt::{build_prompt, SummaryPrompt};

/// Returned without calling the generator when a thread has no responses.
pub const NO_ANSWERS: &str = "No answers found in the thread.";

pub struct ThreadSummarizer {
    generator: Arc<dyn Generator>,
}

impl ThreadSummarizer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Summarize the answer(s) in a thread. `messages[0]` is the question.
    /// `thread_id` only labels the interaction log.
    pub async fn summarize_thread<S: AsRef<str> + Sync>(
        &self,
        messages: &[S],
        thread_id: Option<&str>,
    ) -> Result<String, DejaQError> {
        let prompt = build_prompt(messages);
        if prompt.is_empty() {
            return Ok(NO_ANSWERS.to_string());
        }

        let response = self
            .generator
            .generate(&prompt.instruction, Some(&prompt.guidance))
            .await
            .inspect_err(|e| tracing::error!("Error summarizing thread: {e}"))?;

        let label = match thread_id {
            Some(id) => id.to_string(),
            None => format!("{}...", preview(messages[0].as_ref(), 50)),
        };
        log_interaction(&label, self.generator.id(), &prompt, &response);

        Ok(response)
    }
}

fn log_interaction(thread: &str, generator: &str, prompt: &SummaryPrompt, response: &str) {
    tracing::info!(
        thread,
        generator,
        system_prompt = %prompt.guidance,
        user_prompt = %prompt.instruction,
        response,
        "Summarized thread"
    );
}
