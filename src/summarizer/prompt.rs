// src/summarizer/prompt.rs — Thread summarization prompt
//
// The generator is steered entirely by this text. Changing the wording
// changes bot behavior, so the tests pin it verbatim.

/// Guidance returned when there is nothing to summarize.
pub const EMPTY_THREAD_GUIDANCE: &str = "N/A - Empty thread";

const GUIDANCE: &str = "You are a precise technical assistant that extracts answers from Slack threads.
Your goal is to find and summarize ONLY the answer to the original question.
If no clear answer exists, you must say so.
Do not include speculation or information not directly related to answering the original question.";

const INSTRUCTIONS: &str = "Instructions:
1. Focus ONLY on responses that attempt to answer the question
2. If there are multiple valid answers, combine them into a coherent summary
3. If there is no clear answer in the responses, respond with \"No clear answer was provided in the thread.\"
4. Ignore any follow-up questions or off-topic discussions
5. Be concise but include important technical details";

/// The prompt pair handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryPrompt {
    /// User prompt: the thread plus the instruction list.
    pub instruction: String,
    /// System prompt constraining the generator.
    pub guidance: String,
}

impl SummaryPrompt {
    /// `true` when the thread had no responses and the generator must not run.
    pub fn is_empty(&self) -> bool {
        self.instruction.is_empty()
    }
}

/// Build the summarization prompt for a thread, question first.
///
/// Fewer than two messages yields an empty instruction, signalling that
/// there is no answer to summarize.
pub fn build_prompt<S: AsRef<str>>(messages: &[S]) -> SummaryPrompt {
    let [question, responses @ ..] = messages else {
        return empty_prompt();
    };
    if responses.is_empty() {
        return empty_prompt();
    }

    let responses: Vec<String> = responses
        .iter()
        .map(|r| format!("- {}", r.as_ref()))
        .collect();

    let instruction = format!(
        "Given this Slack thread, extract and summarize the answer to the question. \
         If there is no clear answer, explicitly state that.\n\n\
         Original Question:\n{question}\n\n\
         Responses:\n{responses}\n\n\
         {INSTRUCTIONS}\n\n\
         Summary:",
        question = question.as_ref(),
        responses = responses.join("\n"),
    );

    SummaryPrompt {
        instruction,
        guidance: GUIDANCE.to_string(),
    }
}

fn empty_prompt() -> SummaryPrompt {
    SummaryPrompt {
        instruction: String::new(),
        guidance: EMPTY_THREAD_GUIDANCE.to_string(),
    }
}
