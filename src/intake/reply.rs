// src/intake/reply.rs — Reply texts posted back to the asker

use crate::index::MatchResult;

pub const NO_MATCH_REPLY: &str =
    "Sorry, I couldn't find any similar questions that have been asked before.";

pub const APOLOGY_REPLY: &str = "Sorry, I encountered an error while processing your message.";

/// Posted by `announce` when no text is given.
pub const ONLINE_ANNOUNCEMENT: &str = "Hello! Deja Q is online.";

/// Reply pointing at the best match, with the previous answer's summary
/// appended when one was produced.
pub fn match_reply(best: &MatchResult, summary: Option<&str>) -> String {
    let mut reply = format!(
        "I found a similar question that was asked before! (Similarity: {:.1}%)\n\
         You can find it here: {}",
        best.percentage(),
        best.message.permalink,
    );
    if let Some(summary) = summary.filter(|s| !s.trim().is_empty()) {
        reply.push_str(&format!(
            "\n\nHere's a summary of the previous answer:\n```\n{summary}\n```"
        ));
    }
    reply
}
