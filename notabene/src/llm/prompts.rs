//! Prompt templates for the conversation loop and session titling.

use serde_json::json;

use crate::models::{ChatAction, ContextId, ContextKind, SourceText};

use super::ToolSpec;

/// Most characters of a selected-text quote carried into the user message.
const SELECTED_TEXT_MAX_CHARS: usize = 200;
/// Most characters of question/answer carried into the title prompt.
const TITLE_INPUT_MAX_CHARS: usize = 500;
/// Source titles listed verbatim in the system prompt before eliding.
const SOURCE_SUMMARY_LIMIT: usize = 10;

/// The single tool declared to the model on every conversation round-trip.
pub fn search_sources_tool() -> ToolSpec {
    ToolSpec {
        name: "search_sources".to_string(),
        description: "Search the original sources (transcripts, documents). \
                      Use this tool whenever you need detailed information from the material."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search terms for finding the relevant information"
                }
            },
            "required": ["query"]
        }),
    }
}

/// System instructions describing the context and when to reach for the
/// search tool.
pub fn system_prompt(context: &ContextId, sources: &[SourceText]) -> String {
    let scope = match context.kind {
        ContextKind::Document => "DOCUMENT",
        ContextKind::Project => "PROJECT",
    };

    let mut summary = sources
        .iter()
        .take(SOURCE_SUMMARY_LIMIT)
        .map(|s| s.title.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    if sources.len() > SOURCE_SUMMARY_LIMIT {
        summary.push_str(&format!(
            " (and {} more)",
            sources.len() - SOURCE_SUMMARY_LIMIT
        ));
    }
    if summary.is_empty() {
        summary.push_str("none");
    }

    format!(
        "You are a study assistant for a student reviewing their ingested material.\n\
         \n\
         {scope}: {id}\n\
         AVAILABLE SOURCES: {summary}\n\
         \n\
         IMPORTANT RULES:\n\
         1. If the user asks a QUESTION about the content, or whether a word or concept is \
         mentioned, USE THE search_sources TOOL to look in the original sources.\n\
         2. If the user says \"hello\", \"thanks\", or is just making conversation, answer \
         normally WITHOUT using the tool.\n\
         3. When you use the tool, base your answer on the returned excerpts.\n\
         \n\
         RESPONSE STYLE:\n\
         - Be CONCISE: 1-3 paragraphs at most.\n\
         - NEVER cite the sources in your answer (the interface displays them automatically).\n\
         - Do not add a \"Sources:\" or \"References:\" section; the system handles it.",
        id = context.id,
    )
}

/// The user-turn content, decorated with the optional selected-text quote
/// and the optional canned action instruction.
pub fn user_content(
    message: &str,
    action: Option<ChatAction>,
    selected_text: Option<&str>,
) -> String {
    let mut content = message.to_string();

    if let Some(selected) = selected_text {
        content = format!(
            "[Selected text: \"{}\"]\n\n{content}",
            truncate_chars(selected, SELECTED_TEXT_MAX_CHARS)
        );
    }

    if let Some(action) = action {
        content = format!("{}\n\n{content}", action.instruction());
    }

    content
}

/// Prompt for the single-shot session-title call.
pub fn session_title_prompt(user_message: &str, assistant_response: &str) -> String {
    format!(
        "Generate a VERY CONCISE title (5-7 words maximum) for this conversation.\n\
         The title must capture the main topic of the discussion.\n\
         \n\
         STRICT RULES:\n\
         - NO quotes around the title\n\
         - NO markdown (no #, *, _, **, etc.)\n\
         - NO emojis\n\
         - NO special punctuation\n\
         - Plain text only\n\
         \n\
         Respond ONLY with the title, nothing else.\n\
         \n\
         Question: {question}\n\
         Answer: {answer}\n\
         \n\
         Title:",
        question = truncate_chars(user_message, TITLE_INPUT_MAX_CHARS),
        answer = truncate_chars(assistant_response, TITLE_INPUT_MAX_CHARS),
    )
}

/// Truncate on a character boundary without allocating.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
