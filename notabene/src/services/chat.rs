use std::collections::HashSet;
use std::sync::Arc;

use async_stream::stream;
use chrono::Utc;
use futures::Stream;
use nanoid::nanoid;
use serde_json::Value;

use crate::config::{ChatConfig, RetrievalConfig};
use crate::db::ChatStore;
use crate::error::{NotabeneError, Result};
use crate::llm::{prompts, ChatModel, ChatRequest, PromptMessage};
use crate::models::{
    clean_response, ChatAction, ChatEvent, ChatFragment, ChatMessage, ChatRole, ContextId,
    MessageMetadata, RetrievedChunk, DEFAULT_SESSION_TITLE,
};
use crate::services::indexer::Indexer;
use crate::services::retrieval::{format_search_results, Retriever, SEARCH_FAILED_MESSAGE};

/// Appended to the stream when the model keeps requesting tools past the
/// round-trip cap.
pub const INTERRUPTED_MESSAGE: &str = "[Response interrupted - too many iterations]";

const SEARCH_TOOL_NAME: &str = "search_sources";
/// Chunk records are deduplicated across a turn's tool calls by this many
/// leading characters of content.
const CHUNK_DEDUP_PREFIX: usize = 100;
const TITLE_MAX_TOKENS: u32 = 30;
const TITLE_MAX_CHARS: usize = 100;

#[derive(Clone, Copy)]
struct Tuning {
    temperature: f32,
    max_tokens: u32,
    history_window: usize,
    max_iterations: usize,
    top_k: usize,
}

/// A request to `send_message`.
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub context: ContextId,
    pub message: String,
    pub action: Option<ChatAction>,
    pub selected_text: Option<String>,
    /// Restrict the turn to a subset of the context's sources.
    pub source_ids: Option<Vec<String>>,
    pub session_id: Option<String>,
}

/// The conversation orchestrator.
///
/// Drives a bounded tool-calling dialogue with the chat model: it makes
/// sure the context is indexed, lets the model pull in source excerpts
/// through `search_sources`, and multiplexes answer tokens with lifecycle
/// events into one pull-based stream. Generation stops as soon as the
/// caller stops consuming.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    indexer: Arc<Indexer>,
    retriever: Arc<Retriever>,
    model: Arc<dyn ChatModel>,
    tuning: Tuning,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn ChatStore>,
        indexer: Arc<Indexer>,
        retriever: Arc<Retriever>,
        model: Arc<dyn ChatModel>,
        chat: &ChatConfig,
        retrieval: &RetrievalConfig,
    ) -> Self {
        Self {
            store,
            indexer,
            retriever,
            model,
            tuning: Tuning {
                temperature: chat.temperature,
                max_tokens: chat.max_tokens,
                history_window: chat.history_window,
                max_iterations: chat.max_iterations,
                top_k: retrieval.top_k,
            },
        }
    }

    /// Send a message and stream the reply.
    ///
    /// Everything that can fail before generation (validation, session
    /// lookup, persisting the user turn, indexing) runs here and surfaces
    /// as an `Err`; the returned stream only ever carries fragments.
    pub async fn send_message(
        &self,
        request: SendMessage,
    ) -> Result<impl Stream<Item = ChatFragment> + Send + 'static> {
        let SendMessage {
            context,
            message,
            action,
            selected_text,
            source_ids,
            session_id,
        } = request;

        if message.trim().is_empty() {
            return Err(NotabeneError::Validation("Message cannot be empty".into()));
        }

        if let Some(ref session_id) = session_id {
            let session = self
                .store
                .get_session(session_id)
                .await?
                .ok_or_else(|| NotabeneError::NotFound(format!("Session {session_id}")))?;
            if session.context_id != context.key() {
                return Err(NotabeneError::Validation(
                    "Session does not belong to this context".into(),
                ));
            }
        }

        let mut sources = self.store.sources_for_context(&context).await?;
        if let Some(ref ids) = source_ids {
            sources.retain(|source| ids.contains(&source.id));
        }

        let user_metadata = MessageMetadata {
            action,
            selected_text: selected_text.clone(),
            source_ids: source_ids.clone(),
            ..Default::default()
        };
        let user_message = ChatMessage {
            id: nanoid!(),
            context_id: context.key(),
            session_id: session_id.clone(),
            role: ChatRole::User,
            content: message.clone(),
            metadata: (!user_metadata.is_empty()).then_some(user_metadata),
            created_at: Utc::now(),
        };
        self.store.append_message(&user_message).await?;

        if !sources.is_empty() {
            self.indexer.index(&context, &sources).await?;
        }

        let history = match session_id {
            Some(ref session_id) => self.store.session_history(session_id).await?,
            None => self.store.ungrouped_history(&context).await?,
        };
        let history: Vec<ChatMessage> = history
            .into_iter()
            .filter(|m| m.id != user_message.id)
            .collect();
        let history_was_empty = history.is_empty();
        let window_start = history.len().saturating_sub(self.tuning.history_window);

        let mut messages: Vec<PromptMessage> = Vec::new();
        messages.push(PromptMessage::System {
            content: prompts::system_prompt(&context, &sources),
        });
        for prior in &history[window_start..] {
            if let Some(prompt_message) = to_prompt_message(prior) {
                messages.push(prompt_message);
            }
        }
        messages.push(PromptMessage::User {
            content: prompts::user_content(&message, action, selected_text.as_deref()),
        });

        let service = self.clone();

        Ok(stream! {
            let mut messages = messages;
            let mut answer = String::new();
            let mut sources_used: Vec<String> = Vec::new();
            let mut chunks_found: Vec<RetrievedChunk> = Vec::new();
            let mut seen_chunk_keys: HashSet<String> = HashSet::new();
            let mut iteration = 0;

            loop {
                if iteration >= service.tuning.max_iterations {
                    answer.push_str(INTERRUPTED_MESSAGE);
                    yield ChatFragment::Token(INTERRUPTED_MESSAGE.to_string());
                    break;
                }
                iteration += 1;

                let reply = match service
                    .model
                    .chat(ChatRequest {
                        messages: messages.clone(),
                        tools: vec![prompts::search_sources_tool()],
                        temperature: service.tuning.temperature,
                        max_tokens: service.tuning.max_tokens,
                    })
                    .await
                {
                    Ok(reply) => reply,
                    Err(error) => {
                        // A failed model call ends the turn; nothing else is
                        // yielded and no assistant turn is persisted.
                        tracing::error!(error = %error, "Chat model call failed");
                        return;
                    }
                };

                if !reply.tool_calls.is_empty() {
                    for call in &reply.tool_calls {
                        if call.name != SEARCH_TOOL_NAME {
                            continue;
                        }

                        let query = parse_tool_query(&call.arguments);
                        tracing::debug!(%query, "Search requested by tool call");

                        yield ChatFragment::Event(ChatEvent::SearchStart {
                            query: query.clone(),
                        });

                        let (tool_result, titles, records) =
                            service.execute_search(&context, &query).await;

                        tracing::debug!(chunk_count = records.len(), "Search finished");

                        yield ChatFragment::Event(ChatEvent::SearchComplete {
                            sources: titles.clone(),
                            chunks: records.clone(),
                        });

                        for title in titles {
                            if !sources_used.contains(&title) {
                                sources_used.push(title);
                            }
                        }
                        for record in records {
                            let key: String =
                                record.content.chars().take(CHUNK_DEDUP_PREFIX).collect();
                            if seen_chunk_keys.insert(key) {
                                chunks_found.push(record);
                            }
                        }

                        messages.push(PromptMessage::Assistant {
                            content: None,
                            tool_calls: vec![call.clone()],
                        });
                        messages.push(PromptMessage::Tool {
                            tool_call_id: call.id.clone(),
                            name: call.name.clone(),
                            content: tool_result,
                        });
                    }

                    continue;
                }

                if let Some(content) = reply.content {
                    let text = content.into_text();
                    if !text.is_empty() {
                        answer.push_str(&text);
                        yield ChatFragment::Token(text);
                    }
                }
                break;
            }

            let answer = clean_response(&answer).trim().to_string();

            let has_provenance = !sources_used.is_empty() || !chunks_found.is_empty();
            let assistant_metadata = has_provenance.then(|| MessageMetadata {
                sources_used: Some(sources_used),
                chunks_found: Some(chunks_found),
                ..Default::default()
            });

            let assistant_message = ChatMessage {
                id: nanoid!(),
                context_id: context.key(),
                session_id: session_id.clone(),
                role: ChatRole::Assistant,
                content: answer.clone(),
                metadata: assistant_metadata,
                created_at: Utc::now(),
            };
            if let Err(error) = service.store.append_message(&assistant_message).await {
                tracing::error!(error = %error, "Failed to persist assistant message");
                return;
            }

            // A brand-new session gets a real title after its first
            // completed exchange. Failures never affect the answer.
            if let Some(session_id) = session_id {
                if history_was_empty && !answer.is_empty() {
                    if let Some(title) = service.generate_session_title(&message, &answer).await {
                        match service
                            .store
                            .rename_session(&session_id, &title, Utc::now())
                            .await
                        {
                            Ok(true) => {
                                yield ChatFragment::Event(ChatEvent::TitleGenerated {
                                    session_id: session_id.clone(),
                                    title,
                                });
                            }
                            Ok(false) => {
                                tracing::warn!(%session_id, "Session vanished before titling");
                            }
                            Err(error) => {
                                tracing::warn!(error = %error, "Failed to store session title");
                            }
                        }
                    }
                }
            }
        })
    }

    async fn execute_search(
        &self,
        context: &ContextId,
        query: &str,
    ) -> (String, Vec<String>, Vec<RetrievedChunk>) {
        match self.retriever.search(context, query, self.tuning.top_k).await {
            Ok(hits) => format_search_results(&hits, query),
            Err(error) => {
                tracing::error!(error = %error, "Error searching sources");
                (SEARCH_FAILED_MESSAGE.to_string(), Vec::new(), Vec::new())
            }
        }
    }

    async fn generate_session_title(&self, question: &str, answer: &str) -> Option<String> {
        let prompt = prompts::session_title_prompt(question, answer);
        let raw = match self.model.complete_brief(&prompt, TITLE_MAX_TOKENS).await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(error = %error, "Session title generation failed");
                return None;
            }
        };

        let title = raw
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim()
            .to_string();
        if title.is_empty() || title == DEFAULT_SESSION_TITLE {
            return None;
        }

        Some(truncate_title(title))
    }
}

fn to_prompt_message(message: &ChatMessage) -> Option<PromptMessage> {
    match message.role {
        ChatRole::User => Some(PromptMessage::User {
            content: message.content.clone(),
        }),
        ChatRole::Assistant => Some(PromptMessage::Assistant {
            content: Some(message.content.clone()),
            tool_calls: Vec::new(),
        }),
        ChatRole::System => None,
    }
}

/// Pull the query out of the tool-call arguments; the raw payload doubles
/// as the query when it is not valid JSON.
fn parse_tool_query(arguments: &str) -> String {
    match serde_json::from_str::<Value>(arguments) {
        Ok(value) => value
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Err(_) => arguments.to_string(),
    }
}

fn truncate_title(title: String) -> String {
    if title.chars().count() > TITLE_MAX_CHARS {
        let mut truncated: String = title.chars().take(TITLE_MAX_CHARS - 3).collect();
        truncated.push_str("...");
        truncated
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_query_json_payload() {
        assert_eq!(parse_tool_query(r#"{"query": "mitochondria"}"#), "mitochondria");
    }

    #[test]
    fn test_parse_tool_query_json_without_field_is_empty() {
        assert_eq!(parse_tool_query(r#"{"q": "nope"}"#), "");
    }

    #[test]
    fn test_parse_tool_query_raw_fallback() {
        assert_eq!(parse_tool_query("mitochondria"), "mitochondria");
    }

    #[test]
    fn test_truncate_title_caps_at_100_chars() {
        let long = "t".repeat(150);
        let truncated = truncate_title(long);
        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.ends_with("..."));

        let short = truncate_title("Short title".to_string());
        assert_eq!(short, "Short title");
    }
}
