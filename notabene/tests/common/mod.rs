use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use notabene::config::{ChatConfig, RetrievalConfig};
use notabene::db::{ChatStore, Database, LibSqlBackend};
use notabene::embeddings::Embedder;
use notabene::error::{NotabeneError, Result};
use notabene::llm::{ChatModel, ChatReply, ChatRequest, ReplyContent, ToolCall};
use notabene::models::{ContextId, SourceText};
use notabene::search::CollectionSet;
use notabene::services::{ChatService, Indexer, Retriever};

pub fn retrieval_config() -> RetrievalConfig {
    RetrievalConfig {
        chunk_size: 150,
        chunk_overlap: 30,
        top_k: 3,
        min_score: 0.5,
    }
}

pub fn chat_config() -> ChatConfig {
    ChatConfig {
        model: "mistral/mistral-large-latest".to_string(),
        title_model: "mistral/ministral-3b-latest".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: None,
        temperature: 0.3,
        max_tokens: 800,
        timeout_secs: 5,
        max_retries: 0,
        history_window: 10,
        max_iterations: 3,
    }
}

/// Embedder stub returning canned vectors by exact text match, with a
/// shared fallback. Counts batched `embed` calls for idempotence asserts.
pub struct StubEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    fallback: Vec<f32>,
    batch_calls: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: Mutex::new(HashMap::new()),
            fallback: vec![1.0, 0.0, 0.0, 0.0],
            batch_calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, text: &str, vector: Vec<f32>) {
        self.vectors
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn last_batch(&self) -> Vec<String> {
        self.batches.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(texts.clone());

        let vectors = self.vectors.lock().unwrap();
        Ok(texts
            .iter()
            .map(|text| vectors.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
            .collect())
    }
}

/// Embedder that fails every call with the given error kind.
pub struct FailingEmbedder {
    pub auth_error: bool,
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if self.auth_error {
            Err(NotabeneError::ApiAuth("invalid credential".to_string()))
        } else {
            Err(NotabeneError::Embedding("provider unavailable".to_string()))
        }
    }
}

/// Embedder that serves the first batch (indexing) and fails afterwards
/// (query-time searches).
pub struct FlakyEmbedder {
    inner: StubEmbedder,
    successes: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(successes: usize) -> Self {
        Self {
            inner: StubEmbedder::new(),
            successes: AtomicUsize::new(successes),
        }
    }
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let remaining = self.successes.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(NotabeneError::Embedding("provider unavailable".to_string()));
        }
        self.successes.store(remaining - 1, Ordering::SeqCst);
        self.inner.embed(texts).await
    }
}

/// Chat model stub replaying a scripted sequence of replies. When the
/// script runs out it serves the `repeat` reply if configured, otherwise
/// errors like a failed provider call.
pub struct ScriptedModel {
    replies: Mutex<Vec<ChatReply>>,
    repeat: Option<ChatReply>,
    title: Option<String>,
    chat_calls: AtomicUsize,
    title_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ChatReply>) -> Self {
        Self {
            replies: Mutex::new(replies),
            repeat: None,
            title: None,
            chat_calls: AtomicUsize::new(0),
            title_calls: AtomicUsize::new(0),
        }
    }

    pub fn repeating(reply: ChatReply) -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            repeat: Some(reply),
            title: None,
            chat_calls: AtomicUsize::new(0),
            title_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn title_calls(&self) -> usize {
        self.title_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatReply> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);

        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            match &self.repeat {
                Some(reply) => Ok(reply.clone()),
                None => Err(NotabeneError::Llm("model unavailable".to_string())),
            }
        } else {
            Ok(replies.remove(0))
        }
    }

    async fn complete_brief(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        self.title_calls.fetch_add(1, Ordering::SeqCst);
        match &self.title {
            Some(title) => Ok(title.clone()),
            None => Err(NotabeneError::Llm("title model unavailable".to_string())),
        }
    }
}

pub fn tool_call_reply(id: &str, query: &str) -> ChatReply {
    ChatReply {
        content: None,
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            name: "search_sources".to_string(),
            arguments: json!({ "query": query }).to_string(),
        }],
    }
}

pub fn text_reply(text: &str) -> ChatReply {
    ChatReply {
        content: Some(ReplyContent::Text(text.to_string())),
        tool_calls: Vec::new(),
    }
}

/// Everything a test needs wired against an in-memory store.
pub struct Harness {
    pub store: Arc<dyn ChatStore>,
    pub collections: Arc<CollectionSet>,
    pub indexer: Arc<Indexer>,
    pub retriever: Arc<Retriever>,
}

pub async fn harness_with_embedder(embedder: Arc<dyn Embedder>) -> Harness {
    let database = Database::memory().await.expect("in-memory database");
    let store: Arc<dyn ChatStore> = Arc::new(LibSqlBackend::new(database));
    let collections = Arc::new(CollectionSet::new());
    let config = retrieval_config();
    let indexer = Arc::new(Indexer::new(collections.clone(), embedder.clone(), &config));
    let retriever = Arc::new(Retriever::new(collections.clone(), embedder, &config));

    Harness {
        store,
        collections,
        indexer,
        retriever,
    }
}

pub fn chat_service(harness: &Harness, model: Arc<dyn ChatModel>) -> ChatService {
    ChatService::new(
        harness.store.clone(),
        harness.indexer.clone(),
        harness.retriever.clone(),
        model,
        &chat_config(),
        &retrieval_config(),
    )
}

pub async fn seed_source(
    store: &Arc<dyn ChatStore>,
    context: &ContextId,
    id: &str,
    title: &str,
    content: Option<&str>,
) -> SourceText {
    let source = SourceText::new(id, context.key(), title, content.map(str::to_string));
    store.create_source(&source).await.expect("seed source");
    source
}
