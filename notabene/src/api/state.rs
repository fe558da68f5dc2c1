use std::sync::Arc;

use crate::config::Config;
use crate::db::ChatStore;
use crate::embeddings::Embedder;
use crate::llm::ChatModel;
use crate::search::CollectionSet;
use crate::services::{ChatService, HistoryService, Indexer, Retriever};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ChatStore>,
    pub chat: ChatService,
    pub history: HistoryService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ChatStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        let config = Arc::new(config);
        let collections = Arc::new(CollectionSet::new());
        let indexer = Arc::new(Indexer::new(
            collections.clone(),
            embedder.clone(),
            &config.retrieval,
        ));
        let retriever = Arc::new(Retriever::new(collections, embedder, &config.retrieval));
        let chat = ChatService::new(
            store.clone(),
            indexer,
            retriever,
            model,
            &config.chat,
            &config.retrieval,
        );
        let history = HistoryService::new(store.clone());

        Self {
            config,
            store,
            chat,
            history,
        }
    }
}
