mod chat;
mod history;
mod indexer;
mod retrieval;

pub use chat::{ChatService, SendMessage, INTERRUPTED_MESSAGE};
pub use history::HistoryService;
pub use indexer::Indexer;
pub use retrieval::{
    format_search_results, ChunkHit, Retriever, NO_RESULTS_MESSAGE, SEARCH_FAILED_MESSAGE,
};
