//! Notabene: a retrieval-augmented chat core for conversing with ingested
//! sources (transcripts, OCR output, imported text).
//!
//! The crate is organized around a small set of seams: [`embeddings::Embedder`]
//! and [`llm::ChatModel`] for the external providers, [`db::ChatStore`] for
//! persistence, and [`services::ChatService`] as the conversation
//! orchestrator that ties indexing, retrieval, and the tool-calling loop
//! together into one streamed turn.

pub mod api;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod models;
pub mod processing;
pub mod search;
pub mod services;
