//! Engage - knowledge-base, RAG chat and review-form backend
//!
//! A REST service that lets chat widgets answer questions from a business's own
//! documents and collects structured customer reviews.
//!
//! # Overview
//!
//! Engage allows you to:
//! - Ingest text and PDF documents into a per-widget vector knowledge base
//! - Answer chat messages grounded in that knowledge, with confidence scores and human handoff
//! - Create review forms, collect submissions and compute analytics
//! - Store images and documents in S3-compatible object storage
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings and prompt templates
//! - `embedding` - Embedding generation (OpenAI, Voyage)
//! - `vector_store` - Vector database abstraction (Qdrant, in-memory)
//! - `chunking` - Recursive text splitting
//! - `knowledge` - Knowledge-base ingestion and search
//! - `rerank` - Second-stage relevance scoring
//! - `llm` - Chat completion clients
//! - `rag` - Chat orchestration
//! - `reviews` - Review forms, submissions and analytics
//! - `storage` - Object storage (Cloudflare R2)
//! - `api` - axum HTTP routes
//!
//! # Example
//!
//! ```rust,no_run
//! use engage::config::Settings;
//! use engage::state::AppState;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let addr = settings.bind_addr();
//!     let app = engage::api::router(Arc::new(AppState::from_settings(settings).await?));
//!
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod openai;
pub mod rag;
pub mod rerank;
pub mod reviews;
pub mod state;
pub mod storage;
pub mod vector_store;

pub use error::{EngageError, Result};
