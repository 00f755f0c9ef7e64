//! Axum HTTP handlers: retrieval search, RAG chat, and LLM config management.

pub mod chat;
pub mod config;
pub mod search;
