//! # betty-rag
//!
//! A retrieval-augmented chat service for the Betty knowledge assistant:
//! queries are classified, routed through single- or multi-pass vector
//! retrieval, and the evidence is assembled into a bounded prompt context
//! for the language model.
//!
//! ## Architecture
//!
//! Every chat turn runs the same orchestration:
//!
//! ```text
//!                    ┌──────────────┐
//!                    │  User Query   │
//!                    └──────┬───────┘
//!                           │
//!                           ▼
//!                ┌─────────────────────┐
//!                │  Query Classifier    │
//!                │  trigger-phrase match│
//!                └────┬───────────┬────┘
//!          no match   │           │   match
//!            ┌────────┘           └─────────┐
//!            ▼                              ▼
//!   ┌─────────────────┐        ┌─────────────────────────┐
//!   │  Single-Pass     │        │  Multi-Pass Battery      │
//!   │  1 query, top-15 │        │  6 fixed domain queries  │
//!   │  optional rerank │        │  × 5 results, sequential │
//!   └────────┬────────┘        └────────────┬────────────┘
//!            │                              │
//!            │                              ▼
//!            │                 ┌─────────────────────────┐
//!            │                 │  Merge in plan order     │
//!            │                 │  Dedup 100-char prefix   │
//!            │                 │  Cap at 25 chunks        │
//!            │                 └────────────┬────────────┘
//!            │                              │
//!            └──────────────┬───────────────┘
//!                           ▼
//!               ┌───────────────────────┐
//!               │  Context Assembler     │
//!               │  Document/Content block│
//!               │  Sources: instruction  │
//!               └───────────┬───────────┘
//!                           ▼
//!               ┌───────────────────────┐
//!               │  LLM (SSE streaming)   │
//!               └───────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, retrieval, and LLM settings
//! - [`models`] - Shared data types: `RetrievedChunk`, request/response types
//! - [`retrieval`] - Query classification, the multi-pass battery, and single-pass search
//! - [`context`] - Context block assembly and source-citation extraction
//! - [`search`] - Vector search boundary: the `VectorSearch` trait and its HTTP clients
//! - [`llm`] - Streaming chat client for Claude and OpenAI-compatible APIs
//! - [`api`] - Axum HTTP handlers for search, chat, and config management
//! - [`state`] - Shared application state

pub mod api;
pub mod config;
pub mod context;
pub mod llm;
pub mod models;
pub mod retrieval;
pub mod search;
pub mod state;
