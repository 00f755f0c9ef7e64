//! Thin streaming client for the LLM providers Betty can answer through.

pub mod chat_stream;
