//! Agent module - conversation shell around the flight tools.
//!
//! This module contains:
//! - Message types (Message, Response)
//! - LLM client trait and the Gemini implementation
//! - Agent loop dispatching the tool calls the model asks for
//! - Context builder for prompts
//!
//! # Adding a New LLM Provider
//!
//! See [`llm::ProviderRegistry`] for instructions.

mod context;
mod loop_impl;
mod message;

// LLM providers in submodule
pub mod llm;

// Re-exports for convenience
pub use context::Context;
pub use llm::{GeminiClient, GeminiEndpoint, LlmClient, LlmResponse, ProviderRegistry, Usage};
pub use loop_impl::AgentLoop;
pub use message::{Message, Response, Role, ToolCall, ToolCallRequest};
