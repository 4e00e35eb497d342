//! Collaborator interfaces and implementations for ListScout.
//!
//! This crate provides:
//! - [`traits`] — the `Planner` / `Searcher` / `IdeaWriter` capability interfaces
//! - [`OpenRouterAgent`] — an LLM-backed implementation over the
//!   OpenAI-compatible chat-completions protocol
//! - Scripted implementations for tests and offline runs

pub mod extract;
mod openrouter;
mod scripted;
pub mod traits;

pub use openrouter::OpenRouterAgent;
pub use scripted::{ScriptedIdeaWriter, ScriptedPlanner, ScriptedSearcher};
pub use traits::{IdeaWriter, Planner, Searcher};
