//! Interview-progress graph core for biographical life-story interviews.
//!
//! Tracks which narrative themes an interview has covered and how deeply,
//! records the discrete life events extracted from conversation, and picks
//! the theme a conversational agent should probe next. The crate generates
//! no natural language and calls no LLM; dialogue agents, retrieval
//! pipelines, and evaluators are external collaborators of this core.

pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod models;

pub use catalog::{DomainSummary, ThemeLoader};
pub use config::{Config, GraphBackend};
pub use error::{NavigatorError, Result};
pub use graph::{Coverage, GraphManager, GraphSnapshot, GraphSummary, ThemeStatus};
pub use models::{Completion, Domain, EventNode, NodeStatus, NodeStyle, ThemeNode};
