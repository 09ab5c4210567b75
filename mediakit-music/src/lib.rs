//! MediaKit music server library.
//!
//! Wraps the Vertex AI Lyria long-running generation endpoints behind the
//! `music_generate` MCP tool.

pub mod catalog;
pub mod handler;
pub mod server;

pub use handler::{MusicGenerateParams, MusicGenerateResult, MusicHandler};
pub use server::MusicServer;
