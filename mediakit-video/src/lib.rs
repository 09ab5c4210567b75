//! MediaKit video server library.
//!
//! Wraps the Vertex AI Veo long-running generation endpoints behind the
//! `video_generate` and `video_from_image` MCP tools.

pub mod catalog;
pub mod handler;
pub mod resources;
pub mod server;

pub use handler::{VideoFromImageParams, VideoFromTextParams, VideoGenerateResult, VideoHandler};
pub use server::VideoServer;
