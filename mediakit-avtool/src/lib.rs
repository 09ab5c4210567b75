//! MediaKit avtool server library.
//!
//! Wraps local ffmpeg/ffprobe invocations behind MCP tools, including a
//! sequential batch runner over the individual operations.

pub mod args;
pub mod handler;
pub mod server;

pub use handler::{AvToolHandler, BatchItem, BatchParams, MediaInfo};
pub use server::AvToolServer;
