//! MediaKit image server library.
//!
//! Wraps the Vertex AI Imagen `:predict` endpoint behind the
//! `image_generate` MCP tool.

pub mod catalog;
pub mod handler;
pub mod resources;
pub mod server;

pub use handler::{ImageGenerateParams, ImageGenerateResult, ImageHandler};
pub use server::ImageServer;
