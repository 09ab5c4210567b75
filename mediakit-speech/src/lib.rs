//! MediaKit speech server library.
//!
//! Wraps the Cloud TTS synthesis and voice-list endpoints behind the
//! `speech_synthesize` and `speech_list_voices` MCP tools.

pub mod handler;
pub mod server;

pub use handler::{SpeechHandler, SpeechResult, SpeechSynthesizeParams};
pub use server::SpeechServer;
