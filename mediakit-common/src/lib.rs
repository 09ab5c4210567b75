//! MediaKit common library.
//!
//! Shared runtime for the MediaKit MCP servers: configuration, credentials,
//! the unified error type, the Cloud Storage client, media-output helpers,
//! the long-running-operation poller, the sequential batch runner, transport
//! selection, and tracing setup.

pub mod auth;
pub mod batch;
pub mod config;
pub mod error;
pub mod media;
pub mod operation;
pub mod server;
pub mod storage;
pub mod tracing;
pub mod transport;

pub use auth::Credentials;
pub use config::Config;
pub use error::{AuthError, ConfigError, Error, FieldError, Result, StorageError};
pub use operation::{wait_for_operation, OperationStatus, PollConfig};
pub use server::{shutdown_channel, McpServerBuilder, ServerError};
pub use transport::{Transport, TransportArgs, TransportMode};
