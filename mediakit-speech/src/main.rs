//! MediaKit speech server binary.

use anyhow::Result;
use clap::Parser;
use mediakit_common::{Config, McpServerBuilder, TransportArgs};
use mediakit_speech::SpeechServer;

/// Command-line arguments for the speech server.
#[derive(Parser, Debug)]
#[command(name = "mediakit-speech")]
#[command(about = "MCP server for text-to-speech via Google Cloud TTS")]
struct Args {
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    mediakit_common::tracing::init_tracing();
    tracing::info!("mediakit-speech starting");

    let args = Args::parse();
    let config = Config::from_env()?;
    tracing::info!(
        project_id = %config.project_id,
        location = %config.location,
        "configuration loaded"
    );

    let server = SpeechServer::new(config);
    let transport = args.transport.into_transport();

    McpServerBuilder::new(server)
        .with_transport(transport)
        .run()
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
