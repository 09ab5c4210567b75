//! MediaKit music server binary.

use anyhow::Result;
use clap::Parser;
use mediakit_common::{Config, McpServerBuilder, TransportArgs};
use mediakit_music::MusicServer;

/// Command-line arguments for the music server.
#[derive(Parser, Debug)]
#[command(name = "mediakit-music")]
#[command(about = "MCP server for music generation via Vertex AI Lyria")]
struct Args {
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    mediakit_common::tracing::init_tracing();
    tracing::info!("mediakit-music starting");

    let args = Args::parse();
    let config = Config::from_env()?;
    tracing::info!(
        project_id = %config.project_id,
        location = %config.location,
        "configuration loaded"
    );

    let server = MusicServer::new(config);
    let transport = args.transport.into_transport();

    McpServerBuilder::new(server)
        .with_transport(transport)
        .run()
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
