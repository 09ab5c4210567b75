//! MediaKit avtool server binary.

use anyhow::Result;
use clap::Parser;
use mediakit_common::{Config, McpServerBuilder, TransportArgs};
use mediakit_avtool::AvToolServer;

/// Command-line arguments for the avtool server.
#[derive(Parser, Debug)]
#[command(name = "mediakit-avtool")]
#[command(about = "MCP server for local media processing with ffmpeg")]
struct Args {
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    mediakit_common::tracing::init_tracing();
    tracing::info!("mediakit-avtool starting");

    let args = Args::parse();
    let config = Config::from_env()?;
    tracing::info!(
        project_id = %config.project_id,
        location = %config.location,
        "configuration loaded"
    );

    let server = AvToolServer::new(config);
    let transport = args.transport.into_transport();

    McpServerBuilder::new(server)
        .with_transport(transport)
        .run()
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
