//! MediaKit image server binary.

use anyhow::Result;
use clap::Parser;
use mediakit_common::{Config, McpServerBuilder, TransportArgs};
use mediakit_image::ImageServer;

/// Command-line arguments for the image server.
#[derive(Parser, Debug)]
#[command(name = "mediakit-image")]
#[command(about = "MCP server for image generation via Vertex AI Imagen")]
struct Args {
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    mediakit_common::tracing::init_tracing();
    tracing::info!("mediakit-image starting");

    let args = Args::parse();
    let config = Config::from_env()?;
    tracing::info!(
        project_id = %config.project_id,
        location = %config.location,
        "configuration loaded"
    );

    let server = ImageServer::new(config);
    let transport = args.transport.into_transport();

    McpServerBuilder::new(server)
        .with_transport(transport)
        .run()
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
