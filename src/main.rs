// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Command line entry point.

use clap::{Parser, Subcommand};

use visavis::agent::Agent;
use visavis::assets::AssetManager;
use visavis::config::Config;

#[derive(Parser)]
#[command(
    name = "visavis",
    about = "Real-time voice and vision assistant",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download model assets so later runs never block on a download
    DownloadFiles,
    /// Connect to a bridge and serve one session
    Start {
        /// Bridge websocket URL (overrides BRIDGE_URL)
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,visavis=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::DownloadFiles => {
            let paths = AssetManager::prefetch_all().await?;
            for path in paths {
                tracing::info!(path = %path.display(), "asset ready");
            }
        }
        Command::Start { url } => {
            let config = Config::from_env()?;
            let url = url
                .or_else(|| config.bridge_url.clone())
                .ok_or_else(|| anyhow::anyhow!("no bridge URL; pass --url or set BRIDGE_URL"))?;

            let agent = Agent::new(config);
            tracing::info!(url = %url, "connecting to bridge");
            let session = agent.connect(&url).await?;
            session.run().await;
        }
    }

    Ok(())
}
