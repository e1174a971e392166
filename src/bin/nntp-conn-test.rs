use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use nntp_conn::args::Args;
use nntp_conn::{ServerProfile, load_config, test_server};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = nntp_conn::logging::init_logging(args.log_file.as_deref());

    let config = load_config(&args.config)?;
    let server = match &args.server {
        Some(name) => config
            .server(name)
            .with_context(|| format!("No server named '{}' in {}", name, args.config.display()))?,
        None => config
            .servers
            .first()
            .context("Configuration has no servers")?,
    }
    .clone();

    let profile = Arc::new(ServerProfile::new(server, &config.global));
    info!("Testing {} ({})", profile.name(), profile);

    match test_server(Arc::clone(&profile), args.group.as_deref(), args.article).await {
        Ok(report) => {
            print!("{}", report);
            Ok(())
        }
        Err(e) => {
            error!("Server test failed for {}: {}", profile, e);
            Err(e).with_context(|| format!("Server test failed for {}", profile))
        }
    }
}
