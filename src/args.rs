//! Command-line arguments for the `nntp-conn-test` binary

use std::path::PathBuf;

use clap::Parser;

use crate::types::MessageId;

fn parse_message_id(s: &str) -> Result<MessageId, String> {
    MessageId::new(s).map_err(|e| format!("Invalid message-id: {}", e))
}

/// Test the connection to a configured NNTP server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", env = "NNTP_CONN_CONFIG")]
    pub config: PathBuf,

    /// Name of the server to test (defaults to the first configured server)
    #[arg(short, long, env = "NNTP_CONN_SERVER")]
    pub server: Option<String>,

    /// Newsgroup to select after logging in
    #[arg(short, long)]
    pub group: Option<String>,

    /// Message-id to check with STAT (or HEAD)
    #[arg(short, long, value_parser = parse_message_id)]
    pub article: Option<MessageId>,

    /// Also write logs to this file
    #[arg(long, env = "NNTP_CONN_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}
