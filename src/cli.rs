//! Command-line interface for bedrock-idler.

use crate::bot::{BotConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_USERNAME};
use crate::protocol::AuthMode;
use clap::Parser;
use std::path::PathBuf;

/// Idle bot for Bedrock servers.
#[derive(Debug, Parser)]
#[command(name = "bedrock-idler", version, about)]
pub struct Cli {
    /// Path to the session relay's Unix socket.
    #[arg(long, env = "BEDROCK_IDLER_RELAY")]
    pub relay: Option<PathBuf>,

    /// Display name to log in with.
    #[arg(short, long, default_value = DEFAULT_USERNAME)]
    pub username: String,

    /// Server host.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Server port.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Skip Xbox authentication (offline-mode servers only).
    #[arg(long)]
    pub offline: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Controller settings from the parsed arguments.
    #[must_use]
    pub fn bot_config(&self) -> BotConfig {
        BotConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            auth_mode: if self.offline {
                AuthMode::Offline
            } else {
                AuthMode::Online
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_bot_config() {
        let cli = Cli::try_parse_from(["bedrock-idler"]).expect("parse");
        assert_eq!(cli.bot_config(), BotConfig::default());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "bedrock-idler",
            "-u",
            "Idler",
            "--host",
            "localhost",
            "--port",
            "19133",
            "--offline",
            "--relay",
            "/tmp/relay.sock",
        ])
        .expect("parse");

        let config = cli.bot_config();
        assert_eq!(config.username, "Idler");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 19133);
        assert_eq!(config.auth_mode, AuthMode::Offline);
        assert_eq!(cli.relay, Some(PathBuf::from("/tmp/relay.sock")));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["bedrock-idler", "--port", "70000"]).is_err());
        assert!(Cli::try_parse_from(["bedrock-idler", "--port", "abc"]).is_err());
    }
}
