//! Command line interface for the `nighthouse` demo binary.
//!
//! Credentials and the server URL come from flags or the `LIGHTHOUSE_*`
//! environment variables.

use clap::{Parser, Subcommand};

/// Command line arguments for the `nighthouse` binary.
#[derive(Debug, Parser)]
#[command(name = "nighthouse", version, about = "Talk to a Lighthouse server")]
pub struct Cli {
    /// WebSocket URL of the server.
    // Must match `nighthouse::DEFAULT_URL`; build.rs compiles this file
    // without the library, so the literal is repeated here.
    #[arg(
        long,
        env = "LIGHTHOUSE_URL",
        default_value = "wss://lighthouse.uni-kiel.de/websocket"
    )]
    pub url: String,
    /// User name.
    #[arg(short, long, env = "LIGHTHOUSE_USERNAME")]
    pub user: String,
    /// API token of the user.
    #[arg(short, long, env = "LIGHTHOUSE_TOKEN", hide_env_values = true)]
    pub token: String,
    /// What to do once connected.
    #[command(subcommand)]
    pub command: Command,
}

/// Demo actions.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Push a colour gradient to the display.
    Display {
        /// Hue offset of the gradient, in windows.
        #[arg(long, default_value_t = 0)]
        shift: usize,
    },
    /// Print replies pushed on the user's model stream.
    Stream {
        /// Stop after this many replies.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn default_url_matches_library() {
        let cli = Cli::parse_from(["nighthouse", "-u", "alice", "-t", "t", "stream"]);
        if std::env::var_os("LIGHTHOUSE_URL").is_none() {
            assert_eq!(cli.url, nighthouse::DEFAULT_URL);
        }
    }

    #[test]
    fn parses_display_command() {
        let cli = Cli::parse_from([
            "nighthouse",
            "--user",
            "alice",
            "--token",
            "t",
            "display",
            "--shift",
            "3",
        ]);
        assert_eq!(cli.user, "alice");
        assert!(matches!(cli.command, Command::Display { shift: 3 }));
    }

    #[test]
    fn parses_stream_limit() {
        let cli = Cli::parse_from([
            "nighthouse",
            "--url",
            "ws://localhost:3000",
            "-u",
            "bob",
            "-t",
            "t",
            "stream",
            "-n",
            "4",
        ]);
        assert_eq!(cli.url, "ws://localhost:3000");
        assert!(matches!(cli.command, Command::Stream { limit: Some(4) }));
    }
}
