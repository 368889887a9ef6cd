pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "almanac")]
#[command(about = "Posts a historical \"On This Day\" event", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/almanac/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, select, format and post one message
    Run,
    /// Print the next message without posting it
    Preview,
    /// Post on a fixed interval until interrupted
    Daemon {
        /// Posting interval (e.g., "6h", "1d"); overrides the config file
        #[arg(short, long)]
        interval: Option<String>,

        /// Skip the post on start
        #[arg(long)]
        no_initial_run: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_daemon_args() {
        let cli = Cli::parse_from(["almanac", "daemon", "--interval", "6h", "--no-initial-run"]);
        match cli.command {
            Commands::Daemon {
                interval,
                no_initial_run,
            } => {
                assert_eq!(interval.as_deref(), Some("6h"));
                assert!(no_initial_run);
            }
            _ => panic!("expected daemon"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["almanac", "preview", "--config", "/tmp/a.toml"]);
        assert!(matches!(cli.command, Commands::Preview));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/a.toml")));
    }
}
