mod api;
mod commands;
mod config;
mod ui;

use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "feeder")]
#[command(about = "Play the feeder clicker game from your terminal")]
#[command(version)]
#[command(after_help = "Examples:
  feeder --player alice feed            Click once
  feeder feed --times 30 --every 2s     Click 30 times, one every 2 seconds
  feeder shop                           See auto-feeders for sale
  feeder buy 1                          Buy an auto-feeder of type 1
  feeder top --watch                    Watch the leaderboard

Set FEEDER_PLAYER to skip --player, FEEDER_API_URL to point at another server.")]
struct Cli {
    /// Player name (defaults to FEEDER_PLAYER)
    #[arg(short, long, global = true)]
    player: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Click the feeder: one point per click
    #[command(after_help = "Examples:
  feeder feed
  feeder feed --times 10
  feeder feed --times 60 --every 1s")]
    Feed {
        /// How many clicks to send
        #[arg(short = 'n', long, default_value_t = 1)]
        times: u32,
        /// Pause between clicks (e.g. 500ms, 2s)
        #[arg(short, long, value_parser = parse_interval)]
        every: Option<Duration>,
    },

    /// Buy an auto-feeder that earns points every minute
    #[command(after_help = "Example: feeder buy 1")]
    Buy {
        /// Auto-feeder type from `feeder shop`
        feeder_type: u32,
    },

    /// Show the leaderboard
    #[command(after_help = "Examples:
  feeder top
  feeder top --watch
  feeder top --watch --every 5s")]
    Top {
        /// Keep refreshing until Ctrl+C
        #[arg(short, long)]
        watch: bool,
        /// Refresh interval for --watch
        #[arg(short, long, default_value = "1s", value_parser = parse_interval)]
        every: Duration,
    },

    /// List auto-feeders for sale
    #[command(after_help = "Example: feeder shop")]
    Shop,

    /// Show your score and auto-feeders
    #[command(after_help = "Example: feeder --player alice me")]
    Me,

    /// Generate shell completions
    #[command(after_help = "Examples:
  feeder completions bash > ~/.bash_completion.d/feeder
  feeder completions zsh > ~/.zfunc/_feeder
  feeder completions fish > ~/.config/fish/completions/feeder.fish")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Parses a humantime duration such as `500ms` or `2s`, rejecting zero.
fn parse_interval(value: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(value).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        ui::print_error(&err);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = envy::prefixed("FEEDER_").from_env::<Config>()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Feed { times, every } => {
            let player = config.player(cli.player)?;
            commands::feed::run(&config, &player, times, every).await
        }
        Commands::Buy { feeder_type } => {
            let player = config.player(cli.player)?;
            commands::buy::run(&config, &player, feeder_type).await
        }
        Commands::Top { watch, every } => {
            if watch {
                commands::top::watch(&config, every).await
            } else {
                commands::top::run(&config).await
            }
        }
        Commands::Shop => commands::shop::run(&config).await,
        Commands::Me => {
            let player = config.player(cli.player)?;
            commands::me::run(&config, &player).await
        }
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "feeder", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn feed_parses_times_and_interval() {
        let cli = Cli::parse_from(["feeder", "-p", "alice", "feed", "-n", "3", "--every", "2s"]);

        assert_eq!(cli.player.as_deref(), Some("alice"));
        let Commands::Feed { times, every } = cli.command else {
            panic!("Expected feed");
        };
        assert_eq!(times, 3);
        assert_eq!(every, Some(Duration::from_secs(2)));
    }

    #[test]
    fn top_defaults_to_one_second_refresh() {
        let cli = Cli::parse_from(["feeder", "top", "--watch"]);

        let Commands::Top { watch, every } = cli.command else {
            panic!("Expected top");
        };
        assert!(watch);
        assert_eq!(every, Duration::from_secs(1));
    }

    #[test]
    fn zero_refresh_interval_is_rejected() {
        let result = Cli::try_parse_from(["feeder", "top", "--watch", "--every", "0s"]);

        assert!(result.is_err());
    }

    #[test]
    fn zero_feed_interval_is_rejected() {
        let result = Cli::try_parse_from(["feeder", "feed", "--every", "0ms"]);

        assert!(result.is_err());
    }

    #[test]
    fn player_flag_is_global() {
        let cli = Cli::parse_from(["feeder", "buy", "2", "--player", "bob"]);

        assert_eq!(cli.player.as_deref(), Some("bob"));
    }
}
