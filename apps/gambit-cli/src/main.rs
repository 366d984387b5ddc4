use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use gambit_matchmaking::{Matchmaker, OpponentScheduler};
use gambit_ops::{ensure_data_dir, init_tracing, matchmaking_file};
use gambit_types::{config::GambitConfig, game::PerfType, matchmaking::MatchmakingType};
use tracing::info;

#[derive(Parser)]
#[command(name = "gambit", about = "Matchmaking administration for the Gambit chess bot")]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(short, long, env = "GAMBIT_CONFIG", default_value = "configs/dev.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the configuration and print the matchmaking types.
    Check,
    /// List stored opponents of a performance category.
    Opponents {
        #[arg(long, default_value = "blitz")]
        perf: String,
    },
    /// Release every stored opponent of a performance category immediately.
    Reset {
        #[arg(long)]
        perf: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = GambitConfig::from_file(&cli.config)?;
    config
        .validate()
        .with_context(|| format!("invalid config in '{}'", cli.config.display()))?;
    init_tracing(&config.ops)?;

    match cli.command {
        Command::Check => {
            for mm in config.matchmaking.types.iter().map(MatchmakingType::from_config) {
                println!(
                    "{}     Estimated: {}s",
                    mm.to_str(),
                    mm.estimated_game_duration().as_secs()
                );
            }
            if !config.matchmaking.blacklist.is_empty() {
                println!("Blacklisted: {}", config.matchmaking.blacklist.join(", "));
            }
            Ok(())
        }
        Command::Opponents { perf } => {
            let perf = parse_perf(&perf)?;
            let matchmaker = open_matchmaker(&config)?;
            let now = Utc::now();
            for (username, record) in matchmaker.scheduler().store().in_category(perf) {
                let status = if record.release_time <= now {
                    "available".to_string()
                } else {
                    format!(
                        "cooling down until {}",
                        record.release_time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                    )
                };
                println!(
                    "{username:<24} x{:<3} next as {:<5} {status}",
                    record.multiplier, record.next_color
                );
            }
            Ok(())
        }
        Command::Reset { perf } => {
            let perf = parse_perf(&perf)?;
            let mut matchmaker = open_matchmaker(&config)?;
            matchmaker.scheduler_mut().reset_release_time(perf);
            matchmaker.scheduler().save()?;
            info!(%perf, "Matchmaking cooldowns reset");
            Ok(())
        }
    }
}

fn parse_perf(key: &str) -> Result<PerfType> {
    PerfType::from_key(key).ok_or_else(|| anyhow!("unknown performance category '{key}'"))
}

fn open_matchmaker(config: &GambitConfig) -> Result<Matchmaker> {
    ensure_data_dir(&config.ops.data_dir)?;
    let path = matchmaking_file(&config.ops.data_dir, &config.username);
    let scheduler = OpponentScheduler::load(
        path,
        Duration::from_secs(config.matchmaking.delay_secs),
    )?;
    Ok(Matchmaker::new(config, scheduler))
}
