// src/main.rs
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Builder;
use log::{error, info, warn, LevelFilter};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use stock_league::{
    leaderboard, merge, normalize, parse_response, AppConfig, LeagueError, Result, ScoringSystem,
    SymbolSearchCache,
};

#[derive(Parser)]
#[command(name = "stock_league", about = "Reconcile prediction league files")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "STOCK_LEAGUE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Canonicalize a stored users file, rewriting it when requested and needed
    Normalize {
        file: PathBuf,
        #[arg(long)]
        write: bool,
    },
    /// Merge an imported users file into an existing one
    Merge {
        existing: PathBuf,
        incoming: PathBuf,
        /// Usernames never taken from the imported file
        #[arg(long = "exclude")]
        exclude: Vec<String>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Rank users by one of the scoring systems
    Leaderboard {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = SystemArg::WinLoss)]
        system: SystemArg,
    },
    /// Interpret saved SYMBOL_SEARCH payloads, caching those that may be cached
    ParseSearch {
        /// Payload files; the file stem is used as the search keyword
        files: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SystemArg {
    WinLoss,
    Percent,
}

impl From<SystemArg> for ScoringSystem {
    fn from(arg: SystemArg) -> Self {
        match arg {
            SystemArg::WinLoss => ScoringSystem::WinLoss,
            SystemArg::Percent => ScoringSystem::PercentReturn,
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn run(cli: Cli, config: AppConfig) -> Result<()> {
    match cli.command {
        Command::Normalize { file, write } => {
            let outcome = normalize(&read_json(&file)?, Utc::now());
            if outcome.has_changes {
                info!("{} needs rewriting", file.display());
            }
            if write && outcome.has_changes {
                write_json(&outcome.normalized_users, Some(file.as_path()))
            } else {
                write_json(&outcome.normalized_users, None)
            }
        }
        Command::Merge {
            existing,
            incoming,
            exclude,
            output,
        } => {
            let current = normalize(&read_json(&existing)?, Utc::now()).normalized_users;
            let exclude: HashSet<String> = exclude.into_iter().collect();
            let outcome = merge(&current, &read_json(&incoming)?, &exclude, Utc::now());
            info!("Added: {:?}", outcome.added);
            info!("Updated: {:?}", outcome.updated);
            write_json(&outcome.merged_users, output.as_deref())
        }
        Command::Leaderboard { file, system } => {
            let users = normalize(&read_json(&file)?, Utc::now()).normalized_users;
            write_json(&leaderboard(&users, system.into()), None)
        }
        Command::ParseSearch { files } => {
            let mut cache = SymbolSearchCache::new(config.cache);
            for file in files {
                let keyword = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let response = parse_response(&read_json(&file)?);
                if response.is_cacheable {
                    cache.set(&keyword, &response.matches);
                } else if response.is_rate_limited {
                    warn!("{}: rate limited, not cached", keyword);
                }
                write_json(&response, None)?;
            }
            info!("{} search result(s) cached", cache.size());
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    Builder::new()
        .filter_level(LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::Info))
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    if let Err(e) = run(cli, config) {
        match e {
            LeagueError::Json(_) => error!("Malformed JSON input: {}", e),
            _ => error!("{}", e),
        }
        std::process::exit(1);
    }
}
