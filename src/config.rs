use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::cache::{Cache, CacheKind, DiskCache, MemoryCache, NoCache};
use crate::report::{OutputFormat, Rounding, MAX_PRECISION, METRICS_UNAVAILABLE};
use crate::statcast::source::{Role, DEFAULT_STATCAST_URL};
use crate::statsapi::DEFAULT_STATSAPI_URL;

const ABOUT: &str = "Per-pitch-type batting and pitching metrics from Statcast pitch data.";
const MEMORY_CACHE_CAPACITY: usize = 512;

#[derive(Parser, Debug)]
#[command(name = "pitchmix", about = ABOUT)]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalOpt,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalOpt {
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Decimal places for rates in the output
    #[arg(
        long,
        global = true,
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(0..=i64::from(MAX_PRECISION))
    )]
    pub precision: u8,

    #[arg(long, global = true, value_enum, default_value_t = CacheKind::Memory)]
    pub cache: CacheKind,

    #[arg(long, global = true, env = "PITCHMIX_CACHE_DIR", default_value = "cached_responses")]
    pub cache_dir: PathBuf,

    /// Seconds before a cached response is refetched
    #[arg(long, global = true, default_value_t = 600)]
    pub cache_ttl: u64,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Worker threads for multi-player requests; 0 lets rayon decide
    #[arg(long, global = true, default_value_t = 0)]
    pub threads: usize,

    #[arg(long, global = true, env = "PITCHMIX_STATCAST_URL", default_value = DEFAULT_STATCAST_URL)]
    pub statcast_url: String,

    #[arg(long, global = true, env = "PITCHMIX_STATSAPI_URL", default_value = DEFAULT_STATSAPI_URL)]
    pub statsapi_url: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DateArgs {
    /// First game date to include (YYYY-MM-DD); defaults to March 1 of the end date's season
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last game date to include (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Per-pitch-type metrics for one or more players
    Metrics {
        #[arg(long, value_enum)]
        role: Role,

        #[arg(long = "player-id", conflicts_with = "events_csv")]
        player_ids: Vec<String>,

        /// "First Last", resolved through the Stats API
        #[arg(long = "name", conflicts_with = "events_csv")]
        names: Vec<String>,

        /// Aggregate a local Statcast CSV export instead of fetching
        #[arg(long)]
        events_csv: Option<PathBuf>,

        #[command(flatten)]
        dates: DateArgs,
    },
    /// Batter versus pitcher deltas on the pitch types both have seen
    Matchup {
        #[arg(long)]
        batter: String,

        #[arg(long)]
        pitcher: String,

        #[command(flatten)]
        dates: DateArgs,
    },
    /// Games and probable pitchers for a date
    Schedule {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Starting lineups for a game
    Lineup {
        #[arg(long)]
        game: u64,
    },
    /// Every starting batter in a game against the opposing starting pitcher
    Game {
        #[arg(long)]
        game: u64,

        #[command(flatten)]
        dates: DateArgs,
    },
}

impl Command {
    /// What gets printed when the command cannot produce its table.
    pub const fn failure_message(&self) -> &'static str {
        match self {
            Self::Metrics { .. } | Self::Matchup { .. } | Self::Game { .. } => METRICS_UNAVAILABLE,
            Self::Schedule { .. } => "schedule unavailable",
            Self::Lineup { .. } => "lineup unavailable",
        }
    }
}

/// Settings shared by every collaborator, built once from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub statcast_url: String,
    pub statsapi_url: String,
    pub timeout: Duration,
    pub cache_kind: CacheKind,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub format: OutputFormat,
    pub rounding: Rounding,
    pub threads: usize,
}

impl From<&GlobalOpt> for Config {
    fn from(opt: &GlobalOpt) -> Self {
        Self {
            statcast_url: opt.statcast_url.clone(),
            statsapi_url: opt.statsapi_url.clone(),
            timeout: Duration::from_secs(opt.timeout),
            cache_kind: opt.cache,
            cache_dir: opt.cache_dir.clone(),
            cache_ttl: Duration::from_secs(opt.cache_ttl),
            format: opt.format,
            rounding: Rounding::new(opt.precision),
            threads: opt.threads,
        }
    }
}

impl Config {
    pub fn build_cache(&self) -> Result<Arc<dyn Cache>> {
        debug!("Using {} cache", self.cache_kind);
        Ok(match self.cache_kind {
            CacheKind::Memory => Arc::new(MemoryCache::new(MEMORY_CACHE_CAPACITY)),
            CacheKind::Disk => Arc::new(DiskCache::new(&self.cache_dir)?),
            CacheKind::None => Arc::new(NoCache),
        })
    }
}
