#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::cargo)]
#![warn(
    clippy::nursery,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{stdout, BufReader};
use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::{Command, Config, DateArgs, Opt};
use crate::game::{game_matchups, game_preview};
use crate::report::{
    all_metric_rows, game_rows, lineup_rows, matchup_rows, schedule_rows, write_rows,
};
use crate::statcast::matchup::matchup;
use crate::statcast::metrics::PlayerMetrics;
use crate::statcast::source::{
    parse_statcast_csv, player_metrics, player_metrics_many, DateRange, InMemorySource, Role,
    SavantClient,
};
use crate::statsapi::lineup::lineups_for;
use crate::statsapi::lookup::{PlayerLookup, StatsApiLookup};
use crate::statsapi::schedule::schedule_for;
use crate::statsapi::StatsApiClient;

mod cache;
mod config;
mod game;
mod report;
mod statcast;
mod statsapi;

struct App {
    config: Config,
    savant: SavantClient,
    statsapi: StatsApiClient,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let cache = config.build_cache()?;
        let savant = SavantClient::new(
            &config.statcast_url,
            config.timeout,
            cache.clone(),
            config.cache_ttl,
        );
        let statsapi =
            StatsApiClient::new(&config.statsapi_url, config.timeout, cache, config.cache_ttl);
        Ok(Self {
            config,
            savant,
            statsapi,
        })
    }

    /// Accepts either a numeric MLBAM id or a "First Last" name.
    fn resolve_player(&self, player: &str) -> Result<String> {
        let player = player.trim();
        if !player.is_empty() && player.chars().all(|c| c.is_ascii_digit()) {
            return Ok(player.to_string());
        }
        StatsApiLookup::new(&self.statsapi)
            .lookup_full_name(player)?
            .map(|id| id.to_string())
            .with_context(|| format!("No player found for '{player}'"))
    }

    fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Metrics {
                role,
                player_ids,
                names,
                events_csv,
                dates,
            } => match events_csv {
                Some(path) => self.local_metrics(&path, role, &dates),
                None => self.metrics(player_ids, &names, role, &dates),
            },
            Command::Matchup {
                batter,
                pitcher,
                dates,
            } => self.matchup(&batter, &pitcher, &dates),
            Command::Schedule { date } => {
                self.schedule(date.unwrap_or_else(|| Local::now().date_naive()))
            }
            Command::Lineup { game } => self.lineup(game),
            Command::Game { game, dates } => self.game(game, &dates),
        }
    }

    fn metrics(
        &self,
        mut player_ids: Vec<String>,
        names: &[String],
        role: Role,
        dates: &DateArgs,
    ) -> Result<()> {
        for name in names {
            player_ids.push(self.resolve_player(name)?);
        }
        if player_ids.is_empty() {
            bail!("Provide at least one --player-id, --name or --events-csv");
        }
        let range = DateRange::with_defaults(dates.start, dates.end)?;
        info!(
            "Fetching {role} metrics for {} player(s) from {} to {}",
            player_ids.len(),
            range.start,
            range.end
        );
        let metrics = player_metrics_many(&self.savant, &player_ids, role, &range);
        self.write_metrics(&metrics)
    }

    fn local_metrics(&self, path: &Path, role: Role, dates: &DateArgs) -> Result<()> {
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let events = parse_statcast_csv(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        debug!("Read {} pitches from {}", events.len(), path.display());
        let label = path
            .file_stem()
            .map_or_else(|| String::from("local"), |s| s.to_string_lossy().into_owned());
        let range = DateRange::with_defaults(dates.start, dates.end)?;
        let source = InMemorySource::new(events);
        let metrics = BTreeMap::from([(
            label.clone(),
            player_metrics(&source, &label, role, &range),
        )]);
        self.write_metrics(&metrics)
    }

    fn write_metrics(&self, metrics: &BTreeMap<String, PlayerMetrics>) -> Result<()> {
        if metrics.values().all(BTreeMap::is_empty) {
            bail!("No pitch data for any requested player");
        }
        let rows = all_metric_rows(metrics, self.config.rounding);
        write_rows(&rows, self.config.format, stdout().lock())
    }

    fn matchup(&self, batter: &str, pitcher: &str, dates: &DateArgs) -> Result<()> {
        let batter_id = self.resolve_player(batter)?;
        let pitcher_id = self.resolve_player(pitcher)?;
        let range = DateRange::with_defaults(dates.start, dates.end)?;
        info!("Comparing batter {batter_id} against pitcher {pitcher_id}");
        let (batter_metrics, pitcher_metrics) = rayon::join(
            || player_metrics(&self.savant, &batter_id, Role::Batter, &range),
            || player_metrics(&self.savant, &pitcher_id, Role::Pitcher, &range),
        );
        let delta = matchup(&batter_metrics, &pitcher_metrics);
        if delta.is_empty() {
            bail!("Batter {batter_id} and pitcher {pitcher_id} share no pitch types");
        }
        write_rows(
            &matchup_rows(&delta, self.config.rounding),
            self.config.format,
            stdout().lock(),
        )
    }

    fn schedule(&self, date: NaiveDate) -> Result<()> {
        let games = schedule_for(&self.statsapi, date)?;
        if games.is_empty() {
            warn!("No games scheduled on {date}");
        }
        for game in &games {
            debug!("{} ({})", game.matchup(), game.game_pk);
        }
        write_rows(&schedule_rows(&games), self.config.format, stdout().lock())
    }

    fn lineup(&self, game_pk: u64) -> Result<()> {
        let (away, home) = lineups_for(&self.statsapi, game_pk)?;
        for lineup in [&away, &home] {
            if !lineup.is_posted() {
                warn!("{} lineup for game {game_pk} has not been posted", lineup.side);
            }
        }
        write_rows(&lineup_rows(&[&away, &home]), self.config.format, stdout().lock())
    }

    fn game(&self, game_pk: u64, dates: &DateArgs) -> Result<()> {
        let preview = game_preview(&self.statsapi, game_pk)?;
        for lineup in [&preview.away, &preview.home] {
            if !lineup.is_posted() {
                warn!("{} lineup for game {game_pk} has not been posted", lineup.side);
            }
        }
        let range = DateRange::with_defaults(dates.start, dates.end)?;
        info!(
            "Comparing {} @ {} lineups against the opposing starters",
            preview.away.team, preview.home.team
        );
        let matchups = game_matchups(&preview, &self.savant, &range);
        let rows = game_rows(&matchups, self.config.rounding);
        if rows.is_empty() {
            bail!("No batter in game {game_pk} shares a pitch type with the opposing starter");
        }
        write_rows(&rows, self.config.format, stdout().lock())
    }
}

fn run(opt: Opt) -> Result<()> {
    let config = Config::from(&opt.global);
    if config.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }
    App::new(config)?.run(opt.command)
}

#[allow(clippy::expect_used)]
fn main() {
    let opt: Opt = Opt::parse();
    let level = if opt.global.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to initialize trace");

    let start = Instant::now();
    let failure_message = opt.command.failure_message();
    if let Err(e) = run(opt) {
        error!("{e:?}");
        eprintln!("{failure_message}");
        std::process::exit(1);
    }
    info!("Elapsed: {:?}", start.elapsed());
}
