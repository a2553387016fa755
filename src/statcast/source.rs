use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use csv::ReaderBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, error, info, warn};

use crate::cache::Cache;
use crate::statcast::metrics::{aggregate, PlayerMetrics};
use crate::statcast::pitch_event::{PitchEvent, StatcastRow};

pub const DEFAULT_STATCAST_URL: &str = "https://baseballsavant.mlb.com/statcast_search/csv";

/// Columns every Statcast export carries. A body missing any of them is an error
/// page or a truncated response, not pitch data.
const REQUIRED_COLUMNS: [&str; 3] = ["pitch_type", "description", "events"];

#[derive(
    Debug, Eq, PartialEq, Copy, Clone, Hash, Display, EnumString, Serialize, Deserialize,
    clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Batter,
    Pitcher,
}

impl Role {
    const fn lookup_param(self) -> &'static str {
        match self {
            Self::Batter => "batters_lookup[]",
            Self::Pitcher => "pitchers_lookup[]",
        }
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            bail!("Start date {start} is after end date {end}");
        }
        Ok(Self { start, end })
    }

    /// Fills in missing bounds: the end defaults to today, the start to March 1 of the end's year.
    pub fn with_defaults(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        let end = end.unwrap_or_else(|| Local::now().date_naive());
        let start = match start {
            Some(s) => s,
            None => NaiveDate::from_ymd_opt(end.year(), 3, 1)
                .context("Could not build default season start")?,
        };
        // Early-year end dates fall before the default season start; use the prior season
        let start = if start > end {
            NaiveDate::from_ymd_opt(end.year() - 1, 3, 1).unwrap_or(start)
        } else {
            start
        };
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Supplies the raw pitch events for one player over a date range.
pub trait PitchEventSource: Send + Sync {
    fn pitch_events(
        &self,
        player_id: &str,
        role: Role,
        range: &DateRange,
    ) -> Result<Vec<PitchEvent>>;
}

/// Parses a Statcast CSV export into pitch events. Rows never get dropped; blank
/// fields fall back to placeholder categories. A body without the Statcast header
/// columns is rejected outright.
pub fn parse_statcast_csv<R: Read>(reader: R) -> Result<Vec<PitchEvent>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    // Savant prefixes its exports with a byte-order mark on the first header
    let cleaned = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim_matches('"'))
        .collect::<csv::StringRecord>();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|&&c| !cleaned.iter().any(|h| h == c))
    {
        bail!("Statcast response has no '{missing}' column; not a Statcast export");
    }
    rdr.set_headers(cleaned);

    let mut events = Vec::new();
    for (line, row) in rdr.deserialize::<StatcastRow>().enumerate() {
        let row = row.with_context(|| format!("Malformed Statcast row {}", line + 1))?;
        events.push(PitchEvent::from(row));
    }
    Ok(events)
}

pub struct SavantClient {
    agent: ureq::Agent,
    base_url: String,
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
}

impl SavantClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        cache: Arc<dyn Cache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: String::from(base_url),
            cache,
            cache_ttl,
        }
    }

    fn cache_key(player_id: &str, role: Role, range: &DateRange) -> String {
        format!("statcast:{role}:{player_id}:{}:{}", range.start, range.end)
    }

    fn fetch_csv(&self, player_id: &str, role: Role, range: &DateRange) -> Result<String> {
        info!(
            "Fetching Statcast pitches for {role} {player_id} ({} to {})",
            range.start, range.end
        );
        let start = range.start.format("%Y-%m-%d").to_string();
        let end = range.end.format("%Y-%m-%d").to_string();
        let response = self
            .agent
            .get(&self.base_url)
            .query("all", "true")
            .query("hfGT", "R|PO|S|")
            .query("player_type", &role.to_string())
            .query(role.lookup_param(), player_id)
            .query("game_date_gt", &start)
            .query("game_date_lt", &end)
            .query("min_pitches", "0")
            .query("min_results", "0")
            .query("group_by", "name")
            .query("type", "details")
            .call()
            .with_context(|| format!("Statcast request failed for {role} {player_id}"))?;
        // Season-long exports can exceed ureq's into_string limit
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .context("Statcast response was not valid text")?;
        Ok(body)
    }
}

fn parse_body(body: &str) -> Result<Vec<PitchEvent>> {
    if body.trim().is_empty() {
        return Ok(vec![]);
    }
    parse_statcast_csv(body.as_bytes())
}

impl PitchEventSource for SavantClient {
    fn pitch_events(
        &self,
        player_id: &str,
        role: Role,
        range: &DateRange,
    ) -> Result<Vec<PitchEvent>> {
        let key = Self::cache_key(player_id, role, range);
        if let Some(body) = self.cache.get(&key) {
            debug!("Cache hit for {key}");
            return parse_body(&body);
        }
        let body = self.fetch_csv(player_id, role, range)?;
        // Only bodies that parse are worth keeping
        let events = parse_body(&body)?;
        self.cache.put(&key, body, self.cache_ttl);
        Ok(events)
    }
}

/// A fixed batch of events, such as a local Statcast export, held in pitch order.
/// Events outside the requested range are filtered when they carry a game date.
pub struct InMemorySource {
    events: Vec<PitchEvent>,
}

impl InMemorySource {
    pub fn new(mut events: Vec<PitchEvent>) -> Self {
        // Savant exports run newest first
        events.sort_by_key(PitchEvent::sequence_key);
        Self { events }
    }
}

impl PitchEventSource for InMemorySource {
    fn pitch_events(
        &self,
        _player_id: &str,
        _role: Role,
        range: &DateRange,
    ) -> Result<Vec<PitchEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.game_date.map_or(true, |d| range.contains(d)))
            .cloned()
            .collect())
    }
}

/// Fetches and aggregates metrics for one player. Source failures and empty
/// batches both come back as an empty map; neither is an error for the caller.
pub fn player_metrics(
    source: &dyn PitchEventSource,
    player_id: &str,
    role: Role,
    range: &DateRange,
) -> PlayerMetrics {
    let events = match source.pitch_events(player_id, role, range) {
        Ok(events) => events,
        Err(e) => {
            error!("Error fetching Statcast data for {role} {player_id}: {e:?}");
            return PlayerMetrics::new();
        }
    };
    if events.is_empty() {
        warn!(
            "No Statcast data found for {role} {player_id} between {} and {}",
            range.start, range.end
        );
        return PlayerMetrics::new();
    }
    debug!("Aggregating {} pitches for {role} {player_id}", events.len());
    aggregate(player_id, &events)
}

/// Runs `player_metrics` for every id in parallel. Each player's batch is fetched
/// and aggregated independently.
pub fn player_metrics_many(
    source: &dyn PitchEventSource,
    player_ids: &[String],
    role: Role,
    range: &DateRange,
) -> BTreeMap<String, PlayerMetrics> {
    player_ids
        .par_iter()
        .map(|id| (id.clone(), player_metrics(source, id, role, range)))
        .collect()
}
