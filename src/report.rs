use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::statcast::matchup::MatchupDelta;
use crate::statcast::metrics::PlayerMetrics;
use crate::statcast::pitch_event::PitchTypeCode;
use crate::statsapi::lineup::Lineup;
use crate::game::BatterMatchup;
use crate::statsapi::schedule::ScheduledGame;

pub const METRICS_UNAVAILABLE: &str = "metrics unavailable";
pub const MAX_PRECISION: u8 = 10;

lazy_static! {
    static ref PITCH_NAMES: HashMap<&'static str, &'static str> = HashMap::from([
        ("FF", "4-Seam Fastball"),
        ("SL", "Slider"),
        ("CH", "Changeup"),
        ("CU", "Curveball"),
        ("SI", "Sinker"),
        ("FC", "Cutter"),
        ("FS", "Splitter"),
        ("FT", "2-Seam Fastball"),
        ("KC", "Knuckle Curve"),
        ("ST", "Sweeper"),
        ("SV", "Slurve"),
    ]);
}

/// Display name for a pitch type: the standard name when the code is a common one,
/// otherwise whatever Savant reported, otherwise the code itself.
pub fn pitch_name<'a>(code: &'a PitchTypeCode, reported: Option<&'a str>) -> &'a str {
    PITCH_NAMES
        .get(code.as_str())
        .copied()
        .or(reported)
        .unwrap_or(code.as_str())
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Display, EnumString, clap::ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Copy, Clone)]
pub struct Rounding {
    factor: f64,
}

impl Rounding {
    pub fn new(precision: u8) -> Self {
        Self {
            factor: 10_f64.powi(i32::from(precision.min(MAX_PRECISION))),
        }
    }

    pub fn apply(self, value: f64) -> f64 {
        (value * self.factor).round() / self.factor
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub struct MetricRow<'a> {
    player_id: &'a str,
    pitch_type: &'a str,
    pitch_name: &'a str,
    plate_appearances: u32,
    at_bats: u32,
    hits: u32,
    strikeout_rate: f64,
    whiff_rate: f64,
    put_away_rate: f64,
    on_base_average: f64,
    slugging: f64,
}

pub fn metric_rows(metrics: &PlayerMetrics, rounding: Rounding) -> Vec<MetricRow<'_>> {
    metrics
        .iter()
        .map(|(code, r)| MetricRow {
            player_id: &r.player_id,
            pitch_type: code.as_str(),
            pitch_name: pitch_name(code, r.pitch_name.as_deref()),
            plate_appearances: r.total_plate_appearances,
            at_bats: r.at_bats(),
            hits: r.hits,
            strikeout_rate: rounding.apply(r.strikeout_rate),
            whiff_rate: rounding.apply(r.whiff_rate),
            put_away_rate: rounding.apply(r.put_away_rate),
            on_base_average: rounding.apply(r.on_base_average),
            slugging: rounding.apply(r.slugging),
        })
        .collect()
}

/// Rows for every player, in player id order.
pub fn all_metric_rows(
    metrics: &BTreeMap<String, PlayerMetrics>,
    rounding: Rounding,
) -> Vec<MetricRow<'_>> {
    metrics
        .values()
        .flat_map(|m| metric_rows(m, rounding))
        .collect()
}

#[derive(Debug, PartialEq, Serialize)]
pub struct MatchupRow<'a> {
    pitch_type: &'a str,
    pitch_name: &'a str,
    strikeout_rate_pitcher: f64,
    strikeout_rate_batter: f64,
    strikeout_rate_delta: f64,
    whiff_rate_pitcher: f64,
    whiff_rate_batter: f64,
    whiff_rate_delta: f64,
    put_away_rate_pitcher: f64,
    put_away_rate_batter: f64,
    put_away_rate_delta: f64,
    on_base_average_pitcher: f64,
    on_base_average_batter: f64,
    on_base_average_delta: f64,
    slugging_pitcher: f64,
    slugging_batter: f64,
    slugging_delta: f64,
}

pub fn matchup_rows(delta: &MatchupDelta, rounding: Rounding) -> Vec<MatchupRow<'_>> {
    let r = |v: f64| rounding.apply(v);
    delta
        .iter()
        .map(|(code, row)| MatchupRow {
            pitch_type: code.as_str(),
            pitch_name: pitch_name(code, row.pitcher.pitch_name.as_deref()),
            strikeout_rate_pitcher: r(row.pitcher.strikeout_rate),
            strikeout_rate_batter: r(row.batter.strikeout_rate),
            strikeout_rate_delta: r(row.delta.strikeout_rate),
            whiff_rate_pitcher: r(row.pitcher.whiff_rate),
            whiff_rate_batter: r(row.batter.whiff_rate),
            whiff_rate_delta: r(row.delta.whiff_rate),
            put_away_rate_pitcher: r(row.pitcher.put_away_rate),
            put_away_rate_batter: r(row.batter.put_away_rate),
            put_away_rate_delta: r(row.delta.put_away_rate),
            on_base_average_pitcher: r(row.pitcher.on_base_average),
            on_base_average_batter: r(row.batter.on_base_average),
            on_base_average_delta: r(row.delta.on_base_average),
            slugging_pitcher: r(row.pitcher.slugging),
            slugging_batter: r(row.batter.slugging),
            slugging_delta: r(row.delta.slugging),
        })
        .collect()
}

#[derive(Debug, PartialEq, Serialize)]
pub struct GameRow<'a> {
    side: String,
    order: u8,
    batter_id: u32,
    batter: &'a str,
    pitcher_id: u32,
    pitcher: &'a str,
    pitch_type: &'a str,
    pitch_name: &'a str,
    strikeout_rate_pitcher: f64,
    strikeout_rate_batter: f64,
    strikeout_rate_delta: f64,
    whiff_rate_pitcher: f64,
    whiff_rate_batter: f64,
    whiff_rate_delta: f64,
    put_away_rate_pitcher: f64,
    put_away_rate_batter: f64,
    put_away_rate_delta: f64,
    on_base_average_pitcher: f64,
    on_base_average_batter: f64,
    on_base_average_delta: f64,
    slugging_pitcher: f64,
    slugging_batter: f64,
    slugging_delta: f64,
}

/// One row per batter and shared pitch type, in lineup order.
pub fn game_rows(matchups: &[BatterMatchup], rounding: Rounding) -> Vec<GameRow<'_>> {
    let r = |v: f64| rounding.apply(v);
    matchups
        .iter()
        .flat_map(|m| {
            m.delta.iter().map(move |(code, row)| GameRow {
                side: m.side.to_string(),
                order: m.batter.order,
                batter_id: m.batter.player_id,
                batter: &m.batter.full_name,
                pitcher_id: m.pitcher.id,
                pitcher: &m.pitcher.full_name,
                pitch_type: code.as_str(),
                pitch_name: pitch_name(code, row.pitcher.pitch_name.as_deref()),
                strikeout_rate_pitcher: r(row.pitcher.strikeout_rate),
                strikeout_rate_batter: r(row.batter.strikeout_rate),
                strikeout_rate_delta: r(row.delta.strikeout_rate),
                whiff_rate_pitcher: r(row.pitcher.whiff_rate),
                whiff_rate_batter: r(row.batter.whiff_rate),
                whiff_rate_delta: r(row.delta.whiff_rate),
                put_away_rate_pitcher: r(row.pitcher.put_away_rate),
                put_away_rate_batter: r(row.batter.put_away_rate),
                put_away_rate_delta: r(row.delta.put_away_rate),
                on_base_average_pitcher: r(row.pitcher.on_base_average),
                on_base_average_batter: r(row.batter.on_base_average),
                on_base_average_delta: r(row.delta.on_base_average),
                slugging_pitcher: r(row.pitcher.slugging),
                slugging_batter: r(row.batter.slugging),
                slugging_delta: r(row.delta.slugging),
            })
        })
        .collect()
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ScheduleRow<'a> {
    game_pk: u64,
    start_time: String,
    status: &'a str,
    away: &'a str,
    home: &'a str,
    away_pitcher: &'a str,
    home_pitcher: &'a str,
}

pub fn schedule_rows(games: &[ScheduledGame]) -> Vec<ScheduleRow<'_>> {
    games
        .iter()
        .map(|g| ScheduleRow {
            game_pk: g.game_pk,
            start_time: g.game_date.format("%Y-%m-%d %H:%M UTC").to_string(),
            status: &g.status,
            away: &g.away,
            home: &g.home,
            away_pitcher: g.away_pitcher_name(),
            home_pitcher: g.home_pitcher_name(),
        })
        .collect()
}

#[derive(Debug, PartialEq, Serialize)]
pub struct LineupRow<'a> {
    side: String,
    team: &'a str,
    order: u8,
    player_id: u32,
    full_name: &'a str,
    position: &'a str,
}

pub fn lineup_rows<'a>(lineups: &[&'a Lineup]) -> Vec<LineupRow<'a>> {
    lineups
        .iter()
        .flat_map(|&l| {
            l.slots.iter().map(move |s| LineupRow {
                side: l.side.to_string(),
                team: &l.team,
                order: s.order,
                player_id: s.player_id,
                full_name: &s.full_name,
                position: &s.position,
            })
        })
        .collect()
}

pub fn write_rows<T: Serialize, W: Write>(rows: &[T], format: OutputFormat, out: W) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for row in rows {
                writer.serialize(row).context("Failed to write row")?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            let mut out = out;
            serde_json::to_writer_pretty(&mut out, rows).context("Failed to write JSON")?;
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statcast::matchup::matchup;
    use crate::statcast::metrics::aggregate;
    use crate::statcast::pitch_event::EventOutcome::{FieldOut, NoEvent, Single, Strikeout};
    use crate::statcast::pitch_event::PitchEvent;
    use crate::statsapi::lineup::{LineupSlot, Side};
    use crate::statsapi::schedule::ProbablePitcher;

    fn sample_metrics() -> PlayerMetrics {
        aggregate(
            "660271",
            &[
                PitchEvent::new("SL", Strikeout, "swinging_strike", 2),
                PitchEvent::new("SL", FieldOut, "hit_into_play", 0),
                PitchEvent::new("SL", Single, "hit_into_play", 1),
                PitchEvent::new("XX", NoEvent, "ball", 0),
            ],
        )
    }

    #[test]
    fn test_pitch_names() {
        let four_seam = PitchTypeCode::from("FF");
        assert_eq!(pitch_name(&four_seam, Some("Four-Seamer")), "4-Seam Fastball");
        let eephus = PitchTypeCode::from("ep");
        assert_eq!(pitch_name(&eephus, Some("Eephus")), "Eephus");
        assert_eq!(pitch_name(&eephus, None), "EP");
    }

    #[test]
    fn test_rounding() {
        let r = Rounding::new(3);
        assert_eq!(r.apply(100.0 / 3.0), 33.333);
        assert_eq!(Rounding::new(0).apply(2.5), 3.0);
        assert_eq!(Rounding::new(u8::MAX).apply(0.5), 0.5);
    }

    #[test]
    fn test_metrics_csv() {
        let metrics = sample_metrics();
        let mut out = Vec::new();
        let rows = metric_rows(&metrics, Rounding::new(2));
        write_rows(&rows, OutputFormat::Csv, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            "player_id,pitch_type,pitch_name,plate_appearances,at_bats,hits,\
             strikeout_rate,whiff_rate,put_away_rate,on_base_average,slugging"
        );
        assert_eq!(lines[1], "660271,SL,Slider,3,3,1,33.33,66.67,100.0,0.33,0.33");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_matchup_json() {
        let batter = sample_metrics();
        let pitcher = aggregate("1", &[PitchEvent::new("SL", Strikeout, "called_strike", 2)]);
        let delta = matchup(&batter, &pitcher);
        let mut out = Vec::new();
        write_rows(&matchup_rows(&delta, Rounding::new(3)), OutputFormat::Json, &mut out).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["pitch_type"], "SL");
        assert_eq!(parsed[0]["strikeout_rate_pitcher"], 100.0);
        assert_eq!(parsed[0]["strikeout_rate_delta"], -66.667);
    }

    #[test]
    fn test_game_rows_label_batter_and_pitcher() {
        let matchups = vec![BatterMatchup {
            side: Side::Away,
            batter: LineupSlot {
                order: 3,
                player_id: 660_271,
                full_name: String::from("Shohei Ohtani"),
                position: String::from("DH"),
            },
            pitcher: ProbablePitcher {
                id: 1,
                full_name: String::from("Some Pitcher"),
            },
            delta: matchup(
                &sample_metrics(),
                &aggregate("1", &[PitchEvent::new("SL", Strikeout, "called_strike", 2)]),
            ),
        }];
        let mut out = Vec::new();
        write_rows(&game_rows(&matchups, Rounding::new(3)), OutputFormat::Csv, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("side,order,batter_id,batter,pitcher_id,pitcher,pitch_type,"));
        let expected = "away,3,660271,Shohei Ohtani,1,Some Pitcher,SL,Slider,100.0,";
        assert!(lines[1].starts_with(expected));
    }
}
