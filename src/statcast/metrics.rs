use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::statcast::pitch_event::{EventOutcome, PitchEvent, PitchTypeCode};

/// Per-pitch-type metrics for a single player, ordered by pitch type code.
pub type PlayerMetrics = BTreeMap<PitchTypeCode, MetricRecord>;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MetricRecord {
    pub player_id: String,
    /// Name Savant reported for the pitch type, when any row carried one.
    pub pitch_name: Option<String>,
    pub strikeout_rate: f64,
    pub whiff_rate: f64,
    pub put_away_rate: f64,
    pub on_base_average: f64,
    pub slugging: f64,
    pub hits: u32,
    pub total_plate_appearances: u32,
    pub counts: PitchCounts,
}

/// Raw tallies for one pitch type. Rates in `MetricRecord` are derived from these.
#[derive(Debug, Default, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct PitchCounts {
    pub total: u32,
    pub hits: u32,
    pub walks: u32,
    pub hit_by_pitch: u32,
    pub strikeouts: u32,
    pub total_strikes: u32,
    pub swinging_strikes: u32,
    pub foul_balls: u32,
    pub field_outs: u32,
    pub total_bases: u32,
}

impl PitchCounts {
    fn tally(events: &[&PitchEvent]) -> Self {
        let mut counts = Self::default();
        for event in events {
            counts.add(event);
        }
        counts
    }

    fn add(&mut self, event: &PitchEvent) {
        let description = &event.description;
        self.total += 1;
        if event.event_outcome.is_hit() {
            self.hits += 1;
            self.total_bases += event.event_outcome.bases().unwrap_or_default();
        }
        if description.is_walk() {
            self.walks += 1;
        }
        if description.is_hit_by_pitch() {
            self.hit_by_pitch += 1;
        }
        if description.is_strike() {
            self.total_strikes += 1;
        }
        if description.is_foul() {
            self.foul_balls += 1;
            // A foul with two strikes leaves the count unchanged
            if event.strikes() < 2 {
                self.total_strikes += 1;
            }
        }
        if description.is_swinging_strike() {
            self.swinging_strikes += 1;
        }
        match event.event_outcome {
            EventOutcome::Strikeout => self.strikeouts += 1,
            EventOutcome::FieldOut => self.field_outs += 1,
            _ => {}
        }
    }

    pub const fn at_bats(&self) -> u32 {
        self.total
            .saturating_sub(self.walks)
            .saturating_sub(self.hit_by_pitch)
    }

    pub const fn total_swings(&self) -> u32 {
        self.swinging_strikes + self.foul_balls + self.field_outs + self.hits
    }

    pub fn strikeout_rate(&self) -> f64 {
        percentage(self.strikeouts, self.total)
    }

    pub fn put_away_rate(&self) -> f64 {
        percentage(self.strikeouts, self.total_strikes)
    }

    pub fn whiff_rate(&self) -> f64 {
        let swings = self.total_swings();
        let contact = self.hits + self.foul_balls;
        percentage(swings.saturating_sub(contact), swings)
    }

    pub fn on_base_average(&self) -> f64 {
        let on_base = self.hits + self.walks + self.hit_by_pitch;
        ratio(on_base, self.at_bats() + self.walks + self.hit_by_pitch)
    }

    pub fn slugging(&self) -> f64 {
        ratio(self.total_bases, self.at_bats())
    }
}

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}

fn percentage(numerator: u32, denominator: u32) -> f64 {
    ratio(numerator, denominator) * 100.0
}

impl MetricRecord {
    pub fn from_counts(player_id: &str, pitch_name: Option<String>, counts: PitchCounts) -> Self {
        Self {
            player_id: String::from(player_id),
            pitch_name,
            strikeout_rate: counts.strikeout_rate(),
            whiff_rate: counts.whiff_rate(),
            put_away_rate: counts.put_away_rate(),
            on_base_average: counts.on_base_average(),
            slugging: counts.slugging(),
            hits: counts.hits,
            total_plate_appearances: counts.total,
            counts,
        }
    }

    pub const fn at_bats(&self) -> u32 {
        self.counts.at_bats()
    }
}

/// Groups a batch of pitch events by pitch type and computes one `MetricRecord` per group.
///
/// Pure: no I/O, no state carried between calls. Pitch types with no events never appear in
/// the output, so an empty batch yields an empty map.
pub fn aggregate(player_id: &str, events: &[PitchEvent]) -> PlayerMetrics {
    events
        .iter()
        .into_group_map_by(|e| e.pitch_type.clone())
        .into_iter()
        .map(|(pitch_type, group)| {
            let pitch_name = group.iter().find_map(|e| e.pitch_name.clone());
            let record =
                MetricRecord::from_counts(player_id, pitch_name, PitchCounts::tally(&group));
            (pitch_type, record)
        })
        .collect()
}
