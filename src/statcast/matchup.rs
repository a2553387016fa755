use std::collections::BTreeMap;

use serde::Serialize;

use crate::statcast::metrics::{MetricRecord, PlayerMetrics};
use crate::statcast::pitch_event::PitchTypeCode;

/// Batter minus pitcher for each rate field of a pitch type both players have data on.
#[derive(Debug, PartialEq, Copy, Clone, Serialize)]
pub struct MetricDelta {
    pub strikeout_rate: f64,
    pub whiff_rate: f64,
    pub put_away_rate: f64,
    pub on_base_average: f64,
    pub slugging: f64,
}

impl MetricDelta {
    fn between(batter: &MetricRecord, pitcher: &MetricRecord) -> Self {
        Self {
            strikeout_rate: batter.strikeout_rate - pitcher.strikeout_rate,
            whiff_rate: batter.whiff_rate - pitcher.whiff_rate,
            put_away_rate: batter.put_away_rate - pitcher.put_away_rate,
            on_base_average: batter.on_base_average - pitcher.on_base_average,
            slugging: batter.slugging - pitcher.slugging,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct MatchupRow {
    pub batter: MetricRecord,
    pub pitcher: MetricRecord,
    pub delta: MetricDelta,
}

pub type MatchupDelta = BTreeMap<PitchTypeCode, MatchupRow>;

/// Pairs up the pitch types present in both mappings. Types only one side has are left out.
pub fn matchup(batter: &PlayerMetrics, pitcher: &PlayerMetrics) -> MatchupDelta {
    batter
        .iter()
        .filter_map(|(pitch_type, b)| {
            let p = pitcher.get(pitch_type)?;
            let row = MatchupRow {
                batter: b.clone(),
                pitcher: p.clone(),
                delta: MetricDelta::between(b, p),
            };
            Some((pitch_type.clone(), row))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statcast::metrics::aggregate;
    use crate::statcast::pitch_event::EventOutcome::{FieldOut, HomeRun, Strikeout};
    use crate::statcast::pitch_event::PitchEvent;

    #[test]
    fn test_only_shared_pitch_types() {
        let batter = aggregate(
            "1",
            &[
                PitchEvent::new("FF", HomeRun, "hit_into_play", 0),
                PitchEvent::new("CH", FieldOut, "hit_into_play", 0),
            ],
        );
        let pitcher = aggregate(
            "2",
            &[
                PitchEvent::new("FF", Strikeout, "swinging_strike", 2),
                PitchEvent::new("SL", Strikeout, "swinging_strike", 2),
            ],
        );
        let rows = matchup(&batter, &pitcher);
        assert_eq!(rows.len(), 1);
        let ff = &rows[&PitchTypeCode::from("FF")];
        assert_eq!(ff.batter.player_id, "1");
        assert_eq!(ff.pitcher.player_id, "2");
        assert_eq!(ff.delta.strikeout_rate, -100.0);
        assert_eq!(ff.delta.slugging, 4.0);
        assert_eq!(ff.delta.on_base_average, 1.0);
    }

    #[test]
    fn test_empty_side_yields_no_rows() {
        let pitcher = aggregate("2", &[PitchEvent::new("FF", Strikeout, "called_strike", 2)]);
        assert!(matchup(&PlayerMetrics::new(), &pitcher).is_empty());
    }
}
