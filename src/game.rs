use std::collections::BTreeMap;

use anyhow::Result;
use strum::IntoEnumIterator;
use tracing::{debug, warn};

use crate::statcast::matchup::{matchup, MatchupDelta};
use crate::statcast::metrics::PlayerMetrics;
use crate::statcast::source::{player_metrics_many, DateRange, PitchEventSource, Role};
use crate::statsapi::lineup::{lineups_for, Lineup, LineupSlot, Side};
use crate::statsapi::schedule::{scheduled_game, ProbablePitcher};
use crate::statsapi::StatsApiClient;

/// Both starting lineups of one game and the pitcher each side is expected to start.
#[derive(Debug, Clone)]
pub struct GamePreview {
    pub game_pk: u64,
    pub away: Lineup,
    pub home: Lineup,
    pub away_pitcher: Option<ProbablePitcher>,
    pub home_pitcher: Option<ProbablePitcher>,
}

impl GamePreview {
    pub const fn lineup(&self, side: Side) -> &Lineup {
        match side {
            Side::Away => &self.away,
            Side::Home => &self.home,
        }
    }

    /// The pitcher that `side`'s batters face.
    pub const fn opposing_pitcher(&self, side: Side) -> Option<&ProbablePitcher> {
        match side {
            Side::Away => self.home_pitcher.as_ref(),
            Side::Home => self.away_pitcher.as_ref(),
        }
    }
}

impl From<&LineupSlot> for ProbablePitcher {
    fn from(slot: &LineupSlot) -> Self {
        Self {
            id: slot.player_id,
            full_name: slot.full_name.clone(),
        }
    }
}

/// Joins the box score lineups with the schedule's probable pitchers. A side with
/// no announced probable falls back to the pitcher batting in its lineup.
pub fn game_preview(client: &StatsApiClient, game_pk: u64) -> Result<GamePreview> {
    let (away, home) = lineups_for(client, game_pk)?;
    let (away_probable, home_probable) = match scheduled_game(client, game_pk)? {
        Some(game) => (game.away_probable, game.home_probable),
        None => {
            warn!("Game {game_pk} is not on the schedule; no probable pitchers");
            (None, None)
        }
    };
    let away_pitcher = away_probable.or_else(|| away.pitcher().map(ProbablePitcher::from));
    let home_pitcher = home_probable.or_else(|| home.pitcher().map(ProbablePitcher::from));
    Ok(GamePreview {
        game_pk,
        away,
        home,
        away_pitcher,
        home_pitcher,
    })
}

#[derive(Debug, Clone)]
pub struct BatterMatchup {
    pub side: Side,
    pub batter: LineupSlot,
    pub pitcher: ProbablePitcher,
    pub delta: MatchupDelta,
}

/// One matchup per starting batter whose opposing pitcher is known, away side first,
/// then batting order. Batters and pitchers are fetched in parallel.
pub fn game_matchups(
    preview: &GamePreview,
    source: &dyn PitchEventSource,
    range: &DateRange,
) -> Vec<BatterMatchup> {
    let pairings = Side::iter()
        .filter_map(|side| match preview.opposing_pitcher(side) {
            Some(pitcher) => Some((side, pitcher)),
            None => {
                warn!(
                    "No starting pitcher known against the {side} lineup of game {}",
                    preview.game_pk
                );
                None
            }
        })
        .collect::<Vec<_>>();

    let pitcher_ids = pairings
        .iter()
        .map(|(_, p)| p.id.to_string())
        .collect::<Vec<_>>();
    let batter_ids = pairings
        .iter()
        .flat_map(|(side, _)| preview.lineup(*side).slots.iter())
        .map(|s| s.player_id.to_string())
        .collect::<Vec<_>>();
    debug!(
        "Game {}: {} batters against {} pitchers",
        preview.game_pk,
        batter_ids.len(),
        pitcher_ids.len()
    );
    let (pitchers, batters) = rayon::join(
        || player_metrics_many(source, &pitcher_ids, Role::Pitcher, range),
        || player_metrics_many(source, &batter_ids, Role::Batter, range),
    );

    let empty = PlayerMetrics::new();
    let metrics_for = |all: &BTreeMap<String, PlayerMetrics>, id: u32| -> PlayerMetrics {
        all.get(&id.to_string()).unwrap_or(&empty).clone()
    };
    pairings
        .into_iter()
        .flat_map(|(side, pitcher)| {
            let pitcher_metrics = metrics_for(&pitchers, pitcher.id);
            preview
                .lineup(side)
                .slots
                .iter()
                .map(|slot| BatterMatchup {
                    side,
                    batter: slot.clone(),
                    pitcher: pitcher.clone(),
                    delta: matchup(&metrics_for(&batters, slot.player_id), &pitcher_metrics),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::statcast::pitch_event::EventOutcome::{FieldOut, HomeRun, Single, Strikeout};
    use crate::statcast::pitch_event::{PitchEvent, PitchTypeCode};
    use crate::statsapi::tests::primed_client;

    const BOX_SCORE: &str = r#"{
        "teams": {
            "away": {
                "team": {"name": "Toronto Blue Jays"},
                "players": {
                    "ID543037": {"person": {"id": 543037, "fullName": "George Springer"},
                                 "position": {"abbreviation": "RF"}, "battingOrder": "100"},
                    "ID666182": {"person": {"id": 666182, "fullName": "Bo Bichette"},
                                 "position": {"abbreviation": "SS"}, "battingOrder": "200"}
                }
            },
            "home": {
                "team": {"name": "Tampa Bay Rays"},
                "players": {
                    "ID668227": {"person": {"id": 668227, "fullName": "Randy Arozarena"},
                                 "position": {"abbreviation": "LF"}, "battingOrder": "100"},
                    "ID621107": {"person": {"id": 621107, "fullName": "Zach Eflin"},
                                 "position": {"abbreviation": "P"}, "battingOrder": "900"}
                }
            }
        }
    }"#;

    const SCHEDULE: &str = r#"{
        "dates": [{
            "games": [{
                "gamePk": 745444,
                "gameDate": "2024-04-01T23:07:00Z",
                "status": {"detailedState": "Pre-Game"},
                "teams": {
                    "away": {"team": {"name": "Toronto Blue Jays"},
                             "probablePitcher": {"id": 592332, "fullName": "Kevin Gausman"}},
                    "home": {"team": {"name": "Tampa Bay Rays"}}
                }
            }]
        }]
    }"#;

    /// Serves each player's own events whatever the role.
    struct PlayerEvents(HashMap<&'static str, Vec<PitchEvent>>);

    impl PitchEventSource for PlayerEvents {
        fn pitch_events(&self, player_id: &str, _: Role, _: &DateRange) -> Result<Vec<PitchEvent>> {
            Ok(self.0.get(player_id).cloned().unwrap_or_default())
        }
    }

    fn preview() -> GamePreview {
        let client = primed_client("api/v1/game/745444/boxscore", &[], BOX_SCORE);
        client.prime(
            "api/v1/schedule",
            &[("sportId", "1"), ("gamePk", "745444"), ("hydrate", "probablePitcher")],
            SCHEDULE,
        );
        game_preview(&client, 745_444).unwrap()
    }

    fn source() -> PlayerEvents {
        PlayerEvents(HashMap::from([
            (
                "543037",
                vec![
                    PitchEvent::new("FF", HomeRun, "hit_into_play", 0),
                    PitchEvent::new("SL", Strikeout, "swinging_strike", 2),
                ],
            ),
            ("666182", vec![PitchEvent::new("CH", FieldOut, "hit_into_play", 0)]),
            ("668227", vec![PitchEvent::new("FF", Single, "hit_into_play", 1)]),
            ("621107", vec![PitchEvent::new("FF", Strikeout, "called_strike", 2)]),
            (
                "592332",
                vec![
                    PitchEvent::new("FF", Strikeout, "swinging_strike", 2),
                    PitchEvent::new("SL", FieldOut, "hit_into_play", 0),
                ],
            ),
        ]))
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_preview_joins_lineups_and_probables() {
        let preview = preview();
        assert_eq!(preview.away.team, "Toronto Blue Jays");
        assert_eq!(preview.home.slots.len(), 2);
        assert_eq!(preview.away_pitcher.as_ref().map(|p| p.id), Some(592_332));
        // No home probable announced, so the pitcher batting ninth stands in
        assert_eq!(
            preview.home_pitcher,
            Some(ProbablePitcher {
                id: 621_107,
                full_name: String::from("Zach Eflin")
            })
        );
        assert_eq!(preview.opposing_pitcher(Side::Away).map(|p| p.id), Some(621_107));
        assert_eq!(preview.opposing_pitcher(Side::Home).map(|p| p.id), Some(592_332));
    }

    #[test]
    fn test_each_batter_faces_the_opposing_starter() {
        let matchups = game_matchups(&preview(), &source(), &range());
        let order = matchups
            .iter()
            .map(|m| (m.side, m.batter.player_id, m.pitcher.id))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                (Side::Away, 543_037, 621_107),
                (Side::Away, 666_182, 621_107),
                (Side::Home, 668_227, 592_332),
                (Side::Home, 621_107, 592_332),
            ]
        );

        let springer = &matchups[0].delta;
        assert_eq!(springer.len(), 1);
        let ff = &springer[&PitchTypeCode::from("FF")];
        assert_eq!(ff.delta.slugging, 4.0);
        assert_eq!(ff.pitcher.player_id, "621107");

        // Bichette saw only changeups, which Eflin has not thrown
        assert!(matchups[1].delta.is_empty());
    }

    #[test]
    fn test_side_without_pitcher_is_skipped() {
        let mut preview = preview();
        preview.home_pitcher = None;
        let matchups = game_matchups(&preview, &source(), &range());
        assert_eq!(matchups.len(), 2);
        assert!(matchups.iter().all(|m| m.side == Side::Home));
    }
}
