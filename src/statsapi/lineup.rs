use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::statsapi::lookup::PlayerId;
use crate::statsapi::StatsApiClient;

#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Away,
    Home,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct LineupSlot {
    pub order: u8,
    pub player_id: PlayerId,
    pub full_name: String,
    pub position: String,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct Lineup {
    pub side: Side,
    pub team: String,
    pub slots: Vec<LineupSlot>,
}

impl Lineup {
    /// The pitcher batting in the starting nine, when there is no DH.
    pub fn pitcher(&self) -> Option<&LineupSlot> {
        self.slots.iter().find(|s| s.position == "P")
    }

    pub fn is_posted(&self) -> bool {
        !self.slots.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct BoxScore {
    teams: BoxScoreTeams,
}

#[derive(Debug, Deserialize)]
struct BoxScoreTeams {
    away: BoxScoreTeam,
    home: BoxScoreTeam,
}

#[derive(Debug, Deserialize)]
struct BoxScoreTeam {
    #[serde(default)]
    team: TeamName,
    #[serde(default)]
    players: HashMap<String, BoxScorePlayer>,
}

#[derive(Debug, Default, Deserialize)]
struct TeamName {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoxScorePlayer {
    person: BoxScorePerson,
    #[serde(default)]
    position: Option<BoxScorePosition>,
    #[serde(default)]
    batting_order: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoxScorePerson {
    id: PlayerId,
    #[serde(default)]
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct BoxScorePosition {
    #[serde(default)]
    abbreviation: String,
}

fn starting_lineup(side: Side, team: BoxScoreTeam) -> Lineup {
    let mut slots = team
        .players
        .into_values()
        .filter_map(|player| {
            // Substitutes carry 101, 102, ...; starters are exact multiples of 100
            let batting_order = player.batting_order.as_deref()?.parse::<u16>().ok()?;
            if batting_order % 100 != 0 {
                return None;
            }
            Some(LineupSlot {
                order: u8::try_from(batting_order / 100).ok()?,
                player_id: player.person.id,
                full_name: player.person.full_name,
                position: player.position.map(|p| p.abbreviation).unwrap_or_default(),
            })
        })
        .collect::<Vec<_>>();
    slots.sort_by_key(|s| s.order);
    Lineup {
        side,
        team: team.team.name,
        slots,
    }
}

fn parse_box_score(box_score: BoxScore) -> (Lineup, Lineup) {
    (
        starting_lineup(Side::Away, box_score.teams.away),
        starting_lineup(Side::Home, box_score.teams.home),
    )
}

/// Starting lineups for both sides of a game. A lineup that has not been posted
/// yet has no slots.
pub fn lineups_for(client: &StatsApiClient, game_pk: u64) -> Result<(Lineup, Lineup)> {
    let box_score: BoxScore = client.get_json(&format!("api/v1/game/{game_pk}/boxscore"), &[])?;
    Ok(parse_box_score(box_score))
}
