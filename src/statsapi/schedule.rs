use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::statsapi::lookup::PlayerId;
use crate::statsapi::StatsApiClient;

pub const NOT_ANNOUNCED: &str = "Not Announced";

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbablePitcher {
    pub id: PlayerId,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct ScheduledGame {
    pub game_pk: u64,
    pub game_date: DateTime<Utc>,
    pub status: String,
    pub away: String,
    pub home: String,
    pub away_probable: Option<ProbablePitcher>,
    pub home_probable: Option<ProbablePitcher>,
}

impl ScheduledGame {
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away, self.home)
    }

    pub fn away_pitcher_name(&self) -> &str {
        self.away_probable.as_ref().map_or(NOT_ANNOUNCED, |p| p.full_name.as_str())
    }

    pub fn home_pitcher_name(&self) -> &str {
        self.home_probable.as_ref().map_or(NOT_ANNOUNCED, |p| p.full_name.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleResponse {
    #[serde(default)]
    dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize)]
struct ScheduleDate {
    #[serde(default)]
    games: Vec<RawGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGame {
    game_pk: u64,
    game_date: DateTime<Utc>,
    #[serde(default)]
    status: RawStatus,
    teams: RawTeams,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    #[serde(default)]
    detailed_state: String,
}

#[derive(Debug, Deserialize)]
struct RawTeams {
    away: RawSide,
    home: RawSide,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSide {
    team: RawTeam,
    #[serde(default)]
    probable_pitcher: Option<ProbablePitcher>,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    #[serde(default)]
    name: String,
}

impl From<RawGame> for ScheduledGame {
    fn from(game: RawGame) -> Self {
        Self {
            game_pk: game.game_pk,
            game_date: game.game_date,
            status: game.status.detailed_state,
            away: game.teams.away.team.name,
            home: game.teams.home.team.name,
            away_probable: game.teams.away.probable_pitcher,
            home_probable: game.teams.home.probable_pitcher,
        }
    }
}

fn parse_schedule(response: ScheduleResponse) -> Vec<ScheduledGame> {
    let mut games = response
        .dates
        .into_iter()
        .flat_map(|d| d.games)
        .map(ScheduledGame::from)
        .collect::<Vec<_>>();
    games.sort_by_key(|g| (g.game_date, g.game_pk));
    games
}

/// All MLB games on `date`, earliest first, with probable pitchers where announced.
pub fn schedule_for(client: &StatsApiClient, date: NaiveDate) -> Result<Vec<ScheduledGame>> {
    let date = date.format("%Y-%m-%d").to_string();
    let response: ScheduleResponse = client.get_json(
        "api/v1/schedule",
        &[("sportId", "1"), ("date", date.as_str()), ("hydrate", "probablePitcher")],
    )?;
    Ok(parse_schedule(response))
}

/// The schedule entry for one game, carrying its probable pitchers. `None` when the
/// Stats API does not know the game.
pub fn scheduled_game(client: &StatsApiClient, game_pk: u64) -> Result<Option<ScheduledGame>> {
    let game_pk_param = game_pk.to_string();
    let response: ScheduleResponse = client.get_json(
        "api/v1/schedule",
        &[
            ("sportId", "1"),
            ("gamePk", game_pk_param.as_str()),
            ("hydrate", "probablePitcher"),
        ],
    )?;
    Ok(parse_schedule(response)
        .into_iter()
        .find(|g| g.game_pk == game_pk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statsapi::tests::primed_client;

    const SCHEDULE: &str = r#"{
        "dates": [{
            "date": "2024-04-01",
            "games": [
                {
                    "gamePk": 745444,
                    "gameDate": "2024-04-01T23:07:00Z",
                    "status": {"detailedState": "Scheduled"},
                    "teams": {
                        "away": {"team": {"id": 141, "name": "Toronto Blue Jays"},
                                 "probablePitcher": {"id": 592332, "fullName": "Kevin Gausman"}},
                        "home": {"team": {"id": 139, "name": "Tampa Bay Rays"}}
                    }
                },
                {
                    "gamePk": 745123,
                    "gameDate": "2024-04-01T17:10:00Z",
                    "status": {"detailedState": "Final"},
                    "teams": {
                        "away": {"team": {"id": 147, "name": "New York Yankees"}},
                        "home": {"team": {"id": 117, "name": "Houston Astros"},
                                 "probablePitcher": {"id": 434378, "fullName": "Justin Verlander"}}
                    }
                }
            ]
        }]
    }"#;

    #[test]
    fn test_schedule_sorted_by_start() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let client = primed_client(
            "api/v1/schedule",
            &[("sportId", "1"), ("date", "2024-04-01"), ("hydrate", "probablePitcher")],
            SCHEDULE,
        );
        let games = schedule_for(&client, date).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].game_pk, 745_123);
        assert_eq!(games[0].status, "Final");
        assert_eq!(games[1].matchup(), "Toronto Blue Jays @ Tampa Bay Rays");
    }

    #[test]
    fn test_missing_probable_pitcher_is_not_announced() {
        let response = serde_json::from_str::<ScheduleResponse>(SCHEDULE).unwrap();
        let games = parse_schedule(response);
        let jays = &games[1];
        assert_eq!(jays.away_pitcher_name(), "Kevin Gausman");
        assert_eq!(jays.home_pitcher_name(), NOT_ANNOUNCED);
        assert_eq!(jays.away_probable.as_ref().map(|p| p.id), Some(592_332));
    }

    #[test]
    fn test_no_games_is_empty() {
        let response =
            serde_json::from_str::<ScheduleResponse>(r#"{"totalGames": 0, "dates": []}"#).unwrap();
        assert!(parse_schedule(response).is_empty());
    }

    #[test]
    fn test_scheduled_game_by_pk() {
        let client = primed_client(
            "api/v1/schedule",
            &[("sportId", "1"), ("gamePk", "745444"), ("hydrate", "probablePitcher")],
            SCHEDULE,
        );
        let game = scheduled_game(&client, 745_444).unwrap().unwrap();
        assert_eq!(game.away_pitcher_name(), "Kevin Gausman");

        client.prime(
            "api/v1/schedule",
            &[("sportId", "1"), ("gamePk", "1"), ("hydrate", "probablePitcher")],
            SCHEDULE,
        );
        assert_eq!(scheduled_game(&client, 1).unwrap(), None);
    }
}
