use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bounded_integer::BoundedU8;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::EnumString;

/// Strikes in the count before the pitch was thrown.
pub type StrikeCount = BoundedU8<0, 2>;

pub const UNKNOWN_PITCH_TYPE: &str = "UN";
pub const NO_DESCRIPTION: &str = "no_description";

#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Clone, Serialize, Deserialize)]
pub struct PitchTypeCode(String);

impl PitchTypeCode {
    pub fn new(code: &str) -> Self {
        let code = code.trim();
        if code.is_empty() {
            Self::unknown()
        } else {
            Self(code.to_ascii_uppercase())
        }
    }

    pub fn unknown() -> Self {
        Self(String::from(UNKNOWN_PITCH_TYPE))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PitchTypeCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PitchTypeCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// The plate appearance result recorded on a pitch. Most pitches carry no result.
#[derive(Debug, Eq, PartialEq, Hash, Clone, EnumString, Default)]
#[strum(serialize_all = "snake_case")]
pub enum EventOutcome {
    Strikeout,
    Single,
    Double,
    Triple,
    HomeRun,
    FieldOut,
    #[default]
    NoEvent,
    #[strum(default)]
    Other(String),
}

impl EventOutcome {
    pub fn parse(outcome: Option<&str>) -> Self {
        match outcome.map(str::trim) {
            None | Some("") => Self::NoEvent,
            Some(s) => {
                let lowered = s.to_ascii_lowercase();
                Self::from_str(&lowered).unwrap_or(Self::Other(lowered))
            }
        }
    }

    pub fn is_hit(&self) -> bool {
        self.bases().is_some()
    }

    /// Total bases credited for a hit, `None` when the outcome is not a hit.
    pub const fn bases(&self) -> Option<u32> {
        match self {
            Self::Single => Some(1),
            Self::Double => Some(2),
            Self::Triple => Some(3),
            Self::HomeRun => Some(4),
            _ => None,
        }
    }
}

impl Display for EventOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Strikeout => "strikeout",
            Self::Single => "single",
            Self::Double => "double",
            Self::Triple => "triple",
            Self::HomeRun => "home_run",
            Self::FieldOut => "field_out",
            Self::NoEvent => "no_event",
            Self::Other(s) => s,
        };
        write!(f, "{s}")
    }
}

/// Pitch description, kept lower-cased so category checks are case-insensitive.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize)]
pub struct Description(String);

impl Description {
    pub fn new(description: Option<&str>) -> Self {
        match description.map(str::trim) {
            None | Some("") => Self(String::from(NO_DESCRIPTION)),
            Some(s) => Self(s.to_ascii_lowercase()),
        }
    }

    pub fn is_walk(&self) -> bool {
        self.0.contains("walk")
    }

    pub fn is_hit_by_pitch(&self) -> bool {
        self.0.contains("hit_by_pitch")
    }

    pub fn is_strike(&self) -> bool {
        self.0.contains("strike")
    }

    pub fn is_foul(&self) -> bool {
        self.0.contains("foul")
    }

    pub fn is_swinging_strike(&self) -> bool {
        self.0 == "swinging_strike"
    }
}

#[cfg(test)]
impl Description {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Description {
    fn default() -> Self {
        Self::new(None)
    }
}

impl From<&str> for Description {
    fn from(description: &str) -> Self {
        Self::new(Some(description))
    }
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct PitchEvent {
    pub pitch_type: PitchTypeCode,
    pub pitch_name: Option<String>,
    pub event_outcome: EventOutcome,
    pub description: Description,
    pub strike_count_before_pitch: StrikeCount,
    pub game_date: Option<NaiveDate>,
    pub at_bat_number: Option<u32>,
    pub pitch_number: Option<u32>,
}

impl PitchEvent {
    pub fn strikes(&self) -> u8 {
        self.strike_count_before_pitch.get()
    }

    /// Key that orders pitches chronologically, plate appearance then pitch.
    pub fn sequence_key(&self) -> (Option<NaiveDate>, Option<u32>, Option<u32>) {
        (self.game_date, self.at_bat_number, self.pitch_number)
    }
}

#[cfg(test)]
impl PitchEvent {
    pub fn new(
        pitch_type: &str,
        event_outcome: EventOutcome,
        description: &str,
        strikes: u8,
    ) -> Self {
        Self {
            pitch_type: PitchTypeCode::new(pitch_type),
            pitch_name: None,
            event_outcome,
            description: Description::from(description),
            strike_count_before_pitch: StrikeCount::new_saturating(strikes),
            game_date: None,
            at_bat_number: None,
            pitch_number: None,
        }
    }
}

/// One row of a Statcast "details" export. Only the columns used here are read;
/// every field is optional because exports routinely leave them blank.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StatcastRow {
    #[serde(default)]
    pub pitch_type: Option<String>,
    #[serde(default)]
    pub pitch_name: Option<String>,
    #[serde(default)]
    pub game_date: Option<String>,
    #[serde(default)]
    pub events: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub strikes: Option<String>,
    #[serde(default)]
    pub at_bat_number: Option<String>,
    #[serde(default)]
    pub pitch_number: Option<String>,
}

impl From<StatcastRow> for PitchEvent {
    fn from(row: StatcastRow) -> Self {
        let parse_u32 =
            |s: &Option<String>| s.as_deref().and_then(|s| s.trim().parse::<u32>().ok());
        let strikes = row
            .strikes
            .as_deref()
            .and_then(|s| s.trim().parse::<u8>().ok())
            .unwrap_or_default();
        Self {
            pitch_type: PitchTypeCode::new(row.pitch_type.as_deref().unwrap_or_default()),
            pitch_name: row.pitch_name.filter(|n| !n.trim().is_empty()),
            event_outcome: EventOutcome::parse(row.events.as_deref()),
            description: Description::new(row.description.as_deref()),
            strike_count_before_pitch: StrikeCount::new_saturating(strikes),
            game_date: row
                .game_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
            at_bat_number: parse_u32(&row.at_bat_number),
            pitch_number: parse_u32(&row.pitch_number),
        }
    }
}
