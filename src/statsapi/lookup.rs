use anyhow::{bail, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::statsapi::StatsApiClient;

pub type PlayerId = u32;

const NAME_SUFFIXES: [&str; 5] = ["Jr.", "Sr.", "II", "III", "IV"];

/// Resolves a player's name to an MLBAM id. `Ok(None)` means nobody matched.
pub trait PlayerLookup: Send + Sync {
    fn lookup(&self, first_name: &str, last_name: &str) -> Result<Option<PlayerId>>;

    fn lookup_full_name(&self, full_name: &str) -> Result<Option<PlayerId>> {
        let (first, last) = split_full_name(full_name)?;
        self.lookup(first, last)
    }
}

/// Splits "First Last Jr." into ("First", "Last Jr.") on the first space.
pub fn split_full_name(full_name: &str) -> Result<(&str, &str)> {
    match full_name.trim().split_once(' ') {
        Some((first, last)) if !last.trim().is_empty() => Ok((first, last.trim())),
        _ => bail!("Player name '{full_name}' needs a first and last name"),
    }
}

/// Drops a trailing generational suffix, which the people search does not match on.
pub fn strip_suffix(last_name: &str) -> &str {
    match last_name.rsplit_once(' ') {
        Some((rest, suffix)) if NAME_SUFFIXES.contains(&suffix) => rest.trim_end(),
        _ => last_name,
    }
}

#[derive(Debug, Deserialize)]
struct PeopleSearch {
    #[serde(default)]
    people: Vec<Person>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Person {
    id: PlayerId,
    #[serde(default)]
    full_name: Option<String>,
}

pub struct StatsApiLookup<'a> {
    client: &'a StatsApiClient,
}

impl<'a> StatsApiLookup<'a> {
    pub const fn new(client: &'a StatsApiClient) -> Self {
        Self { client }
    }
}

impl PlayerLookup for StatsApiLookup<'_> {
    fn lookup(&self, first_name: &str, last_name: &str) -> Result<Option<PlayerId>> {
        let names = format!("{} {}", first_name.trim(), strip_suffix(last_name.trim()));
        let search: PeopleSearch = self
            .client
            .get_json("api/v1/people/search", &[("names", names.as_str())])?;
        // Several players can share a name; the first match wins
        match search.people.first() {
            Some(person) => {
                debug!(
                    "Found player ID for {names}: {} ({})",
                    person.id,
                    person.full_name.as_deref().unwrap_or("unknown")
                );
                Ok(Some(person.id))
            }
            None => {
                warn!("No player found for {names}");
                Ok(None)
            }
        }
    }
}
