use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of games for a map's statistics to be considered meaningful.
pub const STATISTICAL_SIGNIFICANCE: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Race {
    #[serde(rename = "Z")]
    Zerg,
    #[serde(rename = "P")]
    Protoss,
    #[serde(rename = "T")]
    Terran,
}

impl Race {
    /// Column order on the stats page, also the tie-break order for the best race.
    pub const ALL: [Race; 3] = [Race::Zerg, Race::Protoss, Race::Terran];

    pub fn letter(self) -> char {
        match self {
            Race::Zerg => 'Z',
            Race::Protoss => 'P',
            Race::Terran => 'T',
        }
    }

    /// Prefix substituted into a map name by the complicated nickname rule.
    pub fn nickname_prefix(self) -> &'static str {
        match self {
            Race::Zerg => "Zesagi",
            Race::Protoss => "Pusagi",
            Race::Terran => "Tesagi",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaceStats {
    pub wins: u32,
    pub losses: u32,
    pub games: u32,
    /// `None` when no games were played.
    pub ratio: Option<f64>,
}

impl RaceStats {
    pub fn new(wins: u32, losses: u32) -> Self {
        let games = wins.saturating_add(losses);
        let ratio = (games > 0).then(|| f64::from(wins) / f64::from(games));
        Self {
            wins,
            losses,
            games,
            ratio,
        }
    }
}

/// Per-race statistics; always holds exactly the three races.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaceTable {
    #[serde(rename = "Z")]
    pub zerg: RaceStats,
    #[serde(rename = "P")]
    pub protoss: RaceStats,
    #[serde(rename = "T")]
    pub terran: RaceStats,
}

impl RaceTable {
    pub fn get(&self, race: Race) -> &RaceStats {
        match race {
            Race::Zerg => &self.zerg,
            Race::Protoss => &self.protoss,
            Race::Terran => &self.terran,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Race, &RaceStats)> {
        Race::ALL.into_iter().map(move |race| (race, self.get(race)))
    }
}

/// Matchup code such as `ZvP` to that pairing's record.
pub type MatchupStats = BTreeMap<String, RaceStats>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMeta {
    pub best_race: Race,
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRecord {
    pub name: String,
    pub number_of_games: u32,
    pub is_statistically_significant: bool,
    pub is_unknown_map: bool,
    pub stats_per_race: RaceTable,
    pub stats_per_matchup: MatchupStats,
    pub meta: MapMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub maps: Vec<MapRecord>,
    pub fetch_time: DateTime<Utc>,
    pub unknown_maps: u32,
    pub row_parse_failures: u32,
    pub statistical_significance_minimum: u32,
}

impl ExtractionResult {
    pub fn unknown_map_records(&self) -> impl Iterator<Item = &MapRecord> {
        self.maps.iter().filter(|map| map.is_unknown_map)
    }
}
