//! Two-rows-per-map table parser.
//!
//! Row one of a map holds `name(games)` and the overall win/loss per race, row two
//! holds the matchup breakdowns for each race column. A failed row is counted and
//! the parser starts over at the next row.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{MapMeta, MapRecord, MatchupStats, RaceStats, RaceTable, STATISTICAL_SIGNIFICANCE};
use crate::names::MapNameLookup;
use crate::nickname::{best_race, make_nickname};

static MAP_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+?)\(([0-9]+)\)").expect("valid map header regex"));
static WIN_LOSS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)승\s?([0-9]+)패").expect("valid win/loss regex"));

/// One `<td>` of the stats table, reduced to the text views the parser needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCell {
    /// All text in the cell, trimmed.
    pub text: String,
    /// Text with emphasised (`<strong>`) content removed, trimmed.
    pub plain_text: String,
    /// Text of each `<br>`-separated segment, trimmed, empty segments dropped.
    pub lines: Vec<String>,
}

impl RowCell {
    pub fn from_text(text: &str) -> Self {
        let text = text.trim().to_string();
        let lines = if text.is_empty() { Vec::new() } else { vec![text.clone()] };
        Self {
            plain_text: text.clone(),
            text,
            lines,
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<String> = lines
            .into_iter()
            .map(|line| line.as_ref().trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        let text = lines.join(" ");
        Self {
            plain_text: text.clone(),
            text,
            lines,
        }
    }
}

/// Map name, then Zerg, Protoss and Terran cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<RowCell>,
}

impl TableRow {
    pub fn new(cells: Vec<RowCell>) -> Self {
        Self { cells }
    }

    fn race_cells(&self) -> Result<[&RowCell; 3], RowError> {
        match self.cells.as_slice() {
            [_, zerg, protoss, terran, ..] => Ok([zerg, protoss, terran]),
            cells => Err(RowError::MissingCells {
                found: cells.len(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("expected 4 cells, found {found}")]
    MissingCells { found: usize },
    #[error("map cell {0:?} does not match name(games)")]
    MalformedHeader(String),
    #[error("game count in {0:?} is out of range")]
    GameCount(String),
    #[error("no win/loss record in {0:?}")]
    MalformedWinLoss(String),
    #[error("matchup fragment {0:?} has no race pair")]
    MalformedMatchup(String),
}

/// A map whose first row has been read; it only becomes a [`MapRecord`] once its
/// matchup row arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMap {
    pub key: String,
    pub name: String,
    pub number_of_games: u32,
    pub is_unknown_map: bool,
    pub stats_per_race: RaceTable,
}

impl PendingMap {
    pub fn finish(self, stats_per_matchup: MatchupStats) -> MapRecord {
        let best = best_race(&self.stats_per_race);
        let nickname = make_nickname(&self.name, best, !self.is_unknown_map);
        MapRecord {
            name: self.name,
            number_of_games: self.number_of_games,
            is_statistically_significant: self.number_of_games >= STATISTICAL_SIGNIFICANCE,
            is_unknown_map: self.is_unknown_map,
            stats_per_race: self.stats_per_race,
            stats_per_matchup,
            meta: MapMeta {
                best_race: best,
                nickname,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowState {
    AwaitingHeader,
    AwaitingMatchups(PendingMap),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// Not a map row (the empty row closing the table).
    Skipped,
    Started(PendingMap),
    Completed(MapRecord),
    /// `unknown_map` is set when the row named a map missing from the lookup
    /// before it failed.
    Failed { error: RowError, unknown_map: bool },
}

impl RowOutcome {
    fn failed(error: RowError) -> Self {
        RowOutcome::Failed {
            error,
            unknown_map: false,
        }
    }
}

/// The map cell of a first row, resolved against the name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapHeading {
    pub name: String,
    pub number_of_games: u32,
    pub is_unknown_map: bool,
}

impl MapHeading {
    pub fn with_stats(self, stats_per_race: RaceTable) -> PendingMap {
        PendingMap {
            key: self.name.clone(),
            name: self.name,
            number_of_games: self.number_of_games,
            is_unknown_map: self.is_unknown_map,
            stats_per_race,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMaps {
    /// Completed maps, most games first.
    pub maps: Vec<MapRecord>,
    pub unknown_maps: u32,
    pub row_parse_failures: u32,
}

/// Feeds one row through the state machine, returning the next state and what happened.
///
/// Every failure resets to [`RowState::AwaitingHeader`] and drops the pending map.
pub fn step(state: RowState, row: &TableRow, names: &dyn MapNameLookup) -> (RowState, RowOutcome) {
    match state {
        RowState::AwaitingHeader => match parse_map_cell(row, names) {
            Ok(Some(heading)) => {
                let unknown_map = heading.is_unknown_map;
                match parse_race_stats(row) {
                    Ok(stats) => {
                        let pending = heading.with_stats(stats);
                        (
                            RowState::AwaitingMatchups(pending.clone()),
                            RowOutcome::Started(pending),
                        )
                    }
                    Err(error) => (
                        RowState::AwaitingHeader,
                        RowOutcome::Failed { error, unknown_map },
                    ),
                }
            }
            Ok(None) => (RowState::AwaitingHeader, RowOutcome::Skipped),
            Err(err) => (RowState::AwaitingHeader, RowOutcome::failed(err)),
        },
        RowState::AwaitingMatchups(pending) => match parse_matchup_row(row) {
            Ok(matchups) => (
                RowState::AwaitingHeader,
                RowOutcome::Completed(pending.finish(matchups)),
            ),
            Err(err) => (RowState::AwaitingHeader, RowOutcome::failed(err)),
        },
    }
}

pub fn parse_rows(rows: &[TableRow], names: &dyn MapNameLookup) -> ParsedMaps {
    let mut out = ParsedMaps::default();
    let mut keys: Vec<String> = Vec::new();
    let mut state = RowState::AwaitingHeader;

    for (idx, row) in rows.iter().enumerate() {
        let key = match &state {
            RowState::AwaitingMatchups(pending) => Some(pending.key.clone()),
            RowState::AwaitingHeader => None,
        };
        let (next, outcome) = step(state, row, names);
        state = next;

        match outcome {
            RowOutcome::Skipped => debug!(row = idx, "skipping row without a map header"),
            RowOutcome::Started(pending) => {
                if pending.is_unknown_map {
                    debug!(row = idx, name = %pending.name, "map has no english name");
                    out.unknown_maps += 1;
                }
            }
            RowOutcome::Completed(record) => {
                let key = key.unwrap_or_else(|| record.name.clone());
                // A repeated map name replaces the earlier record in place.
                match keys.iter().position(|k| *k == key) {
                    Some(pos) => out.maps[pos] = record,
                    None => {
                        keys.push(key);
                        out.maps.push(record);
                    }
                }
            }
            RowOutcome::Failed { error, unknown_map } => {
                warn!(row = idx, error = %error, "failed to parse map stats row");
                if unknown_map {
                    out.unknown_maps += 1;
                }
                out.row_parse_failures += 1;
            }
        }
    }

    if let RowState::AwaitingMatchups(pending) = state {
        warn!(name = %pending.name, "table ended before the matchup row");
        out.row_parse_failures += 1;
    }

    out.maps.sort_by(|a, b| b.number_of_games.cmp(&a.number_of_games));
    out
}

/// Reads the first row of a map. `Ok(None)` for an empty map cell.
pub fn parse_header_row(
    row: &TableRow,
    names: &dyn MapNameLookup,
) -> Result<Option<PendingMap>, RowError> {
    let Some(heading) = parse_map_cell(row, names)? else {
        return Ok(None);
    };
    Ok(Some(heading.with_stats(parse_race_stats(row)?)))
}

/// Reads `name(games)` from the map cell and looks the name up. `Ok(None)` for an
/// empty cell.
pub fn parse_map_cell(
    row: &TableRow,
    names: &dyn MapNameLookup,
) -> Result<Option<MapHeading>, RowError> {
    let Some(map_cell) = row.cells.first() else {
        return Err(RowError::MissingCells { found: 0 });
    };
    let content = map_cell.text.trim();
    if content.is_empty() {
        return Ok(None);
    }
    let caps = MAP_HEADER
        .captures(content)
        .ok_or_else(|| RowError::MalformedHeader(content.to_string()))?;
    let name_kor = caps[1].trim().to_string();
    let number_of_games = caps[2]
        .parse::<u32>()
        .map_err(|_| RowError::GameCount(content.to_string()))?;

    let english = names.english_name(&name_kor);
    let is_unknown_map = english.is_none();
    Ok(Some(MapHeading {
        name: english.unwrap_or(name_kor),
        number_of_games,
        is_unknown_map,
    }))
}

/// Overall win/loss of the three race cells of a first row.
pub fn parse_race_stats(row: &TableRow) -> Result<RaceTable, RowError> {
    let [zerg, protoss, terran] = row.race_cells()?;
    Ok(RaceTable {
        zerg: parse_win_loss(&zerg.plain_text)?,
        protoss: parse_win_loss(&protoss.plain_text)?,
        terran: parse_win_loss(&terran.plain_text)?,
    })
}

/// Reads the second row of a map: every matchup line of the three race columns.
pub fn parse_matchup_row(row: &TableRow) -> Result<MatchupStats, RowError> {
    let mut matchups = MatchupStats::new();
    for cell in row.race_cells()? {
        for line in &cell.lines {
            let (code, stats) = parse_matchup(line)?;
            matchups.insert(code, stats);
        }
    }
    Ok(matchups)
}

/// Parses `<wins>승<losses>패` anywhere in `text`.
pub fn parse_win_loss(text: &str) -> Result<RaceStats, RowError> {
    let caps = WIN_LOSS
        .captures(text)
        .ok_or_else(|| RowError::MalformedWinLoss(text.to_string()))?;
    let wins = caps[1]
        .parse::<u32>()
        .map_err(|_| RowError::MalformedWinLoss(text.to_string()))?;
    let losses = caps[2]
        .parse::<u32>()
        .map_err(|_| RowError::MalformedWinLoss(text.to_string()))?;
    Ok(RaceStats::new(wins, losses))
}

/// Parses a fragment like `z-p 4승3패` (or `zvp 4승3패`) into `("ZvP", stats)`.
pub fn parse_matchup(fragment: &str) -> Result<(String, RaceStats), RowError> {
    let head: Vec<char> = fragment.chars().take(3).collect();
    let (ours, theirs) = match head.as_slice() {
        [ours, _, theirs] if ours.is_ascii_alphabetic() && theirs.is_ascii_alphabetic() => {
            (*ours, *theirs)
        }
        _ => return Err(RowError::MalformedMatchup(fragment.to_string())),
    };
    let stats = parse_win_loss(fragment)?;
    let code = format!("{}v{}", ours.to_ascii_uppercase(), theirs.to_ascii_uppercase());
    Ok((code, stats))
}
