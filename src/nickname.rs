//! Community nicknames for maps that favour one race.
//!
//! The usual form swaps the race letter into the map name ("Fighting Spirit" on a
//! Terran-favoured map becomes "Tighting Spirit"). When that would leave the name
//! unchanged, the leading syllable or first word is replaced with the race's
//! "-sagi" prefix instead.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Race, RaceTable};

static LEADING_VOWELS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[aeiou]+").expect("valid vowel regex"));
static LEADING_CONSONANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[^aiueo][aiueoy]?").expect("valid consonant regex"));

/// Race with the highest win ratio. Ties go to the earlier race in [`Race::ALL`].
/// A race with no games ranks above any ratio.
pub fn best_race(stats: &RaceTable) -> Race {
    let mut best = Race::ALL[0];
    let mut best_ratio = stats.get(best).ratio;
    for (race, race_stats) in stats.iter().skip(1) {
        let better = match (race_stats.ratio, best_ratio) {
            (Some(ratio), Some(current)) => ratio > current,
            (None, Some(_)) => true,
            (_, None) => false,
        };
        if better {
            best = race;
            best_ratio = race_stats.ratio;
        }
    }
    best
}

/// Nickname for `name` on a map where `race` is strongest, or `None` for unknown maps
/// and names no rule applies to.
pub fn make_nickname(name: &str, race: Race, is_known_map: bool) -> Option<String> {
    if !is_known_map {
        return None;
    }
    let nickname = simple_nickname(name, race)?;
    if nickname == name {
        return complicated_nickname(name, race);
    }
    Some(nickname)
}

/// Swaps the race letter into the name: prefixed before a vowel, replacing a consonant.
pub fn simple_nickname(name: &str, race: Race) -> Option<String> {
    let mut chars = name.chars();
    let first = chars.next()?;
    let rest = chars.as_str();
    let first_lower: String = first.to_lowercase().collect();
    let letter = race.letter();

    if matches!(first_lower.as_str(), "a" | "i" | "u" | "e" | "o") {
        Some(format!("{letter}{first_lower}{rest}"))
    } else {
        Some(format!("{letter}{rest}"))
    }
}

/// Replaces the leading vowels (or leading consonant and optional vowel) of a
/// single-word name, or the whole first word of a longer one, with the race prefix.
pub fn complicated_nickname(name: &str, race: Race) -> Option<String> {
    let prefix = race.nickname_prefix();
    let words: Vec<&str> = name.trim().split(' ').collect();

    if words.len() > 1 {
        let mut out = vec![prefix];
        out.extend_from_slice(&words[1..]);
        return Some(out.join(" "));
    }

    let head = LEADING_VOWELS
        .find(name)
        .or_else(|| LEADING_CONSONANT.find(name))?;
    Some(format!("{prefix}{}", &name[head.end()..]))
}
