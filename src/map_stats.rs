use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::config::StatsConfig;
use crate::error::StatsError;
use crate::fetch::{PageFetcher, PageSource};
use crate::http_client::ReqwestSource;
use crate::model::{ExtractionResult, STATISTICAL_SIGNIFICANCE};
use crate::names::{MapName, MapNameLookup, MapNameTable};
use crate::page::extract_rows;
use crate::parser::parse_rows;

/// Cache slug of the computed statistics, independent of the page URL.
pub const RESULT_CACHE_KEY: &str = "MapStatsData";

/// English name written for maps that still need a translation.
pub const PLACEHOLDER: &str = "PLACEHOLDER";

#[derive(Debug, Deserialize)]
struct CachedStats {
    data: ExtractionResult,
}

#[derive(Debug, Serialize)]
struct CachedStatsRef<'a> {
    data: &'a ExtractionResult,
}

/// How fresh the statistics must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsRequest {
    /// Oldest acceptable cache entry; `None` uses the configured window.
    pub max_age: Option<Duration>,
    /// When false both caches are bypassed (the result is still written back).
    pub use_cache: bool,
}

impl Default for StatsRequest {
    fn default() -> Self {
        Self {
            max_age: None,
            use_cache: true,
        }
    }
}

pub struct MapStatsService<S> {
    url: String,
    default_max_age: Duration,
    cache: CacheStore,
    fetcher: PageFetcher<S>,
    names: MapNameTable,
}

impl MapStatsService<ReqwestSource> {
    /// Live service: reqwest transport, translation table from `map_names_path` if set.
    pub fn from_config(config: &StatsConfig) -> Result<Self> {
        let names = match &config.map_names_path {
            Some(path) => MapNameTable::from_csv_path(path)?,
            None => {
                warn!("no map names file configured; every map will be reported as unknown");
                MapNameTable::default()
            }
        };
        Ok(Self::new(config, ReqwestSource, names))
    }
}

impl<S: PageSource> MapStatsService<S> {
    pub fn new(config: &StatsConfig, source: S, names: MapNameTable) -> Self {
        let cache = CacheStore::new(&config.cache_dir);
        Self {
            url: config.url.clone(),
            default_max_age: config.max_age,
            fetcher: PageFetcher::new(source, cache.clone()),
            cache,
            names,
        }
    }

    pub fn names(&self) -> &MapNameTable {
        &self.names
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn source(&self) -> &S {
        self.fetcher.source()
    }

    /// Map statistics, read through the result cache and then the page cache.
    pub fn map_stats(&self, req: StatsRequest) -> Result<ExtractionResult, StatsError> {
        let max_age = req.max_age.unwrap_or(self.default_max_age);

        if req.use_cache {
            if let Some(cached) = self.cache.read::<CachedStats>(RESULT_CACHE_KEY, max_age)? {
                info!(maps = cached.data.maps.len(), "map stats served from cache");
                return Ok(cached.data);
            }
        }

        let page = self.fetcher.fetch(&self.url, req.use_cache, max_age)?;
        if page.error {
            return Err(StatsError::Transport {
                url: self.url.clone(),
                reason: page.failure_reason(),
            });
        }

        let data = extract_stats(&page.text, page.time, &self.names);
        self.cache
            .write(RESULT_CACHE_KEY, &CachedStatsRef { data: &data })?;

        info!(
            maps = data.maps.len(),
            unknown_maps = data.unknown_maps,
            row_parse_failures = data.row_parse_failures,
            "map stats extracted"
        );
        if data.row_parse_failures > 0 {
            warn!(
                failures = data.row_parse_failures,
                "some map rows could not be parsed; the page layout may have changed"
            );
        }
        Ok(data)
    }

    /// Translation table plus a placeholder for every unknown map, or `None` when
    /// there is nothing new to add. `req` governs the statistics read behind it.
    pub fn map_names_diff(&self, req: StatsRequest) -> Result<Option<MapNamesDiff>, StatsError> {
        let stats = self.map_stats(req)?;
        Ok(MapNamesDiff::build(&self.names, &stats, Utc::now()))
    }
}

/// Parses a stats page into an [`ExtractionResult`] stamped with `fetch_time`.
pub fn extract_stats(
    html: &str,
    fetch_time: DateTime<Utc>,
    names: &dyn MapNameLookup,
) -> ExtractionResult {
    let rows = extract_rows(html);
    let parsed = parse_rows(&rows, names);
    ExtractionResult {
        maps: parsed.maps,
        fetch_time,
        unknown_maps: parsed.unknown_maps,
        row_parse_failures: parsed.row_parse_failures,
        statistical_significance_minimum: STATISTICAL_SIGNIFICANCE,
    }
}

/// Updated translation table: existing entries in their original order, then one
/// placeholder per newly seen map, sorted by Korean name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapNamesDiff {
    pub last_updated: DateTime<Utc>,
    pub maps: Vec<MapName>,
}

impl MapNamesDiff {
    pub fn build(
        table: &MapNameTable,
        stats: &ExtractionResult,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let mut added: Vec<MapName> = stats
            .unknown_map_records()
            .filter(|map| !table.entries().iter().any(|entry| entry.kor == map.name))
            .map(|map| MapName::placeholder(map.name.clone()))
            .collect();
        if added.is_empty() {
            return None;
        }
        added.sort_by(|a, b| a.kor.cmp(&b.kor));
        added.dedup();

        let mut maps = table.entries().to_vec();
        maps.extend(added);
        Some(Self {
            last_updated: now,
            maps,
        })
    }

    pub fn added(&self) -> impl Iterator<Item = &MapName> {
        self.maps.iter().filter(|map| map.eng.is_none())
    }

    /// `eng,kor` CSV with [`PLACEHOLDER`] for untranslated names.
    pub fn to_csv(&self) -> Result<String, StatsError> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(["eng", "kor"])?;
        for map in &self.maps {
            wtr.write_record([map.eng.as_deref().unwrap_or(PLACEHOLDER), map.kor.as_str()])?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
