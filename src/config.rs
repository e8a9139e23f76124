use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const URL_MAP_STATS: &str = "https://eloboard.com/men/bbs/board.php?bo_table=map_stac";

const CACHE_DIR: &str = "bwstats";
const DEFAULT_MAX_AGE_HOURS: u64 = 24;

#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub cache_dir: PathBuf,
    pub max_age: Duration,
    pub use_cache: bool,
    pub url: String,
    pub map_names_path: Option<PathBuf>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_age: Duration::from_secs(DEFAULT_MAX_AGE_HOURS * 60 * 60),
            use_cache: true,
            url: URL_MAP_STATS.to_string(),
            map_names_path: None,
        }
    }
}

impl StatsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let cache_dir = env::var("BWSTATS_CACHE_DIR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);
        let max_age_hours = env::var("BWSTATS_CACHE_MAX_AGE_HOURS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_AGE_HOURS)
            .clamp(1, 720);
        let url = env::var("BWSTATS_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.url);
        let map_names_path = env::var("BWSTATS_MAP_NAMES")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Self {
            cache_dir,
            max_age: Duration::from_secs(max_age_hours * 60 * 60),
            use_cache: env_bool("BWSTATS_USE_CACHE", true),
            url,
            map_names_path,
        }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_map_names_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.map_names_path = Some(path.into());
        self
    }
}

/// Platform cache directory for this tool, `$XDG_CACHE_HOME/bwstats` or `~/.cache/bwstats`.
///
/// Falls back to a relative `.cache/bwstats` when neither variable is usable.
pub fn default_cache_dir() -> PathBuf {
    // Prefer XDG cache.
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return PathBuf::from(base).join(CACHE_DIR);
        }
    }
    match env::var("HOME") {
        Ok(home) if !home.trim().is_empty() => PathBuf::from(home).join(".cache").join(CACHE_DIR),
        _ => PathBuf::from(".cache").join(CACHE_DIR),
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_a_day_long_window() {
        let cfg = StatsConfig::default();
        assert_eq!(cfg.max_age, Duration::from_secs(86_400));
        assert!(cfg.use_cache);
        assert_eq!(cfg.url, URL_MAP_STATS);
        assert!(cfg.cache_dir.ends_with(CACHE_DIR));
    }

    #[test]
    fn builders_override_fields() {
        let cfg = StatsConfig::default()
            .with_cache_dir("/tmp/elsewhere")
            .with_max_age(Duration::from_secs(5))
            .with_use_cache(false)
            .with_url("http://localhost/stats")
            .with_map_names_path("names.csv");
        assert_eq!(cfg.cache_dir, PathBuf::from("/tmp/elsewhere"));
        assert_eq!(cfg.max_age, Duration::from_secs(5));
        assert!(!cfg.use_cache);
        assert_eq!(cfg.url, "http://localhost/stats");
        assert_eq!(cfg.map_names_path, Some(PathBuf::from("names.csv")));
    }
}
