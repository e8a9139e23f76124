pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http_client;
pub mod map_stats;
pub mod model;
pub mod names;
pub mod nickname;
pub mod page;
pub mod parser;
pub mod slug;

pub use error::StatsError;
pub use map_stats::{MapNamesDiff, MapStatsService, StatsRequest};
pub use model::{ExtractionResult, MapRecord, Race, RaceStats};
