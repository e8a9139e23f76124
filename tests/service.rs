use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use anyhow::{Result, anyhow};

use bwstats::cache::CacheStore;
use bwstats::config::StatsConfig;
use bwstats::fetch::{PageSource, RawResponse, page_cache_key};
use bwstats::map_stats::RESULT_CACHE_KEY;
use bwstats::names::{MapName, MapNameTable};
use bwstats::{MapStatsService, StatsError, StatsRequest};

const URL: &str = "https://eloboard.com/men/bbs/board.php?bo_table=map_stac";

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Serves queued responses in order, repeating the last one.
struct StubSource {
    responses: RefCell<Vec<Result<RawResponse, String>>>,
    calls: Cell<usize>,
}

impl StubSource {
    fn new(responses: Vec<Result<RawResponse, String>>) -> Self {
        Self {
            responses: RefCell::new(responses),
            calls: Cell::new(0),
        }
    }

    fn page(status: u16, body: &str) -> Result<RawResponse, String> {
        Ok(RawResponse {
            status,
            body: body.to_string(),
        })
    }
}

impl PageSource for StubSource {
    fn get(&self, url: &str) -> Result<RawResponse> {
        assert_eq!(url, URL);
        self.calls.set(self.calls.get() + 1);
        let mut responses = self.responses.borrow_mut();
        let next = if responses.len() > 1 {
            responses.remove(0)
        } else {
            responses[0].clone()
        };
        next.map_err(|reason| anyhow!(reason))
    }
}

fn names() -> MapNameTable {
    MapNameTable::new(vec![
        MapName::new("Fighting Spirit", "투혼"),
        MapName::new("Polypoid", "폴리포이드"),
        MapName::new("Circuit Breaker", "서킷브레이커"),
    ])
}

fn service(dir: &tempfile::TempDir, source: StubSource) -> MapStatsService<StubSource> {
    let config = StatsConfig::default().with_cache_dir(dir.path()).with_url(URL);
    MapStatsService::new(&config, source, names())
}

fn age_file(path: PathBuf, age: Duration) {
    let file = File::options().write(true).open(path).expect("cache file exists");
    file.set_modified(SystemTime::now() - age).expect("set mtime");
}

#[test]
fn second_call_is_served_from_result_cache() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir, StubSource::new(vec![StubSource::page(200, &read_fixture("map_stats.html"))]));

    let first = svc.map_stats(StatsRequest::default()).unwrap();
    let second = svc.map_stats(StatsRequest::default()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.maps.len(), 4);
    assert_eq!(svc.source().calls.get(), 1);
    assert!(dir.path().join(format!("{RESULT_CACHE_KEY}.json")).is_file());
    assert!(dir.path().join(format!("{}.json", page_cache_key(URL))).is_file());
}

#[test]
fn result_cache_wraps_data() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir, StubSource::new(vec![StubSource::page(200, &read_fixture("map_stats.html"))]));
    svc.map_stats(StatsRequest::default()).unwrap();

    let raw = fs::read_to_string(dir.path().join("MapStatsData.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["data"]["maps"][0]["name"], "Fighting Spirit");

    let page: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join(format!("{}.json", page_cache_key(URL)))).unwrap(),
    )
    .unwrap();
    assert_eq!(page["status"], 200);
    assert_eq!(page["error"], false);
    assert!(page["text"].as_str().unwrap().contains("list-board"));
    assert!(page["time"].is_string());
}

#[test]
fn expired_result_falls_back_to_cached_page() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir, StubSource::new(vec![StubSource::page(200, &read_fixture("map_stats.html"))]));
    let first = svc.map_stats(StatsRequest::default()).unwrap();

    let store = CacheStore::new(dir.path());
    age_file(store.path_for(RESULT_CACHE_KEY).unwrap(), Duration::from_secs(2 * 86_400));

    let second = svc.map_stats(StatsRequest::default()).unwrap();
    assert_eq!(svc.source().calls.get(), 1);
    assert_eq!(second.fetch_time, first.fetch_time);
}

#[test]
fn short_max_age_forces_a_live_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir, StubSource::new(vec![StubSource::page(200, &read_fixture("map_stats.html"))]));
    svc.map_stats(StatsRequest::default()).unwrap();

    let store = CacheStore::new(dir.path());
    let hour = Duration::from_secs(3600);
    age_file(store.path_for(RESULT_CACHE_KEY).unwrap(), 2 * hour);
    age_file(store.path_for(&page_cache_key(URL)).unwrap(), 2 * hour);

    svc.map_stats(StatsRequest {
        max_age: Some(hour),
        use_cache: true,
    })
    .unwrap();
    assert_eq!(svc.source().calls.get(), 2);
}

#[test]
fn bypassing_caches_refetches_and_rewrites() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir, StubSource::new(vec![StubSource::page(200, &read_fixture("map_stats.html"))]));
    let refresh = StatsRequest {
        max_age: None,
        use_cache: false,
    };
    svc.map_stats(refresh).unwrap();
    svc.map_stats(refresh).unwrap();
    assert_eq!(svc.source().calls.get(), 2);
    assert!(dir.path().join("MapStatsData.json").is_file());
}

#[test]
fn transport_failure_is_surfaced_and_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(
        &dir,
        StubSource::new(vec![
            Err("connection reset".to_string()),
            StubSource::page(200, &read_fixture("map_stats.html")),
        ]),
    );

    let err = svc.map_stats(StatsRequest::default()).unwrap_err();
    match err {
        StatsError::Transport { url, reason } => {
            assert_eq!(url, URL);
            assert!(reason.contains("connection reset"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("MapStatsData.json").exists());

    let stats = svc.map_stats(StatsRequest::default()).unwrap();
    assert_eq!(stats.maps.len(), 4);
    assert_eq!(svc.source().calls.get(), 2);
}

#[test]
fn http_error_status_is_a_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir, StubSource::new(vec![StubSource::page(502, "bad gateway")]));

    let err = svc.map_stats(StatsRequest::default()).unwrap_err();
    assert!(matches!(err, StatsError::Transport { .. }));
    assert!(err.to_string().contains("502"));
}

#[test]
fn corrupt_result_cache_is_a_hard_failure() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("MapStatsData.json"), "{\"data\": ").unwrap();
    let svc = service(&dir, StubSource::new(vec![StubSource::page(200, &read_fixture("map_stats.html"))]));

    let err = svc.map_stats(StatsRequest::default()).unwrap_err();
    assert!(matches!(err, StatsError::Cache(_)));
    assert_eq!(svc.source().calls.get(), 0);
}

#[test]
fn names_diff_adds_placeholder_for_unknown_map() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir, StubSource::new(vec![StubSource::page(200, &read_fixture("map_stats.html"))]));

    let diff = svc.map_names_diff(StatsRequest::default()).unwrap().expect("one unknown map");
    assert_eq!(diff.maps.len(), 4);
    assert_eq!(diff.maps[3], MapName::placeholder("라그나로크"));
    assert_eq!(diff.added().count(), 1);

    let csv = diff.to_csv().unwrap();
    assert!(csv.starts_with("eng,kor\n"));
    assert!(csv.ends_with("PLACEHOLDER,라그나로크\n"));
}

#[test]
fn names_diff_is_none_when_everything_is_translated() {
    let dir = tempfile::tempdir().unwrap();
    let mut table = names().entries().to_vec();
    table.push(MapName::new("Ragnarok", "라그나로크"));
    let config = StatsConfig::default().with_cache_dir(dir.path()).with_url(URL);
    let svc = MapStatsService::new(
        &config,
        StubSource::new(vec![StubSource::page(200, &read_fixture("map_stats.html"))]),
        MapNameTable::new(table),
    );

    let refresh = StatsRequest {
        max_age: None,
        use_cache: false,
    };
    assert!(svc.map_names_diff(refresh).unwrap().is_none());
}

#[test]
fn names_diff_honours_short_max_age() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir, StubSource::new(vec![StubSource::page(200, &read_fixture("map_stats.html"))]));
    svc.map_names_diff(StatsRequest::default()).unwrap();

    let store = CacheStore::new(dir.path());
    let hour = Duration::from_secs(3600);
    age_file(store.path_for(RESULT_CACHE_KEY).unwrap(), 2 * hour);
    age_file(store.path_for(&page_cache_key(URL)).unwrap(), 2 * hour);

    svc.map_names_diff(StatsRequest::default()).unwrap();
    assert_eq!(svc.source().calls.get(), 1);

    let diff = svc
        .map_names_diff(StatsRequest {
            max_age: Some(hour),
            use_cache: true,
        })
        .unwrap()
        .expect("one unknown map");
    assert_eq!(diff.added().count(), 1);
    assert_eq!(svc.source().calls.get(), 2);
}
