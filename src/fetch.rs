use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheError, CacheStore};
use crate::slug::{slugify, slugify_url};

/// Status line and body of a completed HTTP exchange, whatever the status.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// The single "fetch by URL" capability the fetcher needs.
///
/// `Err` means the request never produced a response (DNS, connect, timeout, body read).
pub trait PageSource {
    fn get(&self, url: &str) -> Result<RawResponse>;
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn get(&self, url: &str) -> Result<RawResponse> {
        (**self).get(url)
    }
}

/// A fetched page as stored in the page cache.
///
/// Failed fetches carry `error = true`, an empty `text` and a `reason`; they are
/// returned to the caller but never written to the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedPage {
    pub text: String,
    pub status: Option<u16>,
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub time: DateTime<Utc>,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        !self.error
    }

    /// Human-readable failure description for an error-flagged page.
    pub fn failure_reason(&self) -> String {
        match (&self.reason, self.status) {
            (Some(reason), _) => reason.clone(),
            (None, Some(status)) => format!("http status {status}"),
            (None, None) => "unknown fetch failure".to_string(),
        }
    }
}

pub struct PageFetcher<S> {
    source: S,
    cache: CacheStore,
}

impl<S: PageSource> PageFetcher<S> {
    pub fn new(source: S, cache: CacheStore) -> Self {
        Self { source, cache }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the page from cache when allowed and fresh, else fetches it live.
    ///
    /// Only cache I/O failures are errors; transport failures come back as an
    /// error-flagged [`FetchedPage`].
    pub fn fetch(
        &self,
        url: &str,
        use_cache: bool,
        max_age: Duration,
    ) -> Result<FetchedPage, CacheError> {
        if !use_cache {
            return Ok(self.fetch_live(url));
        }

        let slug = page_cache_key(url);
        if let Some(cached) = self.cache.read::<FetchedPage>(&slug, max_age)? {
            debug!(url, slug = %slug, "page served from cache");
            return Ok(cached);
        }

        let page = self.fetch_live(url);
        if page.error {
            return Ok(page);
        }
        self.cache.write(&slug, &page)?;
        Ok(page)
    }

    fn fetch_live(&self, url: &str) -> FetchedPage {
        info!(url, "fetching page");
        match self.source.get(url) {
            Ok(resp) if (200..300).contains(&resp.status) => FetchedPage {
                text: resp.body,
                status: Some(resp.status),
                error: false,
                reason: None,
                time: Utc::now(),
            },
            Ok(resp) => {
                warn!(url, status = resp.status, "page fetch returned non-success status");
                FetchedPage {
                    text: String::new(),
                    status: Some(resp.status),
                    error: true,
                    reason: None,
                    time: Utc::now(),
                }
            }
            Err(err) => {
                warn!(url, error = %format!("{err:#}"), "page fetch failed");
                FetchedPage {
                    text: String::new(),
                    status: None,
                    error: true,
                    reason: Some(format!("{err:#}")),
                    time: Utc::now(),
                }
            }
        }
    }
}

/// Cache slug for a page URL. Unparseable URLs are slugified verbatim.
pub fn page_cache_key(url: &str) -> String {
    slugify_url(url).unwrap_or_else(|_| slugify(url))
}
