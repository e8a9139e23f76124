use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use crate::fetch::{PageSource, RawResponse};

const REQUEST_TIMEOUT_SECS: u64 = 15;
const CLIENT_USER_AGENT: &str = concat!("bwstats/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Live page source backed by the shared blocking client.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestSource;

impl PageSource for ReqwestSource {
    fn get(&self, url: &str) -> Result<RawResponse> {
        let client = http_client()?;
        let resp = client
            .get(url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .context("request failed")?;
        let status = resp.status().as_u16();
        let body = resp.text().context("failed reading body")?;
        Ok(RawResponse { status, body })
    }
}
