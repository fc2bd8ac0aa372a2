use std::collections::HashMap;
use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::Proxy;

use crate::error::ScrapeError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Page-fetching seam between the pipeline and the HTTP layer.
pub trait Fetch: Sync {
    /// GET a page and return its body.
    fn get(&self, url: &str) -> Result<String, ScrapeError>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn get(&self, url: &str) -> Result<String, ScrapeError> {
        (**self).get(url)
    }
}

/// Blocking HTTP fetcher carrying the site headers and an optional proxy
/// pool. Each request picks a random proxy, so a fresh client is built per
/// call (a reqwest client is bound to its proxy at build time).
pub struct Fetcher {
    headers: HeaderMap,
    proxies: Vec<String>,
}

impl Fetcher {
    pub fn new(
        headers: &HashMap<String, String>,
        proxies: Vec<String>,
    ) -> Result<Self, ScrapeError> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ScrapeError::Header(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ScrapeError::Header(value.clone()))?;
            header_map.insert(name, value);
        }
        if !header_map.contains_key(USER_AGENT) {
            header_map.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }
        Ok(Self {
            headers: header_map,
            proxies,
        })
    }

    pub fn without_proxies(headers: &HashMap<String, String>) -> Result<Self, ScrapeError> {
        Self::new(headers, Vec::new())
    }

    fn pick_proxy(&self) -> Option<&String> {
        self.proxies.choose(&mut rand::thread_rng())
    }

    fn client(&self) -> Result<Client, ScrapeError> {
        let mut builder = Client::builder()
            .default_headers(self.headers.clone())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            // Proxied retail traffic presents self-signed certificates.
            .danger_accept_invalid_certs(true);

        if let Some(proxy_url) = self.pick_proxy() {
            builder = builder.proxy(Proxy::all(proxy_url)?);
        }

        Ok(builder.build()?)
    }

    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }
}

impl Fetch for Fetcher {
    /// A non-success status is an error; there is no retry.
    fn get(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.client()?.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }
}
