use std::collections::VecDeque;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{SafeSearch, SearchResult};
use crate::error::HarvestError;
use crate::fetch::BROWSER_USER_AGENT;
use crate::search::{ImageSearch, ImageStream, SearchProvider};

const DUCKDUCKGO_BASE: &str = "https://duckduckgo.com";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

static VQD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"vqd=["']?([0-9-]+)"#).expect("static regex"));
static OFFSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]s=(\d+)").expect("static regex"));

/// DuckDuckGo image search. The HTTP client lives only between `open` and
/// `close`.
pub struct DuckDuckGoProvider {
    base_url: String,
    timeout: Duration,
    client: Option<Client>,
}

impl DuckDuckGoProvider {
    pub fn new() -> Self {
        Self::with_base_url(DUCKDUCKGO_BASE)
    }

    /// Points the provider at another host, e.g. a mock server.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: SEARCH_TIMEOUT,
            client: None,
        }
    }

    fn fetch_vqd(
        client: &Client,
        base_url: &str,
        keywords: &str,
    ) -> Result<String, HarvestError> {
        let response = client
            .get(format!("{base_url}/"))
            .query(&[("q", keywords)])
            .send()
            .map_err(|err| HarvestError::SearchHttp(err.to_string()))?;
        let body = handle_status(response)?
            .text()
            .map_err(|err| HarvestError::SearchHttp(err.to_string()))?;
        extract_vqd(&body).ok_or_else(|| HarvestError::SearchToken(keywords.to_string()))
    }
}

impl Default for DuckDuckGoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchProvider for DuckDuckGoProvider {
    fn open(&mut self) -> Result<(), HarvestError> {
        if self.client.is_some() {
            return Ok(());
        }
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        let referer = HeaderValue::from_str(&format!("{}/", self.base_url))
            .map_err(|err| HarvestError::HttpClient(err.to_string()))?;
        headers.insert(REFERER, referer);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .map_err(|err| HarvestError::HttpClient(err.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    fn images(&mut self, search: &ImageSearch) -> Result<ImageStream<'_>, HarvestError> {
        let client = self.client.as_ref().ok_or(HarvestError::ProviderClosed)?;
        let vqd = Self::fetch_vqd(client, &self.base_url, &search.keywords)?;
        debug!(query = %search.keywords, "obtained image search token");
        Ok(Box::new(DuckDuckGoImages {
            client,
            base_url: &self.base_url,
            params: page_params(search, vqd),
            buffer: VecDeque::new(),
            offset: None,
            exhausted: false,
            remaining: search.max_results,
        }))
    }

    fn close(&mut self) {
        self.client = None;
    }
}

struct DuckDuckGoImages<'a> {
    client: &'a Client,
    base_url: &'a str,
    params: Vec<(&'static str, String)>,
    buffer: VecDeque<SearchResult>,
    offset: Option<String>,
    exhausted: bool,
    remaining: usize,
}

impl DuckDuckGoImages<'_> {
    fn fetch_page(&self) -> Result<ImagesPage, HarvestError> {
        let mut request = self
            .client
            .get(format!("{}/i.js", self.base_url))
            .query(&self.params);
        if let Some(offset) = &self.offset {
            request = request.query(&[("s", offset)]);
        }
        let response = request
            .send()
            .map_err(|err| HarvestError::SearchHttp(err.to_string()))?;
        handle_status(response)?
            .json::<ImagesPage>()
            .map_err(|err| HarvestError::SearchParse(err.to_string()))
    }

    fn absorb(&mut self, page: ImagesPage) {
        self.offset = page.next.as_deref().and_then(next_offset);
        if page.results.is_empty() {
            warn!("image search returned an empty page");
        }
        if page.results.is_empty() || self.offset.is_none() {
            self.exhausted = true;
        }
        self.buffer.extend(page.results.into_iter().map(SearchResult::from));
    }
}

impl Iterator for DuckDuckGoImages<'_> {
    type Item = Result<SearchResult, HarvestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        if self.buffer.is_empty() {
            if self.exhausted {
                return None;
            }
            match self.fetch_page() {
                Ok(page) => self.absorb(page),
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
        let item = self.buffer.pop_front()?;
        self.remaining -= 1;
        Some(Ok(item))
    }
}

#[derive(Debug, Deserialize)]
struct ImagesPage {
    #[serde(default)]
    results: Vec<RawImage>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl From<RawImage> for SearchResult {
    fn from(raw: RawImage) -> Self {
        Self {
            image: raw.image,
            thumbnail: raw.thumbnail,
            width: raw.width,
            height: raw.height,
            title: raw.title,
            source: raw.url,
        }
    }
}

fn page_params(search: &ImageSearch, vqd: String) -> Vec<(&'static str, String)> {
    let safe = match search.safe_search {
        SafeSearch::On | SafeSearch::Moderate => "1",
        SafeSearch::Off => "-1",
    };
    vec![
        ("l", search.region.as_str().to_string()),
        ("o", "json".to_string()),
        ("q", search.keywords.clone()),
        ("vqd", vqd),
        ("f", ",,,,,,".to_string()),
        ("p", safe.to_string()),
    ]
}

fn handle_status(response: Response) -> Result<Response, HarvestError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "image search request failed".to_string());
    Err(HarvestError::SearchStatus { status, message })
}

pub fn extract_vqd(html: &str) -> Option<String> {
    VQD_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().to_string())
}

/// Offset for the next page, taken from the `s` parameter of a `next` link.
pub fn next_offset(next: &str) -> Option<String> {
    OFFSET_RE
        .captures(next)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().to_string())
}
