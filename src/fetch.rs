#[cfg(unix)]
use std::fs::Permissions;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use camino::Utf8Path;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tempfile::Builder;

use crate::error::{FetchError, HarvestError};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Downloads one URL to one destination path. Exactly one attempt per call.
pub trait Fetcher {
    /// Returns the number of bytes written. On error nothing is left at
    /// `destination`.
    fn fetch(&self, url: &str, destination: &Utf8Path) -> Result<u64, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &str, destination: &Utf8Path) -> Result<u64, FetchError> {
        (**self).fetch(url, destination)
    }
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, HarvestError> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|err| HarvestError::HttpClient(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, destination: &Utf8Path) -> Result<u64, FetchError> {
        let mut response = self.client.get(url).send()?.error_for_status()?;

        let parent = destination
            .parent()
            .ok_or_else(|| FetchError::Io(format!("no parent directory for {destination}")))?;
        let mut builder = Builder::new();
        builder.prefix(".partial-");
        // Same mode as File::create, still subject to the umask.
        #[cfg(unix)]
        builder.permissions(Permissions::from_mode(0o666));
        let mut partial = builder.tempfile_in(parent.as_std_path())?;
        let written = std::io::copy(&mut response, partial.as_file_mut())?;
        partial.as_file_mut().flush()?;
        partial
            .persist(destination.as_std_path())
            .map_err(|err| FetchError::from(err.error))?;
        Ok(written)
    }
}
