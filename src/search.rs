use crate::domain::{Region, SafeSearch, SearchResult};
use crate::error::HarvestError;

/// One image search as sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSearch {
    pub keywords: String,
    pub region: Region,
    pub safe_search: SafeSearch,
    pub max_results: usize,
}

/// Lazy, finite stream of results. An `Err` item is a provider-level failure.
pub type ImageStream<'a> = Box<dyn Iterator<Item = Result<SearchResult, HarvestError>> + 'a>;

/// External image search collaborator with an explicit session lifecycle.
pub trait SearchProvider {
    fn open(&mut self) -> Result<(), HarvestError>;

    fn images(&mut self, search: &ImageSearch) -> Result<ImageStream<'_>, HarvestError>;

    fn close(&mut self);
}

impl<P: SearchProvider + ?Sized> SearchProvider for &mut P {
    fn open(&mut self) -> Result<(), HarvestError> {
        (**self).open()
    }

    fn images(&mut self, search: &ImageSearch) -> Result<ImageStream<'_>, HarvestError> {
        (**self).images(search)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Open provider session; closed when dropped, including on error paths.
pub struct ProviderSession<'p, P: SearchProvider + ?Sized> {
    provider: &'p mut P,
}

impl<'p, P: SearchProvider + ?Sized> ProviderSession<'p, P> {
    pub fn open(provider: &'p mut P) -> Result<Self, HarvestError> {
        provider.open()?;
        Ok(Self { provider })
    }

    pub fn images(&mut self, search: &ImageSearch) -> Result<ImageStream<'_>, HarvestError> {
        self.provider.images(search)
    }
}

impl<P: SearchProvider + ?Sized> Drop for ProviderSession<'_, P> {
    fn drop(&mut self) {
        self.provider.close();
    }
}
