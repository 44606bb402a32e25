use crate::catalog::CatalogEntry;
use crate::config::Config;
use crate::crawler::fetcher::{FetchError, Fetcher, RequestKind};
use crate::crawler::frontier::{ItemTask, ListingPage, SeedOrigin, SeedTask};
use crate::crawler::parser::{parse_listing, parse_sitemap, ParseError};
use crate::crawler::resolver::{ItemResolver, ResolveError};
use std::future::Future;
use thiserror::Error;
use url::Url;

/// Why a seed task produced no listing
#[derive(Debug, Clone, Error)]
pub enum ListingError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not parse listing {url}: {source}")]
    Parse { url: String, source: ParseError },
}

/// Where listings and item details come from.
///
/// The run coordinator only talks to this seam, so runs can be driven by a
/// synthetic catalog in tests.
pub trait CatalogSource: Send + Sync + Clone + 'static {
    /// Fetches and parses one listing surface
    fn fetch_listing(
        &self,
        task: &SeedTask,
    ) -> impl Future<Output = Result<ListingPage, ListingError>> + Send;

    /// Resolves one item into a catalog entry
    fn resolve(
        &self,
        task: &ItemTask,
    ) -> impl Future<Output = Result<CatalogEntry, ResolveError>> + Send;

    /// Retries performed so far
    fn retries(&self) -> u64 {
        0
    }

    /// Requests sent so far
    fn requests(&self) -> u64 {
        0
    }
}

/// The live store behind one shared [`Fetcher`]
#[derive(Debug, Clone)]
pub struct StoreSource {
    fetcher: Fetcher,
    resolver: ItemResolver,
}

impl StoreSource {
    pub fn new(fetcher: Fetcher, config: &Config) -> Self {
        let resolver = ItemResolver::new(fetcher.clone(), config.store.clone());
        Self { fetcher, resolver }
    }

    /// Builds the HTTP client and fetcher from the configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let fetcher = Fetcher::from_config(&config.user_agent, &config.fetcher)?;
        Ok(Self::new(fetcher, config))
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }
}

impl CatalogSource for StoreSource {
    async fn fetch_listing(&self, task: &SeedTask) -> Result<ListingPage, ListingError> {
        let response = self.fetcher.fetch(&task.url, RequestKind::Listing).await?;

        let parse_error = |source| ListingError::Parse {
            url: task.url.clone(),
            source,
        };
        let base = Url::parse(&response.url)
            .map_err(|e| parse_error(ParseError::BaseUrl(e.to_string())))?;
        // A shard listed by an index must be a sitemap; anything else is
        // typically a consent or error page served with status 200
        let parsed = match task.origin {
            SeedOrigin::Index => parse_sitemap(&response.body, &base),
            SeedOrigin::Configured | SeedOrigin::Cursor => parse_listing(&response.body, &base),
        };
        let mut page = parsed.map_err(parse_error)?;

        // Cursor loops are detected against the URL that was scheduled
        page.source_url = task.url.clone();
        Ok(page)
    }

    async fn resolve(&self, task: &ItemTask) -> Result<CatalogEntry, ResolveError> {
        self.resolver.resolve(task).await
    }

    fn retries(&self) -> u64 {
        self.fetcher.retries()
    }

    fn requests(&self) -> u64 {
        self.fetcher.requests()
    }
}
