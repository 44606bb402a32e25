//! Item resolution: detail page → catalog entry

use crate::catalog::{sanitize_name, CatalogEntry, ItemId};
use crate::config::StoreConfig;
use crate::crawler::fetcher::{FetchError, Fetcher, RequestKind};
use crate::crawler::frontier::ItemTask;
use crate::crawler::parser::{parse_detail_page, DetailPage};
use crate::state::ItemState;
use crate::url::{detail_url, download_url, is_detail_url_for, parse_detail_str, slug_to_name};
use thiserror::Error;
use url::Url;

/// Site name the store appends to page titles
const STORE_NAME: &str = "Chrome Web Store";

#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The item was removed or unpublished
    #[error("item {id} not found: {reason}")]
    NotFound { id: ItemId, reason: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The detail page came back but its shape was not recognized
    #[error("unrecognized detail page for {id}: {reason}")]
    Malformed { id: ItemId, reason: String },
}

impl ResolveError {
    /// Terminal frontier state for an item that failed this way
    pub fn item_state(&self) -> ItemState {
        match self {
            Self::NotFound { .. } => ItemState::NotFound,
            Self::Fetch(e) if e.is_transient() => ItemState::FailedTransient,
            Self::Fetch(_) => ItemState::FailedPermanent,
            Self::Malformed { .. } => ItemState::Malformed,
        }
    }
}

/// Resolves item tasks through the shared fetcher
#[derive(Debug, Clone)]
pub struct ItemResolver {
    fetcher: Fetcher,
    store: StoreConfig,
}

impl ItemResolver {
    pub fn new(fetcher: Fetcher, store: StoreConfig) -> Self {
        Self { fetcher, store }
    }

    /// URL fetched for a task: the listing's detail URL, else `{base}/detail/{id}`
    pub fn fetch_url(&self, task: &ItemTask) -> String {
        match &task.page_hint {
            Some(hint) if is_detail_url_for(hint, &task.id) => hint.clone(),
            _ => detail_url(&self.store.base_url, &task.id),
        }
    }

    pub async fn resolve(&self, task: &ItemTask) -> Result<CatalogEntry, ResolveError> {
        let id = &task.id;
        let url = self.fetch_url(task);

        let response = match self.fetcher.fetch(&url, RequestKind::Detail).await {
            Ok(response) => response,
            Err(e) if e.is_gone() => {
                return Err(ResolveError::NotFound {
                    id: id.clone(),
                    reason: e.reason.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if !is_detail_url_for(&response.url, id) {
            return Err(ResolveError::NotFound {
                id: id.clone(),
                reason: format!("redirected to {}", response.url),
            });
        }

        let base = Url::parse(&response.url).map_err(|e| ResolveError::Malformed {
            id: id.clone(),
            reason: e.to_string(),
        })?;
        let page = parse_detail_page(&response.body, &base).map_err(|e| {
            ResolveError::Malformed {
                id: id.clone(),
                reason: e.to_string(),
            }
        })?;

        self.build_entry(task, &response.url, page)
    }

    /// Picks name and page URL from a parsed detail page
    fn build_entry(
        &self,
        task: &ItemTask,
        final_url: &str,
        page: DetailPage,
    ) -> Result<CatalogEntry, ResolveError> {
        let id = &task.id;
        let malformed = |reason: &str| ResolveError::Malformed {
            id: id.clone(),
            reason: reason.to_string(),
        };

        if page == DetailPage::default() {
            return Err(malformed("no title or canonical URL"));
        }

        if let Some(canonical) = &page.canonical {
            if !is_detail_url_for(canonical, id) {
                return Err(ResolveError::NotFound {
                    id: id.clone(),
                    reason: format!("canonical URL is {}", canonical),
                });
            }
        }

        let page_url = [page.canonical.as_deref(), page.og_url.as_deref(), task.page_hint.as_deref()]
            .into_iter()
            .flatten()
            .find(|url| is_detail_url_for(url, id))
            .unwrap_or(final_url)
            .to_string();

        let name = page
            .og_title
            .as_deref()
            .and_then(usable_title)
            .or_else(|| page.title.as_deref().and_then(usable_title))
            .or_else(|| name_from_slug(&page_url))
            .or_else(|| task.page_hint.as_deref().and_then(name_from_slug))
            .ok_or_else(|| malformed("no display name"))?;

        let file = download_url(
            &self.store.download_url_template,
            &self.store.prodversion,
            id,
        );

        CatalogEntry::new(id.clone(), &name, page_url, file)
            .map_err(|e| malformed(&e.to_string()))
    }
}

/// A page title with the store suffix removed; None if nothing specific is left
fn usable_title(raw: &str) -> Option<String> {
    let suffix = format!(" - {}", STORE_NAME);
    let title = raw.trim();
    let title = title.strip_suffix(suffix.as_str()).unwrap_or(title);
    let name = sanitize_name(title)?;
    if name == STORE_NAME {
        None
    } else {
        Some(name)
    }
}

fn name_from_slug(url: &str) -> Option<String> {
    let slug = parse_detail_str(url).ok()?.slug?;
    sanitize_name(&slug_to_name(&slug)?)
}
