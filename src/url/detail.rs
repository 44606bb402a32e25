//! Store detail URLs: `{base}/detail/{slug}/{id}` or `{base}/detail/{id}`

use crate::catalog::ItemId;
use crate::{UrlError, UrlResult};
use percent_encoding::percent_decode_str;
use url::Url;

/// Path segment that introduces an item detail page
pub const DETAIL_SEGMENT: &str = "detail";

/// An item reference pulled out of a detail URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRef {
    pub id: ItemId,

    /// Human-readable slug preceding the id, if the URL has one
    pub slug: Option<String>,
}

/// Parses a detail URL into its id and optional slug
///
/// The `detail` segment may appear anywhere in the path so localized
/// prefixes are accepted. Exactly one or two segments must follow it.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use cws_lister::url::parse_detail_url;
///
/// let url = Url::parse(
///     "https://chromewebstore.google.com/detail/google-translate/aapbdbdomjkkjkaonfhkkikfgjllcleb",
/// )
/// .unwrap();
/// let detail = parse_detail_url(&url).unwrap();
/// assert_eq!(detail.id.as_str(), "aapbdbdomjkkjkaonfhkkikfgjllcleb");
/// assert_eq!(detail.slug.as_deref(), Some("google-translate"));
/// ```
pub fn parse_detail_url(url: &Url) -> UrlResult<DetailRef> {
    let not_detail = || UrlError::NotADetailUrl(url.to_string());

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(not_detail());
    }

    let segments: Vec<&str> = url
        .path_segments()
        .ok_or_else(not_detail)?
        .filter(|s| !s.is_empty())
        .collect();

    let start = segments
        .iter()
        .position(|s| *s == DETAIL_SEGMENT)
        .ok_or_else(not_detail)?;

    match &segments[start + 1..] {
        [id] => Ok(DetailRef {
            id: ItemId::parse(id)?,
            slug: None,
        }),
        [slug, id] => Ok(DetailRef {
            id: ItemId::parse(id)?,
            slug: Some((*slug).to_string()),
        }),
        _ => Err(not_detail()),
    }
}

/// Same as [`parse_detail_url`] for an unparsed string
pub fn parse_detail_str(url: &str) -> UrlResult<DetailRef> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;
    parse_detail_url(&parsed)
}

/// True if `url` is a detail URL for exactly this id
pub fn is_detail_url_for(url: &str, id: &ItemId) -> bool {
    matches!(parse_detail_str(url), Ok(detail) if &detail.id == id)
}

/// Builds the slug-less detail URL the store redirects to the canonical one
pub fn detail_url(base_url: &str, id: &ItemId) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        DETAIL_SEGMENT,
        id
    )
}

/// Derives a display name from a URL slug: percent-decoded, `-` read as a space
///
/// Returns `None` for an empty slug.
pub fn slug_to_name(slug: &str) -> Option<String> {
    let decoded = percent_decode_str(slug).decode_utf8_lossy();

    let name = decoded.replace('-', " ");
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Substitutes `{prodversion}` and `{id}` into a download URL template
///
/// # Examples
///
/// ```
/// use cws_lister::ItemId;
/// use cws_lister::url::download_url;
///
/// let id = ItemId::parse("aapbdbdomjkkjkaonfhkkikfgjllcleb").unwrap();
/// let url = download_url("https://dl.example/crx?v={prodversion}&x=id%3D{id}", "138", &id);
/// assert_eq!(url, "https://dl.example/crx?v=138&x=id%3Daapbdbdomjkkjkaonfhkkikfgjllcleb");
/// ```
pub fn download_url(template: &str, prodversion: &str, id: &ItemId) -> String {
    template
        .replace("{prodversion}", prodversion)
        .replace("{id}", id.as_str())
}
