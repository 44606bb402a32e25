use crate::UrlError;
use url::Url;

/// Query parameters that never change what a listing page returns
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
];

/// Normalizes a listing or detail URL into the form used as a frontier key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require http or https and a host
/// 3. Lowercase the host (done by the parser) and resolve dot segments
/// 4. Remove the fragment
/// 5. Remove tracking query parameters, keeping the rest untouched
/// 6. Remove an empty query string
///
/// The scheme, path and remaining query are kept verbatim: shard and page
/// parameters are meaningful to the store.
///
/// # Examples
///
/// ```
/// use cws_lister::url::normalize_url;
///
/// let url = normalize_url("https://ChromeWebStore.google.com/sitemap?shard=2#top").unwrap();
/// assert_eq!(url.as_str(), "https://chromewebstore.google.com/sitemap?shard=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let total = url.query_pairs().count();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else if kept.len() != total {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
