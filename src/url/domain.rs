use url::Url;

/// Extracts the rate-limiting key for a URL: its lowercase host plus any
/// explicit non-default port
///
/// Requests that share a key share one interval gate.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use cws_lister::url::host_key;
///
/// let url = Url::parse("https://ChromeWebStore.Google.com/detail/x").unwrap();
/// assert_eq!(host_key(&url), Some("chromewebstore.google.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/sitemap").unwrap();
/// assert_eq!(host_key(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}
