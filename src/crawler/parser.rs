//! Parsers for fetched store surfaces
//!
//! This module handles:
//! - Listing surfaces: sitemap indexes, sitemap url sets and paginated HTML
//!   listings, turned into a [`ListingPage`]
//! - Detail pages: the title and canonical URL candidates the resolver
//!   picks from
//!
//! Sitemaps are XML, but html5ever parses them leniently as unknown
//! elements, so one parser serves both.

use crate::crawler::frontier::{ItemTask, ListingPage};
use crate::url::parse_detail_url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty body")]
    EmptyBody,

    #[error("invalid selector {0}")]
    Selector(String),

    #[error("invalid base URL {0}")]
    BaseUrl(String),

    #[error("expected a sitemap, got an HTML page")]
    NotASitemap,
}

/// The shape of a listing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    /// `<sitemapindex>`: yields child listings only
    SitemapIndex,
    /// `<urlset>`: yields detail URLs
    UrlSet,
    /// Any other document: detail links plus an optional next page
    Html,
}

/// Title and URL candidates found on a detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailPage {
    /// `<meta property="og:title">`
    pub og_title: Option<String>,

    /// `<title>`
    pub title: Option<String>,

    /// `<link rel="canonical">`, absolute
    pub canonical: Option<String>,

    /// `<meta property="og:url">`, absolute
    pub og_url: Option<String>,
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::Selector(css.to_string()))
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parses a listing surface fetched from `source_url`
///
/// Detail URLs become item tasks (first occurrence per page wins); any
/// other URL in a url set is skipped.
///
/// # Example
///
/// ```
/// use cws_lister::crawler::parse_listing;
/// use url::Url;
///
/// let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
/// <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
///   <sitemap><loc>https://chromewebstore.google.com/sitemap?shard=0</loc></sitemap>
/// </sitemapindex>"#;
/// let source = Url::parse("https://chromewebstore.google.com/sitemap").unwrap();
/// let page = parse_listing(xml, &source).unwrap();
/// assert_eq!(page.children, vec!["https://chromewebstore.google.com/sitemap?shard=0"]);
/// ```
pub fn parse_listing(body: &str, source_url: &Url) -> Result<ListingPage, ParseError> {
    parse_surface(body, source_url, true)
}

/// Parses a surface that must be a sitemap index or url set
///
/// Sitemap shards are fetched because an index listed them, so an HTML
/// document in their place (a consent interstitial, an error page) is
/// rejected instead of being read as an empty listing.
pub fn parse_sitemap(body: &str, source_url: &Url) -> Result<ListingPage, ParseError> {
    parse_surface(body, source_url, false)
}

fn parse_surface(
    body: &str,
    source_url: &Url,
    allow_html: bool,
) -> Result<ListingPage, ParseError> {
    if body.trim().is_empty() {
        return Err(ParseError::EmptyBody);
    }

    let document = Html::parse_document(body);
    let kind = listing_kind(&document)?;
    if kind == ListingKind::Html && !allow_html {
        return Err(ParseError::NotASitemap);
    }

    let mut page = ListingPage {
        source_url: source_url.to_string(),
        ..ListingPage::default()
    };

    let skipped = match kind {
        ListingKind::SitemapIndex => {
            let loc = selector("sitemapindex sitemap > loc")?;
            page.children = document
                .select(&loc)
                .filter_map(element_text)
                .filter_map(|href| resolve_link(&href, source_url))
                .map(String::from)
                .collect();
            0
        }
        ListingKind::UrlSet => {
            let loc = selector("urlset url > loc")?;
            let locs = document
                .select(&loc)
                .filter_map(element_text)
                .filter_map(|href| resolve_link(&href, source_url));
            collect_items(locs, &mut page.items)
        }
        ListingKind::Html => {
            let anchors = selector("a[href]")?;
            let links = document
                .select(&anchors)
                .filter_map(|a| a.value().attr("href"))
                .filter_map(|href| resolve_link(href, source_url));
            let skipped = collect_items(links, &mut page.items);
            page.next_cursor = extract_next(&document, source_url)?;
            skipped
        }
    };

    tracing::debug!(
        "Parsed {:?} {}: {} items, {} children, next={:?}, {} links skipped",
        kind,
        source_url,
        page.items.len(),
        page.children.len(),
        page.next_cursor,
        skipped
    );
    Ok(page)
}

fn listing_kind(document: &Html) -> Result<ListingKind, ParseError> {
    if document.select(&selector("sitemapindex")?).next().is_some() {
        Ok(ListingKind::SitemapIndex)
    } else if document.select(&selector("urlset")?).next().is_some() {
        Ok(ListingKind::UrlSet)
    } else {
        Ok(ListingKind::Html)
    }
}

/// Appends one task per distinct detail URL; returns how many URLs were not detail URLs
fn collect_items(urls: impl Iterator<Item = Url>, items: &mut Vec<ItemTask>) -> usize {
    let mut seen = HashSet::new();
    let mut skipped = 0;

    for url in urls {
        match parse_detail_url(&url) {
            Ok(detail) => {
                if seen.insert(detail.id.clone()) {
                    items.push(ItemTask::with_hint(detail.id, url.to_string()));
                }
            }
            Err(_) => skipped += 1,
        }
    }

    skipped
}

/// `<link rel="next">`, else `<a rel="next">`
fn extract_next(document: &Html, base_url: &Url) -> Result<Option<String>, ParseError> {
    for css in ["link[rel~='next'][href]", "a[rel~='next'][href]"] {
        let next = document
            .select(&selector(css)?)
            .filter_map(|e| e.value().attr("href"))
            .find_map(|href| resolve_link(href, base_url));
        if let Some(next) = next {
            return Ok(Some(next.to_string()));
        }
    }
    Ok(None)
}

/// Extracts name and URL candidates from a detail page
pub fn parse_detail_page(html: &str, base_url: &Url) -> Result<DetailPage, ParseError> {
    let document = Html::parse_document(html);

    let meta = |property: &str| -> Result<Option<String>, ParseError> {
        let css = format!("meta[property='{}'][content]", property);
        Ok(document
            .select(&selector(&css)?)
            .filter_map(|e| e.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_string))
    };

    let og_title = meta("og:title")?;
    let og_url = meta("og:url")?.and_then(|href| resolve_link(&href, base_url));

    let title = document
        .select(&selector("title")?)
        .next()
        .and_then(element_text);

    let canonical = document
        .select(&selector("link[rel='canonical'][href]")?)
        .filter_map(|e| e.value().attr("href"))
        .find_map(|href| resolve_link(href, base_url));

    Ok(DetailPage {
        og_title,
        title,
        canonical: canonical.map(String::from),
        og_url: og_url.map(String::from),
    })
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "aapbdbdomjkkjkaonfhkkikfgjllcleb";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn base_url() -> Url {
        Url::parse("https://chromewebstore.google.com/sitemap").unwrap()
    }

    #[test]
    fn test_sitemap_index_children() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://chromewebstore.google.com/sitemap?shard=0&amp;hl=en</loc></sitemap>
  <sitemap>
    <loc> https://chromewebstore.google.com/sitemap?shard=1 </loc>
    <lastmod>2024-01-01</lastmod>
  </sitemap>
</sitemapindex>"#;
        let page = parse_listing(xml, &base_url()).unwrap();
        assert_eq!(
            page.children,
            vec![
                "https://chromewebstore.google.com/sitemap?shard=0&hl=en",
                "https://chromewebstore.google.com/sitemap?shard=1",
            ]
        );
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_url_set_items() {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9" xmlns:xhtml="http://www.w3.org/1999/xhtml">
  <url><loc>https://chromewebstore.google.com/detail/google-translate/{a}</loc>
    <xhtml:link rel="alternate" hreflang="de" href="https://chromewebstore.google.com/detail/google-translate/{a}?hl=de"/>
  </url>
  <url><loc>https://chromewebstore.google.com/detail/{b}</loc></url>
  <url><loc>https://chromewebstore.google.com/category/extensions</loc></url>
  <url><loc>https://chromewebstore.google.com/detail/again/{a}</loc></url>
</urlset>"#,
            a = A,
            b = B
        );
        let page = parse_listing(&xml, &base_url()).unwrap();
        let ids: Vec<&str> = page.items.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![A, B]);
        assert_eq!(
            page.items[0].page_hint.as_deref(),
            Some(format!("https://chromewebstore.google.com/detail/google-translate/{}", A).as_str())
        );
        assert!(page.children.is_empty());
    }

    #[test]
    fn test_empty_url_set() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"></urlset>"#;
        let page = parse_listing(xml, &base_url()).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_html_listing_with_next_page() {
        let html = format!(
            r#"<html><head><link rel="next" href="/category/extensions?page=2"></head><body>
  <a href="/detail/translate/{a}"><img src="x.png"></a>
  <a href="/detail/translate/{a}">Translate</a>
  <a href="./detail/other/{b}">Other</a>
  <a href="/category/themes">Themes</a>
  <a href="javascript:void(0)">Nothing</a>
</body></html>"#,
            a = A,
            b = B
        );
        let source = Url::parse("https://chromewebstore.google.com/category/extensions").unwrap();
        let page = parse_listing(&html, &source).unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].id.as_str(), B);
        assert_eq!(
            page.next_cursor.as_deref(),
            Some("https://chromewebstore.google.com/category/extensions?page=2")
        );
        assert_eq!(page.source_url, source.as_str());
    }

    #[test]
    fn test_html_listing_anchor_next() {
        let html = r#"<html><body><a rel="nofollow next" href="?page=3">More</a></body></html>"#;
        let source = Url::parse("https://example.com/list?page=2").unwrap();
        let page = parse_listing(html, &source).unwrap();
        assert_eq!(
            page.next_cursor.as_deref(),
            Some("https://example.com/list?page=3")
        );
    }

    #[test]
    fn test_last_html_page_has_no_cursor() {
        let html = r#"<html><body><p>No more results</p></body></html>"#;
        let page = parse_listing(html, &base_url()).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_sitemap_rejects_html_page() {
        let html = r#"<!doctype html><html><head><title>Before you continue to Google</title></head>
<body><form action="https://consent.google.com/save"><button>Accept all</button></form></body></html>"#;
        let source = Url::parse("https://chromewebstore.google.com/sitemap?shard=0").unwrap();
        assert_eq!(
            parse_sitemap(html, &source).unwrap_err(),
            ParseError::NotASitemap
        );
        // The same document is a valid, empty HTML listing
        assert!(parse_listing(html, &source).unwrap().items.is_empty());
    }

    #[test]
    fn test_sitemap_accepts_url_set() {
        let xml = format!(
            r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://chromewebstore.google.com/detail/{}</loc></url>
</urlset>"#,
            A
        );
        let page = parse_sitemap(&xml, &base_url()).unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn test_empty_body_is_an_error() {
        assert_eq!(
            parse_listing("  \n", &base_url()).unwrap_err(),
            ParseError::EmptyBody
        );
    }

    #[test]
    fn test_detail_page_fields() {
        let html = format!(
            r#"<html><head>
  <title>Google Translate - Chrome Web Store</title>
  <meta property="og:title" content="Google Translate">
  <meta property="og:url" content="https://chromewebstore.google.com/detail/google-translate/{a}">
  <link rel="canonical" href="/detail/google-translate/{a}">
</head><body></body></html>"#,
            a = A
        );
        let base = Url::parse(&format!("https://chromewebstore.google.com/detail/{}", A)).unwrap();
        let page = parse_detail_page(&html, &base).unwrap();

        assert_eq!(page.og_title.as_deref(), Some("Google Translate"));
        assert_eq!(page.title.as_deref(), Some("Google Translate - Chrome Web Store"));
        let expected = format!("https://chromewebstore.google.com/detail/google-translate/{}", A);
        assert_eq!(page.canonical.as_deref(), Some(expected.as_str()));
        assert_eq!(page.og_url.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn test_detail_page_missing_fields() {
        let html = r#"<html><head><meta property="og:title" content="  "></head><body>Hi</body></html>"#;
        let page = parse_detail_page(html, &base_url()).unwrap();
        assert_eq!(page, DetailPage::default());
    }

    #[test]
    fn test_resolve_link_filters() {
        let base = base_url();
        assert!(resolve_link("mailto:a@b.c", &base).is_none());
        assert!(resolve_link("tel:+1", &base).is_none());
        assert!(resolve_link("data:text/html,x", &base).is_none());
        assert!(resolve_link("#top", &base).is_none());
        assert!(resolve_link("ftp://example.com/x", &base).is_none());
        assert_eq!(
            resolve_link("/detail/x", &base).unwrap().as_str(),
            "https://chromewebstore.google.com/detail/x"
        );
    }
}
