use cws_lister::config::{
    Config, FetcherConfig, OutputConfig, RunConfig, SeedEntry, StoreConfig, UserAgentConfig,
};
use cws_lister::ItemId;

/// A configuration pointed at a mock store, with fast pacing and backoff
pub fn test_config(base_url: &str, seeds: &[&str]) -> Config {
    Config {
        fetcher: fast_fetcher(),
        user_agent: UserAgentConfig {
            crawler_name: "TestLister".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: None,
        },
        store: StoreConfig {
            base_url: base_url.to_string(),
            prodversion: "138".to_string(),
            download_url_template: format!("{}/crx?x=id%3D{{id}}", base_url),
        },
        run: RunConfig {
            failure_threshold: 0.05,
            deadline_secs: 0,
            progress_every: 10,
        },
        output: OutputConfig::default(),
        seeds: seeds
            .iter()
            .map(|path| SeedEntry {
                url: format!("{}{}", base_url, path),
            })
            .collect(),
    }
}

pub fn fast_fetcher() -> FetcherConfig {
    FetcherConfig {
        max_concurrency: 4,
        min_interval_ms: 0,
        timeout_ms: 2_000,
        max_retries: 2,
        backoff_base_ms: 10,
        backoff_max_ms: 20,
    }
}

/// A valid identifier built from one letter
pub fn item_id(c: char) -> ItemId {
    ItemId::parse(&c.to_string().repeat(32)).unwrap()
}

pub fn detail_path(slug: &str, id: &ItemId) -> String {
    format!("/detail/{}/{}", slug, id)
}

pub fn sitemap_index(base_url: &str, paths: &[&str]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for path in paths {
        xml.push_str(&format!(
            "  <sitemap><loc>{}{}</loc></sitemap>\n",
            base_url, path
        ));
    }
    xml.push_str("</sitemapindex>\n");
    xml
}

pub fn url_set(base_url: &str, paths: &[String]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for path in paths {
        xml.push_str(&format!("  <url><loc>{}{}</loc></url>\n", base_url, path));
    }
    xml.push_str("</urlset>\n");
    xml
}

/// A detail page carrying og:title, title and a canonical link
pub fn detail_html(name: &str, canonical: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>{name} - Chrome Web Store</title>
  <meta property="og:title" content="{name}">
  <link rel="canonical" href="{canonical}">
</head>
<body><h1>{name}</h1></body>
</html>"#
    )
}
