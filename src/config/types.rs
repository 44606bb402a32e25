use serde::Deserialize;

/// Default entry point of the store's browse surface
pub const DEFAULT_SEED_URL: &str = "https://chromewebstore.google.com/sitemap";

/// Default store origin used for detail pages
pub const DEFAULT_STORE_BASE_URL: &str = "https://chromewebstore.google.com";

/// Default download URL template; `{id}` and `{prodversion}` are substituted
pub const DEFAULT_DOWNLOAD_URL_TEMPLATE: &str = "https://clients2.google.com/service/update2/crx?response=redirect&prodversion={prodversion}&acceptformat=crx2,crx3&x=id%3D{id}%26uc";

/// Main configuration structure for cws-lister
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// configuration that crawls the public store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub store: StoreConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
    #[serde(rename = "seed")]
    pub seeds: Vec<SeedEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetcher: FetcherConfig::default(),
            user_agent: UserAgentConfig::default(),
            store: StoreConfig::default(),
            run: RunConfig::default(),
            output: OutputConfig::default(),
            seeds: vec![SeedEntry {
                url: DEFAULT_SEED_URL.to_string(),
            }],
        }
    }
}

impl Config {
    /// Seed URLs in configuration order
    pub fn seed_urls(&self) -> Vec<String> {
        self.seeds.iter().map(|s| s.url.clone()).collect()
    }
}

/// Request pacing and retry behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Maximum number of requests in flight at once
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: u32,

    /// Minimum spacing between requests to the same host (milliseconds)
    #[serde(rename = "min-interval-ms")]
    pub min_interval_ms: u64,

    /// Per-attempt timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// First backoff delay (milliseconds); doubles on every retry
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    #[serde(rename = "backoff-max-ms")]
    pub backoff_max_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            min_interval_ms: 100,
            timeout_ms: 30_000,
            max_retries: 3,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "cws-lister".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the user agent header: `name/version (+contact)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Store endpoints and download URL construction
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Origin of the store; detail pages live at `{base-url}/detail/...`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Browser version advertised in download URLs
    pub prodversion: String,

    #[serde(rename = "download-url-template")]
    pub download_url_template: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STORE_BASE_URL.to_string(),
            prodversion: "138".to_string(),
            download_url_template: DEFAULT_DOWNLOAD_URL_TEMPLATE.to_string(),
        }
    }
}

/// Run-level limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Abort when failed items reach this fraction of attempted items
    #[serde(rename = "failure-threshold")]
    pub failure_threshold: f64,

    /// Global deadline in seconds; 0 disables it
    #[serde(rename = "deadline-secs")]
    pub deadline_secs: u64,

    /// Log a progress line every N completed tasks
    #[serde(rename = "progress-every")]
    pub progress_every: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 0.05,
            deadline_secs: 0,
            progress_every: 500,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the catalog artifact
    #[serde(rename = "data-path")]
    pub data_path: String,

    /// Previous snapshot used for diffing; defaults to `data-path`
    #[serde(rename = "previous-path")]
    pub previous_path: Option<String>,

    /// Where to write the JSON run report
    #[serde(rename = "report-path")]
    pub report_path: Option<String>,

    /// Where to write the markdown run summary
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_path: "data.json".to_string(),
            previous_path: None,
            report_path: None,
            summary_path: None,
        }
    }
}

impl OutputConfig {
    /// The snapshot to diff against: explicit `previous-path`, else the artifact itself
    pub fn previous(&self) -> &str {
        self.previous_path.as_deref().unwrap_or(&self.data_path)
    }
}

/// A top-level browse surface to start enumeration from
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    pub url: String,
}
