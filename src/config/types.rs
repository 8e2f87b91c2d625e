use serde::Deserialize;

/// Main configuration structure for sitescope
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
///
/// The two concurrency knobs are independent budgets: `site_concurrency`
/// bounds how many sites are crawled at once, `page_concurrency` bounds
/// in-flight fetches within one site.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of distinct pages fetched per site (seed included)
    #[serde(rename = "page-budget", default = "default_page_budget")]
    pub page_budget: usize,

    /// Maximum concurrent page fetches within a single site
    #[serde(rename = "page-concurrency", default = "default_page_concurrency")]
    pub page_concurrency: usize,

    /// Maximum sites crawled simultaneously
    #[serde(rename = "site-concurrency", default = "default_site_concurrency")]
    pub site_concurrency: usize,

    /// Hard timeout for a single page fetch, in seconds
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Retries for transient fetch failures (timeout, connection, HTTP 5xx).
    /// Zero means a failed fetch is recorded as-is.
    #[serde(rename = "fetch-retries", default)]
    pub fetch_retries: u32,

    /// Link discovery depth: 1 = seed page links only, 2 = also harvest
    /// links from fetched pages while the page budget is unfilled
    #[serde(rename = "discover-depth", default = "default_discover_depth")]
    pub discover_depth: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_budget: default_page_budget(),
            page_concurrency: default_page_concurrency(),
            site_concurrency: default_site_concurrency(),
            fetch_timeout_secs: default_fetch_timeout(),
            fetch_retries: 0,
            discover_depth: default_discover_depth(),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(rename = "chunk-overlap", default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Pages with less cleaned text than this yield zero chunks
    #[serde(rename = "min-text-len", default = "default_min_text_len")]
    pub min_text_len: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_text_len: default_min_text_len(),
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Deterministic local hashed n-gram vectors (no network)
    Hash,
    /// OpenAI-style HTTP embedding endpoint
    Http,
}

/// Embedding backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProviderKind,

    /// Endpoint URL, required for the `http` provider
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Model name sent to the HTTP provider
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimensionality
    #[serde(default = "default_embedding_dims")]
    pub dims: usize,

    /// Environment variable holding the API key for the HTTP provider
    #[serde(rename = "api-key-env", default)]
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            endpoint: None,
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            api_key_env: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the scraper
    #[serde(rename = "scraper-name", default = "default_scraper_name")]
    pub scraper_name: String,

    /// Version of the scraper
    #[serde(rename = "scraper-version", default = "default_scraper_version")]
    pub scraper_version: String,

    /// URL with information about the scraper
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            scraper_name: default_scraper_name(),
            scraper_version: default_scraper_version(),
            contact_url: None,
        }
    }
}

/// Input configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Path to the CSV file with `company_name,website_url` rows
    #[serde(rename = "targets-path")]
    pub targets_path: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite index database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_page_budget() -> usize {
    10
}

fn default_page_concurrency() -> usize {
    10
}

fn default_site_concurrency() -> usize {
    3
}

fn default_fetch_timeout() -> u64 {
    20
}

fn default_discover_depth() -> u32 {
    1
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_min_text_len() -> usize {
    80
}

fn default_embedding_provider() -> EmbeddingProviderKind {
    EmbeddingProviderKind::Hash
}

fn default_embedding_model() -> String {
    "hashed-ngram-v1".to_string()
}

fn default_embedding_dims() -> usize {
    384
}

fn default_scraper_name() -> String {
    "sitescope".to_string()
}

fn default_scraper_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
