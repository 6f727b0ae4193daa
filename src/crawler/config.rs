//! # Crawler Configuration Module
//!
//! This module provides configuration options for the website crawler, including
//! page and depth budgets, path filters, pacing and content extraction mode. It uses
//! a builder pattern for flexible configuration.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: The main configuration struct with crawler parameters
//! - `CrawlerConfigBuilder`: Builder pattern implementation for easier configuration
//! - `CrawlMode`: Discovery (title only) or full-content crawling
//!
//! Discovery runs use their own page budget, pacing and navigation timeout so the
//! same configuration can drive both entry points of the orchestrator.

use std::time::Duration;

/// Which kind of record a crawl produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Record only `{url, title}`, short-circuiting content extraction
    Discovery,
    /// Record `{url, title, content}`
    FullContent,
}

/// Path prefixes excluded in discovery mode when no explicit list is configured
pub const DISCOVERY_EXCLUDE_PATHS: &[&str] = &["/admin/", "/login/", "/logout/"];

/// Path prefixes excluded in full-content mode when no explicit list is configured
pub const CRAWL_EXCLUDE_PATHS: &[&str] = &["/admin", "/login", "/logout", "/search"];

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Maximum link depth; pages are accepted only while `depth < max_depth`
    pub max_depth: u32,

    /// Maximum number of pages to crawl in full-content mode
    pub max_pages: usize,

    /// Maximum number of pages to record in discovery mode
    pub discovery_max_pages: usize,

    /// Path prefixes that must not be crawled. `None` uses the mode default.
    pub exclude_paths: Option<Vec<String>>,

    /// If non-empty, only paths starting with one of these prefixes are crawled
    pub include_paths: Vec<String>,

    /// Extract only the main content container instead of the whole body
    pub only_main_content: bool,

    /// Run in discovery mode when driven through `Crawler::run`
    pub discover_only: bool,

    /// Whether to honor robots.txt disallow rules (best effort)
    pub respect_robots_txt: bool,

    /// User agent to use for requests
    pub user_agent: String,

    /// Delay between fetches in full-content mode
    pub delay: Duration,

    /// Delay between fetches in discovery mode
    pub discovery_delay: Duration,

    /// Navigation timeout in full-content mode
    pub navigation_timeout: Duration,

    /// Navigation timeout in discovery mode
    pub discovery_navigation_timeout: Duration,

    /// Pages whose extracted text is shorter than this are dropped
    pub min_content_length: usize,

    /// A main-content container must yield more text than this to be chosen
    pub main_content_min_length: usize,

    /// Maximum nesting of sitemap indexes that will be followed
    pub max_sitemap_depth: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            discovery_max_pages: 200,
            exclude_paths: None,
            include_paths: Vec::new(),
            only_main_content: true,
            discover_only: false,
            respect_robots_txt: true,
            user_agent: format!("sitekb-crawler/{}", env!("CARGO_PKG_VERSION")),
            delay: Duration::from_millis(500),
            discovery_delay: Duration::from_millis(200),
            navigation_timeout: Duration::from_secs(30),
            discovery_navigation_timeout: Duration::from_secs(15),
            min_content_length: 50,
            main_content_min_length: 100,
            max_sitemap_depth: 3,
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the maximum depth to crawl
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the maximum number of pages to crawl
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the maximum number of pages to discover
    pub fn discovery_max_pages(mut self, max_pages: usize) -> Self {
        self.config.discovery_max_pages = max_pages;
        self
    }

    /// Set the excluded path prefixes
    pub fn exclude_paths(mut self, exclude_paths: Vec<String>) -> Self {
        self.config.exclude_paths = Some(exclude_paths);
        self
    }

    /// Set the included path prefixes
    pub fn include_paths(mut self, include_paths: Vec<String>) -> Self {
        self.config.include_paths = include_paths;
        self
    }

    /// Set whether only the main content container is extracted
    pub fn only_main_content(mut self, only_main_content: bool) -> Self {
        self.config.only_main_content = only_main_content;
        self
    }

    /// Set whether `Crawler::run` performs discovery instead of a full crawl
    pub fn discover_only(mut self, discover_only: bool) -> Self {
        self.config.discover_only = discover_only;
        self
    }

    /// Set whether to respect robots.txt
    pub fn respect_robots_txt(mut self, respect_robots_txt: bool) -> Self {
        self.config.respect_robots_txt = respect_robots_txt;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the delay between fetches for both modes
    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self.config.discovery_delay = delay.min(self.config.discovery_delay);
        self
    }

    /// Set the delay between fetches in discovery mode
    pub fn discovery_delay(mut self, delay: Duration) -> Self {
        self.config.discovery_delay = delay;
        self
    }

    /// Set the navigation timeout in full-content mode
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.config.navigation_timeout = timeout;
        self
    }

    /// Set the minimum extracted content length
    pub fn min_content_length(mut self, min_content_length: usize) -> Self {
        self.config.min_content_length = min_content_length;
        self
    }

    /// Set the maximum sitemap index nesting
    pub fn max_sitemap_depth(mut self, max_sitemap_depth: u32) -> Self {
        self.config.max_sitemap_depth = max_sitemap_depth;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Page budget for the given mode
    pub fn page_budget(&self, mode: CrawlMode) -> usize {
        match mode {
            CrawlMode::Discovery => self.discovery_max_pages,
            CrawlMode::FullContent => self.max_pages,
        }
    }

    /// Politeness delay for the given mode
    pub fn delay_for(&self, mode: CrawlMode) -> Duration {
        match mode {
            CrawlMode::Discovery => self.discovery_delay,
            CrawlMode::FullContent => self.delay,
        }
    }

    /// Navigation timeout for the given mode
    pub fn timeout_for(&self, mode: CrawlMode) -> Duration {
        match mode {
            CrawlMode::Discovery => self.discovery_navigation_timeout,
            CrawlMode::FullContent => self.navigation_timeout,
        }
    }

    /// Excluded path prefixes for the given mode.
    ///
    /// Discovery always uses the narrower built-in set so that section roots such as
    /// `/admin` itself stay visible for page selection.
    pub fn exclude_paths_for(&self, mode: CrawlMode) -> Vec<String> {
        match (mode, &self.exclude_paths) {
            (CrawlMode::Discovery, _) => DISCOVERY_EXCLUDE_PATHS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            (CrawlMode::FullContent, Some(paths)) => paths.clone(),
            (CrawlMode::FullContent, None) => {
                CRAWL_EXCLUDE_PATHS.iter().map(|s| s.to_string()).collect()
            }
        }
    }
}
