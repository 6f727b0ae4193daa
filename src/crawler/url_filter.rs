//! URL normalization and crawl filtering
//!
//! Every candidate URL (seed, sitemap entry or harvested link) passes through
//! [`normalize_url`] and then [`UrlFilter::check`] before it may be queued.

use std::fmt;

use tracing::debug;
use url::Url;

use crate::crawler::config::{CrawlMode, CrawlerConfig};
use crate::crawler::robots::RobotsRules;

/// Extensions skipped in discovery mode: only non-content assets
const DISCOVERY_SKIP_EXTENSIONS: &[&str] =
    &[".css", ".js", ".woff", ".woff2", ".ttf", ".eot", ".ico"];

/// Extensions skipped in full-content mode: assets plus images and PDFs
const CRAWL_SKIP_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".ico", ".css", ".js", ".woff", ".woff2",
    ".ttf", ".eot",
];

/// Resolve `raw` against `base`, drop the fragment and any trailing slash
/// (except on the root path).
///
/// Returns `None` for anything that cannot be crawled: unparseable input or a
/// non-HTTP scheme such as `mailto:` or `javascript:`.
pub fn normalize_url(raw: &str, base: &Url) -> Option<Url> {
    let mut resolved = base.join(raw.trim()).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") || resolved.host_str().is_none() {
        return None;
    }

    resolved.set_fragment(None);

    let path = resolved.path().to_string();
    if path != "/" && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        resolved.set_path(if trimmed.is_empty() { "/" } else { trimmed });
    }

    Some(resolved)
}

/// Strip an optional leading `www.` from a hostname
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Whether two URLs belong to the same site, ignoring scheme and `www.`
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => strip_www(a).eq_ignore_ascii_case(strip_www(b)),
        _ => false,
    }
}

/// Key a normalized URL is deduplicated on during a crawl
///
/// `www.example.com/a` and `example.com/a` share a key.
pub fn visit_key(url: &Url) -> String {
    let Some(host) = url.host_str() else {
        return url.to_string();
    };
    let bare = strip_www(host);
    if bare.len() == host.len() {
        return url.to_string();
    }

    let mut keyed = url.clone();
    match keyed.set_host(Some(bare)) {
        Ok(()) => keyed.to_string(),
        Err(_) => url.to_string(),
    }
}

/// Why a candidate URL was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Hostname is not the tenant domain
    DomainMismatch(String),
    /// Depth budget is exhausted
    DepthExceeded(u32),
    /// Path starts with an excluded prefix
    ExcludedPath(String),
    /// Include list is configured and the path matches none of it
    NotIncluded,
    /// Path ends with a skipped file extension
    SkippedExtension,
    /// Disallowed by robots.txt
    Robots,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::DomainMismatch(host) => write!(f, "domain mismatch ({})", host),
            RejectReason::DepthExceeded(depth) => write!(f, "depth limit ({})", depth),
            RejectReason::ExcludedPath(prefix) => write!(f, "excluded path ({})", prefix),
            RejectReason::NotIncluded => write!(f, "not in include paths"),
            RejectReason::SkippedExtension => write!(f, "skipped file extension"),
            RejectReason::Robots => write!(f, "disallowed by robots.txt"),
        }
    }
}

/// Outcome of filtering one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Reject(RejectReason),
}

impl FilterDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterDecision::Accept)
    }
}

/// Accept/reject rules for one crawl of one tenant domain
#[derive(Debug, Clone)]
pub struct UrlFilter {
    domain: String,
    max_depth: u32,
    exclude_paths: Vec<String>,
    include_paths: Vec<String>,
    skip_extensions: &'static [&'static str],
    robots: Option<RobotsRules>,
}

impl UrlFilter {
    /// Build the filter for `domain` from the crawler configuration and mode
    pub fn new(config: &CrawlerConfig, mode: CrawlMode, domain: &str) -> Self {
        Self {
            domain: strip_www(&domain.to_ascii_lowercase()).to_string(),
            max_depth: config.max_depth,
            exclude_paths: config.exclude_paths_for(mode),
            include_paths: config.include_paths.clone(),
            skip_extensions: match mode {
                CrawlMode::Discovery => DISCOVERY_SKIP_EXTENSIONS,
                CrawlMode::FullContent => CRAWL_SKIP_EXTENSIONS,
            },
            robots: None,
        }
    }

    /// Also reject paths disallowed by robots.txt
    pub fn with_robots(mut self, robots: RobotsRules) -> Self {
        self.robots = Some(robots);
        self
    }

    /// Tenant domain without a leading `www.`
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Decide whether `url`, reached at `depth`, may be crawled
    pub fn check(&self, url: &Url, depth: u32) -> FilterDecision {
        let host = url.host_str().unwrap_or_default();
        if strip_www(host) != self.domain {
            return FilterDecision::Reject(RejectReason::DomainMismatch(host.to_string()));
        }

        if depth >= self.max_depth {
            return FilterDecision::Reject(RejectReason::DepthExceeded(depth));
        }

        let path = url.path();
        if let Some(prefix) = self.exclude_paths.iter().find(|p| path.starts_with(p.as_str())) {
            return FilterDecision::Reject(RejectReason::ExcludedPath(prefix.clone()));
        }

        if !self.include_paths.is_empty()
            && !self.include_paths.iter().any(|p| path.starts_with(p.as_str()))
        {
            return FilterDecision::Reject(RejectReason::NotIncluded);
        }

        let lower = path.to_ascii_lowercase();
        if self.skip_extensions.iter().any(|ext| lower.ends_with(ext)) {
            return FilterDecision::Reject(RejectReason::SkippedExtension);
        }

        if let Some(robots) = &self.robots {
            if !robots.allows(&url[url::Position::BeforePath..]) {
                return FilterDecision::Reject(RejectReason::Robots);
            }
        }

        FilterDecision::Accept
    }

    /// Same as [`check`](Self::check) but logs the decision
    pub fn check_logged(&self, url: &Url, depth: u32) -> FilterDecision {
        let decision = self.check(url, depth);
        match &decision {
            FilterDecision::Accept => debug!(%url, depth, "accepted"),
            FilterDecision::Reject(reason) => debug!(%url, depth, %reason, "filtered"),
        }
        decision
    }
}
