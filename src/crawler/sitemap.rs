//! Sitemap resolution
//!
//! Expands `sitemap.xml` files into a flat list of page URLs. Sitemap indexes are
//! followed recursively up to a configured depth; cycles are cut by remembering
//! every sitemap already fetched. Failures never propagate: an unreachable or
//! unparseable sitemap contributes no URLs.

use std::collections::HashSet;
use std::sync::Mutex;

use futures::future::BoxFuture;
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::crawler::error::CrawlError;

/// One `<url>` or `<sitemap>` entry
#[derive(Debug, Deserialize)]
struct LocEntry {
    #[serde(default)]
    loc: Option<String>,
}

/// Either shape of sitemap document.
///
/// The root element name is not checked, so a `<urlset>` fills `urls` and a
/// `<sitemapindex>` fills `sitemaps`.
#[derive(Debug, Default, Deserialize)]
pub struct SitemapDocument {
    #[serde(rename = "url", default)]
    urls: Vec<LocEntry>,

    #[serde(rename = "sitemap", default)]
    sitemaps: Vec<LocEntry>,
}

impl SitemapDocument {
    /// Page URLs listed by a urlset
    pub fn page_urls(&self) -> Vec<String> {
        collect_locs(&self.urls)
    }

    /// Child sitemap URLs listed by a sitemap index
    pub fn child_sitemaps(&self) -> Vec<String> {
        collect_locs(&self.sitemaps)
    }
}

fn collect_locs(entries: &[LocEntry]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|e| e.loc.as_deref())
        .map(str::trim)
        .filter(|loc| !loc.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a sitemap or sitemap index body
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, CrawlError> {
    from_str(xml).map_err(|e| CrawlError::Sitemap(e.to_string()))
}

/// Fetches and recursively expands sitemaps
#[derive(Debug)]
pub struct SitemapResolver {
    client: reqwest::Client,
    max_depth: u32,
}

impl SitemapResolver {
    pub fn new(client: reqwest::Client, max_depth: u32) -> Self {
        Self { client, max_depth }
    }

    /// Resolve `sitemap_url` into page URLs, in document order
    #[instrument(skip(self))]
    pub async fn resolve(&self, sitemap_url: &str) -> Vec<String> {
        let fetched = Mutex::new(HashSet::new());
        let urls = self.resolve_at(sitemap_url.to_string(), 0, &fetched).await;
        info!("Sitemap {} resolved to {} URLs", sitemap_url, urls.len());
        urls
    }

    fn resolve_at<'a>(
        &'a self,
        sitemap_url: String,
        depth: u32,
        fetched: &'a Mutex<HashSet<String>>,
    ) -> BoxFuture<'a, Vec<String>> {
        Box::pin(async move {
            let first_visit = match fetched.lock() {
                Ok(mut seen) => seen.insert(sitemap_url.clone()),
                Err(poisoned) => poisoned.into_inner().insert(sitemap_url.clone()),
            };
            if !first_visit {
                debug!("Skipping already fetched sitemap {}", sitemap_url);
                return Vec::new();
            }

            let document = match self.fetch(&sitemap_url).await {
                Ok(document) => document,
                Err(e) => {
                    warn!("Ignoring sitemap {}: {}", sitemap_url, e);
                    return Vec::new();
                }
            };

            let mut urls = Vec::new();

            let children = document.child_sitemaps();
            if !children.is_empty() {
                if depth >= self.max_depth {
                    warn!(
                        "Sitemap index {} exceeds nesting limit {}, not following {} children",
                        sitemap_url,
                        self.max_depth,
                        children.len()
                    );
                } else {
                    for child in children {
                        urls.extend(self.resolve_at(child, depth + 1, fetched).await);
                    }
                }
            }

            urls.extend(document.page_urls());
            urls
        })
    }

    async fn fetch(&self, sitemap_url: &str) -> Result<SitemapDocument, CrawlError> {
        debug!("Fetching sitemap {}", sitemap_url);
        let response = self.client.get(sitemap_url).send().await?;
        if !response.status().is_success() {
            return Err(CrawlError::Sitemap(format!(
                "status {}",
                response.status().as_u16()
            )));
        }
        let body = response.text().await?;
        parse_sitemap(&body)
    }
}
