//! Single-page fetching
//!
//! Loads one URL through a [`Renderer`] and turns the result into a page record
//! plus the raw links found on it. Every failure is soft: it is logged and the
//! page is reported as absent so the crawl can carry on.
//!
//! Pages are recorded under the URL they were served from after redirects. A
//! redirect that leaves the requested site drops the page.

use scraper::Html;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::crawler::config::{CrawlMode, CrawlerConfig};
use crate::crawler::content_extraction::{extract_links, extract_page, extract_title};
use crate::crawler::error::CrawlError;
use crate::crawler::renderer::{RenderedPage, Renderer};
use crate::crawler::url_filter::{normalize_url, same_site};
use crate::crawler::{CrawledPage, DiscoveredPage};

/// A fetched page record together with its outgoing links
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub page: T,
    pub links: Vec<String>,

    /// URL the page was served from after redirects; links resolve against it
    pub final_url: Url,
}

/// Fetches pages for one crawl
#[derive(Debug)]
pub struct PageFetcher<'a, R> {
    renderer: &'a R,
    config: &'a CrawlerConfig,
}

impl<'a, R: Renderer> PageFetcher<'a, R> {
    pub fn new(renderer: &'a R, config: &'a CrawlerConfig) -> Self {
        Self { renderer, config }
    }

    async fn load(&self, url: &str, mode: CrawlMode) -> Option<(RenderedPage, Url)> {
        let requested = match Url::parse(url) {
            Ok(requested) => requested,
            Err(e) => {
                warn!("Failed to load {}: {}", url, e);
                return None;
            }
        };

        let rendered = match self.renderer.load(url, self.config.timeout_for(mode)).await {
            Ok(rendered) if rendered.is_success() => rendered,
            Ok(rendered) => {
                warn!("Failed to load {}: status {}", url, rendered.status);
                return None;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", url, e);
                return None;
            }
        };

        let final_url = requested
            .join(&rendered.final_url)
            .unwrap_or_else(|_| requested.clone());
        if !same_site(&requested, &final_url) {
            warn!("Skipping {}: redirected off-site to {}", url, final_url);
            return None;
        }
        if final_url != requested {
            debug!("{} redirected to {}", url, final_url);
        }

        Some((rendered, final_url))
    }

    /// Normalized form of a final URL, used as the recorded page URL
    fn record_url(final_url: &Url) -> String {
        normalize_url(final_url.as_str(), final_url)
            .unwrap_or_else(|| final_url.clone())
            .to_string()
    }

    /// Fetch `url` with full content extraction
    #[instrument(skip(self))]
    pub async fn crawl(&self, url: &str) -> Option<Fetched<CrawledPage>> {
        let (rendered, final_url) = self.load(url, CrawlMode::FullContent).await?;

        let extracted = match extract_page(
            &rendered.html,
            self.config.only_main_content,
            self.config.main_content_min_length,
        ) {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Failed to extract {}: {}", url, e);
                return None;
            }
        };

        if extracted.text.chars().count() < self.config.min_content_length {
            debug!(
                "Skipping {}: only {} characters of content",
                url,
                extracted.text.chars().count()
            );
            return None;
        }

        let page_url = Self::record_url(&final_url);
        Some(Fetched {
            page: CrawledPage {
                title: extracted.title.unwrap_or_else(|| page_url.clone()),
                url: page_url,
                content: extracted.text,
            },
            links: extracted.links,
            final_url,
        })
    }

    /// Fetch `url` recording only its title
    #[instrument(skip(self))]
    pub async fn discover(&self, url: &str) -> Option<Fetched<DiscoveredPage>> {
        let (rendered, final_url) = self.load(url, CrawlMode::Discovery).await?;

        let page_url = Self::record_url(&final_url);
        match title_and_links(&rendered.html) {
            Ok((title, links)) => Some(Fetched {
                page: DiscoveredPage {
                    title: title.unwrap_or_else(|| page_url.clone()),
                    url: page_url,
                },
                links,
                final_url,
            }),
            Err(e) => {
                warn!("Failed to extract {}: {}", url, e);
                None
            }
        }
    }
}

fn title_and_links(html: &str) -> Result<(Option<String>, Vec<String>), CrawlError> {
    let document = Html::parse_document(html);
    Ok((extract_title(&document)?, extract_links(&document)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::renderer::StaticRenderer;

    fn article(title: &str, words: usize) -> String {
        format!(
            "<html><head><title>{}</title></head><body><main><p>{}</p><a href=\"/next\">n</a></main></body></html>",
            title,
            vec!["word"; words].join(" ")
        )
    }

    #[tokio::test]
    async fn test_crawl_records_content() {
        let renderer = StaticRenderer::new().page("https://a.test/", article("Home", 50));
        let config = CrawlerConfig::default();
        let fetcher = PageFetcher::new(&renderer, &config);

        let fetched = fetcher.crawl("https://a.test/").await.unwrap();
        assert_eq!(fetched.page.title, "Home");
        assert!(fetched.page.content.starts_with("word word"));
        assert_eq!(fetched.links, vec!["/next"]);
    }

    #[tokio::test]
    async fn test_crawl_drops_short_and_failed_pages() {
        let renderer = StaticRenderer::new()
            .page("https://a.test/short", article("Short", 3))
            .status("https://a.test/error", 500)
            .failing("https://a.test/down");
        let config = CrawlerConfig::default();
        let fetcher = PageFetcher::new(&renderer, &config);

        assert!(fetcher.crawl("https://a.test/short").await.is_none());
        assert!(fetcher.crawl("https://a.test/error").await.is_none());
        assert!(fetcher.crawl("https://a.test/down").await.is_none());
    }

    #[tokio::test]
    async fn test_crawl_follows_redirects_within_site() {
        let renderer = StaticRenderer::new()
            .redirect("https://a.test/docs", "https://www.a.test/docs/")
            .page("https://www.a.test/docs/", article("Docs", 50))
            .redirect("https://a.test/out", "https://b.test/")
            .page("https://b.test/", article("Elsewhere", 50));
        let config = CrawlerConfig::default();
        let fetcher = PageFetcher::new(&renderer, &config);

        let fetched = fetcher.crawl("https://a.test/docs").await.unwrap();
        assert_eq!(fetched.page.url, "https://www.a.test/docs");
        assert_eq!(fetched.final_url.as_str(), "https://www.a.test/docs/");

        assert!(fetcher.crawl("https://a.test/out").await.is_none());
        assert!(fetcher.discover("https://a.test/out").await.is_none());
    }

    #[tokio::test]
    async fn test_discover_title_falls_back_to_url() {
        let renderer = StaticRenderer::new()
            .page("https://a.test/tiny", "<html><body><a href=\"/x\">x</a></body></html>");
        let config = CrawlerConfig::default();
        let fetcher = PageFetcher::new(&renderer, &config);

        let fetched = fetcher.discover("https://a.test/tiny").await.unwrap();
        assert_eq!(fetched.page.title, "https://a.test/tiny");
        assert_eq!(fetched.links, vec!["/x"]);
    }
}
