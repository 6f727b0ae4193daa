//! Breadth-first crawl orchestration
//!
//! A [`Crawler`] drives one sequential BFS over a site: it seeds the queue from the
//! site's sitemap when one yields usable URLs (otherwise from the root URL), filters
//! every candidate, fetches pages through its [`Renderer`] and follows links while
//! depth budget remains. The same machinery serves both discovery (title-only,
//! larger budget, faster pacing) and full-content crawls.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::config::{CrawlMode, CrawlerConfig};
use crate::crawler::error::CrawlError;
use crate::crawler::fetcher::{Fetched, PageFetcher};
use crate::crawler::renderer::Renderer;
use crate::crawler::robots::RobotsRules;
use crate::crawler::sitemap::SitemapResolver;
use crate::crawler::url_filter::{normalize_url, visit_key, UrlFilter};
use crate::crawler::{CrawledPage, DiscoveredPage};

/// Progress signal emitted after every recorded page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlProgress {
    pub done: usize,
    pub budget: usize,
    pub url: String,
}

/// How the sitemap URLs fared against the filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteringStats {
    /// Sitemap URLs considered (capped at the page budget)
    pub total_sitemap_urls: usize,
    pub accepted_sitemap_urls: usize,
    pub filtered_sitemap_urls: usize,
}

/// Statistics of one crawl run. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryStats {
    pub sitemap_found: bool,
    /// Number of URLs the sitemap listed
    pub sitemap_urls: usize,
    /// Filter-accepted links found on fetched pages
    pub links_discovered: usize,
    pub filtering_stats: FilteringStats,
}

/// Result of [`Crawler::discover`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    pub pages: Vec<DiscoveredPage>,
    #[serde(flatten)]
    pub stats: DiscoveryStats,
}

/// Result of [`Crawler::run`], shaped by the configured mode
#[derive(Debug, Clone)]
pub enum CrawlOutput {
    Discovered(DiscoveryResult),
    Crawled(Vec<CrawledPage>),
}

impl CrawlOutput {
    /// Number of pages recorded
    pub fn len(&self) -> usize {
        match self {
            CrawlOutput::Discovered(result) => result.pages.len(),
            CrawlOutput::Crawled(pages) => pages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Record type produced by one crawl mode
trait PageRecord: Sized + Send {
    const MODE: CrawlMode;

    fn fetch<'a, R: Renderer>(
        fetcher: &'a PageFetcher<'a, R>,
        url: &'a str,
    ) -> impl Future<Output = Option<Fetched<Self>>> + Send + 'a;
}

impl PageRecord for CrawledPage {
    const MODE: CrawlMode = CrawlMode::FullContent;

    fn fetch<'a, R: Renderer>(
        fetcher: &'a PageFetcher<'a, R>,
        url: &'a str,
    ) -> impl Future<Output = Option<Fetched<Self>>> + Send + 'a {
        fetcher.crawl(url)
    }
}

impl PageRecord for DiscoveredPage {
    const MODE: CrawlMode = CrawlMode::Discovery;

    fn fetch<'a, R: Renderer>(
        fetcher: &'a PageFetcher<'a, R>,
        url: &'a str,
    ) -> impl Future<Output = Option<Fetched<Self>>> + Send + 'a {
        fetcher.discover(url)
    }
}

/// Queue state of one BFS run
struct Frontier {
    queue: VecDeque<(Url, u32)>,
    visited: HashSet<String>,
}

/// Sequential website crawler
#[derive(Debug)]
pub struct Crawler<R> {
    renderer: R,
    config: CrawlerConfig,
    client: reqwest::Client,
    progress: Option<mpsc::Sender<CrawlProgress>>,
    last_stats: Mutex<DiscoveryStats>,
}

impl<R: Renderer> Crawler<R> {
    /// Create a crawler. Sitemaps and robots.txt are fetched with a client that
    /// carries the configured user agent.
    pub fn new(renderer: R, config: CrawlerConfig) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.navigation_timeout)
            .build()?;
        Ok(Self::with_client(renderer, config, client))
    }

    /// Create a crawler using an existing HTTP client for sitemaps and robots.txt
    pub fn with_client(renderer: R, config: CrawlerConfig, client: reqwest::Client) -> Self {
        Self {
            renderer,
            config,
            client,
            progress: None,
            last_stats: Mutex::new(DiscoveryStats::default()),
        }
    }

    /// Send a [`CrawlProgress`] for every recorded page
    pub fn with_progress(mut self, progress: mpsc::Sender<CrawlProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Statistics of the most recently completed run
    pub fn last_stats(&self) -> DiscoveryStats {
        match self.last_stats.lock() {
            Ok(stats) => *stats,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn store_stats(&self, stats: DiscoveryStats) {
        match self.last_stats.lock() {
            Ok(mut last) => *last = stats,
            Err(poisoned) => *poisoned.into_inner() = stats,
        }
    }

    /// Title-only crawl of the site rooted at `root_url`
    #[instrument(skip(self))]
    pub async fn discover(&self, root_url: &str) -> Result<DiscoveryResult, CrawlError> {
        self.discover_with_progress(root_url, self.progress.as_ref())
            .await
    }

    /// Full-content crawl of the site rooted at `root_url`
    #[instrument(skip(self))]
    pub async fn crawl(&self, root_url: &str) -> Result<Vec<CrawledPage>, CrawlError> {
        self.crawl_with_progress(root_url, self.progress.as_ref())
            .await
    }

    /// Discovery or full crawl depending on `discover_only`
    pub async fn run(&self, root_url: &str) -> Result<CrawlOutput, CrawlError> {
        let mode = if self.config.discover_only {
            CrawlMode::Discovery
        } else {
            CrawlMode::FullContent
        };
        self.run_mode(root_url, mode, self.progress.as_ref()).await
    }

    /// Run in `mode`, reporting progress to `progress` instead of the crawler's
    /// own channel
    pub async fn run_mode(
        &self,
        root_url: &str,
        mode: CrawlMode,
        progress: Option<&mpsc::Sender<CrawlProgress>>,
    ) -> Result<CrawlOutput, CrawlError> {
        match mode {
            CrawlMode::Discovery => Ok(CrawlOutput::Discovered(
                self.discover_with_progress(root_url, progress).await?,
            )),
            CrawlMode::FullContent => Ok(CrawlOutput::Crawled(
                self.crawl_with_progress(root_url, progress).await?,
            )),
        }
    }

    async fn discover_with_progress(
        &self,
        root_url: &str,
        progress: Option<&mpsc::Sender<CrawlProgress>>,
    ) -> Result<DiscoveryResult, CrawlError> {
        let (pages, stats) = self
            .breadth_first::<DiscoveredPage>(root_url, progress)
            .await?;

        Ok(DiscoveryResult { pages, stats })
    }

    async fn crawl_with_progress(
        &self,
        root_url: &str,
        progress: Option<&mpsc::Sender<CrawlProgress>>,
    ) -> Result<Vec<CrawledPage>, CrawlError> {
        let (pages, _) = self
            .breadth_first::<CrawledPage>(root_url, progress)
            .await?;

        Ok(pages)
    }

    /// Fetch exactly `urls` with full content, without following links
    #[instrument(skip(self, urls), fields(count = urls.len()))]
    pub async fn crawl_urls(&self, urls: &[String]) -> Vec<CrawledPage> {
        let fetcher = PageFetcher::new(&self.renderer, &self.config);
        let delay = self.config.delay_for(CrawlMode::FullContent);
        let budget = urls.len();
        let mut pages = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            if let Some(fetched) = fetcher.crawl(url).await {
                pages.push(fetched.page);
                self.report(self.progress.as_ref(), pages.len(), budget, url)
                    .await;
            }
            if i + 1 < urls.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        info!("Crawled {}/{} selected pages", pages.len(), budget);
        pages
    }

    async fn report(
        &self,
        progress: Option<&mpsc::Sender<CrawlProgress>>,
        done: usize,
        budget: usize,
        url: &str,
    ) {
        info!("Recorded {}/{}: {}", done, budget, url);
        if let Some(tx) = progress {
            let update = CrawlProgress {
                done,
                budget,
                url: url.to_string(),
            };
            if tx.send(update).await.is_err() {
                debug!("Progress receiver dropped");
            }
        }
    }

    /// Parse and validate the root URL
    fn parse_root(root_url: &str) -> Result<Url, CrawlError> {
        let parsed = Url::parse(root_url.trim())?;
        normalize_url(parsed.as_str(), &parsed)
            .ok_or_else(|| CrawlError::InvalidRoot(root_url.to_string()))
    }

    /// Seed the frontier from the sitemap, falling back to the root URL
    async fn seed(
        &self,
        root: &Url,
        filter: &UrlFilter,
        budget: usize,
        stats: &mut DiscoveryStats,
    ) -> Frontier {
        let origin = root.origin().ascii_serialization();
        let resolver = SitemapResolver::new(self.client.clone(), self.config.max_sitemap_depth);
        let sitemap_urls = resolver.resolve(&format!("{}/sitemap.xml", origin)).await;

        let mut queue = VecDeque::new();

        if !sitemap_urls.is_empty() {
            stats.sitemap_found = true;
            stats.sitemap_urls = sitemap_urls.len();

            let considered = &sitemap_urls[..sitemap_urls.len().min(budget)];
            stats.filtering_stats.total_sitemap_urls = considered.len();

            for raw in considered {
                match normalize_url(raw, root) {
                    Some(url) if filter.check_logged(&url, 0).is_accepted() => {
                        queue.push_back((url, 0));
                    }
                    _ => {}
                }
            }

            stats.filtering_stats.accepted_sitemap_urls = queue.len();
            stats.filtering_stats.filtered_sitemap_urls = considered.len() - queue.len();
            info!(
                "Sitemap listed {} URLs: {} accepted, {} filtered",
                sitemap_urls.len(),
                stats.filtering_stats.accepted_sitemap_urls,
                stats.filtering_stats.filtered_sitemap_urls
            );
        } else {
            info!("No sitemap found for {}", origin);
        }

        if queue.is_empty() {
            if filter.check_logged(root, 0).is_accepted() {
                queue.push_back((root.clone(), 0));
            } else {
                warn!("Root URL {} is rejected by the crawl filter", root);
            }
        }

        Frontier {
            queue,
            visited: HashSet::new(),
        }
    }

    async fn breadth_first<T: PageRecord>(
        &self,
        root_url: &str,
        progress: Option<&mpsc::Sender<CrawlProgress>>,
    ) -> Result<(Vec<T>, DiscoveryStats), CrawlError> {
        let mode = T::MODE;
        let fetcher = PageFetcher::new(&self.renderer, &self.config);
        let root = Self::parse_root(root_url)?;
        let domain = root
            .host_str()
            .ok_or_else(|| CrawlError::InvalidRoot(root_url.to_string()))?
            .to_string();

        let mut filter = UrlFilter::new(&self.config, mode, &domain);
        if self.config.respect_robots_txt {
            let origin = root.origin().ascii_serialization();
            let robots = RobotsRules::fetch(&self.client, &origin, &self.config.user_agent).await;
            filter = filter.with_robots(robots);
        }

        let budget = self.config.page_budget(mode);
        let delay = self.config.delay_for(mode);
        let mut stats = DiscoveryStats::default();
        let mut frontier = self.seed(&root, &filter, budget, &mut stats).await;
        let mut results = Vec::new();

        info!(
            "Starting {:?} crawl of {} (budget {}, max depth {})",
            mode, root, budget, self.config.max_depth
        );

        while results.len() < budget {
            let Some((url, depth)) = frontier.queue.pop_front() else {
                break;
            };
            if !frontier.visited.insert(visit_key(&url)) {
                continue;
            }

            let Some(fetched) = T::fetch(&fetcher, url.as_str()).await else {
                debug!("No page recorded for {}", url);
                self.pause(delay, &frontier, results.len(), budget).await;
                continue;
            };

            if let Some(landed) = normalize_url(fetched.final_url.as_str(), &fetched.final_url) {
                let landed_key = visit_key(&landed);
                if landed_key != visit_key(&url) && !frontier.visited.insert(landed_key) {
                    debug!("{} redirected to already visited {}", url, landed);
                    self.pause(delay, &frontier, results.len(), budget).await;
                    continue;
                }
            }

            results.push(fetched.page);
            self.report(progress, results.len(), budget, url.as_str())
                .await;

            if depth + 1 < self.config.max_depth {
                let mut seen_here = HashSet::new();
                for raw in &fetched.links {
                    let Some(link) = normalize_url(raw, &fetched.final_url) else {
                        continue;
                    };
                    let key = visit_key(&link);
                    if !filter.check(&link, 0).is_accepted() || !seen_here.insert(key.clone()) {
                        continue;
                    }
                    stats.links_discovered += 1;

                    if !frontier.visited.contains(&key)
                        && filter.check_logged(&link, depth + 1).is_accepted()
                    {
                        frontier.queue.push_back((link, depth + 1));
                    }
                }
            }

            self.pause(delay, &frontier, results.len(), budget).await;
        }

        info!(
            "Finished {:?} crawl of {}: {} pages, {} links discovered",
            mode,
            root,
            results.len(),
            stats.links_discovered
        );

        self.store_stats(stats);
        Ok((results, stats))
    }

    /// Politeness delay, skipped once the run is over
    async fn pause(
        &self,
        delay: std::time::Duration,
        frontier: &Frontier,
        done: usize,
        budget: usize,
    ) {
        if !delay.is_zero() && !frontier.queue.is_empty() && done < budget {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::renderer::StaticRenderer;

    fn page(title: &str, links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|l| format!("<a href=\"{}\">link</a>", l))
            .collect();
        format!(
            "<html><head><title>{}</title></head><body><main><p>{}</p>{}</main></body></html>",
            title,
            vec![title; 30].join(" "),
            anchors
        )
    }

    fn config() -> CrawlerConfig {
        CrawlerConfig::builder()
            .delay(std::time::Duration::ZERO)
            .respect_robots_txt(false)
            .build()
    }

    async fn no_sitemap(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/sitemap.xml")
            .with_status(404)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_bfs_follows_links_within_depth() {
        let mut server = mockito::Server::new_async().await;
        let _sitemap = no_sitemap(&mut server).await;
        let base = server.url();

        // root -> a -> b -> c, with max_depth 2 only root and a are reachable
        let renderer = StaticRenderer::new()
            .page(format!("{}/", base), page("root", &["/a", "https://elsewhere.test/x"]))
            .page(format!("{}/a", base), page("a", &["/b"]))
            .page(format!("{}/b", base), page("b", &["/c"]))
            .page(format!("{}/c", base), page("c", &[]));

        let config = CrawlerConfig::builder()
            .max_depth(2)
            .delay(std::time::Duration::ZERO)
            .respect_robots_txt(false)
            .build();
        let crawler = Crawler::new(renderer, config).unwrap();

        let pages = crawler.crawl(&format!("{}/", base)).await.unwrap();
        let urls: Vec<_> = pages.iter().map(|p| p.url.clone()).collect();

        assert_eq!(urls, vec![format!("{}/", base), format!("{}/a", base)]);
        assert_eq!(crawler.renderer().loads().len(), 2);
        assert_eq!(crawler.last_stats().links_discovered, 1);
    }

    #[tokio::test]
    async fn test_sitemap_seeds_and_respects_budget() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let urlset: String = (1..=5)
            .map(|i| format!("<url><loc>{}/p{}</loc></url>", base, i))
            .collect();
        let _sitemap = server
            .mock("GET", "/sitemap.xml")
            .with_status(200)
            .with_body(format!("<urlset>{}</urlset>", urlset))
            .create_async()
            .await;

        let mut renderer = StaticRenderer::new();
        for i in 1..=5 {
            let title = format!("p{}", i);
            renderer = renderer.page(format!("{}/{}", base, title), page(&title, &["/extra"]));
        }
        renderer = renderer.page(format!("{}/extra", base), page("extra", &[]));

        let config = CrawlerConfig::builder()
            .max_pages(3)
            .delay(std::time::Duration::ZERO)
            .respect_robots_txt(false)
            .build();
        let crawler = Crawler::new(renderer, config).unwrap();

        let pages = crawler.crawl(&format!("{}/", base)).await.unwrap();
        let urls: Vec<_> = pages.iter().map(|p| p.url.clone()).collect();

        assert_eq!(
            urls,
            vec![
                format!("{}/p1", base),
                format!("{}/p2", base),
                format!("{}/p3", base)
            ]
        );
        assert!(!crawler.renderer().loads().contains(&format!("{}/extra", base)));

        let stats = crawler.last_stats();
        assert!(stats.sitemap_found);
        assert_eq!(stats.sitemap_urls, 5);
        assert_eq!(stats.filtering_stats.total_sitemap_urls, 3);
        assert_eq!(stats.filtering_stats.accepted_sitemap_urls, 3);
    }

    #[tokio::test]
    async fn test_discovery_stats_count_filtered_sitemap_urls() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let _sitemap = server
            .mock("GET", "/sitemap.xml")
            .with_status(200)
            .with_body(format!(
                "<urlset><url><loc>{b}/</loc></url><url><loc>{b}/admin/users</loc></url>\
                 <url><loc>https://other.test/x</loc></url><url><loc>{b}/style.css</loc></url></urlset>",
                b = base
            ))
            .create_async()
            .await;

        let renderer = StaticRenderer::new().page(
            format!("{}/", base),
            "<html><head><title>Home</title></head><body><a href=\"/team\">t</a><a href=\"/team#x\">t</a></body></html>",
        )
        .page(format!("{}/team", base), "<html><head><title>Team</title></head></html>");

        let crawler = Crawler::new(renderer, config()).unwrap();
        let result = crawler.discover(&format!("{}/", base)).await.unwrap();

        assert_eq!(result.pages.len(), 2);
        assert_eq!(result.pages[0].title, "Home");
        assert_eq!(result.pages[1].title, "Team");
        assert!(result.stats.sitemap_found);
        assert_eq!(result.stats.sitemap_urls, 4);
        assert_eq!(result.stats.links_discovered, 1);
        assert_eq!(
            result.stats.filtering_stats,
            FilteringStats {
                total_sitemap_urls: 4,
                accepted_sitemap_urls: 1,
                filtered_sitemap_urls: 3,
            }
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["sitemapFound"], true);
        assert_eq!(json["filteringStats"]["filteredSitemapUrls"], 3);
    }

    #[tokio::test]
    async fn test_links_resolve_against_redirect_target() {
        let mut server = mockito::Server::new_async().await;
        let _sitemap = no_sitemap(&mut server).await;
        let base = server.url();

        let renderer = StaticRenderer::new()
            .page(format!("{}/", base), page("root", &["/docs"]))
            .redirect(format!("{}/docs", base), format!("{}/docs/", base))
            .page(format!("{}/docs/", base), page("docs", &["guide"]))
            .page(format!("{}/docs/guide", base), page("guide", &[]));

        let crawler = Crawler::new(renderer, config()).unwrap();
        let pages = crawler.crawl(&format!("{}/", base)).await.unwrap();
        let urls: Vec<_> = pages.iter().map(|p| p.url.clone()).collect();

        assert_eq!(
            urls,
            vec![
                format!("{}/", base),
                format!("{}/docs", base),
                format!("{}/docs/guide", base)
            ]
        );
    }

    #[tokio::test]
    async fn test_off_site_and_repeat_redirects_not_recorded() {
        let mut server = mockito::Server::new_async().await;
        let _sitemap = no_sitemap(&mut server).await;
        let base = server.url();

        let renderer = StaticRenderer::new()
            .page(format!("{}/", base), page("root", &["/moved", "/home", "/ok"]))
            .redirect(format!("{}/moved", base), "https://elsewhere.test/landing")
            .page("https://elsewhere.test/landing", page("elsewhere", &["/deep"]))
            .redirect(format!("{}/home", base), format!("{}/", base))
            .page(format!("{}/ok", base), page("ok", &[]));

        let crawler = Crawler::new(renderer, config()).unwrap();
        let pages = crawler.crawl(&format!("{}/", base)).await.unwrap();
        let titles: Vec<_> = pages.iter().map(|p| p.title.as_str()).collect();

        assert_eq!(titles, vec!["root", "ok"]);
        assert!(!crawler
            .renderer()
            .loads()
            .iter()
            .any(|l| l.starts_with("https://elsewhere.test")));
    }

    #[tokio::test]
    async fn test_www_and_bare_host_fetched_once() {
        let mut server = mockito::Server::new_async().await;
        let port = server
            .host_with_port()
            .rsplit(':')
            .next()
            .unwrap_or_default()
            .to_string();
        let bare = format!("http://localhost:{}", port);
        let www = format!("http://www.localhost:{}", port);
        let _sitemap = server
            .mock("GET", "/sitemap.xml")
            .with_status(200)
            .with_body(format!(
                "<urlset><url><loc>{}/</loc></url><url><loc>{}/menu</loc></url></urlset>",
                bare, www
            ))
            .create_async()
            .await;

        let renderer = StaticRenderer::new()
            .page(format!("{}/", bare), page("root", &["/menu"]))
            .page(format!("{}/menu", www), page("menu", &[]))
            .page(format!("{}/menu", bare), page("menu", &[]));

        let crawler = Crawler::new(renderer, config()).unwrap();
        let pages = crawler.crawl(&format!("{}/", bare)).await.unwrap();

        assert_eq!(pages.len(), 2);
        let menu_loads = crawler
            .renderer()
            .loads()
            .iter()
            .filter(|l| l.ends_with("/menu"))
            .count();
        assert_eq!(menu_loads, 1);
    }

    #[tokio::test]
    async fn test_failed_pages_do_not_stop_crawl() {
        let mut server = mockito::Server::new_async().await;
        let _sitemap = no_sitemap(&mut server).await;
        let base = server.url();

        let renderer = StaticRenderer::new()
            .page(format!("{}/", base), page("root", &["/down", "/missing", "/ok"]))
            .failing(format!("{}/down", base))
            .page(format!("{}/ok", base), page("ok", &[]));

        let crawler = Crawler::new(renderer, config()).unwrap();
        let pages = crawler.crawl(&format!("{}/", base)).await.unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].title, "ok");
    }

    #[tokio::test]
    async fn test_progress_reported() {
        let mut server = mockito::Server::new_async().await;
        let _sitemap = no_sitemap(&mut server).await;
        let base = server.url();

        let renderer = StaticRenderer::new()
            .page(format!("{}/", base), page("root", &["/a"]))
            .page(format!("{}/a", base), page("a", &[]));

        let (tx, mut rx) = mpsc::channel(16);
        let crawler = Crawler::new(renderer, config()).unwrap().with_progress(tx);
        crawler.crawl(&format!("{}/", base)).await.unwrap();
        drop(crawler);

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update.done);
        }
        assert_eq!(updates, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_invalid_root() {
        let crawler = Crawler::new(StaticRenderer::new(), config()).unwrap();

        assert!(crawler.crawl("not a url").await.is_err());
        assert!(matches!(
            crawler.discover("mailto:someone@example.com").await,
            Err(CrawlError::InvalidRoot(_))
        ));
    }

    #[tokio::test]
    async fn test_crawl_urls_fetches_only_given_pages() {
        let renderer = StaticRenderer::new()
            .page("https://a.test/one", page("one", &["/two"]))
            .page("https://a.test/two", page("two", &[]));

        let crawler = Crawler::new(renderer, config()).unwrap();
        let pages = crawler
            .crawl_urls(&["https://a.test/one".to_string()])
            .await;

        assert_eq!(pages.len(), 1);
        assert_eq!(crawler.renderer().loads(), vec!["https://a.test/one"]);
    }
}
