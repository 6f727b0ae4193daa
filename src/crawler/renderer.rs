//! Page rendering
//!
//! The crawler never talks to the network directly for pages; it asks a
//! [`Renderer`] to load a URL and hand back the final HTML. [`HttpRenderer`] is a
//! plain HTTP fetch. [`StaticRenderer`] serves pages from memory and is what tests
//! and offline demos drive the crawler with.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tracing::debug;

use crate::crawler::error::CrawlError;

/// Redirect hops [`StaticRenderer`] follows before serving what it has
const MAX_REDIRECTS: usize = 10;

/// Result of loading one URL
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// HTTP status of the final response
    pub status: u16,

    /// Final document HTML
    pub html: String,

    /// URL after redirects
    pub final_url: String,
}

impl RenderedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Loads pages for the crawler
pub trait Renderer: Send + Sync {
    /// Load `url`, giving up after `timeout`
    fn load(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<RenderedPage, CrawlError>> + Send;
}

/// Renderer backed by a plain HTTP GET
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    /// Create a renderer that identifies itself with `user_agent`
    pub fn new(user_agent: &str) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Renderer for HttpRenderer {
    async fn load(&self, url: &str, timeout: Duration) -> Result<RenderedPage, CrawlError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| CrawlError::Navigation(format!("{}: {}", url, e)))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| CrawlError::Navigation(format!("{}: {}", url, e)))?;

        debug!("Loaded {} ({}, {} bytes)", final_url, status, html.len());

        Ok(RenderedPage {
            status,
            html,
            final_url,
        })
    }
}

/// In-memory renderer serving fixed pages.
///
/// Unknown URLs load as a 404. Redirects are followed the way a browser would,
/// and every load is recorded in order under the requested URL.
#[derive(Debug, Default)]
pub struct StaticRenderer {
    pages: HashMap<String, (u16, String)>,
    redirects: HashMap<String, String>,
    failures: Vec<String>,
    loads: Mutex<Vec<String>>,
}

impl StaticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` with status 200 at `url`
    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), (200, html.into()));
        self
    }

    /// Serve an empty body with `status` at `url`
    pub fn status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.pages.insert(url.into(), (status, String::new()));
        self
    }

    /// Redirect `from` to `to`
    pub fn redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.redirects.insert(from.into(), to.into());
        self
    }

    /// Make loading `url` fail as a navigation error
    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failures.push(url.into());
        self
    }

    /// URLs loaded so far, in order
    pub fn loads(&self) -> Vec<String> {
        match self.loads.lock() {
            Ok(loads) => loads.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Renderer for StaticRenderer {
    async fn load(&self, url: &str, _timeout: Duration) -> Result<RenderedPage, CrawlError> {
        match self.loads.lock() {
            Ok(mut loads) => loads.push(url.to_string()),
            Err(poisoned) => poisoned.into_inner().push(url.to_string()),
        }

        if self.failures.iter().any(|f| f == url) {
            return Err(CrawlError::Navigation(format!("{}: connection refused", url)));
        }

        let mut final_url = url;
        for _ in 0..MAX_REDIRECTS {
            match self.redirects.get(final_url) {
                Some(target) => final_url = target,
                None => break,
            }
        }

        let (status, html) = self
            .pages
            .get(final_url)
            .cloned()
            .unwrap_or((404, String::new()));

        Ok(RenderedPage {
            status,
            html,
            final_url: final_url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_renderer_reports_status() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><title>Home</title></html>")
            .create_async()
            .await;
        let _gone = server
            .mock("GET", "/gone")
            .with_status(410)
            .create_async()
            .await;

        let renderer = HttpRenderer::new("sitekb-test").unwrap();

        let home = renderer
            .load(&format!("{}/", server.url()), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(home.is_success());
        assert!(home.html.contains("Home"));

        let gone = renderer
            .load(&format!("{}/gone", server.url()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(gone.status, 410);
        assert!(!gone.is_success());
    }

    #[tokio::test]
    async fn test_static_renderer() {
        let renderer = StaticRenderer::new()
            .page("https://a.test/", "<p>hi</p>")
            .status("https://a.test/old", 301)
            .failing("https://a.test/down");

        assert!(renderer
            .load("https://a.test/", Duration::ZERO)
            .await
            .unwrap()
            .is_success());
        assert_eq!(
            renderer
                .load("https://a.test/missing", Duration::ZERO)
                .await
                .unwrap()
                .status,
            404
        );
        assert!(renderer
            .load("https://a.test/down", Duration::ZERO)
            .await
            .is_err());
        assert_eq!(renderer.loads().len(), 3);
    }

    #[tokio::test]
    async fn test_static_renderer_follows_redirects() {
        let renderer = StaticRenderer::new()
            .redirect("https://a.test/docs", "https://a.test/docs/")
            .page("https://a.test/docs/", "<p>docs</p>");

        let page = renderer
            .load("https://a.test/docs", Duration::ZERO)
            .await
            .unwrap();
        assert!(page.is_success());
        assert_eq!(page.final_url, "https://a.test/docs/");
        assert_eq!(renderer.loads(), vec!["https://a.test/docs"]);
    }
}
