//! Background crawl jobs
//!
//! A [`CrawlJob`] runs one crawl on its own tokio task so callers can poll its
//! status, stop it, or wait for it with a ceiling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::crawler::config::CrawlMode;
use crate::crawler::error::CrawlError;
use crate::crawler::orchestrator::{CrawlOutput, CrawlProgress, Crawler};
use crate::crawler::renderer::Renderer;

/// Observable state of a crawl job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running { done: usize, budget: usize },
    /// Completed with this many pages
    Finished(usize),
    Failed(String),
    Stopped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running { .. })
    }
}

/// Handle to a crawl running on a background task
#[derive(Debug)]
pub struct CrawlJob {
    handle: JoinHandle<Result<CrawlOutput, CrawlError>>,
    status: Arc<watch::Sender<JobStatus>>,
}

/// Update the status unless the job was already stopped
fn publish(status: &watch::Sender<JobStatus>, next: JobStatus) {
    status.send_if_modified(|current| {
        if *current == JobStatus::Stopped {
            return false;
        }
        *current = next;
        true
    });
}

impl CrawlJob {
    /// Start crawling `root_url` in `mode` on a new task
    pub fn spawn<R>(crawler: Arc<Crawler<R>>, root_url: impl Into<String>, mode: CrawlMode) -> Self
    where
        R: Renderer + 'static,
    {
        let root_url = root_url.into();
        let budget = crawler.config().page_budget(mode);
        let (status_tx, _) = watch::channel(JobStatus::Running { done: 0, budget });
        let status = Arc::new(status_tx);
        let task_status = status.clone();

        let handle = tokio::spawn(async move {
            let (progress_tx, mut progress_rx) = mpsc::channel::<CrawlProgress>(32);

            let forward_status = task_status.clone();
            let forward = async move {
                while let Some(update) = progress_rx.recv().await {
                    publish(
                        &forward_status,
                        JobStatus::Running {
                            done: update.done,
                            budget: update.budget,
                        },
                    );
                }
            };

            let run = async move {
                let result = crawler.run_mode(&root_url, mode, Some(&progress_tx)).await;
                drop(progress_tx);
                result
            };

            let (result, ()) = tokio::join!(run, forward);

            match &result {
                Ok(output) => {
                    info!("Crawl job finished with {} pages", output.len());
                    publish(&task_status, JobStatus::Finished(output.len()));
                }
                Err(e) => {
                    warn!("Crawl job failed: {}", e);
                    publish(&task_status, JobStatus::Failed(e.to_string()));
                }
            }
            result
        });

        Self { handle, status }
    }

    /// Current status
    pub fn status(&self) -> JobStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change
    pub fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.status.subscribe()
    }

    /// Abort the crawl. Pages recorded so far are discarded.
    pub fn stop(&self) {
        self.handle.abort();
        self.status.send_replace(JobStatus::Stopped);
    }

    /// Wait for the crawl to finish, aborting it if `timeout` elapses first
    pub async fn wait(mut self, timeout: Duration) -> Result<CrawlOutput, CrawlError> {
        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) if e.is_cancelled() => Err(CrawlError::Stopped),
            Ok(Err(e)) => Err(CrawlError::Other(format!("Crawl task failed: {}", e))),
            Err(_) => {
                self.handle.abort();
                publish(
                    &self.status,
                    JobStatus::Failed(format!("timed out after {:?}", timeout)),
                );
                Err(CrawlError::Timeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::config::CrawlerConfig;
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

    async fn site() -> (mockito::ServerGuard, StaticRenderer) {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/sitemap.xml")
            .with_status(404)
            .create_async()
            .await;
        let base = server.url();
        let renderer = StaticRenderer::new()
            .page(format!("{}/", base), page("home", &["/a", "/b"]))
            .page(format!("{}/a", base), page("alpha", &[]))
            .page(format!("{}/b", base), page("beta", &[]));
        (server, renderer)
    }

    #[tokio::test]
    async fn test_job_finishes() {
        let (server, renderer) = site().await;
        let config = CrawlerConfig::builder()
            .delay(Duration::ZERO)
            .respect_robots_txt(false)
            .build();
        let crawler = Arc::new(Crawler::new(renderer, config).unwrap());

        let job = CrawlJob::spawn(crawler, format!("{}/", server.url()), CrawlMode::FullContent);
        let mut status = job.subscribe();

        let output = job.wait(Duration::from_secs(10)).await.unwrap();
        assert_eq!(output.len(), 3);

        status.wait_for(|s| s.is_terminal()).await.unwrap();
        assert_eq!(*status.borrow(), JobStatus::Finished(3));
    }

    #[tokio::test]
    async fn test_job_timeout() {
        let (server, renderer) = site().await;
        let config = CrawlerConfig::builder()
            .delay(Duration::from_secs(30))
            .respect_robots_txt(false)
            .build();
        let crawler = Arc::new(Crawler::new(renderer, config).unwrap());

        let job = CrawlJob::spawn(crawler, format!("{}/", server.url()), CrawlMode::FullContent);
        let status = job.subscribe();

        let result = job.wait(Duration::from_millis(500)).await;
        assert!(matches!(result, Err(CrawlError::Timeout(_))));
        assert!(matches!(*status.borrow(), JobStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_job_forwards_progress() {
        let (server, renderer) = site().await;
        let config = CrawlerConfig::builder()
            .delay(Duration::from_secs(30))
            .respect_robots_txt(false)
            .build();
        let crawler = Arc::new(Crawler::new(renderer, config).unwrap());

        let job = CrawlJob::spawn(crawler, format!("{}/", server.url()), CrawlMode::FullContent);
        let mut status = job.subscribe();

        let seen = tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|s| matches!(s, JobStatus::Running { done: 1, .. })),
        )
        .await
        .map(|reached| reached.is_ok());
        assert!(matches!(seen, Ok(true)));

        job.stop();
        assert_eq!(job.status(), JobStatus::Stopped);
    }

    #[tokio::test]
    async fn test_job_stop() {
        let (server, renderer) = site().await;
        let config = CrawlerConfig::builder()
            .delay(Duration::from_secs(30))
            .respect_robots_txt(false)
            .build();
        let crawler = Arc::new(Crawler::new(renderer, config).unwrap());

        let job = CrawlJob::spawn(crawler, format!("{}/", server.url()), CrawlMode::Discovery);
        job.stop();

        assert_eq!(job.status(), JobStatus::Stopped);
        assert!(matches!(
            job.wait(Duration::from_secs(5)).await,
            Err(CrawlError::Stopped)
        ));
    }
}
