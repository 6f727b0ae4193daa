//! Crawl archives
//!
//! A full-content crawl can be saved to a single XML file and ingested later
//! without touching the site again.

use std::io;
use std::path::Path;

use quick_xml::{de::from_str, se::to_string};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::CrawledPage;

/// XML representation of a crawl archive
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename = "pages")]
pub struct CrawlArchive {
    /// Root URL the crawl started from
    #[serde(rename = "@root")]
    pub root: String,

    #[serde(rename = "page", default)]
    pub pages: Vec<CrawledPage>,
}

/// Error type for archive operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("XML serialization error: {0}")]
    SerializeError(#[from] quick_xml::errors::serialize::SeError),

    #[error("XML deserialization error: {0}")]
    DeserializeError(#[from] quick_xml::errors::serialize::DeError),
}

impl From<StorageError> for crate::error::Error {
    fn from(err: StorageError) -> Self {
        crate::error::Error::Crawl(err.to_string())
    }
}

type Result<T> = std::result::Result<T, StorageError>;

impl CrawlArchive {
    pub fn new(root: impl Into<String>, pages: Vec<CrawledPage>) -> Self {
        Self {
            root: root.into(),
            pages,
        }
    }

    /// Write the archive to `path`, creating parent directories
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let xml = to_string(self)?;
        fs::write(
            path,
            format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml),
        )
        .await?;
        Ok(())
    }

    /// Read an archive written by [`save`](Self::save)
    pub async fn load(path: &Path) -> Result<Self> {
        let xml = fs::read_to_string(path).await?;
        Ok(from_str(&xml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/acme.xml");

        let archive = CrawlArchive::new(
            "https://acme.test/",
            vec![
                CrawledPage {
                    url: "https://acme.test/".to_string(),
                    title: "Acme & Sons".to_string(),
                    content: "We fix <pipes> fast".to_string(),
                },
                CrawledPage {
                    url: "https://acme.test/about".to_string(),
                    title: "About".to_string(),
                    content: "Family owned since 1950".to_string(),
                },
            ],
        );

        archive.save(&path).await.unwrap();
        let loaded = CrawlArchive::load(&path).await.unwrap();

        assert_eq!(loaded.root, "https://acme.test/");
        assert_eq!(loaded.pages.len(), 2);
        assert_eq!(loaded.pages[0].title, "Acme & Sons");
        assert_eq!(loaded.pages[0].content, "We fix <pipes> fast");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = CrawlArchive::load(&dir.path().join("missing.xml")).await;

        assert!(matches!(result, Err(StorageError::Io(_))));
    }
}
