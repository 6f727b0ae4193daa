//! # sitekb CLI Application
//!
//! This module implements the command-line interface for sitekb, providing access
//! to the knowledge-base pipeline through a set of subcommands.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands for each stage of the pipeline:
//!   - `discover`: Record a site's pages and titles for selection
//!   - `select`: Choose which discovered pages the next ingestion crawls
//!   - `pages`: Show the stored pages of a site
//!   - `crawl`: Full-content crawl with progress, optionally saved to an archive
//!   - `ingest`: Crawl (or load an archive), chunk and embed a site
//!   - `upload`: Add a document to a site's knowledge base
//!   - `query`: Retrieve relevant chunks, optionally generating an answer
//!   - `list` / `delete`: Tenant management
//!
//! Logs go to stderr; results go to stdout as text or JSON.

mod telemetry;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sitekb::crawler::storage::CrawlArchive;
use sitekb::crawler::{
    CrawlJob, CrawlMode, CrawlOutput, Crawler, CrawlerConfig, HttpRenderer, JobStatus,
};
use sitekb::index::Database;
use sitekb::ingest::KnowledgeBase;
use sitekb::model::ConfiguredEmbedder;
use sitekb::processor::ProcessorConfig;
use sitekb::search::RetrievalConfig;
use tracing::instrument;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Turn business websites into searchable knowledge bases",
    long_about = None
)]
struct Cli {
    /// Database path
    #[arg(long, global = true, default_value = "sitekb.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover a site's pages without extracting content
    Discover(DiscoverArgs),

    /// Mark discovered pages for the next ingestion
    Select(SelectArgs),

    /// List the stored pages of a site
    Pages(SiteArgs),

    /// Crawl a site's content
    Crawl(CrawlArgs),

    /// Crawl, chunk and embed a site
    Ingest(IngestArgs),

    /// Upload a document into a site's knowledge base
    Upload(UploadArgs),

    /// Search a site's knowledge base
    Query(QueryArgs),

    /// List onboarded sites
    List(ListArgs),

    /// Delete a site and everything stored for it
    Delete(SiteArgs),
}

#[derive(Args, Debug, Clone)]
struct CrawlOptions {
    /// Maximum link depth
    #[arg(short = 'd', long, default_value = "3")]
    max_depth: u32,

    /// Maximum number of pages to crawl
    #[arg(short = 'p', long, default_value = "100")]
    max_pages: usize,

    /// Maximum number of pages to discover
    #[arg(long, default_value = "200")]
    discovery_max_pages: usize,

    /// Only crawl paths with these prefixes (comma-separated)
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,

    /// Never crawl paths with these prefixes (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Extract the whole body instead of the main content container
    #[arg(long)]
    full_body: bool,

    /// Delay between page loads in milliseconds
    #[arg(long, default_value = "500")]
    delay_ms: u64,

    /// Ignore robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// User agent sent with every request
    #[arg(long)]
    user_agent: Option<String>,
}

impl CrawlOptions {
    fn config(&self) -> CrawlerConfig {
        let mut builder = CrawlerConfig::builder()
            .max_depth(self.max_depth)
            .max_pages(self.max_pages)
            .discovery_max_pages(self.discovery_max_pages)
            .include_paths(self.include.clone())
            .only_main_content(!self.full_body)
            .respect_robots_txt(!self.ignore_robots)
            .delay(Duration::from_millis(self.delay_ms));
        if let Some(exclude) = &self.exclude {
            builder = builder.exclude_paths(exclude.clone());
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        builder.build()
    }
}

#[derive(Args, Debug, Clone)]
struct PipelineOptions {
    /// Embedding provider (gemini|openai|mock)
    #[arg(long, default_value = "gemini", value_parser = ["gemini", "openai", "mock"])]
    provider: String,

    /// Chunk size in words
    #[arg(long, default_value = "1000")]
    chunk_size: usize,

    /// Words shared by consecutive chunks
    #[arg(long, default_value = "200")]
    overlap: usize,

    /// Texts per embedding request
    #[arg(long, default_value = "10")]
    batch_size: usize,

    /// Attempts per embedding batch before giving up
    #[arg(long, default_value = "4")]
    max_attempts: u32,

    /// Minimum similarity for a result
    #[arg(long, default_value = "0.1")]
    threshold: f32,

    /// Threshold used when nothing passes the primary one
    #[arg(long, default_value = "0.0")]
    fallback_threshold: f32,

    #[command(flatten)]
    crawl: CrawlOptions,
}

#[derive(Args, Debug)]
struct SiteArgs {
    /// Site root URL
    #[arg(required = true)]
    url: String,
}

#[derive(Args, Debug)]
struct DiscoverArgs {
    /// Site root URL
    #[arg(required = true)]
    url: String,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(flatten)]
    pipeline: PipelineOptions,
}

#[derive(Args, Debug)]
struct SelectArgs {
    /// Site root URL
    #[arg(required = true)]
    url: String,

    /// Page URLs to select
    #[arg(required = true)]
    pages: Vec<String>,

    /// Clear the selection instead of setting it
    #[arg(long)]
    deselect: bool,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Site root URL
    #[arg(required = true)]
    url: String,

    /// Save crawled pages to an XML archive
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Abort the crawl after this many seconds
    #[arg(long, default_value = "600")]
    timeout: u64,

    #[command(flatten)]
    crawl: CrawlOptions,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Site root URL, or omit when ingesting an archive
    url: Option<String>,

    /// Ingest pages from an archive written by `crawl --output`
    #[arg(short, long)]
    archive: Option<PathBuf>,

    #[command(flatten)]
    pipeline: PipelineOptions,
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// Site root URL
    #[arg(required = true)]
    url: String,

    /// File to upload
    #[arg(required = true)]
    file: PathBuf,

    /// Content type, guessed from the extension when omitted
    #[arg(long)]
    content_type: Option<String>,

    #[command(flatten)]
    pipeline: PipelineOptions,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Site root URL
    #[arg(required = true)]
    url: String,

    /// Question to search for
    #[arg(required = true)]
    question: String,

    /// Maximum number of results
    #[arg(short = 'k', long, default_value = "8")]
    top_k: usize,

    /// Generate an answer from the results
    #[arg(short, long)]
    answer: bool,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(flatten)]
    pipeline: PipelineOptions,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Show page and chunk counts
    #[arg(short, long)]
    details: bool,
}

type CliKnowledgeBase = KnowledgeBase<HttpRenderer, ConfiguredEmbedder>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _otel = telemetry::init_tracing_subscriber();

    let database = cli.database;
    match cli.command {
        Some(Commands::Discover(args)) => discover_command(&database, args).await?,
        Some(Commands::Select(args)) => select_command(&database, args).await?,
        Some(Commands::Pages(args)) => pages_command(&database, args).await?,
        Some(Commands::Crawl(args)) => crawl_command(args).await?,
        Some(Commands::Ingest(args)) => ingest_command(&database, args).await?,
        Some(Commands::Upload(args)) => upload_command(&database, args).await?,
        Some(Commands::Query(args)) => query_command(&database, args).await?,
        Some(Commands::List(args)) => list_command(&database, args).await?,
        Some(Commands::Delete(args)) => delete_command(&database, args).await?,
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["sitekb", "--help"]);
        }
    }

    Ok(())
}

async fn open_database(path: &Path) -> anyhow::Result<Database> {
    Database::open(&path.to_string_lossy())
        .await
        .with_context(|| format!("Failed to open database {}", path.display()))
}

async fn knowledge_base(
    path: &Path,
    options: &PipelineOptions,
) -> anyhow::Result<CliKnowledgeBase> {
    let db = open_database(path).await?;
    let crawl_config = options.crawl.config();
    let renderer = HttpRenderer::new(&crawl_config.user_agent)?;
    let crawler = Crawler::new(renderer, crawl_config)?;
    let provider = ConfiguredEmbedder::from_name(&options.provider)?;

    let processor = ProcessorConfig::builder()
        .chunk_size(options.chunk_size)
        .overlap(options.overlap)
        .batch_size(options.batch_size)
        .max_attempts(options.max_attempts)
        .build();
    let retrieval = RetrievalConfig::builder()
        .thresholds(options.threshold, options.fallback_threshold)
        .build();

    Ok(KnowledgeBase::new(db, crawler, processor, provider, retrieval).await)
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => "text/html",
        "md" | "markdown" => "text/markdown",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[instrument(skip(database))]
async fn discover_command(database: &Path, args: DiscoverArgs) -> anyhow::Result<()> {
    let kb = knowledge_base(database, &args.pipeline).await?;
    let tenant = kb.tenant(&args.url).await?;
    let report = kb.discover(&tenant).await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => {
            for page in &report.discovery.pages {
                println!("{} - {}", page.url, page.title);
            }
            println!();
            println!(
                "Discovered {} pages (sitemap: {}, links: {})",
                report.discovery.pages.len(),
                if report.discovery.stats.sitemap_found {
                    "yes"
                } else {
                    "no"
                },
                report.discovery.stats.links_discovered
            );
            println!(
                "{} new, {} refreshed, {} removed",
                report.sync.added, report.sync.refreshed, report.sync.removed
            );
        }
    }
    Ok(())
}

#[instrument(skip(database))]
async fn select_command(database: &Path, args: SelectArgs) -> anyhow::Result<()> {
    let db = open_database(database).await?;
    let tenant = db
        .find_tenant(&args.url)
        .await?
        .ok_or_else(|| anyhow!("No site onboarded for {}", args.url))?;

    let changed = db
        .set_page_selection(tenant.id, &args.pages, !args.deselect)
        .await?;
    println!(
        "{} {} pages",
        if args.deselect { "Deselected" } else { "Selected" },
        changed
    );
    Ok(())
}

#[instrument(skip(database))]
async fn pages_command(database: &Path, args: SiteArgs) -> anyhow::Result<()> {
    let db = open_database(database).await?;
    let tenant = db
        .find_tenant(&args.url)
        .await?
        .ok_or_else(|| anyhow!("No site onboarded for {}", args.url))?;

    let pages = db.list_pages(tenant.id).await?;
    println!("{}: {} pages", tenant.domain, pages.len());
    for page in pages {
        println!(
            "[{}{}] {} - {} ({})",
            if page.selected { "S" } else { " " },
            if page.processed { "P" } else { " " },
            page.url,
            page.title.as_deref().unwrap_or("untitled"),
            format_timestamp(page.discovered_at)
        );
    }
    Ok(())
}

#[instrument]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    println!("Crawling {}...", args.url);

    let config = args.crawl.config();
    let renderer = HttpRenderer::new(&config.user_agent)?;
    let crawler = Arc::new(Crawler::new(renderer, config)?);

    let job = CrawlJob::spawn(crawler, args.url.clone(), CrawlMode::FullContent);

    let progress_bar = ProgressBar::new(args.crawl.max_pages as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let mut status = job.subscribe();
    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            while status.changed().await.is_ok() {
                let current = status.borrow().clone();
                match current {
                    JobStatus::Running { done, budget } => {
                        progress_bar.set_length(budget as u64);
                        progress_bar.set_position(done as u64);
                    }
                    other => {
                        progress_bar.finish_with_message(format!("{:?}", other));
                        break;
                    }
                }
            }
        }
    });

    let output = job.wait(Duration::from_secs(args.timeout)).await;
    let _ = progress_handle.await;
    progress_bar.finish_and_clear();

    let pages = match output? {
        CrawlOutput::Crawled(pages) => pages,
        CrawlOutput::Discovered(_) => return Err(anyhow!("Crawl returned discovery records")),
    };
    println!("Crawled {} pages", pages.len());

    if let Some(output_file) = args.output {
        CrawlArchive::new(args.url, pages).save(&output_file).await?;
        println!("Saved crawled content to {}", output_file.display());
    }

    Ok(())
}

#[instrument(skip(database))]
async fn ingest_command(database: &Path, args: IngestArgs) -> anyhow::Result<()> {
    let kb = knowledge_base(database, &args.pipeline).await?;
    let start_time = std::time::Instant::now();

    let report = match (&args.archive, &args.url) {
        (Some(archive), url) => {
            let archive = CrawlArchive::load(archive).await?;
            let root = url.clone().unwrap_or_else(|| archive.root.clone());
            let tenant = kb.tenant(&root).await?;
            println!("Ingesting {} archived pages for {}...", archive.pages.len(), tenant.domain);
            kb.ingest_pages(&tenant, &archive.pages).await?
        }
        (None, Some(url)) => {
            let tenant = kb.tenant(url).await?;
            println!("Ingesting {}...", tenant.domain);
            kb.ingest_site(&tenant).await?
        }
        (None, None) => return Err(anyhow!("Either a site URL or --archive is required")),
    };

    println!(
        "Ingested {} pages in {:.2?}: {} changed, {} chunks created, {} embeddings generated",
        report.pages_crawled,
        start_time.elapsed(),
        report.pages_changed,
        report.chunks_created,
        report.embeddings_generated
    );
    Ok(())
}

#[instrument(skip(database))]
async fn upload_command(database: &Path, args: UploadArgs) -> anyhow::Result<()> {
    let kb = knowledge_base(database, &args.pipeline).await?;
    let tenant = kb.tenant(&args.url).await?;

    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let filename = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("Not a file: {}", args.file.display()))?;
    let content_type = args
        .content_type
        .unwrap_or_else(|| guess_content_type(&args.file).to_string());

    let report = kb
        .ingest_document(&tenant, &filename, &content_type, &bytes)
        .await?;
    println!(
        "Uploaded {} ({} bytes), {} documents embedded",
        filename,
        bytes.len(),
        report.documents_processed
    );
    Ok(())
}

#[instrument(skip(database))]
async fn query_command(database: &Path, args: QueryArgs) -> anyhow::Result<()> {
    let kb = knowledge_base(database, &args.pipeline).await?;
    let tenant = kb
        .database()
        .find_tenant(&args.url)
        .await?
        .ok_or_else(|| anyhow!("No site onboarded for {}", args.url))?;

    if args.answer {
        let generator = sitekb::search::generator::gemini_from_env()?;
        let answer = kb.answer(&tenant, &args.question, &generator, None).await?;

        match args.format.as_str() {
            "json" => {
                let json_response = serde_json::json!({
                    "query": args.question,
                    "answer": answer.text,
                    "sources": answer.sources,
                });
                println!("{}", serde_json::to_string_pretty(&json_response)?);
            }
            _ => {
                println!("\nAnswer:");
                println!("{}", answer.text);
                println!("\nSources:");
                for (i, source) in answer.sources.iter().enumerate() {
                    println!("{}. {}", i + 1, source.url);
                }
                println!();
            }
        }
        return Ok(());
    }

    let results = kb.query(&tenant, &args.question, args.top_k).await?;
    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&results)?),
        _ => {
            println!("Found {} results", results.len());
            for (i, result) in results.iter().enumerate() {
                println!("{}. [{:.3}] {}", i + 1, result.similarity, result.title);
                println!("   URL: {}", result.url);
                println!("   {}", result.content.chars().take(200).collect::<String>());
                println!();
            }
        }
    }
    Ok(())
}

#[instrument(skip(database))]
async fn list_command(database: &Path, args: ListArgs) -> anyhow::Result<()> {
    let db = open_database(database).await?;
    let tenants = db.list_tenants().await?;

    println!("Onboarded sites: {}", tenants.len());
    for tenant in tenants {
        if args.details {
            let pages = db.list_pages(tenant.id).await?;
            let chunks = db.count_chunks(tenant.id).await?;
            let documents = db.count_documents(tenant.id).await?;
            println!("URL: {}", tenant.root_url);
            println!("Domain: {}", tenant.domain);
            println!("Created: {}", format_timestamp(tenant.created_at));
            println!(
                "Pages: {} ({} processed)",
                pages.len(),
                pages.iter().filter(|p| p.processed).count()
            );
            println!("Chunks: {} ({} pending)", chunks.total, chunks.pending());
            println!("Documents: {} ({} pending)", documents.total, documents.pending());
            println!();
        } else {
            println!(
                "{} - {} (created {})",
                tenant.domain,
                tenant.root_url,
                format_timestamp(tenant.created_at)
            );
        }
    }
    Ok(())
}

#[instrument(skip(database))]
async fn delete_command(database: &Path, args: SiteArgs) -> anyhow::Result<()> {
    let db = open_database(database).await?;
    let tenant = db
        .find_tenant(&args.url)
        .await?
        .ok_or_else(|| anyhow!("No site onboarded for {}", args.url))?;

    if db.delete_tenant(tenant.id).await? {
        println!("Deleted {}", tenant.domain);
    }
    Ok(())
}
