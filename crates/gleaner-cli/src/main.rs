use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gleaner_client::{ChromeNavigator, NavigatorOptions};
use gleaner_core::extractor::{RecordExtractor, SentinelIdentity};
use gleaner_core::pacing::PacingConfig;
use gleaner_core::profile::SiteProfile;
use gleaner_core::report::{CrawlReport, TracingCrawlReporter};
use gleaner_core::session::{Credentials, sign_in};
use gleaner_core::store::{DeduplicationStore, RevisitPolicy};
use gleaner_core::traits::{PageNavigator, PersistenceWriter};
use gleaner_core::{CrawlSettings, HtmlDocumentExtractor, ListingCrawler};
use gleaner_store::CsvRecordStore;

#[derive(Parser)]
#[command(name = "gleaner", version, about = "Incremental listing crawler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a paginated listing and merge the records into a CSV file
    Crawl(CrawlArgs),

    /// Print the built-in site profile as JSON
    Profile,

    /// Show the records stored in a CSV file
    Show {
        #[arg(short, long, env = "GLEANER_OUTPUT", default_value = "company_data.csv")]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct CrawlArgs {
    /// Site profile JSON (defaults to the built-in profile)
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Listing URL, overriding the profile's
    #[arg(short, long, env = "GLEANER_LISTING_URL")]
    url: Option<String>,

    /// CSV file to merge records into
    #[arg(short, long, env = "GLEANER_OUTPUT", default_value = "company_data.csv")]
    output: PathBuf,

    /// Maximum number of listing pages to crawl
    #[arg(long, default_value_t = 10)]
    max_pages: usize,

    /// Timeout for each page readiness wait, in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Timeout for the post-sign-in page, in seconds (covers manual challenges)
    #[arg(long, default_value_t = 60)]
    login_timeout_secs: u64,

    /// Base pause between navigation steps, in milliseconds
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,

    /// Maximum random jitter added to each pause, in milliseconds
    #[arg(long, default_value_t = 500)]
    jitter_ms: u64,

    /// Never revisit records already in the output file
    #[arg(long, default_value_t = false)]
    skip_stored: bool,

    /// Drop items whose identity field is missing instead of storing them
    /// under a placeholder
    #[arg(long, default_value_t = false)]
    reject_unnamed: bool,

    /// Show the browser window
    #[arg(long, default_value_t = false)]
    headed: bool,

    /// Browser profile directory, e.g. one with an existing session
    #[arg(long)]
    user_data_dir: Option<PathBuf>,

    /// Chrome/Chromium binary
    #[arg(long, env = "CHROME_BIN")]
    chrome_bin: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gleaner=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => cmd_crawl(args).await,
        Commands::Profile => cmd_profile(),
        Commands::Show { output } => cmd_show(&output),
    }
}

async fn cmd_crawl(args: CrawlArgs) -> Result<()> {
    let profile = match &args.profile {
        Some(path) => SiteProfile::from_file(path)?,
        None => SiteProfile::default(),
    };
    let listing_url = profile.resolve_listing_url(args.url.as_deref())?;

    let writer = CsvRecordStore::new(&args.output);
    let revisit = if args.skip_stored {
        RevisitPolicy::SkipStored
    } else {
        RevisitPolicy::Refresh
    };
    let store = DeduplicationStore::load_from(&writer)
        .with_context(|| format!("Failed to load {}", args.output.display()))?
        .with_policy(revisit);

    let sentinel = if args.reject_unnamed {
        SentinelIdentity::Reject
    } else {
        SentinelIdentity::Collapse
    };
    let extractor = RecordExtractor::from_profile(&profile).with_sentinel_policy(sentinel);

    let wait_timeout = Duration::from_secs(args.timeout_secs);
    let settings = CrawlSettings {
        wait_timeout,
        next_page_timeout: CrawlSettings::default().next_page_timeout.min(wait_timeout),
        pacing: PacingConfig::jittered(
            Duration::from_millis(args.delay_ms),
            Duration::from_millis(args.jitter_ms),
        ),
    };

    let navigator = ChromeNavigator::launch(NavigatorOptions {
        headless: !args.headed,
        user_data_dir: args.user_data_dir.clone(),
        chrome_bin: args.chrome_bin.clone(),
        ..NavigatorOptions::default()
    })
    .await
    .context("Failed to start the browser")?;

    let result = async {
        prepare_session(&navigator, &profile, &args).await?;

        tracing::info!(url = %listing_url, "Opening listing");
        navigator
            .navigate(&listing_url)
            .await
            .with_context(|| format!("Failed to open listing {listing_url}"))?;

        let mut crawler = ListingCrawler::new(
            navigator.clone(),
            HtmlDocumentExtractor::new(),
            writer,
            profile.clone(),
            settings,
        )
        .with_store(store)
        .with_extractor(extractor);

        crawler
            .run(args.max_pages, &TracingCrawlReporter)
            .await
            .context("Crawl aborted")
    }
    .await;

    if let Err(e) = navigator.shutdown().await {
        tracing::warn!(error = %e, "Browser did not shut down cleanly");
    }

    let report = result?;
    print_report(&report, &args.output);
    if report.stop_reason.is_fatal() {
        anyhow::bail!("Crawl stopped early: {}", report.stop_reason);
    }
    Ok(())
}

/// Sign in when the profile has a login form and credentials are set.
async fn prepare_session(navigator: &ChromeNavigator, profile: &SiteProfile, args: &CrawlArgs) -> Result<()> {
    let Some(login) = &profile.login else {
        return Ok(());
    };
    let Some(credentials) = Credentials::from_env() else {
        tracing::info!("GLEANER_EMAIL/GLEANER_PASSWORD not set, relying on the browser session");
        return Ok(());
    };

    sign_in(
        navigator,
        login,
        &credentials,
        Duration::from_secs(args.timeout_secs),
        Duration::from_secs(args.login_timeout_secs),
    )
    .await
    .context("Sign-in failed")
}

fn print_report(report: &CrawlReport, output: &Path) {
    println!("Crawl finished: {}", report.stop_reason);
    println!("  pages completed: {}", report.pages_completed);
    println!("  items seen:      {}", report.items_seen);
    println!("  collected:       {}", report.collected);
    println!("  skipped:         {}", report.skipped);
    println!("  filtered:        {}", report.filtered);
    println!("  failed:          {}", report.failed);
    println!("  records in {}: {}", output.display(), report.records_total);
}

fn cmd_profile() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&SiteProfile::default())?);
    Ok(())
}

fn cmd_show(output: &Path) -> Result<()> {
    let records = CsvRecordStore::new(output)
        .load()
        .with_context(|| format!("Failed to read {}", output.display()))?;

    if records.is_empty() {
        println!("No records in {}", output.display());
        return Ok(());
    }

    for record in &records {
        println!("  {} | {} | {}", record.company, record.title, record.skills);
    }
    println!("\nTotal: {} records", records.len());
    Ok(())
}
