use std::fmt;

use crate::error::AppError;
use crate::merge::MergeSummary;
use crate::store::UpsertOutcome;

/// Why a crawl ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The page cap was hit.
    MaxPagesReached,
    /// The listing has no further page.
    NoNextPage,
    /// The crawler could not get back to a known listing position.
    FatalNavigationError(String),
    /// An error outside navigation, usually storage, ended the run.
    Aborted(String),
}

impl StopReason {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StopReason::FatalNavigationError(_) | StopReason::Aborted(_)
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaxPagesReached => f.write_str("page limit reached"),
            StopReason::NoNextPage => f.write_str("no next page"),
            StopReason::FatalNavigationError(msg) => write!(f, "fatal navigation error: {msg}"),
            StopReason::Aborted(msg) => write!(f, "aborted: {msg}"),
        }
    }
}

/// Final summary of a crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub pages_completed: usize,
    pub items_seen: usize,
    /// Items extracted and upserted into the store.
    pub collected: usize,
    /// Items whose identity was already known.
    pub skipped: usize,
    /// Items rejected by the inclusion filter or missing an identity.
    pub filtered: usize,
    pub failed: usize,
    /// Records in the store when the crawl ended.
    pub records_total: usize,
    pub stop_reason: StopReason,
}

/// Events emitted by the crawler as it goes.
#[derive(Debug, Clone)]
pub enum CrawlEvent<'a> {
    Started {
        max_pages: usize,
        stored: usize,
    },
    PageStarted {
        page: usize,
        items: usize,
    },
    ItemSkipped {
        page: usize,
        key: &'a str,
    },
    ItemFiltered {
        page: usize,
        link: &'a str,
    },
    ItemUnidentified {
        page: usize,
        link: &'a str,
    },
    RecordCollected {
        page: usize,
        key: &'a str,
        outcome: UpsertOutcome,
    },
    ItemFailed {
        page: usize,
        link: &'a str,
        error: &'a AppError,
    },
    PageFlushed {
        page: usize,
        summary: &'a MergeSummary,
    },
    FlushFailed {
        page: usize,
        error: &'a AppError,
    },
    Stopped {
        report: &'a CrawlReport,
    },
}

/// Receives crawl events (decoupled logging).
pub trait CrawlReporter: Send + Sync {
    fn report(&self, event: CrawlEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCrawlReporter;

impl CrawlReporter for TracingCrawlReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        match event {
            CrawlEvent::Started { max_pages, stored } => {
                tracing::info!(%max_pages, %stored, "Crawl started");
            }
            CrawlEvent::PageStarted { page, items } => {
                tracing::info!(%page, %items, "Scraping page");
            }
            CrawlEvent::ItemSkipped { page, key } => {
                tracing::info!(%page, %key, "Skipping already present record");
            }
            CrawlEvent::ItemFiltered { page, link } => {
                tracing::debug!(%page, %link, "Item rejected by filter");
            }
            CrawlEvent::ItemUnidentified { page, link } => {
                tracing::warn!(%page, %link, "Item has no identity, dropped");
            }
            CrawlEvent::RecordCollected { page, key, outcome } => match outcome {
                UpsertOutcome::Inserted => tracing::info!(%page, %key, "Added record"),
                UpsertOutcome::Updated => tracing::info!(%page, %key, "Refreshed record"),
                UpsertOutcome::Unchanged => tracing::debug!(%page, %key, "Record unchanged"),
            },
            CrawlEvent::ItemFailed { page, link, error } => {
                tracing::warn!(%page, %link, %error, "Item failed, continuing");
            }
            CrawlEvent::PageFlushed { page, summary } => {
                tracing::info!(
                    %page,
                    added = summary.added,
                    updated = summary.updated,
                    total = summary.total,
                    "Records written"
                );
            }
            CrawlEvent::FlushFailed { page, error } => {
                tracing::error!(%page, %error, "Failed to write records");
            }
            CrawlEvent::Stopped { report } => {
                tracing::info!(
                    pages = report.pages_completed,
                    collected = report.collected,
                    skipped = report.skipped,
                    filtered = report.filtered,
                    failed = report.failed,
                    records = report.records_total,
                    reason = %report.stop_reason,
                    "Crawl finished"
                );
            }
        }
    }
}
