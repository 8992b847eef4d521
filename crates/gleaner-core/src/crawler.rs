//! The listing crawl: walk listing pages, visit each item's detail page,
//! collect records, flush after every page.
//!
//! ```text
//! Start -> [ Listing -> (Item -> Detail -> Back -> Listing)* -> Flush -> Paginate ]*
//!       -> End(MaxPagesReached | NoNextPage | FatalNavigationError | Aborted)
//! ```
//!
//! Anything that goes wrong with a single item is contained to that item.
//! Losing the listing itself is fatal: the crawler cannot tell which page it
//! is on any more, so it flushes what it has and stops.

use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use crate::document::Element;
use crate::error::AppError;
use crate::extractor::{Extraction, RecordExtractor, clean_text};
use crate::merge::MergeSummary;
use crate::pacing::{Pacer, PacingConfig};
use crate::profile::SiteProfile;
use crate::report::{CrawlEvent, CrawlReport, CrawlReporter, StopReason};
use crate::store::{DeduplicationStore, UpsertOutcome};
use crate::traits::{DocumentExtractor, PageNavigator, PersistenceWriter};

/// How often a fresh listing is checked for after clicking "next".
const LISTING_POLL: Duration = Duration::from_millis(100);

/// Timeouts and pacing for a crawl.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Bound on every listing/detail readiness wait, including waiting for
    /// the next listing page to replace the current one.
    pub wait_timeout: Duration,
    /// Bound on waiting for the next-page control; expiry ends the crawl.
    pub next_page_timeout: Duration,
    pub pacing: PacingConfig,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(10),
            next_page_timeout: Duration::from_secs(5),
            pacing: PacingConfig::default(),
        }
    }
}

/// Typed result of one item.
#[derive(Debug)]
pub enum ItemOutcome {
    Collected { key: String, outcome: UpsertOutcome },
    AlreadyKnown { key: String },
    Filtered,
    Unidentified,
    Failed(AppError),
}

/// An item card as read from the listing.
#[derive(Debug)]
struct ItemCard {
    link: Result<String, AppError>,
    /// Identity shown on the card itself, if the profile says where.
    identity: Option<String>,
}

#[derive(Debug, Default)]
struct Counters {
    pages_completed: usize,
    items_seen: usize,
    collected: usize,
    skipped: usize,
    filtered: usize,
    failed: usize,
}

impl Counters {
    fn note<R: CrawlReporter>(&mut self, reporter: &R, page: usize, link: &str, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Collected { key, outcome } => {
                self.collected += 1;
                reporter.report(CrawlEvent::RecordCollected {
                    page,
                    key,
                    outcome: *outcome,
                });
            }
            ItemOutcome::AlreadyKnown { key } => {
                self.skipped += 1;
                reporter.report(CrawlEvent::ItemSkipped { page, key });
            }
            ItemOutcome::Filtered => {
                self.filtered += 1;
                reporter.report(CrawlEvent::ItemFiltered { page, link });
            }
            ItemOutcome::Unidentified => {
                self.filtered += 1;
                reporter.report(CrawlEvent::ItemUnidentified { page, link });
            }
            ItemOutcome::Failed(error) => {
                self.failed += 1;
                reporter.report(CrawlEvent::ItemFailed { page, link, error });
            }
        }
    }
}

/// Drives one listing, one page and one item at a time.
///
/// Generic over the browser, the document parser and durable storage so it
/// can run against a simulated site in tests.
pub struct ListingCrawler<N, D, W>
where
    N: PageNavigator,
    D: DocumentExtractor,
    W: PersistenceWriter,
{
    navigator: N,
    documents: D,
    writer: W,
    extractor: RecordExtractor,
    profile: SiteProfile,
    settings: CrawlSettings,
    pacer: Pacer,
    store: DeduplicationStore,
}

impl<N, D, W> ListingCrawler<N, D, W>
where
    N: PageNavigator,
    D: DocumentExtractor,
    W: PersistenceWriter,
{
    /// Create a crawler with an empty store and the profile's record extractor.
    pub fn new(navigator: N, documents: D, writer: W, profile: SiteProfile, settings: CrawlSettings) -> Self {
        let pacer = Pacer::new(settings.pacing.clone());
        Self {
            navigator,
            documents,
            writer,
            extractor: RecordExtractor::from_profile(&profile),
            profile,
            settings,
            pacer,
            store: DeduplicationStore::new(),
        }
    }

    /// Start from `store`, usually seeded from the writer's storage.
    pub fn with_store(mut self, store: DeduplicationStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_extractor(mut self, extractor: RecordExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store(&self) -> &DeduplicationStore {
        &self.store
    }

    pub fn into_store(self) -> DeduplicationStore {
        self.store
    }

    /// Crawl at most `max_pages` listing pages, starting from the listing the
    /// navigator currently shows.
    ///
    /// Returns `Err` only when storage fails or the profile is unusable; every
    /// navigation outcome, fatal ones included, ends in a [`CrawlReport`].
    /// The reporter sees a final `Stopped` event either way.
    pub async fn run<R: CrawlReporter>(&mut self, max_pages: usize, reporter: &R) -> Result<CrawlReport, AppError> {
        reporter.report(CrawlEvent::Started {
            max_pages,
            stored: self.store.len(),
        });

        let mut counters = Counters::default();
        match self.crawl_pages(max_pages, &mut counters, reporter).await {
            Ok(reason) => Ok(self.finish(&counters, reason, reporter)),
            Err(AppError::FatalNavigation(msg)) => {
                tracing::error!(error = %msg, "Lost the listing, stopping");
                self.final_flush(counters.pages_completed + 1, reporter);
                Ok(self.finish(&counters, StopReason::FatalNavigationError(msg), reporter))
            }
            Err(e) => {
                if !matches!(e, AppError::StorageError(_)) {
                    self.final_flush(counters.pages_completed + 1, reporter);
                }
                self.finish(&counters, StopReason::Aborted(e.to_string()), reporter);
                Err(e)
            }
        }
    }

    fn finish<R: CrawlReporter>(&self, counters: &Counters, stop_reason: StopReason, reporter: &R) -> CrawlReport {
        let report = CrawlReport {
            pages_completed: counters.pages_completed,
            items_seen: counters.items_seen,
            collected: counters.collected,
            skipped: counters.skipped,
            filtered: counters.filtered,
            failed: counters.failed,
            records_total: self.store.len(),
            stop_reason,
        };
        reporter.report(CrawlEvent::Stopped { report: &report });
        report
    }

    async fn crawl_pages<R: CrawlReporter>(
        &mut self,
        max_pages: usize,
        counters: &mut Counters,
        reporter: &R,
    ) -> Result<StopReason, AppError> {
        self.navigator
            .wait_for(&self.profile.listing_ready, self.settings.wait_timeout)
            .await
            .map_err(|e| AppError::FatalNavigation(format!("Listing never became ready: {e}")))?;

        let mut page = 0;
        loop {
            if page >= max_pages {
                return Ok(StopReason::MaxPagesReached);
            }
            page += 1;

            self.crawl_page(page, counters, reporter).await?;
            self.flush(page, reporter)?;
            counters.pages_completed = page;

            if page >= max_pages {
                return Ok(StopReason::MaxPagesReached);
            }
            self.pacer.pause("page").await;
            if !self.advance_page().await {
                return Ok(StopReason::NoNextPage);
            }
        }
    }

    async fn crawl_page<R: CrawlReporter>(
        &mut self,
        page: usize,
        counters: &mut Counters,
        reporter: &R,
    ) -> Result<(), AppError> {
        let listing_url = self
            .navigator
            .current_url()
            .await
            .map_err(|e| AppError::FatalNavigation(format!("Cannot read listing URL: {e}")))?;
        let raw = self
            .navigator
            .snapshot()
            .await
            .map_err(|e| AppError::FatalNavigation(format!("Cannot read listing page: {e}")))?;
        let cards = self.read_cards(&raw, &listing_url)?;

        reporter.report(CrawlEvent::PageStarted {
            page,
            items: cards.len(),
        });

        for (position, card) in cards.into_iter().enumerate() {
            counters.items_seen += 1;

            if let Some(key) = card.identity.as_deref()
                && self.store.contains(key)
            {
                let outcome = ItemOutcome::AlreadyKnown {
                    key: key.to_string(),
                };
                counters.note(reporter, page, key, &outcome);
                continue;
            }

            let link = match card.link {
                Ok(link) => link,
                Err(error) if !error.is_recoverable() => return Err(error),
                Err(error) => {
                    let label = format!("card #{}", position + 1);
                    counters.note(reporter, page, &label, &ItemOutcome::Failed(error));
                    continue;
                }
            };

            let outcome = match self.visit_detail(&link).await {
                Ok(outcome) => outcome,
                Err(error) if error.is_recoverable() => ItemOutcome::Failed(error),
                Err(error) => return Err(error),
            };
            counters.note(reporter, page, &link, &outcome);

            self.return_to_listing(&listing_url).await?;
        }
        Ok(())
    }

    /// Enumerate item cards in document order.
    fn read_cards(&self, raw: &str, listing_url: &str) -> Result<Vec<ItemCard>, AppError> {
        let document = self.documents.parse(raw)?;
        let cards = self.documents.find_all(&document, &self.profile.item_card)?;

        cards
            .iter()
            .map(|card| {
                let identity = match &self.profile.card_identity {
                    Some(selector) => self
                        .documents
                        .find_within(card, selector)?
                        .and_then(|el| clean_text(&el.text)),
                    None => None,
                };
                Ok(ItemCard {
                    link: self.card_link(card, listing_url),
                    identity,
                })
            })
            .collect()
    }

    fn card_link(&self, card: &Element, listing_url: &str) -> Result<String, AppError> {
        let selector = &self.profile.item_link;
        let attribute = &self.profile.link_attribute;

        let anchor = self
            .documents
            .find_within(card, selector)?
            .ok_or_else(|| AppError::ElementNotFound(format!("{selector} in item card")))?;
        let href = anchor
            .attr(attribute)
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or_else(|| AppError::ElementNotFound(format!("{attribute} on {selector}")))?;

        resolve_link(listing_url, href)
    }

    /// Navigate to one detail page and read it.
    async fn visit_detail(&mut self, link: &str) -> Result<ItemOutcome, AppError> {
        self.navigator.navigate(link).await?;
        self.navigator
            .wait_for(&self.profile.detail_ready, self.settings.wait_timeout)
            .await?;
        let raw = self.navigator.snapshot().await?;

        let extraction = {
            let document = self.documents.parse(&raw)?;
            self.extractor.extract(&self.documents, &document)?
        };

        let outcome = match extraction {
            Extraction::Filtered => ItemOutcome::Filtered,
            Extraction::Unidentified => ItemOutcome::Unidentified,
            Extraction::Candidate(record) if self.store.contains(record.key()) => {
                ItemOutcome::AlreadyKnown {
                    key: record.key().to_string(),
                }
            }
            Extraction::Candidate(record) => {
                let key = record.key().to_string();
                let outcome = self.store.upsert(record);
                ItemOutcome::Collected { key, outcome }
            }
        };

        self.pacer.pause("detail").await;
        Ok(outcome)
    }

    /// Get back to the listing at `listing_url`. Going back is skipped when
    /// the navigator never left the listing.
    async fn return_to_listing(&self, listing_url: &str) -> Result<(), AppError> {
        match self.navigator.current_url().await {
            Ok(current) if current == listing_url => {}
            Ok(_) => self.go_back().await?,
            Err(e) => {
                // Position unknown: only step back if the listing is not showing.
                tracing::debug!(error = %e, "Cannot read URL after item");
                if self.listing_ready().await.is_ok() {
                    return Ok(());
                }
                self.go_back().await?;
            }
        }
        self.listing_ready()
            .await
            .map_err(|e| AppError::FatalNavigation(format!("Listing did not come back: {e}")))
    }

    async fn go_back(&self) -> Result<(), AppError> {
        self.navigator
            .back()
            .await
            .map_err(|e| AppError::FatalNavigation(format!("Cannot go back to the listing: {e}")))
    }

    async fn listing_ready(&self) -> Result<(), AppError> {
        self.navigator
            .wait_for(&self.profile.listing_ready, self.settings.wait_timeout)
            .await
    }

    /// Move to the next listing page. `false` means there is none.
    async fn advance_page(&self) -> bool {
        if let Err(e) = self.navigator.scroll_to_bottom().await {
            tracing::debug!(error = %e, "Scroll failed");
        }
        self.pacer.pause("scroll").await;

        let next = &self.profile.next_page;
        if let Err(e) = self
            .navigator
            .wait_for(next, self.settings.next_page_timeout)
            .await
        {
            tracing::info!(reason = %e, "No more pages");
            return false;
        }
        let before = match self.listing_fingerprint().await {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read the current listing, treating as last page");
                return false;
            }
        };
        if let Err(e) = self.navigator.click(next).await {
            if !e.is_absence() {
                tracing::warn!(error = %e, "Next page control did not respond");
            }
            tracing::info!("No more pages");
            return false;
        }
        self.pacer.pause("next page").await;

        match self.wait_for_new_listing(&before).await {
            Ok(()) => {
                tracing::info!("Navigating to next page");
                true
            }
            Err(e) => {
                tracing::info!(reason = %e, "Next page never loaded, treating as last page");
                false
            }
        }
    }

    /// What identifies the listing page on screen: its card links, or its
    /// URL when it has no cards.
    async fn listing_fingerprint(&self) -> Result<Vec<String>, AppError> {
        let url = self.navigator.current_url().await?;
        let raw = self.navigator.snapshot().await?;
        let cards = self.read_cards(&raw, &url)?;
        if cards.is_empty() {
            return Ok(vec![url]);
        }
        Ok(cards
            .into_iter()
            .map(|card| card.link.ok().or(card.identity).unwrap_or_default())
            .collect())
    }

    /// Poll until a ready listing different from `before` is showing.
    ///
    /// The old page stays ready for a while after the click, so readiness
    /// alone does not mean the next page has loaded.
    async fn wait_for_new_listing(&self, before: &[String]) -> Result<(), AppError> {
        let timeout = self.settings.wait_timeout;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let ready = self
                .navigator
                .wait_for(&self.profile.listing_ready, remaining)
                .await
                .is_ok();
            if ready
                && let Ok(after) = self.listing_fingerprint().await
                && after != before
            {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(AppError::timeout("next listing page", timeout));
            }
            tokio::time::sleep(LISTING_POLL.min(deadline - now)).await;
        }
    }

    fn flush<R: CrawlReporter>(&self, page: usize, reporter: &R) -> Result<MergeSummary, AppError> {
        match self.writer.merge(&self.store) {
            Ok(summary) => {
                reporter.report(CrawlEvent::PageFlushed {
                    page,
                    summary: &summary,
                });
                Ok(summary)
            }
            Err(error) => {
                reporter.report(CrawlEvent::FlushFailed {
                    page,
                    error: &error,
                });
                Err(error)
            }
        }
    }

    /// Best-effort flush on the way out; nothing to do if this run collected
    /// nothing.
    fn final_flush<R: CrawlReporter>(&self, page: usize, reporter: &R) {
        if self.store.collected_len() == 0 {
            return;
        }
        let _ = self.flush(page, reporter);
    }
}

/// Resolve a card link against the listing it was found on.
fn resolve_link(listing_url: &str, href: &str) -> Result<String, AppError> {
    let resolved = match Url::parse(listing_url) {
        Ok(base) => base.join(href),
        Err(_) => Url::parse(href),
    };
    resolved
        .map(String::from)
        .map_err(|e| AppError::ExtractionFailure(format!("Invalid item link '{href}': {e}")))
}
