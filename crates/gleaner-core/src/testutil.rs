//! Test utilities: a simulated site behind [`PageNavigator`], in-memory
//! storage and a recording reporter.
//!
//! All mocks use `Arc<Mutex<_>>` so a test can keep a clone around and
//! inspect what the crawler did after the fact.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::crawler::CrawlSettings;
use crate::document::HtmlDocumentExtractor;
use crate::error::AppError;
use crate::models::Record;
use crate::pacing::PacingConfig;
use crate::profile::{FieldSelectors, InclusionFilter, LoginProfile, SiteProfile};
use crate::report::{CrawlEvent, CrawlReporter};
use crate::selector::ElementSelector;
use crate::traits::{DocumentExtractor, PageNavigator, PersistenceWriter};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Profile matching the markup produced by [`listing_page`] and [`detail_page`].
pub fn test_profile() -> SiteProfile {
    SiteProfile {
        listing_url: None,
        listing_ready: ElementSelector::tag("ul").with_class("results"),
        item_card: ElementSelector::tag("li").with_class("card"),
        item_link: ElementSelector::tag("a").with_class("card-link"),
        link_attribute: "href".to_string(),
        card_identity: Some(ElementSelector::tag("span").with_class("card-company")),
        detail_ready: ElementSelector::tag("div").with_class("detail"),
        next_page: ElementSelector::tag("button").with_attr("aria-label", "View next page"),
        fields: FieldSelectors {
            company: ElementSelector::tag("div").with_class("company"),
            title: ElementSelector::tag("div").with_class("title"),
            description: ElementSelector::tag("li").with_class("insight"),
            skills: ElementSelector::tag("button").with_class("skills"),
        },
        filter: Some(InclusionFilter {
            selector: ElementSelector::tag("span").with_class("loc"),
            index: 1,
            contains: "Hyderabad".to_string(),
        }),
        login: Some(LoginProfile {
            url: "https://site.test/login".to_string(),
            open_control: Some(ElementSelector::tag("a").with_class("sign-in")),
            username_field: ElementSelector::tag("input").with_attr("id", "username"),
            password_field: ElementSelector::tag("input").with_attr("id", "password"),
            submit: ElementSelector::tag("button").with_class("submit"),
            ready: ElementSelector::tag("nav").with_class("global-nav"),
        }),
    }
}

/// Short waits, no pacing.
pub fn fast_settings() -> CrawlSettings {
    CrawlSettings {
        wait_timeout: Duration::from_millis(50),
        next_page_timeout: Duration::from_millis(50),
        pacing: PacingConfig::none(),
    }
}

/// A listing page. Each card is `(href, identity shown on the card)`.
pub fn listing_page(cards: &[(&str, Option<&str>)], has_next: bool) -> String {
    let items: String = cards
        .iter()
        .map(|(href, identity)| {
            let identity = identity
                .map(|id| format!(r#"<span class="card-company">{id}</span>"#))
                .unwrap_or_default();
            format!(r#"<li class="card"><a class="card-link" href="{href}">Open</a>{identity}</li>"#)
        })
        .collect();
    let next = if has_next {
        r#"<button aria-label="View next page">Next</button>"#
    } else {
        ""
    };
    format!(r#"<html><body><ul class="results">{items}</ul>{next}</body></html>"#)
}

/// A detail page. The second location line is `location`.
pub fn detail_page(company: &str, title: &str, location: &str) -> String {
    format!(
        r#"<html><body><div class="detail">
            <div class="company">{company}</div>
            <div class="title">{title}</div>
            <span class="loc">Full-time</span><span class="loc">{location}</span>
            <ul><li class="insight">Full-time</li></ul>
            <button class="skills">Skills: Rust, SQL</button>
        </div></body></html>"#
    )
}

pub fn login_page() -> String {
    r#"<html><body>
        <a class="sign-in">Sign in</a>
        <form>
            <input id="username" type="text">
            <input id="password" type="password">
            <button class="submit">Sign in</button>
        </form>
    </body></html>"#
        .to_string()
}

pub fn signed_in_page() -> String {
    r#"<html><body><nav class="global-nav">Home</nav></body></html>"#.to_string()
}

// ---------------------------------------------------------------------------
// MockNavigator
// ---------------------------------------------------------------------------

const NOT_FOUND_PAGE: &str = "<html><body><h1>Not found</h1></body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Listing(usize),
    Page(String),
}

struct Site {
    listing_url: String,
    next_page: ElementSelector,
    listings: Vec<String>,
    pages: HashMap<String, String>,
    routes: Vec<(ElementSelector, String)>,
    unreachable: HashSet<String>,
    history: Vec<Location>,
    /// Successful `back` calls left before it starts failing.
    back_budget: Option<usize>,
    /// Successful `current_url` calls left before it starts failing.
    url_budget: Option<usize>,
    broken_controls: Vec<ElementSelector>,
    /// How long a next-page click takes to replace the listing.
    next_delay: Duration,
    pending: Option<(Instant, Location)>,

    visits: Vec<String>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    backs: usize,
    scrolls: usize,
}

impl Site {
    fn url_of(&self, location: &Location) -> String {
        match location {
            Location::Listing(0) => self.listing_url.clone(),
            Location::Listing(i) => format!("{}#page={}", self.listing_url, i + 1),
            Location::Page(url) => url.clone(),
        }
    }

    fn html(&self) -> String {
        let page = match self.history.last() {
            Some(Location::Listing(i)) => self.listings.get(*i),
            Some(Location::Page(url)) => self.pages.get(url),
            None => None,
        };
        page.cloned().unwrap_or_else(|| NOT_FOUND_PAGE.to_string())
    }

    /// Apply a delayed page change once it is due.
    fn settle(&mut self) {
        let due = matches!(&self.pending, Some((at, _)) if Instant::now() >= *at);
        if due && let Some((_, location)) = self.pending.take() {
            self.history.push(location);
        }
    }

    fn has(&self, selector: &ElementSelector) -> bool {
        let ex = HtmlDocumentExtractor::new();
        let doc = ex.parse(&self.html()).unwrap();
        ex.find(&doc, selector).unwrap().is_some()
    }
}

/// Browser simulation over a fixed set of pages.
///
/// Listing pages are chained by the profile's next-page control; detail
/// pages are looked up by URL; other clicks follow routes registered with
/// [`MockNavigator::with_route`].
#[derive(Clone)]
pub struct MockNavigator {
    site: Arc<Mutex<Site>>,
}

impl MockNavigator {
    pub fn new(listing_url: &str) -> Self {
        Self {
            site: Arc::new(Mutex::new(Site {
                listing_url: listing_url.to_string(),
                next_page: test_profile().next_page,
                listings: Vec::new(),
                pages: HashMap::new(),
                routes: Vec::new(),
                unreachable: HashSet::new(),
                history: Vec::new(),
                back_budget: None,
                url_budget: None,
                broken_controls: Vec::new(),
                next_delay: Duration::ZERO,
                pending: None,
                visits: Vec::new(),
                clicks: Vec::new(),
                fills: Vec::new(),
                backs: 0,
                scrolls: 0,
            })),
        }
    }

    pub fn with_listing(self, html: String) -> Self {
        self.site.lock().unwrap().listings.push(html);
        self
    }

    pub fn with_page(self, url: &str, html: String) -> Self {
        self.site.lock().unwrap().pages.insert(url.to_string(), html);
        self
    }

    /// Clicking `control` loads `url`.
    pub fn with_route(self, control: &ElementSelector, url: &str) -> Self {
        self.site
            .lock()
            .unwrap()
            .routes
            .push((control.clone(), url.to_string()));
        self
    }

    /// Navigating to `url` fails and leaves the page where it was.
    pub fn with_unreachable(self, url: &str) -> Self {
        self.site.lock().unwrap().unreachable.insert(url.to_string());
        self
    }

    /// `back` succeeds `n` times, then fails.
    pub fn failing_back_after(self, n: usize) -> Self {
        self.site.lock().unwrap().back_budget = Some(n);
        self
    }

    /// `current_url` succeeds `n` times, then fails.
    pub fn url_unreadable_after(self, n: usize) -> Self {
        self.site.lock().unwrap().url_budget = Some(n);
        self
    }

    /// Clicking `control` fails even though it is on the page.
    pub fn with_broken_control(self, control: &ElementSelector) -> Self {
        self.site
            .lock()
            .unwrap()
            .broken_controls
            .push(control.clone());
        self
    }

    /// A next-page click returns at once but the listing only changes
    /// `delay` later, like a client-side re-render.
    pub fn with_next_delay(self, delay: Duration) -> Self {
        self.site.lock().unwrap().next_delay = delay;
        self
    }

    pub fn start_at_listing(self) -> Self {
        self.site.lock().unwrap().history.push(Location::Listing(0));
        self
    }

    pub fn at(self, url: &str) -> Self {
        self.site
            .lock()
            .unwrap()
            .history
            .push(Location::Page(url.to_string()));
        self
    }

    fn site(&self) -> MutexGuard<'_, Site> {
        let mut site = self.site.lock().unwrap();
        site.settle();
        site
    }

    /// Every URL passed to `navigate`, in order.
    pub fn visits(&self) -> Vec<String> {
        self.site.lock().unwrap().visits.clone()
    }

    /// CSS of every clicked control, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.site.lock().unwrap().clicks.clone()
    }

    /// `(field css, text)` for every fill, in order.
    pub fn fills(&self) -> Vec<(String, String)> {
        self.site.lock().unwrap().fills.clone()
    }

    pub fn backs(&self) -> usize {
        self.site.lock().unwrap().backs
    }

    pub fn scrolls(&self) -> usize {
        self.site.lock().unwrap().scrolls
    }

    pub fn current_location(&self) -> String {
        let site = self.site();
        site.history
            .last()
            .map(|loc| site.url_of(loc))
            .unwrap_or_else(|| "about:blank".to_string())
    }
}

impl PageNavigator for MockNavigator {
    async fn navigate(&self, url: &str) -> Result<(), AppError> {
        let mut site = self.site();
        site.visits.push(url.to_string());
        if site.unreachable.contains(url) {
            return Err(AppError::BrowserError(format!(
                "net::ERR_CONNECTION_REFUSED at {url}"
            )));
        }
        site.history.push(Location::Page(url.to_string()));
        Ok(())
    }

    async fn wait_for(&self, ready: &ElementSelector, timeout: Duration) -> Result<(), AppError> {
        let site = self.site();
        if site.has(ready) {
            Ok(())
        } else {
            Err(AppError::timeout(ready.to_string(), timeout))
        }
    }

    async fn click(&self, control: &ElementSelector) -> Result<(), AppError> {
        let mut site = self.site();
        if !site.has(control) {
            return Err(AppError::ElementNotFound(control.to_string()));
        }
        if site.broken_controls.contains(control) {
            return Err(AppError::BrowserError(format!("{control} is not clickable")));
        }
        site.clicks.push(control.to_css());

        let routed = site
            .routes
            .iter()
            .find(|(sel, _)| sel == control)
            .map(|(_, url)| url.clone());
        if let Some(url) = routed {
            site.history.push(Location::Page(url));
        } else if *control == site.next_page
            && let Some(Location::Listing(i)) = site.history.last().cloned()
            && i + 1 < site.listings.len()
        {
            let next = Location::Listing(i + 1);
            if site.next_delay.is_zero() {
                site.history.push(next);
            } else {
                site.pending = Some((Instant::now() + site.next_delay, next));
            }
        }
        Ok(())
    }

    async fn back(&self) -> Result<(), AppError> {
        let mut site = self.site();
        site.backs += 1;
        if let Some(budget) = site.back_budget {
            if budget == 0 {
                return Err(AppError::BrowserError("history is not available".into()));
            }
            site.back_budget = Some(budget - 1);
        }
        if site.history.len() > 1 {
            site.history.pop();
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<String, AppError> {
        Ok(self.site().html())
    }

    async fn current_url(&self) -> Result<String, AppError> {
        {
            let mut site = self.site();
            if let Some(budget) = site.url_budget {
                if budget == 0 {
                    return Err(AppError::BrowserError("target closed".into()));
                }
                site.url_budget = Some(budget - 1);
            }
        }
        Ok(self.current_location())
    }

    async fn scroll_to_bottom(&self) -> Result<(), AppError> {
        self.site().scrolls += 1;
        Ok(())
    }

    async fn fill(&self, field: &ElementSelector, text: &str) -> Result<(), AppError> {
        let mut site = self.site();
        if !site.has(field) {
            return Err(AppError::ElementNotFound(field.to_string()));
        }
        site.fills.push((field.to_css(), text.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory [`PersistenceWriter`] that remembers the size of every write.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<Record>>>,
    totals: Arc<Mutex<Vec<usize>>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            ..Self::default()
        }
    }

    /// Loads fine, every write fails.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    /// Record count after each successful write.
    pub fn write_totals(&self) -> Vec<usize> {
        self.totals.lock().unwrap().clone()
    }
}

impl PersistenceWriter for MemoryStore {
    fn load(&self) -> Result<Vec<Record>, AppError> {
        Ok(self.records())
    }

    fn replace_all(&self, records: &[Record]) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(AppError::StorageError("disk full".into()));
        }
        *self.records.lock().unwrap() = records.to_vec();
        self.totals.lock().unwrap().push(records.len());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Crawl reporter that records event labels.
#[derive(Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl CrawlReporter for RecordingReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        let label = match &event {
            CrawlEvent::Started { .. } => "Started",
            CrawlEvent::PageStarted { .. } => "PageStarted",
            CrawlEvent::ItemSkipped { .. } => "ItemSkipped",
            CrawlEvent::ItemFiltered { .. } => "ItemFiltered",
            CrawlEvent::ItemUnidentified { .. } => "ItemUnidentified",
            CrawlEvent::RecordCollected { .. } => "RecordCollected",
            CrawlEvent::ItemFailed { .. } => "ItemFailed",
            CrawlEvent::PageFlushed { .. } => "PageFlushed",
            CrawlEvent::FlushFailed { .. } => "FlushFailed",
            CrawlEvent::Stopped { .. } => "Stopped",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}
