pub mod crawler;
pub mod document;
pub mod error;
pub mod extractor;
pub mod merge;
pub mod models;
pub mod pacing;
pub mod profile;
pub mod report;
pub mod selector;
pub mod session;
pub mod store;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use crawler::{CrawlSettings, ItemOutcome, ListingCrawler};
pub use document::{Element, HtmlDocumentExtractor};
pub use error::AppError;
pub use extractor::{Extraction, RecordExtractor, SentinelIdentity};
pub use merge::{MergeSummary, merge_records};
pub use models::{Field, NOT_SPECIFIED, Record};
pub use pacing::{Pacer, PacingConfig};
pub use profile::{FieldSelectors, InclusionFilter, LoginProfile, SiteProfile};
pub use report::{CrawlEvent, CrawlReport, CrawlReporter, StopReason, TracingCrawlReporter};
pub use selector::ElementSelector;
pub use session::{Credentials, sign_in};
pub use store::{DeduplicationStore, RevisitPolicy, UpsertOutcome};
pub use traits::{DocumentExtractor, PageNavigator, PersistenceWriter};
