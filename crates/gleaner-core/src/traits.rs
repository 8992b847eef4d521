use std::future::Future;
use std::time::Duration;

use crate::document::Element;
use crate::error::AppError;
use crate::merge::{MergeSummary, merge_records};
use crate::models::Record;
use crate::selector::ElementSelector;
use crate::store::DeduplicationStore;

/// Drives a single browser page.
///
/// Every operation blocks until it completes or fails; waits are bounded by
/// the timeout the caller passes in. Implementations report a missing element
/// as [`AppError::ElementNotFound`] and an expired wait as
/// [`AppError::NavigationTimeout`].
pub trait PageNavigator: Send + Sync + Clone {
    /// Load `url` in the current page.
    fn navigate(&self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Wait until an element matching `ready` is present.
    fn wait_for(
        &self,
        ready: &ElementSelector,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Click the first element matching `control`.
    fn click(&self, control: &ElementSelector) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Go one step back in the page history.
    fn back(&self) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Raw markup of the page as currently rendered.
    fn snapshot(&self) -> impl Future<Output = Result<String, AppError>> + Send;

    fn current_url(&self) -> impl Future<Output = Result<String, AppError>> + Send;

    fn scroll_to_bottom(&self) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Focus the first element matching `field` and type `text` into it.
    fn fill(
        &self,
        field: &ElementSelector,
        text: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Turns a raw page snapshot into a queryable document.
pub trait DocumentExtractor: Send + Sync + Clone {
    type Document;

    fn parse(&self, raw: &str) -> Result<Self::Document, AppError>;

    /// First element matching `selector`, in document order.
    fn find(
        &self,
        document: &Self::Document,
        selector: &ElementSelector,
    ) -> Result<Option<Element>, AppError>;

    /// Every element matching `selector`, in document order.
    fn find_all(
        &self,
        document: &Self::Document,
        selector: &ElementSelector,
    ) -> Result<Vec<Element>, AppError>;

    /// Search inside a previously matched element only.
    fn find_within(
        &self,
        element: &Element,
        selector: &ElementSelector,
    ) -> Result<Option<Element>, AppError> {
        let fragment = self.parse(&element.standalone_html())?;
        self.find(&fragment, selector)
    }
}

/// Durable storage for harvested records.
///
/// Implementors supply whole-set `load` and `replace_all`; [`merge`] is the
/// reconciliation every flush goes through.
///
/// [`merge`]: PersistenceWriter::merge
pub trait PersistenceWriter: Send + Sync {
    /// Read every stored record. Storage that does not exist yet is empty.
    fn load(&self) -> Result<Vec<Record>, AppError>;

    /// Replace the stored set with `records`. A concurrent reader must see
    /// either the old set or the new one, never a mix.
    fn replace_all(&self, records: &[Record]) -> Result<(), AppError>;

    /// Reconcile `store` with what is on disk and write the result back.
    fn merge(&self, store: &DeduplicationStore) -> Result<MergeSummary, AppError> {
        let existing = self.load()?;
        let (merged, summary) = merge_records(existing, store);
        self.replace_all(&merged)?;
        Ok(summary)
    }
}
