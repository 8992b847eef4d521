use thiserror::Error;

/// Application-wide error types for Gleaner.
#[derive(Error, Debug)]
pub enum AppError {
    /// A readiness condition did not hold before the wait expired.
    #[error("Timed out after {timeout_ms} ms waiting for {target}")]
    NavigationTimeout { target: String, timeout_ms: u64 },

    /// An expected element or control is absent from the page.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The page has an unexpected structure (bad link, unparsable markup).
    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    /// The crawler lost its position on the listing and cannot paginate safely.
    #[error("Fatal navigation error: {0}")]
    FatalNavigation(String),

    /// The browser or its DevTools connection failed.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// Durable storage could not be read or written.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Invalid site profile or settings.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn timeout(target: impl Into<String>, timeout: std::time::Duration) -> Self {
        AppError::NavigationTimeout {
            target: target.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Returns true if the crawler may contain this error to the current item
    /// and carry on with the next one.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::NavigationTimeout { .. }
                | AppError::ElementNotFound(_)
                | AppError::ExtractionFailure(_)
                | AppError::BrowserError(_)
        )
    }

    /// Returns true if this error means a control or readiness condition is
    /// simply not there, as opposed to the browser misbehaving.
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            AppError::NavigationTimeout { .. } | AppError::ElementNotFound(_)
        )
    }
}
