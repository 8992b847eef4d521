use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use gleaner_core::error::AppError;
use gleaner_core::selector::ElementSelector;
use gleaner_core::traits::PageNavigator;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// How often `wait_for` re-checks the page.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launch options for [`ChromeNavigator`].
#[derive(Debug, Clone)]
pub struct NavigatorOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// Profile directory to reuse, e.g. one holding an existing session.
    pub user_data_dir: Option<PathBuf>,
    /// Explicit Chrome/Chromium binary. Falls back to [`find_chrome_binary`].
    pub chrome_bin: Option<PathBuf>,
    /// Bound on a single page load.
    pub navigation_timeout: Duration,
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        Self {
            headless: true,
            user_data_dir: None,
            chrome_bin: None,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

/// [`PageNavigator`] driving one Chromium tab over the DevTools Protocol.
///
/// Clones share the browser process and the tab. The crawl is sequential, so
/// nothing coordinates concurrent use of the tab.
#[derive(Clone)]
pub struct ChromeNavigator {
    browser: Arc<Mutex<Browser>>,
    page: Page,
    navigation_timeout: Duration,
}

impl ChromeNavigator {
    /// Launch Chromium and open a blank tab.
    pub async fn launch(options: NavigatorOptions) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args();

        // Snap-packaged Chromium ships a wrapper that drops standard CLI
        // flags, so look for the real binary before chromiumoxide's lookup.
        if let Some(bin) = options.chrome_bin.clone().or_else(find_chrome_binary) {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }
        if let Some(dir) = &options.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        if options.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head().window_size(1280, 900);
        }

        let config = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to open a tab: {e}")))?;

        tracing::info!(headless = options.headless, "Browser ready");
        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            page,
            navigation_timeout: options.navigation_timeout,
        })
    }

    /// Close the browser. Other clones become unusable.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to close browser: {e}")))?;
        let _ = browser.wait().await;
        Ok(())
    }

    async fn element(&self, selector: &ElementSelector) -> Result<chromiumoxide::Element, AppError> {
        self.page
            .find_element(selector.to_css())
            .await
            .map_err(|e| AppError::ElementNotFound(format!("{selector}: {e}")))
    }

    async fn run_script(&self, script: &str) -> Result<(), AppError> {
        self.page
            .evaluate(script)
            .await
            .map(|_| ())
            .map_err(|e| AppError::BrowserError(format!("Script failed: {e}")))
    }
}

impl PageNavigator for ChromeNavigator {
    async fn navigate(&self, url: &str) -> Result<(), AppError> {
        tracing::debug!(%url, "Navigating");
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::BrowserError(format!(
                "Failed to navigate to {url}: {e}"
            ))),
            Err(_) => Err(AppError::timeout(url, self.navigation_timeout)),
        }
    }

    async fn wait_for(&self, ready: &ElementSelector, timeout: Duration) -> Result<(), AppError> {
        let css = ready.to_css();
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(css.as_str()).await.is_ok() {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(AppError::timeout(css, timeout));
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn click(&self, control: &ElementSelector) -> Result<(), AppError> {
        let element = self.element(control).await?;
        element
            .click()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to click {control}: {e}")))?;
        Ok(())
    }

    async fn back(&self) -> Result<(), AppError> {
        self.run_script("window.history.back()").await?;
        match tokio::time::timeout(self.navigation_timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::BrowserError(format!("Failed to go back: {e}"))),
            // Same-document history entries never fire a load; the caller's
            // readiness wait settles those.
            Err(_) => {
                tracing::debug!("No navigation after history.back()");
                Ok(())
            }
        }
    }

    async fn snapshot(&self) -> Result<String, AppError> {
        self.page
            .content()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to read page content: {e}")))
    }

    async fn current_url(&self) -> Result<String, AppError> {
        self.page
            .url()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to read page URL: {e}")))?
            .ok_or_else(|| AppError::BrowserError("Page has no URL".into()))
    }

    async fn scroll_to_bottom(&self) -> Result<(), AppError> {
        self.run_script("window.scrollTo(0, document.body.scrollHeight)")
            .await
    }

    async fn fill(&self, field: &ElementSelector, text: &str) -> Result<(), AppError> {
        let element = self.element(field).await?;
        element
            .click()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to focus {field}: {e}")))?
            .type_str(text)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to type into {field}: {e}")))?;
        Ok(())
    }
}

/// Locate a real Chrome/Chromium binary.
///
/// `CHROME_BIN` wins when it points at an existing file. Otherwise the snap
/// payload is tried first (its `/snap/bin` wrapper strips headless flags),
/// then well-known system paths. `None` leaves the lookup to chromiumoxide.
pub fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    const CANDIDATES: &[&str] = &[
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];
    CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
}
