//! Sign-in before a crawl.
//!
//! The crawler itself assumes an established session; this is the optional
//! setup step the entry point runs first.

use std::fmt;
use std::time::Duration;

use crate::error::AppError;
use crate::profile::LoginProfile;
use crate::traits::PageNavigator;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read `GLEANER_EMAIL` and `GLEANER_PASSWORD`; `None` unless both are set.
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("GLEANER_EMAIL").ok()?;
        let password = std::env::var("GLEANER_PASSWORD").ok()?;
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self::new(username, password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fill and submit the sign-in form described by `login`.
///
/// `step_timeout` bounds each form step; `ready_timeout` bounds the final wait
/// for the signed-in page, which may include a human solving a challenge in a
/// headed browser.
pub async fn sign_in<N: PageNavigator>(
    navigator: &N,
    login: &LoginProfile,
    credentials: &Credentials,
    step_timeout: Duration,
    ready_timeout: Duration,
) -> Result<(), AppError> {
    tracing::info!(url = %login.url, "Signing in");
    navigator.navigate(&login.url).await?;

    if let Some(open) = &login.open_control {
        navigator.wait_for(open, step_timeout).await?;
        navigator.click(open).await?;
    }

    navigator
        .wait_for(&login.username_field, step_timeout)
        .await?;
    navigator
        .fill(&login.username_field, &credentials.username)
        .await?;
    navigator
        .wait_for(&login.password_field, step_timeout)
        .await?;
    navigator
        .fill(&login.password_field, &credentials.password)
        .await?;
    navigator.click(&login.submit).await?;

    navigator.wait_for(&login.ready, ready_timeout).await?;
    tracing::info!(user = %credentials.username, "Signed in");
    Ok(())
}
