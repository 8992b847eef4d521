/// Smoke-test for `ChromeNavigator`.
///
/// Launches a headless Chromium, opens <https://example.com>, waits for the
/// heading and follows its only link, then goes back.
///
/// Run with:
///   cargo run -p gleaner-client --example navigator_smoke
use std::time::Duration;

use gleaner_client::{ChromeNavigator, NavigatorOptions};
use gleaner_core::selector::ElementSelector;
use gleaner_core::traits::PageNavigator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Launching headless browser…");
    let nav = ChromeNavigator::launch(NavigatorOptions::default()).await?;

    let url = "https://example.com/";
    nav.navigate(url).await?;
    nav.wait_for(&ElementSelector::tag("h1"), Duration::from_secs(10))
        .await?;
    let html = nav.snapshot().await?;
    assert!(
        html.contains("Example Domain"),
        "Expected heading not found in rendered HTML"
    );

    nav.click(&ElementSelector::tag("a")).await?;
    tokio::time::sleep(Duration::from_secs(2)).await;
    println!("Followed link to {}", nav.current_url().await?);

    nav.back().await?;
    nav.wait_for(&ElementSelector::tag("h1"), Duration::from_secs(10))
        .await?;
    assert_eq!(nav.current_url().await?, url);

    println!("OK: {} bytes of rendered HTML", html.len());
    nav.shutdown().await?;
    Ok(())
}
