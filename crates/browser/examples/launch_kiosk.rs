//! Launch a kiosk browser, print navigation events, and close it again

use browser::{BrowserDriver, BrowserEvent, ChromeDriver, EventSubscriber, LaunchOptions, Task};
use std::sync::Arc;

struct PrintEvents;

impl EventSubscriber for PrintEvents {
    fn name(&self) -> &str {
        "PrintEvents"
    }

    fn on_event(&self, event: &BrowserEvent) {
        println!("{}: {:?}", event.kind(), event);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());

    let driver = ChromeDriver::new(LaunchOptions::kiosk());
    driver.subscribe(Arc::new(PrintEvents));

    driver.launch().await?;
    println!("DevTools at {}", driver.devtools_endpoint().await?.ws_url());

    driver
        .run_tasks(&[Task::navigate(url), Task::disable("Fetch")])
        .await?;

    // Keep alive for a bit to see events
    tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

    driver.close().await?;
    println!("Closed");

    Ok(())
}
