use crate::domain::ports::{BrowserLauncher, BrowserSession};
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};

fn browser_err(context: &str, err: impl std::fmt::Display) -> TrackerError {
    TrackerError::EnrichmentFailure {
        message: format!("{}: {}", context, err),
    }
}

/// Opens headless Chrome sessions through a WebDriver server (chromedriver,
/// selenium, ...).
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    webdriver_url: String,
}

impl WebDriverLauncher {
    pub fn new(webdriver_url: impl Into<String>) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({ "args": ["--headless=new", "--disable-gpu", "--no-sandbox"] }),
        );

        let mut builder = ClientBuilder::native();
        builder.capabilities(caps);
        let client = builder
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| browser_err("webdriver session", e))?;

        tracing::debug!("Opened browser session via {}", self.webdriver_url);
        Ok(Box::new(WebDriverSession { client }))
    }
}

struct WebDriverSession {
    client: Client,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .map_err(|e| browser_err("navigation", e))?;
        self.client
            .wait()
            .for_element(Locator::Css("img"))
            .await
            .map_err(|e| browser_err("waiting for images", e))?;
        Ok(())
    }

    async fn image_sources(&mut self) -> Result<Vec<String>> {
        let elements = self
            .client
            .find_all(Locator::Css("img"))
            .await
            .map_err(|e| browser_err("locating images", e))?;

        let mut sources = Vec::with_capacity(elements.len());
        for element in elements {
            // Stale elements are skipped rather than failing the page.
            if let Ok(Some(src)) = element.attr("src").await {
                sources.push(src);
            }
        }
        Ok(sources)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.client
            .close()
            .await
            .map_err(|e| browser_err("closing session", e))
    }
}
