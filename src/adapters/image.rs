//! Illustrative image lookup through a headless browser.
//!
//! The session is acquired per lookup and closed on every exit path. Any
//! navigation or scraping problem degrades to "no image".

use crate::config::ImageSettings;
use crate::domain::ports::{BrowserLauncher, BrowserSession, ImageFinder};
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Query suffix that biases results toward drawings instead of photos.
pub const STYLE_QUALIFIER: &str = "cartoon";

/// Path fragments that usually mean a logo, a joke or a character.
pub const DENYLIST: &[&str] = &[
    "logo", "funny", "humor", "humour", "meme", "joke", "mascot", "character",
];

/// Keeps CDN-hosted, non-denylisted URLs and applies the slot tie-break:
/// one survivor is returned as-is, with two or more the second one wins
/// because the first slot tends to be a site banner.
pub fn select_candidate<I>(sources: I, cdn_domain: &str) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut survivors = sources
        .into_iter()
        .filter(|src| is_acceptable(src, cdn_domain))
        .take(2);

    let first = survivors.next()?;
    Some(survivors.next().unwrap_or(first))
}

fn is_acceptable(src: &str, cdn_domain: &str) -> bool {
    let Ok(url) = Url::parse(src) else {
        return false;
    };

    let on_cdn = url
        .host_str()
        .map(|host| host == cdn_domain || host.ends_with(&format!(".{}", cdn_domain)))
        .unwrap_or(false);
    if !on_cdn {
        return false;
    }

    let tail = format!("{}?{}", url.path(), url.query().unwrap_or("")).to_lowercase();
    !DENYLIST.iter().any(|word| tail.contains(word))
}

pub struct BrowserImageFinder {
    launcher: Arc<dyn BrowserLauncher>,
    settings: ImageSettings,
}

impl BrowserImageFinder {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: ImageSettings) -> Self {
        Self { launcher, settings }
    }

    pub fn search_url(&self, product_name: &str) -> Result<String> {
        let query = format!("{} {}", product_name, STYLE_QUALIFIER);
        let mut url = Url::parse(&self.settings.search_url).map_err(|e| {
            TrackerError::EnrichmentFailure {
                message: format!("bad search url: {}", e),
            }
        })?;
        url.query_pairs_mut().append_pair("q", &query);
        Ok(url.into())
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(self.settings.page_timeout_seconds)
    }

    /// Runs one browser step under the page budget.
    async fn bounded<T, F>(&self, step: &str, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        let budget = self.budget();
        tokio::time::timeout(budget, fut)
            .await
            .map_err(|_| TrackerError::EnrichmentFailure {
                message: format!("{} did not finish within {:?}", step, budget),
            })?
    }

    async fn scrape(&self, session: &mut dyn BrowserSession, url: &str) -> Result<Option<String>> {
        let sources = self
            .bounded("search page render", async {
                session.goto(url).await?;
                session.image_sources().await
            })
            .await?;

        tracing::debug!("Search page yielded {} image elements", sources.len());
        Ok(select_candidate(sources, &self.settings.cdn_domain))
    }

    /// Same as `find_image` but keeps the failure for callers that care.
    pub async fn try_find_image(&self, product_name: &str) -> Result<Option<String>> {
        let url = self.search_url(product_name)?;
        let mut session = self
            .bounded("browser launch", self.launcher.launch())
            .await?;

        let outcome = self.scrape(session.as_mut(), &url).await;

        if let Err(e) = self.bounded("browser close", session.close()).await {
            tracing::warn!("Failed to close browser session: {}", e);
        }
        outcome
    }
}

#[async_trait]
impl ImageFinder for BrowserImageFinder {
    async fn find_image(&self, product_name: &str) -> Option<String> {
        match self.try_find_image(product_name).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                tracing::info!("No usable image found for {}", product_name);
                None
            }
            Err(e) => {
                tracing::warn!("Image enrichment for {} failed: {}", product_name, e);
                None
            }
        }
    }
}

/// Launcher used when the crate is built without a browser backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBrowser;

#[async_trait]
impl BrowserLauncher for NoBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        Err(TrackerError::EnrichmentFailure {
            message: "no browser backend configured".to_string(),
        })
    }
}

/// Finder used when enrichment is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

#[async_trait]
impl ImageFinder for NoImages {
    async fn find_image(&self, _product_name: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CDN: &str = "encrypted-tbn0.gstatic.com";

    fn cdn(path: &str) -> String {
        format!("https://{}/{}", CDN, path)
    }

    #[test]
    fn test_select_single_candidate() {
        let picked = select_candidate(
            vec![cdn("images?q=tbn:milk1"), "https://other.example/milk.png".to_string()],
            CDN,
        );
        assert_eq!(picked, Some(cdn("images?q=tbn:milk1")));
    }

    #[test]
    fn test_select_second_of_many() {
        let picked = select_candidate(
            vec![cdn("images?q=tbn:a"), cdn("images?q=tbn:b"), cdn("images?q=tbn:c")],
            CDN,
        );
        assert_eq!(picked, Some(cdn("images?q=tbn:b")));
    }

    #[test]
    fn test_denylist_and_foreign_hosts_rejected() {
        let picked = select_candidate(
            vec![
                cdn("brand-logo.png"),
                cdn("funny-milk.png"),
                cdn("images/Mascot.png"),
                "https://evil.example/encrypted-tbn0.gstatic.com/x.png".to_string(),
                "data:image/gif;base64,R0lGOD".to_string(),
                "not a url".to_string(),
            ],
            CDN,
        );
        assert_eq!(picked, None);
    }

    struct FakeSession {
        // `None` simulates a page that fails to render.
        sources: Option<Vec<String>>,
        goto_delay: Duration,
        close_delay: Duration,
        closed: Arc<AtomicUsize>,
        visited: Arc<std::sync::Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn goto(&mut self, url: &str) -> Result<()> {
            self.visited.lock().unwrap().push(url.to_string());
            tokio::time::sleep(self.goto_delay).await;
            Ok(())
        }

        async fn image_sources(&mut self) -> Result<Vec<String>> {
            self.sources
                .clone()
                .ok_or_else(|| TrackerError::EnrichmentFailure {
                    message: "render failed".to_string(),
                })
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.close_delay).await;
            Ok(())
        }
    }

    struct FakeLauncher {
        sources: Vec<String>,
        fail_render: bool,
        goto_delay: Duration,
        close_delay: Duration,
        closed: Arc<AtomicUsize>,
        visited: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl FakeLauncher {
        fn new(sources: Vec<String>, fail_render: bool) -> Self {
            Self {
                sources,
                fail_render,
                goto_delay: Duration::ZERO,
                close_delay: Duration::ZERO,
                closed: Arc::new(AtomicUsize::new(0)),
                visited: Arc::new(std::sync::Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
            Ok(Box::new(FakeSession {
                sources: (!self.fail_render).then(|| self.sources.clone()),
                goto_delay: self.goto_delay,
                close_delay: self.close_delay,
                closed: self.closed.clone(),
                visited: self.visited.clone(),
            }))
        }
    }

    fn settings() -> ImageSettings {
        ImageSettings {
            cdn_domain: CDN.to_string(),
            ..ImageSettings::default()
        }
    }

    #[tokio::test]
    async fn test_finder_returns_candidate_and_closes_session() {
        let launcher = Arc::new(FakeLauncher::new(vec![cdn("images?q=tbn:bread")], false));
        let finder = BrowserImageFinder::new(launcher.clone(), settings());

        let url = finder.find_image("Bread").await;

        assert_eq!(url, Some(cdn("images?q=tbn:bread")));
        assert_eq!(launcher.closed.load(Ordering::SeqCst), 1);
        let visited = launcher.visited.lock().unwrap().clone();
        assert_eq!(visited.len(), 1);
        assert!(visited[0].contains("q=Bread+cartoon"));
    }

    #[tokio::test]
    async fn test_finder_closes_session_when_empty() {
        let launcher = Arc::new(FakeLauncher::new(vec![], false));
        let finder = BrowserImageFinder::new(launcher.clone(), settings());

        assert_eq!(finder.find_image("Bread").await, None);
        assert_eq!(launcher.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_finder_closes_session_on_render_failure() {
        let launcher = Arc::new(FakeLauncher::new(vec![], true));
        let finder = BrowserImageFinder::new(launcher.clone(), settings());

        assert_eq!(finder.find_image("Bread").await, None);
        assert_eq!(launcher.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_that_never_renders_times_out_and_closes() {
        let launcher = Arc::new(FakeLauncher {
            goto_delay: Duration::from_secs(3600),
            ..FakeLauncher::new(vec![cdn("images?q=tbn:bread")], false)
        });
        let finder = BrowserImageFinder::new(launcher.clone(), settings());

        let started = tokio::time::Instant::now();
        let err = finder.try_find_image("Bread").await.unwrap_err();

        assert!(matches!(err, TrackerError::EnrichmentFailure { .. }));
        assert_eq!(launcher.closed.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(3600));
        assert_eq!(finder.find_image("Bread").await, None);
        assert_eq!(launcher.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_close_does_not_lose_the_image() {
        let launcher = Arc::new(FakeLauncher {
            close_delay: Duration::from_secs(3600),
            ..FakeLauncher::new(vec![cdn("images?q=tbn:bread")], false)
        });
        let finder = BrowserImageFinder::new(launcher.clone(), settings());

        assert_eq!(finder.find_image("Bread").await, Some(cdn("images?q=tbn:bread")));
        assert_eq!(launcher.closed.load(Ordering::SeqCst), 1);
    }

    /// WebDriver that accepts the connection and then never answers.
    struct StalledLauncher;

    #[async_trait]
    impl BrowserLauncher for StalledLauncher {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_launch_times_out() {
        let finder = BrowserImageFinder::new(Arc::new(StalledLauncher), settings());

        let err = finder.try_find_image("Bread").await.unwrap_err();

        assert!(matches!(
            err,
            TrackerError::EnrichmentFailure { ref message } if message.contains("launch")
        ));
    }

    #[tokio::test]
    async fn test_missing_browser_degrades_to_absent() {
        let finder = BrowserImageFinder::new(Arc::new(NoBrowser), settings());
        assert_eq!(finder.find_image("Bread").await, None);
        assert!(finder.try_find_image("Bread").await.is_err());
    }
}
