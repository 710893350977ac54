//! Chromium-based renderer using chromiumoxide.

use super::{BrowserPage, PageElement, PageRenderer};
use crate::error::{NavigationError, PageError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

const VISIBILITY_POLL: Duration = Duration::from_millis(100);

/// Returns true when the element has a non-empty box and is not hidden by style.
const IS_VISIBLE_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; \
}";

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. RATE_SCOUT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("RATE_SCOUT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.rate-scout/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".rate-scout/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".rate-scout/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".rate-scout/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".rate-scout/chromium/chrome-linux64/chrome"),
                home.join(".rate-scout/chromium/chrome"),
            ]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    ["google-chrome", "chromium", "chromium-browser"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Headless Chromium shared by every page of a run.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn launch() -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--lang=en-US")
            .arg(format!("--user-agent={USER_AGENT}"));
        if let Some(path) = find_chromium() {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error: {e}");
                }
            }
        });

        tracing::debug!("Chromium launched");
        Ok(Self {
            browser: Mutex::new(browser),
            handler,
        })
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn shutdown(&self) -> Result<()> {
        let result = self.browser.lock().await.close().await;
        self.handler.abort();
        result.map(|_| ()).context("failed to close Chromium")
    }
}

/// A single Chromium tab.
pub struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), NavigationError> {
        let start = Instant::now();
        let page = &self.page;
        let load = async move {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), load).await {
            Ok(Ok(())) => {
                tracing::debug!(url, load_ms = start.elapsed().as_millis() as u64, "page loaded");
                Ok(())
            }
            Ok(Err(e)) => Err(NavigationError::Failed(e.to_string())),
            Err(_) => Err(NavigationError::Timeout { timeout_ms }),
        }
    }

    async fn body_text(&self) -> Result<String, PageError> {
        let result = self
            .page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(|e| PageError::Query(e.to_string()))?;

        result
            .into_value::<String>()
            .map_err(|e| PageError::Query(format!("failed to convert body text: {e:?}")))
    }

    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, PageError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| PageError::Query(format!("{selector}: {e}")))?;
        Ok(wrap(elements))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.page.close().await.context("failed to close page")
    }
}

fn wrap(elements: Vec<Element>) -> Vec<Box<dyn PageElement>> {
    elements
        .into_iter()
        .map(|element| Box::new(ChromiumElement { element }) as Box<dyn PageElement>)
        .collect()
}

/// One DOM element on a Chromium page.
pub struct ChromiumElement {
    element: Element,
}

impl ChromiumElement {
    async fn visible_now(&self) -> bool {
        match self.element.call_js_fn(IS_VISIBLE_JS, false).await {
            Ok(ret) => ret
                .result
                .value
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl PageElement for ChromiumElement {
    async fn text(&self) -> Result<String, PageError> {
        let text = self
            .element
            .inner_text()
            .await
            .map_err(|e| PageError::Query(e.to_string()))?;
        Ok(text.unwrap_or_default())
    }

    async fn is_visible(&self, timeout_ms: u64) -> bool {
        let poll = async {
            loop {
                if self.visible_now().await {
                    return;
                }
                tokio::time::sleep(VISIBILITY_POLL).await;
            }
        };
        tokio::time::timeout(Duration::from_millis(timeout_ms), poll)
            .await
            .is_ok()
    }

    async fn click(&self) -> Result<(), PageError> {
        self.element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| PageError::Interaction(e.to_string()))
    }

    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, PageError> {
        let elements = self
            .element
            .find_elements(selector)
            .await
            .map_err(|e| PageError::Query(format!("{selector}: {e}")))?;
        Ok(wrap(elements))
    }
}
