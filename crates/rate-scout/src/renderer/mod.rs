//! Renderer abstraction for browser-based page loading.
//!
//! Defines the `PageRenderer`, `BrowserPage` and `PageElement` traits that
//! abstract over the browser engine (Chromium via chromiumoxide, or saved
//! HTML snapshots for replay and tests).

pub mod chromium;
pub mod snapshot;

use async_trait::async_trait;

use crate::error::{NavigationError, PageError};

/// A browser engine that hands out pages.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Open a new page (tab). The scanner opens exactly one per run.
    async fn open_page(&self) -> anyhow::Result<Box<dyn BrowserPage>>;
    /// Shut down the engine.
    async fn shutdown(&self) -> anyhow::Result<()>;
}

/// A single page that can be navigated and queried.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate to `url`, failing with `Timeout` if loading exceeds `timeout_ms`.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), NavigationError>;
    /// Rendered text of the document body.
    async fn body_text(&self) -> Result<String, PageError>;
    /// All elements matching `selector`, in document order.
    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, PageError>;
    /// Close the page.
    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

/// A handle to one element of a loaded page.
#[async_trait]
pub trait PageElement: Send + Sync {
    /// Rendered text of the element.
    async fn text(&self) -> Result<String, PageError>;
    /// Whether the element becomes visible within `timeout_ms`.
    async fn is_visible(&self, timeout_ms: u64) -> bool;
    /// Click the element.
    async fn click(&self) -> Result<(), PageError>;
    /// Descendants of this element matching `selector`, in document order.
    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, PageError>;
}

/// Text of the first element matching `selector` under `scope`, if any.
pub async fn first_text(
    scope: &dyn PageElement,
    selector: &str,
) -> Result<Option<String>, PageError> {
    match scope.query(selector).await?.into_iter().next() {
        Some(element) => Ok(Some(element.text().await?)),
        None => Ok(None),
    }
}
