//! Best-effort dismissal of consent banners and overlays.

use crate::events::{EventSink, ScanEvent};
use crate::renderer::BrowserPage;

/// Default time to wait for a consent button to become visible.
pub const DEFAULT_VISIBILITY_TIMEOUT_MS: u64 = 1_000;

/// Clicks the first visible consent button from an ordered selector list.
#[derive(Debug, Clone)]
pub struct PopupDismisser {
    selectors: Vec<String>,
    visibility_timeout_ms: u64,
}

impl PopupDismisser {
    pub fn new(selectors: Vec<String>, visibility_timeout_ms: u64) -> Self {
        Self {
            selectors,
            visibility_timeout_ms,
        }
    }

    /// Try each selector in order and click the first visible match.
    ///
    /// At most one click per call. Never fails: query and click errors are
    /// reported to `sink` and the page is left as it is. Returns the selector
    /// that was clicked, if any.
    pub async fn dismiss(&self, page: &dyn BrowserPage, sink: &dyn EventSink) -> Option<String> {
        for selector in &self.selectors {
            let element = match page.query(selector).await {
                Ok(found) => match found.into_iter().next() {
                    Some(element) => element,
                    None => continue,
                },
                Err(e) => {
                    sink.emit(ScanEvent::PopupProbeFailed {
                        selector: selector.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if !element.is_visible(self.visibility_timeout_ms).await {
                continue;
            }

            match element.click().await {
                Ok(()) => sink.emit(ScanEvent::PopupDismissed {
                    selector: selector.clone(),
                }),
                Err(e) => sink.emit(ScanEvent::PopupProbeFailed {
                    selector: selector.clone(),
                    error: e.to_string(),
                }),
            }
            // One dismissal action per page load, whether or not the click landed.
            return Some(selector.clone());
        }
        None
    }
}
