//! Replay renderer backed by saved HTML pages.
//!
//! Pages are keyed by check-in date and matched against the `checkin=`
//! query parameter of the navigated URL. Each date holds a script of
//! navigation steps; the last step repeats once the script is exhausted,
//! so a single `Timeout` step means "always times out".
//!
//! Documents are parsed with `scraper` on every query. Element handles keep
//! only their child-index path from the document root, which keeps them
//! `Send` and lets scoped queries re-resolve the element in a fresh parse.

use super::{BrowserPage, PageElement, PageRenderer};
use crate::error::{NavigationError, PageError, ScanResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One scripted navigation result.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotStep {
    /// Load succeeds with this document.
    Html(String),
    /// Load exceeds the caller's timeout.
    Timeout,
    /// Load fails with this message.
    Fail(String),
}

/// Everything the renderer observed, for assertions and replay diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotLog {
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub pages_opened: usize,
    pub pages_closed: usize,
    pub shutdowns: usize,
}

type Routes = Arc<Mutex<HashMap<NaiveDate, VecDeque<SnapshotStep>>>>;
type SharedLog = Arc<Mutex<SnapshotLog>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Renderer that serves saved pages instead of driving a browser.
#[derive(Debug, Clone, Default)]
pub struct SnapshotRenderer {
    routes: Routes,
    log: SharedLog,
}

impl SnapshotRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for every navigation to `check_in`.
    pub fn page(self, check_in: NaiveDate, html: impl Into<String>) -> Self {
        self.script(check_in, vec![SnapshotStep::Html(html.into())])
    }

    /// Serve `steps` in order for navigations to `check_in`.
    pub fn script(self, check_in: NaiveDate, steps: Vec<SnapshotStep>) -> Self {
        lock(&self.routes).insert(check_in, steps.into());
        self
    }

    /// Load every `<YYYY-MM-DD>.html` file in `dir`. Other files are ignored.
    pub fn from_dir(dir: impl AsRef<Path>) -> ScanResult<Self> {
        let mut renderer = Self::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let date = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
            match date {
                Some(date) => {
                    let html = std::fs::read_to_string(&path)?;
                    renderer = renderer.page(date, html);
                }
                None => tracing::debug!("skipping snapshot file {}", path.display()),
            }
        }
        Ok(renderer)
    }

    /// Dates that have a snapshot, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<_> = lock(&self.routes).keys().copied().collect();
        dates.sort();
        dates
    }

    pub fn log(&self) -> SnapshotLog {
        lock(&self.log).clone()
    }
}

#[async_trait]
impl PageRenderer for SnapshotRenderer {
    async fn open_page(&self) -> anyhow::Result<Box<dyn BrowserPage>> {
        lock(&self.log).pages_opened += 1;
        Ok(Box::new(SnapshotPage {
            routes: Arc::clone(&self.routes),
            log: Arc::clone(&self.log),
            document: None,
        }))
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        lock(&self.log).shutdowns += 1;
        Ok(())
    }
}

/// Extract the `checkin` query parameter from a URL.
fn check_in_of(url: &str) -> Option<NaiveDate> {
    let parsed = url::Url::parse(url).ok()?;
    let value = parsed
        .query_pairs()
        .find(|(k, _)| k == "checkin")
        .map(|(_, v)| v.into_owned())?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").ok()
}

/// A replay page holding the most recently loaded document.
pub struct SnapshotPage {
    routes: Routes,
    log: SharedLog,
    document: Option<Arc<String>>,
}

impl SnapshotPage {
    fn next_step(&self, url: &str) -> Option<SnapshotStep> {
        let date = check_in_of(url)?;
        let mut routes = lock(&self.routes);
        let steps = routes.get_mut(&date)?;
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }

    fn document(&self) -> Result<&Arc<String>, PageError> {
        self.document.as_ref().ok_or(PageError::NotLoaded)
    }
}

#[async_trait]
impl BrowserPage for SnapshotPage {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), NavigationError> {
        lock(&self.log).navigations.push(url.to_string());
        self.document = None;
        match self.next_step(url) {
            Some(SnapshotStep::Html(html)) => {
                self.document = Some(Arc::new(html));
                Ok(())
            }
            Some(SnapshotStep::Timeout) => Err(NavigationError::Timeout { timeout_ms }),
            Some(SnapshotStep::Fail(message)) => Err(NavigationError::Failed(message)),
            None => Err(NavigationError::Failed(format!("no snapshot for {url}"))),
        }
    }

    async fn body_text(&self) -> Result<String, PageError> {
        let html = Html::parse_document(self.document()?);
        let body = Selector::parse("body")
            .ok()
            .and_then(|body| html.select(&body).next())
            .unwrap_or_else(|| html.root_element());
        Ok(normalized_text(body))
    }

    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, PageError> {
        let document = Arc::clone(self.document()?);
        let found = select(&document, None, selector)?;
        Ok(into_elements(found, &document, &self.log))
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        lock(&self.log).pages_closed += 1;
        Ok(())
    }
}

/// A matched element: its location plus the data read at query time.
struct Found {
    path: Vec<usize>,
    text: String,
    visible: bool,
    markup: String,
}

pub struct SnapshotElement {
    document: Arc<String>,
    path: Vec<usize>,
    text: String,
    visible: bool,
    markup: String,
    log: SharedLog,
}

fn into_elements(
    found: Vec<Found>,
    document: &Arc<String>,
    log: &SharedLog,
) -> Vec<Box<dyn PageElement>> {
    found
        .into_iter()
        .map(|f| {
            Box::new(SnapshotElement {
                document: Arc::clone(document),
                path: f.path,
                text: f.text,
                visible: f.visible,
                markup: f.markup,
                log: Arc::clone(log),
            }) as Box<dyn PageElement>
        })
        .collect()
}

#[async_trait]
impl PageElement for SnapshotElement {
    async fn text(&self) -> Result<String, PageError> {
        Ok(self.text.clone())
    }

    async fn is_visible(&self, _timeout_ms: u64) -> bool {
        self.visible
    }

    async fn click(&self) -> Result<(), PageError> {
        lock(&self.log).clicks.push(self.markup.clone());
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, PageError> {
        let found = select(&self.document, Some(&self.path), selector)?;
        Ok(into_elements(found, &self.document, &self.log))
    }
}

fn select(
    document: &str,
    scope: Option<&[usize]>,
    selector: &str,
) -> Result<Vec<Found>, PageError> {
    let parsed = Selector::parse(selector).map_err(|e| PageError::Selector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })?;
    let html = Html::parse_document(document);
    let found = match scope {
        None => html.select(&parsed).map(describe).collect(),
        Some(path) => resolve(&html, path)
            .ok_or_else(|| PageError::Query("element no longer in document".to_string()))?
            .select(&parsed)
            .map(describe)
            .collect(),
    };
    Ok(found)
}

fn describe(element: ElementRef<'_>) -> Found {
    let visible =
        !is_hidden(element) && !element.ancestors().filter_map(ElementRef::wrap).any(is_hidden);
    Found {
        path: node_path(element),
        text: normalized_text(element),
        visible,
        markup: element.html(),
    }
}

/// Elements whose text never renders.
const NON_RENDERED: [&str; 4] = ["script", "style", "noscript", "template"];

/// Rendered text with whitespace collapsed, skipping non-rendered subtrees.
fn normalized_text(element: ElementRef<'_>) -> String {
    let mut words = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let rendered = !node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| NON_RENDERED.contains(&a.value().name()));
        if rendered {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("hidden").is_some()
        || value
            .attr("style")
            .map(|s| s.replace(' ', "").contains("display:none"))
            .unwrap_or(false)
}

/// Child indices from the document root down to `element`.
fn node_path(element: ElementRef<'_>) -> Vec<usize> {
    let mut path = Vec::new();
    let mut node = *element;
    while let Some(parent) = node.parent() {
        path.push(node.prev_siblings().count());
        node = parent;
    }
    path.reverse();
    path
}

fn resolve<'a>(html: &'a Html, path: &[usize]) -> Option<ElementRef<'a>> {
    let mut node = html.tree.root();
    for &index in path {
        node = node.children().nth(index)?;
    }
    ElementRef::wrap(node)
}
