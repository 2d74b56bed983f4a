//! Browser capability seam.
//!
//! The loop only ever talks to [`BrowserCapability`]; the concrete engine
//! lives behind it. [`StaticBrowser`] is the deterministic in-memory
//! implementation used by tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

/// Where the browser currently is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLocation {
    pub url: String,
    pub title: Option<String>,
}

/// Text pulled from the current page, with its character count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub characters: usize,
}

/// A browser instance owned by exactly one run.
///
/// `extract_text` and `dom_snapshot` fail with [`AgentError::InvalidState`]
/// before any navigation. `close` is idempotent and releases all resources;
/// the owning run calls it exactly once on both success and failure paths.
#[async_trait]
pub trait BrowserCapability: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<PageLocation, AgentError>;

    async fn extract_text(
        &self,
        selector: Option<&str>,
        max_characters: Option<u32>,
    ) -> Result<ExtractedText, AgentError>;

    async fn dom_snapshot(&self) -> Result<String, AgentError>;

    async fn close(&self) -> Result<(), AgentError>;
}

/// Opens a fresh [`BrowserCapability`] per run, so nested research sub-tasks
/// never share an instance with their parent.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn BrowserCapability>, AgentError>;
}

#[derive(Debug, Clone)]
struct StaticPage {
    title: Option<String>,
    text: String,
    html: String,
}

/// In-memory browser over a fixed set of pages.
#[derive(Debug, Default)]
pub struct StaticBrowser {
    pages: HashMap<String, StaticPage>,
    current: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl StaticBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page the browser can navigate to.
    pub fn with_page(mut self, url: &str, title: &str, text: &str) -> Self {
        let html = format!(
            "<html><head><title>{title}</title></head><body><p>{text}</p></body></html>"
        );
        self.pages.insert(
            url.to_string(),
            StaticPage {
                title: Some(title.to_string()),
                text: text.to_string(),
                html,
            },
        );
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn guard_open(&self) -> Result<(), AgentError> {
        if self.is_closed() {
            return Err(AgentError::invalid_state("browser already closed"));
        }
        Ok(())
    }

    fn current_page(&self) -> Result<StaticPage, AgentError> {
        let current = self.current.lock();
        let url = current
            .as_ref()
            .ok_or_else(|| AgentError::invalid_state("no page has been navigated yet"))?;
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AgentError::invalid_state("current page disappeared"))
    }
}

#[async_trait]
impl BrowserCapability for StaticBrowser {
    async fn navigate(&self, url: &str) -> Result<PageLocation, AgentError> {
        self.guard_open()?;
        let page = self
            .pages
            .get(url)
            .ok_or_else(|| AgentError::execution(format!("no such page: {url}")))?;
        *self.current.lock() = Some(url.to_string());
        Ok(PageLocation {
            url: url.to_string(),
            title: page.title.clone(),
        })
    }

    async fn extract_text(
        &self,
        selector: Option<&str>,
        max_characters: Option<u32>,
    ) -> Result<ExtractedText, AgentError> {
        self.guard_open()?;
        let page = self.current_page()?;
        // Selectors are not interpreted by the static engine.
        let _ = selector;
        let mut text = page.text;
        if let Some(budget) = max_characters {
            text = truncate_text(&text, budget as usize);
        }
        let characters = text.chars().count();
        Ok(ExtractedText { text, characters })
    }

    async fn dom_snapshot(&self) -> Result<String, AgentError> {
        self.guard_open()?;
        Ok(self.current_page()?.html)
    }

    async fn close(&self) -> Result<(), AgentError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn truncate_text(text: &str, budget: usize) -> String {
    text.chars().take(budget).collect()
}
