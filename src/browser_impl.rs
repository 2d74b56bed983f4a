//! Fetch-based browser capability.
//!
//! A full DOM engine is deliberately out of scope: `FetchBrowser` issues a
//! plain GET, keeps the raw HTML as the "page", and derives the title and
//! visible text from it. CSS selectors need a real engine and are logged and
//! ignored here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use tracing::{debug, info};

use agent_core::{
    AgentError, BrowserCapability, BrowserProvider, ExtractedText, PageLocation,
};

#[derive(Debug, Clone)]
struct LoadedPage {
    url: String,
    html: String,
}

pub struct FetchBrowser {
    client: Client,
    current: Mutex<Option<LoadedPage>>,
    closed: AtomicBool,
}

impl FetchBrowser {
    pub fn new(navigation_timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(navigation_timeout)
            .user_agent(concat!("webscout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AgentError::execution(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            current: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    fn guard_open(&self) -> Result<(), AgentError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AgentError::invalid_state("browser already closed"));
        }
        Ok(())
    }

    fn current_page(&self) -> Result<LoadedPage, AgentError> {
        self.current
            .lock()
            .clone()
            .ok_or_else(|| AgentError::invalid_state("no page has been navigated yet"))
    }
}

#[async_trait]
impl BrowserCapability for FetchBrowser {
    async fn navigate(&self, url: &str) -> Result<PageLocation, AgentError> {
        self.guard_open()?;
        debug!(url, "fetching page");
        let response = self.client.get(url).send().await.map_err(|err| {
            if err.is_timeout() {
                AgentError::timeout(format!("navigation to {url}"))
            } else {
                AgentError::execution(format!("navigation to {url} failed: {err}"))
            }
        })?;
        if !response.status().is_success() {
            return Err(AgentError::execution(format!(
                "navigation to {url} returned {}",
                response.status()
            )));
        }
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|err| AgentError::execution(format!("reading page body failed: {err}")))?;
        let title = page_title(&html);
        *self.current.lock() = Some(LoadedPage {
            url: final_url.clone(),
            html,
        });
        info!(url = %final_url, "page loaded");
        Ok(PageLocation {
            url: final_url,
            title,
        })
    }

    async fn extract_text(
        &self,
        selector: Option<&str>,
        max_characters: Option<u32>,
    ) -> Result<ExtractedText, AgentError> {
        self.guard_open()?;
        let page = self.current_page()?;
        if let Some(selector) = selector {
            debug!(selector, "selector scoping unsupported by fetch engine; extracting full page");
        }
        let mut text = visible_text(&page.html);
        if let Some(budget) = max_characters {
            text = text.chars().take(budget as usize).collect();
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
        self.current.lock().take();
        Ok(())
    }
}

/// Opens one [`FetchBrowser`] per run.
pub struct FetchBrowserProvider {
    navigation_timeout: Duration,
}

impl FetchBrowserProvider {
    pub fn new(navigation_timeout: Duration) -> Self {
        Self { navigation_timeout }
    }
}

#[async_trait]
impl BrowserProvider for FetchBrowserProvider {
    async fn open(&self) -> Result<Arc<dyn BrowserCapability>, AgentError> {
        Ok(Arc::new(FetchBrowser::new(self.navigation_timeout)?))
    }
}

fn page_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let start = lower.find("<title")?;
    let open_end = html[start..].find('>')? + start + 1;
    let close = lower[open_end..].find("</title>")? + open_end;
    let title = html[open_end..close].trim();
    if title.is_empty() {
        None
    } else {
        Some(decode_entities(title))
    }
}

/// Strip tags, drop script/style contents, and collapse whitespace.
fn visible_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 4);
    let mut in_tag = false;
    let mut skip_until: Option<&str> = None;

    for (idx, ch) in html.char_indices() {
        if let Some(closer) = skip_until {
            if starts_with_ignore_case(&html[idx..], closer) {
                skip_until = None;
                // Re-enter normal scanning at the closing tag's '<'.
                in_tag = true;
            }
            continue;
        }
        match ch {
            '<' => {
                let rest = &html[idx..];
                if starts_with_ignore_case(rest, "<script") {
                    skip_until = Some("</script>");
                } else if starts_with_ignore_case(rest, "<style") {
                    skip_until = Some("</style>");
                } else {
                    in_tag = true;
                }
            }
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    decode_entities(&out)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn starts_with_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .get(..needle.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(needle))
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Example &amp; Co</title>
        <style>body { color: red; }</style></head>
        <body><h1>Heading</h1><script>var x = "ignored";</script>
        <p>First paragraph.</p> <p>Second&nbsp;paragraph.</p></body></html>"#;

    #[test]
    fn title_is_parsed_and_decoded() {
        assert_eq!(page_title(PAGE).as_deref(), Some("Example & Co"));
        assert_eq!(page_title("<p>no title</p>"), None);
        assert_eq!(page_title("<title></title>"), None);
    }

    #[test]
    fn visible_text_skips_script_and_style() {
        let text = visible_text(PAGE);
        assert!(text.contains("Heading"));
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second paragraph."));
        assert!(!text.contains("ignored"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn whitespace_is_collapsed() {
        let text = visible_text("<p>a</p>\n\n   <p>b</p>");
        assert_eq!(text, "a b");
    }

    #[tokio::test]
    async fn extract_before_navigate_is_a_precondition_error() {
        let browser = FetchBrowser::new(Duration::from_secs(5)).unwrap();
        let err = browser.extract_text(None, None).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidState(_)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let browser = FetchBrowser::new(Duration::from_secs(5)).unwrap();
        browser.close().await.unwrap();
        browser.close().await.unwrap();
        let err = browser.dom_snapshot().await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidState(_)));
    }
}
