// Headless browser adapter
// Pages are driven over the W3C WebDriver protocol (chromedriver in production)

pub mod proxy;
pub mod webdriver;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use proxy::{Proxy, ProxyPool};
pub use webdriver::WebDriverBrowser;

/// Poll period of the waiting helpers
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("WebDriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver error '{error}': {message}")]
    Protocol { error: String, message: String },

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Unexpected WebDriver response: {0}")]
    UnexpectedResponse(String),
}

impl BrowserError {
    pub fn is_timeout(&self) -> bool {
        match self {
            BrowserError::Timeout(_) => true,
            BrowserError::Protocol { error, .. } => error.contains("timeout"),
            BrowserError::Http(e) => e.is_timeout(),
            BrowserError::UnexpectedResponse(_) => false,
        }
    }
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// How to find elements on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    /// Innermost element whose text contains `text`
    pub fn text(text: &str) -> Self {
        let literal = xpath_literal(text);
        Locator::XPath(format!(
            "//*[contains(normalize-space(.), {literal})][not(*[contains(normalize-space(.), {literal})])]"
        ))
    }
}

/// Quotes a string for use inside an XPath expression
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value.split('\'').map(|part| format!("'{}'", part)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Opaque reference to an element of the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(pub String);

/// Per-session browser fingerprint
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub proxy: Option<Proxy>,
    pub user_agent: String,
    pub locale: String,
    pub timeout: Duration,
}

/// One open browser tab
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn goto(&self, url: &str) -> BrowserResult<()>;

    async fn find(&self, locator: &Locator) -> BrowserResult<Option<ElementId>>;

    async fn find_all(&self, locator: &Locator) -> BrowserResult<Vec<ElementId>>;

    async fn click(&self, element: &ElementId) -> BrowserResult<()>;

    async fn text(&self, element: &ElementId) -> BrowserResult<String>;

    /// Runs a script body (it must `return` its result)
    async fn execute(&self, script: &str) -> BrowserResult<Value>;

    /// Ends the session; the page is unusable afterwards
    async fn close(&self) -> BrowserResult<()>;

    /// Waits until `document.readyState` is `complete`
    async fn wait_until_loaded(&self, timeout: Duration) -> BrowserResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let state = self.execute("return document.readyState;").await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout("page load".to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Waits until an element matching `locator` is present
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> BrowserResult<ElementId> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(element) = self.find(locator).await? {
                return Ok(element);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!("{:?}", locator)));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Factory of browser sessions
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserPage>>;
}
