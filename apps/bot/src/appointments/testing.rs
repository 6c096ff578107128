// Scripted browser used by the checker tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::scripts;
use crate::infrastructure::browser::{
    Browser, BrowserError, BrowserPage, BrowserResult, ElementId, LaunchOptions, Locator, Proxy,
};

#[derive(Default)]
struct PageState {
    elements: Vec<(Locator, ElementId, String)>,
    marked_dates: Vec<String>,
    datepicker_dates: Vec<String>,
    fail_goto: bool,
    goto_delay: Option<Duration>,
    visited: Vec<String>,
    clicks: Vec<ElementId>,
    closed: bool,
}

/// Page whose DOM is a fixed list of locator matches
#[derive(Clone, Default)]
pub struct ScriptedPage {
    state: Arc<Mutex<PageState>>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element matched by `locator`
    pub fn with(self, locator: Locator, id: &str, text: &str) -> Self {
        self.state.lock().unwrap().elements.push((
            locator,
            ElementId(id.to_string()),
            text.to_string(),
        ));
        self
    }

    pub fn marked_dates(self, dates: &[&str]) -> Self {
        self.state.lock().unwrap().marked_dates = dates.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn datepicker_dates(self, dates: &[&str]) -> Self {
        self.state.lock().unwrap().datepicker_dates = dates.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn failing_navigation(self) -> Self {
        self.state.lock().unwrap().fail_goto = true;
        self
    }

    /// Every navigation takes `delay` before it answers
    pub fn slow_navigation(self, delay: Duration) -> Self {
        self.state.lock().unwrap().goto_delay = Some(delay);
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.iter().map(|e| e.0.clone()).collect()
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl BrowserPage for ScriptedPage {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        let delay = self.state.lock().unwrap().goto_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.visited.push(url.to_string());
        if state.fail_goto {
            return Err(BrowserError::Protocol {
                error: "unknown error".into(),
                message: "net::ERR_CONNECTION_RESET".into(),
            });
        }
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> BrowserResult<Option<ElementId>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .elements
            .iter()
            .find(|(l, _, _)| l == locator)
            .map(|(_, id, _)| id.clone()))
    }

    async fn find_all(&self, locator: &Locator) -> BrowserResult<Vec<ElementId>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .elements
            .iter()
            .filter(|(l, _, _)| l == locator)
            .map(|(_, id, _)| id.clone())
            .collect())
    }

    async fn click(&self, element: &ElementId) -> BrowserResult<()> {
        self.state.lock().unwrap().clicks.push(element.clone());
        Ok(())
    }

    async fn text(&self, element: &ElementId) -> BrowserResult<String> {
        let state = self.state.lock().unwrap();
        Ok(state
            .elements
            .iter()
            .find(|(_, id, _)| id == element)
            .map(|(_, _, text)| text.clone())
            .unwrap_or_default())
    }

    async fn execute(&self, script: &str) -> BrowserResult<Value> {
        let state = self.state.lock().unwrap();
        if script.contains("document.readyState") {
            Ok(json!("complete"))
        } else if script == scripts::MARKED_DATES {
            Ok(json!(state.marked_dates))
        } else if script == scripts::DATEPICKER_DAYS {
            Ok(json!(state.datepicker_dates))
        } else {
            Ok(Value::Null)
        }
    }

    async fn close(&self) -> BrowserResult<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Hands out the same scripted page and records the launch options
#[derive(Clone)]
pub struct ScriptedBrowser {
    page: ScriptedPage,
    launches: Arc<Mutex<Vec<Option<Proxy>>>>,
}

impl ScriptedBrowser {
    pub fn new(page: ScriptedPage) -> Self {
        Self {
            page,
            launches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Proxy of every session opened so far
    pub fn launches(&self) -> Vec<Option<Proxy>> {
        self.launches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn open(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserPage>> {
        self.launches.lock().unwrap().push(options.proxy.clone());
        Ok(Box::new(self.page.clone()))
    }
}
