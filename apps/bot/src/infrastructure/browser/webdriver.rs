use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};

use super::{Browser, BrowserError, BrowserPage, BrowserResult, ElementId, LaunchOptions, Locator};

/// Key under which WebDriver returns element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Launches Chrome sessions through a WebDriver server
#[derive(Clone)]
pub struct WebDriverBrowser {
    http: Client,
    base_url: String,
    chrome_binary: Option<String>,
}

impl WebDriverBrowser {
    pub fn new(base_url: &str, chrome_binary: Option<String>) -> BrowserResult<Self> {
        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            chrome_binary,
        })
    }

    fn capabilities(&self, options: &LaunchOptions) -> Value {
        let mut args = vec![
            "--headless=new".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--window-size=1366,768".to_string(),
            format!("--user-agent={}", options.user_agent),
            format!("--lang={}", options.locale),
        ];
        if let Some(proxy) = &options.proxy {
            args.push(format!("--proxy-server=http://{}", proxy));
        }

        let mut chrome_options = json!({ "args": args });
        if let Some(binary) = &self.chrome_binary {
            chrome_options["binary"] = json!(binary);
        }

        let timeout_ms = options.timeout.as_millis() as u64;
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "acceptInsecureCerts": true,
                    "unhandledPromptBehavior": "accept",
                    "timeouts": {
                        "pageLoad": timeout_ms,
                        "script": timeout_ms,
                        "implicit": 0
                    },
                    "goog:chromeOptions": chrome_options
                }
            }
        })
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn open(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserPage>> {
        let value = send(
            &self.http,
            Method::POST,
            &format!("{}/session", self.base_url),
            Some(self.capabilities(options)),
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::UnexpectedResponse(value.to_string()))?;

        tracing::debug!(session_id, proxy = ?options.proxy, "Opened browser session");
        Ok(Box::new(WebDriverPage {
            http: self.http.clone(),
            session_url: format!("{}/session/{}", self.base_url, session_id),
        }))
    }
}

/// A live WebDriver session
pub struct WebDriverPage {
    http: Client,
    session_url: String,
}

impl WebDriverPage {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> BrowserResult<Value> {
        send(&self.http, method, &format!("{}{}", self.session_url, path), body).await
    }
}

/// Issues one WebDriver command and unwraps its `value`
async fn send(http: &Client, method: Method, url: &str, body: Option<Value>) -> BrowserResult<Value> {
    let mut request = http.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await?;
    let status = response.status();
    let mut payload: Value = response
        .json()
        .await
        .map_err(|e| BrowserError::UnexpectedResponse(e.to_string()))?;
    let value = payload.get_mut("value").map(Value::take).unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }
    Err(BrowserError::Protocol {
        error: value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
        message: value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn locator_body(locator: &Locator) -> Value {
    match locator {
        Locator::Css(selector) => json!({ "using": "css selector", "value": selector }),
        Locator::XPath(expression) => json!({ "using": "xpath", "value": expression }),
    }
}

fn element_id(value: &Value) -> BrowserResult<ElementId> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementId(id.to_string()))
        .ok_or_else(|| BrowserError::UnexpectedResponse(value.to_string()))
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn find(&self, locator: &Locator) -> BrowserResult<Option<ElementId>> {
        match self
            .command(Method::POST, "/element", Some(locator_body(locator)))
            .await
        {
            Ok(value) => element_id(&value).map(Some),
            Err(BrowserError::Protocol { error, .. }) if error == "no such element" => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_all(&self, locator: &Locator) -> BrowserResult<Vec<ElementId>> {
        let value = self
            .command(Method::POST, "/elements", Some(locator_body(locator)))
            .await?;
        value
            .as_array()
            .ok_or_else(|| BrowserError::UnexpectedResponse(value.to_string()))?
            .iter()
            .map(element_id)
            .collect()
    }

    async fn click(&self, element: &ElementId) -> BrowserResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.0),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    async fn text(&self, element: &ElementId) -> BrowserResult<String> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.0), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn execute(&self, script: &str) -> BrowserResult<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": [] })),
        )
        .await
    }

    async fn close(&self) -> BrowserResult<()> {
        self.command(Method::DELETE, "", None).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::browser::Proxy;
    use httpmock::prelude::*;

    fn options(proxy: Option<Proxy>) -> LaunchOptions {
        LaunchOptions {
            proxy,
            user_agent: "TestAgent/1.0".to_string(),
            locale: "es-ES".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    async fn open_session(server: &MockServer) -> Box<dyn BrowserPage> {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/session");
                then.status(200)
                    .json_body(json!({"value": {"sessionId": "abc", "capabilities": {}}}));
            })
            .await;
        let browser = WebDriverBrowser::new(&server.base_url(), None).unwrap();
        browser.open(&options(None)).await.unwrap()
    }

    #[tokio::test]
    async fn session_request_carries_fingerprint_and_proxy() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/session")
                    .body_contains("--proxy-server=http://10.0.0.1:8080")
                    .body_contains("--user-agent=TestAgent/1.0")
                    .body_contains("--lang=es-ES")
                    .body_contains("\"binary\":\"/usr/bin/chromium\"");
                then.status(200)
                    .json_body(json!({"value": {"sessionId": "s1", "capabilities": {}}}));
            })
            .await;

        let browser =
            WebDriverBrowser::new(&server.base_url(), Some("/usr/bin/chromium".into())).unwrap();
        let proxy = Proxy::parse("10.0.0.1:8080");
        assert!(browser.open(&options(proxy)).await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_element_is_none() {
        let server = MockServer::start_async().await;
        let page = open_session(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/session/abc/element");
                then.status(404).json_body(json!({
                    "value": {"error": "no such element", "message": "not found", "stacktrace": ""}
                }));
            })
            .await;

        assert_eq!(page.find(&Locator::css("#missing")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn finds_and_clicks_elements() {
        let server = MockServer::start_async().await;
        let page = open_session(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/session/abc/elements")
                    .json_body(json!({"using": "css selector", "value": "a.day"}));
                then.status(200).json_body(json!({
                    "value": [{ELEMENT_KEY: "e1"}, {ELEMENT_KEY: "e2"}]
                }));
            })
            .await;
        let click = server
            .mock_async(|when, then| {
                when.method(POST).path("/session/abc/element/e2/click");
                then.status(200).json_body(json!({"value": null}));
            })
            .await;

        let elements = page.find_all(&Locator::css("a.day")).await.unwrap();
        assert_eq!(elements, vec![ElementId("e1".into()), ElementId("e2".into())]);
        page.click(&elements[1]).await.unwrap();
        click.assert_async().await;
    }

    #[tokio::test]
    async fn protocol_errors_surface() {
        let server = MockServer::start_async().await;
        let page = open_session(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/session/abc/url");
                then.status(500).json_body(json!({
                    "value": {"error": "timeout", "message": "page load timed out"}
                }));
            })
            .await;

        let err = page.goto("https://example.org").await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn waits_for_ready_state() {
        let server = MockServer::start_async().await;
        let page = open_session(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/session/abc/execute/sync")
                    .body_contains("document.readyState");
                then.status(200).json_body(json!({"value": "complete"}));
            })
            .await;

        page.wait_until_loaded(Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn close_deletes_session() {
        let server = MockServer::start_async().await;
        let page = open_session(&server).await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/session/abc");
                then.status(200).json_body(json!({"value": null}));
            })
            .await;

        page.close().await.unwrap();
        delete.assert_async().await;
    }
}
