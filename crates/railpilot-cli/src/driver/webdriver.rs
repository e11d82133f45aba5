//! W3C WebDriver client implementing [`DomActionPort`].
//!
//! Locators are resolved inside the page by a small script so scope, index
//! and "containing text" behave exactly as documented on [`Locator`]. Clicks
//! and typing then go through the WebDriver element endpoints, which fire
//! real input events.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use railpilot_core::error::PortError;
use railpilot_core::locator::Locator;
use railpilot_core::ports::DomActionPort;
use railpilot_core::snapshot::ScreenSnapshot;
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::args::DriverArgs;

/// Key under which WebDriver serializes element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver code point of the Enter key.
const ENTER_KEY: &str = "\u{E007}";

/// Timeout of a single WebDriver request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between polls in `wait_for` and snapshot settling.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Snapshot reads before giving up on a stable render.
const SETTLE_ATTEMPTS: usize = 10;

/// In-page locator resolution; `arguments[0]` is the serialized [`Locator`].
const RESOLVE_JS: &str = r#"
function resolve(loc) {
  let root = document;
  if (loc.scope) {
    root = document.querySelectorAll(loc.scope.css)[loc.scope.index];
    if (!root) return [];
  }
  let found = Array.from(root.querySelectorAll(loc.css));
  if (loc.index !== null) found = found[loc.index] ? [found[loc.index]] : [];
  if (loc.containing !== null) {
    const text = (el) => el.innerText || el.textContent || '';
    found = found
      .filter((el) => text(el).includes(loc.containing))
      .map((el) => {
        let deepest = el;
        for (;;) {
          const next = Array.from(deepest.children).find((c) => text(c).includes(loc.containing));
          if (!next) return deepest;
          deepest = next;
        }
      });
  }
  return found;
}
const loc = arguments[0];
"#;

const SNAPSHOT_JS: &str = "return [document.body ? document.body.innerText : '', \
                           document.body ? document.body.innerHTML : ''];";

/// A browser session behind a WebDriver server.
pub struct WebDriver {
    http: reqwest::Client,
    base: String,
    session_id: String,
}

impl WebDriver {
    /// Start or attach to a browser session, then open the start page if given.
    pub async fn connect(args: &DriverArgs) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        let base = args.webdriver_url.trim_end_matches('/').to_string();

        let session_id = match &args.session_id {
            Some(id) => {
                debug!("Attaching to WebDriver session {}", id);
                id.clone()
            }
            None => {
                let body = json!({
                    "capabilities": {
                        "alwaysMatch": { "browserName": args.browser.capability_name() }
                    }
                });
                let value = send(http.post(format!("{}/session", base)).json(&body))
                    .await
                    .with_context(|| format!("Failed to start a browser via {}", base))?;
                let Some(id) = value.get("sessionId").and_then(Value::as_str) else {
                    bail!("WebDriver did not return a session id: {}", value);
                };
                info!("Started {:?} session {}", args.browser, id);
                id.to_string()
            }
        };

        let driver = Self {
            http,
            base,
            session_id,
        };

        match &args.url {
            Some(url) => driver
                .navigate(url)
                .await
                .with_context(|| format!("Failed to open {}", url))?,
            None => {
                let current = driver
                    .command(Method::GET, "/url", None)
                    .await
                    .context("WebDriver session is not reachable")?;
                info!("Driving page {}", current.as_str().unwrap_or("(unknown)"));
            }
        }

        Ok(driver)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn navigate(&self, url: &str) -> Result<(), PortError> {
        info!("Opening {}", url);
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    /// Send a session-scoped command and return its `value`.
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, PortError> {
        let url = format!("{}/session/{}{}", self.base, self.session_id, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        send(request).await
    }

    /// Run a script with the resolver prelude and the locator as first argument.
    async fn execute(
        &self,
        target: &Locator,
        body: &str,
        extra: Vec<Value>,
    ) -> Result<Value, PortError> {
        let locator = serde_json::to_value(target)
            .map_err(|e| PortError::internal(format!("Failed to encode locator: {}", e)))?;
        let mut args = vec![locator];
        args.extend(extra);
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script(body), "args": args })),
        )
        .await
    }

    /// WebDriver id of the first element matching the target.
    async fn element(&self, target: &Locator) -> Result<String, PortError> {
        let value = self.execute(target, "return resolve(loc);", vec![]).await?;
        element_ids(&value)
            .into_iter()
            .next()
            .ok_or_else(|| PortError::element_not_found(target))
    }

    async fn element_command(
        &self,
        element: &str,
        action: &str,
        body: Value,
    ) -> Result<Value, PortError> {
        let path = format!("/element/{}/{}", element, action);
        self.command(Method::POST, &path, Some(body)).await
    }

    async fn read_screen(&self) -> Result<ScreenSnapshot, PortError> {
        let value = self
            .command(
                Method::POST,
                "/execute/sync",
                Some(json!({ "script": SNAPSHOT_JS, "args": [] })),
            )
            .await?;
        let text = value.get(0).and_then(Value::as_str).unwrap_or_default();
        let markup = value.get(1).and_then(Value::as_str).unwrap_or_default();
        Ok(ScreenSnapshot::new(text, markup))
    }
}

#[async_trait]
impl DomActionPort for WebDriver {
    /// Read the page until two consecutive reads agree.
    async fn snapshot(&mut self) -> Result<ScreenSnapshot, PortError> {
        let mut snapshot = self.read_screen().await?;
        for _ in 1..SETTLE_ATTEMPTS {
            tokio::time::sleep(POLL_INTERVAL).await;
            let next = self.read_screen().await?;
            if next.content_hash() == snapshot.content_hash() {
                return Ok(next);
            }
            snapshot = next;
        }
        debug!("Page kept changing, using latest read");
        Ok(snapshot)
    }

    async fn click(&mut self, target: &Locator) -> Result<(), PortError> {
        let element = self.element(target).await?;
        debug!("Click {}", target);
        self.element_command(&element, "click", json!({})).await?;
        Ok(())
    }

    async fn focus(&mut self, target: &Locator) -> Result<(), PortError> {
        let focused = self
            .execute(
                target,
                "const el = resolve(loc)[0]; if (!el) return false; el.focus(); return true;",
                vec![],
            )
            .await?;
        if focused.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(PortError::element_not_found(target))
        }
    }

    async fn type_text(&mut self, target: &Locator, text: &str) -> Result<(), PortError> {
        let element = self.element(target).await?;
        self.element_command(&element, "clear", json!({})).await?;
        self.element_command(&element, "value", json!({ "text": text }))
            .await?;
        Ok(())
    }

    async fn press_enter(&mut self, target: &Locator) -> Result<(), PortError> {
        let element = self.element(target).await?;
        self.element_command(&element, "value", json!({ "text": ENTER_KEY }))
            .await?;
        Ok(())
    }

    async fn text_of(&mut self, target: &Locator) -> Result<Option<String>, PortError> {
        Ok(self.texts_of(target).await?.into_iter().next())
    }

    async fn texts_of(&mut self, target: &Locator) -> Result<Vec<String>, PortError> {
        let value = self
            .execute(
                target,
                "return resolve(loc).map((el) => el.innerText || el.textContent || '');",
                vec![],
            )
            .await?;
        Ok(strings(&value))
    }

    async fn attribute_of(
        &mut self,
        target: &Locator,
        name: &str,
    ) -> Result<Option<String>, PortError> {
        let value = self
            .execute(
                target,
                "const el = resolve(loc)[0]; return el ? el.getAttribute(arguments[1]) : null;",
                vec![json!(name)],
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn wait_for(&mut self, target: &Locator, timeout: Duration) -> Result<bool, PortError> {
        let start = Instant::now();
        loop {
            let value = self
                .execute(target, "return resolve(loc).length;", vec![])
                .await?;
            if value.as_u64().unwrap_or(0) > 0 {
                debug!("Found {} after {:?}", target, start.elapsed());
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

fn script(body: &str) -> String {
    format!("{}{}", RESOLVE_JS, body)
}

async fn send(request: RequestBuilder) -> Result<Value, PortError> {
    let response = request
        .send()
        .await
        .map_err(|e| PortError::driver_failed(format!("WebDriver request failed: {}", e)))?;
    let ok = response.status().is_success();
    let body: Value = response
        .json()
        .await
        .map_err(|e| PortError::driver_failed(format!("Invalid WebDriver response: {}", e)))?;
    unwrap_value(ok, body)
}

/// Extract `value` from a WebDriver response body, mapping protocol errors.
fn unwrap_value(ok: bool, mut body: Value) -> Result<Value, PortError> {
    let value = body.get_mut("value").map(Value::take).unwrap_or(Value::Null);
    if ok {
        return Ok(value);
    }

    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value.get("message").and_then(Value::as_str).unwrap_or("");
    let full = format!("{}: {}", error, message);
    match error {
        "no such element"
        | "stale element reference"
        | "element not interactable"
        | "element click intercepted" => Err(PortError::element_not_ready(full)),
        "invalid argument" | "invalid selector" => Err(PortError::invalid_input(full)),
        _ => Err(PortError::driver_failed(full)),
    }
}

fn element_ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(ELEMENT_KEY).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| item.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}
