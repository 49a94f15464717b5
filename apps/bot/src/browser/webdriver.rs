//! W3C WebDriver client — drives a chromedriver-compatible endpoint over HTTP.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{BrowserDriver, DriverError, ElementHandle, Locator};

/// Key under which W3C WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

/// One browser session on a WebDriver server.
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverSession {
    /// Creates a new Chrome session on the WebDriver server at `base_url`.
    pub async fn start(base_url: &str, headless: bool) -> Result<Self, DriverError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| DriverError::SessionStart(e.to_string()))?;

        let mut args = vec!["--start-maximized", "--disable-notifications"];
        if headless {
            args.extend(["--headless=new", "--window-size=1920,1080"]);
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let base_url = base_url.trim_end_matches('/').to_string();
        let response = client
            .post(format!("{base_url}/session"))
            .json(&capabilities)
            .send()
            .await
            .map_err(|e| DriverError::SessionStart(e.to_string()))?;

        let status = response.status();
        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| DriverError::SessionStart(e.to_string()))?;
        if !status.is_success() {
            return Err(DriverError::SessionStart(format!(
                "status {status}: {}",
                body.value
            )));
        }

        let session_id = body
            .value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DriverError::SessionStart("response carried no sessionId".into()))?
            .to_string();

        info!("WebDriver session {session_id} started (headless={headless})");
        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        debug!("WebDriver {method} {path}");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let body: WireResponse = response.json().await?;

        if status.is_success() {
            return Ok(body.value);
        }

        let wire: WireError = serde_json::from_value(body.value).unwrap_or(WireError {
            error: "unknown error".to_string(),
            message: format!("HTTP {status}"),
        });
        Err(match wire.error.as_str() {
            "no such element" => DriverError::NoSuchElement(wire.message),
            "stale element reference" => DriverError::StaleElement,
            _ => DriverError::Protocol {
                error: wire.error,
                message: wire.message,
            },
        })
    }

    async fn element_bool(
        &self,
        element: &ElementHandle,
        property: &str,
    ) -> Result<bool, DriverError> {
        let value = self
            .send(
                Method::GET,
                &format!("/element/{}/{property}", element.id()),
                None,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

fn locator_body(locator: Locator) -> Value {
    json!({ "using": locator.strategy(), "value": locator.value() })
}

fn parse_element(value: &Value) -> Result<ElementHandle, DriverError> {
    value
        .get(ELEMENT_KEY)
        .and_then(|v| v.as_str())
        .map(|id| ElementHandle(id.to_string()))
        .ok_or_else(|| DriverError::Protocol {
            error: "invalid element reference".to_string(),
            message: value.to_string(),
        })
}

fn parse_elements(value: &Value) -> Result<Vec<ElementHandle>, DriverError> {
    value
        .as_array()
        .map(|items| items.iter().map(parse_element).collect())
        .unwrap_or_else(|| Ok(Vec::new()))
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.send(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let value = self.send(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn find(&self, locator: Locator) -> Result<ElementHandle, DriverError> {
        let value = self
            .send(Method::POST, "/element", Some(locator_body(locator)))
            .await?;
        parse_element(&value)
    }

    async fn find_all(&self, locator: Locator) -> Result<Vec<ElementHandle>, DriverError> {
        let value = self
            .send(Method::POST, "/elements", Some(locator_body(locator)))
            .await?;
        parse_elements(&value)
    }

    async fn find_in(
        &self,
        parent: &ElementHandle,
        locator: Locator,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        let value = self
            .send(
                Method::POST,
                &format!("/element/{}/elements", parent.id()),
                Some(locator_body(locator)),
            )
            .await?;
        parse_elements(&value)
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        self.element_bool(element, "displayed").await
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        self.element_bool(element, "enabled").await
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        self.element_bool(element, "selected").await
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.send(
            Method::POST,
            &format!("/element/{}/click", element.id()),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.send(
            Method::POST,
            &format!("/element/{}/value", element.id()),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, DriverError> {
        let value = self
            .send(Method::GET, &format!("/element/{}/text", element.id()), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let value = self
            .send(
                Method::GET,
                &format!("/element/{}/attribute/{name}", element.id()),
                None,
            )
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn execute_script(&self, script: &str) -> Result<Value, DriverError> {
        self.send(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": [] })),
        )
        .await
    }

    async fn enter_frame(&self, frame: &ElementHandle) -> Result<(), DriverError> {
        self.send(
            Method::POST,
            "/frame",
            Some(json!({ "id": { ELEMENT_KEY: frame.id() } })),
        )
        .await
        .map(|_| ())
    }

    async fn leave_frames(&self) -> Result<(), DriverError> {
        self.send(Method::POST, "/frame", Some(json!({ "id": null })))
            .await
            .map(|_| ())
    }

    async fn quit(&self) -> Result<(), DriverError> {
        match self.send(Method::DELETE, "", None).await {
            Ok(_) => {
                info!("WebDriver session {} closed", self.session_id);
                Ok(())
            }
            Err(e) => {
                warn!("Closing WebDriver session {} failed: {e}", self.session_id);
                Err(e)
            }
        }
    }
}
