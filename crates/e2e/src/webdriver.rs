//! W3C WebDriver adapter
//!
//! Talks to chromedriver or geckodriver over HTTP with a blocking client.

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{json, Map, Value};
use streamprobe_common::{BrowserKind, DeviceProfile, HarnessConfig, LocatorKind, LocatorStrategy};
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::session::{BrowserSession, Cookie, ElementHandle, Rect, ScriptArg};

/// Key identifying a web element in W3C payloads
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const CHROME_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-extensions",
];

/// Session capabilities plus the window size to apply once connected
#[derive(Debug, Clone, PartialEq)]
pub struct Capabilities {
    pub browser: BrowserKind,
    pub always_match: Value,
    pub window: (u32, u32),
}

impl Capabilities {
    /// Mobile emulation for `device`
    pub fn for_device(browser: BrowserKind, device: &DeviceProfile, headless: bool) -> Self {
        match browser {
            BrowserKind::Chrome => {
                let mut args: Vec<&str> = CHROME_ARGS.to_vec();
                if headless {
                    args.push("--headless=new");
                }
                Self {
                    browser,
                    always_match: json!({
                        "browserName": "chrome",
                        "goog:chromeOptions": {
                            "mobileEmulation": {
                                "deviceMetrics": {
                                    "width": device.width,
                                    "height": device.height,
                                    "pixelRatio": device.pixel_ratio,
                                },
                                "userAgent": device.user_agent,
                            },
                            "args": args,
                        }
                    }),
                    // room for browser chrome around the emulated viewport
                    window: (device.width + 50, device.height + 100),
                }
            }
            BrowserKind::Firefox => {
                let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
                Self {
                    browser,
                    always_match: json!({
                        "browserName": "firefox",
                        "moz:firefoxOptions": {
                            "prefs": {
                                "general.useragent.override": device.user_agent,
                            },
                            "args": args,
                        }
                    }),
                    window: (device.width, device.height),
                }
            }
        }
    }
}

/// W3C `using`/`value` pair for a strategy
pub fn w3c_locator(strategy: &LocatorStrategy) -> (&'static str, String) {
    let value = strategy.value();
    match strategy.kind() {
        LocatorKind::Css => ("css selector", value.to_string()),
        LocatorKind::XPath => ("xpath", value.to_string()),
        LocatorKind::TagName => ("tag name", value.to_string()),
        LocatorKind::LinkText => ("link text", value.to_string()),
        LocatorKind::PartialLinkText => ("partial link text", value.to_string()),
        LocatorKind::Id => ("css selector", format!("[id=\"{}\"]", escape_attr(value))),
        LocatorKind::Name => ("css selector", format!("[name=\"{}\"]", escape_attr(value))),
        LocatorKind::ClassName => (
            "css selector",
            value
                .split_whitespace()
                .map(|c| format!(".{}", c))
                .collect::<String>(),
        ),
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Map a W3C error code to the interaction taxonomy
pub fn map_error(code: &str, message: &str) -> E2eError {
    match code {
        "stale element reference" => E2eError::StaleElement(message.to_string()),
        "timeout" | "script timeout" => E2eError::Timeout(message.to_string()),
        "invalid selector" => E2eError::InvalidSelector(message.to_string()),
        _ => E2eError::webdriver(code, message),
    }
}

fn element_id(value: &Value) -> E2eResult<ElementHandle> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(ElementHandle::new)
        .ok_or_else(|| E2eError::webdriver("unknown error", format!("not an element: {}", value)))
}

fn script_arg(arg: &ScriptArg) -> Value {
    match arg {
        ScriptArg::Element(handle) => {
            let mut map = Map::new();
            map.insert(ELEMENT_KEY.to_string(), Value::String(handle.id().to_string()));
            Value::Object(map)
        }
        ScriptArg::Value(v) => v.clone(),
    }
}

/// A live WebDriver session
pub struct WebDriverSession {
    client: Client,
    endpoint: String,
    session_id: String,
}

impl WebDriverSession {
    /// Open a session at `endpoint` and size the window
    pub fn connect(endpoint: &str, caps: &Capabilities, implicit_wait: Duration) -> E2eResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        let endpoint = endpoint.trim_end_matches('/').to_string();

        let body = json!({ "capabilities": { "alwaysMatch": caps.always_match } });
        let response = client.post(format!("{}/session", endpoint)).json(&body).send()?;
        let value = Self::unwrap_response(response)?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| E2eError::webdriver("session not created", "no session id"))?
            .to_string();

        info!("WebDriver session {} on {} ({})", session_id, endpoint, caps.browser);
        let session = Self {
            client,
            endpoint,
            session_id,
        };
        session.command(
            Method::POST,
            "timeouts",
            Some(json!({ "implicit": implicit_wait.as_millis() as u64 })),
        )?;
        session.set_window_size(caps.window.0, caps.window.1)?;
        Ok(session)
    }

    /// Connect to the configured driver for `browser`, emulating `device`
    pub fn launch(
        config: &HarnessConfig,
        browser: BrowserKind,
        device: &DeviceProfile,
        headless: bool,
    ) -> E2eResult<Self> {
        let endpoint = match browser {
            BrowserKind::Chrome => &config.webdriver.chrome_url,
            BrowserKind::Firefox => &config.webdriver.firefox_url,
        };
        let caps = Capabilities::for_device(browser, device, headless);
        Self::connect(endpoint, &caps, config.waits.implicit())
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    fn unwrap_response(response: reqwest::blocking::Response) -> E2eResult<Value> {
        let status = response.status();
        let mut body: Value = response.json()?;
        let value = body.get_mut("value").map(Value::take).unwrap_or(Value::Null);
        if status.is_success() {
            return Ok(value);
        }
        let code = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
        let message = value.get("message").and_then(Value::as_str).unwrap_or("");
        Err(map_error(code, message))
    }

    fn command(&self, method: Method, path: &str, body: Option<Value>) -> E2eResult<Value> {
        let url = if path.is_empty() {
            format!("{}/session/{}", self.endpoint, self.session_id)
        } else {
            format!("{}/session/{}/{}", self.endpoint, self.session_id, path)
        };
        debug!("{} {}", method, url);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        Self::unwrap_response(request.send()?)
    }

    fn element_command(&self, method: Method, el: &ElementHandle, what: &str, body: Option<Value>) -> E2eResult<Value> {
        self.command(method, &format!("element/{}/{}", el.id(), what), body)
    }

    fn element_bool(&self, el: &ElementHandle, what: &str) -> E2eResult<bool> {
        Ok(self
            .element_command(Method::GET, el, what, None)?
            .as_bool()
            .unwrap_or(false))
    }

    fn element_string(&self, el: &ElementHandle, what: &str) -> E2eResult<String> {
        Ok(self
            .element_command(Method::GET, el, what, None)?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

impl BrowserSession for WebDriverSession {
    fn navigate(&self, url: &str) -> E2eResult<()> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))?;
        Ok(())
    }

    fn current_url(&self) -> E2eResult<String> {
        Ok(self
            .command(Method::GET, "url", None)?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    fn execute_script(&self, script: &str, args: &[ScriptArg]) -> E2eResult<Value> {
        let args: Vec<Value> = args.iter().map(script_arg).collect();
        self.command(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
    }

    fn find_by(&self, strategy: &LocatorStrategy) -> E2eResult<Option<ElementHandle>> {
        let (using, value) = w3c_locator(strategy);
        match self.command(
            Method::POST,
            "element",
            Some(json!({ "using": using, "value": value })),
        ) {
            Ok(found) => element_id(&found).map(Some),
            Err(E2eError::WebDriver { code, .. }) if code == "no such element" => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn find_all_by(&self, strategy: &LocatorStrategy) -> E2eResult<Vec<ElementHandle>> {
        let (using, value) = w3c_locator(strategy);
        let found = self.command(
            Method::POST,
            "elements",
            Some(json!({ "using": using, "value": value })),
        )?;
        found
            .as_array()
            .map(|items| items.iter().map(element_id).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn save_screenshot(&self, path: &Path) -> E2eResult<()> {
        let encoded = self.command(Method::GET, "screenshot", None)?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_str().unwrap_or_default())?;
        std::fs::write(path, data)?;
        Ok(())
    }

    fn cookies(&self) -> E2eResult<Vec<Cookie>> {
        let value = self.command(Method::GET, "cookie", None)?;
        Ok(serde_json::from_value(value)?)
    }

    fn set_cookie(&self, cookie: &Cookie) -> E2eResult<()> {
        self.command(Method::POST, "cookie", Some(json!({ "cookie": cookie })))?;
        Ok(())
    }

    fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()> {
        self.command(
            Method::POST,
            "window/rect",
            Some(json!({ "width": width, "height": height })),
        )?;
        Ok(())
    }

    fn click(&self, element: &ElementHandle) -> E2eResult<()> {
        self.element_command(Method::POST, element, "click", Some(json!({})))?;
        Ok(())
    }

    fn pointer_click(&self, element: &ElementHandle) -> E2eResult<()> {
        let origin = script_arg(&ScriptArg::from(element));
        let actions = json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": [
                    { "type": "pointerMove", "duration": 100, "origin": origin, "x": 0, "y": 0 },
                    { "type": "pointerDown", "button": 0 },
                    { "type": "pointerUp", "button": 0 }
                ]
            }]
        });
        self.command(Method::POST, "actions", Some(actions))?;
        self.command(Method::DELETE, "actions", None)?;
        Ok(())
    }

    fn clear(&self, element: &ElementHandle) -> E2eResult<()> {
        self.element_command(Method::POST, element, "clear", Some(json!({})))?;
        Ok(())
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> E2eResult<()> {
        self.element_command(Method::POST, element, "value", Some(json!({ "text": text })))?;
        Ok(())
    }

    fn text(&self, element: &ElementHandle) -> E2eResult<String> {
        self.element_string(element, "text")
    }

    fn value(&self, element: &ElementHandle) -> E2eResult<String> {
        self.element_string(element, "property/value")
    }

    fn is_displayed(&self, element: &ElementHandle) -> E2eResult<bool> {
        self.element_bool(element, "displayed")
    }

    fn is_enabled(&self, element: &ElementHandle) -> E2eResult<bool> {
        self.element_bool(element, "enabled")
    }

    fn rect(&self, element: &ElementHandle) -> E2eResult<Rect> {
        let value = self.element_command(Method::GET, element, "rect", None)?;
        Ok(serde_json::from_value(value)?)
    }

    fn quit(&self) -> E2eResult<()> {
        self.command(Method::DELETE, "", None)?;
        info!("WebDriver session {} closed", self.session_id);
        Ok(())
    }
}
