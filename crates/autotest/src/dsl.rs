// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device facade and fluent automation DSL (§4.N). Grounded on
//! `original_source/.../automation/dsl.py` (`Device`, `AppController`,
//! `UiSelector._normalize_selector`'s snake_case→camelCase mapping
//! table, `PerfController`/`PerfSession`/`PerfReport`).
//!
//! ```ignore
//! let device = Device::new(serial, client, recognition);
//! device.app("com.example").launch(None, false, true).await?;
//! device.ui().text("Login").click(Duration::from_secs(10)).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::device::{DeviceClient, DeviceInfo, DeviceState, Rect, ShellResult, UiElement};
use crate::error::{AutotestError, ErrorCode};
use crate::recognition::{OcrResult, RecognitionBackend};

/// High-level device handle wrapping a connected [`DeviceClient`] with
/// ergonomic, test-author-facing methods.
pub struct Device {
    serial: String,
    client: Arc<DeviceClient>,
    recognition: Option<Arc<dyn RecognitionBackend>>,
    perf: PerfController,
}

impl Device {
    pub fn new(serial: impl Into<String>, client: Arc<DeviceClient>, recognition: Option<Arc<dyn RecognitionBackend>>) -> Self {
        let perf = PerfController::new(client.clone());
        Self { serial: serial.into(), client, recognition, perf }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub async fn info(&self) -> anyhow::Result<DeviceInfo> {
        let resp = self.client.send("device.info", None, None).await?;
        let data = resp.result.unwrap_or_default();
        let get_str = |k: &str| data.get(k).and_then(Value::as_str).map(str::to_owned);
        let get_u32 = |k: &str| data.get(k).and_then(Value::as_u64).map(|v| v as u32);
        let state = match data.get("state").and_then(Value::as_str) {
            Some("offline") => DeviceState::Offline,
            Some("unauthorized") => DeviceState::Unauthorized,
            Some("connecting") => DeviceState::Connecting,
            _ => DeviceState::Online,
        };
        Ok(DeviceInfo {
            serial: self.serial.clone(),
            state,
            model: get_str("model"),
            abi: get_str("abi"),
            brand: get_str("brand"),
            density: get_u32("density"),
            sdk: get_u32("sdk"),
            screen_width: get_u32("screenWidth"),
            screen_height: get_u32("screenHeight"),
            rooted: data.get("rooted").and_then(Value::as_bool).unwrap_or(false),
            a11y_enabled: data.get("a11yEnabled").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    /// Capture a screenshot. Distinguishes "agent did not capture a
    /// frame" (`None`, the `data` field absent on the wire) from "agent
    /// captured an empty frame" (`Some(vec![])`, `data` present but an
    /// empty string) — see Open Question (b).
    pub async fn screenshot(&self, tag: &str, format: &str, quality: u8) -> anyhow::Result<Option<Vec<u8>>> {
        let resp = self
            .client
            .send("device.screenshot", Some(json!({"format": format, "quality": quality, "tag": tag})), None)
            .await?;
        let data = resp.result.and_then(|r| r.get("data").and_then(Value::as_str).map(str::to_owned));
        match data {
            Some(b64) => Ok(Some(base64::engine::general_purpose::STANDARD.decode(b64)?)),
            None => Ok(None),
        }
    }

    pub async fn shell(&self, command: &str, as_root: bool) -> anyhow::Result<ShellResult> {
        let resp = self.client.send("device.shell", Some(json!({"command": command, "asRoot": as_root})), None).await?;
        let data = resp.result.unwrap_or_default();
        let exit_code = data.get("exitCode").and_then(Value::as_i64).unwrap_or(-1) as i32;
        let output = data
            .get("output")
            .or_else(|| data.get("stdout"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Ok(ShellResult { exit_code, output })
    }

    pub fn app(&self, package_name: impl Into<String>) -> AppController {
        AppController::new(self.client.clone(), package_name.into())
    }

    pub fn ui(&self) -> UiSelector {
        UiSelector::new(self.client.clone())
    }

    pub async fn wake(&self) -> anyhow::Result<()> {
        self.client.send("device.wake", None, None).await?;
        Ok(())
    }

    pub async fn key(&self, keycode: i32) -> anyhow::Result<()> {
        self.client.send("device.inputKey", Some(json!({"keyCode": keycode})), None).await?;
        Ok(())
    }

    pub async fn press_back(&self) -> anyhow::Result<()> {
        self.key(4).await
    }

    pub async fn press_home(&self) -> anyhow::Result<()> {
        self.key(3).await
    }

    pub fn perf(&self) -> &PerfController {
        &self.perf
    }

    /// Recognize text in the current screen (screenshots first if none
    /// is supplied) via the selected recognition backend (§4.J).
    pub async fn ocr_find(&self, text: &str, threshold: f64, screenshot: Option<Vec<u8>>) -> anyhow::Result<Vec<OcrResult>> {
        let Some(backend) = &self.recognition else {
            return Ok(Vec::new());
        };
        let image = match screenshot {
            Some(image) => image,
            None => self.screenshot("", "png", 90).await?.unwrap_or_default(),
        };
        backend.find_text(&image, text, threshold).await
    }

    /// Poll recognition until a match at `index` is found, then click
    /// its bounds' centre. Times out to `element-not-found` (§4.J).
    pub async fn ocr_click(
        &self,
        text: &str,
        index: usize,
        threshold: f64,
        timeout: Duration,
        poll_interval: Duration,
    ) -> anyhow::Result<OcrClickResult> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let screenshot = self.screenshot("", "png", 90).await?.unwrap_or_default();
            let matches = self.ocr_find(text, threshold, Some(screenshot)).await?;

            if let Some(target) = matches.get(index) {
                let click_x = target.bounds.center_x();
                let click_y = target.bounds.center_y();
                info!(text = %target.text, click_x, click_y, confidence = target.confidence, "recognition found text, clicking");
                self.client.send("ui.click", Some(json!({"x": click_x, "y": click_y})), None).await?;
                return Ok(OcrClickResult {
                    text: target.text.clone(),
                    bounds: target.bounds,
                    click_x,
                    click_y,
                    confidence: target.confidence,
                    all_matches: matches,
                });
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(AutotestError::new(
                    ErrorCode::ElementNotFound,
                    anyhow::anyhow!("recognition never found text '{text}' (timeout {timeout:?}, threshold {threshold})"),
                )
                .into());
            }

            debug!(text, "recognition found no match yet, retrying");
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct OcrClickResult {
    pub text: String,
    pub bounds: Rect,
    pub click_x: f64,
    pub click_y: f64,
    pub confidence: f64,
    pub all_matches: Vec<OcrResult>,
}

/// Controls a specific app package on the device.
pub struct AppController {
    client: Arc<DeviceClient>,
    pub package_name: String,
}

impl AppController {
    fn new(client: Arc<DeviceClient>, package_name: String) -> Self {
        Self { client, package_name }
    }

    /// Launch the app. Returns launch time in milliseconds.
    pub async fn launch(&self, activity: Option<&str>, clear_state: bool, wait: bool) -> anyhow::Result<f64> {
        let resp = self
            .client
            .send(
                "app.launch",
                Some(json!({
                    "packageName": self.package_name,
                    "activity": activity,
                    "clearState": clear_state,
                    "waitForIdle": wait,
                })),
                None,
            )
            .await?;
        Ok(resp.result.and_then(|r| r.get("launchTimeMs").and_then(Value::as_f64)).unwrap_or(0.0))
    }

    pub async fn stop(&self, force: bool) -> anyhow::Result<()> {
        self.client.send("app.stop", Some(json!({"packageName": self.package_name, "force": force})), None).await?;
        Ok(())
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        self.client.send("app.clear", Some(json!({"packageName": self.package_name})), None).await?;
        Ok(())
    }

    pub async fn install(&self, path: &str, replace: bool) -> anyhow::Result<()> {
        self.client
            .send("app.install", Some(json!({"path": path, "replace": replace, "grantPermissions": true})), None)
            .await?;
        Ok(())
    }

    pub async fn uninstall(&self) -> anyhow::Result<()> {
        self.client.send("app.uninstall", Some(json!({"packageName": self.package_name})), None).await?;
        Ok(())
    }

    pub async fn is_running(&self) -> anyhow::Result<bool> {
        let resp = self.client.send("app.info", Some(json!({"packageName": self.package_name})), None).await?;
        Ok(resp.result.and_then(|r| r.get("running").and_then(Value::as_bool)).unwrap_or(false))
    }
}

/// Snake_case → wire camelCase field mapping for selector keys (§4.N).
fn selector_key(field: &str) -> String {
    match field {
        "resource_id" => "resourceId",
        "text_contains" => "textContains",
        "text_matches" => "textMatches",
        "class_name" => "className",
        "package_name" => "packageName",
        "content_description" => "description",
        "description_contains" => "descriptionContains",
        other => other,
    }
    .to_owned()
}

/// Lazy UI element selector; operations are sent to the device only when
/// a terminal method is called.
pub struct UiSelector {
    client: Arc<DeviceClient>,
    selector: Map<String, Value>,
}

impl UiSelector {
    fn new(client: Arc<DeviceClient>) -> Self {
        Self { client, selector: Map::new() }
    }

    fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.selector.insert(selector_key(field), value.into());
        self
    }

    pub fn text(self, value: impl Into<String>) -> Self {
        self.with("text", value.into())
    }
    pub fn text_contains(self, value: impl Into<String>) -> Self {
        self.with("text_contains", value.into())
    }
    pub fn text_matches(self, value: impl Into<String>) -> Self {
        self.with("text_matches", value.into())
    }
    pub fn resource_id(self, value: impl Into<String>) -> Self {
        self.with("resource_id", value.into())
    }
    pub fn class_name(self, value: impl Into<String>) -> Self {
        self.with("class_name", value.into())
    }
    pub fn package_name(self, value: impl Into<String>) -> Self {
        self.with("package_name", value.into())
    }
    pub fn content_description(self, value: impl Into<String>) -> Self {
        self.with("content_description", value.into())
    }
    pub fn description_contains(self, value: impl Into<String>) -> Self {
        self.with("description_contains", value.into())
    }

    pub async fn find(&self, timeout: Duration) -> anyhow::Result<Vec<UiElement>> {
        let resp = self
            .client
            .send("ui.find", Some(json!({"selector": self.selector, "timeout": timeout.as_millis() as i64})), None)
            .await?;
        let elements = resp.result.and_then(|r| r.get("elements").cloned()).unwrap_or(Value::Array(Vec::new()));
        let elements = elements.as_array().cloned().unwrap_or_default();
        Ok(elements.iter().map(parse_element).collect())
    }

    pub async fn find_one(&self, timeout: Duration) -> anyhow::Result<UiElement> {
        let elements = self.find(timeout).await?;
        elements.into_iter().next().ok_or_else(|| {
            AutotestError::new(ErrorCode::ElementNotFound, anyhow::anyhow!("element not found: {:?}", self.selector)).into()
        })
    }

    pub async fn exists(&self, timeout: Duration) -> bool {
        matches!(self.find(timeout).await, Ok(elements) if !elements.is_empty())
    }

    pub async fn click(&self, timeout: Duration) -> anyhow::Result<()> {
        self.client
            .send("ui.click", Some(json!({"selector": self.selector, "timeout": timeout.as_millis() as i64})), None)
            .await?;
        Ok(())
    }

    pub async fn long_click(&self, duration_ms: u64, timeout: Duration) -> anyhow::Result<()> {
        self.client
            .send(
                "ui.longClick",
                Some(json!({"selector": self.selector, "durationMs": duration_ms, "timeout": timeout.as_millis() as i64})),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn type_text(&self, text: &str, clear_first: bool, timeout: Duration) -> anyhow::Result<()> {
        self.client
            .send(
                "ui.type",
                Some(json!({"selector": self.selector, "text": text, "clearFirst": clear_first, "timeout": timeout.as_millis() as i64})),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn swipe(&self, direction: &str, amount: f64, timeout: Duration) -> anyhow::Result<()> {
        self.client
            .send(
                "ui.scroll",
                Some(json!({"selector": self.selector, "direction": direction, "amount": amount, "timeout": timeout.as_millis() as i64})),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn wait_for(&self, condition: &str, timeout: Duration, poll_interval: Duration) -> anyhow::Result<UiSelectorResult> {
        let resp = self
            .client
            .send(
                "ui.waitFor",
                Some(json!({
                    "selector": self.selector,
                    "condition": condition,
                    "timeout": timeout.as_millis() as i64,
                    "pollInterval": poll_interval.as_millis() as i64,
                })),
                None,
            )
            .await?;
        let data = resp.result.unwrap_or_default();
        Ok(UiSelectorResult {
            found: data.get("found").and_then(Value::as_bool).unwrap_or(false),
            elapsed_ms: data.get("elapsed").and_then(Value::as_f64).unwrap_or(0.0),
        })
    }

    pub async fn get_text(&self, timeout: Duration) -> anyhow::Result<String> {
        Ok(self.find_one(timeout).await?.text.unwrap_or_default())
    }
}

fn parse_element(data: &Value) -> UiElement {
    let bounds = data.get("bounds").cloned().unwrap_or_default();
    let get = |k: &str| bounds.get(k).and_then(Value::as_f64).unwrap_or(0.0);
    UiElement {
        bounds: Rect { left: get("left"), top: get("top"), right: get("right"), bottom: get("bottom") },
        text: data.get("text").and_then(Value::as_str).map(str::to_owned),
        resource_id: data.get("resourceId").and_then(Value::as_str).map(str::to_owned),
        class_name: data.get("className").and_then(Value::as_str).map(str::to_owned),
        clickable: data.get("isClickable").and_then(Value::as_bool).unwrap_or(false),
    }
}

/// Outcome of a `wait_for` condition poll.
#[derive(Debug, Clone, Copy)]
pub struct UiSelectorResult {
    pub found: bool,
    pub elapsed_ms: f64,
}

impl UiSelectorResult {
    pub fn is_found(&self) -> bool {
        self.found
    }
}

/// Performance monitoring controller (§6 `perf.*` methods).
pub struct PerfController {
    client: Arc<DeviceClient>,
}

impl PerfController {
    fn new(client: Arc<DeviceClient>) -> Self {
        Self { client }
    }

    pub async fn start(&self, package: &str, metrics: Option<Vec<String>>, interval_ms: u64) -> anyhow::Result<PerfSession> {
        let metrics = metrics.unwrap_or_else(|| vec!["cpu".into(), "memory".into(), "fps".into()]);
        let resp = self
            .client
            .send("perf.start", Some(json!({"packageName": package, "metrics": metrics, "intervalMs": interval_ms})), None)
            .await?;
        let session_id = resp.result.and_then(|r| r.get("sessionId").and_then(Value::as_str).map(str::to_owned)).unwrap_or_default();
        Ok(PerfSession { client: self.client.clone(), session_id })
    }
}

pub struct PerfSession {
    client: Arc<DeviceClient>,
    pub session_id: String,
}

impl PerfSession {
    pub async fn snapshot(&self) -> anyhow::Result<Value> {
        let resp = self.client.send("perf.snapshot", Some(json!({"sessionId": self.session_id})), None).await?;
        Ok(resp.result.unwrap_or_default())
    }

    pub async fn stop(&self) -> anyhow::Result<PerfReport> {
        let resp = self.client.send("perf.stop", Some(json!({"sessionId": self.session_id})), None).await?;
        Ok(PerfReport::from_value(resp.result.unwrap_or_default()))
    }
}

#[derive(Debug, Clone)]
pub struct PerfReport {
    pub raw: Value,
    pub avg_cpu: f64,
    pub max_cpu: f64,
    pub avg_memory: f64,
    pub max_memory: f64,
    pub avg_fps: f64,
    pub jank_count: u64,
    pub data_points: Vec<Value>,
}

impl PerfReport {
    fn from_value(data: Value) -> Self {
        let summary = data.get("summary").cloned().unwrap_or_default();
        let get = |k: &str| summary.get(k).and_then(Value::as_f64).unwrap_or(0.0);
        Self {
            avg_cpu: get("avgCpu"),
            max_cpu: get("maxCpu"),
            avg_memory: get("avgMemory"),
            max_memory: get("maxMemory"),
            avg_fps: get("avgFps"),
            jank_count: summary.get("jankCount").and_then(Value::as_u64).unwrap_or(0),
            data_points: data.get("dataPoints").and_then(Value::as_array).cloned().unwrap_or_default(),
            raw: data,
        }
    }
}
