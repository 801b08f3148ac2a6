// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Vision-API recognition backend (§4.J). Grounded on
//! `original_source/.../plugins/builtin/ocr.py::OnlineOcrBackend` —
//! base64-encodes the screenshot, sends an OpenAI-compatible
//! chat-completions request asking for a JSON array of text spans, and
//! strips any fenced-code markers before parsing the reply.

use std::time::Duration;

use base64::Engine as _;
use serde_json::Value;
use tracing::warn;

use super::{sniff_media_type, OcrResult, RecognitionBackend, RecognizeFuture};
use crate::device::Rect;

const SYSTEM_PROMPT: &str = "You are a precise OCR engine. The user sends a mobile screenshot; identify every \
visible piece of text. Return a JSON array where each element has \"text\", \"bounds\" \
({\"left\",\"top\",\"right\",\"bottom\"} in pixels), and \"confidence\" (0 to 1). Respond with the JSON array only, \
with no markdown code fence or commentary.";

pub struct OnlineBackend {
    api_base: String,
    api_key: String,
    model: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl OnlineBackend {
    pub fn new(api_base: String, api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_owned(),
            api_key,
            model,
            timeout,
            http: reqwest::Client::new(),
        }
    }

    fn parse_response(content: &str) -> Vec<OcrResult> {
        let trimmed = content.trim();
        let trimmed = trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```")).unwrap_or(trimmed);
        let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed).trim();

        let items: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                let preview: String = trimmed.chars().take(200).collect();
                warn!(error = %e, preview, "online recognition reply was not valid JSON");
                return Vec::new();
            }
        };
        let items = match items {
            Value::Array(items) => items,
            other => vec![other],
        };

        let mut results = Vec::new();
        for item in items {
            let Some(obj) = item.as_object() else { continue };
            let text = obj.get("text").and_then(Value::as_str).unwrap_or_default();
            let Some(bounds) = obj.get("bounds").and_then(Value::as_object) else { continue };
            if text.is_empty() {
                continue;
            }
            let confidence = obj.get("confidence").and_then(Value::as_f64).unwrap_or(0.8);
            let get = |key: &str| bounds.get(key).and_then(Value::as_f64).unwrap_or(0.0);
            results.push(OcrResult {
                text: text.to_owned(),
                bounds: Rect { left: get("left"), top: get("top"), right: get("right"), bottom: get("bottom") },
                confidence,
            });
        }
        results
    }
}

impl RecognitionBackend for OnlineBackend {
    fn name(&self) -> String {
        format!("online({})", self.model)
    }

    fn recognize<'a>(&'a self, image: &'a [u8]) -> RecognizeFuture<'a> {
        Box::pin(async move {
            let media_type = sniff_media_type(image);
            let b64 = base64::engine::general_purpose::STANDARD.encode(image);
            let data_url = format!("data:{media_type};base64,{b64}");

            let payload = serde_json::json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": [
                        {"type": "image_url", "image_url": {"url": data_url}},
                        {"type": "text", "text": "Identify every piece of text in this screenshot and its pixel bounds."},
                    ]},
                ],
                "max_tokens": 4096,
                "temperature": 0.1,
            });

            let url = format!("{}/chat/completions", self.api_base);
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await?
                .error_for_status()?;

            let body: Value = response.json().await?;
            let content = body
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("message"))
                .and_then(|m| m.get("content"))
                .and_then(Value::as_str)
                .unwrap_or_default();

            Ok(Self::parse_response(content))
        })
    }
}
