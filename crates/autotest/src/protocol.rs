// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wire message envelope and codec shared by the control and event
//! channels (§4.B, §6). Fields absent on encode are omitted, never
//! emitted as null; unknown fields on decode are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Request,
    Response,
    Event,
    Cancel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageError {
    pub code: i32,
    pub message: String,
}

/// The correlation-ID-bearing envelope exchanged over both channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MessageError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub timestamp: i64,
}

impl Message {
    /// Build a fresh `request` frame, stamping `metadata.timeout` in
    /// milliseconds when `timeout` is given.
    pub fn request(method: impl Into<String>, params: Option<Value>, timeout: Option<std::time::Duration>) -> Self {
        let metadata = timeout.map(|t| serde_json::json!({ "timeout": t.as_millis() as i64 }));
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: MessageType::Request,
            method: Some(method.into()),
            params,
            result: None,
            error: None,
            metadata,
            timestamp: now_ms(),
        }
    }

    /// Build a `cancel` frame reusing the original request's id.
    pub fn cancel(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message_type: MessageType::Cancel,
            method: None,
            params: None,
            result: None,
            error: None,
            metadata: None,
            timestamp: now_ms(),
        }
    }

    /// Build a success `response` frame reusing the request's id.
    pub fn response_ok(request_id: impl Into<String>, result: Value) -> Self {
        Self {
            id: request_id.into(),
            message_type: MessageType::Response,
            method: None,
            params: None,
            result: Some(result),
            error: None,
            metadata: None,
            timestamp: now_ms(),
        }
    }

    /// Build an error `response` frame reusing the request's id.
    pub fn response_err(request_id: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id: request_id.into(),
            message_type: MessageType::Response,
            method: None,
            params: None,
            result: None,
            error: Some(MessageError { code, message: message.into() }),
            metadata: None,
            timestamp: now_ms(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.code)
    }

    /// The request's declared timeout in milliseconds, if any.
    pub fn timeout_ms(&self) -> Option<i64> {
        self.metadata.as_ref()?.get("timeout")?.as_i64()
    }

    /// Encode to the wire's UTF-8 JSON text frame.
    pub fn encode(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a text frame. Rejects frames missing `id`/`type`;
    /// tolerates any other unrecognized field.
    pub fn decode(frame: &str) -> anyhow::Result<Self> {
        let msg: Message = serde_json::from_str(frame)?;
        Ok(msg)
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
