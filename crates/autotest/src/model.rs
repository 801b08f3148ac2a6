// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-cutting result types shared by the runner, executor, and
//! reporters (§3). Grounded on
//! `original_source/.../core/types.py::{TestStatus,TestResult}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
    Error,
}

impl TestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

/// One result per (test, device) pair, per §3 invariant 4: never
/// produced in `Pending`/`Running` state and always carries a serial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub status: TestStatus,
    pub duration_ms: f64,
    pub device_serial: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl TestResult {
    pub fn new(name: impl Into<String>, status: TestStatus, device_serial: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            duration_ms: 0.0,
            device_serial: device_serial.into(),
            error_message: None,
            screenshots: Vec::new(),
            logs: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_pass(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Aggregate counts over a batch of results, attached to
/// `run.completed`/`execution.completed` events (§4.H, §4.I).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub error: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut summary = Summary { total: results.len(), ..Default::default() };
        for r in results {
            match r.status {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Error => summary.error += 1,
                TestStatus::Skipped => summary.skipped += 1,
                TestStatus::Pending | TestStatus::Running => {}
            }
        }
        summary
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.error == 0
    }
}
