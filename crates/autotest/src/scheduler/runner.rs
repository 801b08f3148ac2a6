// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-device test runner (§4.H). Grounded on
//! `original_source/.../automation/runner.py` (`TestRunner`, outcome
//! classification, retry loop via `asyncio.wait_for`). Uses
//! `tokio::time::timeout` for the per-test wall-clock deadline, matching
//! the host crate's bounded-await idiom (`broker/distributor.rs`'s
//! `PUSH_TIMEOUT` via `tokio::time::timeout`).

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{info, warn};

use crate::device::DeviceClient;
use crate::dsl::Device;
use crate::events::{Event, EventBus};
use crate::model::{Summary, TestResult, TestStatus};
use crate::recognition::RecognitionBackend;
use crate::registry::{TestCaseInfo, TestFailure};

/// Runs a fixed slice of tests against one connected device, in order,
/// emitting lifecycle events to the shared bus. Not reused across
/// executions (§3 "Lifecycle and ownership") — build a fresh [`Runner`]
/// per `execute` call.
pub struct Runner {
    serial: String,
    client: Arc<DeviceClient>,
    recognition: Option<Arc<dyn RecognitionBackend>>,
    bus: Arc<EventBus>,
}

impl Runner {
    pub fn new(
        serial: impl Into<String>,
        client: Arc<DeviceClient>,
        recognition: Option<Arc<dyn RecognitionBackend>>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self { serial: serial.into(), client, recognition, bus }
    }

    /// Run every test in `tests`, strictly in order (§5 "per worker"
    /// ordering guarantee). Returns one result per test.
    pub async fn run_all(&self, tests: Vec<TestCaseInfo>) -> Vec<TestResult> {
        self.bus
            .emit(Event::new(
                "run.started",
                "runner",
                json!({"device_serial": self.serial, "total": tests.len()}),
            ))
            .await;

        let mut results = Vec::with_capacity(tests.len());
        for test in &tests {
            results.push(self.run_one(test).await);
        }

        let summary = Summary::from_results(&results);
        self.bus
            .emit(Event::new(
                "run.completed",
                "runner",
                json!({
                    "device_serial": self.serial,
                    "total": summary.total,
                    "passed": summary.passed,
                    "failed": summary.failed,
                    "error": summary.error,
                    "skipped": summary.skipped,
                }),
            ))
            .await;

        results
    }

    /// Run a single test, retrying up to `retry_count` additional times
    /// on a non-pass outcome; returns the last attempt's result (§4.H).
    async fn run_one(&self, test: &TestCaseInfo) -> TestResult {
        self.bus
            .emit(Event::new("test.started", "runner", json!({"name": test.name, "device_serial": self.serial})))
            .await;

        let mut attempt = 0;
        let mut result = self.attempt(test).await;
        while !result.is_pass() && attempt < test.retry_count {
            attempt += 1;
            warn!(test = %test.name, attempt, device = %self.serial, "retrying non-passing test");
            result = self.attempt(test).await;
        }

        self.bus
            .emit(Event::new(
                "test.completed",
                "runner",
                json!({
                    "name": result.name,
                    "device_serial": result.device_serial,
                    "status": result.status.as_str(),
                    "duration_ms": result.duration_ms,
                    "error_message": result.error_message,
                }),
            ))
            .await;

        result
    }

    /// Invoke the handler once under the test's wall-clock timeout and
    /// classify the outcome (§4.H). `duration_ms` is measured monotonically
    /// around the handler invocation alone.
    async fn attempt(&self, test: &TestCaseInfo) -> TestResult {
        let device = Device::new(self.serial.clone(), self.client.clone(), self.recognition.clone());
        let timeout = Duration::from_secs_f64(test.timeout_seconds);
        let started = Instant::now();

        let outcome = tokio::time::timeout(timeout, (test.handler)(device)).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let result = match outcome {
            Ok(Ok(())) => TestResult::new(&test.name, TestStatus::Passed, &self.serial),
            Ok(Err(TestFailure::Assertion(message))) => {
                TestResult::new(&test.name, TestStatus::Failed, &self.serial).with_error(message)
            }
            Ok(Err(TestFailure::Error(message))) => {
                TestResult::new(&test.name, TestStatus::Error, &self.serial).with_error(message)
            }
            Err(_) => {
                // Cooperative cancellation only: the handler future is
                // dropped here, but cleanup beyond that is its own
                // responsibility (§5 "Cancellation & timeouts").
                TestResult::new(&test.name, TestStatus::Error, &self.serial)
                    .with_error(format!("Test timed out after {}s", test.timeout_seconds))
            }
        };

        info!(test = %test.name, device = %self.serial, status = result.status.as_str(), duration_ms, "test attempt finished");
        result.with_duration_ms(duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TestCaseBuilder;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn runner() -> Runner {
        let client = Arc::new(DeviceClient::new("127.0.0.1", 1, 2));
        Runner::new("SER1", client, None, Arc::new(EventBus::new()))
    }

    #[tokio::test]
    async fn passing_handler_yields_passed() {
        let test = TestCaseBuilder::new("ok").build(|_device| async move { Ok(()) });
        let result = runner().attempt(&test).await;
        assert_eq!(result.status, TestStatus::Passed);
        assert_eq!(result.device_serial, "SER1");
    }

    #[tokio::test]
    async fn assertion_failure_yields_failed_with_message() {
        let test = TestCaseBuilder::new("fails")
            .build(|_device| async move { Err(TestFailure::Assertion("expected true".into())) });
        let result = runner().attempt(&test).await;
        assert_eq!(result.status, TestStatus::Failed);
        assert_eq!(result.error_message.as_deref(), Some("expected true"));
    }

    #[tokio::test]
    async fn other_error_yields_error_status() {
        let test = TestCaseBuilder::new("blows_up")
            .build(|_device| async move { Err(TestFailure::Error("ConnectionReset: peer closed".into())) });
        let result = runner().attempt(&test).await;
        assert_eq!(result.status, TestStatus::Error);
        assert_eq!(result.error_message.as_deref(), Some("ConnectionReset: peer closed"));
    }

    #[tokio::test]
    async fn timeout_yields_error_with_documented_message() {
        let test = TestCaseBuilder::new("hangs").timeout_seconds(0.05).build(|_device| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        });
        let result = runner().attempt(&test).await;
        assert_eq!(result.status, TestStatus::Error);
        assert_eq!(result.error_message.as_deref(), Some("Test timed out after 0.05s"));
    }

    /// §8 scenario 5: fails twice, passes on the third attempt; final
    /// status is `passed`.
    #[tokio::test]
    async fn retry_returns_the_final_attempts_result() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let test = TestCaseBuilder::new("flaky").retry_count(2).build(move |_device| {
            let c = c.clone();
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(TestFailure::Assertion("not yet".into()))
                } else {
                    Ok(())
                }
            }
        });

        let result = runner().run_one(&test).await;
        assert_eq!(result.status, TestStatus::Passed);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    /// §8 boundary: retry_count=0 runs the handler exactly once.
    #[tokio::test]
    async fn zero_retry_count_runs_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let test = TestCaseBuilder::new("always_fails").build(move |_device| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(TestFailure::Assertion("nope".into()))
            }
        });

        let result = runner().run_one(&test).await;
        assert_eq!(result.status, TestStatus::Failed);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_all_stamps_device_serial_and_never_pending() {
        let tests = vec![
            TestCaseBuilder::new("a").build(|_device| async move { Ok(()) }),
            TestCaseBuilder::new("b").build(|_device| async move { Err(TestFailure::Error("boom".into())) }),
        ];
        let results = runner().run_all(tests).await;
        assert_eq!(results.len(), 2);
        for r in &results {
            assert_ne!(r.device_serial, "");
            assert!(matches!(r.status, TestStatus::Passed | TestStatus::Failed | TestStatus::Error | TestStatus::Skipped));
        }
    }
}
