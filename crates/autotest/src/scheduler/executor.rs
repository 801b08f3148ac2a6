// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel, bounded-concurrency executor (§4.I). Grounded directly on
//! the teacher's `broker/distributor.rs` (`Semaphore`-bounded
//! `tokio::spawn` fan-out, per-task failure isolation via a collected
//! `Result`) generalized to
//! `original_source/.../scheduler/executor.py::ParallelExecutor.execute`.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tokio::sync::Semaphore;
use tracing::error;

use crate::device::manager::DeviceManager;
use crate::events::{Event, EventBus};
use crate::model::{Summary, TestResult, TestStatus};
use crate::recognition::RecognitionBackend;
use crate::registry::TestCaseInfo;

use super::planner::{ExecutionPlan, Planner, Strategy};
use super::runner::Runner;

const DEFAULT_MAX_WORKERS: usize = 8;

/// Aggregate outcome of one `execute` call (§4.I).
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub plan: ExecutionPlan,
    pub results: Vec<TestResult>,
    pub summary: Summary,
    pub wall_clock_ms: f64,
}

/// Owns runners for the duration of one `execute` call; runners are not
/// reused across executions (§3 "Lifecycle and ownership"). Open
/// question (c): this executor always calls `connect_all` itself — safe
/// because connection is idempotent per serial, even when the caller
/// pre-populated the manager.
pub struct ParallelExecutor {
    manager: Arc<DeviceManager>,
    bus: Arc<EventBus>,
    recognition: Option<Arc<dyn RecognitionBackend>>,
    max_workers: usize,
}

impl ParallelExecutor {
    pub fn new(manager: Arc<DeviceManager>, bus: Arc<EventBus>, recognition: Option<Arc<dyn RecognitionBackend>>) -> Self {
        Self { manager, bus, recognition, max_workers: DEFAULT_MAX_WORKERS }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Connect every discoverable device, plan `tests` onto them, and
    /// run each device's slice under a worker bounded by the executor's
    /// semaphore. Zero tests short-circuits without connecting any
    /// device (§8 boundary behavior).
    pub async fn execute(&self, tests: Vec<TestCaseInfo>, strategy: Strategy) -> anyhow::Result<ExecutionReport> {
        let started = Instant::now();

        if tests.is_empty() {
            let plan = ExecutionPlan::default();
            return Ok(ExecutionReport { plan, results: Vec::new(), summary: Summary::default(), wall_clock_ms: 0.0 });
        }

        let clients = self.manager.connect_all().await?;
        let devices: Vec<String> = self.manager.connected_serials().await;
        let _ = clients;

        let plan = Planner::plan(tests, &devices, strategy);
        let total = plan.total_planned();

        self.bus
            .emit(Event::new(
                "execution.started",
                "executor",
                json!({"total": total, "devices": devices.len(), "strategy": strategy_name(strategy)}),
            ))
            .await;

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut handles = Vec::new();

        for (serial, slice) in plan.assignments.clone() {
            if slice.is_empty() {
                continue;
            }
            let Some(client) = self.manager.get_client(&serial).await else { continue };
            let bus = self.bus.clone();
            let recognition = self.recognition.clone();
            let semaphore = semaphore.clone();
            let serial_owned = serial.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await;
                let runner = Runner::new(serial_owned, client, recognition, bus);
                runner.run_all(slice).await
            });
            handles.push((serial, handle));
        }

        let mut results = Vec::with_capacity(total);
        for (serial, handle) in handles {
            match handle.await {
                Ok(worker_results) => results.extend(worker_results),
                Err(join_err) => {
                    error!(device = %serial, error = %join_err, "worker task failed; degrading its slice to error results");
                    for test in plan.assignments.get(&serial).cloned().unwrap_or_default() {
                        results.push(
                            TestResult::new(&test.name, TestStatus::Error, &serial)
                                .with_error(format!("worker task failed: {join_err}")),
                        );
                    }
                }
            }
        }

        let summary = Summary::from_results(&results);
        let wall_clock_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.bus
            .emit(Event::new(
                "execution.completed",
                "executor",
                json!({
                    "total": summary.total,
                    "passed": summary.passed,
                    "failed": summary.failed,
                    "error": summary.error,
                    "skipped": summary.skipped,
                    "wall_clock_ms": wall_clock_ms,
                }),
            ))
            .await;

        Ok(ExecutionReport { plan, results, summary, wall_clock_ms })
    }
}

fn strategy_name(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::RoundRobin => "round_robin",
        Strategy::CapabilityMatch => "capability_match",
        Strategy::SingleDevice => "single_device",
        Strategy::Duplicate => "duplicate",
    }
}
