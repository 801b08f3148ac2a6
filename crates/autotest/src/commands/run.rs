// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `autotest run` — discover, filter, execute, report (§6, §4.O).
//!
//! `paths` are matched as exact test-name filters against the
//! compiled-in registry rather than loaded as files: this controller
//! has no dynamic module-import counterpart to the original's
//! discover-by-path, so the registered test name is the nearest
//! in-language equivalent to "a test file".

use std::sync::Arc;

use tracing::info;

use crate::adb::AdbClient;
use crate::cli::RunArgs;
use crate::config::AutotestConfig;
use crate::device::DeviceManager;
use crate::events::EventBus;
use crate::model::{Summary, TestResult};
use crate::recognition;
use crate::registry::TestRegistry;
use crate::reporter::ReportGenerator;
use crate::scheduler::{ParallelExecutor, Runner, Strategy};

pub async fn run(config: &AutotestConfig, args: RunArgs) -> anyhow::Result<Summary> {
    let registry = TestRegistry::global();
    let tags = if args.tags.is_empty() { None } else { Some(args.tags.as_slice()) };
    let names = if args.paths.is_empty() { None } else { Some(args.paths.as_slice()) };
    let tests = registry.filter_by(tags, names);

    info!(count = tests.len(), "selected tests for this run");

    let manager = Arc::new(DeviceManager::new(config.device.clone(), AdbClient::default()));
    let bus = Arc::new(EventBus::new());
    let recognition = recognition::auto_detect(&config.ocr);

    let results: Vec<TestResult> = if let Some(serial) = &args.device {
        let client = manager.connect(serial).await?;
        let runner = Runner::new(serial.clone(), client, recognition, bus.clone());
        runner.run_all(tests).await
    } else {
        let max_workers = if args.parallel { config.runner.max_workers } else { 1 };
        let executor = ParallelExecutor::new(manager.clone(), bus.clone(), recognition).with_max_workers(max_workers);
        let report = executor.execute(tests, Strategy::CapabilityMatch).await?;
        report.results
    };

    manager.disconnect_all().await;

    let summary = Summary::from_results(&results);
    print_summary_table(&results, &summary);

    let formats = if args.formats.is_empty() { config.reporter.formats.clone() } else { args.formats.clone() };
    let generator = ReportGenerator::new(&args.output)?;
    for path in generator.generate(&results, &formats) {
        println!("wrote {}", path.display());
    }

    Ok(summary)
}

fn print_summary_table(results: &[TestResult], summary: &Summary) {
    println!("{:<32} {:<16} {:<10} {:<10}", "TEST", "DEVICE", "STATUS", "DURATION_MS");
    for r in results {
        println!("{:<32} {:<16} {:<10} {:<10.1}", r.name, r.device_serial, r.status.as_str(), r.duration_ms);
    }
    println!(
        "\n{} total, {} passed, {} failed, {} error, {} skipped ({:.1}% pass rate)",
        summary.total, summary.passed, summary.failed, summary.error, summary.skipped, summary.pass_rate(),
    );
}
