// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON report emitter. Grounded on
//! `original_source/.../reporter/formats/json_report.py`. This is the
//! canonical persisted form (§6) the other emitters can regenerate from.

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::model::{Summary, TestResult};

pub fn generate(output_dir: &Path, results: &[TestResult]) -> anyhow::Result<PathBuf> {
    let summary = Summary::from_results(results);

    let document = json!({
        "summary": {
            "total": summary.total,
            "passed": summary.passed,
            "failed": summary.failed,
            "error": summary.error,
            "skipped": summary.skipped,
            "pass_rate": summary.pass_rate(),
        },
        "results": results,
    });

    let path = output_dir.join("report.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&document)?)?;
    Ok(path)
}

/// Re-read a previously written `report.json` (§6, used by the
/// standalone `report` CLI subcommand to regenerate other formats).
pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Vec<TestResult>> {
    let raw = std::fs::read_to_string(path)?;
    let document: serde_json::Value = serde_json::from_str(&raw)?;
    let results = document
        .get("results")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("report.json is missing a 'results' array"))?;
    Ok(serde_json::from_value(results)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestStatus;

    #[test]
    fn generate_writes_summary_and_results() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![
            TestResult::new("a", TestStatus::Passed, "S1").with_duration_ms(5.0),
            TestResult::new("b", TestStatus::Failed, "S1").with_error("nope").with_duration_ms(2.0),
        ];
        let path = generate(dir.path(), &results).unwrap();
        let raw = std::fs::read_to_string(path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["summary"]["total"], 2);
        assert_eq!(parsed["summary"]["passed"], 1);
        assert_eq!(parsed["results"][1]["error_message"], "nope");
    }

    #[test]
    fn load_round_trips_generate() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![TestResult::new("a", TestStatus::Passed, "S1")];
        let path = generate(dir.path(), &results).unwrap();
        let loaded = load(path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "a");
    }
}
