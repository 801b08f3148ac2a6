// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Allure report emitter: one JSON result file per test case under an
//! `allure-results/` directory. Grounded on
//! `original_source/.../reporter/formats/allure.py`.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;
use uuid::Uuid;

use crate::model::TestResult;

pub fn generate(output_dir: &Path, results: &[TestResult]) -> anyhow::Result<PathBuf> {
    let allure_dir = output_dir.join("allure-results");
    std::fs::create_dir_all(&allure_dir)?;

    let now_ms = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0);

    for r in results {
        let uuid = Uuid::new_v4();
        let stop = now_ms;
        let start = stop - r.duration_ms.round() as i64;

        let mut document = json!({
            "uuid": uuid.to_string(),
            "historyId": format!("{}::{}", r.name, r.device_serial),
            "name": r.name,
            "status": map_status(r.status.as_str()),
            "stage": "finished",
            "start": start,
            "stop": stop,
            "labels": [
                {"name": "suite", "value": "autotest"},
                {"name": "host", "value": r.device_serial},
                {"name": "framework", "value": "autotest"},
            ],
            "parameters": [],
        });

        if let Some(message) = &r.error_message {
            document["statusDetails"] = json!({"message": message});
        }
        if !r.screenshots.is_empty() {
            let attachments: Vec<_> = r
                .screenshots
                .iter()
                .map(|path| json!({"name": "screenshot", "source": path, "type": "image/png"}))
                .collect();
            document["attachments"] = json!(attachments);
        }

        let path = allure_dir.join(format!("{uuid}-result.json"));
        std::fs::write(path, serde_json::to_vec_pretty(&document)?)?;
    }

    Ok(allure_dir)
}

fn map_status(status: &str) -> &'static str {
    match status {
        "passed" => "passed",
        "failed" => "failed",
        "error" => "broken",
        "skipped" => "skipped",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestStatus;

    #[test]
    fn generate_writes_one_file_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![
            TestResult::new("a", TestStatus::Passed, "S1").with_duration_ms(10.0),
            TestResult::new("b", TestStatus::Error, "S1").with_error("boom").with_duration_ms(5.0),
        ];
        let allure_dir = generate(dir.path(), &results).unwrap();
        let entries: Vec<_> = std::fs::read_dir(&allure_dir).unwrap().collect();
        assert_eq!(entries.len(), 2);

        for entry in entries {
            let path = entry.unwrap().path();
            let raw = std::fs::read_to_string(path).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
            assert!(parsed["uuid"].is_string());
            assert!(parsed["status"].is_string());
        }
    }

    #[test]
    fn error_status_maps_to_broken() {
        assert_eq!(map_status("error"), "broken");
    }
}
