// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JUnit XML report emitter. Grounded on
//! `original_source/.../reporter/formats/junit_xml.py` (`ElementTree`
//! `<testsuite>`/`<testcase>` shape). No XML crate exists in this
//! crate's dependency stack, so the document is hand-built text, same
//! as the original's choice of stdlib `ElementTree` over a library.

use std::path::{Path, PathBuf};

use crate::model::{Summary, TestResult};

pub fn generate(output_dir: &Path, results: &[TestResult]) -> anyhow::Result<PathBuf> {
    let summary = Summary::from_results(results);
    let document = render(&summary, results);
    let path = output_dir.join("junit-results.xml");
    std::fs::write(&path, document)?;
    Ok(path)
}

fn render(summary: &Summary, results: &[TestResult]) -> String {
    let total_time_s: f64 = results.iter().map(|r| r.duration_ms).sum::<f64>() / 1000.0;

    let mut cases = String::new();
    for r in results {
        let classname = format!("autotest.{}", r.device_serial);
        let time_s = r.duration_ms / 1000.0;
        cases.push_str(&format!(
            "  <testcase name=\"{name}\" classname=\"{classname}\" time=\"{time:.3}\">\n",
            name = escape(&r.name),
            classname = escape(&classname),
            time = time_s,
        ));

        match r.status.as_str() {
            "failed" => {
                cases.push_str(&format!(
                    "    <failure message=\"{message}\"/>\n",
                    message = escape(r.error_message.as_deref().unwrap_or("assertion failed"))
                ));
            }
            "error" => {
                cases.push_str(&format!(
                    "    <error message=\"{message}\"/>\n",
                    message = escape(r.error_message.as_deref().unwrap_or("unknown error"))
                ));
            }
            "skipped" => cases.push_str("    <skipped/>\n"),
            _ => {}
        }

        cases.push_str("  </testcase>\n");
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<testsuite name=\"autotest\" tests=\"{tests}\" failures=\"{failures}\" errors=\"{errors}\" skipped=\"{skipped}\" time=\"{time:.3}\">\n\
{cases}\
</testsuite>\n",
        tests = summary.total,
        failures = summary.failed,
        errors = summary.error,
        skipped = summary.skipped,
        time = total_time_s,
        cases = cases,
    )
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestStatus;

    #[test]
    fn generate_writes_one_testcase_per_result_with_failure_elements() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![
            TestResult::new("a", TestStatus::Passed, "S1").with_duration_ms(100.0),
            TestResult::new("b", TestStatus::Failed, "S1").with_error("oops").with_duration_ms(50.0),
            TestResult::new("c", TestStatus::Skipped, "S1"),
        ];
        let path = generate(dir.path(), &results).unwrap();
        let xml = std::fs::read_to_string(path).unwrap();
        assert!(xml.contains("tests=\"3\""));
        assert!(xml.contains("failures=\"1\""));
        assert!(xml.contains("<failure message=\"oops\"/>"));
        assert!(xml.contains("<skipped/>"));
        assert!(xml.contains("classname=\"autotest.S1\""));
    }
}
