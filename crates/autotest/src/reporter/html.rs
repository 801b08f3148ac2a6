// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-contained HTML report emitter. Grounded on
//! `original_source/.../reporter/formats/html.py`. The original's
//! performance chart section depends on a charting library with no
//! counterpart in this crate's dependency stack, so it is omitted; the
//! summary cards and results table are kept.

use std::path::{Path, PathBuf};

use crate::model::{Summary, TestResult};

pub fn generate(output_dir: &Path, results: &[TestResult]) -> anyhow::Result<PathBuf> {
    let summary = Summary::from_results(results);
    let document = render(&summary, results);
    let path = output_dir.join("report.html");
    std::fs::write(&path, document)?;
    Ok(path)
}

fn render(summary: &Summary, results: &[TestResult]) -> String {
    let mut rows = String::new();
    for r in results {
        let css_class = status_class(r.status.as_str());
        let error = r.error_message.as_deref().unwrap_or("");
        rows.push_str(&format!(
            "<tr class=\"{css_class}\"><td>{name}</td><td>{device}</td><td>{status}</td><td>{duration:.1}</td><td>{error}</td></tr>\n",
            css_class = css_class,
            name = escape(&r.name),
            device = escape(&r.device_serial),
            status = escape(r.status.as_str()),
            duration = r.duration_ms,
            error = escape(error),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Automated test report</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; color: #222; }}
.cards {{ display: flex; gap: 1rem; margin-bottom: 1.5rem; }}
.card {{ padding: 1rem 1.5rem; border-radius: 6px; background: #f4f4f4; min-width: 8rem; }}
.card h2 {{ margin: 0; font-size: 1.8rem; }}
.card.passed h2 {{ color: #2e7d32; }}
.card.failed h2 {{ color: #c62828; }}
.card.skipped h2 {{ color: #757575; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ text-align: left; padding: 0.5rem 0.75rem; border-bottom: 1px solid #ddd; }}
tr.passed td {{ background: #eef7ee; }}
tr.failed td, tr.error td {{ background: #fdecea; }}
tr.skipped td {{ background: #f2f2f2; }}
</style>
</head>
<body>
<h1>Automated test report</h1>
<div class="cards">
<div class="card"><h2>{total}</h2><div>Total</div></div>
<div class="card passed"><h2>{passed}</h2><div>Passed</div></div>
<div class="card failed"><h2>{failed_and_error}</h2><div>Failed / Error</div></div>
<div class="card skipped"><h2>{skipped}</h2><div>Skipped</div></div>
<div class="card"><h2>{pass_rate:.1}%</h2><div>Pass rate</div></div>
</div>
<table>
<thead><tr><th>Test</th><th>Device</th><th>Status</th><th>Duration (ms)</th><th>Error</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
</body>
</html>
"#,
        total = summary.total,
        passed = summary.passed,
        failed_and_error = summary.failed + summary.error,
        skipped = summary.skipped,
        pass_rate = summary.pass_rate(),
        rows = rows,
    )
}

fn status_class(status: &str) -> &'static str {
    match status {
        "passed" => "passed",
        "failed" => "failed",
        "error" => "error",
        "skipped" => "skipped",
        _ => "",
    }
}

fn escape(value: &str) -> String {
    value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestStatus;

    #[test]
    fn generate_writes_a_page_with_all_statuses_represented() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![
            TestResult::new("a", TestStatus::Passed, "S1"),
            TestResult::new("b", TestStatus::Failed, "S1").with_error("<boom>"),
        ];
        let path = generate(dir.path(), &results).unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("<html"));
        assert!(html.contains("&lt;boom&gt;"));
        assert!(html.contains("Pass rate"));
    }
}
