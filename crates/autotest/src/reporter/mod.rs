// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report generation (§4.N, ambient/supplemental): a finalised
//! `{summary, results, performance?}` tree dispatched to one or more
//! format emitters. Grounded on
//! `original_source/.../reporter/generator.py::ReportGenerator` — a
//! failure in one format is logged and does not abort the others.
//! `report.json` is the canonical persisted form (§6); the rest are
//! regenerable from it.

pub mod allure;
pub mod html;
pub mod json;
pub mod junit;

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::model::TestResult;

/// Dispatches a result set to the named format emitters, skipping
/// unknown formats with a warning and continuing past a single
/// generator's failure (§7: non-fatal, logged).
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    /// Generate every requested format, returning the paths actually
    /// written. `formats` defaults to `["html", "json"]` when empty,
    /// matching the original generator's default.
    pub fn generate(&self, results: &[TestResult], formats: &[String]) -> Vec<PathBuf> {
        let formats: Vec<String> =
            if formats.is_empty() { vec!["html".to_owned(), "json".to_owned()] } else { formats.to_vec() };

        let mut generated = Vec::with_capacity(formats.len());
        for fmt in formats {
            match self.generate_format(&fmt, results) {
                Ok(Some(path)) => {
                    info!(format = %fmt, path = %path.display(), "generated report");
                    generated.push(path);
                }
                Ok(None) => warn!(format = %fmt, "unknown report format"),
                Err(e) => error!(format = %fmt, error = %e, "failed to generate report"),
            }
        }
        generated
    }

    fn generate_format(&self, fmt: &str, results: &[TestResult]) -> anyhow::Result<Option<PathBuf>> {
        match fmt {
            "html" => Ok(Some(html::generate(&self.output_dir, results)?)),
            "json" => Ok(Some(json::generate(&self.output_dir, results)?)),
            "junit" | "junit_xml" => Ok(Some(junit::generate(&self.output_dir, results)?)),
            "allure" => Ok(Some(allure::generate(&self.output_dir, results)?)),
            _ => Ok(None),
        }
    }

    /// Load the canonical `report.json` back into a result list, for
    /// regenerating other formats without re-running tests (§6).
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Vec<TestResult>> {
        json::load(path)
    }
}
