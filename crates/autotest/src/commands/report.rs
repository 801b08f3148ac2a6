// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `autotest report INPUT_DIR` — regenerate report formats from a
//! previously persisted `report.json` (§6), without re-running tests.

use std::path::Path;

use crate::reporter::ReportGenerator;

pub fn run(input_dir: &Path, formats: &[String]) -> anyhow::Result<()> {
    let report_json = input_dir.join("report.json");
    let results = ReportGenerator::load(&report_json)?;

    let generator = ReportGenerator::new(input_dir)?;
    let written = generator.generate(&results, formats);

    for path in &written {
        println!("wrote {}", path.display());
    }
    Ok(())
}
