// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI surface (§4.O). Grounded on the teacher's `main.rs`
//! `Cli`-wrapping-`Config` + `Subcommand` shape, and `config.rs`'s
//! `#[arg(long, env = "...")]` global-flag style.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Ambient flags carried regardless of any feature Non-goal (§6):
/// config path, log level, log format, each with an `AUTOTEST_*`
/// environment fallback.
#[derive(Debug, Parser, Clone)]
pub struct GlobalArgs {
    #[arg(long, env = "AUTOTEST_CONFIG", default_value = "autotest.yaml", global = true)]
    pub config: PathBuf,

    #[arg(long, env = "AUTOTEST_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    #[arg(long, env = "AUTOTEST_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: String,
}

#[derive(Debug, Parser)]
#[command(name = "autotest", version, about = "PC-side controller for device-automated UI and performance tests.")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a table of discovered devices.
    Devices,

    /// Discover, filter, and execute tests.
    Run(RunArgs),

    /// Fetch and print a single device's metadata.
    Info(InfoArgs),

    /// Regenerate reports from a persisted `report.json`.
    Report(ReportArgs),

    /// Start the live web dashboard.
    Dashboard(DashboardArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Test-name filters. Since this controller has no dynamic module
    /// loading, these match against the name of a test already
    /// registered in the compiled-in registry, rather than a file path
    /// to load (the nearest in-language equivalent to the original's
    /// test-file discovery).
    pub paths: Vec<String>,

    #[arg(long = "tags")]
    pub tags: Vec<String>,

    #[arg(long)]
    pub device: Option<String>,

    #[arg(long)]
    pub parallel: bool,

    #[arg(long, default_value = "./reports")]
    pub output: PathBuf,

    #[arg(long = "formats")]
    pub formats: Vec<String>,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    pub serial: String,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    pub input_dir: PathBuf,

    #[arg(long = "formats")]
    pub formats: Vec<String>,
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8787)]
    pub port: u16,

    #[arg(long, default_value = "./reports")]
    pub reports: PathBuf,
}
