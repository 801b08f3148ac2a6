// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global `tracing` subscriber initialisation (§4.L). Grounded on the
//! teacher's `run.rs::init_tracing` (env-filter priority ladder,
//! `fmt().json()`/`fmt()` branch). Components log through named
//! `tracing` targets (`autotest::device`, `autotest::scheduler`, ...) so
//! `RUST_LOG=autotest::scheduler=debug`-style filtering works; no
//! custom sink is introduced beyond what `EnvFilter` already provides.

use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: &str = "info";

/// Initialise the process-wide subscriber. Priority: an explicit
/// `log_level` (from `--log-level`/config) wins, then `RUST_LOG`, then
/// the compiled-in default. Safe to call more than once — only the
/// first call takes effect.
pub fn init_tracing(log_level: Option<&str>, log_format: &str) {
    let explicit = log_level.filter(|l| !l.is_empty());

    let filter = match explicit {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL)),
    };

    let result = match log_format {
        "json" => tracing_subscriber::fmt().with_env_filter(filter).json().try_init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_does_not_panic_on_repeated_calls() {
        init_tracing(Some("warn"), "text");
        init_tracing(Some("debug"), "json");
    }
}
