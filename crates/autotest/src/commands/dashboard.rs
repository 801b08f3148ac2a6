// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `autotest dashboard` — start the live web dashboard (§6).

use std::path::PathBuf;
use std::sync::Arc;

use crate::events::EventBus;

pub async fn run(host: &str, port: u16, reports: PathBuf) -> anyhow::Result<()> {
    let bus = Arc::new(EventBus::new());
    crate::dashboard::serve(host, port, reports, bus).await
}
