// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `autotest devices` — print a table of discovered devices (§6).

use crate::adb::AdbClient;
use crate::config::AutotestConfig;
use crate::device::DeviceManager;

pub async fn run(config: &AutotestConfig) -> anyhow::Result<()> {
    let manager = DeviceManager::new(config.device.clone(), AdbClient::default());
    let serials = manager.discover().await?;

    if serials.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    println!("{:<24} {:<10}", "SERIAL", "STATE");
    for serial in serials {
        println!("{serial:<24} {:<10}", "device");
    }
    Ok(())
}
