// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `autotest info SERIAL` — fetch and print one device's metadata (§6).

use crate::adb::AdbClient;
use crate::config::AutotestConfig;
use crate::device::DeviceManager;
use crate::dsl::Device;

pub async fn run(config: &AutotestConfig, serial: &str) -> anyhow::Result<()> {
    let manager = DeviceManager::new(config.device.clone(), AdbClient::default());
    let client = manager.connect(serial).await?;
    let device = Device::new(serial, client, None);
    let info = device.info().await?;

    println!("serial:          {}", info.serial);
    println!("state:           {:?}", info.state);
    println!("model:           {}", info.model.as_deref().unwrap_or("unknown"));
    println!("brand:           {}", info.brand.as_deref().unwrap_or("unknown"));
    println!("abi:             {}", info.abi.as_deref().unwrap_or("unknown"));
    println!("sdk:             {}", info.sdk.map(|v| v.to_string()).unwrap_or_else(|| "unknown".to_owned()));
    println!(
        "screen:          {}x{}",
        info.screen_width.map(|v| v.to_string()).unwrap_or_else(|| "?".to_owned()),
        info.screen_height.map(|v| v.to_string()).unwrap_or_else(|| "?".to_owned()),
    );
    println!("rooted:          {}", info.rooted);
    println!("accessibility:   {}", info.a11y_enabled);

    manager.disconnect(serial).await;
    Ok(())
}
