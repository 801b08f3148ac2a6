// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `autotest` binary against
//! a fake `adb` and a mock on-device agent.

use autotest_specs::{run_autotest, write_config, FakeAdb, MockAgent};

const SERIAL: &str = "EMULATOR5554";

#[tokio::test]
async fn devices_lists_what_adb_reports() -> anyhow::Result<()> {
    let fake_adb = FakeAdb::new(SERIAL, "Pixel_7")?;
    let config_dir = tempfile::tempdir()?;
    let config = write_config(config_dir.path())?;

    let output = run_autotest(&["devices"], &config, &fake_adb).await?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains(SERIAL), "stdout was: {stdout}");
    Ok(())
}

#[tokio::test]
async fn devices_with_no_online_device_prints_placeholder() -> anyhow::Result<()> {
    // A fake adb that reports an unauthorized (not "device"-state) entry
    // is filtered out by `DeviceManager::discover`, leaving none online.
    let fake_adb = FakeAdb::new("UNAUTH01", "Pixel_7")?;
    std::fs::write(
        fake_adb.path_dir().join("adb"),
        "#!/bin/sh\ncase \"$1\" in\n  devices)\n    echo 'List of devices attached'\n    echo 'UNAUTH01\tunauthorized'\n    ;;\n  *)\n    exit 0\n    ;;\nesac\n",
    )?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(fake_adb.path_dir().join("adb"), std::fs::Permissions::from_mode(0o755))?;
    }

    let config_dir = tempfile::tempdir()?;
    let config = write_config(config_dir.path())?;

    let output = run_autotest(&["devices"], &config, &fake_adb).await?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("No devices found"), "stdout was: {stdout}");
    Ok(())
}

#[tokio::test]
async fn info_prints_metadata_from_the_connected_agent() -> anyhow::Result<()> {
    let fake_adb = FakeAdb::new(SERIAL, "Pixel_7")?;
    let config_dir = tempfile::tempdir()?;
    let config = write_config(config_dir.path())?;

    // A fresh process's first `connect()` always allocates local ports
    // starting at 28900 (control) / 28902 (events) — see
    // `DeviceManager`'s port allocator.
    let info = serde_json::json!({
        "model": "Pixel 7",
        "brand": "Google",
        "abi": "arm64-v8a",
        "sdk": 34,
        "screenWidth": 1080,
        "screenHeight": 2400,
        "rooted": false,
        "a11yEnabled": true,
    });
    let _agent = MockAgent::start(28900, info).await?;

    let output = run_autotest(&["info", SERIAL], &config, &fake_adb).await?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("model:           Pixel 7"), "stdout was: {stdout}");
    assert!(stdout.contains("brand:           Google"), "stdout was: {stdout}");
    assert!(stdout.contains("sdk:             34"), "stdout was: {stdout}");
    assert!(stdout.contains("screen:          1080x2400"), "stdout was: {stdout}");
    assert!(stdout.contains("accessibility:   true"), "stdout was: {stdout}");
    Ok(())
}

#[tokio::test]
async fn info_on_unreachable_device_fails_without_panicking() -> anyhow::Result<()> {
    let fake_adb = FakeAdb::new(SERIAL, "Pixel_7")?;
    let config_dir = tempfile::tempdir()?;
    let config = write_config(config_dir.path())?;

    // No mock agent listening: forwarding "succeeds" (the fake adb
    // always exits 0) but the WebSocket connect itself must fail.
    let output = run_autotest(&["info", SERIAL], &config, &fake_adb).await?;

    assert!(!output.status.success());
    Ok(())
}
