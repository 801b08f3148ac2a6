// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-exec wrapper around the `adb` binary (§4.C). No retries at
//! this layer; callers decide what to do with a failed forward or shell.

use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbDeviceEntry {
    pub serial: String,
    pub state: String,
    pub model: Option<String>,
}

/// A thin subprocess collaborator over the `adb` binary.
pub struct AdbClient {
    binary: String,
}

impl Default for AdbClient {
    fn default() -> Self {
        Self::new("adb")
    }
}

impl AdbClient {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    async fn run(&self, args: &[&str]) -> anyhow::Result<(i32, String)> {
        debug!(binary = %self.binary, ?args, "running adb");
        let output = Command::new(&self.binary).args(args).output().await?;
        let code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let combined = if stdout.trim().is_empty() { stderr } else { stdout };
        Ok((code, combined))
    }

    /// List devices via `adb devices -l`, skipping the header line and
    /// extracting `model:X` when present.
    pub async fn list_devices(&self) -> anyhow::Result<Vec<AdbDeviceEntry>> {
        let (_, output) = self.run(&["devices", "-l"]).await?;
        let mut devices = Vec::new();
        for line in output.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let Some(serial) = fields.next() else { continue };
            let Some(state) = fields.next() else { continue };
            let model = fields.find_map(|tok| tok.strip_prefix("model:")).map(str::to_owned);
            devices.push(AdbDeviceEntry { serial: serial.to_owned(), state: state.to_owned(), model });
        }
        Ok(devices)
    }

    pub async fn forward(&self, serial: &str, local: u16, remote: u16) -> anyhow::Result<bool> {
        let local_spec = format!("tcp:{local}");
        let remote_spec = format!("tcp:{remote}");
        let (code, _) = self.run(&["-s", serial, "forward", &local_spec, &remote_spec]).await?;
        Ok(code == 0)
    }

    pub async fn forward_remove(&self, serial: &str, local: u16) -> anyhow::Result<bool> {
        let local_spec = format!("tcp:{local}");
        let (code, _) = self.run(&["-s", serial, "forward", "--remove", &local_spec]).await?;
        Ok(code == 0)
    }

    /// Run a shell command on the device. Returns `(exit_code, combined_output)`
    /// where stderr substitutes when stdout is empty.
    pub async fn shell(&self, serial: &str, cmd: &str) -> anyhow::Result<(i32, String)> {
        self.run(&["-s", serial, "shell", cmd]).await
    }

    pub async fn install(&self, serial: &str, path: &str, replace: bool) -> anyhow::Result<bool> {
        let mut args = vec!["-s", serial, "install"];
        if replace {
            args.push("-r");
        }
        args.push(path);
        let (code, _) = self.run(&args).await?;
        Ok(code == 0)
    }

    pub async fn push(&self, serial: &str, local: &str, remote: &str) -> anyhow::Result<bool> {
        let (code, _) = self.run(&["-s", serial, "push", local, remote]).await?;
        Ok(code == 0)
    }

    pub async fn pull(&self, serial: &str, remote: &str, local: &str) -> anyhow::Result<bool> {
        let (code, _) = self.run(&["-s", serial, "pull", remote, local]).await?;
        Ok(code == 0)
    }

    pub async fn get_prop(&self, serial: &str, prop: &str) -> anyhow::Result<String> {
        let (_, output) = self.run(&["-s", serial, "shell", "getprop", prop]).await?;
        Ok(output.trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_devices_l_output() {
        let output = "\
List of devices attached\n\
ABC123         device product:foo model:Pixel_7 device:panther transport_id:1\n\
DEF456         unauthorized\n\
\n";
        let devices: Vec<AdbDeviceEntry> = output
            .lines()
            .skip(1)
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let serial = fields.next()?;
                let state = fields.next()?;
                let model = fields.find_map(|tok| tok.strip_prefix("model:")).map(str::to_owned);
                Some(AdbDeviceEntry { serial: serial.to_owned(), state: state.to_owned(), model })
            })
            .collect();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "ABC123");
        assert_eq!(devices[0].model.as_deref(), Some("Pixel_7"));
        assert_eq!(devices[1].serial, "DEF456");
        assert_eq!(devices[1].model, None);
    }
}
