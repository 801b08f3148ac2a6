// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `autotest` binary as a subprocess against a fake
//! `adb` on `PATH` and a minimal on-device WebSocket agent standing in
//! for real hardware. Reuses [`autotest::protocol::Message`] as the wire
//! type so the harness never reinvents the framing it is testing
//! against.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;

use autotest::protocol::{Message, MessageType};

/// Resolve the path to the compiled `autotest` binary.
pub fn autotest_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(Path::parent).unwrap_or(manifest);
    let exe = if cfg!(windows) { "autotest.exe" } else { "autotest" };
    workspace.join("target").join("debug").join(exe)
}

/// A fake `adb` placed first on `PATH`. `devices -l` reports one fixed
/// serial; every `forward`/`forward --remove`/`shell`/`install` call
/// just exits 0 — the mock agent already listens directly on the
/// "local" port a real `adb forward` would have bridged, so there is
/// nothing left for the fake binary to do.
pub struct FakeAdb {
    dir: tempfile::TempDir,
}

impl FakeAdb {
    pub fn new(serial: &str, model: &str) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let script_path = dir.path().join("adb");
        let script = format!(
            "#!/bin/sh\n\
case \"$1\" in\n\
  devices)\n\
    echo 'List of devices attached'\n\
    echo '{serial}\tdevice model:{model}'\n\
    ;;\n\
  *)\n\
    exit 0\n\
    ;;\n\
esac\n"
        );
        std::fs::write(&script_path, script)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755))?;
        }
        Ok(Self { dir })
    }

    /// The directory to prepend to `PATH` so this script shadows any real `adb`.
    pub fn path_dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Minimal on-device agent. Binds the control and event sockets a fresh
/// `DeviceManager`'s port allocator would forward to (`local_base`,
/// `local_base + 2`) and answers `device.info` requests on the control
/// channel with `info`; every other method echoes back an empty
/// success, which is enough for this crate's smoke tests.
pub struct MockAgent {
    control: tokio::task::JoinHandle<()>,
    event: tokio::task::JoinHandle<()>,
}

impl MockAgent {
    pub async fn start(local_base: u16, info: Value) -> anyhow::Result<Self> {
        let control_listener = TcpListener::bind(("127.0.0.1", local_base)).await?;
        let event_listener = TcpListener::bind(("127.0.0.1", local_base + 2)).await?;

        let control = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = control_listener.accept().await else { break };
                let info = info.clone();
                tokio::spawn(async move {
                    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else { return };
                    let (mut sink, mut stream) = ws.split();
                    while let Some(Ok(frame)) = stream.next().await {
                        let tokio_tungstenite::tungstenite::Message::Text(text) = frame else { continue };
                        let Ok(request) = Message::decode(&text) else { continue };
                        if request.message_type != MessageType::Request {
                            continue;
                        }
                        let response = match request.method.as_deref() {
                            Some("device.info") => Message::response_ok(request.id, info.clone()),
                            _ => Message::response_ok(request.id, serde_json::json!({})),
                        };
                        let Ok(encoded) = response.encode() else { continue };
                        if sink.send(tokio_tungstenite::tungstenite::Message::Text(encoded.into())).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        let event = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = event_listener.accept().await else { break };
                tokio::spawn(async move {
                    let _ = tokio_tungstenite::accept_async(stream).await;
                });
            }
        });

        Ok(Self { control, event })
    }
}

impl Drop for MockAgent {
    fn drop(&mut self) {
        self.control.abort();
        self.event.abort();
    }
}

/// Write a minimal YAML config with short timeouts (so a misbehaving
/// smoke test fails fast instead of hanging) and return its path.
pub fn write_config(dir: &Path) -> anyhow::Result<PathBuf> {
    let path = dir.join("autotest.yaml");
    let mut file = std::fs::File::create(&path)?;
    write!(file, "device:\n  connect_timeout_secs: 2.0\n  command_timeout_secs: 5.0\n")?;
    Ok(path)
}

/// Run the `autotest` binary to completion with `PATH` shadowed by
/// `fake_adb` and the given config, returning its captured output.
pub async fn run_autotest(args: &[&str], config_path: &Path, fake_adb: &FakeAdb) -> anyhow::Result<std::process::Output> {
    let binary = autotest_binary();
    anyhow::ensure!(binary.exists(), "autotest binary not found at {}", binary.display());

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    let mut paths = vec![fake_adb.path_dir().to_path_buf()];
    paths.extend(std::env::split_paths(&path_var));
    let new_path = std::env::join_paths(paths)?;

    let output = tokio::process::Command::new(binary)
        .args(args)
        .env("PATH", new_path)
        .env("AUTOTEST_CONFIG", config_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;
    Ok(output)
}
