// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool of [`DeviceClient`]s keyed by serial, with port allocation and
//! lifecycle management (§4.E). Grounded directly on the teacher's
//! `broker/registry.rs` (`PodRegistry`: `RwLock<HashMap<String, _>>`,
//! register/deregister shape) and on
//! `original_source/.../device/manager.py` for the monotonic port
//! counter (start 28900, stride 3) and the connect/rollback sequence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::adb::AdbClient;
use crate::config::DeviceConfig;
use crate::device::client::DeviceClient;
use crate::error::{AutotestError, ErrorCode};

const FIRST_LOCAL_PORT: u16 = 28900;
const PORTS_PER_DEVICE: u16 = 3;

struct PoolEntry {
    client: Arc<DeviceClient>,
    local_port_base: u16,
}

/// Owns the port allocator and the map from device serial to connected
/// client. A single manager instance is meant to outlive one `execute`
/// call (§3 "Lifecycle and ownership").
pub struct DeviceManager {
    config: DeviceConfig,
    adb: AdbClient,
    clients: tokio::sync::RwLock<HashMap<String, PoolEntry>>,
    next_local_port: AtomicU16,
}

impl DeviceManager {
    pub fn new(config: DeviceConfig, adb: AdbClient) -> Self {
        Self {
            config,
            adb,
            clients: tokio::sync::RwLock::new(HashMap::new()),
            next_local_port: AtomicU16::new(FIRST_LOCAL_PORT),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DeviceConfig::default(), AdbClient::default())
    }

    fn allocate_port_block(&self) -> u16 {
        self.next_local_port.fetch_add(PORTS_PER_DEVICE, Ordering::SeqCst)
    }

    /// Discover online ADB devices.
    pub async fn discover(&self) -> anyhow::Result<Vec<String>> {
        let devices = self.adb.list_devices().await?;
        let online: Vec<String> =
            devices.into_iter().filter(|d| d.state == "device").map(|d| d.serial).collect();
        info!(count = online.len(), "discovered online devices");
        Ok(online)
    }

    /// Connect to `serial`, reusing an existing connected client if one
    /// is already registered. On any forwarding or socket failure the
    /// already-installed forwards for this attempt are rolled back and
    /// the allocated port block is abandoned (§4.E step 3).
    pub async fn connect(&self, serial: &str) -> anyhow::Result<Arc<DeviceClient>> {
        if let Some(entry) = self.clients.read().await.get(serial) {
            if entry.client.state().await == crate::device::client::ConnectionState::Connected {
                return Ok(entry.client.clone());
            }
        }

        let local_base = self.allocate_port_block();
        let remote_ports = [self.config.control_port, self.config.binary_port, self.config.event_port];
        let mut installed = Vec::with_capacity(3);

        for (offset, remote) in remote_ports.iter().enumerate() {
            let local = local_base + offset as u16;
            match self.adb.forward(serial, local, *remote).await {
                Ok(true) => installed.push(local),
                Ok(false) | Err(_) => {
                    for local in &installed {
                        let _ = self.adb.forward_remove(serial, *local).await;
                    }
                    return Err(AutotestError::new(
                        ErrorCode::DeviceOffline,
                        anyhow::anyhow!("failed to set up port forwarding for {serial}"),
                    )
                    .into());
                }
            }
        }

        let client = Arc::new(DeviceClient::new("127.0.0.1", local_base, local_base + 2));
        if let Err(e) = client.connect().await {
            for local in &installed {
                let _ = self.adb.forward_remove(serial, *local).await;
            }
            return Err(e);
        }

        info!(serial, local_base, "connected to device");
        self.clients
            .write()
            .await
            .insert(serial.to_owned(), PoolEntry { client: client.clone(), local_port_base: local_base });
        Ok(client)
    }

    /// Discover and connect every online device, continuing past
    /// individual failures. Returns the serials that succeeded.
    pub async fn connect_all(&self) -> anyhow::Result<Vec<Arc<DeviceClient>>> {
        let serials = self.discover().await?;
        let mut clients = Vec::with_capacity(serials.len());
        for serial in serials {
            match self.connect(&serial).await {
                Ok(client) => clients.push(client),
                Err(e) => warn!(serial = %serial, error = %e, "failed to connect device"),
            }
        }
        Ok(clients)
    }

    /// Disconnect and remove the forwards for a single device.
    pub async fn disconnect(&self, serial: &str) {
        let entry = self.clients.write().await.remove(serial);
        let Some(entry) = entry else { return };
        entry.client.disconnect().await;
        for offset in 0..PORTS_PER_DEVICE {
            let _ = self.adb.forward_remove(serial, entry.local_port_base + offset).await;
        }
    }

    /// Disconnect every managed client. Safe to call repeatedly.
    pub async fn disconnect_all(&self) {
        let serials: Vec<String> = self.clients.read().await.keys().cloned().collect();
        for serial in serials {
            self.disconnect(&serial).await;
        }
    }

    pub async fn get_client(&self, serial: &str) -> Option<Arc<DeviceClient>> {
        self.clients.read().await.get(serial).map(|e| e.client.clone())
    }

    pub async fn connected_serials(&self) -> Vec<String> {
        let clients = self.clients.read().await;
        let mut serials = Vec::with_capacity(clients.len());
        for (serial, entry) in clients.iter() {
            if entry.client.state().await == crate::device::client::ConnectionState::Connected {
                serials.push(serial.clone());
            }
        }
        serials
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.config.command_timeout_secs)
    }

    /// Run `body` with the manager, guaranteeing `disconnect_all` runs
    /// afterwards regardless of whether `body` succeeded — the closest
    /// stand-in for the original's `async with DeviceManager() as
    /// manager:` scope (§4.E, open question (c)). Rust has no async
    /// `Drop`, so callers that need the guarantee call this instead of
    /// holding the manager bare.
    pub async fn with_connected_scope<F, Fut, T>(self: Arc<Self>, body: F) -> T
    where
        F: FnOnce(Arc<Self>) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let result = body(self.clone()).await;
        self.disconnect_all().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discover_filters_to_online_devices() {
        // Without a real adb binary on PATH this will error; the
        // manager must still construct and the error must not panic.
        let manager = DeviceManager::new(DeviceConfig::default(), AdbClient::new("definitely-not-adb"));
        assert!(manager.discover().await.is_err());
    }

    #[tokio::test]
    async fn port_allocation_is_monotonic_with_stride_three() {
        let manager = DeviceManager::new(DeviceConfig::default(), AdbClient::new("definitely-not-adb"));
        let first = manager.allocate_port_block();
        let second = manager.allocate_port_block();
        assert_eq!(first, FIRST_LOCAL_PORT);
        assert_eq!(second, FIRST_LOCAL_PORT + PORTS_PER_DEVICE);
    }

    #[tokio::test]
    async fn connect_to_unreachable_device_fails_and_rolls_back() {
        let manager = DeviceManager::new(DeviceConfig::default(), AdbClient::new("definitely-not-adb"));
        let result = manager.connect("ABC123").await;
        assert!(result.is_err());
        assert!(manager.get_client("ABC123").await.is_none());
    }

    #[tokio::test]
    async fn disconnect_all_on_empty_pool_is_a_no_op() {
        let manager = DeviceManager::new(DeviceConfig::default(), AdbClient::new("definitely-not-adb"));
        manager.disconnect_all().await;
        assert!(manager.connected_serials().await.is_empty());
    }
}
