// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin host (§4.N, ambient/supplemental). Present in the original
//! implementation, dropped by the distilled spec, kept here as ambient
//! extensibility rather than a new feature family. Grounded on
//! `original_source/.../plugins/base.py` + `.../plugins/host.py` for the
//! lifecycle shape; builtin recognition backends (§4.J) are registered
//! through this host as the first "builtin plugins".

use std::sync::Arc;

use serde_json::Value;

use crate::error::{AutotestError, ErrorCode};
use crate::events::EventBus;

/// Context handed to every lifecycle hook: the shared event bus plus
/// this plugin's resolved config section (an arbitrary JSON value,
/// since plugin config shapes are not known to the host).
pub struct PluginContext {
    pub bus: Arc<EventBus>,
    pub config: Value,
}

/// Uniform lifecycle a capability provider implements. Plugins are
/// synchronous to set up/tear down; the capability they provide (e.g. a
/// [`crate::recognition::RecognitionBackend`]) is what does async work.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn on_init(&self, _ctx: &PluginContext) -> anyhow::Result<()> {
        Ok(())
    }
    fn on_start(&self, _ctx: &PluginContext) -> anyhow::Result<()> {
        Ok(())
    }
    fn on_stop(&self, _ctx: &PluginContext) -> anyhow::Result<()> {
        Ok(())
    }
    fn on_destroy(&self, _ctx: &PluginContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Ordered registry of loaded plugins, driving every hook through its
/// full lifecycle in registration order.
#[derive(Default)]
pub struct PluginHost {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn init_all(&self, ctx: &PluginContext) -> anyhow::Result<()> {
        for plugin in &self.plugins {
            plugin.on_init(ctx)?;
        }
        Ok(())
    }

    pub fn start_all(&self, ctx: &PluginContext) -> anyhow::Result<()> {
        for plugin in &self.plugins {
            plugin.on_start(ctx)?;
        }
        Ok(())
    }

    pub fn stop_all(&self, ctx: &PluginContext) -> anyhow::Result<()> {
        for plugin in &self.plugins {
            plugin.on_stop(ctx)?;
        }
        Ok(())
    }

    pub fn destroy_all(&self, ctx: &PluginContext) -> anyhow::Result<()> {
        for plugin in &self.plugins {
            plugin.on_destroy(ctx)?;
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Load third-party plugins from a directory of dynamic libraries or
    /// entry points. Dynamic loading of foreign code is an explicit
    /// Non-goal extension point for this controller — documented here,
    /// not implemented.
    pub fn load_from_directory(&mut self, _path: &std::path::Path) -> anyhow::Result<()> {
        Err(AutotestError::new(
            ErrorCode::Plugin,
            anyhow::anyhow!("dynamic plugin loading from a directory is not implemented"),
        )
        .into())
    }
}
