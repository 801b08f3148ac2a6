// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test registry & filter (§4.F). Grounded on
//! `original_source/.../automation/decorators.py` (`_test_registry`
//! module global, last-write-wins registration,
//! `get_tests_by_tags`/`clear_registry`). The Design Notes call for
//! replacing hidden-global semantics with a parameterised object, so
//! [`TestRegistry`] is a plain struct; [`TestRegistry::global`] keeps
//! the process-wide singleton path for callers that want it.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock};

use crate::dsl::Device;

/// Outcome classification for a test handler (§4.H). `Assertion`
/// corresponds to the original's `AssertionError` branch (→ `failed`);
/// `Error` is any other failure (→ `error`).
#[derive(Debug, Clone)]
pub enum TestFailure {
    Assertion(String),
    Error(String),
}

impl TestFailure {
    pub fn message(&self) -> &str {
        match self {
            Self::Assertion(m) | Self::Error(m) => m,
        }
    }
}

impl std::fmt::Display for TestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for TestFailure {}

pub type TestOutcome = Result<(), TestFailure>;
pub type TestHandler =
    Arc<dyn Fn(Device) -> Pin<Box<dyn Future<Output = TestOutcome> + Send>> + Send + Sync>;

/// A registered test case (§3). Ordered by `-priority`, then
/// registration order.
#[derive(Clone)]
pub struct TestCaseInfo {
    pub name: String,
    pub handler: TestHandler,
    pub tags: Vec<String>,
    pub required_devices: Option<Vec<String>>,
    pub timeout_seconds: f64,
    pub retry_count: u32,
    pub priority: i64,
    pub description: String,
    sequence: u64,
}

impl std::fmt::Debug for TestCaseInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCaseInfo")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("required_devices", &self.required_devices)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("retry_count", &self.retry_count)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Builder for a [`TestCaseInfo`], mirroring the keyword arguments of
/// the original `@test_case(...)` decorator.
pub struct TestCaseBuilder {
    name: String,
    tags: Vec<String>,
    required_devices: Option<Vec<String>>,
    timeout_seconds: f64,
    retry_count: u32,
    priority: i64,
    description: String,
}

impl TestCaseBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            required_devices: None,
            timeout_seconds: 300.0,
            retry_count: 0,
            priority: 0,
            description: String::new(),
        }
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn required_devices(mut self, devices: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required_devices = Some(devices.into_iter().map(Into::into).collect());
        self
    }

    pub fn timeout_seconds(mut self, timeout: f64) -> Self {
        self.timeout_seconds = timeout;
        self
    }

    pub fn retry_count(mut self, retry: u32) -> Self {
        self.retry_count = retry;
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> TestCaseInfo
    where
        F: Fn(Device) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TestOutcome> + Send + 'static,
    {
        TestCaseInfo {
            name: self.name,
            handler: Arc::new(move |device| Box::pin(handler(device))),
            tags: self.tags,
            required_devices: self.required_devices,
            timeout_seconds: self.timeout_seconds,
            retry_count: self.retry_count,
            priority: self.priority,
            description: self.description,
            sequence: 0,
        }
    }
}

/// A lifecycle-scoped test registry. `name → TestCaseInfo`,
/// last-write-wins on re-registration.
#[derive(Default)]
pub struct TestRegistry {
    inner: Mutex<HashMap<String, TestCaseInfo>>,
    next_sequence: std::sync::atomic::AtomicU64,
}

static GLOBAL: OnceLock<TestRegistry> = OnceLock::new();

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, for callers using the implicit
    /// discovery path rather than an explicit instance.
    pub fn global() -> &'static TestRegistry {
        GLOBAL.get_or_init(TestRegistry::new)
    }

    /// Register a test case. Re-registration with the same name
    /// replaces the prior entry.
    pub fn register(&self, mut info: TestCaseInfo) {
        info.sequence = self.next_sequence.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).insert(info.name.clone(), info);
    }

    /// Run each loader, in order, to trigger registration — the Rust
    /// stand-in for dynamically importing `test_*.py` files, since this
    /// registry can't load arbitrary code at runtime. Each loader is a
    /// free function (typically one per test module) that calls
    /// `registry.register(...)` for every test case it defines.
    pub fn discover(&self, loaders: &[fn(&TestRegistry)]) -> usize {
        for loader in loaders {
            loader(self);
        }
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn all(&self) -> Vec<TestCaseInfo> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).values().cloned().collect()
    }

    /// Tag-OR and exact-name filter, sorted by priority descending,
    /// stable on registration order (§4.F).
    pub fn filter_by(&self, tags: Option<&[String]>, names: Option<&[String]>) -> Vec<TestCaseInfo> {
        let mut filtered: Vec<TestCaseInfo> = self.all();

        if let Some(tags) = tags {
            if !tags.is_empty() {
                filtered.retain(|t| t.tags.iter().any(|tag| tags.contains(tag)));
            }
        }
        if let Some(names) = names {
            if !names.is_empty() {
                filtered.retain(|t| names.contains(&t.name));
            }
        }

        filtered.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.sequence.cmp(&b.sequence)));
        filtered
    }

    /// Remove every registered test case (used for test isolation).
    pub fn clear(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy(name: &str, tags: &[&str], priority: i64) -> TestCaseInfo {
        TestCaseBuilder::new(name).tags(tags.iter().map(|s| s.to_string())).priority(priority).build(
            |_device| async move { Ok(()) },
        )
    }

    #[test]
    fn re_registration_is_last_write_wins() {
        let registry = TestRegistry::new();
        registry.register(dummy("t1", &[], 0));
        registry.register(dummy("t1", &["smoke"], 5));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.all()[0].tags, vec!["smoke".to_string()]);
    }

    #[test]
    fn filter_by_tags_is_or_logic() {
        let registry = TestRegistry::new();
        registry.register(dummy("a", &["smoke"], 0));
        registry.register(dummy("b", &["regression"], 0));
        registry.register(dummy("c", &[], 0));

        let tags = vec!["smoke".to_string(), "regression".to_string()];
        let filtered = registry.filter_by(Some(&tags), None);
        let names: Vec<_> = filtered.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn filter_sorts_by_priority_desc_stable_on_registration_order() {
        let registry = TestRegistry::new();
        registry.register(dummy("low", &[], 0));
        registry.register(dummy("high", &[], 10));
        registry.register(dummy("mid", &[], 5));
        registry.register(dummy("also_high", &[], 10));

        let names: Vec<_> = registry.filter_by(None, None).into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["high", "also_high", "mid", "low"]);
    }

    #[test]
    fn filter_by_is_idempotent() {
        let registry = TestRegistry::new();
        registry.register(dummy("a", &["smoke"], 1));
        registry.register(dummy("b", &[], 0));

        let tags = vec!["smoke".to_string()];
        let once: Vec<_> = registry.filter_by(Some(&tags), None).into_iter().map(|t| t.name).collect();
        let twice: Vec<_> = registry.filter_by(Some(&tags), None).into_iter().map(|t| t.name).collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn clear_empties_the_registry() {
        let registry = TestRegistry::new();
        registry.register(dummy("a", &[], 0));
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn global_registry_is_a_singleton() {
        let a = TestRegistry::global() as *const TestRegistry;
        let b = TestRegistry::global() as *const TestRegistry;
        assert_eq!(a, b);
    }
}
