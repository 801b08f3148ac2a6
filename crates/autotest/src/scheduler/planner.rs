// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-to-device planner (§4.G). Grounded on
//! `original_source/.../scheduler/planner.py` (`TestPlanner.plan`,
//! `_round_robin`/`_capability_match`/`_single_device`/`_duplicate_all`).
//! Pure data transformation: no I/O, no new crates.

use std::collections::HashMap;

use crate::registry::TestCaseInfo;

/// Assignment strategy selected by the CLI or embedding caller (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    RoundRobin,
    CapabilityMatch,
    SingleDevice,
    Duplicate,
}

/// `serial -> ordered list of tests` plus any test that could not be
/// placed. Invariant (§3): under `round_robin`/`capability_match`/
/// `single_device`, every planned test appears in exactly one
/// assignment or in `unassigned`; under `duplicate`, every test appears
/// in every assignment.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub assignments: HashMap<String, Vec<TestCaseInfo>>,
    pub unassigned: Vec<TestCaseInfo>,
}

impl ExecutionPlan {
    fn empty_for(devices: &[String]) -> Self {
        let mut assignments = HashMap::with_capacity(devices.len());
        for serial in devices {
            assignments.insert(serial.clone(), Vec::new());
        }
        Self { assignments, unassigned: Vec::new() }
    }

    pub fn total_planned(&self) -> usize {
        self.assignments.values().map(Vec::len).sum::<usize>() + self.unassigned.len()
    }
}

/// Pure mapper from `(tests, devices, strategy)` to an [`ExecutionPlan`].
pub struct Planner;

impl Planner {
    /// Plan `tests` onto `devices` under `strategy`. An empty device
    /// list always yields every test in `unassigned` (§4.G, §8 boundary
    /// behavior), regardless of strategy.
    pub fn plan(tests: Vec<TestCaseInfo>, devices: &[String], strategy: Strategy) -> ExecutionPlan {
        if devices.is_empty() {
            return ExecutionPlan { assignments: HashMap::new(), unassigned: tests };
        }

        match strategy {
            Strategy::RoundRobin => Self::round_robin(tests, devices),
            Strategy::CapabilityMatch => Self::capability_match(tests, devices),
            Strategy::SingleDevice => Self::single_device(tests, devices),
            Strategy::Duplicate => Self::duplicate(tests, devices),
        }
    }

    /// Sort by priority desc (stable), then round-robin test `i` onto
    /// `devices[i % |devices|]` — equal-size partitions within ±1, and a
    /// device's own queue keeps the priority-desc order (§8 invariant 2).
    fn round_robin(mut tests: Vec<TestCaseInfo>, devices: &[String]) -> ExecutionPlan {
        tests.sort_by(|a, b| b.priority.cmp(&a.priority));
        let mut plan = ExecutionPlan::empty_for(devices);
        for (i, test) in tests.into_iter().enumerate() {
            let serial = &devices[i % devices.len()];
            plan.assignments.get_mut(serial).expect("pre-seeded").push(test);
        }
        plan
    }

    /// Tests with `required_devices` go to the least-loaded candidate in
    /// the intersection of their requirement list with `devices`; an
    /// empty intersection pushes the test to `unassigned`. Tests with no
    /// requirement go to the least-loaded device overall.
    fn capability_match(mut tests: Vec<TestCaseInfo>, devices: &[String]) -> ExecutionPlan {
        tests.sort_by(|a, b| b.priority.cmp(&a.priority));
        let mut plan = ExecutionPlan::empty_for(devices);

        for test in tests {
            let candidates: Vec<&String> = match &test.required_devices {
                Some(required) if !required.is_empty() => {
                    devices.iter().filter(|d| required.contains(d)).collect()
                }
                _ => devices.iter().collect(),
            };

            if candidates.is_empty() {
                plan.unassigned.push(test);
                continue;
            }

            let least_loaded = candidates
                .into_iter()
                .min_by_key(|serial| plan.assignments.get(*serial).map(Vec::len).unwrap_or(0))
                .expect("checked non-empty above");
            plan.assignments.get_mut(least_loaded).expect("pre-seeded").push(test);
        }

        plan
    }

    /// All tests to `devices[0]`, input order preserved (no priority
    /// sort — matches `duplicate`, unlike `round_robin`/`capability_match`).
    fn single_device(tests: Vec<TestCaseInfo>, devices: &[String]) -> ExecutionPlan {
        let mut plan = ExecutionPlan::empty_for(devices);
        plan.assignments.insert(devices[0].clone(), tests);
        plan
    }

    /// Every test to every device, in input order (§8 invariant 3: "the
    /// input test set, order preserved" — unlike the other strategies,
    /// duplicate does not re-sort by priority).
    fn duplicate(tests: Vec<TestCaseInfo>, devices: &[String]) -> ExecutionPlan {
        let mut plan = ExecutionPlan::empty_for(devices);
        for serial in devices {
            plan.assignments.insert(serial.clone(), tests.clone());
        }
        plan
    }
}
