//! Reentrancy guard for contract evaluation
//!
//! Holds the callables currently evaluating their own pre- or postconditions.
//! A wrapper whose original is a member bypasses checking entirely, so a
//! condition that calls the function it guards does not recurse into
//! contract evaluation.
//!
//! One guard belongs to one enforcement scope. Membership is per callable,
//! not per thread: sharing a scope between threads that call instrumented
//! functions concurrently lets one thread's evaluation phase switch off
//! checking for the others.

use parking_lot::Mutex;
use std::collections::HashSet;

use super::value::ObjectId;

/// Set of callables inside an evaluation phase
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    enforcing: Mutex<HashSet<ObjectId>>,
}

impl ReentrancyGuard {
    /// Empty guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is currently evaluating its conditions
    pub fn is_enforcing(&self, id: ObjectId) -> bool {
        self.enforcing.lock().contains(&id)
    }

    /// Mark `id` as evaluating until the returned token drops
    pub fn enter(&self, id: ObjectId) -> Enforcing<'_> {
        self.enforcing.lock().insert(id);
        Enforcing { guard: self, id }
    }

    /// Number of callables currently evaluating
    pub fn len(&self) -> usize {
        self.enforcing.lock().len()
    }

    /// Whether no evaluation phase is in flight
    pub fn is_empty(&self) -> bool {
        self.enforcing.lock().is_empty()
    }
}

/// Membership token; releases on drop, including during unwinding.
#[must_use = "membership is released as soon as the token drops"]
pub struct Enforcing<'a> {
    guard: &'a ReentrancyGuard,
    id: ObjectId,
}

impl Drop for Enforcing<'_> {
    fn drop(&mut self) {
        self.guard.enforcing.lock().remove(&self.id);
    }
}
