// This file is part of REGISTRAR.
//
// Copyright (C) 2022 Veredictum Ltd.
//
// REGISTRAR is free software: you can redistribute it and/or modify it under
// the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// REGISTRAR is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with REGISTRAR. If not, see <https://www.gnu.org/licenses/>.

//! Resolver task scheduler.
//!
//! An explicit object owned by the registrar service: created with the
//! service, drained at shutdown. Tasks run on the global executor; the
//! scheduler only tracks how many are still in flight.

use async_std::task;
use std::{
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

/// Pause between checks while draining.
const DRAIN_SLEEP: Duration = Duration::from_millis(50);

/// Tracks the tasks spawned by the listener.
#[derive(Clone, Default)]
pub struct Scheduler {
    running: Arc<AtomicUsize>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    /// Spawn a task, keeping count of it until completion.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let running = self.running.clone();
        running.fetch_add(1, Ordering::SeqCst);
        task::spawn(async move {
            fut.await;
            running.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Number of tasks still in flight.
    pub fn in_flight(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait for every spawned task to finish.
    ///
    /// Termination is bounded by the tasks themselves; resolver tasks are in
    /// turn bounded by the chain client polling budget.
    pub async fn drain(&self) {
        while self.in_flight() > 0 {
            task::sleep(DRAIN_SLEEP).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_and_drain() {
        let scheduler = Scheduler::new();
        for _ in 0..5 {
            scheduler.spawn(async {
                task::sleep(Duration::from_millis(100)).await;
            });
        }
        assert!(scheduler.in_flight() > 0);

        task::block_on(scheduler.drain());

        assert_eq!(scheduler.in_flight(), 0);
    }

    #[test]
    fn drain_idle_scheduler() {
        let scheduler = Scheduler::new();

        task::block_on(scheduler.drain());

        assert_eq!(scheduler.in_flight(), 0);
    }
}
