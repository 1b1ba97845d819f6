//! Tick driver for a forest of root machines.

use super::node::{Node, NodeStatus};
use crate::core::ManualClock;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Owns the root machines and ticks them once per frame.
///
/// Roots are ticked in registration order; each root ticks its own started
/// children after evaluating its rules.
#[derive(Default)]
pub struct Driver {
    roots: Vec<Box<dyn Node>>,
    ticks: u64,
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root; returns its index for `root_mut`.
    pub fn register<N: Node + 'static>(&mut self, root: N) -> usize {
        debug!(root = root.name(), index = self.roots.len(), "root registered");
        self.roots.push(Box::new(root));
        self.roots.len() - 1
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Ticks performed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// True when no root is running.
    pub fn is_idle(&self) -> bool {
        self.roots.iter().all(|root| !root.is_started())
    }

    /// Tick every started root once.
    pub fn step(&mut self) {
        self.ticks += 1;
        for root in &mut self.roots {
            if !root.is_started() {
                continue;
            }
            root.tick();
            if !root.is_started() {
                match root.fault() {
                    Some(fault) => warn!(root = root.name(), %fault, "root aborted"),
                    None => info!(root = root.name(), "root completed"),
                }
            }
        }
    }

    /// Advance `clock` by `dt` and step, until idle or `max_ticks` steps.
    ///
    /// Returns the number of steps taken.
    pub fn run_manual(&mut self, clock: &ManualClock, dt: Duration, max_ticks: u64) -> u64 {
        let mut taken = 0;
        while taken < max_ticks && !self.is_idle() {
            clock.advance(dt);
            self.step();
            taken += 1;
        }
        taken
    }

    /// Step every `period` of real time until idle.
    ///
    /// Late ticks are skipped rather than bunched up. Runs on the current
    /// task; machines are not `Send`.
    pub async fn run(&mut self, period: Duration) -> u64 {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut taken = 0;
        while !self.is_idle() {
            ticker.tick().await;
            self.step();
            taken += 1;
        }
        info!(ticks = taken, "driver idle");
        taken
    }

    /// Started machines, depth first, with their depth in the tree.
    pub fn statuses(&mut self) -> Vec<(usize, NodeStatus)> {
        let mut out = Vec::new();
        for root in &mut self.roots {
            collect(&mut **root, 0, &mut out);
        }
        out
    }

    /// Borrow root `index` as its concrete machine type.
    pub fn root_mut<T: 'static>(&mut self, index: usize) -> Option<&mut T> {
        self.roots.get_mut(index)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn root(&self, index: usize) -> Option<&dyn Node> {
        self.roots.get(index).map(|root| &**root)
    }
}

fn collect(node: &mut dyn Node, depth: usize, out: &mut Vec<(usize, NodeStatus)>) {
    if !node.is_started() {
        return;
    }
    out.push((depth, node.status()));
    node.visit_children(&mut |child| collect(child, depth + 1, out));
}
