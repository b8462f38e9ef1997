// SPDX-License-Identifier: MIT

//! Dependency graph, readiness and stall detection
//!
//! None of these mutate run state; the engine feeds them the tracker and
//! its pending set each round.

mod dependency;
mod readiness;
mod stall;

pub use dependency::DependencyGraph;
pub use readiness::ready_units;
pub use stall::diagnose_stall;
