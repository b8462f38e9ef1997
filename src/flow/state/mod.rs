// SPDX-License-Identifier: MIT

//! Run state management
//!
//! The engine owns a [`StatusTracker`]; observers only see snapshots.

mod tracker;

pub use tracker::{progress_percent, StatusCounts, StatusTracker, StatusUpdate, Transition};
