// SPDX-License-Identifier: MIT

pub mod catalog;
pub mod engine;
pub mod executor;
pub mod graph;
pub mod loader;
pub mod registry;
pub mod state;
pub mod types;

pub use engine::{Engine, RunHandle};
pub use executor::{ProviderExecutor, WorkExecutor};
pub use loader::UnitLoader;
pub use types::{RunStatus, StatusEntry, UnitId, UnitParams, WorkUnit};
