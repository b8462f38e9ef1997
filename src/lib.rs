// SPDX-License-Identifier: MIT

//! agentflow-rs: run a dependency graph of LLM agents against one prompt
//!
//! - [`adk`] - model providers, credential stores, error types
//! - [`flow`] - unit definitions, dependency graph, status tracking and the
//!   round-based execution engine
//! - [`config`] - environment-driven settings

pub mod adk;
pub mod config;
pub mod flow;
