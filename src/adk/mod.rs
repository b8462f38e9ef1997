// SPDX-License-Identifier: MIT

//! Provider kit: model providers, credentials and error types

pub mod credentials;
pub mod error;
pub mod model;
