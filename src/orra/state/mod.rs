// SPDX-License-Identifier: MIT

//! State management for workflows
//!
//! This module provides:
//! - `StateSchema` - declares the fields and types a workflow state may hold
//! - `State` - the value threaded from step to step

mod schema;
mod store;

pub use schema::{StateSchema, TypeDescriptor};
pub use store::State;
