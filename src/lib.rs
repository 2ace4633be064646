// SPDX-License-Identifier: MIT

//! orra-rs - turn a list of step functions into HTTP endpoints and a
//! compiled, linear workflow that threads a schema-checked state through them.

pub mod apps;
pub mod config;
pub mod error;
pub mod orra;
