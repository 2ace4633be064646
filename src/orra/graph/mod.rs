// SPDX-License-Identifier: MIT

//! Workflow graph construction, compilation and execution
//!
//! Registered steps become a linear graph (`builder`), the graph is checked
//! and resolved into a [`Plan`] (`compiler`), and the plan runs the steps one
//! after another (`executor`).

mod builder;
pub mod compiler;
pub mod executor;
pub mod types;

pub use builder::build_graph;
pub use compiler::{validate_graph, Compiler};
pub use executor::{Invocable, Plan};
pub use types::{Edge, WorkflowGraph, END};
