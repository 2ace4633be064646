// SPDX-License-Identifier: MIT

pub mod graph;
pub mod orchestrator;
pub mod printer;
pub mod registry;
pub mod server;
pub mod state;
pub mod step;

pub use graph::{Invocable, Plan, WorkflowGraph, END};
pub use orchestrator::Orra;
pub use printer::{ConsolePrinter, NullPrinter, Printer};
pub use registry::StepRegistry;
pub use state::{State, StateSchema, TypeDescriptor};
pub use step::{Step, StepBody, StepHandle, StepResult};
