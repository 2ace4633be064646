// SPDX-License-Identifier: MIT

//! The orchestrator - owns the schema, the step registry and the compiled plan
//!
//! Typical use:
//!
//! ```rust,no_run
//! use orra_rs::orra::{Orra, State, StateSchema, StepResult, TypeDescriptor};
//! use orra_rs::step;
//!
//! fn investigate(state: State) -> StepResult {
//!     Ok(state.with("source", "hello world"))
//! }
//!
//! # async fn run() -> Result<(), orra_rs::error::OrraError> {
//! let mut app = Orra::new(StateSchema::new().optional("source", TypeDescriptor::String));
//! app.register(step!(investigate))?;
//! let plan = app.compile()?;
//! let state = plan.invoke(State::new()).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::error::OrraError;
use crate::orra::graph::{build_graph, Compiler, Plan, WorkflowGraph};
use crate::orra::printer::{NullPrinter, Printer};
use crate::orra::registry::StepRegistry;
use crate::orra::state::{State, StateSchema};
use crate::orra::step::{Step, StepHandle};

/// A workflow application: a state schema plus an ordered list of steps
pub struct Orra {
    schema: Arc<StateSchema>,
    registry: StepRegistry,
    plan: Option<Arc<Plan>>,
}

impl Orra {
    pub fn new(schema: StateSchema) -> Self {
        Self {
            schema: Arc::new(schema),
            registry: StepRegistry::new(),
            plan: None,
        }
    }

    /// Register a step after the ones already registered.
    ///
    /// Fails once the workflow has been compiled; the compiled plan would
    /// no longer match the registry.
    pub fn register(&mut self, step: Step) -> Result<StepHandle, OrraError> {
        if self.plan.is_some() {
            return Err(OrraError::RegistryFrozen {
                name: step.name().to_string(),
            });
        }

        let step = self.registry.register(step)?;
        log::debug!("Registered step: {}", step.name());
        Ok(StepHandle::new(step, self.schema.clone()))
    }

    pub fn schema(&self) -> &Arc<StateSchema> {
        &self.schema
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Handles for every registered step, in registration order
    pub fn step_handles(&self) -> Vec<StepHandle> {
        self.registry
            .list()
            .iter()
            .map(|step| StepHandle::new(step.clone(), self.schema.clone()))
            .collect()
    }

    /// Graph for the steps registered so far
    pub fn graph(&self) -> WorkflowGraph {
        build_graph(self.registry.list())
    }

    /// Compile silently with debug logging off
    pub fn compile(&mut self) -> Result<Arc<Plan>, OrraError> {
        self.compile_with(&NullPrinter, false)
    }

    /// Build and compile the workflow graph, reporting progress to `printer`.
    ///
    /// Compiling again rebuilds an equivalent plan from the same registry.
    pub fn compile_with(
        &mut self,
        printer: &dyn Printer,
        debug: bool,
    ) -> Result<Arc<Plan>, OrraError> {
        if debug {
            printer.print("Initialising [debug] mode... Done!");
        }

        let graph = self.graph();
        let plan = Compiler::new(&self.registry, self.schema.clone())
            .debug(debug)
            .compile(&graph)?;
        printer.print("Compiling Orra application flow... Done!");

        if plan.is_empty() {
            log::warn!("Compiled a workflow with no steps; invoking it is a no-op");
        }
        printer.print("Prepared Orra application step endpoints... Done!");
        printer.print("Preparing Orra application flow endpoint... Done!");

        let plan = Arc::new(plan);
        self.plan = Some(plan.clone());
        Ok(plan)
    }

    pub fn is_compiled(&self) -> bool {
        self.plan.is_some()
    }

    /// The compiled plan; fails if [`Orra::compile`] has not run
    pub fn plan(&self) -> Result<Arc<Plan>, OrraError> {
        self.plan.clone().ok_or(OrraError::NotCompiled)
    }

    /// Compile and run the workflow once from an empty state
    pub async fn execute(&mut self) -> Result<State, OrraError> {
        let plan = match &self.plan {
            Some(plan) => plan.clone(),
            None => self.compile()?,
        };
        plan.invoke(State::new()).await
    }
}
