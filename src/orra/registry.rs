// SPDX-License-Identifier: MIT

use crate::error::OrraError;
use crate::orra::step::{validate_name, Step};
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered collection of registered steps.
///
/// Iteration follows registration order, which is also the execution order
/// of the compiled workflow. Steps are never removed.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: Vec<Arc<Step>>,
    index: HashMap<String, usize>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, step: Step) -> Result<Arc<Step>, OrraError> {
        validate_name(step.name())?;
        if self.index.contains_key(step.name()) {
            return Err(OrraError::DuplicateStep {
                name: step.name().to_string(),
            });
        }

        let step = Arc::new(step);
        self.index.insert(step.name().to_string(), self.steps.len());
        self.steps.push(step.clone());
        Ok(step)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Step>> {
        self.index.get(name).map(|&i| &self.steps[i])
    }

    /// Steps in registration order
    pub fn list(&self) -> &[Arc<Step>] {
        &self.steps
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
