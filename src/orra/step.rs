// SPDX-License-Identifier: MIT

//! Steps - the named units of work a workflow is made of
//!
//! A step body is either *direct* (a plain function from state to state) or
//! *suspending* (an async function). Both run through [`Step::call`], which
//! awaits only the suspending case and checks for cancellation at the step
//! boundary and while suspended.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{OrraError, StepError};
use crate::orra::graph::END;
use crate::orra::state::{State, StateSchema};

/// Result of a step body
pub type StepResult = Result<State, StepError>;

/// Boxed future returned by suspending step bodies
pub type StepFuture = BoxFuture<'static, StepResult>;

type DirectFn = dyn Fn(State) -> StepResult + Send + Sync;
type SuspendingFn = dyn Fn(State) -> StepFuture + Send + Sync;

/// Callable body of a step
#[derive(Clone)]
pub enum StepBody {
    /// Runs to completion synchronously
    Direct(Arc<DirectFn>),
    /// Returns a future the engine awaits before moving on
    Suspending(Arc<SuspendingFn>),
}

impl fmt::Debug for StepBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepBody::Direct(_) => f.write_str("Direct"),
            StepBody::Suspending(_) => f.write_str("Suspending"),
        }
    }
}

/// A named unit of work
#[derive(Debug, Clone)]
pub struct Step {
    name: String,
    body: StepBody,
}

impl Step {
    pub fn new(name: impl Into<String>, body: StepBody) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    /// Create a step from a synchronous function
    pub fn direct<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(State) -> StepResult + Send + Sync + 'static,
    {
        Self::new(name, StepBody::Direct(Arc::new(func)))
    }

    /// Create a step from an async function
    pub fn suspending<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(State) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepResult> + Send + 'static,
    {
        Self::new(
            name,
            StepBody::Suspending(Arc::new(move |state| Box::pin(func(state)))),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &StepBody {
        &self.body
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self.body, StepBody::Suspending(_))
    }

    /// Run the step body once.
    ///
    /// A token cancelled before the call stops the step from starting; a
    /// token cancelled while a suspending body is pending drops that body's
    /// future. Either way the result is [`OrraError::Cancelled`].
    pub async fn call(&self, state: State, cancel: &CancellationToken) -> Result<State, OrraError> {
        if cancel.is_cancelled() {
            return Err(self.cancelled());
        }

        let result = match &self.body {
            StepBody::Direct(func) => func(state),
            StepBody::Suspending(func) => {
                let pending = func(state);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(self.cancelled()),
                    result = pending => result,
                }
            }
        };

        result.map_err(|e| OrraError::step(&self.name, e))
    }

    fn cancelled(&self) -> OrraError {
        OrraError::Cancelled {
            step: Some(self.name.clone()),
        }
    }
}

/// Check that a step name can serve as a graph node id and an endpoint path
pub fn validate_name(name: &str) -> Result<(), OrraError> {
    let invalid = |reason: &str| OrraError::InvalidStepName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name == END {
        return Err(invalid("name is reserved for the end sentinel"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid(
            "only ASCII letters, digits, '_' and '-' are allowed",
        ));
    }
    Ok(())
}

/// Handle returned by registration; runs its step on its own, outside the
/// compiled plan, validating the output against the workflow schema.
#[derive(Debug, Clone)]
pub struct StepHandle {
    step: Arc<Step>,
    schema: Arc<StateSchema>,
}

impl StepHandle {
    pub(crate) fn new(step: Arc<Step>, schema: Arc<StateSchema>) -> Self {
        Self { step, schema }
    }

    pub fn name(&self) -> &str {
        self.step.name()
    }

    pub fn step(&self) -> &Arc<Step> {
        &self.step
    }

    /// Run this step alone
    pub async fn invoke(&self, state: State) -> Result<State, OrraError> {
        self.invoke_with_cancel(state, &CancellationToken::new()).await
    }

    pub async fn invoke_with_cancel(
        &self,
        state: State,
        cancel: &CancellationToken,
    ) -> Result<State, OrraError> {
        let output = self.step.call(state, cancel).await?;
        self.schema
            .check(&output)
            .map_err(|e| OrraError::step(self.step.name(), e))?;
        Ok(output)
    }
}

/// Build a [`Step`] named after a function.
///
/// `step!(my_fn)` wraps a synchronous function, `step!(async my_fn)` an
/// async one.
#[macro_export]
macro_rules! step {
    (async $func:ident) => {
        $crate::orra::step::Step::suspending(stringify!($func), $func)
    };
    ($func:ident) => {
        $crate::orra::step::Step::direct(stringify!($func), $func)
    };
}
