//! Compiled plan and execution engine

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::OrraError;
use crate::orra::state::{State, StateSchema};
use crate::orra::step::{Step, StepHandle};

/// Anything the endpoint adapter can run against a state: the whole
/// compiled plan, or a single step.
#[async_trait]
pub trait Invocable: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Run against `state`, stopping early if `cancel` fires
    async fn call(&self, state: State, cancel: CancellationToken) -> Result<State, OrraError>;
}

/// Executable form of a workflow graph.
///
/// Holds the ordered step bodies and nothing per-invocation, so one plan can
/// serve any number of concurrent invocations.
pub struct Plan {
    steps: Vec<Arc<Step>>,
    schema: Arc<StateSchema>,
    debug: bool,
    flow: String,
}

impl Plan {
    pub(crate) fn new(steps: Vec<Arc<Step>>, schema: Arc<StateSchema>, debug: bool) -> Self {
        let flow = steps
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(" -> ");

        Self {
            steps,
            schema,
            debug,
            flow,
        }
    }

    /// Step names in execution order
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name())
    }

    pub fn describe(&self) -> &str {
        &self.flow
    }

    pub fn schema(&self) -> &Arc<StateSchema> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, starting from `initial`
    pub async fn invoke(&self, initial: State) -> Result<State, OrraError> {
        self.invoke_with_cancel(initial, &CancellationToken::new()).await
    }

    /// Run every step in order, stopping at the next step boundary or
    /// suspension point once `cancel` fires.
    ///
    /// Each step's output replaces the working state and must satisfy the
    /// schema. The first failing step ends the invocation; later steps never
    /// run and no partial state is returned.
    pub async fn invoke_with_cancel(
        &self,
        initial: State,
        cancel: &CancellationToken,
    ) -> Result<State, OrraError> {
        if self.steps.is_empty() {
            log::warn!("Workflow has no steps; returning initial state unchanged");
            return Ok(initial);
        }

        let run_id = Uuid::new_v4();
        log::info!("[{}] Invoking workflow: {}", run_id, self.flow);

        let mut current = initial;
        for (i, step) in self.steps.iter().enumerate() {
            log::debug!(
                "[{}] Step {}/{}: {}",
                run_id,
                i + 1,
                self.steps.len(),
                step.name()
            );
            if self.debug {
                log::debug!("[{}] {} input: {}", run_id, step.name(), current.to_json());
            }

            let next = match step.call(current, cancel).await {
                Ok(next) => next,
                Err(e) => {
                    if e.is_cancelled() {
                        log::warn!("[{}] Cancelled at step {}", run_id, step.name());
                    } else {
                        log::error!("[{}] Step {} failed: {}", run_id, step.name(), e);
                    }
                    return Err(e);
                }
            };

            if let Err(e) = self.schema.check(&next) {
                log::error!(
                    "[{}] Step {} returned an invalid state: {}",
                    run_id,
                    step.name(),
                    e
                );
                return Err(OrraError::step(step.name(), e));
            }

            if self.debug {
                log::debug!("[{}] {} output: {}", run_id, step.name(), next.to_json());
            }
            current = next;
        }

        log::info!("[{}] Workflow completed", run_id);
        Ok(current)
    }

    /// Blocking variant of [`Plan::invoke`] for callers outside a tokio
    /// runtime. Fails with [`OrraError::Runtime`] when called from within one.
    pub fn invoke_blocking(&self, initial: State) -> Result<State, OrraError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(OrraError::Runtime(
                "invoke_blocking called from within a tokio runtime; use invoke".to_string(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.invoke(initial))
    }
}

#[async_trait]
impl Invocable for Plan {
    fn name(&self) -> &str {
        "flow"
    }

    async fn call(&self, state: State, cancel: CancellationToken) -> Result<State, OrraError> {
        self.invoke_with_cancel(state, &cancel).await
    }
}

#[async_trait]
impl Invocable for StepHandle {
    fn name(&self) -> &str {
        StepHandle::name(self)
    }

    async fn call(&self, state: State, cancel: CancellationToken) -> Result<State, OrraError> {
        self.invoke_with_cancel(state, &cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orra::state::TypeDescriptor;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn schema() -> Arc<StateSchema> {
        Arc::new(
            StateSchema::new()
                .optional("a", TypeDescriptor::String)
                .optional("b", TypeDescriptor::String)
                .optional("log", TypeDescriptor::list_of(TypeDescriptor::String)),
        )
    }

    fn plan(steps: Vec<Step>) -> Plan {
        Plan::new(steps.into_iter().map(Arc::new).collect(), schema(), false)
    }

    // Step that appends its name to a shared call log
    fn recording(name: &'static str, calls: Arc<Mutex<Vec<&'static str>>>) -> Step {
        Step::direct(name, move |state| {
            calls.lock().unwrap().push(name);
            Ok(state)
        })
    }

    #[tokio::test]
    async fn test_empty_plan_is_noop() {
        let plan = plan(vec![]);
        let initial = State::try_from(json!({"x": 1})).unwrap();

        let result = plan.invoke(initial.clone()).await.unwrap();
        assert_eq!(result, initial);
    }

    #[tokio::test]
    async fn test_state_flows_between_steps() {
        let plan = plan(vec![
            Step::direct("step1", |state| Ok(state.with("a", "1"))),
            Step::direct("step2", |state| {
                let a = state.get_str("a").unwrap_or_default().to_string();
                Ok(state.with("b", format!("{}2", a)))
            }),
        ]);

        let result = plan.invoke(State::new()).await.unwrap();
        assert_eq!(result.to_json(), json!({"a": "1", "b": "12"}));
    }

    #[tokio::test]
    async fn test_output_replaces_working_state() {
        let plan = plan(vec![
            Step::direct("set", |state| Ok(state.with("a", "x").with("b", "y"))),
            Step::direct("reset", |_| Ok(State::new().with("b", "only"))),
        ]);

        let result = plan.invoke(State::new()).await.unwrap();
        assert_eq!(result.to_json(), json!({"b": "only"}));
    }

    #[tokio::test]
    async fn test_steps_run_once_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let plan = plan(vec![
            recording("first", calls.clone()),
            recording("second", calls.clone()),
            recording("third", calls.clone()),
        ]);

        plan.invoke(State::new()).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_suspension_completes_before_next_step() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let slow_calls = calls.clone();
        let plan = plan(vec![
            Step::suspending("slow", move |state| {
                let calls = slow_calls.clone();
                async move {
                    calls.lock().unwrap().push("slow:start");
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    calls.lock().unwrap().push("slow:end");
                    Ok(state)
                }
            }),
            recording("after", calls.clone()),
        ]);

        plan.invoke(State::new()).await.unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["slow:start", "slow:end", "after"]
        );
    }

    #[tokio::test]
    async fn test_failure_halts_remaining_steps() {
        let second_calls = Arc::new(AtomicUsize::new(0));
        let counter = second_calls.clone();
        let plan = plan(vec![
            Step::direct("step1", |_| Err("upstream unavailable".into())),
            Step::direct("step2", move |state| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(state)
            }),
        ]);

        let err = plan.invoke(State::new()).await.unwrap_err();
        assert!(matches!(err, OrraError::StepExecution { ref step, .. } if step == "step1"));
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_output_halts() {
        let plan = plan(vec![
            Step::direct("bad", |state| Ok(state.with("a", 42))),
            Step::direct("unreached", |_| panic!("must not run")),
        ]);

        let err = plan.invoke(State::new()).await.unwrap_err();
        assert!(matches!(err, OrraError::StepExecution { ref step, .. } if step == "bad"));
        assert!(err.to_string().contains("a: expected string, found integer"));
    }

    #[tokio::test]
    async fn test_cancellation_stops_remaining_steps() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let plan = plan(vec![
            Step::suspending("waits", move |state| {
                let trigger = trigger.clone();
                async move {
                    trigger.cancel();
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(state)
                }
            }),
            Step::direct("unreached", |_| panic!("must not run")),
        ]);

        let err = plan
            .invoke_with_cancel(State::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, OrraError::Cancelled { step: Some(ref s) } if s == "waits"));
    }

    #[tokio::test]
    async fn test_invocations_do_not_share_state() {
        let plan = Arc::new(plan(vec![Step::direct("append", |state| {
            let mut log: Vec<String> = state
                .get("log")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default();
            log.push("ran".to_string());
            Ok(state.with("log", log))
        })]));

        let (first, second) = tokio::join!(plan.invoke(State::new()), plan.invoke(State::new()));
        assert_eq!(first.unwrap().to_json(), json!({"log": ["ran"]}));
        assert_eq!(second.unwrap().to_json(), json!({"log": ["ran"]}));
    }

    #[test]
    fn test_invoke_blocking() {
        let plan = plan(vec![Step::suspending("async_set", |state: State| async move {
            tokio::task::yield_now().await;
            Ok(state.with("a", "x"))
        })]);

        let result = plan.invoke_blocking(State::new()).unwrap();
        assert_eq!(result.to_json(), json!({"a": "x"}));
    }

    #[tokio::test]
    async fn test_invoke_blocking_inside_runtime_fails() {
        let plan = plan(vec![Step::direct("set_a", |state| Ok(state.with("a", "x")))]);

        let err = plan.invoke_blocking(State::new()).unwrap_err();
        assert!(matches!(err, OrraError::Runtime(_)));
    }

    #[test]
    fn test_describe() {
        let plan = plan(vec![
            Step::direct("investigate", Ok::<State, _>),
            Step::direct("research_topic", Ok::<State, _>),
        ]);
        assert_eq!(plan.describe(), "investigate -> research_topic");
        assert_eq!(plan.len(), 2);
    }
}
