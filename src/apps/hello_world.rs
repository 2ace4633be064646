// SPDX-License-Identifier: MIT

//! Two-step demo: pick a topic, then research it
//!
//! `investigate` is a plain function; `research_topic` is async and stands in
//! for a call out to an agent. Each is served at `/flow/<name>` and together
//! they form the `/flow` workflow.

use std::time::Duration;

use crate::error::{OrraError, StepError};
use crate::orra::{Orra, State, StateSchema, StepResult, TypeDescriptor};
use crate::step;

pub fn schema() -> StateSchema {
    StateSchema::new()
        .optional("source", TypeDescriptor::String)
        .optional("researched", TypeDescriptor::String)
}

/// Build the demo orchestrator with its steps registered
pub fn app() -> Result<Orra, OrraError> {
    let mut app = Orra::new(schema());
    app.register(step!(investigate))?;
    app.register(step!(async research_topic))?;
    Ok(app)
}

fn investigate(state: State) -> StepResult {
    Ok(state.with("source", "hello world"))
}

async fn research_topic(state: State) -> StepResult {
    let topic = state
        .get_str("source")
        .ok_or_else(|| StepError::from("nothing to research: 'source' is not set"))?;

    let researched = research_topic_using_agent(topic).await;
    Ok(state.with("researched", researched))
}

async fn research_topic_using_agent(topic: &str) -> String {
    tokio::time::sleep(Duration::from_millis(10)).await;
    format!(
        "'{}' is a common phrase used in programming to demonstrate the basic syntax of a \
         programming language. It is believed to have originated from the book \"The C \
         Programming Language\" by Brian Kernighan and Dennis Ritchie.",
        topic
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_full_flow() {
        let mut app = app().unwrap();
        let state = app.execute().await.unwrap();

        assert_eq!(state.get("source"), Some(&json!("hello world")));
        assert!(state
            .get_str("researched")
            .unwrap()
            .starts_with("'hello world' is a common phrase"));
    }

    #[tokio::test]
    async fn test_research_needs_source() {
        let err = research_topic(State::new()).await.unwrap_err();
        assert!(err.to_string().contains("'source' is not set"));
    }

    #[test]
    fn test_step_order() {
        let app = app().unwrap();
        assert_eq!(app.graph().describe(), "investigate -> research_topic");
    }
}
