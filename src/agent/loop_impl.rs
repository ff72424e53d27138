//! Agent loop - core message processing

use tracing::{debug, info, warn};
use crate::Result;
use crate::error::Error;
use super::llm::LlmClient;
use super::message::{Message, Response, ToolCall, ToolCallRequest};
use super::context::Context;

/// The agent loop processes messages through LLM and tool execution
pub struct AgentLoop<C: LlmClient> {
    client: C,
    max_iterations: usize,
}

impl<C: LlmClient> AgentLoop<C> {
    /// Create a new agent loop
    pub fn new(client: C, max_iterations: usize) -> Self {
        Self {
            client,
            max_iterations,
        }
    }

    pub fn model(&self) -> &str {
        self.client.default_model()
    }

    /// Run the agent loop for a single message
    pub async fn run(&self, history: &[Message], message: Message, ctx: &Context) -> Result<Response> {
        let mut messages = ctx.build_messages(history, &message.content);
        let tools = ctx.tool_runner.definitions();
        let mut executed = Vec::new();

        info!("Starting agent loop with message: {}", message.content);

        for iteration in 0..self.max_iterations {
            debug!("Iteration {}/{}", iteration + 1, self.max_iterations);

            let response = self.client.chat(&messages, &tools).await?;
            debug!(
                "LLM usage: {} prompt / {} completion tokens",
                response.usage.prompt_tokens, response.usage.completion_tokens
            );

            if !response.has_tool_calls() {
                let content = response.content.unwrap_or_default();
                info!("Agent completed with response: {} chars", content.len());
                return Ok(Response::with_tool_calls(content, executed));
            }

            messages.push(Message::assistant_with_tools(
                response.content.clone().unwrap_or_default(),
                response.tool_calls.clone(),
            ));

            for tool_call in &response.tool_calls {
                let call = self.execute_tool(ctx, tool_call).await;
                messages.push(Message::tool_result(
                    &tool_call.id,
                    call.result.clone().unwrap_or_default(),
                ));
                executed.push(call);
            }
        }

        Err(Error::MaxIterations)
    }

    /// Errors go back to the model as text so it can recover.
    async fn execute_tool(&self, ctx: &Context, tool_call: &ToolCallRequest) -> ToolCall {
        debug!("Executing tool: {} with args: {}", tool_call.name, tool_call.arguments);

        let (result, succeeded) = match ctx.tool_runner.execute(&tool_call.name, tool_call.arguments.clone()).await {
            Ok(result) => {
                debug!("Tool {} succeeded: {} chars", tool_call.name, result.len());
                (result, true)
            }
            Err(e) => {
                let error_msg = format!("Error: {}", e);
                warn!("Tool {} failed: {}", tool_call.name, error_msg);
                (error_msg, false)
            }
        };

        ToolCall {
            id: tool_call.id.clone(),
            name: tool_call.name.clone(),
            arguments: tool_call.arguments.clone(),
            result: Some(result),
            succeeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::FakeLlmClient;
    use crate::providers::{FakeProvider, FlightProvider};
    use crate::search::{fixtures::offer, FlightSearchService, ProviderId};
    use crate::tools::ToolRunner;
    use crate::config::Config;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn flight_context(a: Arc<FakeProvider>, b: Arc<FakeProvider>) -> Context {
        let providers: Vec<Arc<dyn FlightProvider>> = vec![a, b];
        let service = FlightSearchService::new(providers, Duration::from_secs(5));
        Context::with_tools(&Config::test(), ToolRunner::new_with_flight_tools(service, "USD"))
    }

    #[tokio::test]
    async fn test_agent_loop_simple() {
        let client = FakeLlmClient::new(vec!["Where would you like to fly?"]);
        let ctx = Context::test();
        let agent = AgentLoop::new(client, 10);

        let response = agent.run(&[], Message::user("Hi there"), &ctx).await.unwrap();

        assert_eq!(response.content, "Where would you like to fly?");
        assert!(response.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_agent_loop_with_compare_tool() {
        let a = Arc::new(FakeProvider::with_offers(
            ProviderId::SkyScrapper,
            vec![offer(ProviderId::SkyScrapper, 450.0, 420)],
        ));
        let b = Arc::new(FakeProvider::with_offers(
            ProviderId::GoogleFlights,
            vec![offer(ProviderId::GoogleFlights, 420.0, 450)],
        ));
        let ctx = flight_context(a.clone(), b.clone());

        let client = FakeLlmClient::with_tool_call(
            "compare_flights",
            json!({"origin": "JFK", "destination": "LHR", "departure_date": "2025-06-10"}),
            "Cheapest is 420.00 USD on Google Flights.",
        );
        let agent = AgentLoop::new(client, 10);

        let response = agent
            .run(&[], Message::user("JFK to LHR on June 10"), &ctx)
            .await
            .unwrap();

        assert_eq!(response.content, "Cheapest is 420.00 USD on Google Flights.");
        assert_eq!(response.tool_calls.len(), 1);
        assert!(response.tool_calls[0].succeeded);
        assert!(response.tool_calls[0].result.as_deref().unwrap().contains("\"offers\""));
        assert_eq!((a.calls(), b.calls()), (1, 1));
    }

    #[tokio::test]
    async fn test_tool_error_fed_back() {
        let a = Arc::new(FakeProvider::with_offers(ProviderId::SkyScrapper, vec![]));
        let b = Arc::new(FakeProvider::with_offers(ProviderId::GoogleFlights, vec![]));
        let ctx = flight_context(a.clone(), b.clone());

        let client = FakeLlmClient::with_tool_call(
            "compare_flights",
            json!({"origin": "JFK", "destination": "JFK", "departure_date": "2025-06-10"}),
            "Origin and destination must differ.",
        );
        let agent = AgentLoop::new(client, 10);

        let response = agent.run(&[], Message::user("JFK to JFK"), &ctx).await.unwrap();

        let call = &response.tool_calls[0];
        assert!(!call.succeeded);
        assert!(call.result.as_deref().unwrap().starts_with("Error: Invalid trip query"));
        assert_eq!((a.calls(), b.calls()), (0, 0));
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let client = FakeLlmClient::with_tool_call("compare_flights", json!({}), "never reached");
        let ctx = Context::test();
        let agent = AgentLoop::new(client, 1);

        let err = agent.run(&[], Message::user("loop"), &ctx).await.unwrap_err();
        assert!(matches!(err, Error::MaxIterations));
    }
}
