//! Tool runner - manages and executes tools

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::Result;
use crate::error::Error;
use crate::search::FlightSearchService;
use super::Tool;
use super::flights::FlightSearchTool;

/// Tool definition for LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool runner manages registered tools and executes them
pub struct ToolRunner {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRunner {
    /// Create an empty tool runner
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Create a tool runner with the flight tools
    pub fn new_with_flight_tools(service: FlightSearchService, default_currency: &str) -> Self {
        let mut runner = Self::new();

        runner.register(FlightSearchTool::sky_scrapper(service.clone(), default_currency));
        runner.register(FlightSearchTool::google_flights(service.clone(), default_currency));
        runner.register(FlightSearchTool::compare(service, default_currency));

        runner
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    /// Get tool definitions for LLM, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values()
            .map(|t| t.to_definition())
            .collect()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, params: Value) -> Result<String> {
        let tool = self.tools.get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;

        tool.execute(params).await
    }

    /// Check if a tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::DummyTool;
    use std::time::Duration;

    #[tokio::test]
    async fn test_tool_runner_register_and_execute() {
        let mut runner = ToolRunner::new();
        runner.register(DummyTool {
            name: "test_tool".to_string(),
            result: "success".to_string(),
        });

        assert!(runner.has("test_tool"));

        let result = runner.execute("test_tool", serde_json::json!({})).await.unwrap();
        assert_eq!(result, "success");
    }

    #[tokio::test]
    async fn test_tool_runner_unknown_tool() {
        let runner = ToolRunner::new();
        let result = runner.execute("unknown", serde_json::json!({})).await;
        assert!(matches!(result, Err(Error::Tool(_))));
    }

    #[test]
    fn test_flight_tools_registered() {
        let service = FlightSearchService::new(vec![], Duration::from_secs(1));
        let runner = ToolRunner::new_with_flight_tools(service, "USD");

        assert_eq!(
            runner.tool_names(),
            vec!["compare_flights", "search_flights", "search_google_flights"]
        );
        assert!(runner
            .definitions()
            .iter()
            .all(|d| d.parameters["type"] == "object"));
    }
}
