//! Context builder for agent prompts.
//!
//! Holds the tool runner and renders the system instruction. History is
//! windowed so long sessions stay bounded.

use crate::config::Config;
use crate::providers::ProviderRegistry;
use crate::search::FlightSearchService;
use crate::tools::ToolRunner;
use crate::Result;

use super::message::Message;

/// Maximum history messages to include in prompt (prevents unbounded growth).
const MAX_HISTORY_MESSAGES: usize = 40;

/// Context holds all state for an agent interaction.
pub struct Context {
    pub tool_runner: ToolRunner,
    pub config: Config,
}

impl Context {
    /// Create a new context from configuration, wiring the configured providers.
    pub fn new(config: &Config) -> Result<Self> {
        let providers = ProviderRegistry::from_config(config)?;
        let service = FlightSearchService::new(providers, config.provider_timeout());
        let tool_runner = ToolRunner::new_with_flight_tools(service, &config.default_currency);

        Ok(Self::with_tools(config, tool_runner))
    }

    /// Create a context around an existing tool runner.
    pub fn with_tools(config: &Config, tool_runner: ToolRunner) -> Self {
        Self {
            tool_runner,
            config: config.clone(),
        }
    }

    /// Create a test context with no tools.
    #[cfg(test)]
    pub fn test() -> Self {
        Self::with_tools(&Config::test(), ToolRunner::new())
    }

    /// Build the system instruction.
    pub fn build_system_prompt(&self) -> String {
        let today = chrono::Local::now().format("%Y-%m-%d (%A)");
        let tools = self.tool_runner.tool_names().join("`, `");
        let currency = &self.config.default_currency;

        format!(
            r#"# Flight Agent ✈️

You are a flight search assistant. You find and compare flights for the user.

## Today
{today}

## Tools
Available: `{tools}`

- Prefer `compare_flights`: it searches Sky Scrapper and Google Flights at once and merges the results.
- Use `search_flights` (Sky Scrapper) or `search_google_flights` (Google Flights) when the user asks for one source.
- Prices default to {currency}. Pass `currency` only when the user asks for another one.
- Dates are YYYY-MM-DD. Resolve relative dates ("next Friday") against today.
- Origin and destination should be IATA codes when you know them (JFK, LHR). City names are accepted.
- If origin, destination or departure date is missing, ask for it instead of guessing.

## Answering
Tool results are JSON. Offers are already sorted: cheapest first, ties broken by duration.
- Summarize the best few options: airline, price with currency, duration, stops, departure and arrival.
- Point out the cheapest and the fastest option.
- If `failures` is not empty, say which provider could not be reached.
- If `mixed_currency` is true, do not compare prices across currencies.
- If a tool returns an error, explain it plainly and suggest a fix.

Be concise and accurate. Never invent flights or prices."#
        )
    }

    /// Build messages list for LLM call with history windowing.
    pub fn build_messages(&self, history: &[Message], current: &str) -> Vec<Message> {
        let windowed_history = if history.len() > MAX_HISTORY_MESSAGES {
            &history[history.len() - MAX_HISTORY_MESSAGES..]
        } else {
            history
        };

        let mut messages = Vec::with_capacity(windowed_history.len() + 2);
        messages.push(Message::system(self.build_system_prompt()));
        messages.extend(windowed_history.iter().cloned());
        messages.push(Message::user(current));

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::Role;

    #[test]
    fn test_context_build_system_prompt() {
        let ctx = Context::test();
        let prompt = ctx.build_system_prompt();
        assert!(prompt.contains("flight search assistant"));
        assert!(prompt.contains("compare_flights"));
    }

    #[test]
    fn test_prompt_lists_registered_tools() {
        let service = FlightSearchService::new(vec![], std::time::Duration::from_secs(1));
        let ctx = Context::with_tools(&Config::test(), ToolRunner::new_with_flight_tools(service, "USD"));
        let prompt = ctx.build_system_prompt();
        assert!(prompt.contains("`compare_flights`, `search_flights`, `search_google_flights`"));
    }

    #[test]
    fn test_prompt_names_default_currency() {
        let config = Config {
            default_currency: "EUR".to_string(),
            ..Config::test()
        };
        let prompt = Context::with_tools(&config, ToolRunner::new()).build_system_prompt();
        assert!(prompt.contains("Prices default to EUR."));
    }

    #[test]
    fn test_context_build_messages() {
        let ctx = Context::test();
        let messages = ctx.build_messages(&[], "Flights from JFK to LHR");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "Flights from JFK to LHR");
    }

    #[test]
    fn test_history_windowing() {
        let ctx = Context::test();

        let mut history = Vec::new();
        for i in 0..100 {
            history.push(Message::user(format!("Message {}", i)));
        }

        let messages = ctx.build_messages(&history, "Current");

        // system + window + current
        assert_eq!(messages.len(), MAX_HISTORY_MESSAGES + 2);

        let last_history_msg = &messages[messages.len() - 2];
        assert!(last_history_msg.content.contains("99"));
    }
}
