//! CLI adapter - interactive and single-message command line interface.

use std::io::{self, BufRead, Write};

use colored::*;

use crate::agent::{AgentLoop, Context, LlmClient, Message, Response};
use crate::ui;
use crate::Result;

/// CLI channel for interactive agent sessions.
pub struct CliChannel<C: LlmClient> {
    agent: AgentLoop<C>,
    context: Context,
    history: Vec<Message>,
}

impl<C: LlmClient> CliChannel<C> {
    /// Create a new CLI channel.
    pub fn new(agent: AgentLoop<C>, context: Context) -> Self {
        Self {
            agent,
            context,
            history: Vec::new(),
        }
    }

    /// Run a single message and return the response.
    pub async fn run_once(&mut self, message: &str) -> Result<Response> {
        let msg = Message::user(message);
        let response = self.agent.run(&self.history, msg.clone(), &self.context).await?;

        // Only the visible exchange is kept; tool payloads are not replayed
        self.history.push(msg);
        self.history.push(Message::assistant(response.content.clone()));

        Ok(response)
    }

    /// Run interactive REPL loop until `exit`, `quit` or EOF.
    pub async fn run_interactive(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("\n{} ", "You:".blue().bold());
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if is_exit(input) {
                println!("👋 Bye!");
                break;
            }

            if input.eq_ignore_ascii_case("clear") {
                self.clear_history();
                ui::print_step("History cleared");
                continue;
            }

            ui::print_thinking("Searching");
            match self.run_once(input).await {
                Ok(response) => print_response(&response),
                Err(e) => println!("\n{} {}", "Error:".red().bold(), e),
            }
        }

        Ok(())
    }

    /// Clear conversation history.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Get current history length.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

/// Print the agent's answer, preceded by the tools it used.
pub fn print_response(response: &Response) {
    for call in &response.tool_calls {
        if call.succeeded {
            ui::print_step(&format!("used {}", call.name));
        } else {
            ui::print_warning(&format!("{} failed", call.name));
        }
    }
    println!("\n{} {}", "Agent:".green().bold(), response.content);
}

fn is_exit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::FakeLlmClient;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(!is_exit("exit row seats please"));
    }

    #[tokio::test]
    async fn test_run_once_records_history() {
        let client = FakeLlmClient::new(vec!["Which date?", "Searching JFK to LHR."]);
        let mut channel = CliChannel::new(AgentLoop::new(client, 5), Context::test());

        let first = channel.run_once("JFK to LHR").await.unwrap();
        assert_eq!(first.content, "Which date?");
        assert_eq!(channel.history_len(), 2);

        channel.run_once("June 10").await.unwrap();
        assert_eq!(channel.history_len(), 4);

        channel.clear_history();
        assert_eq!(channel.history_len(), 0);
    }
}
