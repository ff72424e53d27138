//! Gemini LLM client (public API key or Vertex AI).

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

use super::super::message::{Message, Role, ToolCallRequest};
use super::{GeminiResponse, LlmClient, LlmResponse, Usage};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Where requests go and how they authenticate.
#[derive(Clone)]
pub enum GeminiEndpoint {
    /// generativelanguage.googleapis.com with an API key
    ApiKey { api_key: String },
    /// Vertex AI with a bearer access token
    Vertex {
        project: String,
        location: String,
        access_token: String,
    },
}

/// Gemini client.
#[derive(Clone)]
pub struct GeminiClient {
    endpoint: GeminiEndpoint,
    model: String,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client with API key.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_endpoint(
            GeminiEndpoint::ApiKey {
                api_key: api_key.to_string(),
            },
            model,
        )
    }

    /// Create a Vertex AI client.
    pub fn vertex(project: &str, location: &str, access_token: &str, model: &str) -> Self {
        Self::with_endpoint(
            GeminiEndpoint::Vertex {
                project: project.to_string(),
                location: location.to_string(),
                access_token: access_token.to_string(),
            },
            model,
        )
    }

    pub fn with_endpoint(endpoint: GeminiEndpoint, model: &str) -> Self {
        Self {
            endpoint,
            model: model.to_string(),
            client: Client::new(),
        }
    }

    fn build_url(&self) -> String {
        match &self.endpoint {
            GeminiEndpoint::ApiKey { .. } => {
                format!("{}/{}:generateContent", GEMINI_API_URL, self.model)
            }
            GeminiEndpoint::Vertex { project, location, .. } => {
                let host = if location == "global" {
                    "aiplatform.googleapis.com".to_string()
                } else {
                    format!("{}-aiplatform.googleapis.com", location)
                };
                format!(
                    "https://{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                    host, project, location, self.model
                )
            }
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.endpoint {
            GeminiEndpoint::ApiKey { api_key } => request.header("x-goog-api-key", api_key),
            GeminiEndpoint::Vertex { access_token, .. } => request.bearer_auth(access_token),
        }
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<Value> {
        // functionResponse must name the function, not our call id
        let mut call_names: HashMap<&str, &str> = HashMap::new();
        let mut contents: Vec<Value> = Vec::with_capacity(messages.len());
        let mut last_was_tool = false;

        for m in messages.iter().filter(|m| m.role != Role::System) {
            if m.role == Role::Tool {
                let name = m
                    .tool_call_id
                    .as_deref()
                    .and_then(|id| call_names.get(id).copied())
                    .unwrap_or("unknown");
                let part = json!({
                    "functionResponse": {
                        "name": name,
                        "response": {"result": m.content}
                    }
                });

                // Results of parallel calls share one turn
                let shared = if last_was_tool {
                    contents.last_mut().and_then(|prev| prev["parts"].as_array_mut())
                } else {
                    None
                };
                match shared {
                    Some(parts) => parts.push(part),
                    None => contents.push(json!({"role": "user", "parts": [part]})),
                }
                last_was_tool = true;
                continue;
            }
            last_was_tool = false;

            let role = match m.role {
                Role::Assistant => "model",
                _ => "user",
            };

            if let Some(ref tool_calls) = m.tool_calls {
                let mut parts: Vec<Value> = Vec::with_capacity(tool_calls.len() + 1);
                if !m.content.is_empty() {
                    parts.push(json!({"text": m.content}));
                }
                for tc in tool_calls {
                    call_names.insert(tc.id.as_str(), tc.name.as_str());
                    parts.push(json!({
                        "functionCall": {
                            "name": tc.name,
                            "args": tc.arguments
                        }
                    }));
                }
                contents.push(json!({"role": role, "parts": parts}));
            } else {
                contents.push(json!({"role": role, "parts": [{"text": m.content}]}));
            }
        }

        contents
    }

    fn get_system_instruction(&self, messages: &[Message]) -> Option<String> {
        messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone())
    }

    fn convert_tools(&self, tools: &[ToolDefinition]) -> Option<Value> {
        if tools.is_empty() {
            return None;
        }

        let function_declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters
                })
            })
            .collect();

        Some(json!([{
            "functionDeclarations": function_declarations
        }]))
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolDefinition]) -> Value {
        let mut request = json!({
            "contents": self.convert_messages(messages),
            "generationConfig": {
                "temperature": 0.2,
                "maxOutputTokens": 8192
            }
        });

        if let Some(system) = self.get_system_instruction(messages) {
            request["systemInstruction"] = json!({
                "parts": [{"text": system}]
            });
        }

        if let Some(tool_config) = self.convert_tools(tools) {
            request["tools"] = tool_config;
        }

        request
    }

    fn parse_response(&self, response: &GeminiResponse) -> Result<LlmResponse> {
        let candidate = match response.candidates.first() {
            Some(candidate) => candidate,
            None => {
                let reason = response
                    .prompt_feedback
                    .as_ref()
                    .and_then(|f| f.block_reason.as_deref())
                    .unwrap_or("no candidates in response");
                return Err(Error::Llm(format!("Gemini returned nothing: {reason}")));
            }
        };

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();

        let parts = candidate.content.as_ref().map(|c| c.parts.as_slice()).unwrap_or(&[]);
        for part in parts {
            if let Some(ref text) = part.text {
                texts.push(text.as_str());
            }

            if let Some(ref fc) = part.function_call {
                let arguments = if fc.args.is_null() { json!({}) } else { fc.args.clone() };
                tool_calls.push(ToolCallRequest {
                    id: format!("tc_{}", tool_calls.len()),
                    name: fc.name.clone(),
                    arguments,
                });
            }
        }

        let usage = response
            .usage_metadata
            .as_ref()
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count.unwrap_or(0),
                completion_tokens: u.candidates_token_count.unwrap_or(0),
                total_tokens: u.total_token_count.unwrap_or(0),
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content: (!texts.is_empty()).then(|| texts.concat()),
            tool_calls,
            finish_reason: candidate
                .finish_reason
                .clone()
                .unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, tools);
        debug!("Gemini request to {} with {} messages", self.model, messages.len());

        let response = self
            .authorize(self.client.post(self.build_url()))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Error::Llm(format!("Gemini authentication failed ({status}): {error_text}"))
                }
                _ => Error::Llm(format!("Gemini API error ({status}): {error_text}")),
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;
        self.parse_response(&gemini_response)
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
