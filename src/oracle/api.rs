//! LLM-backed oracle over an OpenAI-compatible chat completions API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

use crate::config::OracleConfig;
use crate::error::OracleError;

use super::{JoinKeys, Oracle, Selection, SourceDescriptor};

const SYSTEM_PROMPT: &str = "You are a routing engine for a data query service. \
You never answer queries yourself; you only decide which registered data source \
(or pair of sources) should answer, and you reply with a single JSON object and \
nothing else.";

/// Oracle that asks a chat-completion model to route queries.
pub struct ApiOracle {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

/// Chat completion request format.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat completion response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// The JSON shape the model is instructed to reply with.
#[derive(Debug, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
enum OracleReply {
    Single {
        source: usize,
        query: String,
    },
    Join {
        left: usize,
        right: usize,
        left_query: String,
        right_query: String,
        left_key: String,
        right_key: String,
    },
    None,
}

impl ApiOracle {
    /// Create an oracle from configuration. The API key falls back to
    /// the `TRIBUTARY_ORACLE_API_KEY` and `OPENAI_API_KEY` environment
    /// variables when not set in the config file.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("TRIBUTARY_ORACLE_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                OracleError::Api(
                    "API key not provided and no oracle API key env var set".to_string(),
                )
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::Connection(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Make one chat completion request and return the raw reply text.
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout
                } else if e.is_connect() {
                    OracleError::Connection(e.to_string())
                } else {
                    OracleError::Api(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api(format!("HTTP {}: {}", status, body)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(format!("failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OracleError::Malformed("reply carried no content".to_string()))
    }
}

#[async_trait]
impl Oracle for ApiOracle {
    async fn select(
        &self,
        query: &str,
        sources: &[SourceDescriptor],
    ) -> Result<Selection, OracleError> {
        let prompt = build_prompt(query, sources);
        tracing::debug!(model = %self.model, "asking oracle to route query");

        let reply = self.complete(&prompt).await?;
        parse_reply(&reply)
    }
}

/// Build the routing prompt: the query, a capability listing of every
/// candidate, and the strict reply schema.
fn build_prompt(query: &str, sources: &[SourceDescriptor]) -> String {
    let mut listing = String::new();
    for source in sources {
        let _ = writeln!(
            listing,
            "  {}. name=\"{}\" output={} join_compatible={}",
            source.index,
            source.name,
            source.capability.as_str(),
            source.join_compatible
        );
    }

    format!(
        r#"Query: {query}

Registered data sources (addressed by number):
{listing}
Decide which source should answer the query:
- If one source suffices, reply {{"decision": "single", "source": <number>, "query": "<sub-query rewritten for that source>"}}.
- If and only if the query spans exactly two sources that both have output=frame and join_compatible=true, reply {{"decision": "join", "left": <number>, "right": <number>, "left_query": "<sub-query for left>", "right_query": "<sub-query for right>", "left_key": "<key column in left result>", "right_key": "<key column in right result>"}}. The key columns must identify the same real-world entity in both results.
- If no source plausibly covers the query, reply {{"decision": "none"}}.

Prefer a single source over a join. When several sources apply equally well, pick the lowest-numbered one. Reply with the JSON object only."#
    )
}

/// Parse the model's reply into a [`Selection`].
///
/// Models frequently wrap JSON in markdown fences despite instructions,
/// so fences are stripped before parsing.
fn parse_reply(reply: &str) -> Result<Selection, OracleError> {
    let cleaned = strip_fences(reply);

    let parsed: OracleReply = serde_json::from_str(cleaned)
        .map_err(|e| OracleError::Malformed(format!("{} in reply: {}", e, cleaned)))?;

    Ok(match parsed {
        OracleReply::Single { source, query } => Selection::Single { source, query },
        OracleReply::Join {
            left,
            right,
            left_query,
            right_query,
            left_key,
            right_key,
        } => Selection::Joined {
            left,
            right,
            left_query,
            right_query,
            keys: JoinKeys {
                left_key,
                right_key,
            },
        },
        OracleReply::None => Selection::NoMatch,
    })
}

fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}
