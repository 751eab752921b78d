//! Blocking HTTP model clients. Run them off the UI thread.

use std::time::Duration;

use serde_json::{Value, json};

use super::error::QueryError;

const TIMEOUT_SECS: u64 = 60;
const MAX_TOKENS: u32 = 2048;
const ERROR_BODY_CHARS: usize = 200;

pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, prompt: &str) -> Result<String, QueryError>;
}

fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .build()
}

fn send(
    provider: &str,
    request: ureq::Request,
    body: &Value,
) -> Result<Value, QueryError> {
    match request.send_json(body) {
        Ok(response) => response.into_json::<Value>().map_err(|error| QueryError::Transport {
            provider: provider.to_owned(),
            message: format!("unreadable response body: {error}"),
        }),
        Err(ureq::Error::Status(429, _)) => Err(QueryError::RateLimited {
            provider: provider.to_owned(),
        }),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(QueryError::Http {
                provider: provider.to_owned(),
                status,
                body: body.chars().take(ERROR_BODY_CHARS).collect(),
            })
        }
        Err(ureq::Error::Transport(error)) => Err(QueryError::Transport {
            provider: provider.to_owned(),
            message: error.to_string(),
        }),
    }
}

fn text_at(provider: &str, value: Option<&Value>) -> Result<String, QueryError> {
    value
        .and_then(Value::as_str)
        .map(str::to_owned)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| QueryError::EmptyResponse {
            provider: provider.to_owned(),
        })
}

pub struct Claude {
    agent: ureq::Agent,
    api_key: String,
    model: String,
}

impl Claude {
    pub const DEFAULT_MODEL: &'static str = "claude-sonnet-4-20250514";

    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            agent: agent(),
            api_key,
            model: model.unwrap_or_else(|| Self::DEFAULT_MODEL.to_owned()),
        }
    }
}

impl LanguageModel for Claude {
    fn name(&self) -> &str {
        "Claude"
    }

    fn generate(&self, prompt: &str) -> Result<String, QueryError> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{"role": "user", "content": prompt}]
        });
        let request = self
            .agent
            .post("https://api.anthropic.com/v1/messages")
            .set("x-api-key", &self.api_key)
            .set("anthropic-version", "2023-06-01");
        let json = send(self.name(), request, &body)?;
        text_at(self.name(), json.pointer("/content/0/text"))
    }
}

pub struct OpenAi {
    agent: ureq::Agent,
    api_key: String,
    model: String,
}

impl OpenAi {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            agent: agent(),
            api_key,
            model: model.unwrap_or_else(|| Self::DEFAULT_MODEL.to_owned()),
        }
    }
}

impl LanguageModel for OpenAi {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn generate(&self, prompt: &str) -> Result<String, QueryError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": MAX_TOKENS
        });
        let request = self
            .agent
            .post("https://api.openai.com/v1/chat/completions")
            .set("Authorization", &format!("Bearer {}", self.api_key));
        let json = send(self.name(), request, &body)?;
        text_at(self.name(), json.pointer("/choices/0/message/content"))
    }
}

pub struct Ollama {
    agent: ureq::Agent,
    base_url: String,
    model: String,
}

impl Ollama {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            agent: agent(),
            base_url,
            model,
        }
    }
}

impl LanguageModel for Ollama {
    fn name(&self) -> &str {
        "Ollama"
    }

    fn generate(&self, prompt: &str) -> Result<String, QueryError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "format": "json"
        });
        let json = send(self.name(), self.agent.post(&url), &body)?;
        text_at(self.name(), json.get("response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_at_rejects_blank() {
        let value = json!({"response": "   "});
        assert!(matches!(
            text_at("Ollama", value.get("response")),
            Err(QueryError::EmptyResponse { .. })
        ));
        let value = json!({"content": [{"text": "{}"}]});
        assert_eq!(text_at("Claude", value.pointer("/content/0/text")).unwrap(), "{}");
    }
}
