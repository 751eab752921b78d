mod error;
mod prompt;
mod providers;
mod result;
mod worker;

use std::sync::Arc;

pub use error::QueryError;
pub use prompt::build_prompt;
pub use providers::{Claude, LanguageModel, Ollama, OpenAi};
pub use result::{Match, MatchMap, MatchResult};
pub use worker::QueryRunner;

use crate::config::Config;

pub fn provider_display_name(provider: &str) -> &str {
    match provider {
        "claude" => "Claude",
        "openai" => "OpenAI",
        "ollama" => "Ollama",
        _ => provider,
    }
}

pub fn model_from_config(config: &Config) -> Result<Arc<dyn LanguageModel>, QueryError> {
    let provider = config.ai_provider.trim().to_ascii_lowercase();
    let model: Arc<dyn LanguageModel> = match provider.as_str() {
        "claude" => {
            let key = config
                .api_key()
                .ok_or_else(|| QueryError::MissingApiKey("Claude".to_owned()))?;
            Arc::new(Claude::new(key, config.ai_model.clone()))
        }
        "openai" => {
            let key = config
                .api_key()
                .ok_or_else(|| QueryError::MissingApiKey("OpenAI".to_owned()))?;
            Arc::new(OpenAi::new(key, config.ai_model.clone()))
        }
        "ollama" => Arc::new(Ollama::new(
            config.ollama_url.clone(),
            config
                .ai_model
                .clone()
                .unwrap_or_else(|| config.ollama_model.clone()),
        )),
        _ => return Err(QueryError::UnknownProvider(config.ai_provider.clone())),
    };
    Ok(model)
}
