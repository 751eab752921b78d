use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{provider} is rate limiting requests, try again in a moment")]
    RateLimited { provider: String },
    #[error("{provider} API error {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("network error ({provider}): {message}")]
    Transport { provider: String, message: String },
    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: String },
    #[error("could not read match result: {0}")]
    Parse(String),
    #[error("unknown AI provider `{0}`")]
    UnknownProvider(String),
    #[error("no API key configured for {0}")]
    MissingApiKey(String),
}

impl QueryError {
    /// Retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transport { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let limited = QueryError::RateLimited {
            provider: "Claude".to_owned(),
        };
        assert!(limited.is_transient());
        assert!(limited.is_rate_limited());

        let parse = QueryError::Parse("no JSON object".to_owned());
        assert!(!parse.is_transient());
        assert!(!parse.is_rate_limited());
    }
}
