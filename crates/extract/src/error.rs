/// Errors returned by the chat-completions endpoint.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited")]
    RateLimit,

    #[error("Authentication failed")]
    Authentication,

    #[error("Empty response from LLM")]
    EmptyResponse,

    #[error("No valid JSON after {attempts} attempts")]
    InvalidJson { attempts: usize },

    #[error("API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },
}
