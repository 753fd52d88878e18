use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("malformed action `{0}`: expected `name(arg, ...)`")]
    MalformedAction(String),

    #[error("tool `{0}` not found")]
    ToolNotFound(String),

    #[error("invalid arguments for `{name}`: {message}")]
    InvalidArguments { name: String, message: String },

    #[error("tool `{name}` invocation failed: {source}")]
    ToolInvocation {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("language model error: {0}")]
    LanguageModel(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AgentError {
    pub(crate) fn invalid_arguments(name: &str, message: impl Into<String>) -> Self {
        AgentError::InvalidArguments {
            name: name.to_string(),
            message: message.into(),
        }
    }
}
