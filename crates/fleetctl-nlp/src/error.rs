use thiserror::Error;

/// User-visible copy for every gated or failed classification outcome.
/// Every message ends with a pointer to the slash-command escape hatch so
/// operators are never left stuck waiting on the NLP layer.
pub mod messages {
    pub const HELP_HINT: &str = "You can always fall back to a slash command — type /help to see them.";

    pub const RATE_LIMITED_CLIENT: &str =
        "You're sending requests a bit too fast — please slow down and try again in a moment. \
         You can always fall back to a slash command — type /help to see them.";

    pub const RATE_LIMITED_UPSTREAM: &str =
        "The assistant is temporarily overloaded upstream — please try again shortly. \
         You can always fall back to a slash command — type /help to see them.";

    pub const TOKEN_BUDGET_EXCEEDED: &str =
        "This agent has used up its conversation budget for today — it resets at midnight UTC. \
         You can always fall back to a slash command — type /help to see them.";

    pub const MALFORMED: &str = "I didn't quite understand that response — could you try rephrasing? \
         You can always fall back to a slash command — type /help to see them.";
}

/// Errors a `Provider` implementation can report. Kept distinct from the
/// provider's own transport/SDK error type so `Classifier` can map the two
/// sentinel kinds that matter — upstream rate limiting and malformed
/// output — onto specific user-visible messages without string-matching.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream rate limit exceeded")]
    UpstreamRateLimit,

    #[error("malformed provider output: {0}")]
    Malformed(String),

    #[error("cancelled")]
    Cancelled,

    #[error("provider error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("upstream rate limit exceeded")]
    UpstreamRateLimit,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("token budget exhausted")]
    TokenBudgetExhausted,

    #[error("malformed classifier output: {0}")]
    Malformed(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("cancelled")]
    Cancelled,
}

impl ClassifierError {
    /// The copy a chat-transport adapter should show the operator for this
    /// error, distinct per error kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            ClassifierError::UpstreamRateLimit => messages::RATE_LIMITED_UPSTREAM,
            ClassifierError::RateLimited => messages::RATE_LIMITED_CLIENT,
            ClassifierError::TokenBudgetExhausted => messages::TOKEN_BUDGET_EXCEEDED,
            ClassifierError::Malformed(_) => messages::MALFORMED,
            ClassifierError::Provider(_) => messages::MALFORMED,
            ClassifierError::Cancelled => messages::MALFORMED,
        }
    }
}

impl From<ProviderError> for ClassifierError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::UpstreamRateLimit => ClassifierError::UpstreamRateLimit,
            ProviderError::Malformed(m) => ClassifierError::Malformed(m),
            ProviderError::Cancelled => ClassifierError::Cancelled,
            ProviderError::Other(m) => ClassifierError::Provider(m),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
