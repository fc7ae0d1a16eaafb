use thiserror::Error;

/// Message substrings that identify a provider-side quota or rate-limit
/// refusal. Providers do not return a structured code for these, so
/// classification is by substring match against the error message.
const QUOTA_PATTERNS: [&str; 13] = [
    "quota",
    "rate limit",
    "429",
    "too many requests",
    "exceeded",
    "limit",
    "throttle",
    "capacity",
    "overloaded",
    "busy",
    "try again later",
    "temporary",
    "unavailable",
];

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The document payload could not be decoded or opened at all.
    #[error("Invalid document payload: {0}")]
    InvalidDocument(String),

    /// An error reported by the generative provider for a specific model.
    #[error("Provider error from model '{model}': {message}")]
    Provider { model: String, message: String },

    /// Every rung of the model fallback ladder failed.
    #[error("All models in the fallback ladder were exhausted")]
    AllModelsExhausted,

    /// Attempted to approve a record whose status is no longer pending.
    #[error("Verification record already finalized (status: {0})")]
    AlreadyFinalized(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    /// Whether this failure looks like a provider quota/rate-limit refusal.
    pub fn is_quota_or_rate_limit(&self) -> bool {
        match self {
            AnalyzerError::Provider { message, .. } => is_quota_message(message),
            AnalyzerError::AllModelsExhausted => true,
            _ => false,
        }
    }

    /// User-facing message distinguishing "temporary capacity" failures from
    /// "content could not be processed" failures.
    pub fn user_facing_message(&self) -> String {
        if self.is_quota_or_rate_limit() {
            return "APIの制限に達しました。30分程度時間をおいてから再度お試しください。\
                    より小さなファイルを使用すると成功する可能性が高くなります。"
                .to_string();
        }

        match self {
            AnalyzerError::InvalidDocument(_)
            | AnalyzerError::Serialization(_)
            | AnalyzerError::Decode(_) => {
                "文書の内容を処理できませんでした。別の形式や小さなサイズのファイルをお試しください。"
                    .to_string()
            }
            _ => "文書の分析中にエラーが発生しました。しばらく時間をおいてから再度お試しください。"
                .to_string(),
        }
    }
}

pub fn is_quota_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    QUOTA_PATTERNS.iter().any(|p| lowered.contains(p))
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
