use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Token refresh was attempted and did not yield a usable session.
    #[error("provider authorization failed: {0}")]
    Auth(String),

    /// Raw 401 from the provider. Consumed by the refresh-and-retry wrapper.
    #[error("provider rejected the access token")]
    Unauthorized,

    /// The provider answered but the payload is missing or malformed.
    #[error("provider response unusable: {0}")]
    Unavailable(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("invalid provider url: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Unauthorized)
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
