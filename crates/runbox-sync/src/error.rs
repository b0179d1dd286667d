use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response; `body` is the server's text.
    #[error("{status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("fork unavailable: nothing stored to fork from")]
    ForkUnavailable,

    #[error("fork cooling down, retry in {}s", remaining.as_secs().max(1))]
    ForkCooldown { remaining: Duration },

    #[error(transparent)]
    Types(#[from] runbox_types::TypeError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
                body: e.to_string(),
            },
            None => Self::Transport(e.to_string()),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_leads_with_code() {
        let err = SyncError::Status {
            status: 403,
            body: "Unauthorized - wrong writeKey".into(),
        };
        assert_eq!(err.to_string(), "403: Unauthorized - wrong writeKey");
    }

    #[test]
    fn cooldown_rounds_up_to_a_second() {
        let err = SyncError::ForkCooldown {
            remaining: Duration::from_millis(200),
        };
        assert_eq!(err.to_string(), "fork cooling down, retry in 1s");
    }
}
