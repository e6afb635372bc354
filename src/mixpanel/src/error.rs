use std::error;
use std::result;

use thiserror::Error;

pub type Result<T> = result::Result<T, MixpanelError>;
pub type GenericError = Box<dyn error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum MixpanelError {
    /// Rejected before any request was attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The request could not be completed (connect, timeout, body read).
    #[error("mixpanel: request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: GenericError,
    },
    /// The request completed but the service did not accept it.
    #[error("mixpanel: {url} did not accept the request: error={message}; status={}; httpCode={http_code}", .status.map(|s| s.to_string()).unwrap_or_default())]
    DeliveryRejected {
        url: String,
        http_code: u16,
        status: Option<i64>,
        message: String,
    },
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("serde: {0:?}")]
    Serde(#[from] serde_json::Error),
    #[error("url: {0:?}")]
    Url(#[from] url::ParseError),
}

impl MixpanelError {
    /// The URL the failed attempt was sent to, for diagnostics.
    pub fn url(&self) -> Option<&str> {
        match self {
            MixpanelError::Transport { url, .. } | MixpanelError::DeliveryRejected { url, .. } => {
                Some(url.as_str())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_rejected_message() {
        let err = MixpanelError::DeliveryRejected {
            url: "http://localhost/track".to_string(),
            http_code: 200,
            status: Some(0),
            message: "some error".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "mixpanel: http://localhost/track did not accept the request: error=some error; status=0; httpCode=200"
        );
        assert_eq!(err.url(), Some("http://localhost/track"));
    }

    #[test]
    fn test_url_absent_for_local_errors() {
        let err = MixpanelError::UnsupportedOperation("$append".to_string());
        assert!(err.url().is_none());
    }
}
