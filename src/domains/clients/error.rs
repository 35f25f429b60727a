//! Upstream API error type shared by every client.

use thiserror::Error;

/// Failure talking to an upstream API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx HTTP status.
    #[error("{service} API returned HTTP {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The API answered 2xx but reported an error in its body.
    #[error("{service} API error: {message}")]
    Api {
        service: &'static str,
        message: String,
    },

    /// Transport-level failure (DNS, TLS, connection, timeout).
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("Failed to decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    /// A caller-supplied id that cannot be used as one URL path segment.
    #[error("Invalid {service} identifier: {id:?}")]
    InvalidId { service: &'static str, id: String },

    /// A client could not be constructed.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub fn api(service: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            service,
            message: message.into(),
        }
    }

    pub fn decode(service: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            service,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Append `segments` to `base`, each as one percent-encoded path segment.
///
/// `/`, `?` and `#` inside a segment are escaped and cannot change the
/// endpoint. Empty and dot segments are rejected.
pub(crate) fn endpoint(
    service: &'static str,
    base: &str,
    segments: &[&str],
) -> ApiResult<reqwest::Url> {
    if let Some(bad) = segments
        .iter()
        .find(|s| s.is_empty() || **s == "." || **s == "..")
    {
        return Err(ApiError::InvalidId {
            service,
            id: bad.to_string(),
        });
    }

    let mut url = reqwest::Url::parse(base)
        .map_err(|e| ApiError::config(format!("invalid {service} base URL: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ApiError::config(format!("{service} base URL cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turn a non-2xx response into [`ApiError::Status`] carrying the body text.
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        body
    };
    Err(ApiError::Status {
        service,
        status: status.as_u16(),
        message,
    })
}

/// Deserialize a JSON body, reporting shape mismatches as [`ApiError::Decode`].
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::decode(service, e.to_string()))
}

/// Shared HTTP client builder.
pub(crate) fn http_client(user_agent: &str) -> ApiResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .map_err(|e| ApiError::config(format!("failed to build HTTP client: {e}")))
}
