use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::ApiError;
use crate::portal::KeyRecord;

/// The wrapper the portal places around every JSON response.
///
/// A successful response looks something like:
/// ```json
/// {
///     "resultCode": 0,
///     "keys": [{ "keyId": "...", "keyName": "..." }]
/// }
/// ```
///
/// Failures still (usually) arrive with a 200, but carry a non-zero
/// `resultCode` alongside a human-readable `userString`.
#[derive(Deserialize, Debug)]
pub struct Envelope {
    #[serde(rename = "resultCode", default)]
    pub result_code: i64,
    #[serde(rename = "userString", default)]
    pub user_string: Option<String>,
    #[serde(rename = "resultString", default)]
    pub result_string: Option<String>,
    /// Whatever payload accompanies the result.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Envelope {
    pub fn parse(text: &str) -> Result<Self, ApiError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Fails if the portal reported an error via its result code,
    /// reporting it as the kind of refusal the endpoint implies.
    pub fn ensure_success(self, refusal: Refusal<'_>) -> Result<Self, ApiError> {
        if self.result_code == 0 {
            return Ok(self);
        }

        let message = self
            .user_string
            .or(self.result_string)
            .unwrap_or_else(|| "unknown portal error".to_string());
        tracing::warn!(code = self.result_code, %message, "portal refused request");

        Err(match refusal {
            Refusal::Portal => ApiError::Portal {
                code: self.result_code,
                message,
            },
            Refusal::Permission => ApiError::Permission { message },
            Refusal::NotFound(id) => ApiError::not_found(id),
        })
    }

    /// Takes the `keys` array out of this response.
    /// A response without one is treated as having no keys.
    pub fn into_keys(mut self) -> Result<Vec<KeyRecord>, ApiError> {
        match self.body.remove("keys") {
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(keys) => Ok(serde_json::from_value(keys)?),
        }
    }
}

/// How a non-zero `resultCode` should be reported for a given endpoint.
///
/// The portal answers most refusals with a 200, so the endpoint decides what one means:
/// a lookup by id can only fail because the key isn't visible to us, while
/// revoking or downloading fails when the key's capability flags forbid it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal<'a> {
    Portal,
    Permission,
    NotFound(&'a str),
}

/// Executes the given request, returning its body on success.
///
/// `key_id` is the key this request concerns, if any.
/// It's used to turn a 404 into something more meaningful.
pub async fn send(request: RequestBuilder, key_id: Option<&str>) -> Result<String, ApiError> {
    let response = request.send().await.map_err(|error| {
        tracing::warn!(%error, "portal request failed");
        ApiError::Transport(error)
    })?;

    let status = response.status();
    let body = response.text().await?;
    check_status(status, body, key_id)
}

fn check_status(status: StatusCode, body: String, key_id: Option<&str>) -> Result<String, ApiError> {
    if status.is_success() {
        return Ok(body);
    }

    tracing::warn!(%status, "portal returned an unsuccessful status");
    let error = match (status, key_id) {
        (StatusCode::NOT_FOUND, Some(id)) => ApiError::not_found(id),
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            let message = if body.is_empty() {
                status.to_string()
            } else {
                body
            };
            ApiError::permission(message)
        }
        _ => ApiError::Status { status, body },
    };
    Err(error)
}
