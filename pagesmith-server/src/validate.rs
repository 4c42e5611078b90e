//! Admission check for inbound task bodies.
//!
//! Works on the raw bytes so the secret can be judged before the rest of the
//! shape: a body with a wrong secret is an authentication failure even when
//! other fields are malformed.

use sha2::{Digest, Sha256};

use crate::error::RequestError;
use crate::task::TaskRequest;

/// Parse `body` into a [`TaskRequest`] and check it carries `expected_secret`.
pub fn validate(body: &[u8], expected_secret: &str) -> Result<TaskRequest, RequestError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| RequestError::Validation(format!("invalid JSON: {e}")))?;

    if let Some(secret) = value.get("secret").and_then(|s| s.as_str())
        && !secrets_match(secret, expected_secret)
    {
        return Err(RequestError::Authentication);
    }

    let request: TaskRequest =
        serde_json::from_value(value).map_err(|e| RequestError::Validation(e.to_string()))?;

    match request.evaluation_url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(RequestError::Validation(format!(
                "evaluation_url must be http or https, got {other}"
            )));
        }
    }

    Ok(request)
}

/// Compare digests so the comparison time does not depend on how much of the
/// secret was guessed.
fn secrets_match(given: &str, expected: &str) -> bool {
    let a = Sha256::digest(given.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
