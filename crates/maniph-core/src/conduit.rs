use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Per-call timeout. Conduit calls are small; anything slower than this is
/// treated as a failure rather than waited out.
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConduitError {
    #[error("HTTP request to {method} failed: {source}")]
    Http {
        method: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("Failed to read response from {method}: {source}")]
    Io {
        method: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{method} rejected by server ({code}): {info}")]
    Remote {
        method: String,
        code: String,
        info: String,
    },
}

/// The seam between request building and the network. Resolution and
/// mutation code is generic over this so tests can substitute a recording
/// fake for the real HTTP client.
pub trait Transport {
    fn call(&self, method: &str, params: &[(String, String)]) -> Result<Value, ConduitError>;
}

/// Blocking client for the Conduit form-encoded RPC API.
pub struct Conduit {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl Conduit {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(CALL_TIMEOUT).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for Conduit {
    fn call(&self, method: &str, params: &[(String, String)]) -> Result<Value, ConduitError> {
        let url = format!("{}/api/{}", self.base_url, method);
        let mut form: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 1);
        form.push(("api.token", self.token.as_str()));
        for (key, value) in params {
            form.push((key.as_str(), value.as_str()));
        }
        let response = self
            .agent
            .post(&url)
            .send_form(&form)
            .map_err(|err| ConduitError::Http {
                method: method.to_string(),
                source: Box::new(err),
            })?;
        let body: Value = response.into_json().map_err(|err| ConduitError::Io {
            method: method.to_string(),
            source: err,
        })?;
        interpret(method, body)
    }
}

/// A Conduit response is HTTP 200 even when the call failed; the error is
/// carried in `error_code`/`error_info` next to the `result` payload.
fn interpret(method: &str, body: Value) -> Result<Value, ConduitError> {
    if let Some(code) = body.get("error_code").and_then(Value::as_str) {
        let info = body
            .get("error_info")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(ConduitError::Remote {
            method: method.to_string(),
            code: code.to_string(),
            info,
        });
    }
    Ok(body.get("result").cloned().unwrap_or(Value::Null))
}
