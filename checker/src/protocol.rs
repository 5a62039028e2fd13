//! JSON-RPC messages of the checker exchange.
//!
//! An `invalid params` error means the checker read the proof and refused it,
//! so it is a verdict like any `result`. Every other error object says the
//! two sides do not speak the same protocol, and is a [`CheckerFault`].

use deduct_core::{CheckRequest, CheckerFault, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CHECK_METHOD: &str = "check";

pub(crate) const INVALID_REQUEST: i64 = -32600;
pub(crate) const METHOD_NOT_FOUND: i64 = -32601;
pub(crate) const INVALID_PARAMS: i64 = -32602;

const REJECTED_WITHOUT_MESSAGE: &str = "The external checker rejected this claim";

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: &'a CheckRequest,
}

impl<'a> Request<'a> {
    pub fn check(id: u64, params: &'a CheckRequest) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: CHECK_METHOD,
            params,
        }
    }
}

/// A request as the server sees it, before the params are trusted.
#[derive(Debug, Deserialize)]
pub(crate) struct IncomingRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Answer to a `check` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Verdict> for CheckResult {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Valid => Self {
                valid: true,
                message: None,
            },
            Verdict::Invalid(message) => Self {
                valid: false,
                message: Some(message),
            },
        }
    }
}

impl From<CheckResult> for Verdict {
    fn from(result: CheckResult) -> Self {
        if result.valid {
            Self::Valid
        } else {
            Self::Invalid(
                result
                    .message
                    .unwrap_or_else(|| REJECTED_WITHOUT_MESSAGE.to_string()),
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub(crate) fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Response {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CheckResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Value, result: CheckResult) -> Self {
        Self {
            jsonrpc: Some("2.0".to_string()),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: Some("2.0".to_string()),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Interprets the frame answering request `id`.
pub(crate) fn decode_response(id: u64, frame: Value) -> Result<Verdict, CheckerFault> {
    let response: Response = serde_json::from_value(frame)
        .map_err(|err| CheckerFault::Protocol(format!("not a check response: {err}")))?;
    if response.id.as_u64() != Some(id) {
        return Err(CheckerFault::Protocol(format!(
            "response id {} does not match request id {id}",
            response.id
        )));
    }
    match (response.result, response.error) {
        (_, Some(error)) if error.code == INVALID_PARAMS => Ok(Verdict::Invalid(format!(
            "The checker rejected this proof: {}",
            error.message
        ))),
        (_, Some(error)) => Err(CheckerFault::Rejected {
            code: error.code,
            message: error.message,
        }),
        (Some(result), None) => Ok(result.into()),
        (None, None) => Err(CheckerFault::Protocol(
            "response carries neither result nor error".to_string(),
        )),
    }
}
