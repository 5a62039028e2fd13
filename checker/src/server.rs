//! Server side of the checker exchange, answered by the in-process rules.

use anyhow::{Context, Result};
use deduct_core::{CheckRequest, check_locally};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::{FrameReader, FrameWriter};
use crate::protocol::{
    CHECK_METHOD, INVALID_PARAMS, INVALID_REQUEST, IncomingRequest, METHOD_NOT_FOUND, Response,
    RpcError,
};

/// Answers framed `check` requests until the client closes the stream.
pub async fn serve<R, W>(input: R, output: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = FrameReader::new(input);
    let mut writer = FrameWriter::new(output);
    let mut answered = 0usize;
    while let Some(frame) = reader.read_frame().await? {
        let response = answer(frame);
        let frame = serde_json::to_value(&response).context("encoding response")?;
        writer.write_frame(&frame).await?;
        answered += 1;
    }
    tracing::debug!("check-server answered {answered} request(s)");
    Ok(())
}

fn answer(frame: Value) -> Response {
    let request: IncomingRequest = match serde_json::from_value(frame) {
        Ok(request) => request,
        Err(err) => {
            return Response::failure(Value::Null, RpcError::new(INVALID_REQUEST, err.to_string()));
        }
    };
    if request.method != CHECK_METHOD {
        return Response::failure(
            request.id,
            RpcError::new(METHOD_NOT_FOUND, format!("unknown method '{}'", request.method)),
        );
    }
    let params = request.params.unwrap_or(Value::Null);
    let outcome = serde_json::from_value::<CheckRequest>(params)
        .map_err(|err| err.to_string())
        .and_then(|params| check_locally(&params).map_err(|err| err.to_string()));
    match outcome {
        Ok(verdict) => Response::success(request.id, verdict.into()),
        Err(message) => {
            tracing::warn!("rejecting check request: {message}");
            Response::failure(request.id, RpcError::new(INVALID_PARAMS, message))
        }
    }
}
