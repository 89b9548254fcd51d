use lambda_http::http::StatusCode;
use lambda_http::{Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::errors::Error;
use crate::common::REQUEST_FAILED;

pub const BAD_PAYLOAD_ERROR: &str = "Bad post payload";

#[derive(Debug, Serialize)]
pub struct ReasonBody<'a> {
    pub status: &'a str,
    pub reason: &'a str,
}

#[derive(Debug, Serialize)]
pub struct MessageBody<'a> {
    pub status: &'a str,
    pub msg: &'a str,
}

pub fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
) -> Result<Response<String>, Error> {
    let response = Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(serde_json::to_string(body)?)?;

    Ok(response)
}

/// Builds a `{"status": "Request failed", "reason": ..}` response and wraps it
/// so that `?` sends it straight back to the caller.
pub fn failure(status: StatusCode, reason: &str) -> Error {
    let body = ReasonBody {
        status: REQUEST_FAILED,
        reason,
    };

    match json_response(status, &body) {
        Ok(response) => Error::HttpError(response),
        Err(err) => err,
    }
}

/// Parses the raw request body as JSON regardless of the content-type header.
pub fn extract_request<T: DeserializeOwned>(request: &Request) -> Result<T, Error> {
    let body: &[u8] = request.body().as_ref();
    if body.is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, BAD_PAYLOAD_ERROR));
    }

    serde_json::from_slice(body).map_err(|err| {
        tracing::error!("Unable to parse payload: {}", err);
        failure(StatusCode::BAD_REQUEST, BAD_PAYLOAD_ERROR)
    })
}
