use lambda_http::{Error as LambdaError, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("responded with status {}", .0.status())]
    HttpError(Response<String>),
    #[error("lambda error: {0}")]
    LambdaError(LambdaError),
}

impl From<LambdaError> for Error {
    fn from(err: LambdaError) -> Self {
        Error::LambdaError(err)
    }
}

impl From<lambda_http::http::Error> for Error {
    fn from(err: lambda_http::http::Error) -> Self {
        Error::LambdaError(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::LambdaError(Box::new(err))
    }
}
