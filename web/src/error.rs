use std::error::Error as StdError;

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The request's query string could not be read as the endpoint's parameters.
    InvalidParams(String),
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        match self {
            Error::InvalidParams(reason) => write!(fmt, "Invalid parameters: {reason}"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidParams(reason) => {
                warn!("Rejecting request with invalid parameters: {}", reason);
                (StatusCode::BAD_REQUEST, format!("BAD REQUEST: {reason}")).into_response()
            }
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::InvalidParams(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_params_map_to_bad_request() {
        let response = Error::InvalidParams("duplicate field `count`".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
