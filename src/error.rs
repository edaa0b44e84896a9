use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "Server not configured. Missing: {}. Set AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, S3_ENDPOINT and BUCKET.",
        .missing.join(", ")
    )]
    NotConfigured { missing: Vec<&'static str> },

    #[error("key is required")]
    KeyRequired,

    #[error("{0}")]
    Store(String),

    #[error("Object store did not respond within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Invalid presigning parameters: {0}")]
    Presign(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::KeyRequired => StatusCode::BAD_REQUEST,
            Error::NotConfigured { .. }
            | Error::Store(_)
            | Error::Timeout(_)
            | Error::Presign(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = %status, "{}", message);
        } else {
            warn!(status = %status, "{}", message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
