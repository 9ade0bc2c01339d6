use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Errors returned to gateway callers.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("missing params: {0}")]
    MissingParams(&'static str),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Send(#[from] satele_channels::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MissingParams(_) | Self::Send(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
