use axum::http::StatusCode;
use thiserror::Error;

/// Failures of the survey flow. None of them is fatal to the page.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurveyError {
    /// A required field is missing. Raised before any network call.
    #[error("{0}")]
    Validation(String),

    /// Network failure, non-success HTTP status, timeout or unreadable body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote store answered but did not report success.
    #[error("remote store rejected the request: {0}")]
    RemoteRejection(String),

    #[error("a submission is already in progress")]
    Busy,
}

impl SurveyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

impl From<reqwest::Error> for SurveyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport("the remote store did not answer in time".to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<SurveyError> for AppError {
    fn from(err: SurveyError) -> Self {
        let status = match &err {
            SurveyError::Validation(_) => StatusCode::BAD_REQUEST,
            SurveyError::Transport(_) | SurveyError::RemoteRejection(_) => StatusCode::BAD_GATEWAY,
            SurveyError::Busy => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
