use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("login required")]
    Unauthorized,
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Outcome of a user-initiated write (favorite, scrap, apply, resume edits).
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("please log in first")]
    LoginRequired,
    #[error("{0}")]
    Validation(String),
    #[error("action failed: {0}")]
    Failed(ApiError),
}

impl From<ApiError> for ActionError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized => ActionError::LoginRequired,
            other => ActionError::Failed(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_maps_to_login_required() {
        let err: ActionError = ApiError::Unauthorized.into();
        assert!(matches!(err, ActionError::LoginRequired));
        assert_eq!(err.to_string(), "please log in first");
    }

    #[test]
    fn test_other_errors_map_to_failed() {
        let err: ActionError = ApiError::Status {
            status: 500,
            body: "boom".to_string(),
        }
        .into();
        assert!(matches!(err, ActionError::Failed(ApiError::Status { status: 500, .. })));
        assert!(err.to_string().contains("500"));
    }
}
