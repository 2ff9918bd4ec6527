use anybot::{
    authoring::AuthoringError, taxonomy::TaxonomyError, ChatError, PromptError, StoreError,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::multipart::MultipartError;
use serde_json::json;
use tracing::error;

/// A custom error type for the server application.
///
/// This enum encapsulates different kinds of errors that can occur within the server,
/// allowing them to be converted into appropriate HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors from the AI provider layer.
    Prompt(PromptError),
    /// Errors from the application-state store.
    Store(StoreError),
    /// Errors from a chat turn.
    Chat(ChatError),
    /// The request was well-formed JSON but not acceptable.
    BadRequest(String),
    /// A path id did not resolve.
    NotFound(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<PromptError> for AppError {
    fn from(err: PromptError) -> Self {
        AppError::Prompt(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Store(e) => AppError::Store(e),
            other => AppError::Chat(other),
        }
    }
}

impl From<AuthoringError> for AppError {
    fn from(err: AuthoringError) -> Self {
        match err {
            AuthoringError::Prompt(e) => AppError::Prompt(e),
            AuthoringError::Store(e) => AppError::Store(e),
        }
    }
}

/// A multipart body that cannot be read is the client's fault.
impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(format!("Malformed multipart upload: {err}"))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

fn prompt_status(err: &PromptError) -> (StatusCode, String) {
    match err {
        PromptError::MissingAiProvider(_) | PromptError::MissingApiKey => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server is not configured correctly.".to_string(),
        ),
        PromptError::AiRequest(e) => (
            StatusCode::BAD_GATEWAY,
            format!("Request to AI provider failed: {e}"),
        ),
        PromptError::AiDeserialization(e) => (
            StatusCode::BAD_GATEWAY,
            format!("Failed to deserialize AI provider response: {e}"),
        ),
        PromptError::AiApi(e) => (StatusCode::BAD_GATEWAY, format!("AI provider error: {e}")),
        PromptError::JsonSerialization(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to serialize result: {e}"),
        ),
        PromptError::ReqwestClientBuild(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to build HTTP client: {e}"),
        ),
    }
}

fn store_status(err: &StoreError) -> (StatusCode, String) {
    let status = match err {
        StoreError::NotFound { .. } | StoreError::Taxonomy(TaxonomyError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        StoreError::Duplicate { .. } | StoreError::Taxonomy(TaxonomyError::DuplicateId(_)) => {
            StatusCode::CONFLICT
        }
        StoreError::Taxonomy(_) | StoreError::InvalidRule(_) | StoreError::InvalidSetting(_) => {
            StatusCode::BAD_REQUEST
        }
        StoreError::Corrupt { .. } | StoreError::Io(_) | StoreError::Serialization(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to persist application state.".to_string(),
            )
        }
    };
    (status, err.to_string())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match &self {
            AppError::Prompt(err) => {
                // Log the original error for debugging purposes
                error!("PromptError: {:?}", err);
                prompt_status(err)
            }
            AppError::Store(err) => {
                error!("StoreError: {:?}", err);
                store_status(err)
            }
            AppError::Chat(err) => {
                let status = match err {
                    ChatError::UnknownBot(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, err.to_string())
            }
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
