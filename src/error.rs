use std::{borrow::Cow, fmt};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::From;
use serde::Serialize;
use validator::ValidationErrors;

use crate::repository::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ErrorVerbosity {
    /// Server returns only the appropriate status code.
    StatusCode,
    /// Server returns the message and the status inside an `error` object.
    Message,
    /// Like [`ErrorVerbosity::Message`], plus the error reason and the expected schema where available.
    Full,
}

impl ErrorVerbosity {
    pub fn should_generate_error_reason(&self) -> bool {
        matches!(self, ErrorVerbosity::Full)
    }
}

pub trait ErrorVerbosityProvider {
    /// Returns the error verbosity.
    fn error_verbosity(&self) -> ErrorVerbosity;
}

#[derive(Debug, Serialize)]
struct ApiErrorResponse<'a> {
    error: ApiErrorDetails<'a>,
}

#[derive(Debug, Serialize)]
struct ApiErrorDetails<'a> {
    message: &'a str,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_schema: Option<&'a str>,
}

/// API error
///
/// Every handler and extractor rejects with this type. It is turned into a status code and a
/// `{"error": {"message", "status"}}` body depending on the configured [`ErrorVerbosity`].
#[derive(Debug, From)]
pub enum ApiError {
    /// The request payload, query or path is not as expected.
    BadRequest(BadRequestError),
    /// The requested book or route does not exist.
    NotFound(NotFoundError),
    /// A book with the same isbn already exists.
    Conflict(ConflictError),
    /// The route exists but does not support the method.
    MethodNotAllowed(MethodNotAllowedError),
    /// Anything unclassified, mostly storage failures.
    InternalServerError(InternalServerError),
}

impl ApiError {
    /// Translates a repository failure.
    pub fn from_repository_error(verbosity: ErrorVerbosity, err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { isbn } => NotFoundError::book(verbosity, &isbn).into(),
            RepositoryError::Conflict { isbn } => ConflictError::new(verbosity, &isbn).into(),
            err @ RepositoryError::Database(_) => {
                InternalServerError::from_generic_error(verbosity, err).into()
            }
        }
    }

    fn verbosity(&self) -> ErrorVerbosity {
        match self {
            ApiError::BadRequest(err) => err.verbosity,
            ApiError::NotFound(err) => err.verbosity,
            ApiError::Conflict(err) => err.verbosity,
            ApiError::MethodNotAllowed(err) => err.verbosity,
            ApiError::InternalServerError(err) => err.verbosity,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(err) => err.message.as_str(),
            ApiError::NotFound(err) => err.message.as_ref(),
            ApiError::Conflict(err) => err.message.as_str(),
            ApiError::MethodNotAllowed(_) => "Method not allowed",
            ApiError::InternalServerError(_) => "An internal server error has occurred",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn reason(&self) -> Option<&str> {
        match self {
            ApiError::InternalServerError(err) => err.internal_server_error.as_deref(),
            _ => None,
        }
    }

    fn expected_schema(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest(err) => err.expected_schema.as_deref(),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        match self.verbosity() {
            ErrorVerbosity::StatusCode => status_code.into_response(),
            ErrorVerbosity::Message | ErrorVerbosity::Full => {
                let response = ApiErrorResponse {
                    error: ApiErrorDetails {
                        message: self.message(),
                        status: status_code.as_u16(),
                        reason: self.reason(),
                        expected_schema: self.expected_schema(),
                    },
                };

                (status_code, Json(response)).into_response()
            }
        }
    }
}

#[derive(Debug)]
pub struct BadRequestError {
    verbosity: ErrorVerbosity,
    message: String,
    expected_schema: Option<String>,
}

impl BadRequestError {
    /// One message per violated constraint, sorted and joined with `"; "`.
    pub fn from_violations(verbosity: ErrorVerbosity, mut violations: Vec<Violation>) -> Self {
        violations.sort();

        let message = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");

        BadRequestError {
            verbosity,
            message,
            expected_schema: None,
        }
    }

    /// A request part could not be parsed at all.
    pub fn from_rejection(
        verbosity: ErrorVerbosity,
        reason: String,
        expected_schema: impl FnOnce() -> Option<String>,
    ) -> Self {
        let expected_schema = verbosity
            .should_generate_error_reason()
            .then(expected_schema)
            .flatten();

        BadRequestError {
            verbosity,
            message: reason,
            expected_schema,
        }
    }
}

/// A violated constraint of a request payload.
///
/// `field` is `None` for constraints spanning the whole payload. Orders by field, then message.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Violation {
    pub field: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Violation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn payload(message: impl Into<String>) -> Self {
        Violation {
            field: None,
            message: message.into(),
        }
    }

    pub fn concerns(&self, field: &str) -> bool {
        self.field.as_deref() == Some(field)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Flattens [`ValidationErrors`] into sorted violations.
///
/// Schema level errors (reported under `__all__`) are not tied to a field.
pub fn violations(errors: &ValidationErrors) -> Vec<Violation> {
    let mut violations = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| error.code.to_string());

                let field: &str = &field;

                match field {
                    "__all__" => Violation::payload(message),
                    field => Violation::field(field, message),
                }
            })
        })
        .collect::<Vec<_>>();

    violations.sort();
    violations
}

#[derive(Debug)]
pub struct NotFoundError {
    verbosity: ErrorVerbosity,
    message: Cow<'static, str>,
}

impl NotFoundError {
    pub fn book(verbosity: ErrorVerbosity, isbn: &str) -> Self {
        NotFoundError {
            verbosity,
            message: Cow::Owned(format!("There is no book with isbn '{isbn}'")),
        }
    }

    pub fn route(verbosity: ErrorVerbosity) -> Self {
        NotFoundError {
            verbosity,
            message: Cow::Borrowed("The requested resource was not found"),
        }
    }
}

#[derive(Debug)]
pub struct ConflictError {
    verbosity: ErrorVerbosity,
    message: String,
}

impl ConflictError {
    pub fn new(verbosity: ErrorVerbosity, isbn: &str) -> Self {
        ConflictError {
            verbosity,
            message: format!("A book with isbn '{isbn}' already exists"),
        }
    }
}

#[derive(Debug)]
pub struct MethodNotAllowedError {
    verbosity: ErrorVerbosity,
}

impl MethodNotAllowedError {
    pub fn new(verbosity: ErrorVerbosity) -> Self {
        MethodNotAllowedError { verbosity }
    }
}

#[derive(Debug)]
pub struct InternalServerError {
    verbosity: ErrorVerbosity,
    internal_server_error: Option<String>,
}

impl InternalServerError {
    pub fn from_generic_error<E: Into<anyhow::Error>>(verbosity: ErrorVerbosity, err: E) -> Self {
        let err: anyhow::Error = err.into();
        let err = format!("{err:#}");
        tracing::error!(%err, "Internal server error");

        let internal_server_error = verbosity.should_generate_error_reason().then_some(err);

        InternalServerError {
            verbosity,
            internal_server_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    use super::*;

    async fn body_json(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body is readable")
            .to_bytes();

        (status, serde_json::from_slice(&bytes).expect("body is json"))
    }

    #[tokio::test]
    async fn not_found_has_message_and_status() {
        let (status, body) =
            body_json(NotFoundError::book(ErrorVerbosity::Message, "9999999999").into()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({"error": {"message": "There is no book with isbn '9999999999'", "status": 404}})
        );
    }

    #[tokio::test]
    async fn conflict_maps_to_409() {
        let (status, body) =
            body_json(ConflictError::new(ErrorVerbosity::Message, "1111111111").into()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["status"], 409);
    }

    #[tokio::test]
    async fn internal_reason_is_hidden_unless_full() {
        let io = || std::io::Error::new(std::io::ErrorKind::Other, "connection reset");

        let (status, body) =
            body_json(InternalServerError::from_generic_error(ErrorVerbosity::Message, io()).into())
                .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"error": {"message": "An internal server error has occurred", "status": 500}})
        );

        let (_, body) =
            body_json(InternalServerError::from_generic_error(ErrorVerbosity::Full, io()).into())
                .await;
        assert_eq!(body["error"]["reason"], "connection reset");
    }

    #[tokio::test]
    async fn status_code_verbosity_has_empty_body() {
        let response: Response = ApiError::from(MethodNotAllowedError::new(
            ErrorVerbosity::StatusCode,
        ))
        .into_response();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body is readable")
            .to_bytes();
        assert!(bytes.is_empty());
    }

    #[test]
    fn violations_are_joined() {
        let error = BadRequestError::from_violations(
            ErrorVerbosity::Message,
            vec![
                Violation::field("pages", "must be positive"),
                Violation::payload("at least one field must be supplied"),
                Violation::field("author", "is required"),
            ],
        );

        assert_eq!(
            error.message,
            "at least one field must be supplied; author: is required; pages: must be positive"
        );
    }

    #[test]
    fn repository_errors_map_to_kinds() {
        let verbosity = ErrorVerbosity::Message;

        let not_found = ApiError::from_repository_error(
            verbosity,
            RepositoryError::NotFound {
                isbn: "1".to_string(),
            },
        );
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let conflict = ApiError::from_repository_error(
            verbosity,
            RepositoryError::Conflict {
                isbn: "1".to_string(),
            },
        );
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let internal = ApiError::from_repository_error(
            verbosity,
            RepositoryError::Database(sqlx::Error::PoolTimedOut),
        );
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
