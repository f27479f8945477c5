use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    book::{Book, NewBook},
    error::{ApiError, ErrorVerbosityProvider, InternalServerError},
    extractor::{json::ApiJson, validated::Validated},
    state::ApiState,
};

use super::BookResponse;

pub struct CreateBookResponse(pub BookResponse);

impl IntoResponse for CreateBookResponse {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

pub async fn create_book(
    State(state): State<ApiState>,
    Validated(ApiJson(new_book)): Validated<ApiJson<NewBook>>,
) -> Result<CreateBookResponse, ApiError> {
    let verbosity = state.error_verbosity();

    // Validation requires every field, a missing one here is a bug.
    let book = Book::try_from(new_book)
        .map_err(|missing| InternalServerError::from_generic_error(verbosity, missing))?;

    tracing::debug!(isbn = %book.isbn, "Creating book");

    let book = state
        .books()
        .create(book)
        .await
        .map_err(|err| ApiError::from_repository_error(verbosity, err))?;

    Ok(CreateBookResponse(BookResponse { book }))
}
