use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    book::BookUpdate,
    error::{ApiError, ErrorVerbosityProvider},
    extractor::{json::ApiJson, path::ApiPath, validated::Validated},
    state::ApiState,
};

use super::BookResponse;

pub struct UpdateBookResponse(pub BookResponse);

impl IntoResponse for UpdateBookResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self.0)).into_response()
    }
}

/// The book is addressed by the isbn in the path. The body can not change it.
pub async fn update_book(
    State(state): State<ApiState>,
    ApiPath(isbn): ApiPath<String>,
    Validated(ApiJson(update)): Validated<ApiJson<BookUpdate>>,
) -> Result<UpdateBookResponse, ApiError> {
    let book = state
        .books()
        .update(&isbn, update.changes())
        .await
        .map_err(|err| ApiError::from_repository_error(state.error_verbosity(), err))?;

    Ok(UpdateBookResponse(BookResponse { book }))
}
