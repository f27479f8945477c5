use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    book::{Book, BookFilter},
    error::{ApiError, ErrorVerbosityProvider},
    extractor::query::ApiQuery,
    state::ApiState,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ListBooksResponse {
    pub books: Vec<Book>,
}

impl IntoResponse for ListBooksResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

pub async fn list_books(
    State(state): State<ApiState>,
    ApiQuery(filter): ApiQuery<BookFilter>,
) -> Result<ListBooksResponse, ApiError> {
    let books = state
        .books()
        .find_all(&filter)
        .await
        .map_err(|err| ApiError::from_repository_error(state.error_verbosity(), err))?;

    Ok(ListBooksResponse { books })
}
