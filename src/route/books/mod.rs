use serde::{Deserialize, Serialize};

use crate::book::Book;

pub mod app;
pub mod create_book;
pub mod delete_book;
pub mod get_book;
pub mod list_books;
pub mod update_book;

/// `{"book": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct BookResponse {
    pub book: Book,
}
