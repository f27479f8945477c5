use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::book::{Book, BookChanges, BookFilter};

use super::{BookRepository, RepositoryError};

/// Keeps books in process memory. Used with `--in-memory` and by the tests.
#[derive(Debug, Default)]
pub struct MemoryBookRepository {
    books: RwLock<HashMap<String, Book>>,
}

impl MemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_books(books: impl IntoIterator<Item = Book>) -> Self {
        let books = books
            .into_iter()
            .map(|book| (book.isbn.clone(), book))
            .collect();

        Self {
            books: RwLock::new(books),
        }
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn find_all(&self, filter: &BookFilter) -> Result<Vec<Book>, RepositoryError> {
        let books = self.books.read().await;

        let mut found = books
            .values()
            .filter(|book| filter.matches(book))
            .cloned()
            .collect::<Vec<_>>();

        found.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.isbn.cmp(&b.isbn)));

        Ok(found)
    }

    async fn find_one(&self, isbn: &str) -> Result<Book, RepositoryError> {
        self.books
            .read()
            .await
            .get(isbn)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound {
                isbn: isbn.to_string(),
            })
    }

    async fn create(&self, book: Book) -> Result<Book, RepositoryError> {
        let mut books = self.books.write().await;

        if books.contains_key(&book.isbn) {
            return Err(RepositoryError::Conflict { isbn: book.isbn });
        }

        books.insert(book.isbn.clone(), book.clone());

        Ok(book)
    }

    async fn update(&self, isbn: &str, changes: BookChanges) -> Result<Book, RepositoryError> {
        let mut books = self.books.write().await;

        let book = books
            .get_mut(isbn)
            .ok_or_else(|| RepositoryError::NotFound {
                isbn: isbn.to_string(),
            })?;

        changes.apply_to(book);

        Ok(book.clone())
    }

    async fn remove(&self, isbn: &str) -> Result<(), RepositoryError> {
        self.books
            .write()
            .await
            .remove(isbn)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound {
                isbn: isbn.to_string(),
            })
    }
}
