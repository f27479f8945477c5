use async_trait::async_trait;

use crate::book::{Book, BookChanges, BookFilter};

mod memory;
mod postgres;

pub use memory::MemoryBookRepository;
pub use postgres::PostgresBookRepository;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Book {isbn} not found")]
    NotFound { isbn: String },

    #[error("Book {isbn} already exists")]
    Conflict { isbn: String },

    #[error("Database failure: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage of books. Every call is one unit of work against the backing store.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Books matching every condition of `filter`, ordered by title.
    async fn find_all(&self, filter: &BookFilter) -> Result<Vec<Book>, RepositoryError>;

    async fn find_one(&self, isbn: &str) -> Result<Book, RepositoryError>;

    /// Inserts a book that already passed validation and returns it as stored.
    async fn create(&self, book: Book) -> Result<Book, RepositoryError>;

    /// Applies `changes` to the book with `isbn` and returns the result.
    async fn update(&self, isbn: &str, changes: BookChanges) -> Result<Book, RepositoryError>;

    async fn remove(&self, isbn: &str) -> Result<(), RepositoryError>;
}
