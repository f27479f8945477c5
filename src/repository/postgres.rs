use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::book::{Book, BookChanges, BookFilter, FilterValue};

use super::{BookRepository, RepositoryError};

const SELECT_BOOKS: &str =
    "SELECT isbn, amazon_url, author, language, pages, publisher, title, year FROM books";

/// [`BookRepository`] over the `books` table.
#[derive(Debug, Clone)]
pub struct PostgresBookRepository {
    pool: PgPool,
}

impl PostgresBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    #[tracing::instrument(name = "find_all_books", skip(self))]
    async fn find_all(&self, filter: &BookFilter) -> Result<Vec<Book>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_BOOKS);

        // Column names come from `BookFilter::conditions`, never from the request.
        for (index, (column, value)) in filter.conditions().into_iter().enumerate() {
            query.push(if index == 0 { " WHERE " } else { " AND " });
            query.push(column);
            query.push(" = ");

            match value {
                FilterValue::Text(value) => {
                    query.push_bind(value.to_owned());
                }
                FilterValue::Integer(value) => {
                    query.push_bind(value);
                }
            }
        }

        query.push(" ORDER BY title, isbn");

        let books = query
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;

        tracing::trace!(count = books.len(), "Found");

        Ok(books)
    }

    #[tracing::instrument(name = "find_one_book", skip(self))]
    async fn find_one(&self, isbn: &str) -> Result<Book, RepositoryError> {
        sqlx::query_as::<_, Book>(&format!("{SELECT_BOOKS} WHERE isbn = $1"))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                isbn: isbn.to_string(),
            })
    }

    #[tracing::instrument(name = "create_book", skip_all, fields(isbn = %book.isbn))]
    async fn create(&self, book: Book) -> Result<Book, RepositoryError> {
        sqlx::query_as::<_, Book>(
            "INSERT INTO books (isbn, amazon_url, author, language, pages, publisher, title, year)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING isbn, amazon_url, author, language, pages, publisher, title, year",
        )
        .bind(&book.isbn)
        .bind(&book.amazon_url)
        .bind(&book.author)
        .bind(&book.language)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(&book.title)
        .bind(book.year)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepositoryError::Conflict {
                    isbn: book.isbn.clone(),
                }
            }
            _ => RepositoryError::Database(err),
        })
    }

    #[tracing::instrument(name = "update_book", skip(self))]
    async fn update(&self, isbn: &str, changes: BookChanges) -> Result<Book, RepositoryError> {
        sqlx::query_as::<_, Book>(
            "UPDATE books SET
                amazon_url = COALESCE($2, amazon_url),
                author = COALESCE($3, author),
                language = COALESCE($4, language),
                pages = COALESCE($5, pages),
                publisher = COALESCE($6, publisher),
                title = COALESCE($7, title),
                year = COALESCE($8, year)
             WHERE isbn = $1
             RETURNING isbn, amazon_url, author, language, pages, publisher, title, year",
        )
        .bind(isbn)
        .bind(changes.amazon_url)
        .bind(changes.author)
        .bind(changes.language)
        .bind(changes.pages)
        .bind(changes.publisher)
        .bind(changes.title)
        .bind(changes.year)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            isbn: isbn.to_string(),
        })
    }

    #[tracing::instrument(name = "remove_book", skip(self))]
    async fn remove(&self, isbn: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = $1")
            .bind(isbn)
            .execute(&self.pool)
            .await?;

        match result.rows_affected() {
            0 => Err(RepositoryError::NotFound {
                isbn: isbn.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        book::tests::test_book,
        database::{Database, DatabaseConfig},
    };

    use super::*;

    async fn repository() -> PostgresBookRepository {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let config = DatabaseConfig::new(url, 1, Duration::from_secs(5));

        let database = Database::connect(&config)
            .await
            .expect("Database is reachable");
        database.migrate().await.expect("Migrations apply");

        sqlx::query("DELETE FROM books")
            .execute(database.pool())
            .await
            .expect("Table is cleared");

        PostgresBookRepository::new(database.pool().clone())
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL instance at DATABASE_URL"]
    async fn crud_against_postgres() {
        let repository = repository().await;

        let created = repository.create(test_book()).await.expect("book is new");
        assert_eq!(created, test_book());

        assert!(matches!(
            repository.create(test_book()).await,
            Err(RepositoryError::Conflict { .. })
        ));

        let by_author = BookFilter {
            author: Some("Test Author".to_string()),
            year: Some(2020),
            ..Default::default()
        };
        assert_eq!(
            repository.find_all(&by_author).await.expect("listing works"),
            vec![test_book()]
        );

        let updated = repository
            .update(
                "1111111111",
                BookChanges {
                    pages: Some(150),
                    ..Default::default()
                },
            )
            .await
            .expect("book exists");
        assert_eq!(updated.pages, 150);
        assert_eq!(updated.title, "Test Book");

        assert!(matches!(
            repository
                .update(
                    "9999999999",
                    BookChanges {
                        title: Some("Nobody".to_string()),
                        ..Default::default()
                    },
                )
                .await,
            Err(RepositoryError::NotFound { .. })
        ));

        let earlier = Book {
            isbn: "2222222222".to_string(),
            title: "Another Book".to_string(),
            ..test_book()
        };
        repository.create(earlier).await.expect("book is new");

        let titles = repository
            .find_all(&BookFilter::default())
            .await
            .expect("listing works")
            .into_iter()
            .map(|book| book.title)
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Another Book", "Test Book"]);

        repository.remove("1111111111").await.expect("book exists");
        assert!(matches!(
            repository.remove("1111111111").await,
            Err(RepositoryError::NotFound { .. })
        ));
        assert!(matches!(
            repository.find_one("1111111111").await,
            Err(RepositoryError::NotFound { .. })
        ));
        assert_eq!(
            repository
                .find_all(&BookFilter::default())
                .await
                .expect("listing works")
                .len(),
            1
        );
    }
}
