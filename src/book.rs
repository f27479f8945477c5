use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// A book as stored in the `books` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Book {
    pub isbn: String,
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i32,
    pub publisher: String,
    pub title: String,
    pub year: i32,
}

/// Creation payload.
///
/// Fields are optional only so that a missing field is reported as a violation
/// next to every other violation instead of failing deserialization.
#[derive(Debug, Default, Deserialize, JsonSchema, Validate)]
pub struct NewBook {
    #[validate(required(message = "is required"), length(min = 1, message = "must not be empty"))]
    pub isbn: Option<String>,
    #[validate(required(message = "is required"), length(min = 1, message = "must not be empty"))]
    pub amazon_url: Option<String>,
    #[validate(required(message = "is required"), length(min = 1, message = "must not be empty"))]
    pub author: Option<String>,
    #[validate(required(message = "is required"), length(min = 1, message = "must not be empty"))]
    pub language: Option<String>,
    #[validate(required(message = "is required"), range(min = 1, message = "must be positive"))]
    pub pages: Option<i32>,
    #[validate(required(message = "is required"), length(min = 1, message = "must not be empty"))]
    pub publisher: Option<String>,
    #[validate(required(message = "is required"), length(min = 1, message = "must not be empty"))]
    pub title: Option<String>,
    #[validate(required(message = "is required"))]
    pub year: Option<i32>,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}: is required")]
pub struct MissingField(pub &'static str);

/// Fails only for a [`NewBook`] that did not pass validation: every field is `required`.
impl TryFrom<NewBook> for Book {
    type Error = MissingField;

    fn try_from(new_book: NewBook) -> Result<Self, Self::Error> {
        Ok(Book {
            isbn: new_book.isbn.ok_or(MissingField("isbn"))?,
            amazon_url: new_book.amazon_url.ok_or(MissingField("amazon_url"))?,
            author: new_book.author.ok_or(MissingField("author"))?,
            language: new_book.language.ok_or(MissingField("language"))?,
            pages: new_book.pages.ok_or(MissingField("pages"))?,
            publisher: new_book.publisher.ok_or(MissingField("publisher"))?,
            title: new_book.title.ok_or(MissingField("title"))?,
            year: new_book.year.ok_or(MissingField("year"))?,
        })
    }
}

/// Partial update payload.
///
/// `isbn` is only deserialized to be rejected: a book's identity never changes.
#[derive(Debug, Default, Deserialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_update", skip_on_field_errors = false))]
pub struct BookUpdate {
    pub isbn: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub amazon_url: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub author: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub language: Option<String>,
    #[validate(range(min = 1, message = "must be positive"))]
    pub pages: Option<i32>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub publisher: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub title: Option<String>,
    pub year: Option<i32>,
}

fn validate_update(update: &BookUpdate) -> Result<(), ValidationError> {
    if update.isbn.is_some() {
        return Err(schema_error("isbn_immutable", "isbn can not be updated"));
    }

    if update.changes().is_empty() {
        return Err(schema_error(
            "no_changes",
            "at least one field must be supplied",
        ));
    }

    Ok(())
}

fn schema_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

impl BookUpdate {
    /// The mutable fields of this update. `isbn` is dropped.
    pub fn changes(&self) -> BookChanges {
        BookChanges {
            amazon_url: self.amazon_url.clone(),
            author: self.author.clone(),
            language: self.language.clone(),
            pages: self.pages,
            publisher: self.publisher.clone(),
            title: self.title.clone(),
            year: self.year,
        }
    }
}

/// The fields an update may touch. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub amazon_url: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub pages: Option<i32>,
    pub publisher: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        *self == BookChanges::default()
    }

    pub fn apply_to(self, book: &mut Book) {
        if let Some(amazon_url) = self.amazon_url {
            book.amazon_url = amazon_url;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(language) = self.language {
            book.language = language;
        }
        if let Some(pages) = self.pages {
            book.pages = pages;
        }
        if let Some(publisher) = self.publisher {
            book.publisher = publisher;
        }
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(year) = self.year {
            book.year = year;
        }
    }
}

/// Exact match filter for listing books, parsed from the query string.
///
/// Unknown keys are ignored, absent keys impose no constraint.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct BookFilter {
    pub isbn: Option<String>,
    pub amazon_url: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub pages: Option<i32>,
    pub publisher: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterValue<'a> {
    Text(&'a str),
    Integer(i32),
}

impl BookFilter {
    /// `(column, value)` pairs for every supplied key, text columns first.
    pub fn conditions(&self) -> Vec<(&'static str, FilterValue<'_>)> {
        let text = [
            ("isbn", &self.isbn),
            ("amazon_url", &self.amazon_url),
            ("author", &self.author),
            ("language", &self.language),
            ("publisher", &self.publisher),
            ("title", &self.title),
        ]
        .into_iter()
        .filter_map(|(column, value)| {
            value
                .as_deref()
                .map(|value| (column, FilterValue::Text(value)))
        });

        let integer = [("pages", self.pages), ("year", self.year)]
            .into_iter()
            .filter_map(|(column, value)| value.map(|value| (column, FilterValue::Integer(value))));

        text.chain(integer).collect()
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.conditions()
            .into_iter()
            .all(|(column, value)| match (column, value) {
                ("isbn", FilterValue::Text(value)) => book.isbn == value,
                ("amazon_url", FilterValue::Text(value)) => book.amazon_url == value,
                ("author", FilterValue::Text(value)) => book.author == value,
                ("language", FilterValue::Text(value)) => book.language == value,
                ("pages", FilterValue::Integer(value)) => book.pages == value,
                ("publisher", FilterValue::Text(value)) => book.publisher == value,
                ("title", FilterValue::Text(value)) => book.title == value,
                ("year", FilterValue::Integer(value)) => book.year == value,
                _ => false,
            })
    }
}
