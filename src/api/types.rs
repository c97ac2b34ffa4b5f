use serde::Serialize;

use crate::db::{Author, Book};
use crate::services::cover_url;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorDto {
    pub id: i32,
    pub email: String,
}

impl From<Author> for AuthorDto {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            email: author.email,
        }
    }
}

/// Wire shape of a book. `cover_image` carries the fully qualified URL
/// (`coverImage` on the wire), or null when the book has no cover.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDto {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub rating: Option<i32>,
    pub author_id: i32,
    pub cover_image: Option<String>,
}

impl BookDto {
    /// `base_url` is the scheme and host the caller reached us on; the stored
    /// filename becomes a fully qualified `/uploads/` URL.
    #[must_use]
    pub fn from_book(book: Book, base_url: &str) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            genre: book.genre,
            rating: book.rating,
            author_id: book.author_id,
            cover_image: book.cover_image.map(|f| cover_url(base_url, &f)),
        }
    }
}
