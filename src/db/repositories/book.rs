use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tracing::info;

use crate::entities::{books, prelude::*};

/// Book row as exposed to the rest of the service. `cover_image` holds the
/// stored filename only.
#[derive(Debug, Clone)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub rating: Option<i32>,
    pub author_id: i32,
    pub cover_image: Option<String>,
}

impl From<books::Model> for Book {
    fn from(model: books::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            author: model.author,
            genre: model.genre,
            rating: model.rating,
            author_id: model.author_id,
            cover_image: model.cover_image,
        }
    }
}

/// Fields for a new book. Validation happens before this is built.
#[derive(Debug, Clone)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub rating: Option<i32>,
    pub author_id: i32,
    pub cover_image: Option<String>,
}

/// Field changes for an update. Title and author must always be resupplied;
/// `cover_image: None` keeps whatever filename is already stored.
#[derive(Debug, Clone)]
pub struct BookChanges {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub rating: Option<i32>,
    pub cover_image: Option<String>,
}

pub struct BookRepository {
    conn: DatabaseConnection,
}

impl BookRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// All books owned by an author, in storage order. An unknown author
    /// yields an empty list, not an error.
    pub async fn list_for_author(&self, author_id: i32) -> Result<Vec<Book>> {
        let rows = Books::find()
            .filter(books::Column::AuthorId.eq(author_id))
            .all(&self.conn)
            .await
            .context("Failed to list books for author")?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<Book>> {
        let book = Books::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query book by ID")?;

        Ok(book.map(Book::from))
    }

    pub async fn add(&self, draft: &BookDraft) -> Result<Book> {
        let inserted = books::ActiveModel {
            title: Set(draft.title.clone()),
            author: Set(draft.author.clone()),
            genre: Set(draft.genre.clone()),
            rating: Set(draft.rating),
            author_id: Set(draft.author_id),
            cover_image: Set(draft.cover_image.clone()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert book")?;

        info!(id = inserted.id, author_id = draft.author_id, "Added book: {}", inserted.title);
        Ok(Book::from(inserted))
    }

    /// Applies the changes and returns the updated row, or `None` when the id
    /// does not exist.
    pub async fn update(&self, id: i32, changes: &BookChanges) -> Result<Option<Book>> {
        let Some(existing) = Books::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query book for update")?
        else {
            return Ok(None);
        };

        let mut active: books::ActiveModel = existing.into();
        active.title = Set(changes.title.clone());
        active.author = Set(changes.author.clone());
        active.genre = Set(changes.genre.clone());
        active.rating = Set(changes.rating);
        if let Some(filename) = &changes.cover_image {
            active.cover_image = Set(Some(filename.clone()));
        }

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update book")?;

        Ok(Some(Book::from(updated)))
    }

    /// Deletes the row and returns it, so the caller can clean up the cover
    /// file after the delete has committed. `None` when the id does not exist.
    pub async fn remove(&self, id: i32) -> Result<Option<Book>> {
        let Some(existing) = Books::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query book for deletion")?
        else {
            return Ok(None);
        };

        let book = Book::from(existing);
        Books::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete book")?;

        info!(id, "Removed book");
        Ok(Some(book))
    }
}
