use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use tracing::info;

use crate::entities::{authors, prelude::*};

/// Author row as exposed to the rest of the service.
#[derive(Debug, Clone)]
pub struct Author {
    pub id: i32,
    pub email: String,
}

impl From<authors::Model> for Author {
    fn from(model: authors::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
        }
    }
}

pub struct AuthorRepository {
    conn: DatabaseConnection,
}

impl AuthorRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Author>> {
        let author = Authors::find()
            .filter(authors::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query author by email")?;

        Ok(author.map(Author::from))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Author>> {
        let author = Authors::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query author by ID")?;

        Ok(author.map(Author::from))
    }

    /// Get-or-create by email. Returns the author and whether a new row was
    /// inserted, so the handler can distinguish 200 from 201.
    pub async fn find_or_create(&self, email: &str) -> Result<(Author, bool)> {
        if let Some(existing) = self.get_by_email(email).await? {
            return Ok((existing, false));
        }

        let inserted = authors::ActiveModel {
            email: Set(email.to_string()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert author")?;

        info!(email, id = inserted.id, "Created author");
        Ok((Author::from(inserted), true))
    }

    pub async fn count(&self) -> Result<u64> {
        Authors::find()
            .count(&self.conn)
            .await
            .context("Failed to count authors")
    }
}
