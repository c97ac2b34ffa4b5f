use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::author::Author;
pub use repositories::book::{Book, BookChanges, BookDraft};

/// Sample rows inserted on first startup so a fresh install has something to
/// show.
const SEED_AUTHORS: [&str; 2] = ["test@example.com", "reader@books.com"];

const SEED_BOOKS: [(&str, &str, &str, i32, usize); 4] = [
    ("The Great Gatsby", "F. Scott Fitzgerald", "Classic", 5, 0),
    ("To Kill a Mockingbird", "Harper Lee", "Fiction", 4, 0),
    ("1984", "George Orwell", "Dystopian", 5, 1),
    ("Pride and Prejudice", "Jane Austen", "Romance", 4, 1),
];

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn author_repo(&self) -> repositories::author::AuthorRepository {
        repositories::author::AuthorRepository::new(self.conn.clone())
    }

    fn book_repo(&self) -> repositories::book::BookRepository {
        repositories::book::BookRepository::new(self.conn.clone())
    }

    /// Inserts the sample authors and books, but only when the `authors`
    /// table is empty.
    pub async fn seed_sample_data(&self) -> Result<()> {
        if self.author_repo().count().await? > 0 {
            return Ok(());
        }

        let mut owner_ids = Vec::with_capacity(SEED_AUTHORS.len());
        for email in SEED_AUTHORS {
            let (author, _) = self.find_or_create_author(email).await?;
            owner_ids.push(author.id);
        }

        for (title, author, genre, rating, owner) in SEED_BOOKS {
            self.add_book(&BookDraft {
                title: title.to_string(),
                author: author.to_string(),
                genre: Some(genre.to_string()),
                rating: Some(rating),
                author_id: owner_ids[owner],
                cover_image: None,
            })
            .await?;
        }

        info!("Seeded sample authors and books");
        Ok(())
    }

    pub async fn find_or_create_author(&self, email: &str) -> Result<(Author, bool)> {
        self.author_repo().find_or_create(email).await
    }

    pub async fn get_author(&self, id: i32) -> Result<Option<Author>> {
        self.author_repo().get_by_id(id).await
    }

    pub async fn list_books_for_author(&self, author_id: i32) -> Result<Vec<Book>> {
        self.book_repo().list_for_author(author_id).await
    }

    pub async fn get_book(&self, id: i32) -> Result<Option<Book>> {
        self.book_repo().get(id).await
    }

    pub async fn add_book(&self, draft: &BookDraft) -> Result<Book> {
        self.book_repo().add(draft).await
    }

    pub async fn update_book(&self, id: i32, changes: &BookChanges) -> Result<Option<Book>> {
        self.book_repo().update(id, changes).await
    }

    pub async fn remove_book(&self, id: i32) -> Result<Option<Book>> {
        self.book_repo().remove(id).await
    }
}
