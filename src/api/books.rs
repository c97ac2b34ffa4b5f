use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{ApiError, AppState, BookDto, MessageBody};
use crate::api::validation::{non_empty, parse_rating};
use crate::db::{BookChanges, BookDraft};

#[derive(Debug, Deserialize)]
pub struct ListBooksQuery {
    #[serde(rename = "authorId")]
    pub author_id: Option<String>,
}

/// Fields collected from a multipart book form. All text fields are optional
/// here; the handlers decide which ones are required.
#[derive(Debug, Default)]
struct BookForm {
    title: Option<String>,
    author: Option<String>,
    genre: Option<String>,
    rating: Option<String>,
    author_id: Option<String>,
    cover: Option<CoverUpload>,
}

#[derive(Debug)]
struct CoverUpload {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

async fn read_book_form(multipart: &mut Multipart) -> Result<BookForm, ApiError> {
    let mut form = BookForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::validation("Invalid multipart payload"))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "coverImage" {
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::validation("Invalid multipart payload"))?;

            // A file input submitted with nothing picked arrives as an empty
            // unnamed part; that is not an upload.
            if filename.is_none() && bytes.is_empty() {
                continue;
            }

            form.cover = Some(CoverUpload {
                filename,
                content_type,
                bytes,
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|_| ApiError::validation("Invalid multipart payload"))?;

        match name.as_str() {
            "title" => form.title = Some(value),
            "author" => form.author = Some(value),
            "genre" => form.genre = Some(value),
            "rating" => form.rating = Some(value),
            "authorId" => form.author_id = Some(value),
            _ => {}
        }
    }

    Ok(form)
}

/// Base the cover URLs on the configured public URL when set, otherwise on
/// whatever host the caller reached us through. The service itself speaks
/// plain HTTP; TLS termination is an upstream concern.
async fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(public) = state.config().read().await.server.public_url.clone() {
        return public;
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");

    format!("http://{host}")
}

async fn stage_cover(
    state: &AppState,
    cover: Option<&CoverUpload>,
) -> Result<Option<String>, ApiError> {
    match cover {
        Some(upload) => {
            let filename = state
                .uploads()
                .save_cover(
                    upload.filename.as_deref(),
                    upload.content_type.as_deref(),
                    &upload.bytes,
                )
                .await?;
            Ok(Some(filename))
        }
        None => Ok(None),
    }
}

pub async fn list_books(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ListBooksQuery>,
) -> Result<Json<Vec<BookDto>>, ApiError> {
    let author_id: i32 = non_empty(params.author_id)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ApiError::validation("Author ID is required"))?;

    let books = state.store().list_books_for_author(author_id).await?;

    let base = base_url(&state, &headers).await;
    let dtos = books
        .into_iter()
        .map(|b| BookDto::from_book(b, &base))
        .collect();

    Ok(Json(dtos))
}

/// No ownership check: any caller with a valid id can read any book.
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<BookDto>, ApiError> {
    let book = state
        .store()
        .get_book(id)
        .await?
        .ok_or_else(ApiError::book_not_found)?;

    let base = base_url(&state, &headers).await;
    Ok(Json(BookDto::from_book(book, &base)))
}

pub async fn create_book(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<BookDto>), ApiError> {
    let form = read_book_form(&mut multipart).await?;

    let (Some(title), Some(author), Some(author_id)) = (
        non_empty(form.title),
        non_empty(form.author),
        non_empty(form.author_id),
    ) else {
        return Err(ApiError::validation(
            "Title, author, and authorId are required",
        ));
    };

    let author_id: i32 = author_id
        .parse()
        .map_err(|_| ApiError::validation("Title, author, and authorId are required"))?;
    let rating = parse_rating(form.rating.as_deref())?;

    // Stage the file before touching the database and unlink it again if the
    // insert fails, so a reported success always means both the row and a
    // readable cover exist.
    let cover_image = stage_cover(&state, form.cover.as_ref()).await?;

    let draft = BookDraft {
        title,
        author,
        genre: non_empty(form.genre),
        rating,
        author_id,
        cover_image: cover_image.clone(),
    };

    let book = match state.store().add_book(&draft).await {
        Ok(book) => book,
        Err(e) => {
            if let Some(filename) = &cover_image {
                state.uploads().delete_cover(filename).await;
            }
            return Err(e.into());
        }
    };

    let base = base_url(&state, &headers).await;
    Ok((StatusCode::CREATED, Json(BookDto::from_book(book, &base))))
}

/// Title and author must be resupplied even on a partial update. A supplied
/// cover replaces the stored one; an absent cover leaves it untouched.
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<BookDto>, ApiError> {
    let form = read_book_form(&mut multipart).await?;

    let (Some(title), Some(author)) = (non_empty(form.title), non_empty(form.author)) else {
        return Err(ApiError::validation("Title and author are required"));
    };

    let rating = parse_rating(form.rating.as_deref())?;

    let existing = state
        .store()
        .get_book(id)
        .await?
        .ok_or_else(ApiError::book_not_found)?;

    let new_cover = stage_cover(&state, form.cover.as_ref()).await?;

    let changes = BookChanges {
        title,
        author,
        genre: non_empty(form.genre),
        rating,
        cover_image: new_cover.clone(),
    };

    let updated = match state.store().update_book(id, &changes).await {
        Ok(Some(book)) => book,
        Ok(None) => {
            // Row vanished between the lookup and the update.
            if let Some(filename) = &new_cover {
                state.uploads().delete_cover(filename).await;
            }
            return Err(ApiError::book_not_found());
        }
        Err(e) => {
            if let Some(filename) = &new_cover {
                state.uploads().delete_cover(filename).await;
            }
            return Err(e.into());
        }
    };

    // The old cover is removed only after the row update has committed, so a
    // failed update never strands the record pointing at a deleted file.
    if new_cover.is_some()
        && let Some(old) = &existing.cover_image
    {
        state.uploads().delete_cover(old).await;
    }

    let base = base_url(&state, &headers).await;
    Ok(Json(BookDto::from_book(updated, &base)))
}

pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, ApiError> {
    let Some(book) = state.store().remove_book(id).await? else {
        return Err(ApiError::book_not_found());
    };

    // Row first, file second; a cover that is already gone must not fail the
    // delete.
    if let Some(filename) = &book.cover_image {
        state.uploads().delete_cover(filename).await;
    }

    info!(id, "Deleted book: {}", book.title);
    Ok(Json(MessageBody {
        message: "Book deleted successfully".to_string(),
    }))
}
