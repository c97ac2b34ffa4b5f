use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, AuthorDto};
use crate::api::validation::non_empty;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
}

/// Get-or-create by email. There is no password, token, or session; the
/// client keeps the returned record and presents its id on later calls.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, Json<AuthorDto>), ApiError> {
    let email =
        non_empty(payload.email).ok_or_else(|| ApiError::validation("Email is required"))?;

    let (author, created) = state.store().find_or_create_author(&email).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(AuthorDto::from(author))))
}
