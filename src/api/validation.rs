use super::ApiError;

/// Trims the value and drops it entirely when nothing is left, mirroring how
/// missing and blank form fields are treated the same.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_rating(rating: Option<i32>) -> Result<Option<i32>, ApiError> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => {
            Err(ApiError::validation("Rating must be between 1 and 5"))
        }
        other => Ok(other),
    }
}

/// Ratings arrive as multipart text. Blank means unrated; anything that is
/// not an in-range integer is rejected before storage is touched.
pub fn parse_rating(raw: Option<&str>) -> Result<Option<i32>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let rating: i32 = raw
        .parse()
        .map_err(|_| ApiError::validation("Rating must be between 1 and 5"))?;

    validate_rating(Some(rating))
}
