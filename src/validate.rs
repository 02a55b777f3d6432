//! Business-rule validation run before any quote or source is persisted.
//!
//! Rules are applied in order and fail independently; every failing rule
//! lands in the same [`Rejection`] so the caller can show all reasons at
//! once. On acceptance the draft holds the normalized (trimmed) values —
//! those are what get written.

use crate::{
    db,
    error::{AppError, Rejection},
    models::SourceType,
};
use sqlx::SqlitePool;
use url::Url;

/// A source may own at most this many quotes at any time.
pub const MAX_QUOTES_PER_SOURCE: i64 = 3;

/// Largest accepted selection weight (a 31-bit positive integer, like the
/// store's column bound).
pub const MAX_WEIGHT: i64 = i32::MAX as i64;

/// A candidate quote, before persistence.
#[derive(Debug, Clone)]
pub struct QuoteDraft {
    pub text: String,
    pub source_id: i64,
    pub weight: i64,
}

/// A candidate source, before persistence.
#[derive(Debug, Clone)]
pub struct SourceDraft {
    pub name: String,
    pub kind: SourceType,
    pub image_url: Option<String>,
}

/// Check a quote draft against the business rules, normalizing its text in
/// place. `exclude_id` is the quote's own id when validating an update, so
/// it never collides with itself.
///
/// The duplicate and per-source-cap checks are advisory write-time reads,
/// not serialized against concurrent writers.
pub async fn validate_quote(
    pool: &SqlitePool,
    draft: &mut QuoteDraft,
    exclude_id: Option<i64>,
) -> Result<(), AppError> {
    let mut rejection = Rejection::default();

    draft.text = draft.text.trim().to_owned();
    if draft.text.is_empty() {
        rejection.add("text", "Quote text must not be empty.");
    } else if db::quote_text_exists(pool, &draft.text, exclude_id).await? {
        rejection.add("text", "This quote already exists (duplicate).");
    }

    if !db::source_exists(pool, draft.source_id).await? {
        rejection.add("source", "Unknown source.");
    } else if db::count_quotes_for_source(pool, draft.source_id, exclude_id).await?
        >= MAX_QUOTES_PER_SOURCE
    {
        rejection.add(
            "source",
            format!("This source already has {MAX_QUOTES_PER_SOURCE} quotes. Remove or edit the existing ones."),
        );
    }

    if draft.weight < 1 || draft.weight > MAX_WEIGHT {
        rejection.add(
            "weight",
            format!("Weight must be an integer between 1 and {MAX_WEIGHT}."),
        );
    }

    if rejection.is_empty() {
        Ok(())
    } else {
        Err(AppError::Rejected(rejection))
    }
}

/// Check a source draft, normalizing its name and image URL in place. An
/// image URL that is empty after trimming counts as absent; a present one
/// must be an absolute http(s) URL.
pub async fn validate_source(pool: &SqlitePool, draft: &mut SourceDraft) -> Result<(), AppError> {
    let mut rejection = Rejection::default();

    draft.name = draft.name.trim().to_owned();
    if draft.name.is_empty() {
        rejection.add("name", "Name must not be empty.");
    } else if db::source_name_taken(pool, &draft.name).await? {
        rejection.add("name", "A source with this name already exists.");
    }

    draft.image_url = draft
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    if let Some(image_url) = &draft.image_url {
        match Url::parse(image_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => rejection.add("image_url", "URL must start with http:// or https://"),
        }
    }

    if rejection.is_empty() {
        Ok(())
    } else {
        Err(AppError::Rejected(rejection))
    }
}
