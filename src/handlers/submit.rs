use crate::{
    db,
    error::AppError,
    models::{Source, SourceType},
    validate::{self, QuoteDraft, SourceDraft},
    AppState,
};
use askama::Template;
use axum::{
    extract::{Form, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use super::{set_flash_and_redirect, take_flash};

// ── Template structs ───────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "add_quote.html")]
struct AddQuoteTemplate {
    sources: Vec<Source>,
    has_sources: bool,
    errors: Vec<(&'static str, String)>,
    text: String,
    source_id: i64,
    weight: i64,
    flash_success: Option<String>,
    flash_error: Option<String>,
}

#[derive(Template)]
#[template(path = "add_source.html")]
struct AddSourceTemplate {
    errors: Vec<(&'static str, String)>,
    name: String,
    kind: &'static str,
    image_url: String,
    flash_success: Option<String>,
    flash_error: Option<String>,
}

// ── Form types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct QuoteForm {
    text: String,
    source_id: i64,
    // Kept raw so a blank field defaults to 1 and junk becomes a weight
    // rejection instead of a 400.
    weight: Option<String>,
}

impl QuoteForm {
    fn weight(&self) -> i64 {
        match self.weight.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(s) => s.parse().unwrap_or(0),
        }
    }
}

#[derive(Deserialize)]
pub struct SourceForm {
    name: String,
    kind: SourceType,
    image_url: Option<String>,
}

// ── Quote submission ───────────────────────────────────────────────────────

/// GET /add
pub async fn add_quote_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let sources = db::list_sources(&state.db).await?;
    let (jar, flash_success, flash_error) = take_flash(jar);

    let tmpl = AddQuoteTemplate {
        has_sources: !sources.is_empty(),
        sources,
        errors: Vec::new(),
        text: String::new(),
        source_id: 0,
        weight: 1,
        flash_success,
        flash_error,
    };
    Ok((jar, tmpl).into_response())
}

/// POST /add
///
/// Runs the draft through validation; a rejection re-renders the form with
/// every failing rule listed and the submitted values kept.
pub async fn add_quote(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<QuoteForm>,
) -> Result<Response, AppError> {
    let mut draft = QuoteDraft {
        text: form.text.clone(),
        source_id: form.source_id,
        weight: form.weight(),
    };

    match validate::validate_quote(&state.db, &mut draft, None).await {
        Ok(()) => {
            // The draft now holds the normalized text; persist that.
            db::create_quote(&state.db, &draft.text, draft.source_id, draft.weight).await?;
            Ok(set_flash_and_redirect(
                jar,
                Some("Quote added."),
                None,
                "/",
            ))
        }
        Err(AppError::Rejected(rejection)) => {
            let sources = db::list_sources(&state.db).await?;
            let tmpl = AddQuoteTemplate {
                has_sources: !sources.is_empty(),
                sources,
                errors: rejection.into_entries(),
                text: draft.text,
                source_id: draft.source_id,
                weight: draft.weight,
                flash_success: None,
                flash_error: None,
            };
            Ok(tmpl.into_response())
        }
        Err(e) => Err(e),
    }
}

// ── Source submission ──────────────────────────────────────────────────────

/// GET /source/add
pub async fn add_source_page(jar: CookieJar) -> Response {
    let (jar, flash_success, flash_error) = take_flash(jar);
    let tmpl = AddSourceTemplate {
        errors: Vec::new(),
        name: String::new(),
        kind: "other",
        image_url: String::new(),
        flash_success,
        flash_error,
    };
    (jar, tmpl).into_response()
}

/// POST /source/add
///
/// On success, bounces to the quote form — a new source usually exists to
/// attach a quote to.
pub async fn add_source(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SourceForm>,
) -> Result<Response, AppError> {
    let mut draft = SourceDraft {
        name: form.name.clone(),
        kind: form.kind,
        image_url: form.image_url.clone(),
    };

    match validate::validate_source(&state.db, &mut draft).await {
        Ok(()) => {
            let source =
                db::create_source(&state.db, &draft.name, draft.kind, draft.image_url.as_deref())
                    .await?;
            Ok(set_flash_and_redirect(
                jar,
                Some(&format!("Source \"{}\" added.", source.name)),
                None,
                "/add",
            ))
        }
        Err(AppError::Rejected(rejection)) => {
            let tmpl = AddSourceTemplate {
                errors: rejection.into_entries(),
                name: draft.name,
                kind: match draft.kind {
                    SourceType::Movie => "movie",
                    SourceType::Book => "book",
                    SourceType::Other => "other",
                },
                image_url: draft.image_url.unwrap_or_default(),
                flash_success: None,
                flash_error: None,
            };
            Ok(tmpl.into_response())
        }
        Err(e) => Err(e),
    }
}
