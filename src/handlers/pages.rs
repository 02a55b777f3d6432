use crate::{
    db,
    error::AppError,
    models::{ListOptions, QuoteCounter, QuoteWithSource, SortOrder, Source},
    select, AppState,
};
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use super::{set_flash_and_redirect, take_flash};

/// The page-stat key bumped on every random-page visit.
const HOME_STAT_KEY: &str = "home";

// ── Template structs ───────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "random.html")]
struct RandomTemplate {
    quote: Option<QuoteWithSource>,
    page_views: i64,
    flash_success: Option<String>,
    flash_error: Option<String>,
}

#[derive(Template)]
#[template(path = "top.html")]
struct TopTemplate {
    quotes: Vec<QuoteWithSource>,
    sources: Vec<Source>,
    q: String,
    source: String,
    sort: &'static str,
    order: &'static str,
    limit: i64,
    total_count: i64,
    current_count: usize,
    flash_success: Option<String>,
    flash_error: Option<String>,
}

// ── Random quote page ──────────────────────────────────────────────────────

/// GET /
///
/// Pick a weighted-random quote, bump its view counter (rendering the
/// post-increment value), bump the home-page counter, render. Zero quotes is
/// a valid empty state, not an error.
pub async fn random_quote(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let mut quote = select::pick_weighted_random(&state.db).await?;

    if let Some(q) = quote.as_mut() {
        // The quote may vanish between pick and bump (cascading source
        // delete); render the stale row rather than failing the page.
        if let Some(views) =
            db::increment_quote_counter(&state.db, q.id, QuoteCounter::Views).await?
        {
            q.views = views;
        }
    }

    let page_views = db::bump_page_stat(&state.db, HOME_STAT_KEY).await?;

    let (jar, flash_success, flash_error) = take_flash(jar);
    let tmpl = RandomTemplate {
        quote,
        page_views,
        flash_success,
        flash_error,
    };
    Ok((jar, tmpl).into_response())
}

// ── Voting ─────────────────────────────────────────────────────────────────

/// POST /vote/:id/:action
///
/// `action` is "like" or "dislike". A vote on a nonexistent quote is a 404
/// and never creates a record. Bounces back to the referring page.
pub async fn vote(
    State(state): State<Arc<AppState>>,
    Path((id, action)): Path<(i64, String)>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let back = referer_or_root(&headers);

    let counter = match action.as_str() {
        "like" => QuoteCounter::Likes,
        "dislike" => QuoteCounter::Dislikes,
        _ => {
            return Ok(set_flash_and_redirect(
                jar,
                None,
                Some("Unknown vote action."),
                &back,
            ));
        }
    };

    match db::increment_quote_counter(&state.db, id, counter).await? {
        Some(_) => Ok(Redirect::to(&back).into_response()),
        None => Err(AppError::NotFound),
    }
}

// ── Top quotes page ────────────────────────────────────────────────────────

/// Raw query params; all optional strings so out-of-range values are
/// normalized (clamped / defaulted) instead of rejected with a 400.
#[derive(Deserialize)]
pub struct TopParams {
    q: Option<String>,
    source: Option<String>,
    sort: Option<String>,
    order: Option<String>,
    limit: Option<String>,
}

/// GET /top
pub async fn top_quotes(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<TopParams>,
) -> Result<Response, AppError> {
    let opts = ListOptions::from_raw(
        params.q.as_deref(),
        params.source.as_deref(),
        params.sort.as_deref(),
        params.order.as_deref(),
        params.limit.as_deref(),
    );

    let ranked = db::top_quotes(&state.db, &opts).await?;
    let sources = db::list_sources(&state.db).await?;

    let (jar, flash_success, flash_error) = take_flash(jar);
    let tmpl = TopTemplate {
        current_count: ranked.quotes.len(),
        total_count: ranked.total_count,
        quotes: ranked.quotes,
        sources,
        q: opts.text_filter,
        source: opts.source_filter,
        sort: opts.sort.column(),
        order: match opts.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        },
        limit: opts.limit,
        flash_success,
        flash_error,
    };
    Ok((jar, tmpl).into_response())
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn referer_or_root(headers: &HeaderMap) -> String {
    headers
        .get("referer")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or("/")
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    // A vote rejected on /top bounces back there, so the top page has to
    // render flash messages too.
    #[test]
    fn top_page_renders_flash_messages() {
        let tmpl = TopTemplate {
            quotes: Vec::new(),
            sources: Vec::new(),
            q: String::new(),
            source: String::new(),
            sort: "likes",
            order: "desc",
            limit: 10,
            total_count: 0,
            current_count: 0,
            flash_success: None,
            flash_error: Some("Unknown vote action.".to_owned()),
        };

        let html = tmpl.render().unwrap();
        assert!(html.contains("Unknown vote action."));
        assert!(html.contains("flash error"));
    }
}
