use chrono::NaiveDateTime;
use serde::Deserialize;

// ── Row types ──────────────────────────────────────────────────────────────

/// What a quote is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Movie,
    Book,
    Other,
}

impl SourceType {
    pub fn label(self) -> &'static str {
        match self {
            SourceType::Movie => "Movie",
            SourceType::Book => "Book",
            SourceType::Other => "Other",
        }
    }
}

/// A named origin from the `sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
#[allow(dead_code)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub kind: SourceType,
    pub image_url: Option<String>,
}

/// A quote row joined with its source, as shown on every page.
#[derive(Debug, Clone, sqlx::FromRow)]
#[allow(dead_code)]
pub struct QuoteWithSource {
    pub id: i64,
    pub text: String,
    pub source_id: i64,
    pub weight: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub views: i64,
    pub created_at: NaiveDateTime,
    pub source_name: String,
    pub source_kind: SourceType,
    pub source_image_url: Option<String>,
}

/// The (id, weight) projection the selection walk runs over.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct QuoteWeight {
    pub id: i64,
    pub weight: i64,
}

// ── Counters ───────────────────────────────────────────────────────────────

/// The three per-quote counters. A closed enum so the column name that ends
/// up in SQL can never come from caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteCounter {
    Views,
    Likes,
    Dislikes,
}

impl QuoteCounter {
    pub fn column(self) -> &'static str {
        match self {
            QuoteCounter::Views => "views",
            QuoteCounter::Likes => "likes",
            QuoteCounter::Dislikes => "dislikes",
        }
    }
}

// ── Ranked-listing options ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Likes,
    Views,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::Likes => "likes",
            SortField::Views => "views",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Normalized options for the ranked listing. Out-of-range input never
/// fails: unrecognized sorts fall back to likes, the limit is clamped.
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub text_filter: String,
    pub source_filter: String,
    pub sort: SortField,
    pub order: SortOrder,
    pub limit: i64,
}

pub const LIST_LIMIT_MIN: i64 = 1;
pub const LIST_LIMIT_MAX: i64 = 200;
pub const LIST_LIMIT_DEFAULT: i64 = 10;

impl ListOptions {
    /// Build options from raw query-string values.
    pub fn from_raw(
        q: Option<&str>,
        source: Option<&str>,
        sort: Option<&str>,
        order: Option<&str>,
        limit: Option<&str>,
    ) -> Self {
        let sort = match sort.map(str::to_ascii_lowercase).as_deref() {
            Some("views") => SortField::Views,
            _ => SortField::Likes,
        };
        let order = match order.map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        let limit = limit
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(LIST_LIMIT_DEFAULT)
            .clamp(LIST_LIMIT_MIN, LIST_LIMIT_MAX);

        Self {
            text_filter: q.unwrap_or_default().trim().to_owned(),
            source_filter: source.unwrap_or_default().trim().to_owned(),
            sort,
            order,
            limit,
        }
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::from_raw(None, None, None, None, None)
    }
}

/// A ranked listing page: the limited rows plus the unlimited match count.
#[derive(Debug, Clone)]
pub struct RankedQuotes {
    pub quotes: Vec<QuoteWithSource>,
    pub total_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_options_defaults() {
        let opts = ListOptions::default();
        assert_eq!(opts.sort, SortField::Likes);
        assert_eq!(opts.order, SortOrder::Desc);
        assert_eq!(opts.limit, LIST_LIMIT_DEFAULT);
        assert!(opts.text_filter.is_empty());
    }

    #[test]
    fn list_options_limit_is_clamped() {
        let low = ListOptions::from_raw(None, None, None, None, Some("0"));
        assert_eq!(low.limit, 1);
        let high = ListOptions::from_raw(None, None, None, None, Some("5000"));
        assert_eq!(high.limit, 200);
        let junk = ListOptions::from_raw(None, None, None, None, Some("many"));
        assert_eq!(junk.limit, LIST_LIMIT_DEFAULT);
    }

    #[test]
    fn list_options_unknown_sort_falls_back_to_likes() {
        let opts = ListOptions::from_raw(None, None, Some("weight"), Some("sideways"), None);
        assert_eq!(opts.sort, SortField::Likes);
        assert_eq!(opts.order, SortOrder::Desc);

        let views = ListOptions::from_raw(None, None, Some("VIEWS"), Some("ASC"), None);
        assert_eq!(views.sort, SortField::Views);
        assert_eq!(views.order, SortOrder::Asc);
    }

    #[test]
    fn list_options_filters_are_trimmed() {
        let opts = ListOptions::from_raw(Some("  hope  "), Some(" Dune "), None, None, None);
        assert_eq!(opts.text_filter, "hope");
        assert_eq!(opts.source_filter, "Dune");
    }
}
