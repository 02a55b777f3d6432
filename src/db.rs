use crate::models::{
    ListOptions, QuoteCounter, QuoteWeight, QuoteWithSource, RankedQuotes, Source, SourceType,
};
use sqlx::SqlitePool;

const QUOTE_COLUMNS: &str = "q.id, q.text, q.source_id, q.weight, q.likes, q.dislikes, q.views,
     q.created_at, s.name AS source_name, s.kind AS source_kind,
     s.image_url AS source_image_url";

// ── Sources ────────────────────────────────────────────────────────────────

/// Insert a new source and return the newly created row.
pub async fn create_source(
    pool: &SqlitePool,
    name: &str,
    kind: SourceType,
    image_url: Option<&str>,
) -> Result<Source, sqlx::Error> {
    let id = sqlx::query("INSERT INTO sources (name, kind, image_url) VALUES (?1, ?2, ?3)")
        .bind(name)
        .bind(kind)
        .bind(image_url)
        .execute(pool)
        .await?
        .last_insert_rowid();

    sqlx::query_as("SELECT id, name, kind, image_url FROM sources WHERE id = ?1")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// All sources, name order (for form dropdowns and the top-page filter).
pub async fn list_sources(pool: &SqlitePool) -> Result<Vec<Source>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, kind, image_url FROM sources ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn source_exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sources WHERE id = ?1")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Case-insensitive name-taken check used by source validation.
pub async fn source_name_taken(pool: &SqlitePool, name: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sources WHERE lower(name) = lower(?1)")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

// ── Quotes ─────────────────────────────────────────────────────────────────

/// Insert a new quote and return the newly created row joined with its source.
pub async fn create_quote(
    pool: &SqlitePool,
    text: &str,
    source_id: i64,
    weight: i64,
) -> Result<QuoteWithSource, sqlx::Error> {
    let id = sqlx::query("INSERT INTO quotes (text, source_id, weight) VALUES (?1, ?2, ?3)")
        .bind(text)
        .bind(source_id)
        .bind(weight)
        .execute(pool)
        .await?
        .last_insert_rowid();

    sqlx::query_as(&format!(
        "SELECT {QUOTE_COLUMNS} FROM quotes q JOIN sources s ON s.id = q.source_id WHERE q.id = ?1"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
}

/// Fetch one quote (with its source) by primary key.
pub async fn get_quote(pool: &SqlitePool, id: i64) -> Result<Option<QuoteWithSource>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {QUOTE_COLUMNS} FROM quotes q JOIN sources s ON s.id = q.source_id WHERE q.id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// The (id, weight) snapshot the selection engine walks, in primary-key
/// order so a given snapshot plus a given draw is reproducible.
pub async fn quote_weights(pool: &SqlitePool) -> Result<Vec<QuoteWeight>, sqlx::Error> {
    sqlx::query_as("SELECT id, weight FROM quotes ORDER BY id")
        .fetch_all(pool)
        .await
}

/// Does another quote already use this text, compared case-insensitively?
/// `exclude_id` skips the quote's own row when validating an update.
pub async fn quote_text_exists(
    pool: &SqlitePool,
    text: &str,
    exclude_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM quotes WHERE lower(text) = lower(?1) AND (?2 IS NULL OR id <> ?2)",
    )
    .bind(text)
    .bind(exclude_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// How many quotes a source already owns, excluding `exclude_id` on update.
pub async fn count_quotes_for_source(
    pool: &SqlitePool,
    source_id: i64,
    exclude_id: Option<i64>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM quotes WHERE source_id = ?1 AND (?2 IS NULL OR id <> ?2)",
    )
    .bind(source_id)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
}

// ── Counters ───────────────────────────────────────────────────────────────

/// Atomically bump one per-quote counter and return the new value.
///
/// The increment is a single UPDATE issued to the store, never a
/// read-then-write in application code, so concurrent bumps of the same
/// counter can't lose updates. `None` means the quote doesn't exist; no row
/// is ever created here.
pub async fn increment_quote_counter(
    pool: &SqlitePool,
    id: i64,
    counter: QuoteCounter,
) -> Result<Option<i64>, sqlx::Error> {
    let col = counter.column();
    sqlx::query_scalar(&format!(
        "UPDATE quotes SET {col} = {col} + 1 WHERE id = ?1 RETURNING {col}"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Get-or-create-then-increment for a named page counter, as one upsert so
/// the store serializes concurrent first-time bumps of the same key.
/// Returns the post-increment count.
pub async fn bump_page_stat(pool: &SqlitePool, key: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO page_stats (key, count) VALUES (?1, 1)
         ON CONFLICT(key) DO UPDATE SET count = count + 1
         RETURNING count",
    )
    .bind(key)
    .fetch_one(pool)
    .await
}

// ── Ranked listing ─────────────────────────────────────────────────────────

/// Escape LIKE wildcards so filter input matches literally.
fn like_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// The top page: filter, order by the chosen counter, then weight and id as
/// tie-breakers, and report the unlimited match count alongside.
///
/// The ORDER BY column and direction are interpolated from closed enums
/// (`SortField`, `SortOrder`); only the filter values are bound.
pub async fn top_quotes(
    pool: &SqlitePool,
    opts: &ListOptions,
) -> Result<RankedQuotes, sqlx::Error> {
    const FILTER: &str = "(?1 = '' OR q.text LIKE '%' || ?1 || '%' ESCAPE '\\')
         AND (?2 = '' OR s.name LIKE '%' || ?2 || '%' ESCAPE '\\')";

    let text_filter = like_escape(&opts.text_filter);
    let source_filter = like_escape(&opts.source_filter);

    let total_count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM quotes q JOIN sources s ON s.id = q.source_id WHERE {FILTER}"
    ))
    .bind(&text_filter)
    .bind(&source_filter)
    .fetch_one(pool)
    .await?;

    let quotes: Vec<QuoteWithSource> = sqlx::query_as(&format!(
        "SELECT {QUOTE_COLUMNS}
         FROM quotes q JOIN sources s ON s.id = q.source_id
         WHERE {FILTER}
         ORDER BY q.{sort} {order}, q.weight DESC, q.id DESC
         LIMIT ?3",
        sort = opts.sort.column(),
        order = opts.order.keyword(),
    ))
    .bind(&text_filter)
    .bind(&source_filter)
    .bind(opts.limit)
    .fetch_all(pool)
    .await?;

    Ok(RankedQuotes {
        quotes,
        total_count,
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::test_support::test_pool;
    use super::*;

    async fn seed_source(pool: &SqlitePool, name: &str) -> i64 {
        create_source(pool, name, SourceType::Movie, None)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_and_fetch_quote() {
        let (pool, _dir) = test_pool().await;
        let source_id = seed_source(&pool, "Blade Runner").await;

        let quote = create_quote(&pool, "Like tears in rain.", source_id, 2)
            .await
            .unwrap();
        assert_eq!(quote.weight, 2);
        assert_eq!(quote.likes, 0);
        assert_eq!(quote.source_name, "Blade Runner");
        assert_eq!(quote.source_kind, SourceType::Movie);

        let fetched = get_quote(&pool, quote.id).await.unwrap().unwrap();
        assert_eq!(fetched.text, "Like tears in rain.");
    }

    #[tokio::test]
    async fn deleting_a_source_cascades_to_quotes() {
        let (pool, _dir) = test_pool().await;
        let source_id = seed_source(&pool, "Dune").await;
        let quote = create_quote(&pool, "Fear is the mind-killer.", source_id, 1)
            .await
            .unwrap();

        sqlx::query("DELETE FROM sources WHERE id = ?1")
            .bind(source_id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(get_quote(&pool, quote.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn text_existence_check_is_case_insensitive_and_excludes_self() {
        let (pool, _dir) = test_pool().await;
        let source_id = seed_source(&pool, "Casablanca").await;
        let quote = create_quote(&pool, "Hello World", source_id, 1).await.unwrap();

        assert!(quote_text_exists(&pool, "hello world", None).await.unwrap());
        assert!(quote_text_exists(&pool, "HELLO WORLD", None).await.unwrap());
        assert!(!quote_text_exists(&pool, "hello world", Some(quote.id))
            .await
            .unwrap());
        assert!(!quote_text_exists(&pool, "goodbye", None).await.unwrap());
    }

    #[tokio::test]
    async fn counter_increment_returns_new_value_and_rejects_unknown_id() {
        let (pool, _dir) = test_pool().await;
        let source_id = seed_source(&pool, "Alien").await;
        let quote = create_quote(&pool, "In space no one can hear you scream.", source_id, 1)
            .await
            .unwrap();

        let views = increment_quote_counter(&pool, quote.id, QuoteCounter::Views)
            .await
            .unwrap();
        assert_eq!(views, Some(1));
        let views = increment_quote_counter(&pool, quote.id, QuoteCounter::Views)
            .await
            .unwrap();
        assert_eq!(views, Some(2));

        let missing = increment_quote_counter(&pool, 9999, QuoteCounter::Likes)
            .await
            .unwrap();
        assert_eq!(missing, None);

        // A failed vote must not conjure a quote row.
        assert!(get_quote(&pool, 9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_increments_never_lose_updates() {
        let (pool, _dir) = test_pool().await;
        let source_id = seed_source(&pool, "The Matrix").await;
        let quote = create_quote(&pool, "There is no spoon.", source_id, 1)
            .await
            .unwrap();

        const N: usize = 50;
        let mut handles = Vec::with_capacity(N);
        for _ in 0..N {
            let pool = pool.clone();
            let id = quote.id;
            handles.push(tokio::spawn(async move {
                increment_quote_counter(&pool, id, QuoteCounter::Likes)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let likes = get_quote(&pool, quote.id).await.unwrap().unwrap().likes;
        assert_eq!(likes, N as i64);
    }

    #[tokio::test]
    async fn concurrent_first_bumps_create_exactly_one_page_stat_row() {
        let (pool, _dir) = test_pool().await;

        let a = {
            let pool = pool.clone();
            tokio::spawn(async move { bump_page_stat(&pool, "home").await.unwrap() })
        };
        let b = {
            let pool = pool.clone();
            tokio::spawn(async move { bump_page_stat(&pool, "home").await.unwrap() })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM page_stats WHERE key = 'home'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let count: i64 = sqlx::query_scalar("SELECT count FROM page_stats WHERE key = 'home'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
        // Both callers saw a post-increment value.
        assert_eq!(a.max(b), 2);
    }

    #[tokio::test]
    async fn top_quotes_filters_orders_and_limits() {
        let (pool, _dir) = test_pool().await;
        let movie = seed_source(&pool, "The Matrix").await;
        let book = create_source(&pool, "Dune", SourceType::Book, None)
            .await
            .unwrap()
            .id;

        let q1 = create_quote(&pool, "There is no spoon.", movie, 1).await.unwrap();
        let q2 = create_quote(&pool, "Fear is the mind-killer.", book, 1)
            .await
            .unwrap();
        create_quote(&pool, "I must not fear.", book, 1).await.unwrap();

        for _ in 0..3 {
            increment_quote_counter(&pool, q1.id, QuoteCounter::Likes)
                .await
                .unwrap();
        }
        increment_quote_counter(&pool, q2.id, QuoteCounter::Likes)
            .await
            .unwrap();

        // Default: likes descending.
        let ranked = top_quotes(&pool, &ListOptions::default()).await.unwrap();
        assert_eq!(ranked.total_count, 3);
        assert_eq!(ranked.quotes[0].id, q1.id);
        assert_eq!(ranked.quotes[1].id, q2.id);

        // Source filter is a case-insensitive substring match.
        let opts = ListOptions::from_raw(None, Some("dune"), None, None, None);
        let ranked = top_quotes(&pool, &opts).await.unwrap();
        assert_eq!(ranked.total_count, 2);
        assert!(ranked.quotes.iter().all(|q| q.source_name == "Dune"));

        // Text filter plus limit; total_count ignores the limit.
        let opts = ListOptions::from_raw(Some("fear"), None, None, None, Some("1"));
        let ranked = top_quotes(&pool, &opts).await.unwrap();
        assert_eq!(ranked.total_count, 2);
        assert_eq!(ranked.quotes.len(), 1);
    }

    #[tokio::test]
    async fn filter_wildcards_match_literally() {
        let (pool, _dir) = test_pool().await;
        let source_id = seed_source(&pool, "Ads").await;
        create_quote(&pool, "100% organic", source_id, 1).await.unwrap();
        create_quote(&pool, "100 organic", source_id, 1).await.unwrap();
        create_quote(&pool, "snake_case forever", source_id, 1)
            .await
            .unwrap();

        // '%' must not act as a LIKE wildcard.
        let opts = ListOptions::from_raw(Some("100%"), None, None, None, None);
        let ranked = top_quotes(&pool, &opts).await.unwrap();
        assert_eq!(ranked.total_count, 1);
        assert_eq!(ranked.quotes[0].text, "100% organic");

        // '_' must not match any single character ("sn_ke" would otherwise
        // match "snake").
        let opts = ListOptions::from_raw(Some("sn_ke"), None, None, None, None);
        let ranked = top_quotes(&pool, &opts).await.unwrap();
        assert_eq!(ranked.total_count, 0);

        let opts = ListOptions::from_raw(Some("snake_case"), None, None, None, None);
        let ranked = top_quotes(&pool, &opts).await.unwrap();
        assert_eq!(ranked.total_count, 1);
    }
}
