//! Weighted random quote selection via cumulative-sum inversion sampling:
//! quote *i* is chosen with probability `weight_i / total_weight`.

use crate::{
    db,
    models::{QuoteWeight, QuoteWithSource},
};
use rand::Rng;
use sqlx::SqlitePool;

/// Walk the snapshot in its given (primary-key) order, accumulating weights,
/// and return the index of the first entry whose running total reaches `r`.
///
/// Deterministic for a fixed snapshot and draw. The final fallback to the
/// last entry guards against a draw outside the cumulative range, which can
/// only come from a caller bug or a weight mutated mid-walk. The running
/// total is widened to i128 so no set of i64 weights can overflow it.
pub fn pick_by_draw(weights: &[QuoteWeight], r: i128) -> Option<usize> {
    let mut acc: i128 = 0;
    for (i, entry) in weights.iter().enumerate() {
        acc += i128::from(entry.weight);
        if r <= acc {
            return Some(i);
        }
    }
    weights.len().checked_sub(1)
}

/// Pick one quote at random, proportionally to weight. `Ok(None)` means
/// there are no quotes at all; that is an empty result, not an error.
pub async fn pick_weighted_random(
    pool: &SqlitePool,
) -> Result<Option<QuoteWithSource>, sqlx::Error> {
    let weights = db::quote_weights(pool).await?;
    let total: i128 = weights.iter().map(|w| i128::from(w.weight)).sum();
    if total <= 0 {
        return Ok(None);
    }

    let r = rand::thread_rng().gen_range(1..=total);
    let Some(index) = pick_by_draw(&weights, r) else {
        return Ok(None);
    };

    // The weights were a snapshot; the row may have vanished since.
    db::get_quote(pool, weights[index].id).await
}
