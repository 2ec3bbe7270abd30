// Utility functions for recipe-recommender

use crate::models::RecipeScore;
use std::cmp::Ordering;

/// Sort descending by score and keep the first `top_n`.
///
/// The sort is stable, so equal scores keep their input order.
pub fn rank_and_truncate(mut scores: Vec<RecipeScore>, top_n: usize) -> Vec<RecipeScore> {
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scores.truncate(top_n);
    scores
}
