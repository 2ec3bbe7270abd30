// ============================================
// Hybrid Recommendation Ranker
// ============================================
//
// Fuses three ranked lists (content-based, user-based CF, item-based CF)
// by weighted summation:
//
//   fused[r] = w_content × content[r] + w_user_cf × user_cf[r] + w_item_cf × item_cf[r]
//
// A recipe missing from a source contributes 0 from that source. Each
// source is asked for top_n × oversample_factor results so overlap between
// lists does not starve the final top_n.
//
// New users get the cold-start weights for the request only; the stored
// weights are untouched.

use super::Recommender;
use crate::config::HybridConfig;
use crate::error::{AppError, Result};
use crate::models::{RecipeScore, RecommendationSource};
use crate::utils::rank_and_truncate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Hybrid ranker weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridWeights {
    pub content: f64,
    pub user_cf: f64,
    pub item_cf: f64,
}

impl HybridWeights {
    /// Default weights for users with history
    pub fn balanced() -> Self {
        Self {
            content: 0.4,
            user_cf: 0.3,
            item_cf: 0.3,
        }
    }

    /// Cold-start weights (rely on content matching)
    pub fn cold_start() -> Self {
        Self {
            content: 0.8,
            user_cf: 0.1,
            item_cf: 0.1,
        }
    }

    /// Scale the three weights so they sum to 1.0.
    pub fn normalized(content: f64, user_cf: f64, item_cf: f64) -> Result<Self> {
        let total = content + user_cf + item_cf;
        if !total.is_finite() || total == 0.0 {
            return Err(AppError::Configuration(format!(
                "Hybrid weights must have a non-zero finite sum (got {} + {} + {})",
                content, user_cf, item_cf
            )));
        }

        Ok(Self {
            content: content / total,
            user_cf: user_cf / total,
            item_cf: item_cf / total,
        })
    }

    /// Validate weights sum to 1.0
    pub fn validate(&self) -> Result<()> {
        let sum = self.content + self.user_cf + self.item_cf;
        if !sum.is_finite() || (sum - 1.0).abs() > 0.01 {
            return Err(AppError::Configuration(format!(
                "Weights must sum to 1.0 (got {})",
                sum
            )));
        }
        Ok(())
    }

    pub fn weight_for(&self, source: RecommendationSource) -> f64 {
        match source {
            RecommendationSource::Content => self.content,
            RecommendationSource::UserCf => self.user_cf,
            RecommendationSource::ItemCf => self.item_cf,
            RecommendationSource::Hybrid => 0.0,
        }
    }
}

/// Hybrid recommendation ranker
pub struct HybridRecommender {
    content: Arc<dyn Recommender>,
    user_cf: Arc<dyn Recommender>,
    item_cf: Arc<dyn Recommender>,
    weights: HybridWeights,
    cold_start_weights: HybridWeights,
    oversample_factor: usize,
}

impl HybridRecommender {
    pub fn new(
        content: Arc<dyn Recommender>,
        user_cf: Arc<dyn Recommender>,
        item_cf: Arc<dyn Recommender>,
        config: &HybridConfig,
    ) -> Result<Self> {
        config.weights.validate()?;
        config.cold_start_weights.validate()?;

        Ok(Self {
            content,
            user_cf,
            item_cf,
            weights: config.weights,
            cold_start_weights: config.cold_start_weights,
            oversample_factor: config.oversample_factor.max(1),
        })
    }

    /// Replace the stored weights with the normalized triple.
    pub fn set_weights(&mut self, content: f64, user_cf: f64, item_cf: f64) -> Result<()> {
        let weights = HybridWeights::normalized(content, user_cf, item_cf).map_err(|err| {
            warn!(content, user_cf, item_cf, "Rejected hybrid weights");
            err
        })?;

        info!(
            content = weights.content,
            user_cf = weights.user_cf,
            item_cf = weights.item_cf,
            "Hybrid weights updated"
        );
        self.weights = weights;
        Ok(())
    }

    pub fn weights(&self) -> HybridWeights {
        self.weights
    }

    /// Weights applied to one request.
    pub fn effective_weights(&self, is_new_user: bool) -> HybridWeights {
        if is_new_user {
            self.cold_start_weights
        } else {
            self.weights
        }
    }

    /// Get top-N fused recommendations for user
    pub fn recommend(
        &self,
        user_id: &str,
        candidates: &[String],
        top_n: usize,
        is_new_user: bool,
    ) -> Vec<RecipeScore> {
        if top_n == 0 {
            return Vec::new();
        }

        let weights = self.effective_weights(is_new_user);
        let sources = [&self.content, &self.user_cf, &self.item_cf];
        let per_source = top_n.saturating_mul(self.oversample_factor);

        // Step 1: Let every source get ready (CF builds its matrices once)
        for source in sources {
            source.prepare();
        }

        // Step 2: Gather oversampled lists from each source
        let gathered: Vec<(RecommendationSource, Vec<RecipeScore>)> = sources
            .iter()
            .map(|source| {
                (
                    source.source(),
                    source.recommend(user_id, candidates, per_source),
                )
            })
            .collect();

        // Step 3: Weighted merge
        let merged = merge_weighted(&gathered, &weights);

        debug!(
            user_id,
            is_new_user,
            content = gathered[0].1.len(),
            user_cf = gathered[1].1.len(),
            item_cf = gathered[2].1.len(),
            merged = merged.len(),
            "Hybrid merge complete"
        );

        // Step 4: Rank fused scores
        rank_and_truncate(merged, top_n)
    }
}

/// Sum `score × weight(source)` per recipe.
///
/// Output keeps first-seen order across sources so the stable sort that
/// follows breaks ties deterministically. Within one source only the first
/// (highest ranked) entry for a recipe counts.
fn merge_weighted(
    gathered: &[(RecommendationSource, Vec<RecipeScore>)],
    weights: &HybridWeights,
) -> Vec<RecipeScore> {
    let mut merged: Vec<RecipeScore> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for (source, recommendations) in gathered {
        let weight = weights.weight_for(*source);
        let mut seen: HashSet<&str> = HashSet::new();

        for rec in recommendations {
            if !seen.insert(rec.recipe_id.as_str()) {
                continue;
            }

            let contribution = rec.score * weight;
            match positions.get(rec.recipe_id.as_str()) {
                Some(&idx) => merged[idx].score += contribution,
                None => {
                    positions.insert(rec.recipe_id.as_str(), merged.len());
                    merged.push(RecipeScore::new(rec.recipe_id.clone(), contribution));
                }
            }
        }
    }

    merged
}
