// ============================================
// Collaborative Filtering Recommender
// ============================================
//
// Implements user-user and item-item collaborative filtering with cosine
// similarity over a dense user × recipe interaction matrix.
//
// State machine:
//   Unbuilt → MatricesBuilt → SimilarityComputed (per axis)
//
// build_matrices() always performs a full rebuild from the profile store
// and bumps the matrix generation. Similarity matrices are computed lazily
// on first use; a cached matrix from an older generation is stale and is
// recomputed before it is read.
//
// Data Flow:
//   UserProfileStore (dynamic_behavior) → InteractionMatrix → SimilarityMatrix
//                                                   ↓
//                                       Neighbor-weighted predictions

use super::similarity::{InteractionMatrix, SimilarityAxis, SimilarityMatrix};
use super::Recommender;
use crate::config::CollaborativeConfig;
use crate::metrics;
use crate::models::{RecipeScore, RecommendationSource};
use crate::services::profile::{SharedProfileStore, UserProfileStore};
use crate::utils::rank_and_truncate;
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Freshness of one cached similarity matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Missing,
    Fresh,
    /// Computed from an older interaction matrix
    Stale,
}

/// Observable state of the collaborative filtering model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CfState {
    Unbuilt,
    Built {
        generation: u64,
        users: usize,
        recipes: usize,
        user_similarity: CacheStatus,
        item_similarity: CacheStatus,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub user_count: usize,
    pub recipe_count: usize,
    pub generation: Option<u64>,
    pub k_neighbors: usize,
    pub metric: &'static str,
}

#[derive(Debug, Default)]
struct CfModel {
    last_generation: u64,
    matrix: Option<InteractionMatrix>,
    user_similarity: Option<SimilarityMatrix>,
    item_similarity: Option<SimilarityMatrix>,
}

impl CfModel {
    fn cached(&self, axis: SimilarityAxis) -> Option<&SimilarityMatrix> {
        match axis {
            SimilarityAxis::User => self.user_similarity.as_ref(),
            SimilarityAxis::Item => self.item_similarity.as_ref(),
        }
    }

    fn cache_status(&self, axis: SimilarityAxis) -> CacheStatus {
        match (self.matrix.as_ref(), self.cached(axis)) {
            (Some(matrix), Some(similarity)) if similarity.is_fresh_for(matrix) => {
                CacheStatus::Fresh
            }
            (_, Some(_)) => CacheStatus::Stale,
            (_, None) => CacheStatus::Missing,
        }
    }

    fn rebuild(&mut self, profiles: &UserProfileStore) -> u64 {
        let generation = self.last_generation + 1;
        let matrix = InteractionMatrix::build(profiles, generation);

        info!(
            generation,
            users = matrix.user_count(),
            recipes = matrix.recipe_count(),
            "Interaction matrix rebuilt"
        );

        self.last_generation = generation;
        self.matrix = Some(matrix);
        metrics::record_matrix_rebuild();

        generation
    }

    fn refresh_similarity(&mut self, axis: SimilarityAxis, epsilon: f64) {
        let Some(matrix) = self.matrix.as_ref() else {
            return;
        };

        if self.cache_status(axis) == CacheStatus::Stale {
            debug!(
                axis = axis.as_str(),
                generation = matrix.generation(),
                "Similarity cache stale, recomputing"
            );
        }

        let similarity = SimilarityMatrix::compute(matrix, axis, epsilon);
        debug!(
            axis = axis.as_str(),
            size = similarity.len(),
            generation = similarity.generation(),
            "Similarity matrix computed"
        );
        metrics::record_similarity_computation(axis.as_str());

        match axis {
            SimilarityAxis::User => self.user_similarity = Some(similarity),
            SimilarityAxis::Item => self.item_similarity = Some(similarity),
        }
    }
}

pub struct CollaborativeFilteringRecommender {
    profiles: SharedProfileStore,
    config: CollaborativeConfig,
    model: RwLock<CfModel>,
}

impl CollaborativeFilteringRecommender {
    pub fn new(profiles: SharedProfileStore, config: CollaborativeConfig) -> Self {
        Self {
            profiles,
            config,
            model: RwLock::new(CfModel::default()),
        }
    }

    /// Rebuild the interaction matrix from the current profiles.
    ///
    /// Returns the new generation. Cached similarities become stale.
    pub fn build_matrices(&self) -> u64 {
        let profiles = self.profiles.read();
        let mut model = self.model.write();
        model.rebuild(&profiles)
    }

    /// Build the matrices unless a build already happened.
    ///
    /// Check and build happen under one upgradable lock, so concurrent
    /// callers build at most once.
    pub fn ensure_built(&self) {
        // Profiles before model, same order as build_matrices
        let profiles = self.profiles.read();
        let model = self.model.upgradable_read();
        if model.matrix.is_some() {
            return;
        }

        let mut model = RwLockUpgradableReadGuard::upgrade(model);
        model.rebuild(&profiles);
    }

    pub fn is_built(&self) -> bool {
        self.model.read().matrix.is_some()
    }

    pub fn state(&self) -> CfState {
        let model = self.model.read();
        match model.matrix.as_ref() {
            None => CfState::Unbuilt,
            Some(matrix) => CfState::Built {
                generation: matrix.generation(),
                users: matrix.user_count(),
                recipes: matrix.recipe_count(),
                user_similarity: model.cache_status(SimilarityAxis::User),
                item_similarity: model.cache_status(SimilarityAxis::Item),
            },
        }
    }

    /// Recompute the user-user similarity matrix now.
    pub fn compute_user_similarity(&self) {
        self.model
            .write()
            .refresh_similarity(SimilarityAxis::User, self.config.similarity_epsilon);
    }

    /// Recompute the item-item similarity matrix now.
    pub fn compute_item_similarity(&self) {
        self.model
            .write()
            .refresh_similarity(SimilarityAxis::Item, self.config.similarity_epsilon);
    }

    /// Drop both cached similarity matrices.
    pub fn invalidate_similarities(&self) {
        let mut model = self.model.write();
        model.user_similarity = None;
        model.item_similarity = None;
        debug!("Similarity caches invalidated");
    }

    /// Read access with a fresh similarity matrix for `axis`.
    ///
    /// Returns None while the interaction matrix is unbuilt.
    fn read_with_similarity(&self, axis: SimilarityAxis) -> Option<RwLockReadGuard<'_, CfModel>> {
        let model = self.model.upgradable_read();
        if model.matrix.is_none() {
            return None;
        }

        if model.cache_status(axis) == CacheStatus::Fresh {
            return Some(RwLockUpgradableReadGuard::downgrade(model));
        }

        let mut model = RwLockUpgradableReadGuard::upgrade(model);
        model.refresh_similarity(axis, self.config.similarity_epsilon);
        Some(RwLockWriteGuard::downgrade(model))
    }

    /// Similarity between two users, None if either is not in the matrix.
    pub fn user_similarity(&self, user_a: &str, user_b: &str) -> Option<f64> {
        let model = self.read_with_similarity(SimilarityAxis::User)?;
        let matrix = model.matrix.as_ref()?;
        let similarity = model.cached(SimilarityAxis::User)?;
        Some(similarity.get(matrix.user_index(user_a)?, matrix.user_index(user_b)?))
    }

    /// Similarity between two recipes, None if either is not in the matrix.
    pub fn item_similarity(&self, recipe_a: &str, recipe_b: &str) -> Option<f64> {
        let model = self.read_with_similarity(SimilarityAxis::Item)?;
        let matrix = model.matrix.as_ref()?;
        let similarity = model.cached(SimilarityAxis::Item)?;
        Some(similarity.get(
            matrix.recipe_index(recipe_a)?,
            matrix.recipe_index(recipe_b)?,
        ))
    }

    /// Predict scores for recipes the user has not interacted with, using
    /// the `k_neighbors` most similar users.
    ///
    /// Formula: score[r] = Σ(sim[n] × rating[n, r]) / Σ(sim[n]),
    /// over neighbors n with rating[n, r] > 0
    pub fn user_based_recommend(
        &self,
        user_id: &str,
        top_n: usize,
        k_neighbors: usize,
    ) -> Vec<RecipeScore> {
        let Some(model) = self.read_with_similarity(SimilarityAxis::User) else {
            debug!(user_id, "User-based CF skipped: matrices not built");
            return Vec::new();
        };
        let (Some(matrix), Some(similarity)) =
            (model.matrix.as_ref(), model.cached(SimilarityAxis::User))
        else {
            return Vec::new();
        };
        let Some(user_idx) = matrix.user_index(user_id) else {
            debug!(user_id, "User-based CF: unknown user");
            return Vec::new();
        };

        // Step 1: Rank every other user by similarity and keep the top k
        let mut neighbors: Vec<(usize, f64)> = (0..matrix.user_count())
            .filter(|&idx| idx != user_idx)
            .map(|idx| (idx, similarity.get(user_idx, idx)))
            .collect();
        neighbors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        neighbors.truncate(k_neighbors);

        // Step 2: Similarity-weighted average over neighbors who rated the recipe
        let mut predictions = Vec::new();
        for recipe_idx in 0..matrix.recipe_count() {
            if matrix.get(user_idx, recipe_idx) > 0.0 {
                continue;
            }

            let mut numerator = 0.0;
            let mut denominator = 0.0;
            for &(neighbor_idx, neighbor_similarity) in &neighbors {
                let rating = matrix.get(neighbor_idx, recipe_idx);
                if rating > 0.0 {
                    numerator += neighbor_similarity * rating;
                    denominator += neighbor_similarity;
                }
            }

            if denominator > 0.0 {
                predictions.push(RecipeScore::new(
                    matrix.recipe_id(recipe_idx),
                    numerator / denominator,
                ));
            }
        }

        debug!(
            user_id,
            neighbors = neighbors.len(),
            predictions = predictions.len(),
            "User-based CF predictions generated"
        );

        rank_and_truncate(predictions, top_n)
    }

    /// Predict scores for recipes the user has not interacted with from the
    /// recipes they did interact with.
    ///
    /// Formula: score[c] = Σ(sim[c, r] × rating[r]) / Σ|sim[c, r]|,
    /// over the user's rated recipes r
    pub fn item_based_recommend(&self, user_id: &str, top_n: usize) -> Vec<RecipeScore> {
        let Some(model) = self.read_with_similarity(SimilarityAxis::Item) else {
            debug!(user_id, "Item-based CF skipped: matrices not built");
            return Vec::new();
        };
        let (Some(matrix), Some(similarity)) =
            (model.matrix.as_ref(), model.cached(SimilarityAxis::Item))
        else {
            return Vec::new();
        };
        let Some(user_idx) = matrix.user_index(user_id) else {
            debug!(user_id, "Item-based CF: unknown user");
            return Vec::new();
        };

        let rated: Vec<(usize, f64)> = matrix
            .user_vector(user_idx)
            .iter()
            .enumerate()
            .filter(|&(_, &rating)| rating > 0.0)
            .map(|(idx, &rating)| (idx, rating))
            .collect();

        let mut predictions = Vec::new();
        for candidate_idx in 0..matrix.recipe_count() {
            if matrix.get(user_idx, candidate_idx) > 0.0 {
                continue;
            }

            let mut numerator = 0.0;
            let mut denominator = 0.0;
            for &(rated_idx, rating) in &rated {
                let item_similarity = similarity.get(candidate_idx, rated_idx);
                numerator += item_similarity * rating;
                denominator += item_similarity.abs();
            }

            if denominator > 0.0 {
                predictions.push(RecipeScore::new(
                    matrix.recipe_id(candidate_idx),
                    numerator / denominator,
                ));
            }
        }

        debug!(
            user_id,
            rated = rated.len(),
            predictions = predictions.len(),
            "Item-based CF predictions generated"
        );

        rank_and_truncate(predictions, top_n)
    }

    /// Get model metadata
    pub fn metadata(&self) -> ModelMetadata {
        let model = self.model.read();
        ModelMetadata {
            user_count: model.matrix.as_ref().map(|m| m.user_count()).unwrap_or(0),
            recipe_count: model.matrix.as_ref().map(|m| m.recipe_count()).unwrap_or(0),
            generation: model.matrix.as_ref().map(|m| m.generation()),
            k_neighbors: self.config.k_neighbors,
            metric: "cosine",
        }
    }
}

/// User-based CF as a [`Recommender`]; candidates are ignored.
pub struct UserBasedCf {
    cf: Arc<CollaborativeFilteringRecommender>,
    k_neighbors: usize,
}

impl UserBasedCf {
    pub fn new(cf: Arc<CollaborativeFilteringRecommender>, k_neighbors: usize) -> Self {
        Self { cf, k_neighbors }
    }
}

impl Recommender for UserBasedCf {
    fn source(&self) -> RecommendationSource {
        RecommendationSource::UserCf
    }

    fn prepare(&self) {
        self.cf.ensure_built();
    }

    fn recommend(&self, user_id: &str, _candidates: &[String], top_n: usize) -> Vec<RecipeScore> {
        self.cf.user_based_recommend(user_id, top_n, self.k_neighbors)
    }
}

/// Item-based CF as a [`Recommender`]; candidates are ignored.
pub struct ItemBasedCf {
    cf: Arc<CollaborativeFilteringRecommender>,
}

impl ItemBasedCf {
    pub fn new(cf: Arc<CollaborativeFilteringRecommender>) -> Self {
        Self { cf }
    }
}

impl Recommender for ItemBasedCf {
    fn source(&self) -> RecommendationSource {
        RecommendationSource::ItemCf
    }

    fn prepare(&self) {
        self.cf.ensure_built();
    }

    fn recommend(&self, user_id: &str, _candidates: &[String], top_n: usize) -> Vec<RecipeScore> {
        self.cf.item_based_recommend(user_id, top_n)
    }
}
