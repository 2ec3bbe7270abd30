// ============================================
// Recipe Recommendation Engine
// ============================================
//
// Hybrid recommender combining:
// - Content-based: profile tags × recipe tags/keywords
// - User-based CF: neighbors' interactions
// - Item-based CF: similarity to recipes the user already rated
// - Hybrid ranker: weighted fusion of the three
//
// Data Flow:
//   record_behavior → UserProfileStore ──→ build_matrices → CF model
//   add_structured_tags → RecipeFeatureStore ──→ content scorer
//                                                     ↓
//                  Content + UserCF + ItemCF → HybridRecommender → top N

pub mod collaborative_filtering;
pub mod content_based;
pub mod hybrid_ranker;
pub mod similarity;

pub use collaborative_filtering::{
    CacheStatus, CfState, CollaborativeFilteringRecommender, ItemBasedCf, ModelMetadata,
    UserBasedCf,
};
pub use content_based::ContentBasedRecommender;
pub use hybrid_ranker::{HybridRecommender, HybridWeights};
pub use similarity::{InteractionMatrix, SimilarityAxis, SimilarityMatrix};

use crate::config::Config;
use crate::error::Result;
use crate::metrics;
use crate::models::{AttributeValue, RecipeScore, RecommendationSource};
use crate::services::features::{RecipeFeature, RecipeFeatureStore, SharedFeatureStore};
use crate::services::profile::{SharedProfileStore, UserProfile, UserProfileStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A source of ranked `(recipe_id, score)` lists.
///
/// The hybrid ranker only depends on this capability, never on the
/// concrete recommenders behind it.
#[cfg_attr(test, mockall::automock)]
pub trait Recommender: Send + Sync {
    fn source(&self) -> RecommendationSource;

    /// Called once per hybrid request before `recommend`.
    fn prepare(&self) {}

    /// Ranked scores, descending, at most `top_n` entries.
    fn recommend(&self, user_id: &str, candidates: &[String], top_n: usize) -> Vec<RecipeScore>;
}

/// Facade owning both stores and every recommender.
pub struct RecommendationEngine {
    config: Config,
    profiles: SharedProfileStore,
    features: SharedFeatureStore,
    content: Arc<ContentBasedRecommender>,
    cf: Arc<CollaborativeFilteringRecommender>,
    hybrid: RwLock<HybridRecommender>,
}

impl RecommendationEngine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let profiles = UserProfileStore::new(config.behavior_weights.clone()).into_shared();
        let features = RecipeFeatureStore::new().into_shared();

        let content = Arc::new(ContentBasedRecommender::new(
            profiles.clone(),
            features.clone(),
            config.content.clone(),
        ));
        let cf = Arc::new(CollaborativeFilteringRecommender::new(
            profiles.clone(),
            config.collaborative.clone(),
        ));

        let hybrid = HybridRecommender::new(
            content.clone(),
            Arc::new(UserBasedCf::new(cf.clone(), config.collaborative.k_neighbors)),
            Arc::new(ItemBasedCf::new(cf.clone())),
            &config.hybrid,
        )?;

        info!(
            k_neighbors = config.collaborative.k_neighbors,
            oversample_factor = config.hybrid.oversample_factor,
            "Recommendation engine initialized"
        );

        Ok(Self {
            config,
            profiles,
            features,
            content,
            cf,
            hybrid: RwLock::new(hybrid),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ---- Profiles ----

    pub fn create_static_profile(&self, user_id: &str, preferences: HashMap<String, Vec<String>>) {
        self.profiles
            .write()
            .create_static_profile(user_id, preferences);
    }

    pub fn record_behavior(
        &self,
        user_id: &str,
        recipe_id: &str,
        behavior: &str,
        value: f64,
        recipe_tags: &HashMap<String, f64>,
    ) {
        self.profiles
            .write()
            .record_behavior(user_id, recipe_id, behavior, value, recipe_tags);
    }

    /// Record behavior using the recipe's tags from the feature store.
    pub fn record_interaction(&self, user_id: &str, recipe_id: &str, behavior: &str, value: f64) {
        // Feature lock released before the profile lock is taken
        let tags = self.features.read().get_feature(recipe_id).tags;
        self.record_behavior(user_id, recipe_id, behavior, value, &tags);
    }

    pub fn set_context(&self, user_id: &str, context: HashMap<String, String>) {
        self.profiles.write().set_context(user_id, context);
    }

    pub fn profile(&self, user_id: &str) -> UserProfile {
        self.profiles.read().get_profile(user_id)
    }

    pub fn interaction_count(&self, user_id: &str) -> usize {
        self.profiles.read().interaction_count(user_id)
    }

    // ---- Recipe features ----

    pub fn add_structured_tags<I, K>(&self, recipe_id: &str, attributes: I)
    where
        I: IntoIterator<Item = (K, AttributeValue)>,
        K: AsRef<str>,
    {
        self.features
            .write()
            .add_structured_tags(recipe_id, attributes);
    }

    pub fn set_keywords(&self, recipe_id: &str, keywords: HashMap<String, f64>) {
        self.features.write().set_keywords(recipe_id, keywords);
    }

    pub fn feature(&self, recipe_id: &str) -> RecipeFeature {
        self.features.read().get_feature(recipe_id)
    }

    // ---- Collaborative filtering model ----

    /// Full rebuild of the interaction matrix; returns the new generation.
    pub fn build_matrices(&self) -> u64 {
        self.cf.build_matrices()
    }

    pub fn cf_state(&self) -> CfState {
        self.cf.state()
    }

    pub fn cf_metadata(&self) -> ModelMetadata {
        self.cf.metadata()
    }

    pub fn collaborative(&self) -> &Arc<CollaborativeFilteringRecommender> {
        &self.cf
    }

    // ---- Recommendations ----

    pub fn recommend_content(
        &self,
        user_id: &str,
        candidates: &[String],
        top_n: usize,
    ) -> Vec<RecipeScore> {
        let start = Instant::now();
        let recs = self.content.recommend(user_id, candidates, top_n);
        metrics::record_request(RecommendationSource::Content, recs.len(), start.elapsed());
        recs
    }

    /// User-based CF with the configured neighborhood size. Empty until
    /// `build_matrices` has run.
    pub fn recommend_user_cf(&self, user_id: &str, top_n: usize) -> Vec<RecipeScore> {
        let start = Instant::now();
        let recs = self
            .cf
            .user_based_recommend(user_id, top_n, self.config.collaborative.k_neighbors);
        metrics::record_request(RecommendationSource::UserCf, recs.len(), start.elapsed());
        recs
    }

    pub fn recommend_item_cf(&self, user_id: &str, top_n: usize) -> Vec<RecipeScore> {
        let start = Instant::now();
        let recs = self.cf.item_based_recommend(user_id, top_n);
        metrics::record_request(RecommendationSource::ItemCf, recs.len(), start.elapsed());
        recs
    }

    pub fn recommend_hybrid(
        &self,
        user_id: &str,
        candidates: &[String],
        top_n: usize,
        is_new_user: bool,
    ) -> Vec<RecipeScore> {
        let start = Instant::now();
        let recs = self
            .hybrid
            .read()
            .recommend(user_id, candidates, top_n, is_new_user);
        metrics::record_request(RecommendationSource::Hybrid, recs.len(), start.elapsed());
        recs
    }

    /// Hybrid recommendation with cold-start detection from the user's
    /// interaction count.
    pub fn recommend_hybrid_auto(
        &self,
        user_id: &str,
        candidates: &[String],
        top_n: usize,
    ) -> Vec<RecipeScore> {
        let interactions = self.interaction_count(user_id);
        let is_new_user = interactions < self.config.hybrid.cold_start_min_interactions;

        debug!(user_id, interactions, is_new_user, "Cold-start check");

        self.recommend_hybrid(user_id, candidates, top_n, is_new_user)
    }

    pub fn set_hybrid_weights(&self, content: f64, user_cf: f64, item_cf: f64) -> Result<()> {
        self.hybrid.write().set_weights(content, user_cf, item_cf)
    }

    pub fn hybrid_weights(&self) -> HybridWeights {
        self.hybrid.read().weights()
    }
}
