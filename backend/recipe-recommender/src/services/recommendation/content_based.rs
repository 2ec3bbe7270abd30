// ============================================
// Content-Based Recommender
// ============================================
//
// Matches a user profile against recipe tags and keywords. No training
// phase: every call reads the current stores.
//
// Score components:
//   + preference_match_weight  per static preference value whose tag the recipe has
//   + interest × tag_weight    per interest tag present in recipe tags
//   + interest × keyword × keyword_match_factor
//                              per interest tag present in recipe keywords
//   + context_match_weight     per context entry whose tag the recipe has
//
// Scores are not normalized.

use super::Recommender;
use crate::config::ContentScoringConfig;
use crate::models::{compose_tag, RecipeScore, RecommendationSource};
use crate::services::features::{RecipeFeature, SharedFeatureStore};
use crate::services::profile::{SharedProfileStore, UserProfile};
use crate::utils::rank_and_truncate;
use tracing::debug;

pub struct ContentBasedRecommender {
    profiles: SharedProfileStore,
    features: SharedFeatureStore,
    config: ContentScoringConfig,
}

impl ContentBasedRecommender {
    pub fn new(
        profiles: SharedProfileStore,
        features: SharedFeatureStore,
        config: ContentScoringConfig,
    ) -> Self {
        Self {
            profiles,
            features,
            config,
        }
    }

    /// Match score between a user and one recipe.
    pub fn score(&self, user_id: &str, recipe_id: &str) -> f64 {
        let profiles = self.profiles.read();
        let features = self.features.read();

        match (profiles.profile(user_id), features.feature(recipe_id)) {
            (Some(profile), Some(feature)) => self.score_profile(profile, feature),
            _ => 0.0,
        }
    }

    fn score_profile(&self, profile: &UserProfile, feature: &RecipeFeature) -> f64 {
        let mut score = 0.0;

        for (category, values) in &profile.static_preferences {
            for value in values {
                if feature.tags.contains_key(&compose_tag(category, value)) {
                    score += self.config.preference_match_weight;
                }
            }
        }

        // Tag and keyword matches are independent; both may fire for one interest
        for (tag, interest) in &profile.interests {
            if let Some(tag_weight) = feature.tags.get(tag) {
                score += interest * tag_weight;
            }
            if let Some(keyword_weight) = feature.keywords.get(tag) {
                score += interest * keyword_weight * self.config.keyword_match_factor;
            }
        }

        for (key, value) in &profile.context_info {
            if feature.tags.contains_key(&compose_tag(key, value)) {
                score += self.config.context_match_weight;
            }
        }

        score
    }

    /// Score every candidate and return the best `top_n`.
    pub fn recommend(
        &self,
        user_id: &str,
        candidates: &[String],
        top_n: usize,
    ) -> Vec<RecipeScore> {
        let scored: Vec<RecipeScore> = {
            let profiles = self.profiles.read();
            let features = self.features.read();
            let empty_profile = UserProfile::default();
            let empty_feature = RecipeFeature::default();
            let profile = profiles.profile(user_id).unwrap_or(&empty_profile);

            candidates
                .iter()
                .map(|recipe_id| {
                    let feature = features.feature(recipe_id).unwrap_or(&empty_feature);
                    RecipeScore::new(recipe_id.clone(), self.score_profile(profile, feature))
                })
                .collect()
        };

        debug!(
            user_id,
            candidates = candidates.len(),
            top_n,
            "Content-based scoring complete"
        );

        rank_and_truncate(scored, top_n)
    }
}

impl Recommender for ContentBasedRecommender {
    fn source(&self) -> RecommendationSource {
        RecommendationSource::Content
    }

    fn recommend(&self, user_id: &str, candidates: &[String], top_n: usize) -> Vec<RecipeScore> {
        ContentBasedRecommender::recommend(self, user_id, candidates, top_n)
    }
}
