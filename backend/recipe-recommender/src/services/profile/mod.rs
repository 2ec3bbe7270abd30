// ============================================
// User Profile Store (用戶畫像)
// ============================================
//
// Per-user profile with four facets:
// 1. Static preferences (declared, replaced wholesale)
// 2. Dynamic behavior (recipe_id → accumulated weighted score)
// 3. Interests (tag → accumulated weighted score)
// 4. Context (key → current value, merged per key)
//
// Behavior score formula:
//   dynamic_behavior[recipe] += behavior_weight(type) × value
//   interests[tag]           += behavior_weight(type) × value × tag_weight
//
// Default behavior weights:
// - Browse: 1.0
// - Collect: 3.0
// - Rate: 4.0
// - Cook: 5.0
// - Anything else: 1.0

use crate::error::{AppError, Result};
use crate::models::BehaviorType;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Weight of behaviors missing from the table
const UNKNOWN_BEHAVIOR_WEIGHT: f64 = 1.0;

pub type SharedProfileStore = Arc<RwLock<UserProfileStore>>;

/// Behavior type → multiplier applied to recorded interaction values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorWeights {
    weights: HashMap<String, f64>,
}

impl Default for BehaviorWeights {
    fn default() -> Self {
        let weights = BehaviorType::all()
            .into_iter()
            .map(|behavior| {
                let weight = match behavior {
                    BehaviorType::Browse => 1.0,
                    BehaviorType::Collect => 3.0,
                    BehaviorType::Rate => 4.0,
                    BehaviorType::Cook => 5.0,
                };
                (behavior.as_str().to_string(), weight)
            })
            .collect();

        Self { weights }
    }
}

impl BehaviorWeights {
    pub fn new(weights: HashMap<String, f64>) -> Self {
        Self { weights }
    }

    pub fn weight(&self, behavior: &str) -> f64 {
        self.weights
            .get(behavior)
            .copied()
            .unwrap_or(UNKNOWN_BEHAVIOR_WEIGHT)
    }

    pub fn set(&mut self, behavior: impl Into<String>, weight: f64) {
        self.weights.insert(behavior.into(), weight);
    }

    pub fn validate(&self) -> Result<()> {
        match self.weights.iter().find(|(_, w)| !w.is_finite()) {
            Some((behavior, weight)) => Err(AppError::Configuration(format!(
                "behavior weight for '{}' must be finite (got {})",
                behavior, weight
            ))),
            None => Ok(()),
        }
    }
}

/// Everything the engine knows about one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// category → preferred values, e.g. "cuisine" → ["sichuan", "cantonese"]
    pub static_preferences: HashMap<String, Vec<String>>,
    /// recipe_id → accumulated behavior score
    pub dynamic_behavior: BTreeMap<String, f64>,
    /// tag → accumulated interest weight
    pub interests: HashMap<String, f64>,
    /// context key → current value, e.g. "season" → "summer"
    pub context_info: HashMap<String, String>,
}

impl UserProfile {
    /// True when nothing has been recorded for this user.
    pub fn is_empty(&self) -> bool {
        self.static_preferences.is_empty()
            && self.dynamic_behavior.is_empty()
            && self.interests.is_empty()
            && self.context_info.is_empty()
    }
}

/// In-memory profile store. Profiles are created lazily and never removed.
#[derive(Debug, Default)]
pub struct UserProfileStore {
    profiles: BTreeMap<String, UserProfile>,
    behavior_weights: BehaviorWeights,
}

impl UserProfileStore {
    pub fn new(behavior_weights: BehaviorWeights) -> Self {
        Self {
            profiles: BTreeMap::new(),
            behavior_weights,
        }
    }

    pub fn into_shared(self) -> SharedProfileStore {
        Arc::new(RwLock::new(self))
    }

    pub fn behavior_weights(&self) -> &BehaviorWeights {
        &self.behavior_weights
    }

    fn profile_mut(&mut self, user_id: &str) -> &mut UserProfile {
        self.profiles.entry(user_id.to_string()).or_default()
    }

    /// Replace the user's declared preferences (last write wins).
    pub fn create_static_profile(
        &mut self,
        user_id: &str,
        preferences: HashMap<String, Vec<String>>,
    ) {
        self.profile_mut(user_id).static_preferences = preferences;
    }

    /// Accumulate one interaction into behavior and interest scores.
    pub fn record_behavior(
        &mut self,
        user_id: &str,
        recipe_id: &str,
        behavior: &str,
        value: f64,
        recipe_tags: &HashMap<String, f64>,
    ) {
        let weight = self.behavior_weights.weight(behavior);
        let profile = self.profile_mut(user_id);

        *profile
            .dynamic_behavior
            .entry(recipe_id.to_string())
            .or_insert(0.0) += weight * value;

        for (tag, tag_weight) in recipe_tags {
            *profile.interests.entry(tag.clone()).or_insert(0.0) += weight * value * tag_weight;
        }

        debug!(
            user_id,
            recipe_id,
            behavior,
            weight,
            value,
            tags = recipe_tags.len(),
            "Recorded user behavior"
        );
    }

    /// Merge context entries; existing keys are overwritten.
    pub fn set_context(&mut self, user_id: &str, context: HashMap<String, String>) {
        self.profile_mut(user_id).context_info.extend(context);
    }

    /// Profile for `user_id`, or an empty profile for unknown users.
    pub fn get_profile(&self, user_id: &str) -> UserProfile {
        self.profiles.get(user_id).cloned().unwrap_or_default()
    }

    /// Borrowing variant of [`get_profile`](Self::get_profile).
    pub fn profile(&self, user_id: &str) -> Option<&UserProfile> {
        self.profiles.get(user_id)
    }

    /// All known user ids in sorted order.
    pub fn list_user_ids(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn contains_user(&self, user_id: &str) -> bool {
        self.profiles.contains_key(user_id)
    }

    /// Number of distinct recipes the user has interacted with.
    pub fn interaction_count(&self, user_id: &str) -> usize {
        self.profiles
            .get(user_id)
            .map(|p| p.dynamic_behavior.len())
            .unwrap_or(0)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &UserProfile)> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(t, w)| (t.to_string(), *w)).collect()
    }

    #[test]
    fn test_behavior_weights_default_table() {
        let weights = BehaviorWeights::default();
        assert_eq!(weights.weight("browse"), 1.0);
        assert_eq!(weights.weight("collect"), 3.0);
        assert_eq!(weights.weight("rate"), 4.0);
        assert_eq!(weights.weight("cook"), 5.0);
        assert_eq!(weights.weight("share"), 1.0);
    }

    #[test]
    fn test_record_behavior_accumulates() {
        let mut store = UserProfileStore::default();
        let no_tags = HashMap::new();

        store.record_behavior("u1", "r1", "collect", 1.0, &no_tags);
        let once = store.get_profile("u1").dynamic_behavior["r1"];
        store.record_behavior("u1", "r1", "collect", 1.0, &no_tags);
        let twice = store.get_profile("u1").dynamic_behavior["r1"];

        assert_eq!(once, 3.0);
        assert_eq!(twice, 2.0 * once);
    }

    #[test]
    fn test_record_behavior_updates_interests() {
        let mut store = UserProfileStore::default();
        let recipe_tags = tags(&[("cuisine_sichuan", 1.0), ("taste_spicy", 0.5)]);

        store.record_behavior("u1", "r1", "rate", 2.0, &recipe_tags);
        store.record_behavior("u1", "r2", "unknown", 1.0, &recipe_tags);

        let profile = store.get_profile("u1");
        // rate: 4 × 2 × 1 + unknown: 1 × 1 × 1
        assert_eq!(profile.interests["cuisine_sichuan"], 9.0);
        assert_eq!(profile.interests["taste_spicy"], 4.5);
        assert_eq!(profile.dynamic_behavior["r2"], 1.0);
    }

    #[test]
    fn test_static_profile_last_write_wins() {
        let mut store = UserProfileStore::default();
        let mut first = HashMap::new();
        first.insert("cuisine".to_string(), vec!["a".to_string(), "b".to_string()]);
        store.create_static_profile("u1", first);

        let mut second = HashMap::new();
        second.insert("taste".to_string(), vec!["spicy".to_string()]);
        store.create_static_profile("u1", second.clone());

        assert_eq!(store.get_profile("u1").static_preferences, second);
    }

    #[test]
    fn test_context_merges_per_key() {
        let mut store = UserProfileStore::default();
        store.set_context(
            "u1",
            HashMap::from([
                ("season".to_string(), "winter".to_string()),
                ("location".to_string(), "beijing".to_string()),
            ]),
        );
        store.set_context(
            "u1",
            HashMap::from([("season".to_string(), "summer".to_string())]),
        );

        let context = store.get_profile("u1").context_info;
        assert_eq!(context["season"], "summer");
        assert_eq!(context["location"], "beijing");
    }

    #[test]
    fn test_unknown_user_is_empty_profile() {
        let store = UserProfileStore::default();
        assert!(store.get_profile("ghost").is_empty());
        assert!(!store.contains_user("ghost"));
        assert_eq!(store.interaction_count("ghost"), 0);
        // Lookup does not create a profile
        assert!(store.list_user_ids().is_empty());
    }

    #[test]
    fn test_list_user_ids_is_sorted() {
        let mut store = UserProfileStore::default();
        let no_tags = HashMap::new();
        store.record_behavior("carol", "r1", "browse", 1.0, &no_tags);
        store.set_context("alice", HashMap::new());
        store.create_static_profile("bob", HashMap::new());

        assert_eq!(store.list_user_ids(), vec!["alice", "bob", "carol"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_custom_behavior_weights() {
        let mut weights = BehaviorWeights::default();
        weights.set("browse", 0.25);
        let mut store = UserProfileStore::new(weights);

        store.record_behavior("u1", "r1", BehaviorType::Browse.as_str(), 4.0, &HashMap::new());
        assert_eq!(store.get_profile("u1").dynamic_behavior["r1"], 1.0);
    }

    #[test]
    fn test_behavior_weights_validate() {
        let mut weights = BehaviorWeights::default();
        assert!(weights.validate().is_ok());
        weights.set("cook", f64::NAN);
        assert!(matches!(weights.validate(), Err(AppError::Configuration(_))));
    }
}
