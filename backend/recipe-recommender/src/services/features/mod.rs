// ============================================
// Recipe Feature Store
// ============================================
//
// Per-recipe features consumed by the content-based scorer:
// - Tags: synthesized from structured attributes as `category_value`, weight 1.0
// - Keywords: pre-weighted terms supplied by an external text analyzer
//
// Data Flow:
//   {cuisine: "sichuan", taste: ["spicy", "salty"]}
//     → {cuisine_sichuan: 1.0, taste_spicy: 1.0, taste_salty: 1.0}

use crate::models::AttributeValue;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Weight assigned to every tag derived from a structured attribute
const STRUCTURED_TAG_WEIGHT: f64 = 1.0;

pub type SharedFeatureStore = Arc<RwLock<RecipeFeatureStore>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeFeature {
    /// tag → weight
    pub tags: HashMap<String, f64>,
    /// keyword → weight
    pub keywords: HashMap<String, f64>,
}

impl RecipeFeature {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.keywords.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RecipeFeatureStore {
    features: BTreeMap<String, RecipeFeature>,
}

impl RecipeFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedFeatureStore {
        Arc::new(RwLock::new(self))
    }

    fn feature_mut(&mut self, recipe_id: &str) -> &mut RecipeFeature {
        self.features.entry(recipe_id.to_string()).or_default()
    }

    /// Expand structured attributes into tags and merge them into the recipe.
    pub fn add_structured_tags<I, K>(&mut self, recipe_id: &str, attributes: I)
    where
        I: IntoIterator<Item = (K, AttributeValue)>,
        K: AsRef<str>,
    {
        let feature = self.feature_mut(recipe_id);
        let before = feature.tags.len();

        for (category, value) in attributes {
            for tag in value.tag_names(category.as_ref()) {
                feature.tags.insert(tag, STRUCTURED_TAG_WEIGHT);
            }
        }

        debug!(
            recipe_id,
            new_tags = feature.tags.len() - before,
            total_tags = feature.tags.len(),
            "Merged structured recipe tags"
        );
    }

    /// Merge pre-computed keyword weights; repeated keywords are overwritten.
    pub fn set_keywords(&mut self, recipe_id: &str, keywords: HashMap<String, f64>) {
        self.feature_mut(recipe_id).keywords.extend(keywords);
    }

    /// Feature for `recipe_id`, or an empty feature for unknown recipes.
    pub fn get_feature(&self, recipe_id: &str) -> RecipeFeature {
        self.features.get(recipe_id).cloned().unwrap_or_default()
    }

    /// Borrowing variant of [`get_feature`](Self::get_feature).
    pub fn feature(&self, recipe_id: &str) -> Option<&RecipeFeature> {
        self.features.get(recipe_id)
    }

    pub fn list_recipe_ids(&self) -> Vec<String> {
        self.features.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
