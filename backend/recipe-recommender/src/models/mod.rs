use serde::{Deserialize, Serialize};
use std::fmt;

/// A recipe id paired with the score one recommender assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeScore {
    pub recipe_id: String,
    pub score: f64,
}

impl RecipeScore {
    pub fn new(recipe_id: impl Into<String>, score: f64) -> Self {
        Self {
            recipe_id: recipe_id.into(),
            score,
        }
    }
}

impl fmt::Display for RecipeScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.4})", self.recipe_id, self.score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Content,  // 內容匹配
    UserCf,   // 基於用戶的協同過濾
    ItemCf,   // 基於物品的協同過濾
    Hybrid,   // 融合結果
}

impl RecommendationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationSource::Content => "content",
            RecommendationSource::UserCf => "user_cf",
            RecommendationSource::ItemCf => "item_cf",
            RecommendationSource::Hybrid => "hybrid",
        }
    }
}

/// Interaction kinds the presentation layer reports.
///
/// The profile store looks weights up by name, so callers may also pass
/// arbitrary strings; anything not in the weight table counts as 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorType {
    Browse,
    Collect,
    Rate,
    Cook,
}

impl BehaviorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorType::Browse => "browse",
            BehaviorType::Collect => "collect",
            BehaviorType::Rate => "rate",
            BehaviorType::Cook => "cook",
        }
    }

    pub fn all() -> [BehaviorType; 4] {
        [
            BehaviorType::Browse,
            BehaviorType::Collect,
            BehaviorType::Rate,
            BehaviorType::Cook,
        ]
    }
}

impl AsRef<str> for BehaviorType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Structured recipe attribute: a category maps to one value or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AttributeValue {
    /// Synthesized tag names (`category_value`) for this attribute.
    pub fn tag_names(&self, category: &str) -> Vec<String> {
        match self {
            AttributeValue::Single(value) => vec![compose_tag(category, value)],
            AttributeValue::Multiple(values) => values
                .iter()
                .map(|value| compose_tag(category, value))
                .collect(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Single(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Single(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        AttributeValue::Multiple(values)
    }
}

impl From<&[&str]> for AttributeValue {
    fn from(values: &[&str]) -> Self {
        AttributeValue::Multiple(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Tag key shared by recipe tags, static preferences and context matching.
pub fn compose_tag(category: &str, value: &str) -> String {
    format!("{}_{}", category, value)
}
