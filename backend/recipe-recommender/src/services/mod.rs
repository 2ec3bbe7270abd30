pub mod features;
pub mod profile;
pub mod recommendation;

pub use features::{RecipeFeature, RecipeFeatureStore, SharedFeatureStore};
pub use profile::{BehaviorWeights, SharedProfileStore, UserProfile, UserProfileStore};
pub use recommendation::{
    CollaborativeFilteringRecommender, ContentBasedRecommender, HybridRecommender,
    HybridWeights, RecommendationEngine, Recommender,
};
