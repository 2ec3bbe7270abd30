pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::{AttributeValue, BehaviorType, RecipeScore, RecommendationSource};
pub use services::{RecipeFeatureStore, RecommendationEngine, Recommender, UserProfileStore};
