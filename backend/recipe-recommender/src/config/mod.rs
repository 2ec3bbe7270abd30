use crate::error::{AppError, Result};
use crate::services::profile::BehaviorWeights;
use crate::services::recommendation::HybridWeights;
use serde::Deserialize;
use tracing::{info, warn};

const ENV_PREFIX: &str = "RECOMMENDER_";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub behavior_weights: BehaviorWeights,
    pub content: ContentScoringConfig,
    pub collaborative: CollaborativeConfig,
    pub hybrid: HybridConfig,
}

/// Increments applied by the content-based scorer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContentScoringConfig {
    /// Added once per static preference value whose tag the recipe carries
    pub preference_match_weight: f64,
    /// Keyword matches count at this fraction of a tag match
    pub keyword_match_factor: f64,
    /// Added once per context entry whose tag the recipe carries
    pub context_match_weight: f64,
}

impl Default for ContentScoringConfig {
    fn default() -> Self {
        Self {
            preference_match_weight: 1.0,
            keyword_match_factor: 0.5,
            context_match_weight: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollaborativeConfig {
    /// Added to every vector norm before dividing
    pub similarity_epsilon: f64,
    /// Neighborhood size used by the hybrid's user-based source
    pub k_neighbors: usize,
}

impl Default for CollaborativeConfig {
    fn default() -> Self {
        Self {
            similarity_epsilon: 1e-6,
            k_neighbors: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub weights: HybridWeights,
    pub cold_start_weights: HybridWeights,
    /// Each source is asked for `top_n * oversample_factor` results
    pub oversample_factor: usize,
    /// Users with fewer distinct interactions are treated as new
    pub cold_start_min_interactions: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            weights: HybridWeights::balanced(),
            cold_start_weights: HybridWeights::cold_start(),
            oversample_factor: 2,
            cold_start_min_interactions: 3,
        }
    }
}

/// Flat `RECOMMENDER_*` overrides read through envy.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    k_neighbors: Option<usize>,
    similarity_epsilon: Option<f64>,
    oversample_factor: Option<usize>,
    cold_start_min_interactions: Option<usize>,
    content_weight: Option<f64>,
    user_cf_weight: Option<f64>,
    item_cf_weight: Option<f64>,
    preference_match_weight: Option<f64>,
    keyword_match_factor: Option<f64>,
    context_match_weight: Option<f64>,
    /// `browse=1.0,collect=3.0,...`
    behavior_weights: Option<String>,
}

impl Config {
    /// Defaults overlaid with `RECOMMENDER_*` environment variables (and `.env`).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX).from_env()?;
        let mut config = Config::default();

        if let Some(k) = overrides.k_neighbors {
            config.collaborative.k_neighbors = k;
        }
        if let Some(epsilon) = overrides.similarity_epsilon {
            config.collaborative.similarity_epsilon = epsilon;
        }
        if let Some(factor) = overrides.oversample_factor {
            config.hybrid.oversample_factor = factor;
        }
        if let Some(threshold) = overrides.cold_start_min_interactions {
            config.hybrid.cold_start_min_interactions = threshold;
        }
        if let Some(weight) = overrides.preference_match_weight {
            config.content.preference_match_weight = weight;
        }
        if let Some(factor) = overrides.keyword_match_factor {
            config.content.keyword_match_factor = factor;
        }
        if let Some(weight) = overrides.context_match_weight {
            config.content.context_match_weight = weight;
        }

        if overrides.content_weight.is_some()
            || overrides.user_cf_weight.is_some()
            || overrides.item_cf_weight.is_some()
        {
            let defaults = config.hybrid.weights;
            config.hybrid.weights = HybridWeights::normalized(
                overrides.content_weight.unwrap_or(defaults.content),
                overrides.user_cf_weight.unwrap_or(defaults.user_cf),
                overrides.item_cf_weight.unwrap_or(defaults.item_cf),
            )?;
        }

        if let Some(raw) = overrides.behavior_weights.as_deref() {
            for (behavior, weight) in parse_behavior_weights(raw)? {
                config.behavior_weights.set(behavior, weight);
            }
        }

        config.validate()?;

        info!(
            k_neighbors = config.collaborative.k_neighbors,
            oversample_factor = config.hybrid.oversample_factor,
            content_weight = config.hybrid.weights.content,
            user_cf_weight = config.hybrid.weights.user_cf,
            item_cf_weight = config.hybrid.weights.item_cf,
            "Recommender configuration loaded"
        );

        Ok(config)
    }

    /// Parse a JSON document; missing sections fall back to defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let epsilon = self.collaborative.similarity_epsilon;
        if !epsilon.is_finite() || epsilon <= 0.0 {
            warn!(epsilon, "Rejected similarity epsilon");
            return Err(AppError::Configuration(format!(
                "similarity_epsilon must be a positive number (got {})",
                epsilon
            )));
        }

        if self.hybrid.oversample_factor == 0 {
            return Err(AppError::Configuration(
                "oversample_factor must be at least 1".to_string(),
            ));
        }

        self.hybrid.weights.validate()?;
        self.hybrid.cold_start_weights.validate()?;

        for (name, value) in [
            ("preference_match_weight", self.content.preference_match_weight),
            ("keyword_match_factor", self.content.keyword_match_factor),
            ("context_match_weight", self.content.context_match_weight),
        ] {
            if !value.is_finite() {
                return Err(AppError::Configuration(format!(
                    "{} must be finite (got {})",
                    name, value
                )));
            }
        }

        self.behavior_weights.validate()
    }
}

/// Parse `name=weight` pairs separated by commas.
fn parse_behavior_weights(raw: &str) -> Result<Vec<(String, f64)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, weight) = pair.split_once('=').ok_or_else(|| {
                AppError::Configuration(format!("behavior weight '{}' is not name=weight", pair))
            })?;
            let weight: f64 = weight.trim().parse().map_err(|_| {
                AppError::Configuration(format!("behavior weight '{}' is not a number", pair))
            })?;
            Ok((name.trim().to_string(), weight))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 11] = [
        "RECOMMENDER_K_NEIGHBORS",
        "RECOMMENDER_OVERSAMPLE_FACTOR",
        "RECOMMENDER_COLD_START_MIN_INTERACTIONS",
        "RECOMMENDER_PREFERENCE_MATCH_WEIGHT",
        "RECOMMENDER_KEYWORD_MATCH_FACTOR",
        "RECOMMENDER_CONTEXT_MATCH_WEIGHT",
        "RECOMMENDER_CONTENT_WEIGHT",
        "RECOMMENDER_USER_CF_WEIGHT",
        "RECOMMENDER_ITEM_CF_WEIGHT",
        "RECOMMENDER_BEHAVIOR_WEIGHTS",
        "RECOMMENDER_SIMILARITY_EPSILON",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.collaborative.k_neighbors, 20);
        assert_eq!(config.collaborative.similarity_epsilon, 1e-6);
        assert_eq!(config.hybrid.oversample_factor, 2);
        assert_eq!(config.content.context_match_weight, 2.0);
        assert_eq!(config.behavior_weights.weight("cook"), 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial_test::serial]
    fn test_config_from_env_without_override() {
        clear_env();

        let config = Config::from_env().unwrap();
        assert_eq!(config.collaborative.k_neighbors, 20);
        assert!((config.hybrid.weights.content - 0.4).abs() < 1e-9);
    }

    #[test]
    #[serial_test::serial]
    fn test_config_from_env_with_override() {
        clear_env();
        std::env::set_var("RECOMMENDER_K_NEIGHBORS", "5");
        std::env::set_var("RECOMMENDER_CONTENT_WEIGHT", "1");
        std::env::set_var("RECOMMENDER_USER_CF_WEIGHT", "1");
        std::env::set_var("RECOMMENDER_ITEM_CF_WEIGHT", "2");
        std::env::set_var("RECOMMENDER_BEHAVIOR_WEIGHTS", "browse=0.5, share=2");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.collaborative.k_neighbors, 5);
        assert!((config.hybrid.weights.content - 0.25).abs() < 1e-9);
        assert!((config.hybrid.weights.user_cf - 0.25).abs() < 1e-9);
        assert!((config.hybrid.weights.item_cf - 0.5).abs() < 1e-9);
        assert_eq!(config.behavior_weights.weight("browse"), 0.5);
        assert_eq!(config.behavior_weights.weight("share"), 2.0);
        assert_eq!(config.behavior_weights.weight("collect"), 3.0);
    }

    #[test]
    #[serial_test::serial]
    fn test_config_from_env_rejects_bad_values() {
        clear_env();
        std::env::set_var("RECOMMENDER_K_NEIGHBORS", "many");
        let result = Config::from_env();
        clear_env();
        assert!(matches!(result, Err(AppError::Configuration(_))));

        std::env::set_var("RECOMMENDER_BEHAVIOR_WEIGHTS", "browse");
        let result = Config::from_env();
        clear_env();
        assert!(matches!(result, Err(AppError::Configuration(_))));

        std::env::set_var("RECOMMENDER_SIMILARITY_EPSILON", "0");
        let result = Config::from_env();
        clear_env();
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_config_from_json_partial() {
        let config = Config::from_json(
            r#"{
                "collaborative": { "k_neighbors": 7 },
                "behavior_weights": { "browse": 1.0, "cook": 10.0 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.collaborative.k_neighbors, 7);
        assert_eq!(config.collaborative.similarity_epsilon, 1e-6);
        assert_eq!(config.behavior_weights.weight("cook"), 10.0);
        // Table replaced wholesale; unknown names fall back to 1.0
        assert_eq!(config.behavior_weights.weight("rate"), 1.0);
    }

    #[test]
    fn test_config_from_json_rejects_malformed() {
        assert!(matches!(
            Config::from_json("{ not json"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{"hybrid": {"oversample_factor": 0}}"#),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_behavior_weights() {
        let parsed = parse_behavior_weights("browse=1, cook = 5.5,").unwrap();
        assert_eq!(
            parsed,
            vec![("browse".to_string(), 1.0), ("cook".to_string(), 5.5)]
        );
        assert!(parse_behavior_weights("cook=fast").is_err());
    }
}
