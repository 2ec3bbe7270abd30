// Integration tests for the recipe recommendation engine

use recipe_recommender::logging::init_tracing;
use recipe_recommender::services::recommendation::{CacheStatus, CfState};
use recipe_recommender::{AppError, AttributeValue, Config, RecipeScore, RecommendationEngine};
use std::collections::HashMap;

fn engine() -> RecommendationEngine {
    init_tracing();
    RecommendationEngine::new(Config::default()).expect("default config is valid")
}

fn candidates(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn ids(scores: &[RecipeScore]) -> Vec<&str> {
    scores.iter().map(|s| s.recipe_id.as_str()).collect()
}

fn prefers(engine: &RecommendationEngine, user_id: &str, category: &str, value: &str) {
    engine.create_static_profile(
        user_id,
        HashMap::from([(category.to_string(), vec![value.to_string()])]),
    );
}

#[test]
fn test_behavior_accumulates() {
    let engine = engine();
    engine.record_behavior("u1", "r1", "browse", 1.0, &HashMap::new());
    engine.record_behavior("u1", "r1", "browse", 1.0, &HashMap::new());

    assert_eq!(engine.profile("u1").dynamic_behavior["r1"], 2.0);
}

#[test]
fn test_unknown_behavior_weighs_one() {
    let engine = engine();
    engine.record_behavior(
        "u1",
        "r1",
        "share",
        2.0,
        &HashMap::from([("taste_sweet".to_string(), 0.5)]),
    );

    let profile = engine.profile("u1");
    assert_eq!(profile.dynamic_behavior["r1"], 2.0);
    assert_eq!(profile.interests["taste_sweet"], 1.0);
}

#[test]
fn test_content_preference_and_context() {
    let engine = engine();
    prefers(&engine, "u1", "cuisine", "A");
    engine.add_structured_tags(
        "r1",
        [
            ("cuisine", AttributeValue::from("A")),
            ("season", AttributeValue::from("summer")),
        ],
    );

    let before = engine.recommend_content("u1", &candidates(&["r1"]), 1);
    assert!(before[0].score >= 1.0);

    engine.set_context(
        "u1",
        HashMap::from([("season".to_string(), "summer".to_string())]),
    );
    let after = engine.recommend_content("u1", &candidates(&["r1"]), 1);
    assert_eq!(after[0].score - before[0].score, 2.0);
}

#[test]
fn test_content_sorted_truncated_and_stable() {
    let engine = engine();
    prefers(&engine, "u1", "cuisine", "A");
    engine.add_structured_tags("r4", [("cuisine", AttributeValue::from("A"))]);

    let pool = candidates(&["r1", "r2", "r3", "r4"]);
    let recs = engine.recommend_content("u1", &pool, 2);
    assert_eq!(ids(&recs), vec!["r4", "r1"]);

    let all = engine.recommend_content("u1", &pool, 10);
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_unknown_user_never_fails() {
    let engine = engine();
    engine.add_structured_tags("r1", [("cuisine", AttributeValue::from("A"))]);
    engine.build_matrices();

    assert_eq!(engine.recommend_content("ghost", &candidates(&["r1"]), 5)[0].score, 0.0);
    assert!(engine.recommend_user_cf("ghost", 5).is_empty());
    assert!(engine.recommend_item_cf("ghost", 5).is_empty());
    assert_eq!(
        ids(&engine.recommend_hybrid("ghost", &candidates(&["r1"]), 5, false)),
        vec!["r1"]
    );
    assert!(engine.recommend_hybrid("ghost", &[], 5, true).is_empty());
}

/// u1 likes cuisine A (recipe "ra") and browsed "shared"; u2 browsed
/// "shared" and "rb". CF pushes rb, content pushes ra.
fn cold_start_fixture() -> RecommendationEngine {
    let engine = engine();
    prefers(&engine, "u1", "cuisine", "A");
    engine.add_structured_tags("ra", [("cuisine", AttributeValue::from("A"))]);
    engine.add_structured_tags("rb", [("cuisine", AttributeValue::from("B"))]);

    engine.record_interaction("u1", "shared", "browse", 1.0);
    engine.record_interaction("u2", "shared", "browse", 1.0);
    engine.record_interaction("u2", "rb", "browse", 1.0);
    engine
}

#[test]
fn test_hybrid_new_user_prefers_content() {
    let engine = cold_start_fixture();
    let pool = candidates(&["ra", "rb"]);

    // ra = 0.4 × 1.0, rb = 0.3 × 1.0 + 0.3 × 1.0
    let returning = engine.recommend_hybrid("u1", &pool, 2, false);
    assert_eq!(ids(&returning), vec!["rb", "ra"]);

    // ra = 0.8 × 1.0, rb = 0.1 × 1.0 + 0.1 × 1.0
    let fresh = engine.recommend_hybrid("u1", &pool, 2, true);
    assert_eq!(ids(&fresh), vec!["ra", "rb"]);
    assert!((fresh[0].score - 0.8).abs() < 1e-9);
    assert!((fresh[1].score - 0.2).abs() < 1e-6);

    // The override never touches the stored weights
    assert_eq!(engine.hybrid_weights().content, 0.4);
}

#[test]
fn test_hybrid_auto_detects_cold_start() {
    let engine = cold_start_fixture();
    let pool = candidates(&["ra", "rb"]);

    assert_eq!(engine.interaction_count("u1"), 1);
    assert_eq!(ids(&engine.recommend_hybrid_auto("u1", &pool, 2)), vec!["ra", "rb"]);
}

#[test]
fn test_hybrid_weights_normalization() {
    let engine = engine();

    engine.set_hybrid_weights(1.0, 1.0, 2.0).unwrap();
    let weights = engine.hybrid_weights();
    assert_eq!(
        (weights.content, weights.user_cf, weights.item_cf),
        (0.25, 0.25, 0.5)
    );

    let err = engine.set_hybrid_weights(0.0, 0.0, 0.0).unwrap_err();
    assert!(matches!(err, AppError::Configuration(_)));
}

#[test]
fn test_rebuild_marks_similarity_stale_then_refreshes() {
    let engine = engine();
    engine.record_interaction("u1", "r1", "cook", 1.0);
    engine.record_interaction("u2", "r1", "cook", 1.0);
    engine.record_interaction("u2", "r2", "rate", 1.0);
    engine.build_matrices();

    assert_eq!(ids(&engine.recommend_user_cf("u1", 5)), vec!["r2"]);

    engine.record_interaction("u3", "r3", "cook", 1.0);
    engine.build_matrices();
    match engine.cf_state() {
        CfState::Built {
            generation,
            users,
            user_similarity,
            item_similarity,
            ..
        } => {
            assert_eq!(generation, 2);
            assert_eq!(users, 3);
            assert_eq!(user_similarity, CacheStatus::Stale);
            assert_eq!(item_similarity, CacheStatus::Missing);
        }
        CfState::Unbuilt => panic!("matrices should be built"),
    }

    // Served from a recomputed cache that includes u3
    engine.recommend_user_cf("u1", 5);
    assert!(engine.collaborative().user_similarity("u1", "u3").is_some());
    assert!(matches!(
        engine.cf_state(),
        CfState::Built {
            user_similarity: CacheStatus::Fresh,
            ..
        }
    ));
}

#[test]
fn test_engine_from_json_config() {
    let config = Config::from_json(
        r#"{
            "behavior_weights": {"browse": 2.0, "cook": 10.0},
            "hybrid": {"weights": {"content": 0.5, "user_cf": 0.25, "item_cf": 0.25}}
        }"#,
    )
    .unwrap();
    let engine = RecommendationEngine::new(config).unwrap();

    engine.record_behavior("u1", "r1", "cook", 1.0, &HashMap::new());
    engine.record_behavior("u1", "r2", "collect", 1.0, &HashMap::new());

    let profile = engine.profile("u1");
    assert_eq!(profile.dynamic_behavior["r1"], 10.0);
    // Missing from the table, so weighted 1.0
    assert_eq!(profile.dynamic_behavior["r2"], 1.0);
    assert_eq!(engine.hybrid_weights().content, 0.5);
}
