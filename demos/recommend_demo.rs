//! Train on a small behavioral sample and print ranked recommendations

use finrec::{parse_user, FeatureFrame, RecommendOptions, Recommender, TrainingConfig};

fn main() {
    let table = r#"
        {"user_id": "u01", "market_events": 130, "engagement_ratio": 0.21, "tech_interest_ratio": 0.30, "offers_engagement": 12}
        {"user_id": "u02", "market_events": 142, "engagement_ratio": 0.23, "tech_interest_ratio": 0.32, "offers_engagement": 12}
        {"user_id": "u03", "market_events": 155, "engagement_ratio": 0.24, "tech_interest_ratio": 0.28, "offers_engagement": 13}
        {"user_id": "u04", "market_events": 137, "engagement_ratio": 0.22, "tech_interest_ratio": 0.35, "offers_engagement": 11}
        {"user_id": "u05", "market_events": 12, "engagement_ratio": 0.06, "tech_interest_ratio": 0.05, "offers_engagement": 2}
        {"user_id": "u06", "market_events": 18, "engagement_ratio": 0.07, "tech_interest_ratio": 0.04, "offers_engagement": 1}
        {"user_id": "u07", "market_events": 25, "engagement_ratio": 0.05, "tech_interest_ratio": 0.06, "offers_engagement": 3}
        {"user_id": "u08", "market_events": 60, "engagement_ratio": 0.20, "home_interest_ratio": 0.75, "offers_engagement": 8}
        {"user_id": "u09", "market_events": 66, "engagement_ratio": 0.21, "home_interest_ratio": 0.78, "offers_engagement": 7}
        {"user_id": "u10", "market_events": 72, "engagement_ratio": 0.19, "home_interest_ratio": 0.73, "offers_engagement": 9}
    "#;
    let user = r#"{"market_events": 160, "engagement_ratio": 0.25, "tech_interest_ratio": 0.33, "offers_engagement": 12}"#;

    let config = TrainingConfig {
        test_fraction: 0.0,
        ..TrainingConfig::default()
    };
    let mut recommender = Recommender::new().with_config(config);

    let result = FeatureFrame::parse_ndjson(table)
        .and_then(|frame| recommender.train(&frame))
        .and_then(|_| parse_user(user));
    match result {
        Ok(features) => {
            for r in recommender.recommend(&features, &RecommendOptions::default()) {
                println!(
                    "{}  score {}  probability {}  ({})",
                    r.product_id, r.score, r.probability, r.explanation
                );
            }
        }
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
