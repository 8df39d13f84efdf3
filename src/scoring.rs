//! Score aggregation: the weighted ensemble of the five layer scores and the
//! three-way classification derived from it.
//!
//! Everything here is a pure function over its arguments. The weights and
//! band thresholds are process-wide constants, never per-call configuration,
//! so two renderings of the same result always agree.

use crate::analysis::{Classification, Layer, LayerScores};
use crate::error::AnalysisError;

/// Ensemble weights. Fixed policy; must sum to 1.0.
pub const AUTH_WEIGHT: f64 = 0.25;
pub const CONTENT_WEIGHT: f64 = 0.30;
pub const URL_WEIGHT: f64 = 0.20;
pub const BEHAVIOR_WEIGHT: f64 = 0.15;
pub const SENTIMENT_WEIGHT: f64 = 0.10;

/// Safety-band lower bounds on the 0-100 scale, inclusive.
pub const SAFE_THRESHOLD: f64 = 70.0;
pub const SUSPICIOUS_THRESHOLD: f64 = 40.0;

pub fn weight(layer: Layer) -> f64 {
    match layer {
        Layer::Auth => AUTH_WEIGHT,
        Layer::Content => CONTENT_WEIGHT,
        Layer::Url => URL_WEIGHT,
        Layer::Behavior => BEHAVIOR_WEIGHT,
        Layer::Sentiment => SENTIMENT_WEIGHT,
    }
}

/// Aggregated risk value plus the classification it maps to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub final_score: f64,
    pub classification: Classification,
}

/// Weighted risk aggregate over the five layers, in [0,1].
///
/// All five scores must be present and valid; a bad score fails with
/// `InvalidInput` rather than being clamped or defaulted.
pub fn final_score(scores: &LayerScores) -> Result<f64, AnalysisError> {
    scores.validate()?;
    Ok(Layer::ALL
        .iter()
        .map(|&layer| weight(layer) * scores.get(layer))
        .sum())
}

/// Inverts a risk value onto the 0-100 safety scale (higher = safer),
/// clamped to absorb float drift at the range edges.
pub fn safety_score(final_score: f64) -> f64 {
    ((1.0 - final_score) * 100.0).clamp(0.0, 100.0)
}

/// Bands the safety scale: [70,100] Safe, [40,70) Suspicious, [0,40)
/// Phishing. Lower bounds are inclusive, so exactly 70.0 is Safe and
/// exactly 40.0 is Suspicious.
pub fn classify_safety(safety: f64) -> Classification {
    if safety >= SAFE_THRESHOLD {
        Classification::Safe
    } else if safety >= SUSPICIOUS_THRESHOLD {
        Classification::Suspicious
    } else {
        Classification::Phishing
    }
}

/// Full aggregation: layer scores to final score and classification.
pub fn classify(scores: &LayerScores) -> Result<Verdict, AnalysisError> {
    let final_score = final_score(scores)?;
    let classification = classify_safety(safety_score(final_score));
    Ok(Verdict {
        final_score,
        classification,
    })
}

/// Automated handling the service recommends for a verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendedActions {
    pub actions: Vec<&'static str>,
    pub quarantined: bool,
    pub admin_notified: bool,
}

pub fn recommended_actions(classification: Classification) -> RecommendedActions {
    match classification {
        Classification::Safe => RecommendedActions {
            actions: vec!["Deliver to Inbox"],
            quarantined: false,
            admin_notified: false,
        },
        Classification::Suspicious => RecommendedActions {
            actions: vec!["Move to Spam", "Tag as Suspicious"],
            quarantined: true,
            admin_notified: false,
        },
        Classification::Phishing => RecommendedActions {
            actions: vec![
                "Move to Quarantine",
                "Tag as High Risk - Phish Detected",
                "Notify Admin",
            ],
            quarantined: true,
            admin_notified: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(score: f64) -> LayerScores {
        LayerScores {
            auth: score,
            content: score,
            url: score,
            behavior: score,
            sentiment: score,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Layer::ALL.iter().map(|&l| weight(l)).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_final_score_is_weighted_sum() {
        let scores = LayerScores {
            auth: 0.9,
            content: 0.2,
            url: 0.4,
            behavior: 0.1,
            sentiment: 0.7,
        };
        let expected = 0.9 * 0.25 + 0.2 * 0.30 + 0.4 * 0.20 + 0.1 * 0.15 + 0.7 * 0.10;
        let actual = final_score(&scores).unwrap();
        assert!((actual - expected).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_is_safe() {
        let verdict = classify(&uniform(0.0)).unwrap();
        assert_eq!(verdict.final_score, 0.0);
        assert_eq!(safety_score(verdict.final_score), 100.0);
        assert_eq!(verdict.classification, Classification::Safe);
    }

    #[test]
    fn test_all_one_is_phishing() {
        let verdict = classify(&uniform(1.0)).unwrap();
        assert!((verdict.final_score - 1.0).abs() < 1e-9);
        assert_eq!(safety_score(1.0), 0.0);
        assert_eq!(verdict.classification, Classification::Phishing);
    }

    #[test]
    fn test_uniform_high_risk_is_phishing() {
        let verdict = classify(&uniform(0.8)).unwrap();
        assert!((verdict.final_score - 0.8).abs() < 1e-9);
        assert!((safety_score(verdict.final_score) - 20.0).abs() < 1e-9);
        assert_eq!(verdict.classification, Classification::Phishing);
    }

    #[test]
    fn test_band_lower_bounds_are_inclusive() {
        // final_score 0.30 exactly -> safety 70.0 -> Safe
        assert_eq!(classify_safety(safety_score(0.30)), Classification::Safe);
        let verdict = classify(&uniform(0.30)).unwrap();
        assert_eq!(verdict.classification, Classification::Safe);

        assert_eq!(classify_safety(70.0), Classification::Safe);
        assert_eq!(classify_safety(40.0), Classification::Suspicious);
        assert_eq!(classify_safety(69.999), Classification::Suspicious);
        assert_eq!(classify_safety(39.999), Classification::Phishing);
        assert_eq!(classify_safety(0.0), Classification::Phishing);
        assert_eq!(classify_safety(100.0), Classification::Safe);
    }

    #[test]
    fn test_bands_partition_the_scale() {
        // Every point on the scale maps to exactly one classification.
        let mut safety = 0.0;
        while safety <= 100.0 {
            let matched = [
                classify_safety(safety) == Classification::Safe,
                classify_safety(safety) == Classification::Suspicious,
                classify_safety(safety) == Classification::Phishing,
            ]
            .iter()
            .filter(|&&m| m)
            .count();
            assert_eq!(matched, 1, "safety {safety} matched {matched} bands");
            safety += 0.25;
        }
    }

    #[test]
    fn test_out_of_range_score_is_rejected_not_clamped() {
        let mut scores = uniform(0.2);
        scores.url = 1.5;
        assert!(matches!(
            classify(&scores),
            Err(AnalysisError::InvalidInput(_))
        ));

        scores.url = -0.1;
        assert!(classify(&scores).is_err());
    }

    #[test]
    fn test_classify_is_pure() {
        let scores = uniform(0.42);
        let first = classify(&scores).unwrap();
        let second = classify(&scores).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_safety_clamps_float_drift() {
        assert_eq!(safety_score(1.0000000001), 0.0);
        assert_eq!(safety_score(-0.0000000001), 100.0);
    }

    #[test]
    fn test_recommended_actions_per_classification() {
        let safe = recommended_actions(Classification::Safe);
        assert_eq!(safe.actions, vec!["Deliver to Inbox"]);
        assert!(!safe.quarantined && !safe.admin_notified);

        let suspicious = recommended_actions(Classification::Suspicious);
        assert!(suspicious.quarantined);
        assert!(!suspicious.admin_notified);

        let phishing = recommended_actions(Classification::Phishing);
        assert_eq!(phishing.actions.len(), 3);
        assert!(phishing.quarantined && phishing.admin_notified);
    }
}
