//! Data model for the analysis service's JSON contract.
//!
//! An `AnalysisResult` is produced once per submitted email by the external
//! service and is immutable from the client's perspective; classification and
//! report generation only derive new values from it. Per-layer scores follow
//! the risk convention (higher = more dangerous); the inverted 0-100 safety
//! scale exists only at the presentation boundary in the report module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AnalysisError;

/// One of the five independent analysis dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Auth,
    Content,
    Url,
    Behavior,
    Sentiment,
}

impl Layer {
    /// Fixed ordering used everywhere a report enumerates layers.
    pub const ALL: [Layer; 5] = [
        Layer::Auth,
        Layer::Content,
        Layer::Url,
        Layer::Behavior,
        Layer::Sentiment,
    ];

    /// Wire identifier used as the key in the `explanations` map.
    pub fn id(&self) -> &'static str {
        match self {
            Layer::Auth => "auth",
            Layer::Content => "content",
            Layer::Url => "url",
            Layer::Behavior => "behavior",
            Layer::Sentiment => "sentiment",
        }
    }

    /// Human-readable label used in report tables.
    pub fn label(&self) -> &'static str {
        match self {
            Layer::Auth => "Authentication",
            Layer::Content => "Content",
            Layer::Url => "URL / Link",
            Layer::Behavior => "Sender Behavior",
            Layer::Sentiment => "Sentiment & Tone",
        }
    }
}

/// Three-tier verdict derived from the aggregated safety score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Safe,
    Suspicious,
    Phishing,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Safe => "Safe",
            Classification::Suspicious => "Suspicious",
            Classification::Phishing => "Phishing",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five raw layer risk scores, each expected in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerScores {
    pub auth: f64,
    pub content: f64,
    pub url: f64,
    pub behavior: f64,
    pub sentiment: f64,
}

impl LayerScores {
    pub fn get(&self, layer: Layer) -> f64 {
        match layer {
            Layer::Auth => self.auth,
            Layer::Content => self.content,
            Layer::Url => self.url,
            Layer::Behavior => self.behavior,
            Layer::Sentiment => self.sentiment,
        }
    }

    /// Builds the score set from a layer-id keyed map.
    ///
    /// All five layers are required; an absent layer is a caller error, not
    /// a zero.
    pub fn from_map(scores: &HashMap<String, f64>) -> Result<Self, AnalysisError> {
        let lookup = |layer: Layer| {
            scores.get(layer.id()).copied().ok_or_else(|| {
                AnalysisError::InvalidInput(format!("missing score for layer '{}'", layer.id()))
            })
        };

        Ok(Self {
            auth: lookup(Layer::Auth)?,
            content: lookup(Layer::Content)?,
            url: lookup(Layer::Url)?,
            behavior: lookup(Layer::Behavior)?,
            sentiment: lookup(Layer::Sentiment)?,
        })
    }

    /// Rejects NaN, infinite, and out-of-range scores. Out-of-range values
    /// are never clamped here; clamping only happens on the derived safety
    /// scale to absorb float drift from valid inputs.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        for layer in Layer::ALL {
            let score = self.get(layer);
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(AnalysisError::InvalidInput(format!(
                    "score for layer '{}' must be in [0,1], got {}",
                    layer.id(),
                    score
                )));
            }
        }
        Ok(())
    }
}

/// Per-layer contribution surfaced in the explainability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerExplanation {
    pub score: f64,
    pub weight: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Complete analysis of one email, as returned by `POST /analyze` and
/// `GET /analyses`.
///
/// Evidence fields are opaque to the client: they are surfaced verbatim in
/// the report and never interpreted. All of them are optional on the wire;
/// the report renders a neutral placeholder when one is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub auth_score: f64,
    pub content_score: f64,
    pub url_score: f64,
    pub behavior_score: f64,
    pub sentiment_score: f64,

    pub final_score: f64,
    pub classification: Classification,

    #[serde(default)]
    pub explanations: HashMap<Layer, LayerExplanation>,

    // Authentication evidence
    #[serde(default)]
    pub spf_result: Option<String>,
    #[serde(default)]
    pub dkim_result: Option<String>,
    #[serde(default)]
    pub dmarc_result: Option<String>,

    // Content evidence
    #[serde(default)]
    pub urgency_detected: Option<bool>,
    #[serde(default)]
    pub credential_request: Option<bool>,
    #[serde(default)]
    pub brand_misuse: Option<bool>,

    // URL evidence
    #[serde(default)]
    pub urls_found: Vec<String>,
    #[serde(default)]
    pub suspicious_urls: Option<u32>,

    // Sender behavior evidence
    #[serde(default)]
    pub is_new_sender: Option<bool>,
    #[serde(default)]
    pub odd_timing: Option<bool>,

    // Sentiment evidence
    #[serde(default)]
    pub pressure_tone: Option<bool>,

    /// Analysis time, set by the service. Distinct from the report's render
    /// time; a report shows both.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl AnalysisResult {
    pub fn layer_scores(&self) -> LayerScores {
        LayerScores {
            auth: self.auth_score,
            content: self.content_score,
            url: self.url_score,
            behavior: self.behavior_score,
            sentiment: self.sentiment_score,
        }
    }

    pub fn layer_score(&self, layer: Layer) -> f64 {
        self.layer_scores().get(layer)
    }

    /// Looks up the explanation entry for a layer. Every layer's entry is
    /// mandatory for report generation.
    pub fn explanation(&self, layer: Layer) -> Result<&LayerExplanation, AnalysisError> {
        self.explanations.get(&layer).ok_or_else(|| {
            AnalysisError::MissingField(format!("explanations entry for layer '{}'", layer.id()))
        })
    }
}
