//! Retrieval quality metrics.
//!
//! Turns the score distribution of a ranking into a single confidence
//! number and a coarse label, so callers can gate downstream behavior
//! (answer synthesis, user-facing warnings) on retrieval quality without
//! interpreting raw scores themselves.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse quality band derived from [`QualityReport::confidence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLabel {
    /// Confidence >= 0.8
    Excellent,
    /// Confidence >= 0.6
    Good,
    /// Confidence >= 0.4
    Fair,
    /// Confidence < 0.4
    Poor,
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QualityLabel::Excellent => "excellent",
            QualityLabel::Good => "good",
            QualityLabel::Fair => "fair",
            QualityLabel::Poor => "poor",
        };
        f.write_str(s)
    }
}

/// Quality assessment of a ranking's score distribution.
///
/// Computed over the scores of the full ranking before truncation to
/// `top_k`, so the variance reflects the whole candidate field rather
/// than an artificially uniform head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Highest score in the ranking
    pub top_score: f64,
    /// Mean score across the ranking
    pub avg_score: f64,
    /// Population variance of the scores
    pub score_variance: f64,
    /// Confidence in [0, 1], higher = better
    pub confidence: f64,
    /// Coarse band for the confidence value
    pub label: QualityLabel,
    /// Present for fair/poor results; suitable for surfacing to users
    pub warning: Option<String>,
}

impl QualityReport {
    /// Assesses a score distribution.
    ///
    /// Confidence is `(1 - exp(-max(top_score, 0))) / (1 + sqrt(variance))`,
    /// clamped to [0, 1]: a saturating transform of the best score,
    /// discounted when the field is spread out (high variance suggests the
    /// ranking mixes strong and weak matches). Deterministic and
    /// monotonically increasing in `top_score` for a fixed variance.
    ///
    /// An empty distribution yields a zero-confidence poor report.
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self {
                top_score: 0.0,
                avg_score: 0.0,
                score_variance: 0.0,
                confidence: 0.0,
                label: QualityLabel::Poor,
                warning: Some("no results matched the query".to_string()),
            };
        }

        let top_score = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let avg_score = scores.iter().sum::<f64>() / scores.len() as f64;
        let score_variance = scores
            .iter()
            .map(|s| (s - avg_score).powi(2))
            .sum::<f64>()
            / scores.len() as f64;

        let confidence = ((1.0 - (-top_score.max(0.0)).exp())
            / (1.0 + score_variance.sqrt()))
        .clamp(0.0, 1.0);

        let label = if confidence >= 0.8 {
            QualityLabel::Excellent
        } else if confidence >= 0.6 {
            QualityLabel::Good
        } else if confidence >= 0.4 {
            QualityLabel::Fair
        } else {
            QualityLabel::Poor
        };

        let warning = match label {
            QualityLabel::Fair => {
                Some("retrieval confidence is fair; results may be incomplete".to_string())
            }
            QualityLabel::Poor => {
                Some("retrieval confidence is poor; results may be unreliable".to_string())
            }
            _ => None,
        };

        Self {
            top_score,
            avg_score,
            score_variance,
            confidence,
            label,
            warning,
        }
    }
}
