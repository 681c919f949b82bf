//! Confidence categorisation and match summaries.

use std::collections::BTreeMap;

use mig_model::{EntityId, EntityMapping};
use serde::Serialize;

/// Confidence level categories for mapping quality assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    /// At or above the low threshold, below medium. Needs verification.
    Low,
    /// At or above medium, below high. Should be reviewed.
    Medium,
    /// At or above the high threshold.
    High,
}

impl ConfidenceLevel {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::High => "high confidence - likely correct",
            Self::Medium => "medium confidence - should review",
            Self::Low => "low confidence - needs verification",
        }
    }
}

/// Boundaries between confidence levels.
///
/// Scores below `low` are not categorised. Rule-fixed confidences land in
/// `High` (exact, synonym) or `Medium` (pattern, custom) with the defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.9,
            medium: 0.6,
            low: 0.3,
        }
    }
}

impl ConfidenceThresholds {
    #[must_use]
    pub fn categorize(&self, confidence: f64) -> Option<ConfidenceLevel> {
        if confidence >= self.high {
            Some(ConfidenceLevel::High)
        } else if confidence >= self.medium {
            Some(ConfidenceLevel::Medium)
        } else if confidence >= self.low {
            Some(ConfidenceLevel::Low)
        } else {
            None
        }
    }

    /// Count scores per level; uncategorised scores are skipped.
    #[must_use]
    pub fn count_by_level(
        &self,
        scores: impl IntoIterator<Item = f64>,
    ) -> BTreeMap<ConfidenceLevel, usize> {
        let mut counts = BTreeMap::new();
        for score in scores {
            if let Some(level) = self.categorize(score) {
                *counts.entry(level).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// A source entity that found no counterpart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmappedEntity {
    pub id: EntityId,
    pub name: String,
    /// Best score seen, if there was any target to compare against.
    pub best_score: Option<f64>,
}

/// Outcome of entity matching: the mappings plus everything left behind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchReport {
    pub mappings: Vec<EntityMapping>,
    pub unmapped: Vec<UnmappedEntity>,
}

/// Summary statistics over a set of confidence scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl ConfidenceStats {
    pub fn from_scores(scores: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for score in scores {
            count += 1;
            sum += score;
            min = min.min(score);
            max = max.max(score);
        }
        (count > 0).then(|| Self {
            count,
            mean: sum / count as f64,
            min,
            max,
        })
    }
}

impl MatchReport {
    pub fn stats(&self) -> Option<ConfidenceStats> {
        ConfidenceStats::from_scores(self.mappings.iter().map(|m| m.confidence))
    }

    pub fn count_by_level(&self) -> BTreeMap<ConfidenceLevel, usize> {
        ConfidenceThresholds::default().count_by_level(self.mappings.iter().map(|m| m.confidence))
    }

    /// Share of source entities that received a mapping.
    pub fn coverage(&self) -> f64 {
        let total = self.mappings.len() + self.unmapped.len();
        if total == 0 {
            return 0.0;
        }
        self.mappings.len() as f64 / total as f64
    }
}
