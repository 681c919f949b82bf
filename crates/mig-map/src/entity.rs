//! Entity-level correspondence discovery.

use mig_model::{Entity, EntityMapping, EntityMappingId};
use tracing::{debug, info, info_span};

use crate::confidence::{MatchReport, UnmappedEntity};
use crate::similarity::{TextSimilarity, TfIdfSimilarity};
use crate::utils::entity_descriptor;

/// Minimum similarity a best candidate must strictly exceed to be accepted.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.3;

/// Pairs each source entity with its most similar target entity.
///
/// Many-to-one is allowed: two sources may map to the same target.
#[derive(Debug, Clone)]
pub struct EntityMatcher<S = TfIdfSimilarity> {
    similarity: S,
    threshold: f64,
    first_id: u64,
}

impl Default for EntityMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityMatcher {
    pub fn new() -> Self {
        Self::with_similarity(TfIdfSimilarity)
    }
}

impl<S: TextSimilarity> EntityMatcher<S> {
    pub fn with_similarity(similarity: S) -> Self {
        Self {
            similarity,
            threshold: DEFAULT_MATCH_THRESHOLD,
            first_id: 1,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// First id handed out to produced mappings; later ones follow sequentially.
    #[must_use]
    pub fn starting_at(mut self, first_id: u64) -> Self {
        self.first_id = first_id;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Mappings in source order; unmatched sources are simply absent.
    pub fn match_entities(&self, sources: &[Entity], targets: &[Entity]) -> Vec<EntityMapping> {
        self.report(sources, targets).mappings
    }

    /// Like [`Self::match_entities`], also listing the sources left unmapped.
    pub fn report(&self, sources: &[Entity], targets: &[Entity]) -> MatchReport {
        let _span = info_span!(
            "match_entities",
            sources = sources.len(),
            targets = targets.len()
        )
        .entered();

        let source_text: Vec<String> = sources.iter().map(entity_descriptor).collect();
        let target_text: Vec<String> = targets.iter().map(entity_descriptor).collect();
        let matrix = self.similarity.similarity_matrix(&source_text, &target_text);

        let mut report = MatchReport::default();
        let mut next_id = self.first_id;
        for (row, source) in sources.iter().enumerate() {
            let best = matrix.best_in_row(row);
            match best {
                Some((col, score)) if score > self.threshold => {
                    let target = &targets[col];
                    debug!(
                        source = %source.name,
                        target = %target.name,
                        confidence = score,
                        "entity matched"
                    );
                    report.mappings.push(EntityMapping {
                        id: EntityMappingId::new(next_id),
                        source_entity_id: source.id,
                        source_entity: source.name.clone(),
                        target_entity_id: target.id,
                        target_entity: target.name.clone(),
                        confidence: score,
                        field_mappings: Vec::new(),
                        validation_rules: Vec::new(),
                    });
                    next_id += 1;
                }
                _ => {
                    debug!(
                        source = %source.name,
                        best_score = best.map(|(_, score)| score),
                        threshold = self.threshold,
                        "entity left unmapped"
                    );
                    report.unmapped.push(UnmappedEntity {
                        id: source.id,
                        name: source.name.clone(),
                        best_score: best.map(|(_, score)| score),
                    });
                }
            }
        }

        info!(
            mapped = report.mappings.len(),
            unmapped = report.unmapped.len(),
            "entity matching finished"
        );
        report
    }
}
