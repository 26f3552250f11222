// Relationship extractors
// Each extractor looks at one document at a time against a shared, read-only
// context and proposes candidates. The engine owns ordering, isolation of
// failures and the optional parallel fan-out:
// - engine.rs: ExtractionEngine, name dispatch, warnings, timings
// - direct_reference.rs: explicit cross references and citations
// - content_pattern.rs: filing-question pattern scoring
// - sequence.rs: procedural sequence templates
// - network.rs: reference-network propagation from seeds
// - temporal.rs: criticality-event timing

pub mod content_pattern;
pub mod direct_reference;
pub mod engine;
pub mod network;
pub mod sequence;
pub mod temporal;

pub use content_pattern::ContentPatternExtractor;
pub use direct_reference::DirectReferenceExtractor;
pub use engine::*;
pub use network::NetworkPropagationExtractor;
pub use sequence::SequenceExtractor;
pub use temporal::{analyze_temporal_criticality, TemporalCriticalityExtractor};

use crate::corpus::Corpus;
use crate::patterns::PatternLibrary;
use crate::types::{ExtractorId, FilingQuestion, RelationshipCandidate, RuleDocument, RuleId};
use anyhow::Result;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

pub trait RelationshipExtractor: Send + Sync {
    fn extract(
        &self,
        document: &RuleDocument,
        context: &ExtractionContext<'_>,
    ) -> Result<Vec<RelationshipCandidate>>;
    fn id(&self) -> ExtractorId;
    fn name(&self) -> &str {
        self.id().name()
    }
}

/// Everything an extractor may read. Built once per run, shared by all workers.
pub struct ExtractionContext<'a> {
    pub corpus: &'a Corpus,
    pub patterns: &'a PatternLibrary,
    pub analysis_date: NaiveDate,
    seed_questions: HashMap<RuleId, Vec<FilingQuestion>>,
    seed_events: HashMap<RuleId, BTreeSet<String>>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(corpus: &'a Corpus, patterns: &'a PatternLibrary, analysis_date: NaiveDate) -> Self {
        let mut seed_questions = HashMap::new();
        let mut seed_events = HashMap::new();
        for seed in corpus.seed_documents() {
            seed_questions.insert(seed.id.clone(), patterns.filing_questions_answered(seed));
            let text = seed.combined_text();
            let events: BTreeSet<String> = patterns
                .events()
                .iter()
                .filter(|event| event.matched_patterns(&text) > 0)
                .map(|event| event.name.clone())
                .collect();
            seed_events.insert(seed.id.clone(), events);
        }
        Self {
            corpus,
            patterns,
            analysis_date,
            seed_questions,
            seed_events,
        }
    }

    /// Present seed documents that answer `question`, in snapshot order
    pub fn seeds_answering(&self, question: FilingQuestion) -> Vec<&'a RuleDocument> {
        self.corpus
            .seed_documents()
            .filter(|seed| {
                self.seed_questions
                    .get(&seed.id)
                    .map_or(false, |questions| questions.contains(&question))
            })
            .collect()
    }

    /// Present seed documents whose text triggers any of `events`
    pub fn seeds_affected_by(&self, events: &BTreeSet<String>) -> Vec<&'a RuleDocument> {
        self.corpus
            .seed_documents()
            .filter(|seed| {
                self.seed_events
                    .get(&seed.id)
                    .map_or(false, |affected| !affected.is_disjoint(events))
            })
            .collect()
    }
}

/// First `max_chars` characters of `text`, with an ellipsis when cut
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
