use super::{ExtractionContext, RelationshipExtractor};
use crate::patterns::CriticalityEvent;
use crate::types::{
    clamp_confidence, EventImpact, EventStatus, ExtractorId, Projection, RelationshipCandidate,
    RelationshipKind, RuleDocument, TemporalAnalysis, TimelineEntry,
};
use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeSet;

const CRITICALITY_THRESHOLD: f64 = 0.3;
const CURRENT_WEIGHT: f64 = 0.8;
const EMERGING_WEIGHT: f64 = 0.6;
const TIMELINE_BONUS: f64 = 0.2;
const MIN_CONFIDENCE: f64 = 0.4;

/// Measure how strongly a document is touched by active and upcoming events.
///
/// An event contributes `impact * matched / total` of its trigger patterns.
/// Active events (analysis date inside `[starts, ends)`) feed the current
/// score, events starting after the analysis date feed the emerging score,
/// and each score is clamped to 1 on its own.
pub fn analyze_temporal_criticality(
    document: &RuleDocument,
    events: &[CriticalityEvent],
    analysis_date: NaiveDate,
) -> TemporalAnalysis {
    let text = document.combined_text();
    let mut analysis = TemporalAnalysis {
        rule_id: document.id.clone(),
        current_criticality: 0.0,
        emerging_criticality: 0.0,
        affected_events: Vec::new(),
        timeline: Vec::new(),
        projections: Vec::new(),
    };

    for event in events {
        let matched = event.matched_patterns(&text);
        if matched == 0 {
            continue;
        }
        let impact = event.impact * matched as f64 / event.patterns.len() as f64;

        let status = if event.is_active(analysis_date) {
            analysis.current_criticality += impact;
            analysis.affected_events.push(EventImpact {
                event: event.name.clone(),
                impact,
                matched_patterns: matched,
                total_patterns: event.patterns.len(),
                description: event.description.clone(),
            });
            EventStatus::Active
        } else if event.is_upcoming(analysis_date) {
            analysis.emerging_criticality += impact;
            analysis.projections.push(Projection {
                expected_date: event.starts,
                event: event.name.clone(),
                projected_impact: impact,
                description: event.description.clone(),
            });
            EventStatus::Upcoming
        } else {
            EventStatus::Historical
        };

        analysis.timeline.push(TimelineEntry {
            date: event.starts,
            event: event.name.clone(),
            impact,
            status,
            description: event.description.clone(),
        });
    }

    analysis.current_criticality = analysis.current_criticality.min(1.0);
    analysis.emerging_criticality = analysis.emerging_criticality.min(1.0);
    analysis.timeline.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.event.cmp(&b.event)));
    analysis
}

/// Links non-seed documents to seeds caught up in the same legal-change events.
pub struct TemporalCriticalityExtractor;

impl Default for TemporalCriticalityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporalCriticalityExtractor {
    pub fn new() -> Self {
        Self
    }

    fn score(analysis: &TemporalAnalysis) -> (f64, Vec<String>) {
        let mut confidence = 0.0;
        let mut reasons = Vec::new();

        if analysis.current_criticality > CRITICALITY_THRESHOLD {
            confidence += analysis.current_criticality * CURRENT_WEIGHT;
            reasons.push(format!(
                "Current temporal criticality: {:.1}%",
                analysis.current_criticality * 100.0
            ));
            let events: Vec<&str> = analysis
                .affected_events
                .iter()
                .map(|e| e.event.as_str())
                .collect();
            reasons.push(format!("Affected by current events: {}", events.join(", ")));
        }
        if analysis.emerging_criticality > CRITICALITY_THRESHOLD {
            confidence += analysis.emerging_criticality * EMERGING_WEIGHT;
            reasons.push(format!(
                "Emerging temporal criticality: {:.1}%",
                analysis.emerging_criticality * 100.0
            ));
            let events: Vec<&str> = analysis.projections.iter().map(|p| p.event.as_str()).collect();
            reasons.push(format!("Future relevance: {}", events.join(", ")));
        }
        if analysis.timeline.len() > 1 {
            confidence += TIMELINE_BONUS;
            reasons.push(format!(
                "Criticality evolution across {} events",
                analysis.timeline.len()
            ));
        }
        (clamp_confidence(confidence), reasons)
    }
}

impl RelationshipExtractor for TemporalCriticalityExtractor {
    fn extract(
        &self,
        document: &RuleDocument,
        context: &ExtractionContext<'_>,
    ) -> Result<Vec<RelationshipCandidate>> {
        if context.corpus.is_seed(&document.id) {
            return Ok(Vec::new());
        }

        let analysis = analyze_temporal_criticality(
            document,
            context.patterns.events(),
            context.analysis_date,
        );
        let (confidence, reasons) = Self::score(&analysis);
        if confidence <= MIN_CONFIDENCE {
            return Ok(Vec::new());
        }

        let mut groups: Vec<(RelationshipKind, BTreeSet<String>)> = Vec::new();
        if analysis.current_criticality > CRITICALITY_THRESHOLD {
            let active = analysis.affected_events.iter().map(|e| e.event.clone()).collect();
            groups.push((RelationshipKind::EmergencyRelevance, active));
        }
        if analysis.emerging_criticality > CRITICALITY_THRESHOLD {
            let upcoming = analysis.projections.iter().map(|p| p.event.clone()).collect();
            groups.push((RelationshipKind::TemporalEmergence, upcoming));
        }

        let mut candidates = Vec::new();
        for (kind, events) in &groups {
            for seed in context.seeds_affected_by(events) {
                if seed.id == document.id {
                    continue;
                }
                candidates.push(
                    RelationshipCandidate::new(
                        &document.id,
                        &seed.id,
                        *kind,
                        confidence,
                        ExtractorId::TemporalCriticality,
                    )
                    .with_reasons(reasons.iter().cloned()),
                );
            }
        }
        Ok(candidates)
    }

    fn id(&self) -> ExtractorId {
        ExtractorId::TemporalCriticality
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::patterns::{PatternLibrary, PatternLibraryConfig};

    fn library() -> PatternLibrary {
        PatternLibrary::compile(&PatternLibraryConfig::default()).unwrap()
    }

    fn on(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn active_and_future_events_score_independently() {
        // In mid-2024: e-filing expansion is active, AI filing integration starts 2025
        let doc = RuleDocument::new("1010.6", "Electronic service")
            .with_text(concat!(
                "E-filing and electronic service of documents; automated filing of machine ",
                "readable structured data using artificial intelligence.",
            ));
        let analysis = analyze_temporal_criticality(&doc, library().events(), on(2024, 6, 1));

        assert!(analysis.current_criticality > 0.0);
        assert!(analysis.emerging_criticality > 0.0);
        assert!(analysis.current_criticality <= 1.0);
        assert!(analysis.emerging_criticality <= 1.0);
        assert!((analysis.emerging_criticality - 0.8).abs() < 1e-9);
        assert!(analysis.affected_events.iter().any(|e| e.event == "mandatory_e_filing_expansion"));
        assert_eq!(analysis.projections.len(), 1);
        assert!(analysis.timeline.iter().any(|t| t.status == EventStatus::Upcoming));
    }

    #[test]
    fn ended_event_is_historical() {
        let doc = RuleDocument::new("367", "Remote hearing")
            .with_text("remote hearing by video conference");
        let analysis = analyze_temporal_criticality(&doc, library().events(), on(2024, 6, 1));
        assert_eq!(analysis.current_criticality, 0.0);
        assert_eq!(analysis.timeline.len(), 1);
        assert_eq!(analysis.timeline[0].status, EventStatus::Historical);
    }

    #[test]
    fn links_to_seeds_sharing_an_event() {
        let docs = vec![
            RuleDocument::new("1010.5", "Electronic filing")
                .with_text(concat!(
                    "electronic filing, e-filing, electronic service, ",
                    "digital signature and online submission",
                )),
            RuleDocument::new("1010.6", "Electronic service").with_text("electronic service rules"),
            RuleDocument::new("12", "Computing time").with_text("days are computed"),
        ];
        let corpus = Corpus::new(docs, &["1010.6".to_string(), "12".to_string()]);
        let lib = library();
        let context = ExtractionContext::new(&corpus, &lib, on(2024, 6, 1));
        let source = corpus.get("1010.5").unwrap().clone();

        let candidates = TemporalCriticalityExtractor::new().extract(&source, &context).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].target_id, "1010.6");
        assert_eq!(candidates[0].kind, RelationshipKind::EmergencyRelevance);
        assert!(candidates[0].confidence > 0.4);
    }
}
