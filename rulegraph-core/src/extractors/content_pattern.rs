use super::{ExtractionContext, RelationshipExtractor};
use crate::patterns::PatternLibrary;
use crate::types::{
    clamp_confidence, ExtractorId, FilingQuestion, RelationshipCandidate, RelationshipKind,
    RuleDocument,
};
use anyhow::Result;

const TITLE_MATCH_SCORE: f64 = 0.1;
const BODY_MATCH_SCORE: f64 = 0.02;
const BODY_SCORE_CAP: f64 = 0.3;
const QUESTION_THRESHOLD: f64 = 0.1;
const EXTRA_QUESTION_BONUS: f64 = 0.2;
const MIN_FILING_TERMS: usize = 3;
const FILING_TERM_BONUS: f64 = 0.1;
const MIN_CONFIDENCE: f64 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct ContentScore {
    pub confidence: f64,
    /// Questions whose score cleared the threshold, in library order
    pub questions: Vec<(FilingQuestion, f64)>,
    pub filing_terms: usize,
    pub reasons: Vec<String>,
}

/// Score how strongly a document answers each filing question
pub fn score_document(document: &RuleDocument, patterns: &PatternLibrary) -> ContentScore {
    let mut questions = Vec::new();
    let mut reasons = Vec::new();
    let mut confidence = 0.0;

    for (question, regexes) in patterns.question_patterns() {
        let score: f64 = regexes
            .iter()
            .map(|regex| {
                let title_matches = regex.find_iter(&document.title).count() as f64;
                let body_matches = regex.find_iter(&document.raw_text).count() as f64;
                title_matches * TITLE_MATCH_SCORE
                    + (body_matches * BODY_MATCH_SCORE).min(BODY_SCORE_CAP)
            })
            .sum();

        if score > QUESTION_THRESHOLD {
            confidence += score;
            reasons.push(format!("Answers {} question (score {:.2})", question, score));
            questions.push((*question, score));
        }
    }

    if questions.len() > 1 {
        confidence += EXTRA_QUESTION_BONUS * (questions.len() - 1) as f64;
        reasons.push(format!("Answers {} filing questions", questions.len()));
    }

    let filing_terms = patterns.filing_term_count(&document.combined_text());
    if filing_terms >= MIN_FILING_TERMS {
        confidence += FILING_TERM_BONUS * (filing_terms as f64 / 5.0).min(1.0);
        reasons.push(format!("Contains {} filing terms", filing_terms));
    }

    ContentScore {
        confidence: clamp_confidence(confidence),
        questions,
        filing_terms,
        reasons,
    }
}

/// Links non-seed documents to seeds that answer the same filing question.
pub struct ContentPatternExtractor;

impl Default for ContentPatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentPatternExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl RelationshipExtractor for ContentPatternExtractor {
    fn extract(
        &self,
        document: &RuleDocument,
        context: &ExtractionContext<'_>,
    ) -> Result<Vec<RelationshipCandidate>> {
        if context.corpus.is_seed(&document.id) {
            return Ok(Vec::new());
        }

        let score = score_document(document, context.patterns);
        if score.confidence <= MIN_CONFIDENCE {
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        for (question, _) in &score.questions {
            for seed in context.seeds_answering(*question) {
                if seed.id == document.id {
                    continue;
                }
                candidates.push(
                    RelationshipCandidate::new(
                        &document.id,
                        &seed.id,
                        RelationshipKind::FilingQuestion(*question),
                        score.confidence,
                        ExtractorId::ContentPattern,
                    )
                    .with_reasons(score.reasons.iter().cloned())
                    .with_reason(format!("Critical section {} also answers {}", seed.id, question)),
                );
            }
        }
        Ok(candidates)
    }

    fn id(&self) -> ExtractorId {
        ExtractorId::ContentPattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::patterns::PatternLibraryConfig;
    use chrono::NaiveDate;

    fn library() -> PatternLibrary {
        PatternLibrary::compile(&PatternLibraryConfig::default()).unwrap()
    }

    #[test]
    fn plain_text_scores_nothing() {
        let doc = RuleDocument::new("x", "Miscellaneous").with_text("Nothing of note here.");
        let score = score_document(&doc, &library());
        assert!(score.questions.is_empty());
        assert_eq!(score.confidence, 0.0);
    }

    #[test]
    fn single_match_does_not_clear_threshold() {
        let lib = library();
        let titled = score_document(&RuleDocument::new("x", "Venue"), &lib);
        let bodied = score_document(&RuleDocument::new("x", "Untitled").with_text("venue"), &lib);
        // one title match scores exactly the threshold, which is not enough
        assert!(titled.questions.iter().all(|(q, _)| *q != FilingQuestion::Where));
        assert!(bodied.questions.is_empty());
    }

    #[test]
    fn multiple_questions_earn_bonus_and_clamp() {
        let doc = RuleDocument::new("1011", "Notice of motion deadline procedure format venue")
            .with_text(concat!(
                "Within 10 court days the filing deadline, service procedure and hearing notice ",
                "shall contain a memorandum. The court, the motion, the document, the pleading.",
            ));
        let score = score_document(&doc, &library());
        assert!(score.questions.len() >= 3);
        assert!(score.filing_terms >= 3);
        assert_eq!(score.confidence, 1.0);
    }

    #[test]
    fn links_to_seeds_answering_same_question() {
        let docs = vec![
            RuleDocument::new("1011", "Notice of motion deadline procedure")
                .with_text("Within 10 court days the filing deadline and service procedure apply."),
            RuleDocument::new("1005", "Deadline for notice of motion")
                .with_text("within 16 court days"),
            RuleDocument::new("2000", "Unrelated").with_text("nothing"),
        ];
        let corpus = Corpus::new(docs, &["1005".to_string(), "2000".to_string()]);
        let lib = library();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let context = ExtractionContext::new(&corpus, &lib, date);
        let source = corpus.get("1011").unwrap().clone();
        let candidates = ContentPatternExtractor::new().extract(&source, &context).unwrap();

        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.target_id == "1005"));
        assert!(candidates
            .iter()
            .any(|c| c.kind == RelationshipKind::FilingQuestion(FilingQuestion::When)));

        let seed = corpus.get("1005").unwrap().clone();
        assert!(ContentPatternExtractor::new().extract(&seed, &context).unwrap().is_empty());
    }
}
