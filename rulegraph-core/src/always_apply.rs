// Hand-authored relationships that always apply when their endpoints exist.
//
// Each rule pairs every document matched by `source` with every document
// matched by `target`. They enter aggregation at full confidence and are
// never removed by the confidence floor.

use crate::corpus::Corpus;
use crate::types::{ExtractorId, RelationshipCandidate, RelationshipKind, RuleDocument};
use serde::{Deserialize, Serialize};

pub const ALWAYS_APPLY_CONFIDENCE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum NodeSelector {
    /// Exact category label
    Category(String),
    CategoryContains(String),
    Id(String),
    IdContains(String),
    TitleContains(String),
    RequirementContains(String),
    DeadlineContains(String),
    AnyOf(Vec<NodeSelector>),
}

impl NodeSelector {
    pub fn matches(&self, document: &RuleDocument) -> bool {
        match self {
            NodeSelector::Category(category) => {
                document.category.as_deref() == Some(category.as_str())
            }
            NodeSelector::CategoryContains(fragment) => document
                .category
                .as_deref()
                .map_or(false, |category| contains_ignore_case(category, fragment)),
            NodeSelector::Id(id) => document.id == *id,
            NodeSelector::IdContains(fragment) => document.id.contains(fragment.as_str()),
            NodeSelector::TitleContains(fragment) => {
                contains_ignore_case(&document.title, fragment)
            }
            NodeSelector::RequirementContains(fragment) => document
                .extracted_fields
                .procedural_requirements
                .iter()
                .any(|req| contains_ignore_case(req, fragment)),
            NodeSelector::DeadlineContains(fragment) => document
                .extracted_fields
                .deadlines
                .iter()
                .any(|deadline| contains_ignore_case(deadline, fragment)),
            NodeSelector::AnyOf(selectors) => selectors.iter().any(|s| s.matches(document)),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlwaysApplyRule {
    pub name: String,
    pub source: NodeSelector,
    pub target: NodeSelector,
    pub kind: RelationshipKind,
    pub description: String,
}

impl AlwaysApplyRule {
    /// Candidates for every matched (source, target) pair, self pairs excluded
    pub fn expand(&self, corpus: &Corpus) -> Vec<RelationshipCandidate> {
        let sources: Vec<&RuleDocument> = corpus
            .documents()
            .iter()
            .filter(|d| self.source.matches(d))
            .collect();
        if sources.is_empty() {
            return Vec::new();
        }
        let targets: Vec<&RuleDocument> = corpus
            .documents()
            .iter()
            .filter(|d| self.target.matches(d))
            .collect();

        let mut candidates = Vec::with_capacity(sources.len() * targets.len());
        for source in &sources {
            for target in &targets {
                if source.id == target.id {
                    continue;
                }
                candidates.push(
                    RelationshipCandidate::new(
                        &source.id,
                        &target.id,
                        self.kind,
                        ALWAYS_APPLY_CONFIDENCE,
                        ExtractorId::AlwaysApply,
                    )
                    .with_reason(&self.description)
                    .with_reason(format!("Hand-authored rule: {}", self.name)),
                );
            }
        }
        candidates
    }
}

pub fn expand_rules(rules: &[AlwaysApplyRule], corpus: &Corpus) -> Vec<RelationshipCandidate> {
    rules.iter().flat_map(|rule| rule.expand(corpus)).collect()
}

// ===== DEFAULT RULES =====

const DEMURRER: &str = "Demurrer (Motion to Dismiss)";
const MOTION_TO_STRIKE: &str = "Motion to Strike";
const SUMMARY_JUDGMENT: &str = "Summary Judgment Motion";
const SUMMARY_JUDGMENT_SECTION: &str = "437c";

fn category(label: &str) -> NodeSelector {
    NodeSelector::Category(label.to_string())
}

fn id(value: &str) -> NodeSelector {
    NodeSelector::Id(value.to_string())
}

fn title(fragment: &str) -> NodeSelector {
    NodeSelector::TitleContains(fragment.to_string())
}

fn requirement(fragment: &str) -> NodeSelector {
    NodeSelector::RequirementContains(fragment.to_string())
}

fn deadline(fragment: &str) -> NodeSelector {
    NodeSelector::DeadlineContains(fragment.to_string())
}

fn rule(
    name: &str,
    source: NodeSelector,
    target: NodeSelector,
    kind: RelationshipKind,
    description: &str,
) -> AlwaysApplyRule {
    AlwaysApplyRule {
        name: name.to_string(),
        source,
        target,
        kind,
        description: description.to_string(),
    }
}

fn meet_and_confer_sources() -> NodeSelector {
    NodeSelector::AnyOf(vec![
        requirement("meet and confer"),
        requirement("good faith"),
        title("meet and confer"),
    ])
}

pub fn default_always_apply_rules() -> Vec<AlwaysApplyRule> {
    use RelationshipKind::*;

    vec![
        rule(
            "demurrer_or_strike",
            category(DEMURRER),
            category(MOTION_TO_STRIKE),
            AlternativeMotion,
            "Alternative pleading challenges",
        ),
        rule(
            "demurrer_then_amendment",
            category(DEMURRER),
            category("Pleading Amendments"),
            MotionSequence,
            "Demurrer sustained, leave to amend",
        ),
        rule(
            "amendment_then_answer",
            category("Pleading Amendments"),
            category("Answer Requirements"),
            MotionSequence,
            "Amended complaint requires answer",
        ),
        rule(
            "discovery_before_summary_judgment",
            NodeSelector::AnyOf(vec![
                NodeSelector::CategoryContains("Discovery".to_string()),
                category("Depositions"),
                category("Interrogatories"),
                category("Document Production"),
            ]),
            category(SUMMARY_JUDGMENT),
            TimingRelationship,
            "Discovery must be completed before summary judgment",
        ),
        rule(
            "service_timing_for_summary_judgment",
            NodeSelector::AnyOf(vec![id("1010"), id("1013"), id("1011"), id("1012")]),
            id(SUMMARY_JUDGMENT_SECTION),
            TimingRequirement,
            "Service timing requirements for summary judgment motions",
        ),
        rule(
            "motion_foundation_for_summary_judgment",
            NodeSelector::AnyOf(vec![id("1005"), id("1003")]),
            id(SUMMARY_JUDGMENT_SECTION),
            ProceduralFoundation,
            "General motion procedures apply to summary judgment",
        ),
        rule(
            "evidence_for_summary_judgment",
            NodeSelector::AnyOf(vec![
                NodeSelector::IdContains("2016".to_string()),
                title("evidence"),
                title("declaration"),
                title("affidavit"),
            ]),
            id(SUMMARY_JUDGMENT_SECTION),
            EvidenceRequirement,
            "Evidence requirements for summary judgment",
        ),
        rule(
            "separate_statement",
            NodeSelector::AnyOf(vec![
                title("separate statement"),
                requirement("separate statement"),
            ]),
            id(SUMMARY_JUDGMENT_SECTION),
            MandatoryDocument,
            "Separate statement of undisputed facts is mandatory",
        ),
        rule(
            "opposition_and_reply_timing",
            NodeSelector::AnyOf(vec![
                deadline("20 days"),
                deadline("opposition"),
                requirement("opposition"),
                requirement("reply"),
            ]),
            id(SUMMARY_JUDGMENT_SECTION),
            TimingRequirement,
            "Opposition and reply deadlines for summary judgment",
        ),
        rule(
            "summary_judgment_trial_scheduling",
            id(SUMMARY_JUDGMENT_SECTION),
            NodeSelector::AnyOf(vec![title("trial"), deadline("trial"), deadline("30 days")]),
            SchedulingCoordination,
            "Summary judgment hearing must be heard before trial",
        ),
        rule(
            "summary_adjudication",
            id(SUMMARY_JUDGMENT_SECTION),
            id("437"),
            RelatedProcedure,
            "Summary adjudication of issues is a related procedure",
        ),
        rule(
            "judicial_notice",
            NodeSelector::AnyOf(vec![title("judicial notice"), requirement("judicial notice")]),
            id(SUMMARY_JUDGMENT_SECTION),
            OptionalDocument,
            "Request for judicial notice may support the motion",
        ),
        rule(
            "summary_judgment_format",
            NodeSelector::AnyOf(vec![title("format"), title("page")]),
            id(SUMMARY_JUDGMENT_SECTION),
            FormatRequirement,
            "Formatting and page limits for summary judgment papers",
        ),
        rule(
            "meet_and_confer_before_demurrer",
            meet_and_confer_sources(),
            category(DEMURRER),
            MeetAndConfer,
            "Meet and confer required before filing a demurrer",
        ),
        rule(
            "meet_and_confer_before_strike",
            meet_and_confer_sources(),
            category(MOTION_TO_STRIKE),
            MeetAndConfer,
            "Meet and confer required before a motion to strike",
        ),
        rule(
            "service_for_motion_practice",
            category("Service & Notice"),
            category("Motion Practice"),
            DocumentRequirement,
            "Motions must be served with proper notice",
        ),
        rule(
            "service_for_pleading_motions",
            category("Service & Notice"),
            NodeSelector::AnyOf(vec![
                category(DEMURRER),
                category(MOTION_TO_STRIKE),
                category(SUMMARY_JUDGMENT),
            ]),
            DocumentRequirement,
            "Motions must be served with proper notice",
        ),
        rule(
            "complaint_then_demurrer",
            category("Complaint Requirements"),
            category(DEMURRER),
            MotionSequence,
            "Complaint may be challenged by demurrer",
        ),
        rule(
            "complaint_then_strike",
            category("Complaint Requirements"),
            category(MOTION_TO_STRIKE),
            MotionSequence,
            "Complaint may be challenged by motion to strike",
        ),
        rule(
            "complaint_then_answer",
            category("Complaint Requirements"),
            category("Answer Requirements"),
            MotionSequence,
            "Complaint requires an answer",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str, category: &str) -> RuleDocument {
        RuleDocument::new(id, title).with_category(category)
    }

    #[test]
    fn selectors_match_case_insensitively() {
        let document = RuleDocument::new("1005", "Notice of Motion")
            .with_procedural_requirements(["Parties shall Meet and Confer in good faith"])
            .with_deadlines(["16 court days before hearing"])
            .with_category("Service & Notice");

        assert!(NodeSelector::TitleContains("notice of motion".into()).matches(&document));
        assert!(NodeSelector::RequirementContains("meet and confer".into()).matches(&document));
        assert!(NodeSelector::DeadlineContains("COURT DAYS".into()).matches(&document));
        assert!(NodeSelector::Category("Service & Notice".into()).matches(&document));
        assert!(!NodeSelector::Category("service & notice".into()).matches(&document));
        assert!(NodeSelector::CategoryContains("notice".into()).matches(&document));
        assert!(!NodeSelector::Id("1005a".into()).matches(&document));
    }

    #[test]
    fn rule_expands_to_cross_product_without_self_pairs() {
        let corpus = Corpus::new(
            vec![
                doc("430.10", "Grounds", DEMURRER),
                doc("430.30", "When objections", DEMURRER),
                doc("435", "Notice of motion to strike", MOTION_TO_STRIKE),
            ],
            &[],
        );
        let rule = rule(
            "test",
            category(DEMURRER),
            NodeSelector::AnyOf(vec![category(DEMURRER), category(MOTION_TO_STRIKE)]),
            RelationshipKind::AlternativeMotion,
            "Alternative",
        );
        let candidates = rule.expand(&corpus);
        // 2 sources x 3 targets minus 2 self pairs
        assert_eq!(candidates.len(), 4);
        assert!(candidates.iter().all(|c| c.source_id != c.target_id));
        assert!(candidates
            .iter()
            .all(|c| c.confidence == 1.0 && c.extractor == ExtractorId::AlwaysApply));
        assert_eq!(candidates[0].reasons[0], "Alternative");
    }

    #[test]
    fn default_rules_target_summary_judgment_bundle() {
        let corpus = Corpus::new(
            vec![
                doc("437c", "Summary judgment", SUMMARY_JUDGMENT),
                doc("1005", "Motion deadlines", "Service & Notice"),
                doc("1010", "Notices", "Service & Notice"),
            ],
            &[],
        );
        let candidates = expand_rules(&default_always_apply_rules(), &corpus);
        assert!(candidates.iter().any(|c| c.source_id == "1005"
            && c.target_id == "437c"
            && c.kind == RelationshipKind::ProceduralFoundation));
        assert!(candidates.iter().any(|c| c.source_id == "1010"
            && c.target_id == "437c"
            && c.kind == RelationshipKind::TimingRequirement));
        assert!(candidates.iter().any(|c| c.kind == RelationshipKind::DocumentRequirement));
    }

    #[test]
    fn selector_yaml_shape() {
        let yaml = concat!(
            "by: any_of\nvalue:\n",
            "  - by: id\n    value: \"1005\"\n",
            "  - by: title_contains\n    value: evidence\n",
        );
        let selector: NodeSelector = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(selector, NodeSelector::AnyOf(vec![id("1005"), title("evidence")]));
    }
}
