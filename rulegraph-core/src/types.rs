use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub type RuleId = String;

/// Clamp a confidence into [0, 1]. NaN collapses to 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ===== DOCUMENT TYPES =====
// Documents arrive already extracted; the engine never mutates them except
// for the category written once by the classifier.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// Ordered ids this rule cites explicitly
    #[serde(default, alias = "crossReferences")]
    pub cross_references: Vec<String>,
    #[serde(default)]
    pub deadlines: Vec<String>,
    #[serde(default, alias = "proceduralRequirements")]
    pub procedural_requirements: Vec<String>,
    #[serde(default, alias = "keyProvisions")]
    pub key_provisions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    pub id: RuleId,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "rawText")]
    pub raw_text: String,
    #[serde(default, alias = "extractedFields")]
    pub extracted_fields: ExtractedFields,
    /// Written by the classifier unless the snapshot already carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl RuleDocument {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            raw_text: String::new(),
            extracted_fields: ExtractedFields::default(),
            category: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.raw_text = text.into();
        self
    }

    pub fn with_cross_references<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extracted_fields.cross_references = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_deadlines<I, S>(mut self, spans: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extracted_fields.deadlines = spans.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_procedural_requirements<I, S>(mut self, spans: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extracted_fields.procedural_requirements = spans.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_key_provisions<I, S>(mut self, spans: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extracted_fields.key_provisions = spans.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Title and body joined, the text temporal triggers run against
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.raw_text)
    }

    pub fn word_count(&self) -> usize {
        self.raw_text.split_whitespace().count()
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }
}

pub const DEFAULT_CATEGORY: &str = "General Procedures";

// ===== RELATIONSHIP KINDS =====

/// The six practitioner questions a procedural rule can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilingQuestion {
    When,
    How,
    Where,
    What,
    Who,
    Format,
}

impl FilingQuestion {
    pub const ALL: [FilingQuestion; 6] = [
        FilingQuestion::When,
        FilingQuestion::How,
        FilingQuestion::Where,
        FilingQuestion::What,
        FilingQuestion::Who,
        FilingQuestion::Format,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilingQuestion::When => "WHEN",
            FilingQuestion::How => "HOW",
            FilingQuestion::Where => "WHERE",
            FilingQuestion::What => "WHAT",
            FilingQuestion::Who => "WHO",
            FilingQuestion::Format => "FORMAT",
        }
    }
}

impl fmt::Display for FilingQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of relationship kinds. Weight and label are fixed per kind and
/// never supplied from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Reference,
    ProceduralDependency,
    TimingRelationship,
    MotionSequence,
    DocumentRequirement,
    AlternativeMotion,
    MeetAndConfer,
    CategorySimilarity,
    TimingRequirement,
    ProceduralFoundation,
    EvidenceRequirement,
    MandatoryDocument,
    SchedulingCoordination,
    RelatedProcedure,
    OptionalDocument,
    FormatRequirement,
    FilingQuestion(FilingQuestion),
    NetworkCentrality,
    TemporalEmergence,
    EmergencyRelevance,
}

impl RelationshipKind {
    pub fn weight(&self) -> u32 {
        match self {
            RelationshipKind::Reference => 3,
            RelationshipKind::ProceduralDependency => 5,
            RelationshipKind::TimingRelationship => 4,
            RelationshipKind::MotionSequence => 6,
            RelationshipKind::DocumentRequirement => 5,
            RelationshipKind::AlternativeMotion => 3,
            RelationshipKind::MeetAndConfer => 4,
            RelationshipKind::CategorySimilarity => 2,
            RelationshipKind::TimingRequirement => 6,
            RelationshipKind::ProceduralFoundation => 7,
            RelationshipKind::EvidenceRequirement => 6,
            RelationshipKind::MandatoryDocument => 8,
            RelationshipKind::SchedulingCoordination => 6,
            RelationshipKind::RelatedProcedure => 7,
            RelationshipKind::OptionalDocument => 4,
            RelationshipKind::FormatRequirement => 4,
            RelationshipKind::FilingQuestion(_) => 1,
            RelationshipKind::NetworkCentrality => 1,
            RelationshipKind::TemporalEmergence => 1,
            RelationshipKind::EmergencyRelevance => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelationshipKind::Reference => "References",
            RelationshipKind::ProceduralDependency => "Depends On",
            RelationshipKind::TimingRelationship => "Timing Related",
            RelationshipKind::MotionSequence => "Sequence",
            RelationshipKind::DocumentRequirement => "Requires Document",
            RelationshipKind::AlternativeMotion => "Alternative To",
            RelationshipKind::MeetAndConfer => "Meet & Confer",
            RelationshipKind::CategorySimilarity => "Similar Category",
            RelationshipKind::TimingRequirement => "Timing Requirement",
            RelationshipKind::ProceduralFoundation => "Procedural Foundation",
            RelationshipKind::EvidenceRequirement => "Evidence Requirement",
            RelationshipKind::MandatoryDocument => "Mandatory Document",
            RelationshipKind::SchedulingCoordination => "Scheduling Coordination",
            RelationshipKind::RelatedProcedure => "Related Procedure",
            RelationshipKind::OptionalDocument => "Optional Document",
            RelationshipKind::FormatRequirement => "Format Requirement",
            RelationshipKind::FilingQuestion(FilingQuestion::When) => "Answers WHEN",
            RelationshipKind::FilingQuestion(FilingQuestion::How) => "Answers HOW",
            RelationshipKind::FilingQuestion(FilingQuestion::Where) => "Answers WHERE",
            RelationshipKind::FilingQuestion(FilingQuestion::What) => "Answers WHAT",
            RelationshipKind::FilingQuestion(FilingQuestion::Who) => "Answers WHO",
            RelationshipKind::FilingQuestion(FilingQuestion::Format) => "Answers FORMAT",
            RelationshipKind::NetworkCentrality => "Network Centrality",
            RelationshipKind::TemporalEmergence => "Temporal Emergence",
            RelationshipKind::EmergencyRelevance => "Emergency Relevance",
        }
    }

    /// Flat string key, used wherever a kind has to be a map key in JSON
    pub fn key(&self) -> String {
        let key = match self {
            RelationshipKind::FilingQuestion(question) => {
                return format!("filing_question_{}", question.as_str().to_lowercase());
            }
            RelationshipKind::Reference => "reference",
            RelationshipKind::ProceduralDependency => "procedural_dependency",
            RelationshipKind::TimingRelationship => "timing_relationship",
            RelationshipKind::MotionSequence => "motion_sequence",
            RelationshipKind::DocumentRequirement => "document_requirement",
            RelationshipKind::AlternativeMotion => "alternative_motion",
            RelationshipKind::MeetAndConfer => "meet_and_confer",
            RelationshipKind::CategorySimilarity => "category_similarity",
            RelationshipKind::TimingRequirement => "timing_requirement",
            RelationshipKind::ProceduralFoundation => "procedural_foundation",
            RelationshipKind::EvidenceRequirement => "evidence_requirement",
            RelationshipKind::MandatoryDocument => "mandatory_document",
            RelationshipKind::SchedulingCoordination => "scheduling_coordination",
            RelationshipKind::RelatedProcedure => "related_procedure",
            RelationshipKind::OptionalDocument => "optional_document",
            RelationshipKind::FormatRequirement => "format_requirement",
            RelationshipKind::NetworkCentrality => "network_centrality",
            RelationshipKind::TemporalEmergence => "temporal_emergence",
            RelationshipKind::EmergencyRelevance => "emergency_relevance",
        };
        key.to_string()
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Where a candidate came from. Declaration order doubles as the tie-break
/// order when two sources report the same confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExtractorId {
    DirectReference,
    ContentPattern,
    Sequence,
    NetworkPropagation,
    TemporalCriticality,
    CategorySimilarity,
    AlwaysApply,
}

impl ExtractorId {
    pub const EXTRACTORS: [ExtractorId; 5] = [
        ExtractorId::DirectReference,
        ExtractorId::ContentPattern,
        ExtractorId::Sequence,
        ExtractorId::NetworkPropagation,
        ExtractorId::TemporalCriticality,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExtractorId::DirectReference => "DirectReference",
            ExtractorId::ContentPattern => "ContentPattern",
            ExtractorId::Sequence => "Sequence",
            ExtractorId::NetworkPropagation => "NetworkPropagation",
            ExtractorId::TemporalCriticality => "TemporalCriticality",
            ExtractorId::CategorySimilarity => "CategorySimilarity",
            ExtractorId::AlwaysApply => "AlwaysApply",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::EXTRACTORS.iter().copied().find(|id| id.name() == name)
    }

    /// Candidates from these sources count toward rule discovery
    pub fn is_discovery_source(&self) -> bool {
        !matches!(self, ExtractorId::CategorySimilarity | ExtractorId::AlwaysApply)
    }

    /// Hand-authored rules are kept regardless of the aggregation floor
    pub fn bypasses_floor(&self) -> bool {
        matches!(self, ExtractorId::AlwaysApply)
    }
}

impl fmt::Display for ExtractorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipCandidate {
    pub source_id: RuleId,
    pub target_id: RuleId,
    pub kind: RelationshipKind,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub extractor: ExtractorId,
}

impl RelationshipCandidate {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        kind: RelationshipKind,
        confidence: f64,
        extractor: ExtractorId,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
            confidence: clamp_confidence(confidence),
            reasons: Vec::new(),
            extractor,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    pub fn with_reasons<I, S>(mut self, reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reasons.extend(reasons.into_iter().map(Into::into));
        self
    }

    pub fn key(&self) -> EdgeKey {
        (self.source_id.clone(), self.target_id.clone(), self.kind)
    }
}

/// (source, target, kind): the identity of an edge
pub type EdgeKey = (RuleId, RuleId, RelationshipKind);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionWarning {
    pub document_id: RuleId,
    pub extractor: ExtractorId,
    pub message: String,
}

// ===== GRAPH TYPES =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub word_count: usize,
    pub cross_reference_count: usize,
    pub deadline_count: usize,
    pub procedural_requirement_count: usize,
    pub key_provision_count: usize,
    pub filing_questions: Vec<FilingQuestion>,
    pub is_seed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: RuleId,
    pub label: String,
    pub title: String,
    pub category: String,
    pub attributes: NodeAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source_id: RuleId,
    pub target_id: RuleId,
    pub kind: RelationshipKind,
    /// Always `kind.weight()`
    pub weight: u32,
    pub description: String,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

impl GraphEdge {
    pub fn key(&self) -> EdgeKey {
        (self.source_id.clone(), self.target_id.clone(), self.kind)
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source_id == id || self.target_id == id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleGraph {
    pub nodes: BTreeMap<RuleId, GraphNode>,
    /// Ordered by (source, target, kind)
    pub edges: Vec<GraphEdge>,
}

// ===== ANALYTICS TYPES =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityEntry {
    pub node_id: RuleId,
    pub degree: usize,
    pub title: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub node_count: usize,
    pub internal_edges: usize,
    pub external_edges: usize,
    pub node_ids: Vec<RuleId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatistics {
    pub node_id: RuleId,
    pub degree: usize,
    pub outgoing: usize,
    pub incoming: usize,
    pub kind_counts: BTreeMap<String, usize>,
    pub neighbors: Vec<RuleId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsBundle {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub centrality: Vec<CentralityEntry>,
    pub density: f64,
    pub average_degree: f64,
    pub categories: BTreeMap<String, CategoryStats>,
    pub kind_distribution: BTreeMap<String, usize>,
}

// ===== TEMPORAL & DISCOVERY TYPES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Active,
    Historical,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventImpact {
    pub event: String,
    pub impact: f64,
    pub matched_patterns: usize,
    pub total_patterns: usize,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub date: NaiveDate,
    pub event: String,
    pub impact: f64,
    pub status: EventStatus,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub expected_date: NaiveDate,
    pub event: String,
    pub projected_impact: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalAnalysis {
    pub rule_id: RuleId,
    pub current_criticality: f64,
    pub emerging_criticality: f64,
    pub affected_events: Vec<EventImpact>,
    pub timeline: Vec<TimelineEntry>,
    pub projections: Vec<Projection>,
}

impl TemporalAnalysis {
    pub fn temporal_score(&self) -> f64 {
        self.current_criticality + self.emerging_criticality
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredRule {
    pub rule_id: RuleId,
    pub title: String,
    pub category: String,
    pub aggregate_confidence: f64,
    pub discovery_method: ExtractorId,
    pub reasons: Vec<String>,
    pub filing_questions: Vec<FilingQuestion>,
    pub temporal: TemporalAnalysis,
}

// ===== RUN OUTPUT =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub analysis_date: NaiveDate,
    pub pattern_library_version: String,
    pub document_count: usize,
    pub extractors_run: Vec<ExtractorId>,
    pub snapshot_fingerprint: String,
    pub graph_fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub run: RunInfo,
    pub graph: RuleGraph,
    pub metrics: MetricsBundle,
    pub discovered_rules: Vec<DiscoveredRule>,
    pub expanded_seed_set: Vec<RuleId>,
    pub warnings: Vec<ExtractionWarning>,
}
