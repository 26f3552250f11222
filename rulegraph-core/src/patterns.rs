// Pattern library: filing-question regexes, citation regexes, filing terms,
// procedural sequence templates and the criticality-event registry.
//
// `PatternLibraryConfig` is the serde-facing form; `PatternLibrary` is the
// compiled, immutable form shared read-only by every extractor.

use crate::error::{PipelineError, PipelineResult};
use crate::types::{FilingQuestion, RuleDocument};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Anchor ids within this distance of a document's numeric id count as a match.
///
/// Kept well under one decimal step: subsections such as 1010.5 and 1010.6 sit
/// 0.1 apart, and in floating point that gap can land just below 0.1, so a
/// 0.1 window would let neighbouring subsections match each other's anchors.
pub const SEQUENCE_EPSILON: f64 = 0.01;

fn default_version() -> String {
    "1.0.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternLibraryConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_filing_questions")]
    pub filing_questions: Vec<FilingQuestionPatterns>,
    #[serde(default = "default_citation_patterns")]
    pub citation_patterns: Vec<String>,
    #[serde(default = "default_filing_terms")]
    pub filing_terms: Vec<String>,
    #[serde(default = "default_sequences")]
    pub sequences: Vec<SequenceTemplate>,
    #[serde(default = "default_criticality_events")]
    pub criticality_events: Vec<CriticalityEventConfig>,
}

impl Default for PatternLibraryConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            filing_questions: default_filing_questions(),
            citation_patterns: default_citation_patterns(),
            filing_terms: default_filing_terms(),
            sequences: default_sequences(),
            criticality_events: default_criticality_events(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingQuestionPatterns {
    pub question: FilingQuestion,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceTemplate {
    pub name: String,
    /// Ordered numeric anchor ids
    pub anchors: Vec<f64>,
    pub weight: f64,
}

impl SequenceTemplate {
    pub fn contains(&self, number: f64) -> bool {
        self.anchors.iter().any(|anchor| near(*anchor, number))
    }
}

pub fn near(a: f64, b: f64) -> bool {
    (a - b).abs() < SEQUENCE_EPSILON
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalityEventConfig {
    pub name: String,
    pub starts: NaiveDate,
    /// Exclusive; open-ended when absent
    #[serde(default)]
    pub ends: Option<NaiveDate>,
    pub impact: f64,
    pub patterns: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CriticalityEvent {
    pub name: String,
    pub starts: NaiveDate,
    pub ends: Option<NaiveDate>,
    pub impact: f64,
    pub patterns: Vec<Regex>,
    pub description: String,
}

impl CriticalityEvent {
    /// [starts, ends)
    pub fn is_active(&self, date: NaiveDate) -> bool {
        self.starts <= date && self.ends.map_or(true, |end| date < end)
    }

    pub fn is_upcoming(&self, date: NaiveDate) -> bool {
        self.starts > date
    }

    /// Number of trigger patterns found in `text`
    pub fn matched_patterns(&self, text: &str) -> usize {
        self.patterns.iter().filter(|pattern| pattern.is_match(text)).count()
    }
}

/// Compiled, read-only pattern tables
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    version: String,
    filing_questions: Vec<(FilingQuestion, Vec<Regex>)>,
    citations: Vec<Regex>,
    filing_terms: Vec<String>,
    sequences: Vec<SequenceTemplate>,
    events: Vec<CriticalityEvent>,
}

impl PatternLibrary {
    pub fn compile(config: &PatternLibraryConfig) -> PipelineResult<Self> {
        let filing_questions = config
            .filing_questions
            .iter()
            .map(|entry| Ok((entry.question, compile_all(&entry.patterns)?)))
            .collect::<PipelineResult<Vec<_>>>()?;

        let citations = compile_all(&config.citation_patterns)?;

        for template in &config.sequences {
            if template.anchors.is_empty() {
                return Err(PipelineError::configuration(format!(
                    "sequence template '{}' has no anchors",
                    template.name
                )));
            }
            if !(0.0..=1.0).contains(&template.weight) {
                return Err(PipelineError::configuration(format!(
                    "sequence template '{}' weight {} is outside [0, 1]",
                    template.name, template.weight
                )));
            }
        }

        let mut events = Vec::with_capacity(config.criticality_events.len());
        for event in &config.criticality_events {
            if let Some(end) = event.ends {
                if end <= event.starts {
                    return Err(PipelineError::configuration(format!(
                        "criticality event '{}' ends ({}) before it starts ({})",
                        event.name, end, event.starts
                    )));
                }
            }
            if !(0.0..=1.0).contains(&event.impact) {
                return Err(PipelineError::configuration(format!(
                    "criticality event '{}' impact {} is outside [0, 1]",
                    event.name, event.impact
                )));
            }
            if event.patterns.is_empty() {
                return Err(PipelineError::configuration(format!(
                    "criticality event '{}' has no trigger patterns",
                    event.name
                )));
            }
            events.push(CriticalityEvent {
                name: event.name.clone(),
                starts: event.starts,
                ends: event.ends,
                impact: event.impact,
                patterns: compile_all(&event.patterns)?,
                description: event.description.clone(),
            });
        }

        Ok(Self {
            version: config.version.clone(),
            filing_questions,
            citations,
            filing_terms: config.filing_terms.iter().map(|t| t.to_lowercase()).collect(),
            sequences: config.sequences.clone(),
            events,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn question_patterns(&self) -> &[(FilingQuestion, Vec<Regex>)] {
        &self.filing_questions
    }

    pub fn filing_terms(&self) -> &[String] {
        &self.filing_terms
    }

    pub fn sequences(&self) -> &[SequenceTemplate] {
        &self.sequences
    }

    pub fn events(&self) -> &[CriticalityEvent] {
        &self.events
    }

    /// Questions with at least one pattern matching the title or the body
    pub fn filing_questions_answered(&self, document: &RuleDocument) -> Vec<FilingQuestion> {
        self.filing_questions
            .iter()
            .filter(|(_, patterns)| {
                patterns
                    .iter()
                    .any(|p| p.is_match(&document.title) || p.is_match(&document.raw_text))
            })
            .map(|(question, _)| *question)
            .collect()
    }

    /// Section ids cited in free text, in first-seen order without repeats
    pub fn cited_ids(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for pattern in &self.citations {
            for captures in pattern.captures_iter(text) {
                if let Some(id) = captures.get(1) {
                    let id = id.as_str().to_string();
                    if !found.contains(&id) {
                        found.push(id);
                    }
                }
            }
        }
        found
    }

    /// How many configured filing terms appear in the lower-cased text
    pub fn filing_term_count(&self, text: &str) -> usize {
        let lower = text.to_lowercase();
        self.filing_terms.iter().filter(|term| lower.contains(term.as_str())).count()
    }
}

fn compile_all(patterns: &[String]) -> PipelineResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| PipelineError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

// ===== DEFAULT TABLES =====

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_filing_questions() -> Vec<FilingQuestionPatterns> {
    vec![
        FilingQuestionPatterns {
            question: FilingQuestion::When,
            patterns: strings(&[
                r"(?i)(?:within|before|after|deadline|time limit|days|calendar|court days)",
                r"(?i)(?:filing deadline|service deadline|notice deadline|cutoff)",
                r"(?i)(?:time computation|extension|late filing|holiday)",
            ]),
        },
        FilingQuestionPatterns {
            question: FilingQuestion::How,
            patterns: strings(&[
                r"(?i)(?:procedure|method|process|steps|requirements|filing procedure)",
                r"(?i)(?:service procedure|electronic filing|mail service|personal service)",
                r"(?i)(?:meet and confer|notice requirements|application procedure)",
            ]),
        },
        FilingQuestionPatterns {
            question: FilingQuestion::Where,
            patterns: strings(&[
                r"(?i)(?:venue|jurisdiction|proper court|county|district|court location)",
                r"(?i)(?:filing location|transfer|forum|proper forum)",
            ]),
        },
        FilingQuestionPatterns {
            question: FilingQuestion::What,
            patterns: strings(&[
                r"(?i)(?:shall contain|must contain|shall include|must include|required contents)",
                r"(?i)(?:separate statement|points and authorities|supporting declaration)",
                r"(?i)(?:notice of motion|memorandum|brief|attachment)",
            ]),
        },
        FilingQuestionPatterns {
            question: FilingQuestion::Who,
            patterns: strings(&[
                r"(?i)(?:capacity|authority|standing|who may file|attorney|party)",
                r"(?i)(?:verification|sworn|under penalty of perjury)",
            ]),
        },
        FilingQuestionPatterns {
            question: FilingQuestion::Format,
            patterns: strings(&[
                r"(?i)(?:format|formatting|caption|title|heading|font|margins)",
                r"(?i)(?:document format|pleading format|form|template|typed)",
            ]),
        },
    ]
}

fn default_citation_patterns() -> Vec<String> {
    strings(&[
        r"(?i)(?:Section|Rule|CCP)\s+(\d+(?:\.\d+)?[a-z]?)",
        r"(?i)(\d+(?:\.\d+)?[a-z]?)\s*(?:of\s+(?:this\s+)?(?:Code|Chapter|Title))",
        r"(?i)Code\s+of\s+Civil\s+Procedure\s+[Ss]ection\s+(\d+(?:\.\d+)?[a-z]?)",
    ])
}

fn default_filing_terms() -> Vec<String> {
    strings(&[
        "filing", "deadline", "service", "motion", "procedure", "court", "document", "pleading",
        "notice", "hearing", "time", "method",
    ])
}

fn default_sequences() -> Vec<SequenceTemplate> {
    vec![
        SequenceTemplate {
            name: "Motion Practice Sequence".to_string(),
            anchors: vec![430.0, 435.0, 437.0, 1005.0, 1013.0, 1014.0],
            weight: 0.8,
        },
        SequenceTemplate {
            name: "Service and Filing Sequence".to_string(),
            anchors: vec![1010.0, 1010.5, 1010.6, 1013.0, 1013.1, 1014.0],
            weight: 0.7,
        },
        SequenceTemplate {
            name: "Pleading Sequence".to_string(),
            anchors: vec![425.0, 426.0, 430.0, 431.0, 472.0],
            weight: 0.7,
        },
        SequenceTemplate {
            name: "Post-Trial Sequence".to_string(),
            anchors: vec![659.0, 659.1, 663.0, 664.0],
            weight: 0.8,
        },
        SequenceTemplate {
            name: "Discovery Sequence".to_string(),
            anchors: vec![2025.0, 2030.0, 2031.0, 2033.0],
            weight: 0.6,
        },
    ]
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    // Only called with literal calendar dates below
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn default_criticality_events() -> Vec<CriticalityEventConfig> {
    vec![
        CriticalityEventConfig {
            name: "COVID_emergency_rules".to_string(),
            starts: date(2020, 3, 1),
            ends: Some(date(2023, 12, 31)),
            impact: 0.8,
            patterns: strings(&[
                r"(?i)electronic.*filing",
                r"(?i)remote.*hearing",
                r"(?i)telephonic.*appearance",
                r"(?i)video.*conference",
                r"(?i)emergency.*procedures",
            ]),
            description: "Emergency rules enabling remote appearances and electronic filing"
                .to_string(),
        },
        CriticalityEventConfig {
            name: "mandatory_e_filing_expansion".to_string(),
            starts: date(2022, 1, 1),
            ends: None,
            impact: 0.7,
            patterns: strings(&[
                r"(?i)electronic.*service",
                r"(?i)electronic.*filing",
                r"(?i)e-filing",
                r"(?i)digital.*signature",
                r"(?i)online.*submission",
            ]),
            description: "Expansion of mandatory electronic filing and service".to_string(),
        },
        CriticalityEventConfig {
            name: "discovery_reform_2019".to_string(),
            starts: date(2020, 1, 1),
            ends: None,
            impact: 0.6,
            patterns: strings(&[
                r"(?i)discovery.*deadline",
                r"(?i)discovery.*cutoff",
                r"(?i)motion.*to.*compel",
                r"(?i)discovery.*sanctions",
            ]),
            description: "Discovery deadline and sanctions reform".to_string(),
        },
        CriticalityEventConfig {
            name: "summary_judgment_reform".to_string(),
            starts: date(2021, 1, 1),
            ends: None,
            impact: 0.7,
            patterns: strings(&[
                r"(?i)summary.*judgment",
                r"(?i)separate.*statement",
                r"(?i)undisputed.*fact",
                r"(?i)material.*fact",
            ]),
            description: "Summary judgment timing and separate statement changes".to_string(),
        },
        CriticalityEventConfig {
            name: "venue_changes_2018".to_string(),
            starts: date(2018, 1, 1),
            ends: None,
            impact: 0.5,
            patterns: strings(&[
                r"(?i)venue",
                r"(?i)proper.*court",
                r"(?i)jurisdiction",
                r"(?i)forum",
            ]),
            description: "Venue and proper court amendments".to_string(),
        },
        CriticalityEventConfig {
            name: "ai_filing_integration".to_string(),
            starts: date(2025, 1, 1),
            ends: None,
            impact: 0.8,
            patterns: strings(&[
                r"(?i)automated.*filing",
                r"(?i)artificial.*intelligence",
                r"(?i)machine.*readable",
                r"(?i)structured.*data",
            ]),
            description: "Automated and machine-readable filing integration".to_string(),
        },
    ]
}
