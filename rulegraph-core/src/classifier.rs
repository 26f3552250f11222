use crate::error::{PipelineError, PipelineResult};
use crate::types::{RuleDocument, DEFAULT_CATEGORY};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// Inclusive numeric range bound to a category, optionally guarded by a
/// phrase the title must (or must not) contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRange {
    pub min: f64,
    pub max: f64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_excludes: Option<String>,
}

impl CategoryRange {
    fn new(min: f64, max: f64, category: &str) -> Self {
        Self {
            min,
            max,
            category: category.to_string(),
            title_contains: None,
            title_excludes: None,
        }
    }

    fn matches(&self, number: f64, title_lower: &str) -> bool {
        if number < self.min || number > self.max {
            return false;
        }
        if let Some(phrase) = &self.title_contains {
            if !title_lower.contains(&phrase.to_lowercase()) {
                return false;
            }
        }
        if let Some(phrase) = &self.title_excludes {
            if title_lower.contains(&phrase.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub category: String,
}

fn default_category_name() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Ordered classification tables. Order is significant in both lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTable {
    #[serde(default = "default_ranges")]
    pub ranges: Vec<CategoryRange>,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<KeywordRule>,
    #[serde(default = "default_category_name")]
    pub default_category: String,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            ranges: default_ranges(),
            keywords: default_keywords(),
            default_category: default_category_name(),
        }
    }
}

impl CategoryTable {
    pub fn validate(&self) -> PipelineResult<()> {
        for range in &self.ranges {
            if range.min.is_nan() || range.max.is_nan() || range.min > range.max {
                return Err(PipelineError::configuration(format!(
                    "category range {}..={} for '{}' is empty",
                    range.min, range.max, range.category
                )));
            }
        }
        if self.default_category.trim().is_empty() {
            return Err(PipelineError::configuration("default category must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassificationMethod {
    NumericRange,
    Keyword,
    Default,
    /// Category already present on the document
    Provided,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub category: String,
    pub method: ClassificationMethod,
}

/// Leading numeric part of a section id: "437c" -> 437, "1010.6" -> 1010.6
pub fn parse_numeric_prefix(id: &str) -> Option<f64> {
    static PREFIX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = PREFIX
        .get_or_init(|| Regex::new(r"^\d+(?:\.\d+)?").ok())
        .as_ref()?;
    regex.find(id.trim()).and_then(|m| m.as_str().parse::<f64>().ok())
}

pub struct RuleClassifier {
    table: CategoryTable,
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new(CategoryTable::default())
    }
}

impl RuleClassifier {
    pub fn new(mut table: CategoryTable) -> Self {
        for rule in &mut table.keywords {
            for keyword in &mut rule.keywords {
                *keyword = keyword.to_lowercase();
            }
        }
        Self { table }
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    pub fn classify(&self, document: &RuleDocument) -> ClassificationResult {
        if let Some(category) = document.category.as_ref().filter(|c| !c.trim().is_empty()) {
            return ClassificationResult {
                category: category.clone(),
                method: ClassificationMethod::Provided,
            };
        }

        let title_lower = document.title.to_lowercase();

        if let Some(number) = parse_numeric_prefix(&document.id) {
            let range = self.table.ranges.iter().find(|r| r.matches(number, &title_lower));
            if let Some(range) = range {
                return ClassificationResult {
                    category: range.category.clone(),
                    method: ClassificationMethod::NumericRange,
                };
            }
        }

        if let Some(rule) = self
            .table
            .keywords
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| title_lower.contains(k.as_str())))
        {
            return ClassificationResult {
                category: rule.category.clone(),
                method: ClassificationMethod::Keyword,
            };
        }

        ClassificationResult {
            category: self.table.default_category.clone(),
            method: ClassificationMethod::Default,
        }
    }

    /// Write each document's category once
    pub fn classify_all(&self, documents: &[RuleDocument]) -> Vec<RuleDocument> {
        documents
            .iter()
            .map(|document| {
                let result = self.classify(document);
                debug!(
                    id = %document.id,
                    category = %result.category,
                    method = ?result.method,
                    "classified"
                );
                let mut classified = document.clone();
                classified.category = Some(result.category);
                classified
            })
            .collect()
    }
}

// ===== DEFAULT TABLES =====
// Specific ranges precede the broad catch-alls that contain them.

fn default_ranges() -> Vec<CategoryRange> {
    let mut strike = CategoryRange::new(435.0, 437.0, "Motion to Strike");
    strike.title_excludes = Some("summary".to_string());
    let mut summary = CategoryRange::new(437.0, 437.9, "Summary Judgment Motion");
    summary.title_contains = Some("summary".to_string());

    vec![
        CategoryRange::new(430.0, 430.41, "Demurrer (Motion to Dismiss)"),
        strike,
        summary,
        CategoryRange::new(425.10, 425.13, "Complaint Requirements"),
        CategoryRange::new(431.30, 431.40, "Answer Requirements"),
        CategoryRange::new(472.0, 472.9, "Pleading Amendments"),
        CategoryRange::new(426.10, 426.50, "Cross-Complaint Requirements"),
        CategoryRange::new(36.0, 44.0, "Case Management"),
        CategoryRange::new(12.0, 35.0, "General Procedures"),
        CategoryRange::new(128.0, 130.0, "General Procedures"),
        CategoryRange::new(410.0, 418.0, "Jurisdiction & Service"),
        CategoryRange::new(392.0, 401.0, "Venue & Jurisdiction"),
        CategoryRange::new(420.0, 475.0, "Pleadings"),
        CategoryRange::new(583.0, 583.5, "Dismissal Procedures"),
        CategoryRange::new(664.0, 670.0, "Judgment Entry"),
        CategoryRange::new(683.0, 724.0, "Judgment Enforcement"),
        CategoryRange::new(901.0, 996.0, "Writs"),
        CategoryRange::new(1000.0, 1020.0, "Service & Notice"),
        CategoryRange::new(1032.0, 1038.0, "Costs & Fees"),
        CategoryRange::new(1085.0, 1097.0, "Mandates"),
        CategoryRange::new(2016.0, 2019.0, "Discovery Scope"),
        CategoryRange::new(2023.0, 2024.5, "Discovery Sanctions"),
        CategoryRange::new(2025.0, 2025.9, "Depositions"),
        CategoryRange::new(2030.0, 2030.9, "Interrogatories"),
        CategoryRange::new(2031.0, 2031.9, "Document Production"),
        CategoryRange::new(2032.0, 2032.9, "Physical Examinations"),
        CategoryRange::new(2033.0, 2033.9, "Requests for Admission"),
    ]
}

fn keyword(keywords: &[&str], category: &str) -> KeywordRule {
    KeywordRule {
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        category: category.to_string(),
    }
}

fn default_keywords() -> Vec<KeywordRule> {
    vec![
        keyword(&["demurrer"], "Demurrer (Motion to Dismiss)"),
        keyword(&["motion to strike"], "Motion to Strike"),
        keyword(&["summary judgment"], "Summary Judgment Motion"),
        keyword(&["meet and confer"], "Motion Practice"),
        keyword(&["amendment", "amend"], "Pleading Amendments"),
        keyword(&["cross-complaint", "cross complaint"], "Cross-Complaint Requirements"),
        keyword(&["answer format", "answer requirements"], "Answer Requirements"),
        keyword(&["complaint format", "complaint requirements"], "Complaint Requirements"),
        keyword(&["filing", "service"], "Filing & Service"),
        keyword(&["motion", "ex parte"], "Motion Practice"),
        keyword(&["discovery"], "Discovery"),
        keyword(&["judgment"], "Judgment Procedures"),
        keyword(&["deadline", "time"], "Timing Rules"),
        keyword(&["venue", "jurisdiction"], "Venue & Jurisdiction"),
        keyword(&["cost", "fee"], "Costs & Fees"),
        keyword(&["writ"], "Writs"),
        keyword(&["mandate", "mandamus"], "Mandates"),
        keyword(&["case management", "scheduling"], "Case Management"),
        keyword(&["dismissal", "dismiss"], "Dismissal Procedures"),
        keyword(&["enforcement", "execution"], "Judgment Enforcement"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(id: &str, title: &str) -> ClassificationResult {
        RuleClassifier::default().classify(&RuleDocument::new(id, title))
    }

    #[test]
    fn numeric_prefix_tolerates_suffixes() {
        assert_eq!(parse_numeric_prefix("437c"), Some(437.0));
        assert_eq!(parse_numeric_prefix("1010.6"), Some(1010.6));
        assert_eq!(parse_numeric_prefix("12a"), Some(12.0));
        assert_eq!(parse_numeric_prefix("rule-3"), None);
    }

    #[test]
    fn summary_guard_splits_437() {
        let sj = classify("437c", "Summary judgment motions");
        assert_eq!(sj.category, "Summary Judgment Motion");
        assert_eq!(sj.method, ClassificationMethod::NumericRange);

        let strike = classify("436", "Striking pleadings");
        assert_eq!(strike.category, "Motion to Strike");

        // 437 without "summary" in the title falls to the strike range first
        assert_eq!(classify("437", "Grounds").category, "Motion to Strike");
    }

    #[test]
    fn specific_ranges_win_over_catch_alls() {
        assert_eq!(
            classify("430.10", "Grounds for objection").category,
            "Demurrer (Motion to Dismiss)"
        );
        assert_eq!(classify("472", "Amendment of course").category, "Pleading Amendments");
        assert_eq!(classify("460", "Pleadings generally").category, "Pleadings");
        assert_eq!(classify("1010.6", "Electronic service").category, "Service & Notice");
    }

    #[test]
    fn keyword_fallback_for_out_of_range_ids() {
        let result = classify("9999", "Motion to Strike Requirements");
        assert_eq!(result.category, "Motion to Strike");
        assert_eq!(result.method, ClassificationMethod::Keyword);

        // Keyword order: "demurrer" is checked before "motion"
        assert_eq!(
            classify("rule-1", "Motion practice for demurrer").category,
            "Demurrer (Motion to Dismiss)"
        );
    }

    #[test]
    fn default_when_nothing_matches() {
        let result = classify("rule-x", "Miscellaneous provisions");
        assert_eq!(result.category, DEFAULT_CATEGORY);
        assert_eq!(result.method, ClassificationMethod::Default);
    }

    #[test]
    fn provided_category_is_kept() {
        let doc = RuleDocument::new("437c", "Summary judgment").with_category("Custom");
        let result = RuleClassifier::default().classify(&doc);
        assert_eq!(result.category, "Custom");
        assert_eq!(result.method, ClassificationMethod::Provided);
    }

    #[test]
    fn inverted_range_fails_validation() {
        let mut table = CategoryTable::default();
        table.ranges.push(CategoryRange::new(10.0, 5.0, "Broken"));
        assert!(table.validate().is_err());
        assert!(CategoryTable::default().validate().is_ok());
    }
}
