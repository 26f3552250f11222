use crate::error::{PipelineError, PipelineResult};
use crate::types::RuleDocument;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The document set for one run, as delivered by the document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub documents: Vec<RuleDocument>,
}

// Accepts `{"documents": [...]}` or a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFormat {
    Wrapped { documents: Vec<RuleDocument> },
    Bare(Vec<RuleDocument>),
}

impl DocumentSnapshot {
    pub fn new(documents: Vec<RuleDocument>) -> Self {
        Self { documents }
    }

    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        let documents = match serde_json::from_str::<SnapshotFormat>(json) {
            Ok(SnapshotFormat::Wrapped { documents }) | Ok(SnapshotFormat::Bare(documents)) => {
                documents
            }
            Err(_) => {
                // Re-parse as the wrapped form so the error names a line and column
                let wrapped: DocumentSnapshot = serde_json::from_str(json)?;
                wrapped.documents
            }
        };
        Ok(Self { documents })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| PipelineError::SnapshotRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Non-empty, and every id non-blank
    pub fn validate(documents: &[RuleDocument]) -> PipelineResult<()> {
        if documents.is_empty() {
            return Err(PipelineError::input("snapshot contains no documents"));
        }
        if let Some(position) = documents.iter().position(|d| d.id.trim().is_empty()) {
            return Err(PipelineError::input(format!(
                "document at position {} has an empty id",
                position
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_wrapped_and_bare_forms() {
        let wrapped =
            DocumentSnapshot::from_json_str(r#"{"documents":[{"id":"1005","title":"Motions"}]}"#)
                .unwrap();
        let bare = DocumentSnapshot::from_json_str(r#"[{"id":"1005","title":"Motions"}]"#).unwrap();
        assert_eq!(wrapped, bare);
        assert_eq!(bare.len(), 1);
    }

    #[test]
    fn malformed_json_is_an_input_error() {
        let err = DocumentSnapshot::from_json_str("{\"documents\": [").unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = DocumentSnapshot::load_from_file("/nonexistent/snapshot.json").unwrap_err();
        assert!(matches!(err, PipelineError::SnapshotRead { .. }));
        assert!(err.is_input_error());
    }

    #[test]
    fn empty_and_blank_ids_are_rejected() {
        assert!(DocumentSnapshot::validate(&[]).is_err());
        let docs = vec![RuleDocument::new("1005", "ok"), RuleDocument::new("  ", "blank")];
        let err = DocumentSnapshot::validate(&docs).unwrap_err();
        assert!(err.to_string().contains("position 1"));
    }
}
