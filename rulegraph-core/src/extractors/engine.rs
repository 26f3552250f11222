use super::{
    ContentPatternExtractor, DirectReferenceExtractor, ExtractionContext,
    NetworkPropagationExtractor, RelationshipExtractor, SequenceExtractor,
    TemporalCriticalityExtractor,
};
use crate::config::ExtractorPipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{ExtractionWarning, ExtractorId, RelationshipCandidate};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// `document_id` of a warning that covers a whole extractor rather than one document
pub const WHOLE_EXTRACTOR: &str = "*";

/// Build the extractor registered under `name`
pub fn build_extractor(name: &str) -> Option<Box<dyn RelationshipExtractor>> {
    let extractor: Box<dyn RelationshipExtractor> = match ExtractorId::from_name(name)? {
        ExtractorId::DirectReference => Box::new(DirectReferenceExtractor::new()),
        ExtractorId::ContentPattern => Box::new(ContentPatternExtractor::new()),
        ExtractorId::Sequence => Box::new(SequenceExtractor::new()),
        ExtractorId::NetworkPropagation => Box::new(NetworkPropagationExtractor::new()),
        ExtractorId::TemporalCriticality => Box::new(TemporalCriticalityExtractor::new()),
        ExtractorId::CategorySimilarity | ExtractorId::AlwaysApply => return None,
    };
    Some(extractor)
}

#[derive(Debug, Default)]
pub struct ExtractionOutput {
    /// Concatenated in configured extractor order
    pub candidates: Vec<RelationshipCandidate>,
    pub warnings: Vec<ExtractionWarning>,
    pub extractors_run: Vec<ExtractorId>,
    /// Wall time per extractor for this run only
    pub timings: Vec<(String, Duration)>,
}

struct ExtractorRun {
    id: ExtractorId,
    candidates: Vec<RelationshipCandidate>,
    warnings: Vec<ExtractionWarning>,
    elapsed: Duration,
}

impl ExtractorRun {
    /// Stand-in for a worker thread that died outside the per-document guard
    fn worker_failed(id: ExtractorId) -> Self {
        warn!(extractor = %id, "⚠️  Extractor worker panicked, no candidates kept");
        Self {
            id,
            candidates: Vec::new(),
            warnings: vec![ExtractionWarning {
                document_id: WHOLE_EXTRACTOR.to_string(),
                extractor: id,
                message: "extractor worker panicked".to_string(),
            }],
            elapsed: Duration::ZERO,
        }
    }
}

pub struct ExtractionEngine {
    extractors: Vec<Box<dyn RelationshipExtractor>>,
}

impl ExtractionEngine {
    pub fn new(extractors: Vec<Box<dyn RelationshipExtractor>>) -> Self {
        Self { extractors }
    }

    /// Enabled extractors in configured order
    pub fn from_config(pipeline: &ExtractorPipelineConfig) -> PipelineResult<Self> {
        let mut extractors = Vec::new();
        for entry in &pipeline.extractors {
            if !entry.enabled {
                debug!("⏭️  Skipping disabled extractor: {}", entry.name);
                continue;
            }
            let extractor = build_extractor(&entry.name)
                .ok_or_else(|| {
                    PipelineError::configuration(format!("unknown extractor '{}'", entry.name))
                })?;
            extractors.push(extractor);
        }
        Ok(Self::new(extractors))
    }

    pub fn extractor_names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    pub fn run(&self, context: &ExtractionContext<'_>, parallel: bool) -> ExtractionOutput {
        let runs: Vec<ExtractorRun> = if parallel && self.extractors.len() > 1 {
            info!("🔀 Running {} extractors in parallel", self.extractors.len());
            thread::scope(|scope| {
                let handles: Vec<_> = self
                    .extractors
                    .iter()
                    .map(|extractor| {
                        let handle =
                            scope.spawn(move || Self::run_extractor(extractor.as_ref(), context));
                        (extractor.id(), handle)
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|(id, handle)| {
                        handle.join().unwrap_or_else(|_| ExtractorRun::worker_failed(id))
                    })
                    .collect()
            })
        } else {
            self.extractors
                .iter()
                .map(|extractor| Self::run_extractor(extractor.as_ref(), context))
                .collect()
        };

        let mut output = ExtractionOutput::default();
        for run in runs {
            output.extractors_run.push(run.id);
            output.timings.push((run.id.to_string(), run.elapsed));
            output.candidates.extend(run.candidates);
            output.warnings.extend(run.warnings);
        }
        output
    }

    /// One extractor over every document. A failing document is recorded and
    /// skipped; the rest still run.
    fn run_extractor(
        extractor: &dyn RelationshipExtractor,
        context: &ExtractionContext<'_>,
    ) -> ExtractorRun {
        let start = Instant::now();
        let id = extractor.id();
        let mut candidates = Vec::new();
        let mut warnings = Vec::new();

        for document in context.corpus.documents() {
            let result =
                panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(document, context)));
            let message = match result {
                Ok(Ok(found)) => {
                    candidates.extend(found);
                    continue;
                }
                Ok(Err(err)) => format!("{:#}", err),
                Err(_) => "extractor panicked".to_string(),
            };
            warn!(
                extractor = %id,
                document = %document.id,
                "⚠️  Extraction failed: {}",
                message
            );
            warnings.push(ExtractionWarning {
                document_id: document.id.clone(),
                extractor: id,
                message,
            });
        }

        let elapsed = start.elapsed();
        debug!(
            "   ✅ {} produced {} candidates in {:.0}ms",
            extractor.name(),
            candidates.len(),
            elapsed.as_millis()
        );
        ExtractorRun {
            id,
            candidates,
            warnings,
            elapsed,
        }
    }
}
