use crate::aggregator::{AggregationResult, RelationshipAggregator};
use crate::classifier::RuleClassifier;
use crate::config::PipelineConfig;
use crate::corpus::Corpus;
use crate::discovery::DiscoveryEngine;
use crate::error::PipelineResult;
use crate::extractors::{ExtractionContext, ExtractionEngine};
use crate::fingerprint::{graph_fingerprint, snapshot_fingerprint};
use crate::graphs::{GraphAnalytics, GraphBuilder};
use crate::patterns::PatternLibrary;
use crate::snapshot::DocumentSnapshot;
use crate::types::*;
use chrono::Utc;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;
use uuid::Uuid;

/// Captured intermediate outputs from each pipeline stage
/// Used for testing and diagnostics
#[derive(Debug, Clone)]
pub struct PipelineStages {
    /// Documents after classification, duplicates removed
    pub classified: Vec<RuleDocument>,
    /// Raw extractor output in configured extractor order
    pub candidates: Vec<RelationshipCandidate>,
    /// Per-extractor wall time of this run
    pub extractor_timings: Vec<(String, Duration)>,
    pub aggregation: AggregationResult,
    pub output: PipelineOutput,
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        info!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        info!("📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            info!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        info!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

pub struct RuleGraphProcessor {
    config: PipelineConfig,
    patterns: PatternLibrary,
    classifier: RuleClassifier,
    engine: ExtractionEngine,
    aggregator: RelationshipAggregator,
    graph_builder: GraphBuilder,
    profile: bool,
}

impl RuleGraphProcessor {
    /// Validates the configuration and compiles every pattern up front, so a
    /// bad config never reaches extraction.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        let patterns = PatternLibrary::compile(&config.patterns)?;
        let classifier = RuleClassifier::new(config.categories.clone());
        let engine = ExtractionEngine::from_config(&config.pipeline)?;
        let aggregator = RelationshipAggregator::from_config(&config);

        Ok(Self {
            config,
            patterns,
            classifier,
            engine,
            aggregator,
            graph_builder: GraphBuilder::new(),
            profile: false,
        })
    }

    pub fn with_defaults() -> PipelineResult<Self> {
        Self::new(PipelineConfig::default())
    }

    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profile = enabled;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn patterns(&self) -> &PatternLibrary {
        &self.patterns
    }

    /// Documents → graph, metrics and discovered rules
    pub fn run(&self, documents: &[RuleDocument]) -> PipelineResult<PipelineOutput> {
        Ok(self.execute(documents, false)?.output)
    }

    /// Same as `run`, keeping every intermediate stage
    pub fn run_capture_stages(&self, documents: &[RuleDocument]) -> PipelineResult<PipelineStages> {
        self.execute(documents, true)
    }

    pub fn run_snapshot_file<P: AsRef<Path>>(&self, path: P) -> PipelineResult<PipelineOutput> {
        let path = path.as_ref();
        info!("📄 Loading snapshot: {}", path.display());
        let snapshot = DocumentSnapshot::load_from_file(path)?;
        self.run(&snapshot.documents)
    }

    fn execute(&self, documents: &[RuleDocument], capture: bool) -> PipelineResult<PipelineStages> {
        let mut profiler = StepProfiler::new(self.profile);
        let start_time = Instant::now();

        DocumentSnapshot::validate(documents)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let analysis_date = self.config.effective_analysis_date(started_at);
        info!(
            "🚀 Run {}: {} documents, analysis date {}",
            run_id,
            documents.len(),
            analysis_date
        );

        let snapshot_fingerprint = snapshot_fingerprint(documents);

        let classified = profiler.time_step("1. Classification", || {
            self.classifier.classify_all(documents)
        });
        let corpus = profiler.time_step("2. Corpus Index", || {
            Corpus::new(classified, &self.config.seed_ids)
        });
        info!(
            "📚 Indexed {} unique documents ({} configured seeds present)",
            corpus.len(),
            corpus.seed_documents().count()
        );

        let context = profiler.time_step("3. Extraction Context", || {
            ExtractionContext::new(&corpus, &self.patterns, analysis_date)
        });
        let extraction = profiler.time_step("4. Extraction", || {
            self.engine.run(&context, self.config.parallel)
        });
        if self.profile {
            for (name, duration) in &extraction.timings {
                info!("   ↳ {}: {:.0}ms", name, duration.as_millis());
            }
        }
        info!(
            "🧩 {} candidates from {} extractors, {} warnings",
            extraction.candidates.len(),
            extraction.extractors_run.len(),
            extraction.warnings.len()
        );

        let candidates = if capture {
            extraction.candidates.clone()
        } else {
            Vec::new()
        };
        let aggregation = profiler.time_step("5. Aggregation", || {
            self.aggregator
                .aggregate(&corpus, extraction.candidates, &self.config.always_apply)
        });

        let graph = profiler.time_step("6. Graph Construction", || {
            self.graph_builder
                .build_graph(&corpus, &aggregation.relationships, &self.patterns)
        });
        let metrics = profiler.time_step("7. Graph Analysis", || {
            GraphAnalytics::compute_metrics(&graph)
        });

        let discovery = DiscoveryEngine::new(
            &corpus,
            &self.patterns,
            analysis_date,
            self.config.discovery_promotion_threshold,
            self.config.hybrid_promotion_threshold,
        );
        let discovered_rules = profiler.time_step("8. Discovery", || {
            discovery.discover(&aggregation.relationships)
        });
        let expanded_seed_set = discovery.expanded_seed_set(&discovered_rules);

        let run = RunInfo {
            run_id,
            started_at,
            analysis_date,
            pattern_library_version: self.patterns.version().to_string(),
            document_count: corpus.len(),
            extractors_run: extraction.extractors_run,
            snapshot_fingerprint,
            graph_fingerprint: graph_fingerprint(&graph),
        };

        profiler.print_summary();
        info!(
            "✅ Run complete: {} nodes, {} edges, {} discovered rules in {:.0}ms",
            graph.node_count(),
            graph.edge_count(),
            discovered_rules.len(),
            start_time.elapsed().as_millis()
        );

        let classified = if capture {
            corpus.documents().to_vec()
        } else {
            Vec::new()
        };

        Ok(PipelineStages {
            classified,
            candidates,
            extractor_timings: extraction.timings,
            aggregation,
            output: PipelineOutput {
                run,
                graph,
                metrics,
                discovered_rules,
                expanded_seed_set,
                warnings: extraction.warnings,
            },
        })
    }
}
