// Rulegraph Core Library
//
// Builds a relationship graph over procedural rule documents: classify,
// extract candidate relationships, aggregate, build, analyze, discover.
// Main interface is `RuleGraphProcessor`.

pub mod types;
pub mod error;
pub mod config;
pub mod patterns;
pub mod classifier;
pub mod corpus;
pub mod snapshot;
pub mod extractors;
pub mod always_apply;
pub mod aggregator;
pub mod graphs;
pub mod discovery;
pub mod fingerprint;
pub mod processor;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{PipelineError, PipelineResult};
pub use config::{ConfigManager, ConfigPreset, PipelineConfig};
pub use graphs::{GraphAnalytics, GraphBuilder};
pub use processor::{PipelineStages, RuleGraphProcessor, StepProfiler};
pub use snapshot::DocumentSnapshot;
