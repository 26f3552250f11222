use chrono::NaiveDate;
use rulegraph_core::{PipelineError, PipelineOutput};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid analysis date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Unknown preset '{0}', expected standard, conservative or exploratory")]
    UnknownPreset(String),

    #[error("No input snapshot given, use --input <path>")]
    MissingInput,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Failed to write output {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CliError {
    /// Bad snapshot or missing `--input`, as opposed to a bad config or flag
    pub fn is_input_error(&self) -> bool {
        match self {
            CliError::MissingInput => true,
            CliError::Pipeline(e) => e.is_input_error(),
            _ => false,
        }
    }
}

pub fn parse_analysis_date(value: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDate(value.to_string()))
}

/// `<input stem>[_<config stem>]_rulegraph.json`
pub fn default_output_path(input: &str, config: Option<&str>) -> String {
    let input_name = Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let config_suffix = config
        .and_then(|p| Path::new(p).file_stem())
        .and_then(|s| s.to_str())
        .map(|s| format!("_{s}"))
        .unwrap_or_default();
    format!("{input_name}{config_suffix}_rulegraph.json")
}

pub fn write_output(output: &PipelineOutput, path: &str) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(output)?;
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CliError::Write {
            path: path.to_string(),
            source,
        })?;
    }
    fs::write(path, json).map_err(|source| CliError::Write {
        path: path.to_string(),
        source,
    })?;
    println!("💾 Results saved to: {}", path);
    Ok(())
}

pub fn print_summary(output: &PipelineOutput, top: usize) {
    let metrics = &output.metrics;
    println!("✅ Run {} complete", output.run.run_id);
    println!("📊 Graph metrics:");
    println!("   - Nodes: {}", metrics.total_nodes);
    println!("   - Edges: {}", metrics.total_edges);
    println!("   - Density: {:.4}", metrics.density);
    println!("   - Average degree: {:.2}", metrics.average_degree);
    println!("   - Categories: {}", metrics.categories.len());

    if !metrics.kind_distribution.is_empty() {
        println!("\n🔗 Relationship kinds:");
        for (kind, count) in &metrics.kind_distribution {
            println!("   {:.<35} {}", kind, count);
        }
    }

    if top > 0 && !metrics.centrality.is_empty() {
        println!("\n⭐ Most connected sections:");
        for entry in metrics.centrality.iter().take(top) {
            println!(
                "   {:>10}  degree {:>3}  {} ({})",
                entry.node_id, entry.degree, entry.title, entry.category
            );
        }
    }

    println!("\n🔎 Discovered rules: {}", output.discovered_rules.len());
    for rule in output.discovered_rules.iter().take(top) {
        println!(
            "   {:>10}  {:.2} via {}  {}",
            rule.rule_id, rule.aggregate_confidence, rule.discovery_method, rule.title
        );
    }
    println!("🌱 Expanded seed set: {} sections", output.expanded_seed_set.len());

    if !output.warnings.is_empty() {
        println!("\n⚠️  {} extraction warnings:", output.warnings.len());
        for warning in output.warnings.iter().take(top) {
            println!(
                "   {} on {}: {}",
                warning.extractor, warning.document_id, warning.message
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_follows_input_and_config() {
        assert_eq!(default_output_path("data/rules.json", None), "rules_rulegraph.json");
        assert_eq!(
            default_output_path("data/rules.json", Some("configs/strict.yaml")),
            "rules_strict_rulegraph.json"
        );
    }

    #[test]
    fn analysis_date_must_be_iso() {
        assert_eq!(
            parse_analysis_date("2024-06-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert!(matches!(parse_analysis_date("06/01/2024"), Err(CliError::InvalidDate(_))));
        assert!(matches!(parse_analysis_date("2024-13-40"), Err(CliError::InvalidDate(_))));
        assert!(matches!(parse_analysis_date(""), Err(CliError::InvalidDate(_))));
    }

    #[test]
    fn error_classes_follow_the_pipeline() {
        assert!(CliError::MissingInput.is_input_error());
        assert!(CliError::from(PipelineError::input("empty snapshot")).is_input_error());
        assert!(!CliError::from(PipelineError::configuration("bad floor")).is_input_error());
        assert!(!CliError::UnknownPreset("loose".to_string()).is_input_error());
    }
}
