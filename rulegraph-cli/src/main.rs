use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

// Import from rulegraph-core
use rulegraph_core::{ConfigManager, ConfigPreset, PipelineConfig, RuleGraphProcessor};

// Import CLI utilities
use rulegraph::{default_output_path, parse_analysis_date, print_summary, write_output, CliError};

#[derive(Parser)]
#[command(name = "rulegraph")]
#[command(about = "Build a confidence-scored relationship graph over procedural rule documents")]
struct Args {
    /// Path to the document snapshot (JSON)
    #[arg(short, long)]
    input: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Built-in preset used when no config file is given: standard, conservative or exploratory
    #[arg(long)]
    preset: Option<String>,

    /// Output file path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<String>,

    /// Date temporal criticality is measured against (YYYY-MM-DD, default: today)
    #[arg(long)]
    analysis_date: Option<String>,

    /// Run extractors on parallel scoped threads
    #[arg(long)]
    parallel: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// How many central nodes and discovered rules to print
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,

    /// Print the effective config as YAML and exit
    #[arg(long)]
    dump_config: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rulegraph=info,rulegraph_core=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    println!("🦀 Rulegraph Relationship Builder");

    if args.show_configs {
        show_help();
        return Ok(());
    }

    if let Err(e) = run(&args) {
        if e.is_input_error() {
            eprintln!("❌ Input error: {e}");
        } else {
            eprintln!("❌ Run failed: {e}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run(args: &Args) -> Result<(), CliError> {
    let config = resolve_config(args)?;

    if args.dump_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let input = args.input.as_deref().ok_or(CliError::MissingInput)?;
    let processor = RuleGraphProcessor::new(config)?.with_profiling(args.profile);

    println!("📄 Processing: {}", input);
    let output = processor.run_snapshot_file(input)?;
    print_summary(&output, args.top);

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input, args.config.as_deref()));
    write_output(&output, &output_path)
}

/// Config file, else preset, else defaults; then command-line overrides
fn resolve_config(args: &Args) -> Result<PipelineConfig, CliError> {
    let mut config = if let Some(config_path) = &args.config {
        let config = PipelineConfig::load_from_file(config_path)?;
        println!("📋 Loaded config from: {}", config_path);
        config
    } else if let Some(name) = &args.preset {
        let preset = ConfigPreset::from_name(name)
            .ok_or_else(|| CliError::UnknownPreset(name.clone()))?;
        println!("📋 Using built-in preset: {:?}", preset);
        ConfigManager::new().get_config(&preset).clone()
    } else {
        println!("📋 Using default config");
        PipelineConfig::default()
    };

    // Apply CLI overrides to config
    if let Some(date) = &args.analysis_date {
        config.analysis_date = Some(parse_analysis_date(date)?);
    }
    if args.parallel {
        config.parallel = true;
    }
    Ok(config)
}

fn show_help() {
    println!("\n📋 Available Configuration Options:");
    println!("  --input <path>          Document snapshot to process (JSON)");
    println!("  --config <path>         Load custom config file (YAML)");
    println!("  --preset <name>         Built-in config when no file is given");
    println!("  --output <path>         Output file path (auto-generated if not specified)");
    println!("  --analysis-date <date>  Reference date for temporal criticality (YYYY-MM-DD)");
    println!("  --parallel              Run extractors on parallel threads");
    println!("  --profile               Time every pipeline step");
    println!("  --top <n>               Rows to print in the console summary");
    println!("  --dump-config           Print the effective config as YAML");

    println!("\n🎛️  Built-in presets:");
    let manager = ConfigManager::new();
    for (preset, config) in manager.presets() {
        println!(
            "  {:<14} floor {:.2}, promotion {:.2}, hybrid {:.2}, pair cap {}",
            format!("{:?}", preset).to_lowercase(),
            config.aggregation_confidence_floor,
            config.discovery_promotion_threshold,
            config.hybrid_promotion_threshold,
            config
                .category_similarity_pair_cap
                .map_or("none".to_string(), |cap| cap.to_string())
        );
    }

    println!("\n🧩 Extractors (run in configured order):");
    for extractor in &PipelineConfig::default().pipeline.extractors {
        println!("  {}", extractor.name);
    }

    println!("\n📝 Usage Examples:");
    println!("  cargo run -- -i snapshot.json");
    println!("  cargo run -- -i snapshot.json -o /path/to/output.json");
    println!("  cargo run -- -i snapshot.json -c config.yaml --analysis-date 2024-06-01");
    println!("  RUST_LOG=rulegraph_core=debug cargo run -- -i snapshot.json --profile");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn args(extra: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rulegraph").chain(extra.iter().copied())).unwrap()
    }

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir()
            .join(format!("rulegraph_cli_{}_{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn unparsable_config_file_stops_the_run() {
        let yaml = "aggregation_confidence_floor: \"high\"\ncategory_similarity_pair_cap: -5\n";
        let config = temp_file("bad.yaml", yaml);
        let parsed = args(&["--config", config.to_str().unwrap()]);

        let err = resolve_config(&parsed).unwrap_err();
        fs::remove_file(&config).ok();
        assert!(matches!(err, CliError::Pipeline(_)));
        assert!(!err.is_input_error());
    }

    #[test]
    fn missing_config_file_stops_the_run() {
        let err = resolve_config(&args(&["--config", "/nonexistent/rulegraph.yaml"])).unwrap_err();
        assert!(!err.is_input_error());
    }

    #[test]
    fn out_of_range_config_is_rejected_before_reading_input() {
        let config = temp_file("floor.yaml", "aggregation_confidence_floor: 1.5\n");
        let parsed = args(&[
            "--config",
            config.to_str().unwrap(),
            "--input",
            "/nonexistent/snapshot.json",
        ]);

        let err = run(&parsed).unwrap_err();
        fs::remove_file(&config).ok();
        assert!(!err.is_input_error());
    }

    #[test]
    fn unknown_preset_and_bad_date_are_rejected() {
        assert!(matches!(
            resolve_config(&args(&["--preset", "reckless"])),
            Err(CliError::UnknownPreset(_))
        ));
        assert!(matches!(
            resolve_config(&args(&["--analysis-date", "June 1st"])),
            Err(CliError::InvalidDate(_))
        ));
    }

    #[test]
    fn overrides_apply_on_top_of_presets() {
        let parsed = args(&[
            "--preset",
            "conservative",
            "--analysis-date",
            "2024-06-01",
            "--parallel",
        ]);
        let config = resolve_config(&parsed).unwrap();
        assert!(config.parallel);
        assert_eq!(config.analysis_date, chrono::NaiveDate::from_ymd_opt(2024, 6, 1));
    }

    #[test]
    fn missing_or_unreadable_input_is_an_input_error() {
        let err = run(&args(&[])).unwrap_err();
        assert!(matches!(err, CliError::MissingInput));
        assert!(err.is_input_error());

        let err = run(&args(&["--input", "/nonexistent/snapshot.json"])).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn valid_snapshot_writes_output() {
        let snapshot = temp_file(
            "snapshot.json",
            concat!(
                r#"{"documents": ["#,
                r#"{"id": "1.1", "title": "Pleadings","#,
                r#""extractedFields": {"crossReferences": ["1.2"]}},"#,
                r#"{"id": "1.2", "title": "Answers"}]}"#,
            ),
        );
        let output = std::env::temp_dir()
            .join(format!("rulegraph_cli_{}_out.json", std::process::id()));
        let parsed = args(&[
            "--input",
            snapshot.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--analysis-date",
            "2024-06-01",
        ]);

        run(&parsed).unwrap();
        let written = fs::read_to_string(&output).unwrap();
        fs::remove_file(&snapshot).ok();
        fs::remove_file(&output).ok();
        assert!(written.contains("\"graph\""));
    }
}
