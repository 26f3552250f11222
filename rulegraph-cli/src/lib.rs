// All core functionality is in rulegraph-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod report;

// Re-export core types for convenience
pub use rulegraph_core::*;

// Re-export CLI utilities
pub use report::{default_output_path, parse_analysis_date, print_summary, write_output, CliError};
