
pub mod analytics;
pub mod builder;
pub mod graph;
// Re-export for easy access
pub use analytics::GraphAnalytics;
pub use builder::GraphBuilder;
