pub mod derived;
pub mod format;
pub mod issuance;
pub mod snapshot;

// Re-export the types the role crate passes around
pub use derived::{DerivedMetrics, Ratio};
pub use snapshot::MetricsSnapshot;
