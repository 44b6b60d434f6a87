//! Team coverage conflict detection.

pub mod detector;
pub mod types;

pub use detector::ConflictDetector;
pub use types::{
    Absence, ConflictFinding, ConflictQuery, ConflictReport, CoverageThresholds, DailyCoverage,
    FindingKind, Severity,
};
