//! Cluster confidence scoring

mod confidence;

pub use confidence::{compactness, score, size_term, ClusterEvidence, ConfidenceScore};
