//! Cross-product relationship and ranking engine for merchandising
//! decisions: zombie skus, margin ranking, slow movers, cannibalization,
//! new-product benchmarks and bundle candidates, consolidated into one
//! priority-ordered recommendation list and a per-sku traffic light.

pub mod aggregate;
pub mod analyzer;
pub mod benchmark;
pub mod bundle_analyzer;
pub mod cannibalization_analyzer;
pub mod config;
pub mod engine;
pub mod error;
pub mod impact;
pub mod launch_analyzer;
pub mod margin_analyzer;
pub mod pairwise;
pub mod rationalization_analyzer;
pub mod recommendation;
pub mod scoring;
pub mod slow_mover_analyzer;
pub mod snapshot;
pub mod source;
pub mod stats;
pub mod store;
pub mod types;
