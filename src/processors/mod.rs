pub mod canton_join;
pub mod dedup_tracker;
pub mod normalizer;
pub mod referential_filter;
pub mod surrogate_keys;

pub use canton_join::{build_region_mapping, region_mapping_from_store};
pub use dedup_tracker::{dedup_within_batch, DedupOutcome, DedupTracker};
pub use normalizer::{normalize, FromRow};
pub use referential_filter::{FilterOutcome, ReferentialFilter};
pub use surrogate_keys::{SurrogateKeyGenerator, SurrogateKeyMode};
