pub mod aggregation_cache;
pub mod cluster;
pub mod snapshot;
