pub mod runtime_snapshot;
pub mod runtime_snapshot_repository;
