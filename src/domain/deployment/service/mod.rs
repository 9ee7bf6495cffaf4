pub mod deployment_orchestrator;
pub mod workload_manifest;
