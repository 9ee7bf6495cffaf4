//! API route declarations (/api/*)

pub mod cluster_routes;
pub mod deployment_routes;
pub mod hardware_routes;
pub mod system_routes;
