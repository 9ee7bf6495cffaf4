pub mod cluster_info;
pub mod node_info;
pub mod service_info;
