pub mod probe_error;
pub mod probe_transport;
pub mod ssh_session_pool;
pub mod ssh_target;
