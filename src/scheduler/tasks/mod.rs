pub mod cluster;
pub mod hardware;
pub mod services;
