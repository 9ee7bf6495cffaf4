pub mod catalog;
pub mod cluster;
pub mod deployment;
pub mod hardware;
