pub mod cluster;
pub mod deployment;
pub mod hardware;
pub mod node;
pub mod service;
pub mod system;

#[cfg(test)]
pub mod test_support;
