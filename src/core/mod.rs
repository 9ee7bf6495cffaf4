pub mod client;
pub mod config;
pub mod logging;
pub mod ssh;
pub mod state;
pub mod util;
