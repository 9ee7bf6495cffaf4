pub mod node_prober;
pub mod probe_parser;
