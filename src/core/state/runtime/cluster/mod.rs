pub mod node_roster;
