use std::collections::{BTreeMap, HashSet};

use crate::domain::cluster::model::node_info::NodeInfo;

/// Polls a node may be missing from before it is dropped.
pub const MISSED_POLLS_BEFORE_REMOVAL: u32 = 2;

struct RosterEntry {
    last_seen: NodeInfo,
    missed: u32,
}

/// Debounces node membership across successful polls: a node missing from one
/// listing is kept as `Unknown`, and dropped once it has been missing from
/// `MISSED_POLLS_BEFORE_REMOVAL` consecutive listings.
#[derive(Default)]
pub struct NodeRoster {
    entries: BTreeMap<String, RosterEntry>,
}

impl NodeRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one successful listing into the roster and returns the nodes to
    /// publish, ordered by name.
    pub fn observe(&mut self, listed: Vec<NodeInfo>) -> Vec<NodeInfo> {
        let present: HashSet<String> = listed.iter().map(|n| n.name.clone()).collect();

        self.entries.retain(|name, entry| {
            if present.contains(name) {
                return true;
            }
            entry.missed += 1;
            entry.missed < MISSED_POLLS_BEFORE_REMOVAL
        });

        for node in listed {
            self.entries.insert(
                node.name.clone(),
                RosterEntry {
                    last_seen: node,
                    missed: 0,
                },
            );
        }

        self.entries
            .values()
            .map(|entry| match entry.missed {
                0 => entry.last_seen.clone(),
                _ => entry.last_seen.as_unknown(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::fake_cluster_api::k8s_node;
    use crate::core::client::mappers::map_node_to_info;
    use crate::domain::cluster::model::node_info::NodeStatus;

    fn node(name: &str) -> NodeInfo {
        map_node_to_info(&k8s_node(name, true, None), 3).unwrap()
    }

    fn names(nodes: &[NodeInfo]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn node_missing_once_is_kept_as_unknown() {
        let mut roster = NodeRoster::new();
        roster.observe(vec![node("rpi1"), node("rpi2")]);

        let published = roster.observe(vec![node("rpi1")]);

        assert_eq!(names(&published), vec!["rpi1", "rpi2"]);
        assert_eq!(published[1].status, NodeStatus::Unknown);
        assert_eq!(published[1].metrics.pods_running, 0);
    }

    #[test]
    fn node_missing_twice_is_removed() {
        let mut roster = NodeRoster::new();
        roster.observe(vec![node("rpi1"), node("rpi2")]);
        roster.observe(vec![node("rpi1")]);

        let published = roster.observe(vec![node("rpi1")]);

        assert_eq!(names(&published), vec!["rpi1"]);
    }

    #[test]
    fn reappearing_node_resets_its_miss_count() {
        let mut roster = NodeRoster::new();
        roster.observe(vec![node("rpi1"), node("rpi2")]);
        roster.observe(vec![node("rpi1")]);
        roster.observe(vec![node("rpi1"), node("rpi2")]);

        let published = roster.observe(vec![node("rpi1")]);

        assert_eq!(names(&published), vec!["rpi1", "rpi2"]);
        assert_eq!(published[1].status, NodeStatus::Unknown);
    }
}
