//! Node registry types

use serde::{Deserialize, Serialize};

/// Role of a node, which decides how it is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An ordinary data system module
    FleetMember,
    /// The control host running `dsm_server`
    LocalController,
    /// An auxiliary service host (e.g. nimbus)
    NamedService,
}

/// A remote, independently controllable unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub display_name: String,
    /// Host name or address the node's command server answers on
    pub address: String,
    pub kind: NodeKind,
}

impl Node {
    /// Create a node
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        address: impl Into<String>,
        kind: NodeKind,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            address: address.into(),
            kind,
        }
    }

    /// A fleet member reported by the listing; its id is its host name
    #[must_use]
    pub fn fleet_member(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            address: id.clone(),
            id,
            display_name: display_name.into(),
            kind: NodeKind::FleetMember,
        }
    }

    /// Fixed-width list label, display name padded with underscores
    ///
    /// Fleet members lead with their id; well-known entries lead with a
    /// blank placeholder so the columns still line up.
    #[must_use]
    pub fn label(&self, width: usize) -> String {
        let prefix = match self.kind {
            NodeKind::FleetMember => self.id.as_str(),
            NodeKind::LocalController | NodeKind::NamedService => "______",
        };
        let padding = width.saturating_sub(self.display_name.chars().count());
        format!("{prefix} {}{}", self.display_name, "_".repeat(padding))
    }
}

/// Narrowest label column, even for short names
pub const MIN_LABEL_WIDTH: usize = 10;

/// The fleet as returned by one listing query
///
/// Order is the listing order followed by the well-known entries; it is
/// never re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    nodes: Vec<Node>,
}

impl FleetSnapshot {
    /// Wrap an ordered node list
    #[must_use]
    pub const fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Look up a node by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Iterate nodes in display order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// All nodes in display order
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the snapshot is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Label column width: the longest fleet member display name
    #[must_use]
    pub fn label_width(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::FleetMember)
            .map(|n| n.display_name.chars().count())
            .max()
            .unwrap_or_default()
            .max(MIN_LABEL_WIDTH)
    }
}

impl<'a> IntoIterator for &'a FleetSnapshot {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fleet_member_address_is_its_id() {
        let node = Node::fleet_member("dsm319", "fuselage");
        assert_eq!(node.address, "dsm319");
        assert_eq!(node.kind, NodeKind::FleetMember);
    }

    #[test]
    fn labels_pad_to_width() {
        let member = Node::fleet_member("dsm319", "nose");
        assert_eq!(member.label(10), "dsm319 nose______");

        let server = Node::new("dsm_server", "dsm_server", "localhost", NodeKind::LocalController);
        assert_eq!(server.label(12), "______ dsm_server__");
    }

    #[test]
    fn label_width_has_floor_and_ignores_well_known() {
        let fleet = FleetSnapshot::new(vec![
            Node::fleet_member("dsm301", "wing"),
            Node::new("x", "a_very_long_service_name", "x", NodeKind::NamedService),
        ]);
        assert_eq!(fleet.label_width(), MIN_LABEL_WIDTH);

        let fleet = FleetSnapshot::new(vec![Node::fleet_member("dsm302", "left_wing_pod_b")]);
        assert_eq!(fleet.label_width(), 15);
    }
}
