//! Arena-backed node and connection storage for generated maps.

use slotmap::SlotMap;

use crate::behavior::{NodeKind, NodeTemplate, PlacementRules};
use crate::definition::MapDefinition;
use crate::seed::MapRng;
use crate::types::{ConnectionId, NodeId, Point, TravelDirection};

#[derive(Clone, Debug)]
pub struct MapNode {
    pub name: String,
    pub kind: NodeKind,
    pub rules: PlacementRules,
    /// Normalized position from start (0) to end (1).
    pub distance: f32,
    /// Generation step the node belongs to.
    pub index: u32,
    /// Split depth; zero on the main path.
    pub bonus: u32,
    /// Ordinal of the bonus split group within its depth, zero on the main path.
    pub branch: u32,
    pub hidden: bool,
    /// Siblings generated in the same slice, including this node.
    pub neighbors: Vec<NodeId>,
    pub outgoing: Vec<ConnectionId>,
    pub incoming: Vec<ConnectionId>,
    pub position: Point,
    pub selectable: bool,
    /// Hidden nodes flip this once their connection has been travelled.
    pub revealed: bool,
    pub triggered: bool,
}

impl MapNode {
    pub fn from_template(template: &NodeTemplate) -> Self {
        Self {
            name: template.name.clone(),
            kind: template.kind.clone(),
            rules: template.rules.clone(),
            distance: 0.0,
            index: 0,
            bonus: 0,
            branch: 0,
            hidden: false,
            neighbors: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            position: Point::ZERO,
            selectable: false,
            revealed: false,
            triggered: false,
        }
    }

    pub fn is_bonus(&self) -> bool {
        self.bonus > 0
    }

    pub fn is_single(&self) -> bool {
        self.neighbors.len() == 1
    }
}

#[derive(Clone, Debug)]
pub struct MapConnection {
    pub start: NodeId,
    pub end: NodeId,
    pub travel_messages: Vec<String>,
    pub return_messages: Vec<String>,
    /// Encounters revealed while travelling, evenly spaced along the edge.
    pub hidden_nodes: Vec<NodeId>,
    /// Rendered line endpoints, resynced by layout.
    pub line: [Point; 2],
}

impl MapConnection {
    pub fn other_end(&self, node: NodeId) -> NodeId {
        if self.start == node { self.end } else { self.start }
    }

    pub fn messages(&self, direction: TravelDirection) -> &[String] {
        match direction {
            TravelDirection::Forward => &self.travel_messages,
            TravelDirection::Backtrack => &self.return_messages,
        }
    }

    /// Uniformly picks a flavor message for the given travel direction.
    pub fn pick_message(&self, direction: TravelDirection, rng: &mut MapRng) -> Option<&str> {
        rng.pick(self.messages(direction)).map(String::as_str)
    }
}

/// Owns every node and connection of a map.
#[derive(Clone, Debug, Default)]
pub struct MapGraph {
    pub(crate) nodes: SlotMap<NodeId, MapNode>,
    pub(crate) connections: SlotMap<ConnectionId, MapConnection>,
}

impl MapGraph {
    pub fn node(&self, id: NodeId) -> Option<&MapNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut MapNode> {
        self.nodes.get_mut(id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&MapConnection> {
        self.connections.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &MapNode)> {
        self.nodes.iter()
    }

    pub fn connections(&self) -> impl Iterator<Item = (ConnectionId, &MapConnection)> {
        self.connections.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub(crate) fn insert_node(&mut self, node: MapNode) -> NodeId {
        self.nodes.insert(node)
    }

    /// Adds a directed edge; the start node owns it, the end node only references it.
    pub(crate) fn connect(&mut self, connection: MapConnection) -> ConnectionId {
        let (start, end) = (connection.start, connection.end);
        let id = self.connections.insert(connection);
        if let Some(node) = self.nodes.get_mut(start) {
            node.outgoing.push(id);
        }
        if let Some(node) = self.nodes.get_mut(end) {
            node.incoming.push(id);
        }
        id
    }

    /// Edge leading from `from` to `to`, if any.
    pub fn connection_between(&self, from: NodeId, to: NodeId) -> Option<ConnectionId> {
        let node = self.nodes.get(from)?;
        node.outgoing.iter().copied().find(|id| self.connections[*id].end == to)
    }

    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|node| node.outgoing.iter().map(|edge| self.connections[*edge].end))
    }

    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|node| node.incoming.iter().map(|edge| self.connections[*edge].start))
    }

    /// Whether `candidate` may follow `previous` given the nodes already on `path`.
    pub fn is_valid(&self, candidate: NodeId, previous: Option<NodeId>, path: &[NodeId]) -> bool {
        let Some(node) = self.nodes.get(candidate) else {
            return false;
        };
        let tag = node.kind.tag();
        let same_tag_on_path = path
            .iter()
            .filter(|id| **id != candidate)
            .filter_map(|id| self.nodes.get(*id))
            .filter(|other| other.kind.tag() == tag)
            .count();
        let previous_tag = previous.and_then(|id| self.nodes.get(id)).map(|prev| prev.kind.tag());
        node.rules.permits(previous_tag, same_tag_on_path)
    }

    /// Template counterpart of [`MapGraph::is_valid`] for nodes that do not exist yet.
    pub fn template_fits(
        &self,
        template: &NodeTemplate,
        previous: Option<NodeId>,
        path: &[NodeId],
    ) -> bool {
        let tag = template.kind.tag();
        let same_tag_on_path = path
            .iter()
            .filter_map(|id| self.nodes.get(*id))
            .filter(|other| other.kind.tag() == tag)
            .count();
        let previous_tag = previous.and_then(|id| self.nodes.get(id)).map(|prev| prev.kind.tag());
        template.rules.permits(previous_tag, same_tag_on_path)
    }

    /// Snaps every connection line back onto its endpoints and spaces hidden nodes along it.
    pub fn sync_connections(&mut self) {
        let Self { nodes, connections } = self;
        for connection in connections.values_mut() {
            let (Some(start), Some(end)) = (nodes.get(connection.start), nodes.get(connection.end))
            else {
                continue;
            };
            let (from, to) = (start.position, end.position);
            connection.line = [from, to];
            let slots = connection.hidden_nodes.len() + 1;
            for (k, hidden) in connection.hidden_nodes.iter().enumerate() {
                if let Some(node) = nodes.get_mut(*hidden) {
                    node.position = from.lerp(to, (k + 1) as f32 / slots as f32);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
    }
}

/// One generated set of paths sharing a start node and a set of ends.
#[derive(Clone, Debug)]
pub struct MapSegment {
    pub paths: Vec<Vec<NodeId>>,
    pub start: NodeId,
    pub ends: Vec<NodeId>,
    pub definition: MapDefinition,
    pub seed: u64,
}

impl MapSegment {
    /// Every visible node of the segment, each listed once, in path order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut seen = Vec::new();
        for id in self.paths.iter().flatten() {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }

    pub fn is_end(&self, id: NodeId) -> bool {
        self.ends.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{NodeTag, NodeTemplate};

    fn node(name: &str, kind: NodeKind) -> MapNode {
        MapNode::from_template(&NodeTemplate::new(name, kind))
    }

    fn edge(start: NodeId, end: NodeId) -> MapConnection {
        MapConnection {
            start,
            end,
            travel_messages: vec!["onward".to_string()],
            return_messages: vec!["back".to_string()],
            hidden_nodes: Vec::new(),
            line: [Point::ZERO; 2],
        }
    }

    #[test]
    fn connect_registers_outgoing_and_incoming_edges() {
        let mut graph = MapGraph::default();
        let a = graph.insert_node(node("a", NodeKind::Movement));
        let b = graph.insert_node(node("b", NodeKind::Movement));
        let id = graph.connect(edge(a, b));

        assert_eq!(graph.node(a).unwrap().outgoing, vec![id]);
        assert_eq!(graph.node(b).unwrap().incoming, vec![id]);
        assert_eq!(graph.connection_between(a, b), Some(id));
        assert_eq!(graph.connection_between(b, a), None);
        assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![b]);
        assert_eq!(graph.predecessors(b).collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn validity_uses_predecessor_tag_and_path_counts() {
        let mut graph = MapGraph::default();
        let fight = NodeKind::Battle { scene: "Battle".to_string() };
        let first = graph.insert_node(node("first", fight.clone()));
        let rules = PlacementRules { not_after: vec![NodeTag::Battle], max_per_path: Some(1) };
        let template = NodeTemplate::new("second", fight).with_rules(rules);

        assert!(!graph.template_fits(&template, Some(first), &[]));
        assert!(!graph.template_fits(&template, None, &[first]));
        assert!(graph.template_fits(&template, None, &[]));

        let second = graph.insert_node(MapNode::from_template(&template));
        assert!(graph.is_valid(second, None, &[second]));
        assert!(!graph.is_valid(second, Some(first), &[second]));
    }

    #[test]
    fn sync_connections_spaces_hidden_nodes_along_the_line() {
        let mut graph = MapGraph::default();
        let a = graph.insert_node(node("a", NodeKind::Movement));
        let b = graph.insert_node(node("b", NodeKind::Movement));
        let hidden = graph.insert_node(node("h", NodeKind::Movement));
        graph.node_mut(b).unwrap().position = Point::new(10.0, 20.0);
        let mut connection = edge(a, b);
        connection.hidden_nodes.push(hidden);
        let id = graph.connect(connection);

        graph.sync_connections();
        graph.sync_connections();

        assert_eq!(graph.connection(id).unwrap().line, [Point::ZERO, Point::new(10.0, 20.0)]);
        assert_eq!(graph.node(hidden).unwrap().position, Point::new(5.0, 10.0));
    }

    #[test]
    fn messages_follow_travel_direction() {
        let mut graph = MapGraph::default();
        let a = graph.insert_node(node("a", NodeKind::Movement));
        let b = graph.insert_node(node("b", NodeKind::Movement));
        let connection = edge(a, b);
        let mut rng = MapRng::new(5);
        assert_eq!(connection.pick_message(TravelDirection::Forward, &mut rng), Some("onward"));
        assert_eq!(connection.pick_message(TravelDirection::Backtrack, &mut rng), Some("back"));
        assert_eq!(connection.other_end(a), b);
    }
}
