//! Edge creation between consecutive node sets.

use crate::behavior;
use crate::graph::MapConnection;
use crate::types::{ConnectionId, NodeId, Point};
use crate::weighted::weighted_choice;

use super::{GENERATION_TARGET, SegmentBuilder};

/// Said when an edge breaks the destination's placement rules.
pub const UNEXPECTED_PATH_MESSAGE: &str = "I don't remember this path being here...";

impl SegmentBuilder<'_> {
    /// Connects every node of `previous` forward and every node of `current` backward.
    ///
    /// Previous nodes claim current nodes in order, taking the first valid unclaimed one and
    /// falling back to the first unclaimed one. Leftover previous nodes that already lead
    /// somewhere may detour; the rest attach to a random valid current node. Unclaimed
    /// current nodes receive an edge from a random valid undetoured predecessor.
    pub(crate) fn connect_nodes(
        &mut self,
        previous: &[NodeId],
        current: &[NodeId],
        path: &[NodeId],
    ) {
        if previous.is_empty() {
            return;
        }
        if current.is_empty() {
            tracing::error!(
                target: GENERATION_TARGET,
                "attempted to connect to an empty set of nodes"
            );
            return;
        }

        let mut remaining = current.to_vec();
        let mut detoured = Vec::new();
        let mut undetoured = Vec::new();

        for &from in previous {
            let to = if remaining.is_empty() {
                if self.may_detour(from) {
                    detoured.push(from);
                    continue;
                }
                let valid = self.valid_targets(from, current, path);
                match self.rng.pick(&valid).copied() {
                    Some(to) => to,
                    None => match self.rng.pick(current).copied() {
                        Some(to) => to,
                        None => continue,
                    },
                }
            } else {
                let slot = remaining
                    .iter()
                    .position(|candidate| self.graph.is_valid(*candidate, Some(from), path))
                    .unwrap_or(0);
                remaining.remove(slot)
            };
            undetoured.push(from);
            self.create_connection(from, to, path);
        }

        for to in remaining {
            let from = self.pick_source(&undetoured, to, path).or_else(|| {
                let fallback = self.pick_source(&detoured, to, path);
                if fallback.is_none() {
                    tracing::warn!(
                        target: GENERATION_TARGET,
                        "no valid predecessor for unclaimed node, connecting a random one"
                    );
                }
                fallback
            });
            let from = match from {
                Some(from) => Some(from),
                None if undetoured.is_empty() => self.rng.pick(&detoured).copied(),
                None => self.rng.pick(&undetoured).copied(),
            };
            if let Some(from) = from {
                self.create_connection(from, to, path);
            }
        }
    }

    /// Creates the edge `from -> to`, possibly carrying a hidden encounter.
    pub(crate) fn create_connection(
        &mut self,
        from: NodeId,
        to: NodeId,
        path: &[NodeId],
    ) -> ConnectionId {
        let definition = self.definition;
        let mut travel_messages = definition.connection.travel_messages.clone();
        let return_messages = definition.connection.return_messages.clone();

        if !self.graph.is_valid(to, Some(from), path) {
            tracing::warn!(target: GENERATION_TARGET, "connection breaks placement rules");
            travel_messages.push(UNEXPECTED_PATH_MESSAGE.to_string());
        }
        let (Some(start), Some(end)) = (self.graph.node(from), self.graph.node(to)) else {
            return self.graph.connect(empty_connection(from, to));
        };
        let midpoint = (start.distance + end.distance) / 2.0;
        let from_name = start.name.clone();
        let (index, bonus, branch) = (end.index, end.bonus, end.branch);
        behavior::on_connect_to(&end.kind, &mut travel_messages, &mut self.rng);

        let mut hidden_nodes = Vec::new();
        if !definition.hidden_nodes_to_generate.is_empty()
            && self.rng.chance(definition.hidden_node_chance.evaluate(midpoint))
            && let Some(policy) =
                weighted_choice(&definition.hidden_nodes_to_generate, &mut self.rng, |policy| {
                    policy.weight
                })
        {
            let name = format!("Hidden {from_name} {}", policy.node.name);
            let hidden = self.spawn(&policy.node, name);
            if let Some(node) = self.graph.node_mut(hidden) {
                node.hidden = true;
                node.distance = midpoint;
                node.index = index;
                node.bonus = bonus;
                node.branch = branch;
                node.neighbors = vec![hidden];
            }
            behavior::on_hidden_connect_to(&policy.node.kind, &mut travel_messages, &mut self.rng);
            hidden_nodes.push(hidden);
        }

        self.graph.connect(MapConnection {
            start: from,
            end: to,
            travel_messages,
            return_messages,
            hidden_nodes,
            line: [Point::ZERO; 2],
        })
    }

    fn may_detour(&mut self, from: NodeId) -> bool {
        let Some(node) = self.graph.node(from) else {
            return false;
        };
        if node.outgoing.is_empty() {
            return false;
        }
        let chance = self.definition.detour_chance.evaluate(node.distance);
        self.rng.chance(chance)
    }

    fn valid_targets(&self, from: NodeId, candidates: &[NodeId], path: &[NodeId]) -> Vec<NodeId> {
        candidates
            .iter()
            .copied()
            .filter(|candidate| self.graph.is_valid(*candidate, Some(from), path))
            .collect()
    }

    fn pick_source(&mut self, sources: &[NodeId], to: NodeId, path: &[NodeId]) -> Option<NodeId> {
        let valid: Vec<NodeId> = sources
            .iter()
            .copied()
            .filter(|source| self.graph.is_valid(to, Some(*source), path))
            .collect();
        self.rng.pick(&valid).copied()
    }
}

fn empty_connection(start: NodeId, end: NodeId) -> MapConnection {
    MapConnection {
        start,
        end,
        travel_messages: Vec::new(),
        return_messages: Vec::new(),
        hidden_nodes: Vec::new(),
        line: [Point::ZERO; 2],
    }
}
