//! Nested side branches grown off a freshly split step.

use crate::error::MapError;
use crate::types::NodeId;

use super::SegmentBuilder;

impl SegmentBuilder<'_> {
    /// Splits the nodes of step `index` again, level by level, and returns the new frontier.
    ///
    /// Each level multiplies the split chance by `split_decay` and allows at most
    /// `max_bonus_splits` splits. Nodes that do not split end their branch and join the
    /// frontier alongside the nodes of the last level generated.
    pub(crate) fn split_bonus_nodes(
        &mut self,
        split_nodes: Vec<NodeId>,
        path: &mut Vec<NodeId>,
        index: u32,
        total_steps: u32,
    ) -> Result<Vec<NodeId>, MapError> {
        let definition = self.definition;
        let step = 1.0 / total_steps as f32;
        let mut split_chance = definition.split_chance.evaluate(index as f32 * step);

        let mut generated = split_nodes;
        let mut endings = Vec::new();
        let mut depth = 1;
        while depth <= definition.max_split_depth {
            split_chance *= definition.split_decay;
            let distance =
                (index as f32 + depth as f32 / (definition.max_split_depth + 1) as f32) * step;
            let prefix = format!("{index}B{depth}");

            let mut splits = 0;
            let mut newly_generated = Vec::new();
            for node in generated {
                let split_again =
                    splits < definition.max_bonus_splits && self.rng.chance(split_chance);
                if !split_again {
                    endings.push(node);
                    continue;
                }
                splits += 1;

                let amount = self
                    .rng
                    .range_inclusive(definition.min_split_amount, definition.max_split_amount)
                    + 1;
                let mut children = Vec::with_capacity(amount as usize);
                for _ in 0..amount {
                    children.push(self.generate_node(
                        Some(node),
                        path,
                        definition.bonus_pool(),
                        &prefix,
                    )?);
                }
                for child in &children {
                    self.place(*child, distance, index);
                    if let Some(bonus_node) = self.graph.node_mut(*child) {
                        bonus_node.bonus = depth;
                        bonus_node.branch = splits;
                    }
                }
                self.set_neighbors(&children);
                for child in &children {
                    self.create_connection(node, *child, path);
                }
                path.extend_from_slice(&children);
                newly_generated.extend(children);
            }

            depth += 1;
            generated = newly_generated;
            if generated.is_empty() {
                break;
            }
        }

        endings.extend(generated);
        Ok(endings)
    }
}
