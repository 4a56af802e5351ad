use super::tree::{Target, Tree};
use crate::node::{Branch, LeafValues, Node, NodeId, NodeKind, NodeStats, Prediction};
use crate::utils::{add_scaled, argmax, safe_divisor, sum_squared_error};
use hashbrown::HashSet;
use log::debug;

/// A node on the aggregation stack with the statistics collected
/// from the children visited so far.
struct Frame {
    id: NodeId,
    next: usize,
    acc: Vec<f64>,
}

impl Frame {
    fn new(id: NodeId, len: usize) -> Self {
        Frame {
            id,
            next: 0,
            acc: vec![0.0; len],
        }
    }
}

fn next_owned(node: &Node, from: usize) -> Option<(usize, NodeId)> {
    node.branches()
        .iter()
        .enumerate()
        .skip(from)
        .find_map(|(i, b)| match b {
            Branch::Owned(child) => Some((i, *child)),
            _ => None,
        })
}

/// Summarise accumulated statistics as a single leaf would.
pub(crate) fn reduce(acc: &[f64], target: Target) -> NodeStats {
    match target {
        Target::Nominal { .. } => {
            let frequency: f64 = acc.iter().sum();
            let class = argmax(acc);
            let majority = acc.get(class).copied().unwrap_or(0.0);
            NodeStats {
                frequency,
                error: frequency - majority,
                prediction: Prediction::Class(class),
            }
        }
        Target::Metric => NodeStats {
            frequency: acc[0],
            error: sum_squared_error(acc[0], acc[1], acc[2]),
            prediction: Prediction::Value(acc[1] / safe_divisor(acc[0])),
        },
    }
}

impl Tree {
    /// Recompute frequency, error and prediction of every node, children
    /// before parents, and return the total frequency. Does nothing while
    /// the statistics are still current. Aliased branches are skipped so
    /// that shared subtrees are counted once.
    pub fn aggregate(&mut self) -> f64 {
        if let Some(total) = self.total {
            return total;
        }
        let target = self.target_type();
        let len = self.stats_len();
        let mut total = 0.0;
        let mut stack: Vec<Frame> = self.root.iter().map(|&id| Frame::new(id, len)).collect();
        while let Some(top) = stack.len().checked_sub(1) {
            let id = stack[top].id;
            if let Some((i, child)) = next_owned(&self.nodes[id], stack[top].next) {
                stack[top].next = i + 1;
                stack.push(Frame::new(child, len));
                continue;
            }
            let Some(mut frame) = stack.pop() else { break };
            let node = &mut self.nodes[id];
            node.add_leaf_stats(&mut frame.acc, 1.0);
            node.stats = match &node.kind {
                NodeKind::Leaf(LeafValues::Metric { mean, error, frequency }) => NodeStats {
                    frequency: *frequency,
                    error: *error,
                    prediction: Prediction::Value(*mean),
                },
                _ => reduce(&frame.acc, target),
            };
            let frequency = node.stats.frequency;
            match stack.last_mut() {
                Some(parent) => add_scaled(&mut parent.acc, &frame.acc, 1.0),
                None => total = frequency,
            }
        }
        debug!("aggregated {} nodes, total frequency {}", self.nodes.len(), total);
        self.total = Some(total);
        total
    }

    /// Total frequency of the tree, aggregating first if needed.
    pub fn total_frequency(&mut self) -> f64 {
        self.aggregate()
    }

    /// Attributes used as a test attribute by some reachable node.
    pub fn occurring_attributes(&self) -> HashSet<usize> {
        let mut marked = HashSet::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if let Some(attribute) = node.attribute() {
                marked.insert(attribute);
            }
            stack.extend(node.owned_children().map(|(_, child)| child));
        }
        marked
    }

    /// Number of attributes the tree tests on.
    pub fn occurring_attribute_count(&self) -> usize {
        self.occurring_attributes().len()
    }
}
