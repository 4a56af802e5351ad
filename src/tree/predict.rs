use super::tree::{Target, Tree};
use crate::attributes::Value;
use crate::errors::TreeError;
use crate::node::{add_metric_stats, Node, NodeId, Prediction};
use crate::utils::{argmax, safe_divisor};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of running one row through the tree.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Inference {
    pub prediction: Prediction,
    /// Training frequency behind the prediction.
    pub support: f64,
    /// Relative frequency of the predicted class, or the root mean
    /// squared residual of a metric prediction.
    pub confidence: f64,
}

impl Tree {
    /// Value of `attribute` in the row, or the attribute set's current
    /// instance if there is no row.
    fn value_of(&self, row: Option<&[Value]>, attribute: usize) -> Value {
        match row {
            Some(row) => row.get(attribute).copied().unwrap_or(Value::Null),
            None => self.attributes().instance(attribute),
        }
    }

    /// Branch a value takes at a test node, `None` for an unknown value.
    /// A value equal to the cut is unknown as well.
    fn route(&self, node: &Node, attribute: usize, value: Value) -> Option<usize> {
        let ordered = self.attributes().get(attribute).is_some_and(|a| a.is_ordered());
        if ordered {
            let cut = node.cut()?;
            let v = value.as_f64()?;
            if v == cut {
                None
            } else if v < cut {
                Some(0)
            } else {
                Some(1)
            }
        } else {
            match value {
                Value::Nominal(id) if id < node.branches().len() => Some(id),
                _ => None,
            }
        }
    }

    /// Add the statistics of the subtree at `id` scaled by `weight`. For a
    /// nominal target these are the class frequencies of all leaves below
    /// the node, for a metric target the node's aggregated statistics.
    fn add_subtree_stats(&self, id: NodeId, acc: &mut [f64], weight: f64) {
        match self.target_type() {
            Target::Metric => {
                let stats = &self.nodes[id].stats;
                let mean = match stats.prediction {
                    Prediction::Value(v) => v,
                    Prediction::Class(c) => c as f64,
                };
                add_metric_stats(acc, mean, stats.error, stats.frequency, weight);
            }
            Target::Nominal { .. } => {
                let mut stack = vec![id];
                while let Some(id) = stack.pop() {
                    let node = &self.nodes[id];
                    node.add_leaf_stats(acc, weight);
                    stack.extend(node.owned_children().map(|(_, child)| child));
                }
            }
        }
    }

    /// Collect the leaf statistics a row reaches.
    ///
    /// A known value follows its branch. A known value whose branch is
    /// empty was never seen below this node, with `weight >= 0` the node's
    /// own statistics are added scaled by `weight`. Unknown values, and
    /// unseen values when `weight < 0`, descend into every child and add
    /// up their contributions unweighted.
    fn accumulate(&self, row: Option<&[Value]>, weight: f64, acc: &mut [f64]) {
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            let Some(attribute) = node.attribute() else {
                node.add_leaf_stats(acc, 1.0);
                continue;
            };
            if let Some(index) = self.route(node, attribute, self.value_of(row, attribute)) {
                if let Some(child) = node.child(index) {
                    stack.push(child);
                    continue;
                }
                if weight >= 0.0 {
                    self.add_subtree_stats(id, acc, weight);
                    continue;
                }
            }
            stack.extend(node.owned_children().map(|(_, child)| child));
        }
    }

    fn finish(&self, acc: &[f64]) -> Inference {
        match self.target_type() {
            Target::Metric => {
                let (count, sum, sum_sq) = (acc[0], acc[1], acc[2]);
                let mean = sum / safe_divisor(count);
                // cancellation can leave a tiny negative residual
                let sse = (sum_sq - mean * sum).max(0.0);
                Inference {
                    prediction: Prediction::Value(mean),
                    support: count,
                    confidence: (sse / safe_divisor(count)).sqrt(),
                }
            }
            Target::Nominal { .. } => {
                let support: f64 = acc.iter().sum();
                let class = argmax(acc);
                let frequency = acc.get(class).copied().unwrap_or(0.0);
                Inference {
                    prediction: Prediction::Class(class),
                    support,
                    confidence: (frequency / safe_divisor(support)).clamp(0.0, 1.0),
                }
            }
        }
    }

    fn infer(&self, row: Option<&[Value]>, weight: f64) -> Inference {
        let mut acc = vec![0.0; self.stats_len()];
        self.accumulate(row, weight, &mut acc);
        self.finish(&acc)
    }

    /// Classify a row, or predict its target value.
    ///
    /// Without a row the attribute set's current instance is used.
    /// `weight` scales the fallback for values that did not occur below
    /// a node during training, a negative weight treats them as unknown.
    /// The tree must have been aggregated since its last change.
    pub fn predict(&self, row: Option<&[Value]>, weight: f64) -> Result<Inference, TreeError> {
        if self.is_stale() {
            return Err(TreeError::NotAggregated);
        }
        Ok(self.infer(row, weight))
    }

    /// Predict many rows in parallel.
    pub fn predict_rows<R>(&self, rows: &[R], weight: f64) -> Result<Vec<Inference>, TreeError>
    where
        R: AsRef<[Value]> + Sync,
    {
        if self.is_stale() {
            return Err(TreeError::NotAggregated);
        }
        Ok(rows.par_iter().map(|row| self.infer(Some(row.as_ref()), weight)).collect())
    }
}
