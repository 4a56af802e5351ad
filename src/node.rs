use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node in the tree's arena.
pub type NodeId = usize;

/// One slot of a test node's branch array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Branch {
    /// No subtree was seen for this value.
    #[default]
    Empty,
    /// The branch owns a child node.
    Owned(NodeId),
    /// The branch shares the subtree of another branch of the same node.
    Alias(usize),
}

/// The predicted class id (nominal target) or value (metric target).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub enum Prediction {
    Class(usize),
    Value(f64),
}

impl Default for Prediction {
    fn default() -> Self {
        Prediction::Class(0)
    }
}

/// Statistics of the subtree rooted at a node, as if it were a single leaf.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct NodeStats {
    pub frequency: f64,
    /// Misclassified frequency or sum of squared residuals.
    pub error: f64,
    pub prediction: Prediction,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum LeafValues {
    /// One frequency per class of a nominal target.
    Classes(Vec<f64>),
    /// Mean, sum of squared residuals and frequency of a metric target.
    Metric { mean: f64, error: f64, frequency: f64 },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum NodeKind {
    Leaf(LeafValues),
    Test {
        attribute: usize,
        /// Only meaningful for ordered attributes.
        cut: f64,
        branches: Vec<Branch>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub stats: NodeStats,
}

impl Node {
    pub fn leaf(values: LeafValues) -> Self {
        Node {
            kind: NodeKind::Leaf(values),
            stats: NodeStats::default(),
        }
    }

    pub fn test(attribute: usize, cut: f64, branches: Vec<Branch>) -> Self {
        Node {
            kind: NodeKind::Test {
                attribute,
                cut,
                branches,
            },
            stats: NodeStats::default(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn attribute(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Test { attribute, .. } => Some(attribute),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn cut(&self) -> Option<f64> {
        match self.kind {
            NodeKind::Test { cut, .. } => Some(cut),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Branch array, empty for a leaf.
    pub fn branches(&self) -> &[Branch] {
        match &self.kind {
            NodeKind::Test { branches, .. } => branches,
            NodeKind::Leaf(_) => &[],
        }
    }

    /// Follow the alias chain starting at `index` to the first branch
    /// that is not an alias. `None` if the index is out of range or the
    /// chain does not terminate.
    pub fn resolve(&self, index: usize) -> Option<usize> {
        let branches = self.branches();
        let mut i = index;
        for _ in 0..=branches.len() {
            match branches.get(i)? {
                Branch::Alias(j) => i = *j,
                _ => return Some(i),
            }
        }
        None
    }

    /// The child a branch leads to, through aliases.
    pub fn child(&self, index: usize) -> Option<NodeId> {
        match self.branches().get(self.resolve(index)?)? {
            Branch::Owned(id) => Some(*id),
            _ => None,
        }
    }

    /// Branches that own their child, aliases are skipped.
    pub fn owned_children(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.branches().iter().enumerate().filter_map(|(i, b)| match b {
            Branch::Owned(id) => Some((i, *id)),
            _ => None,
        })
    }

    /// Add the sufficient statistics of a leaf, scaled by `weight`,
    /// onto `acc`: class frequencies for a nominal target or
    /// (frequency, frequency * mean, sum of squares) for a metric one.
    pub fn add_leaf_stats(&self, acc: &mut [f64], weight: f64) {
        match &self.kind {
            NodeKind::Leaf(LeafValues::Classes(frequencies)) => {
                crate::utils::add_scaled(acc, frequencies, weight);
            }
            NodeKind::Leaf(LeafValues::Metric { mean, error, frequency }) => {
                add_metric_stats(acc, *mean, *error, *frequency, weight);
            }
            NodeKind::Test { .. } => {}
        }
    }
}

/// Accumulate (f, f * mean, error + f * mean^2) scaled by `weight`.
#[inline]
pub fn add_metric_stats(acc: &mut [f64], mean: f64, error: f64, frequency: f64, weight: f64) {
    let sum = frequency * mean;
    acc[0] += weight * frequency;
    acc[1] += weight * sum;
    acc[2] += weight * (error + sum * mean);
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            NodeKind::Leaf(_) => write!(f, "leaf,frequency={},error={}", self.stats.frequency, self.stats.error),
            NodeKind::Test {
                attribute,
                cut,
                branches,
            } => write!(
                f,
                "[{} | {}] branches={},frequency={},error={}",
                attribute,
                cut,
                branches.len(),
                self.stats.frequency,
                self.stats.error
            ),
        }
    }
}
