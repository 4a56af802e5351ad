use crate::attributes::AttributeSet;
use crate::constants::METRIC_STATS_LEN;
use crate::errors::TreeError;
use crate::node::{Branch, LeafValues, Node, NodeId, NodeKind};
use log::debug;
use std::sync::Arc;

/// Kind of the target attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Classification over `classes` values.
    Nominal { classes: usize },
    /// Regression on an integer or real attribute.
    Metric,
}

/// A position a node can be created at: the root, or a branch of a test node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Root,
    Branch(NodeId, usize),
}

/// A decision or regression tree.
///
/// Nodes live in an arena and refer to their children by index. The tree
/// is built depth first through a cursor: nodes are created at the cursor,
/// and `move_down`/`move_up` walk a path stack. Derived statistics are
/// recomputed by [`Tree::aggregate`] after any change.
#[derive(Debug, Clone)]
pub struct Tree {
    attributes: Arc<AttributeSet>,
    target: usize,
    target_type: Target,
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: Option<NodeId>,
    cursor: Slot,
    path: Vec<Slot>,
    height: usize,
    /// Total frequency, `None` while stale.
    pub(crate) total: Option<f64>,
}

impl Tree {
    /// Create an empty tree. Without an explicit target the last
    /// attribute of the set is used.
    pub fn new(attributes: Arc<AttributeSet>, target: Option<usize>) -> Result<Self, TreeError> {
        let n = attributes.len();
        let target = match target {
            Some(t) => t,
            None => n.checked_sub(1).ok_or(TreeError::InvalidTarget(0, 0))?,
        };
        let attribute = attributes.get(target).ok_or(TreeError::InvalidTarget(target, n))?;
        let target_type = if attribute.is_nominal() {
            Target::Nominal {
                classes: attribute.value_count(),
            }
        } else {
            Target::Metric
        };
        Ok(Tree {
            attributes,
            target,
            target_type,
            nodes: Vec::new(),
            root: None,
            cursor: Slot::Root,
            path: Vec::new(),
            height: 0,
            total: None,
        })
    }

    pub fn attributes(&self) -> &Arc<AttributeSet> {
        &self.attributes
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn target_type(&self) -> Target {
        self.target_type
    }

    /// Number of classes, zero for a metric target.
    pub fn class_count(&self) -> usize {
        match self.target_type {
            Target::Nominal { classes } => classes,
            Target::Metric => 0,
        }
    }

    /// Length of the statistics buffer used by aggregation and inference.
    pub fn stats_len(&self) -> usize {
        match self.target_type {
            Target::Nominal { classes } => classes,
            Target::Metric => METRIC_STATS_LEN,
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Number of levels, a single leaf has height 1.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Depth of the cursor, zero at the root.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Whether statistics have to be recomputed before use.
    pub fn is_stale(&self) -> bool {
        self.total.is_none()
    }

    fn slot_content(&self, slot: Slot) -> Option<NodeId> {
        match slot {
            Slot::Root => self.root,
            Slot::Branch(parent, index) => match self.nodes[parent].branches()[index] {
                Branch::Owned(id) => Some(id),
                _ => None,
            },
        }
    }

    /// Node at the cursor, `None` if the cursor is on an empty slot.
    pub fn cursor_node(&self) -> Option<NodeId> {
        self.slot_content(self.cursor)
    }

    /// Create a node at the cursor: a test node on `attribute` with the
    /// given cut, or a leaf when `attribute` is `None`. The cursor stays on
    /// the new node. If allocation fails the tree is left unchanged.
    pub fn create_node(&mut self, attribute: Option<usize>, cut: f64) -> Result<NodeId, TreeError> {
        if self.cursor_node().is_some() {
            return Err(TreeError::CursorOccupied);
        }
        let node = match attribute {
            None => match self.target_type {
                Target::Nominal { classes } => {
                    let mut frequencies = Vec::new();
                    frequencies
                        .try_reserve_exact(classes)
                        .map_err(|_| TreeError::OutOfMemory)?;
                    frequencies.resize(classes, 0.0);
                    Node::leaf(LeafValues::Classes(frequencies))
                }
                Target::Metric => Node::leaf(LeafValues::Metric {
                    mean: 0.0,
                    error: 0.0,
                    frequency: 0.0,
                }),
            },
            Some(id) => {
                let attr = self.attributes.get(id).ok_or(TreeError::UnknownAttribute(id))?;
                let n_branches = if attr.is_nominal() { attr.value_count() } else { 2 };
                let mut branches = Vec::new();
                branches
                    .try_reserve_exact(n_branches)
                    .map_err(|_| TreeError::OutOfMemory)?;
                branches.resize(n_branches, Branch::Empty);
                Node::test(id, cut, branches)
            }
        };
        self.nodes.try_reserve(1).map_err(|_| TreeError::OutOfMemory)?;
        let id = self.nodes.len();
        self.nodes.push(node);
        match self.cursor {
            Slot::Root => self.root = Some(id),
            Slot::Branch(parent, index) => self.branches_mut(parent)[index] = Branch::Owned(id),
        }
        self.height = self.height.max(self.path.len() + 1);
        self.total = None;
        Ok(id)
    }

    pub fn create_leaf(&mut self) -> Result<NodeId, TreeError> {
        self.create_node(None, 0.0)
    }

    pub fn create_test(&mut self, attribute: usize, cut: f64) -> Result<NodeId, TreeError> {
        self.create_node(Some(attribute), cut)
    }

    fn branches_mut(&mut self, id: NodeId) -> &mut [Branch] {
        match &mut self.nodes[id].kind {
            NodeKind::Test { branches, .. } => branches,
            NodeKind::Leaf(_) => unreachable!("slots are only taken on test nodes"),
        }
    }

    /// The test node at the cursor together with a checked branch index.
    fn cursor_test(&self, index: usize) -> Result<NodeId, TreeError> {
        let id = self.cursor_node().ok_or(TreeError::CursorEmpty)?;
        let node = &self.nodes[id];
        if node.is_leaf() {
            return Err(TreeError::NotATestNode);
        }
        let len = node.branches().len();
        if index >= len {
            return Err(TreeError::IndexOutOfRange(index, len));
        }
        Ok(id)
    }

    /// Move the cursor into branch `index` of the current node, following
    /// aliases. Returns whether the branch holds a child; the cursor may
    /// end on an empty slot, where a node can then be created. With
    /// `check_only` the cursor is not moved.
    pub fn move_down(&mut self, index: usize, check_only: bool) -> Result<bool, TreeError> {
        let id = self.cursor_test(index)?;
        let node = &self.nodes[id];
        let resolved = node.resolve(index).ok_or(TreeError::AliasCycle(index, index))?;
        let exists = matches!(node.branches()[resolved], Branch::Owned(_));
        if !check_only {
            self.path.push(self.cursor);
            self.cursor = Slot::Branch(id, resolved);
        }
        Ok(exists)
    }

    /// Move the cursor to the parent, or straight to the root.
    pub fn move_up(&mut self, to_root: bool) -> Result<(), TreeError> {
        if to_root {
            self.path.clear();
            self.cursor = Slot::Root;
            return Ok(());
        }
        self.cursor = self.path.pop().ok_or(TreeError::AtRoot)?;
        Ok(())
    }

    pub fn move_to_root(&mut self) {
        self.path.clear();
        self.cursor = Slot::Root;
    }

    /// Let branch `src` of the current node share the subtree of branch
    /// `dst`. `src` must be empty and the node must test a nominal
    /// attribute. The alias is stored against the end of `dst`'s chain,
    /// so every alias resolves in one step.
    pub fn alias(&mut self, src: usize, dst: usize) -> Result<(), TreeError> {
        let id = self.cursor_test(src)?;
        if let Some(attribute) = self.nodes[id].attribute() {
            if self.attributes.get(attribute).is_some_and(|a| a.is_ordered()) {
                return Err(TreeError::OrderedAlias(attribute));
            }
        }
        let len = self.nodes[id].branches().len();
        if dst >= len {
            return Err(TreeError::IndexOutOfRange(dst, len));
        }
        if self.nodes[id].branches()[src] != Branch::Empty {
            return Err(TreeError::BranchOccupied(src));
        }
        let resolved = self.nodes[id].resolve(dst).ok_or(TreeError::AliasCycle(src, dst))?;
        if resolved == src {
            return Err(TreeError::AliasCycle(src, dst));
        }
        self.branches_mut(id)[src] = Branch::Alias(resolved);
        self.total = None;
        Ok(())
    }

    /// Index of the branch that `index` of the current node resolves to.
    pub fn resolve_alias(&self, index: usize) -> Result<usize, TreeError> {
        let id = self.cursor_test(index)?;
        self.nodes[id].resolve(index).ok_or(TreeError::AliasCycle(index, index))
    }

    fn cursor_leaf_mut(&mut self) -> Result<&mut LeafValues, TreeError> {
        let id = self.cursor_node().ok_or(TreeError::CursorEmpty)?;
        self.total = None;
        match &mut self.nodes[id].kind {
            NodeKind::Leaf(values) => Ok(values),
            NodeKind::Test { .. } => Err(TreeError::NotALeaf),
        }
    }

    fn class_slot(&mut self, class: usize) -> Result<&mut f64, TreeError> {
        match self.cursor_leaf_mut()? {
            LeafValues::Classes(frequencies) => {
                let n = frequencies.len();
                frequencies.get_mut(class).ok_or(TreeError::ClassOutOfRange(class, n))
            }
            LeafValues::Metric { .. } => Err(TreeError::TargetMismatch("nominal")),
        }
    }

    /// Set the frequency of a class in the leaf at the cursor.
    pub fn set_class_frequency(&mut self, class: usize, frequency: f64) -> Result<(), TreeError> {
        *self.class_slot(class)? = frequency;
        Ok(())
    }

    /// Add to the frequency of a class in the leaf at the cursor.
    pub fn add_class_frequency(&mut self, class: usize, frequency: f64) -> Result<(), TreeError> {
        *self.class_slot(class)? += frequency;
        Ok(())
    }

    /// Set mean, sum of squared residuals and frequency of the leaf at the cursor.
    pub fn set_leaf_value(&mut self, mean: f64, error: f64, frequency: f64) -> Result<(), TreeError> {
        match self.cursor_leaf_mut()? {
            LeafValues::Metric {
                mean: m,
                error: e,
                frequency: f,
            } => {
                *m = mean;
                *e = error;
                *f = frequency;
                Ok(())
            }
            LeafValues::Classes(_) => Err(TreeError::TargetMismatch("metric")),
        }
    }

    /// Free all nodes, children before parents, and return how many were
    /// freed. Aliased branches are not followed, so shared subtrees are
    /// freed once.
    pub fn clear(&mut self) -> usize {
        let mut freed = 0;
        let mut stack: Vec<(NodeId, bool)> = self.root.iter().map(|&id| (id, false)).collect();
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                freed += 1;
                continue;
            }
            stack.push((id, true));
            stack.extend(self.nodes[id].owned_children().map(|(_, child)| (child, false)));
        }
        debug!("freed {} of {} nodes", freed, self.nodes.len());
        self.nodes.clear();
        self.root = None;
        self.cursor = Slot::Root;
        self.path.clear();
        self.height = 0;
        self.total = None;
        freed
    }
}
