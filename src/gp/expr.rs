//! Items related to expressions.
//!
//! An expression is a binary tree stored within a `StableDiGraph`. Edges point from a parent
//! node to its child and are weighted by the `Slot` the child occupies. Every node has at most
//! one incoming edge, so the graph doubles as the parent back-link used for depth queries and
//! re-parenting. Node indices remain stable while subtrees are removed and grafted.

use crate::error::{Error, Result};
use fnv::FnvHashSet;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::{Incoming, Outgoing};
use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::str::FromStr;

/// The directed graph type used to represent an expression.
pub type Graph = StableDiGraph<Node, Slot, u32>;

/// The node index type used within the expression graph.
pub type NodeIndex = petgraph::stable_graph::NodeIndex<u32>;

/// One of the two inputs an expression is evaluated against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Var {
    A,
    B,
}

/// The operators available to internal nodes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    /// `1.0` if the left operand is greater than the right, otherwise `-1.0`.
    Gt,
    /// Absolute value of the single (left) operand.
    Abs,
}

/// A single element of an expression tree.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Node {
    Var(Var),
    Const(f64),
    Op(Op),
}

/// The child position a node occupies beneath its parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Left,
    Right,
}

/// An expression tree along with the fitness it achieved and the generation it was born in.
///
/// Cloning a tree clones the entire node graph, so a clone never shares structure with its
/// source.
#[derive(Clone, Debug, Default)]
pub struct Tree {
    graph: Graph,
    root: Option<NodeIndex>,
    /// Mean reward per episode.
    pub score: f64,
    /// Mean number of steps per episode.
    pub steps: f64,
    /// The generation in which the tree was born.
    pub generation: u64,
}

// Impls.

impl Var {
    pub fn symbol(&self) -> &'static str {
        match *self {
            Var::A => "a",
            Var::B => "b",
        }
    }
}

impl Op {
    /// All operators that take two operands.
    pub const BINARY: [Op; 5] = [Op::Add, Op::Sub, Op::Mul, Op::Div, Op::Gt];

    /// The number of operands consumed by the operator.
    pub fn arity(&self) -> u32 {
        match *self {
            Op::Abs => 1,
            _ => 2,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match *self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Gt => ">",
            Op::Abs => "abs",
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        let op = match s {
            "+" => Op::Add,
            "-" => Op::Sub,
            "*" => Op::Mul,
            "/" => Op::Div,
            ">" => Op::Gt,
            "abs" => Op::Abs,
            _ => return None,
        };
        Some(op)
    }

    /// Apply the operator. `y` is ignored by unary operators.
    ///
    /// Non-finite results (including division by zero) are normalised to `0.0`.
    pub fn apply(&self, x: f64, y: f64) -> f64 {
        let result = match *self {
            Op::Add => x + y,
            Op::Sub => x - y,
            Op::Mul => x * y,
            Op::Div => x / y,
            Op::Gt => if x > y { 1.0 } else { -1.0 },
            Op::Abs => x.abs(),
        };
        if result.is_finite() { result } else { 0.0 }
    }
}

impl Node {
    /// The number of children the node must have.
    pub fn arity(&self) -> u32 {
        match *self {
            Node::Op(ref op) => op.arity(),
            Node::Var(_) | Node::Const(_) => 0,
        }
    }
}

impl FromStr for Node {
    type Err = Error;
    fn from_str(token: &str) -> Result<Self> {
        match token {
            "a" => return Ok(Node::Var(Var::A)),
            "b" => return Ok(Node::Var(Var::B)),
            _ => (),
        }
        if let Some(op) = Op::from_symbol(token) {
            return Ok(Node::Op(op));
        }
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Node::Const(value)),
            _ => Err(Error::UnknownToken(token.to_string())),
        }
    }
}

impl Tree {
    /// An empty tree with zeroed fitness.
    pub fn new() -> Self {
        Tree::default()
    }

    /// A tree consisting of a single variable leaf.
    pub fn var(var: Var) -> Self {
        let mut tree = Tree::new();
        tree.root = Some(tree.graph.add_node(Node::Var(var)));
        tree
    }

    /// Build a tree from whitespace separated postfix tokens, e.g. `"a b + abs"`.
    pub fn from_postfix(postfix: &str) -> Result<Self> {
        let tokens = postfix
            .split_whitespace()
            .map(str::parse::<Node>)
            .collect::<Result<Vec<Node>>>()?;
        Tree::from_tokens(tokens)
    }

    /// Assemble a tree from nodes given in postfix order.
    ///
    /// Operands push a leaf. Operators pop their operands (right first) and push the combined
    /// subtree.
    pub fn from_tokens<I>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = Node>,
    {
        let mut tree = Tree::new();
        let mut stack: Vec<NodeIndex> = vec![];
        for node in tokens {
            let nx = tree.graph.add_node(node);
            if let Node::Op(op) = node {
                let missing = || Error::MissingOperand { op };
                let right = if op.arity() > 1 {
                    Some(stack.pop().ok_or_else(missing)?)
                } else {
                    None
                };
                let left = stack.pop().ok_or_else(missing)?;
                tree.graph.add_edge(nx, left, Slot::Left);
                if let Some(right) = right {
                    tree.graph.add_edge(nx, right, Slot::Right);
                }
            }
            stack.push(nx);
        }
        match stack.len() {
            0 => Err(Error::EmptyExpression),
            1 => {
                tree.root = stack.pop();
                Ok(tree)
            }
            n => Err(Error::DanglingOperands(n)),
        }
    }

    /// The root node of the tree, or `None` if the tree is empty.
    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The element stored at the given node.
    pub fn node(&self, nx: NodeIndex) -> &Node {
        &self.graph[nx]
    }

    /// The child of `nx` occupying the given slot.
    pub fn child(&self, nx: NodeIndex, slot: Slot) -> Option<NodeIndex> {
        self.graph
            .edges_directed(nx, Outgoing)
            .find(|e| *e.weight() == slot)
            .map(|e| e.target())
    }

    /// The parent of `nx` along with the slot `nx` occupies, or `None` for the root.
    pub fn parent(&self, nx: NodeIndex) -> Option<(NodeIndex, Slot)> {
        self.graph
            .edges_directed(nx, Incoming)
            .next()
            .map(|e| (e.source(), *e.weight()))
    }

    /// Whether or not the node has no children.
    pub fn is_leaf(&self, nx: NodeIndex) -> bool {
        self.graph.neighbors_directed(nx, Outgoing).next().is_none()
    }

    /// The number of edges between the root and the given node.
    pub fn node_depth(&self, nx: NodeIndex) -> u32 {
        let mut depth = 0;
        let mut curr = nx;
        while let Some((parent, _)) = self.parent(curr) {
            curr = parent;
            depth += 1;
        }
        depth
    }

    /// All nodes in preorder (node, left subtree, right subtree).
    pub fn positions(&self) -> Vec<NodeIndex> {
        let mut positions = Vec::with_capacity(self.graph.node_count());
        let mut stack: Vec<NodeIndex> = self.root.into_iter().collect();
        while let Some(nx) = stack.pop() {
            positions.push(nx);
            stack.extend(self.child(nx, Slot::Right));
            stack.extend(self.child(nx, Slot::Left));
        }
        positions
    }

    /// The number of nodes within the tree.
    pub fn size(&self) -> usize {
        self.graph.node_count()
    }

    /// The greatest depth of any node within the tree. Both an empty tree and a single leaf
    /// have a depth of `0`.
    pub fn depth(&self) -> u32 {
        let mut max = 0;
        let mut stack: Vec<(NodeIndex, u32)> = self.root.map(|r| (r, 0)).into_iter().collect();
        while let Some((nx, depth)) = stack.pop() {
            max = max.max(depth);
            stack.extend(self.graph.neighbors_directed(nx, Outgoing).map(|c| (c, depth + 1)));
        }
        max
    }

    /// Evaluate the expression for the inputs `a` and `b`. An empty tree evaluates to `0.0`.
    pub fn evaluate(&self, a: f64, b: f64) -> f64 {
        match self.root {
            Some(root) => self.evaluate_node(root, a, b),
            None => 0.0,
        }
    }

    fn evaluate_node(&self, nx: NodeIndex, a: f64, b: f64) -> f64 {
        match self.graph[nx] {
            Node::Var(Var::A) => a,
            Node::Var(Var::B) => b,
            Node::Const(value) => value,
            Node::Op(op) => {
                let x = self.child(nx, Slot::Left).map_or(0.0, |l| self.evaluate_node(l, a, b));
                let y = match op.arity() {
                    1 => 0.0,
                    _ => self.child(nx, Slot::Right).map_or(0.0, |r| self.evaluate_node(r, a, b)),
                };
                op.apply(x, y)
            }
        }
    }

    /// Compare two trees by score alone.
    pub fn cmp_score(&self, other: &Tree) -> Ordering {
        self.score.total_cmp(&other.score)
    }

    /// Clone the subtree rooted at the given node into a new tree with zeroed fitness.
    pub fn clone_subtree(&self, subtree_root: NodeIndex) -> Tree {
        let mut subtree = Tree::new();
        subtree.root = Some(subtree.graft(self, subtree_root));
        subtree
    }

    /// Replace the subtree rooted at `nx` with a copy of `subtree`.
    ///
    /// If `nx` is the root, the copy becomes the new root. Nothing happens if `subtree` is empty.
    pub fn replace_subtree(&mut self, nx: NodeIndex, subtree: &Tree) {
        let src_root = match subtree.root {
            Some(root) => root,
            None => return,
        };
        let parent = self.parent(nx);
        self.remove_subtree(nx);
        let new = self.graft(subtree, src_root);
        self.attach(parent, new);
    }

    /// Replace the subtree rooted at `nx` with a single leaf holding `node`.
    pub fn replace_with_leaf(&mut self, nx: NodeIndex, node: Node) {
        debug_assert_eq!(node.arity(), 0, "only operands may be leaves");
        let parent = self.parent(nx);
        self.remove_subtree(nx);
        let new = self.graph.add_node(node);
        self.attach(parent, new);
    }

    // Attach a detached node beneath `parent`, or make it the root if there is no parent.
    fn attach(&mut self, parent: Option<(NodeIndex, Slot)>, nx: NodeIndex) {
        match parent {
            Some((parent, slot)) => {
                self.graph.add_edge(parent, nx, slot);
            }
            None => self.root = Some(nx),
        }
    }

    // Remove the node at `nx` and all of its descendants.
    fn remove_subtree(&mut self, nx: NodeIndex) {
        // Collect the nodes we don't want to keep.
        let mut disclude = FnvHashSet::default();
        let mut dfs = Dfs::new(&self.graph, nx);
        while let Some(n) = dfs.next(&self.graph) {
            disclude.insert(n);
        }
        self.graph.retain_nodes(|_, n| !disclude.contains(&n));
        if self.root.map_or(false, |r| disclude.contains(&r)) {
            self.root = None;
        }
    }

    // Copy the subtree of `src` rooted at `src_root` into this tree's graph, returning the index
    // of the copied root. The copy is left detached.
    fn graft(&mut self, src: &Tree, src_root: NodeIndex) -> NodeIndex {
        let dst_root = self.graph.add_node(src.graph[src_root]);
        let mut curr = vec![(src_root, dst_root)];
        let mut next = vec![];
        while !curr.is_empty() {
            for (src_parent, dst_parent) in curr.drain(..) {
                for e in src.graph.edges_directed(src_parent, Outgoing) {
                    let src_child = e.target();
                    let dst_child = self.graph.add_node(src.graph[src_child]);
                    self.graph.add_edge(dst_parent, dst_child, *e.weight());
                    next.push((src_child, dst_child));
                }
            }
            mem::swap(&mut curr, &mut next);
        }
        dst_root
    }

    fn fmt_node(&self, f: &mut fmt::Formatter, nx: NodeIndex) -> fmt::Result {
        match self.graph[nx] {
            Node::Var(var) => write!(f, "{}", var.symbol()),
            Node::Const(value) => write!(f, "{}", value),
            Node::Op(Op::Abs) => {
                write!(f, "abs(")?;
                if let Some(l) = self.child(nx, Slot::Left) {
                    self.fmt_node(f, l)?;
                }
                write!(f, ")")
            }
            Node::Op(op) => {
                write!(f, "(")?;
                if let Some(l) = self.child(nx, Slot::Left) {
                    self.fmt_node(f, l)?;
                }
                write!(f, " {} ", op.symbol())?;
                if let Some(r) = self.child(nx, Slot::Right) {
                    self.fmt_node(f, r)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Renders the expression in fully parenthesised infix form, e.g. `abs((a + b))`.
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.root {
            Some(root) => self.fmt_node(f, root),
            None => Ok(()),
        }
    }
}

impl FromStr for Tree {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Tree::from_postfix(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(postfix: &str) -> Tree {
        Tree::from_postfix(postfix).unwrap()
    }

    #[test]
    fn evaluates_operators() {
        assert_eq!(tree("a b +").evaluate(2.0, 3.0), 5.0);
        assert_eq!(tree("a b -").evaluate(2.0, 3.0), -1.0);
        assert_eq!(tree("a b *").evaluate(2.0, 3.0), 6.0);
        assert_eq!(tree("a b /").evaluate(3.0, 2.0), 1.5);
        assert_eq!(tree("a 2.5 *").evaluate(2.0, 0.0), 5.0);
    }

    #[test]
    fn division_by_zero_is_zero() {
        let t = tree("1 0 /");
        for &(a, b) in &[(0.0, 0.0), (1.0, -1.0), (1e9, 3.0)] {
            assert_eq!(t.evaluate(a, b), 0.0);
        }
        assert_eq!(tree("0 0 /").evaluate(0.0, 0.0), 0.0);
        assert_eq!(tree("a b *").evaluate(1e200, 1e200), 0.0);
    }

    #[test]
    fn comparison_yields_signed_unit() {
        let t = tree("a b >");
        assert_eq!(t.evaluate(5.0, 3.0), 1.0);
        assert_eq!(t.evaluate(1.0, 9.0), -1.0);
        assert_eq!(t.evaluate(2.0, 2.0), -1.0);
    }

    #[test]
    fn abs_takes_one_operand() {
        let t = tree("a abs");
        assert_eq!(t.evaluate(-4.0, 0.0), 4.0);
        assert_eq!(t.evaluate(4.0, 0.0), 4.0);
        let root = t.root().unwrap();
        assert!(t.child(root, Slot::Right).is_none());
        assert_eq!(t.size(), 2);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let t = tree("a b / abs b a - >");
        let first = t.evaluate(0.3, -1.7);
        assert_eq!(first.to_bits(), t.evaluate(0.3, -1.7).to_bits());
    }

    #[test]
    fn structural_queries() {
        let t = tree("a b + b abs *");
        assert_eq!(t.size(), 6);
        assert_eq!(t.depth(), 2);
        assert_eq!(t.positions().len(), t.size());
        let root = t.root().unwrap();
        assert_eq!(t.node_depth(root), 0);
        assert!(t.parent(root).is_none());
        let right = t.child(root, Slot::Right).unwrap();
        assert_eq!(t.node(right), &Node::Op(Op::Abs));
        assert_eq!(t.parent(right), Some((root, Slot::Right)));
        let b = t.child(right, Slot::Left).unwrap();
        assert_eq!(t.node_depth(b), 2);
        assert!(t.is_leaf(b));
        assert!(!t.is_leaf(right));

        assert_eq!(Tree::var(Var::A).depth(), 0);
        assert_eq!(Tree::new().size(), 0);
        assert_eq!(Tree::new().evaluate(1.0, 2.0), 0.0);
    }

    #[test]
    fn renders_infix() {
        assert_eq!(tree("a b + b abs *").to_string(), "((a + b) * abs(b))");
        assert_eq!(tree("a 0.5 >").to_string(), "(a > 0.5)");
        assert_eq!(tree("b").to_string(), "b");
        assert_eq!(Tree::new().to_string(), "");
    }

    #[test]
    fn rejects_malformed_postfix() {
        assert_eq!(Tree::from_postfix("a c +").unwrap_err(), Error::UnknownToken("c".into()));
        assert_eq!(Tree::from_postfix("a nan +").unwrap_err(), Error::UnknownToken("nan".into()));
        assert_eq!(Tree::from_postfix("a +").unwrap_err(), Error::MissingOperand { op: Op::Add });
        assert_eq!(Tree::from_postfix("abs").unwrap_err(), Error::MissingOperand { op: Op::Abs });
        assert_eq!(Tree::from_postfix("a b").unwrap_err(), Error::DanglingOperands(2));
        assert_eq!(Tree::from_postfix("  ").unwrap_err(), Error::EmptyExpression);
        assert!("a b >".parse::<Tree>().is_ok());
    }

    #[test]
    fn clone_is_independent() {
        let mut original = tree("a b + a *");
        original.score = 12.5;
        original.steps = 40.0;
        original.generation = 3;
        let mut copy = original.clone();
        assert_eq!(copy.score, 12.5);
        assert_eq!(copy.steps, 40.0);
        assert_eq!(copy.generation, 3);

        let root = copy.root().unwrap();
        let left = copy.child(root, Slot::Left).unwrap();
        copy.replace_with_leaf(left, Node::Var(Var::B));
        copy.score = 0.0;

        assert_eq!(copy.to_string(), "(b * a)");
        assert_eq!(original.to_string(), "((a + b) * a)");
        assert_eq!(original.size(), 5);
        assert_eq!(original.score, 12.5);
    }

    #[test]
    fn clone_subtree_copies_structure_only() {
        let mut t = tree("a b + b abs *");
        t.score = 3.0;
        let root = t.root().unwrap();
        let sub = t.clone_subtree(t.child(root, Slot::Left).unwrap());
        assert_eq!(sub.to_string(), "(a + b)");
        assert_eq!(sub.score, 0.0);
        assert_eq!(sub.depth(), 1);
        assert_eq!(t.size(), 6);
    }

    #[test]
    fn replace_subtree_relinks_parent() {
        let mut t = tree("a b + b *");
        let graft = tree("a abs");
        let root = t.root().unwrap();
        let right = t.child(root, Slot::Right).unwrap();
        t.replace_subtree(right, &graft);
        assert_eq!(t.to_string(), "((a + b) * abs(a))");
        let new_right = t.child(root, Slot::Right).unwrap();
        assert_eq!(t.parent(new_right), Some((root, Slot::Right)));
        assert_eq!(t.size(), t.positions().len());
        assert_eq!(graft.to_string(), "abs(a)");

        t.replace_subtree(root, &graft);
        assert_eq!(t.to_string(), "abs(a)");
        assert_eq!(t.size(), 2);
    }
}
