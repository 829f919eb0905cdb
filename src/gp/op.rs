//! Genetic operators acting on expression trees.
//!
//! All operators pick their target node with a biased random walk from the root. At each node
//! one of three outcomes is drawn: stop here, descend left or descend right. Failing to find an
//! eligible node is not an error; the operator simply leaves its trees untouched and returns
//! `false`.

use super::expr::{NodeIndex, Slot, Tree};
use super::gen;
use log::debug;
use rand::Rng;

/// Walk down from the root and return a child of the node at which the walk stops.
///
/// When stopping, a coin decides which child is preferred, falling back to the other child if
/// the preferred one is missing. Descending towards a missing child ends the walk without a
/// selection. The root itself can never be selected.
pub fn select_child<R>(rng: &mut R, tree: &Tree) -> Option<NodeIndex>
where
    R: Rng,
{
    let mut curr = tree.root();
    while let Some(nx) = curr {
        match rng.gen_range(1..=3) {
            1 => {
                let left = tree.child(nx, Slot::Left);
                let right = tree.child(nx, Slot::Right);
                return if rng.gen::<bool>() { left.or(right) } else { right.or(left) };
            }
            2 => curr = tree.child(nx, Slot::Left),
            _ => curr = tree.child(nx, Slot::Right),
        }
    }
    None
}

/// Walk down from the root and return the node at which the walk stops if it is a leaf.
///
/// Descent draws towards a missing child are ignored, so the walk only fails by stopping at an
/// internal node.
pub fn select_leaf<R>(rng: &mut R, tree: &Tree) -> Option<NodeIndex>
where
    R: Rng,
{
    let mut nx = tree.root()?;
    loop {
        let slot = match rng.gen_range(1..=3) {
            1 => return if tree.is_leaf(nx) { Some(nx) } else { None },
            2 => Slot::Left,
            _ => Slot::Right,
        };
        if let Some(child) = tree.child(nx, slot) {
            nx = child;
        }
    }
}

/// Replace a randomly selected non-root subtree with a single random variable.
///
/// Returns `true` if the tree was modified.
pub fn delete_subtree<R>(rng: &mut R, tree: &mut Tree) -> bool
where
    R: Rng,
{
    let target = match select_child(rng, tree) {
        Some(nx) => nx,
        None => {
            debug!("delete_subtree: no target selected");
            return false;
        }
    };
    let leaf = gen::random_var(rng);
    tree.replace_with_leaf(target, leaf);
    true
}

/// Replace a randomly selected leaf with a newly generated random subtree.
///
/// The new subtree is bounded so that the resulting tree's depth does not exceed `max_depth`.
/// If the selected leaf is the root, the generated subtree becomes the whole tree.
///
/// Returns `true` if a subtree was grafted.
pub fn add_subtree<R>(rng: &mut R, tree: &mut Tree, max_depth: u32) -> bool
where
    R: Rng,
{
    let leaf = match select_leaf(rng, tree) {
        Some(nx) => nx,
        None => {
            debug!("add_subtree: no leaf selected");
            return false;
        }
    };
    let depth = tree.node_depth(leaf);
    let subtree = gen::random_tree(rng, max_depth.saturating_sub(depth));
    tree.replace_subtree(leaf, &subtree);
    true
}

/// Swap a randomly selected non-root subtree of `a` with one of `b`.
///
/// The swap only takes place if both selections succeed, the selected nodes sit at the same
/// depth, and neither tree would grow deeper than it was before. Each side receives a deep copy
/// of the other's subtree.
///
/// Returns `true` if the subtrees were swapped.
pub fn crossover<R>(rng: &mut R, a: &mut Tree, b: &mut Tree) -> bool
where
    R: Rng,
{
    let x = select_child(rng, a);
    let y = select_child(rng, b);
    let (x, y) = match (x, y) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            debug!("crossover: selection failed");
            return false;
        }
    };

    let depth = a.node_depth(x);
    if depth != b.node_depth(y) {
        debug!("crossover: selected nodes at different depths");
        return false;
    }

    let from_a = a.clone_subtree(x);
    let from_b = b.clone_subtree(y);
    if depth + from_b.depth() > a.depth() || depth + from_a.depth() > b.depth() {
        debug!("crossover: swap would deepen a parent");
        return false;
    }

    a.replace_subtree(x, &from_b);
    b.replace_subtree(y, &from_a);
    true
}
