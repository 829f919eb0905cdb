//! Functions for generating random expression trees.
//!
//! Trees are generated as a stream of postfix tokens which is then assembled by
//! `Tree::from_tokens`. Each operator wraps everything generated so far, so the depth of the
//! assembled tree is exactly the number of operators in the stream.

use super::expr::{Node, Op, Tree, Var};
use rand::Rng;

// The kind of token to emit next.
#[derive(Copy, Clone, Debug, PartialEq)]
enum Next {
    Operand,
    Operator,
    Abs,
}

/// Generate a random expression tree whose depth does not exceed `max_depth`.
pub fn random_tree<R>(rng: &mut R, max_depth: u32) -> Tree
where
    R: Rng,
{
    let tokens = random_postfix(rng, max_depth);
    Tree::from_tokens(tokens).expect("generated postfix is always well-formed")
}

/// Generate the postfix token stream for a random expression.
///
/// A target depth is drawn uniformly from `0..=max_depth`. A target of `0` produces a single
/// variable. Otherwise the stream starts with a variable and is extended by either a second
/// variable followed by a binary operator, or by an `abs`, until the target depth is reached.
pub fn random_postfix<R>(rng: &mut R, max_depth: u32) -> Vec<Node>
where
    R: Rng,
{
    let target = rng.gen_range(0..=max_depth);
    let mut tokens = vec![random_var(rng)];
    if target == 0 {
        return tokens;
    }

    let mut depth = 0;
    let mut next = random_extension(rng);
    while depth < target {
        match next {
            Next::Operand => {
                tokens.push(random_var(rng));
                next = Next::Operator;
            }
            Next::Operator => {
                let op = Op::BINARY[rng.gen_range(0..Op::BINARY.len())];
                tokens.push(Node::Op(op));
                next = random_extension(rng);
                depth += 1;
            }
            Next::Abs => {
                tokens.push(Node::Op(Op::Abs));
                next = Next::Operand;
                depth += 1;
            }
        }
    }
    tokens
}

/// Either of the two input variables with equal probability.
pub fn random_var<R>(rng: &mut R) -> Node
where
    R: Rng,
{
    if rng.gen::<bool>() {
        Node::Var(Var::A)
    } else {
        Node::Var(Var::B)
    }
}

// After a complete subexpression, either begin a binary operation or wrap it in `abs`.
fn random_extension<R>(rng: &mut R) -> Next
where
    R: Rng,
{
    if rng.gen::<bool>() {
        Next::Operand
    } else {
        Next::Abs
    }
}
