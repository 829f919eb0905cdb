//! The environment in which a tree's fitness is measured.
//!
//! A tree acts as a control policy: each step it is evaluated on the environment's two
//! observations and the result is fed back to the environment as the action.

use crate::gp::expr::Tree;
use log::debug;
use rand::Rng;

/// An episodic control task.
///
/// Implementations must guarantee that every episode reaches a terminal state in a finite number
/// of steps, as `evaluate` runs each episode until `terminal` returns `true`.
pub trait Environment {
    /// Begin a new episode, drawing any randomness from the shared source.
    fn reset<R: Rng>(&mut self, rng: &mut R);
    /// Whether or not the current episode has ended.
    fn terminal(&self) -> bool;
    /// The first observation, bound to the variable `a`.
    fn observe_a(&self) -> f64;
    /// The second observation, bound to the variable `b`.
    fn observe_b(&self) -> f64;
    /// Advance the episode by one step with the given action and return the reward.
    ///
    /// If `animate` is `true` the environment may render the step.
    fn update(&mut self, action: f64, animate: bool) -> f64;
}

/// The fitness measured over a batch of episodes.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Fitness {
    /// Mean accumulated reward per episode.
    pub score: f64,
    /// Mean number of steps per episode.
    pub steps: f64,
}

/// Run `tree` as a policy for `episodes` episodes and return its mean reward and episode length.
pub fn measure<R, E>(rng: &mut R, env: &mut E, tree: &Tree, episodes: u32, animate: bool) -> Fitness
where
    R: Rng,
    E: Environment,
{
    if episodes == 0 {
        return Fitness::default();
    }
    let mut total_score = 0.0;
    let mut total_steps = 0u64;
    for _ in 0..episodes {
        env.reset(rng);
        while !env.terminal() {
            let action = tree.evaluate(env.observe_a(), env.observe_b());
            total_score += env.update(action, animate);
            total_steps += 1;
        }
    }
    let n = f64::from(episodes);
    Fitness {
        score: total_score / n,
        steps: total_steps as f64 / n,
    }
}

/// Measure the fitness of `tree` and store it within the tree's `score` and `steps`.
///
/// The structure of the tree is left untouched.
pub fn evaluate<R, E>(rng: &mut R, env: &mut E, tree: &mut Tree, episodes: u32, animate: bool)
where
    R: Rng,
    E: Environment,
{
    let fitness = measure(rng, env, tree, episodes, animate);
    debug!("evaluated {} -> score {}, steps {}", tree, fitness.score, fitness.steps);
    tree.score = fitness.score;
    tree.steps = fitness.steps;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    /// Rewards actions close to the target `b - a` for a fixed number of steps.
    pub struct Target {
        pub a: f64,
        pub b: f64,
        pub steps: u32,
        pub remaining: u32,
        pub resets: u32,
    }

    impl Target {
        pub fn new(steps: u32) -> Self {
            Target { a: 0.0, b: 0.0, steps, remaining: 0, resets: 0 }
        }
    }

    impl Environment for Target {
        fn reset<R: Rng>(&mut self, rng: &mut R) {
            self.a = rng.gen_range(-1.0..1.0);
            self.b = rng.gen_range(-1.0..1.0);
            self.remaining = self.steps;
            self.resets += 1;
        }
        fn terminal(&self) -> bool {
            self.remaining == 0
        }
        fn observe_a(&self) -> f64 {
            self.a
        }
        fn observe_b(&self) -> f64 {
            self.b
        }
        fn update(&mut self, action: f64, _animate: bool) -> f64 {
            self.remaining -= 1;
            -(action - (self.b - self.a)).abs()
        }
    }

    #[test]
    fn perfect_policy_scores_zero() {
        let mut rng = XorShiftRng::seed_from_u64(0);
        let mut env = Target::new(10);
        let mut tree = Tree::from_postfix("b a -").unwrap();
        evaluate(&mut rng, &mut env, &mut tree, 4, false);
        assert_eq!(tree.score, 0.0);
        assert_eq!(tree.steps, 10.0);
        assert_eq!(env.resets, 4);
    }

    #[test]
    fn worse_policy_scores_lower() {
        let mut rng = XorShiftRng::seed_from_u64(0);
        let mut env = Target::new(5);
        let mut good = Tree::from_postfix("b a -").unwrap();
        let mut bad = Tree::from_postfix("a b -").unwrap();
        evaluate(&mut rng, &mut env, &mut good, 10, false);
        evaluate(&mut rng, &mut env, &mut bad, 10, false);
        assert!(bad.score < good.score);
    }

    #[test]
    fn evaluation_leaves_structure_alone() {
        let mut rng = XorShiftRng::seed_from_u64(1);
        let mut env = Target::new(3);
        let mut tree = Tree::from_postfix("a b + abs").unwrap();
        tree.generation = 4;
        evaluate(&mut rng, &mut env, &mut tree, 2, false);
        assert_eq!(tree.to_string(), "abs((a + b))");
        assert_eq!(tree.generation, 4);
    }

    #[test]
    fn zero_episodes_yields_zero_fitness() {
        let mut rng = XorShiftRng::seed_from_u64(1);
        let mut env = Target::new(3);
        let tree = Tree::from_postfix("a").unwrap();
        assert_eq!(measure(&mut rng, &mut env, &tree, 0, false), Fitness::default());
        assert_eq!(env.resets, 0);
    }
}
