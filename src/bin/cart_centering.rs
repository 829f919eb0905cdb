//! Evolves a controller that brings a cart on a frictionless track to rest at the origin.
//!
//! 1. What is the "Terminal Set"?
//!
//! - `a`: the cart's position.
//! - `b`: the cart's velocity.
//!
//! 2. What is the "Function Set"?
//!
//! - `+` `-` `*` `/` `>` `abs`
//!
//! 3. What is the "Fitness Measure"?
//!
//! - A reward of `-1` for every step the cart has not yet come to rest, averaged over episodes.
//!
//! 4. What are the "Control Parameters"?
//!
//! - 50 trees, 20 episodes per evaluation, 100 generations.
//!
//! 5. What is the "Termination Criterion"?
//!
//! - The best tree after all generations.
//!
//! Usage: `cart_centering [SEED]`. Set `RUST_LOG=symgp=debug` for engine traces.

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use symgp::ga::{self, Config, Simulation};
use symgp::{env, Environment};

// Constants.

const DEFAULT_SEED: u64 = 42;
const BEST_TREE_EPISODES: u32 = 3;
const TIME_STEP: f64 = 0.02;
const MASS: f64 = 2.0;
const FORCE: f64 = 1.0;
const MAX_STEPS: u32 = 500;
const START_BOUND: f64 = 0.75;
const REST_TOLERANCE: f64 = 0.01;
const TRACK_HALF_WIDTH: usize = 30;

// Model.

/// A cart on a one dimensional track, pushed left or right by a fixed force each step.
struct CartCentering {
    position: f64,
    velocity: f64,
    steps: u32,
}

// Impls.

impl CartCentering {
    fn new() -> Self {
        CartCentering { position: 0.0, velocity: 0.0, steps: 0 }
    }

    fn at_rest(&self) -> bool {
        self.position.abs() < REST_TOLERANCE && self.velocity.abs() < REST_TOLERANCE
    }

    fn render(&self) {
        let width = TRACK_HALF_WIDTH as f64 / START_BOUND;
        let offset = (self.position * width).round() as i64 + TRACK_HALF_WIDTH as i64;
        let cell = offset.max(0).min(2 * TRACK_HALF_WIDTH as i64) as usize;
        let mut track = vec!['-'; 2 * TRACK_HALF_WIDTH + 1];
        track[TRACK_HALF_WIDTH] = '|';
        track[cell] = '#';
        eprintln!(
            "{} x={:+.3} v={:+.3}",
            track.into_iter().collect::<String>(),
            self.position,
            self.velocity
        );
    }
}

impl Environment for CartCentering {
    fn reset<R: Rng>(&mut self, rng: &mut R) {
        self.position = rng.gen_range(-START_BOUND..START_BOUND);
        self.velocity = rng.gen_range(-START_BOUND..START_BOUND);
        self.steps = 0;
    }

    fn terminal(&self) -> bool {
        self.steps >= MAX_STEPS || self.at_rest()
    }

    fn observe_a(&self) -> f64 {
        self.position
    }

    fn observe_b(&self) -> f64 {
        self.velocity
    }

    fn update(&mut self, action: f64, animate: bool) -> f64 {
        // The controller's output is truncated to a whole number and only its sign is used.
        let push = action.trunc();
        let direction = if push > 0.0 {
            1.0
        } else if push < 0.0 {
            -1.0
        } else {
            0.0
        };
        let acceleration = direction * FORCE / MASS;
        self.velocity += acceleration * TIME_STEP;
        self.position += self.velocity * TIME_STEP;
        self.steps += 1;
        if animate {
            self.render();
        }
        if self.at_rest() { 0.0 } else { -1.0 }
    }
}

// Exe.

fn main() {
    env_logger::init();

    let seed = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<u64>() {
            Ok(seed) => seed,
            Err(_) => {
                eprintln!("Error parsing args: the seed must be a non-negative integer");
                std::process::exit(1);
            }
        },
        None => DEFAULT_SEED,
    };
    let mut rng = XorShiftRng::seed_from_u64(seed);
    log::info!("RNG seed: {}", seed);

    let config = Config::default();
    let mut environment = CartCentering::new();
    let mut simulation = match Simulation::new(&mut rng, config) {
        Ok(simulation) => simulation,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };

    println!("{}", ga::REPORT_HEADER);
    simulation.run(&mut rng, &mut environment, |report| println!("{}", report));

    let mut best = match simulation.best() {
        Some(tree) => tree.clone(),
        None => return,
    };

    // Watch the best tree in action.
    env::evaluate(&mut rng, &mut environment, &mut best, BEST_TREE_EPISODES, true);

    println!();
    println!("Best tree:");
    println!("{}", best);
    println!("Generation: {}", best.generation);
    println!("Size: {}", best.size());
    println!("Depth: {}", best.depth());
    println!("Fitness: {}", best.score);
    println!();
}
