//! A module for abstracting the generational loop that evolves expression trees.
//!
//! # Genetic Programming
//!
//! Each generation proceeds as follows:
//!
//! 1. *Evaluate* the fitness of every tree born in this or the previous generation. Older
//!    survivors keep their cached fitness.
//! 2. *Rank* the population from worst to best, preferring smaller trees when scores are
//!    nearly equal.
//! 3. *Cull* the worst half of the population.
//! 4. *Report* the statistics of the best tree.
//! 5. *Reproduce* by copying random survivors and mutating the copies until the population is
//!    back to its configured size.

use crate::env::{self, Environment};
use crate::error::{Error, Result};
use crate::gp::{gen, op};
use crate::gp::expr::Tree;
use log::{debug, info};
use rand::Rng;
use std::fmt;

/// The CSV header matching the `Display` output of `GenerationReport`.
pub const REPORT_HEADER: &str = "generation,fitness,steps,size,depth";

// Model.

/// The parameters of a simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// The number of trees at the start of every generation.
    pub population_size: usize,
    /// The depth bound for the randomly generated initial population.
    pub initial_max_depth: u32,
    /// No mutation may produce a tree deeper than this.
    pub max_depth: u32,
    /// The number of episodes over which each tree's fitness is averaged.
    pub episodes: u32,
    /// The number of generations run by `Simulation::run`.
    pub generations: u64,
    /// Scores closer than this are considered tied, in which case the smaller tree ranks higher.
    pub parsimony_epsilon: f64,
    /// The probability that a mutated child is also crossed with another survivor.
    pub crossover_rate: f64,
}

/// Summary statistics for the best tree of a single generation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GenerationReport {
    pub generation: u64,
    pub score: f64,
    pub steps: f64,
    pub size: usize,
    pub depth: u32,
}

/// The simulation in which the population is evolved.
pub struct Simulation {
    config: Config,
    population: Vec<Tree>,
    // The number of completed generations.
    generation: u64,
    // The best tree of the most recent ranking.
    best: Option<Tree>,
}

// Impls.

impl Default for Config {
    fn default() -> Self {
        Config {
            population_size: 50,
            initial_max_depth: 1,
            max_depth: 20,
            episodes: 20,
            generations: 100,
            parsimony_epsilon: 0.01,
            crossover_rate: 0.0,
        }
    }
}

impl Config {
    /// Check that a simulation can run with these parameters.
    pub fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(Error::InvalidConfig(format!(
                "population size must be at least 2, got {}",
                self.population_size
            )));
        }
        if self.episodes == 0 {
            return Err(Error::InvalidConfig("episodes must be positive".into()));
        }
        if self.initial_max_depth > self.max_depth {
            return Err(Error::InvalidConfig(format!(
                "initial max depth {} exceeds max depth {}",
                self.initial_max_depth, self.max_depth
            )));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(Error::InvalidConfig(format!(
                "crossover rate {} is not a probability",
                self.crossover_rate
            )));
        }
        if !(self.parsimony_epsilon >= 0.0) {
            return Err(Error::InvalidConfig("parsimony epsilon must be non-negative".into()));
        }
        Ok(())
    }
}

impl GenerationReport {
    fn new(generation: u64, tree: &Tree) -> Self {
        GenerationReport {
            generation,
            score: tree.score,
            steps: tree.steps,
            size: tree.size(),
            depth: tree.depth(),
        }
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{},{},{},{}", self.generation, self.score, self.steps, self.size, self.depth)
    }
}

impl Simulation {
    /// Initialise the simulation with a random population, all born in generation `0`.
    pub fn new<R>(rng: &mut R, config: Config) -> Result<Self>
    where
        R: Rng,
    {
        config.validate()?;
        let population = (0..config.population_size)
            .map(|_| gen::random_tree(rng, config.initial_max_depth))
            .collect::<Vec<_>>();
        info!("initialised population of {} trees", population.len());
        Ok(Simulation { config, population, generation: 0, best: None })
    }

    /// Step forward the simulation by a single generation.
    pub fn step<R, E>(&mut self, rng: &mut R, environment: &mut E) -> GenerationReport
    where
        R: Rng,
        E: Environment,
    {
        let Simulation { ref config, ref mut population, ref mut generation, ref mut best } = *self;
        let g = *generation + 1;

        // 1. Evaluate the trees born since the last evaluation.
        for tree in population.iter_mut() {
            if tree.generation + 1 >= g {
                env::evaluate(rng, environment, tree, config.episodes, false);
            }
        }

        // 2. Rank from worst to best.
        rank(population, config.parsimony_epsilon);

        // 3. Cull the worst half.
        let cull = (config.population_size / 2).min(population.len());
        population.drain(..cull);

        // 4. Report the best survivor.
        let fittest = population.last().expect("culling always leaves a survivor").clone();
        let report = GenerationReport::new(g, &fittest);
        info!(
            "generation {}: score {}, steps {}, size {}, depth {}",
            g, report.score, report.steps, report.size, report.depth
        );
        *best = Some(fittest);

        // 5. Reproduce from the survivors.
        let survivors = population.len();
        while population.len() < config.population_size {
            let parent = rng.gen_range(0..survivors);
            let mut child = population[parent].clone();
            child.generation = g;
            op::delete_subtree(rng, &mut child);
            op::add_subtree(rng, &mut child, config.max_depth);
            if config.crossover_rate > 0.0 && rng.gen_bool(config.crossover_rate) {
                let mut mate = population[rng.gen_range(0..survivors)].clone();
                op::crossover(rng, &mut child, &mut mate);
            }
            debug!("child of {}: {}", parent, child);
            population.push(child);
        }

        *generation = g;
        report
    }

    /// Run all configured generations, passing each generation's report to `on_report`.
    pub fn run<R, E, F>(&mut self, rng: &mut R, environment: &mut E, mut on_report: F)
    where
        R: Rng,
        E: Environment,
        F: FnMut(&GenerationReport),
    {
        for _ in 0..self.config.generations {
            let report = self.step(rng, environment);
            on_report(&report);
        }
    }

    /// View the current population.
    ///
    /// Between steps the survivors come first, ranked worst to best, followed by their children.
    pub fn population(&self) -> &[Tree] {
        &self.population
    }

    /// The number of generations completed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The best tree found by the most recent generation, if any have run.
    pub fn best(&self) -> Option<&Tree> {
        self.best.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

// fns

/// Whether `a` ranks below `b`.
///
/// If the scores differ by less than `epsilon` the larger tree ranks lower, otherwise the tree
/// with the lower score does.
pub fn lex_less_than(a: &Tree, b: &Tree, epsilon: f64) -> bool {
    let diff = a.score - b.score;
    if diff.abs() < epsilon {
        a.size() > b.size()
    } else {
        diff < 0.0
    }
}

/// Order the population from worst to best.
///
/// The population is first sorted by score and then re-ordered by `lex_less_than`. As the
/// epsilon comparison is not transitive, the second pass is a stable insertion sort driven only
/// by the predicate.
pub fn rank(population: &mut [Tree], epsilon: f64) {
    population.sort_by(|a, b| a.cmp_score(b));
    for i in 1..population.len() {
        let mut j = i;
        while j > 0 && lex_less_than(&population[j], &population[j - 1], epsilon) {
            population.swap(j, j - 1);
            j -= 1;
        }
    }
}
