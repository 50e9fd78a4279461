//! Multi-objective routing (MORA).
//!
//! Every `get_path` call evolves a population of candidate paths for one
//! flow with an NSGA-II (mu + lambda) loop: crowded binary tournaments pick
//! parents, topology-aware crossover and mutation produce offspring, and
//! parents plus offspring compete for the next generation. The answer is
//! the best-ranked candidate under the configured meta objective, feasible
//! candidates first.

pub mod enumeration;
pub mod fitness;
pub mod nsga2;
pub mod operators;

pub use enumeration::MutationSupport;

use crate::error::{Result, TopologyError};
use crate::routing::dijkstra;
use crate::topology::{Flow, Topology};
use fitness::{Evaluation, Objectives};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Objective used to pick the final path off the Pareto front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetaObjective {
    ShortestPath,
    Latency,
    #[default]
    Power,
    Reliability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoraParams {
    /// Longest enumerated path, in links
    pub max_hops: usize,
    pub population_size: usize,
    pub generations: usize,
    pub crossover_probability: f64,
    pub mutation_probability: f64,
    pub favored_objective: MetaObjective,
    /// Added to every objective of an infeasible candidate
    pub penalty_offset: f64,
    /// Random seed; drawn at construction when absent
    pub seed: Option<u64>,
}

impl Default for MoraParams {
    fn default() -> Self {
        Self {
            max_hops: 3,
            population_size: 25,
            generations: 10,
            crossover_probability: 0.75,
            mutation_probability: 0.2,
            favored_objective: MetaObjective::Power,
            penalty_offset: 20.0,
            seed: None,
        }
    }
}

impl MoraParams {
    /// Check the parameters before an optimizer is built on them
    pub fn validate(&self) -> Result<()> {
        let invalid = |attribute: &str, reason: String| TopologyError::InvalidAttribute {
            entity: "MORA parameters".to_string(),
            attribute: attribute.to_string(),
            reason,
        };

        if self.max_hops == 0 {
            return Err(invalid("max_hops", "must be at least 1".to_string()));
        }
        if self.population_size < 2 {
            return Err(invalid("population_size", "must be at least 2".to_string()));
        }
        for (name, p) in [
            ("crossover_probability", self.crossover_probability),
            ("mutation_probability", self.mutation_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(name, format!("must be within [0, 1], got {}", p)));
            }
        }
        if !(self.penalty_offset.is_finite() && self.penalty_offset >= 0.0) {
            return Err(invalid(
                "penalty_offset",
                format!("must be a non-negative number, got {}", self.penalty_offset),
            ));
        }
        Ok(())
    }
}

/// Optimizer state kept on the topology between calls
#[derive(Debug)]
pub(crate) struct MoraState {
    pub(crate) params: MoraParams,
    pub(crate) support: MutationSupport,
    base_seed: u64,
    calls: AtomicU64,
}

impl MoraState {
    pub(crate) fn new(params: MoraParams) -> Self {
        let base_seed = params.seed.unwrap_or_else(rand::random);
        Self {
            params,
            support: MutationSupport::default(),
            base_seed,
            calls: AtomicU64::new(0),
        }
    }

    /// Seed for the next optimisation run
    pub(crate) fn next_seed(&self) -> u64 {
        let call = self.calls.fetch_add(1, AtomicOrdering::Relaxed);
        self.base_seed.wrapping_add(call)
    }
}

/// Evolve a path for `flow` from its source to its destination.
///
/// The topology is only read; the caller applies the returned path.
pub(crate) fn optimize_route(topology: &Topology, state: &MoraState, flow: &Flow, seed: u64) -> Result<Vec<String>> {
    let src = topology.index_of(&flow.src)?;
    let dst = topology.index_of(&flow.dst)?;
    let params = &state.params;
    let size = params.population_size.max(2);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut population = initial_population(topology, &state.support, src, dst, size, &mut rng)
        .ok_or_else(|| TopologyError::NoPath {
            src: flow.src.clone(),
            dst: flow.dst.clone(),
        })?;
    let mut evaluations = evaluate_all(topology, flow, &population)?;

    for generation in 0..params.generations {
        let objectives = objectives_of(&evaluations, params.penalty_offset);
        let (rank, crowding) = nsga2::rank_and_crowding(&objectives);

        let mut offspring: Vec<Vec<usize>> = Vec::with_capacity(size);
        while offspring.len() < size {
            let p1 = &population[nsga2::tournament(&rank, &crowding, &mut rng)];
            let p2 = &population[nsga2::tournament(&rank, &crowding, &mut rng)];
            let (c1, c2) = if rng.gen_bool(params.crossover_probability) {
                operators::crossover(p1, p2, topology, &mut rng)
            } else {
                (p1.clone(), p2.clone())
            };
            for child in [c1, c2] {
                let child = if rng.gen_bool(params.mutation_probability) {
                    operators::mutate(&child, topology, &state.support, &mut rng)
                } else {
                    child
                };
                if offspring.len() < size {
                    offspring.push(child);
                }
            }
        }

        let offspring_evaluations = evaluate_all(topology, flow, &offspring)?;
        population.extend(offspring);
        evaluations.extend(offspring_evaluations);

        let merged = objectives_of(&evaluations, params.penalty_offset);
        let survivors = nsga2::select(&merged, size);
        population = survivors.iter().map(|&i| population[i].clone()).collect();
        evaluations = survivors.iter().map(|&i| evaluations[i]).collect();

        debug!(
            "MORA flow {} generation {}: {} feasible of {}",
            flow.id,
            generation + 1,
            evaluations.iter().filter(|e| e.is_feasible()).count(),
            population.len()
        );
    }

    let best = choose(&evaluations, params);
    debug!(
        "MORA flow {} settled on {} ({:?})",
        flow.id,
        topology.names_of(&population[best]).join("-"),
        evaluations[best]
    );
    Ok(topology.names_of(&population[best]))
}

/// Seed individuals: enumerated paths still valid on the operational graph,
/// then random walks, then the first shortest path
fn initial_population<R: Rng>(
    topology: &Topology,
    support: &MutationSupport,
    src: usize,
    dst: usize,
    size: usize,
    rng: &mut R,
) -> Option<Vec<Vec<usize>>> {
    let mut pool: Vec<Vec<usize>> = support
        .paths(src, dst)
        .iter()
        .filter(|path| is_operational(topology, path))
        .cloned()
        .collect();

    if pool.is_empty() {
        for _ in 0..size * 4 {
            if let Some(walk) = enumeration::random_walk(topology, src, dst, rng) {
                if !pool.contains(&walk) {
                    pool.push(walk);
                }
            }
        }
    }
    if pool.is_empty() {
        let costs = dijkstra::cost_matrix(topology);
        let distances = dijkstra::dijkstra(&costs, src);
        pool = dijkstra::equal_cost_paths(&costs, &distances, src, dst, Some(1));
    }
    if pool.is_empty() {
        return None;
    }

    pool.shuffle(rng);
    let mut population: Vec<Vec<usize>> = pool.iter().take(size).cloned().collect();
    while population.len() < size {
        population.push(pool.choose(rng)?.clone());
    }
    Some(population)
}

fn is_operational(topology: &Topology, path: &[usize]) -> bool {
    path.windows(2).all(|hop| topology.operational_edge(hop[0], hop[1]).is_some())
}

fn evaluate_all(topology: &Topology, flow: &Flow, population: &[Vec<usize>]) -> Result<Vec<Evaluation>> {
    population
        .par_iter()
        .map(|path| fitness::evaluate(topology, flow, path))
        .collect()
}

fn objectives_of(evaluations: &[Evaluation], penalty_offset: f64) -> Vec<Objectives> {
    evaluations.iter().map(|e| e.objectives(penalty_offset)).collect()
}

/// Index of the final answer: feasible first-front members, then any
/// feasible member, then the first front, ranked by the meta objective
fn choose(evaluations: &[Evaluation], params: &MoraParams) -> usize {
    let objectives = objectives_of(evaluations, params.penalty_offset);
    let front = nsga2::non_dominated_sort(&objectives).into_iter().next().unwrap_or_default();

    let feasible_front: Vec<usize> = front.iter().copied().filter(|&i| evaluations[i].is_feasible()).collect();
    let feasible: Vec<usize> = (0..evaluations.len()).filter(|&i| evaluations[i].is_feasible()).collect();
    let candidates = if !feasible_front.is_empty() {
        feasible_front
    } else if !feasible.is_empty() {
        feasible
    } else {
        front
    };

    candidates
        .into_iter()
        .min_by(|&a, &b| {
            let va = evaluations[a].meta_value(params.favored_objective);
            let vb = evaluations[b].meta_value(params.favored_objective);
            va.partial_cmp(&vb).unwrap_or(Ordering::Equal)
        })
        .unwrap_or(0)
}
