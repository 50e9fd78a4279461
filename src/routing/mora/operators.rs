//! Topology-aware genetic operators.
//!
//! Individuals are node-index paths. Every operator only ever produces
//! simple paths whose consecutive nodes are joined by an operational link;
//! when no such offspring exists the parent passes through unchanged.

use super::enumeration::MutationSupport;
use crate::topology::Topology;
use rand::seq::SliceRandom;
use rand::Rng;

/// Single-point crossover.
///
/// A splice locus `(i, j)` is valid when `head[i]` links to `tail[j]` and
/// `head[..=i]` shares no node with `tail[j..]`. The first child is
/// `p1[..=i] + p2[j..]`, the second is built the same way with the parents
/// swapped, each from its own uniformly drawn locus.
pub fn crossover<R: Rng>(p1: &[usize], p2: &[usize], topology: &Topology, rng: &mut R) -> (Vec<usize>, Vec<usize>) {
    let first = splice(p1, p2, topology, rng).unwrap_or_else(|| p1.to_vec());
    let second = splice(p2, p1, topology, rng).unwrap_or_else(|| p2.to_vec());
    (first, second)
}

fn splice<R: Rng>(head: &[usize], tail: &[usize], topology: &Topology, rng: &mut R) -> Option<Vec<usize>> {
    let loci = splice_loci(head, tail, topology);
    let &(i, j) = loci.choose(rng)?;
    let mut child = head[..=i].to_vec();
    child.extend_from_slice(&tail[j..]);
    Some(child)
}

pub fn splice_loci(head: &[usize], tail: &[usize], topology: &Topology) -> Vec<(usize, usize)> {
    let mut loci = Vec::new();
    for i in 0..head.len().saturating_sub(1) {
        for j in 1..tail.len() {
            if topology.operational_edge(head[i], tail[j]).is_none() {
                continue;
            }
            if head[..=i].iter().any(|n| tail[j..].contains(n)) {
                continue;
            }
            loci.push((i, j));
        }
    }
    loci
}

/// Mutation families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Swap one interior node for another
    Flip,
    /// Drop one or two consecutive interior nodes
    Delete,
    /// Put one or two unused nodes between two consecutive nodes
    Insert,
    /// Replace a short segment with another enumerated path
    Splice,
}

/// Every valid offspring of `individual` under one mutation family
pub fn mutations(individual: &[usize], family: Mutation, topology: &Topology, support: &MutationSupport) -> Vec<Vec<usize>> {
    match family {
        Mutation::Flip => flips(individual, topology),
        Mutation::Delete => deletions(individual, topology),
        Mutation::Insert => insertions(individual, topology),
        Mutation::Splice => splices(individual, topology, support),
    }
}

/// Pick a family uniformly among those with at least one valid offspring,
/// then an offspring uniformly within it
pub fn mutate<R: Rng>(individual: &[usize], topology: &Topology, support: &MutationSupport, rng: &mut R) -> Vec<usize> {
    let families: Vec<Vec<Vec<usize>>> = [Mutation::Flip, Mutation::Delete, Mutation::Insert, Mutation::Splice]
        .iter()
        .map(|&family| mutations(individual, family, topology, support))
        .filter(|offspring| !offspring.is_empty())
        .collect();

    families
        .choose(rng)
        .and_then(|offspring| offspring.choose(rng))
        .cloned()
        .unwrap_or_else(|| individual.to_vec())
}

fn linked(topology: &Topology, a: usize, b: usize) -> bool {
    topology.operational_edge(a, b).is_some()
}

fn flips(individual: &[usize], topology: &Topology) -> Vec<Vec<usize>> {
    let mut offspring = Vec::new();
    for k in 1..individual.len().saturating_sub(1) {
        let (prev, next) = (individual[k - 1], individual[k + 1]);
        for candidate in topology.successors(prev) {
            if individual.contains(&candidate) || !linked(topology, candidate, next) {
                continue;
            }
            let mut child = individual.to_vec();
            child[k] = candidate;
            offspring.push(child);
        }
    }
    offspring
}

fn deletions(individual: &[usize], topology: &Topology) -> Vec<Vec<usize>> {
    let last = individual.len().saturating_sub(1);
    let mut offspring = Vec::new();
    for k in 1..last {
        for dropped in 1..=2 {
            if k + dropped > last {
                break;
            }
            if linked(topology, individual[k - 1], individual[k + dropped]) {
                let mut child = individual[..k].to_vec();
                child.extend_from_slice(&individual[k + dropped..]);
                offspring.push(child);
            }
        }
    }
    offspring
}

fn insertions(individual: &[usize], topology: &Topology) -> Vec<Vec<usize>> {
    let mut offspring = Vec::new();
    for k in 1..individual.len() {
        let (prev, next) = (individual[k - 1], individual[k]);
        for first in topology.successors(prev) {
            if individual.contains(&first) {
                continue;
            }
            if linked(topology, first, next) {
                offspring.push(inserted(individual, k, &[first]));
            }
            for second in topology.successors(first) {
                if second == first || individual.contains(&second) || !linked(topology, second, next) {
                    continue;
                }
                offspring.push(inserted(individual, k, &[first, second]));
            }
        }
    }
    offspring
}

fn inserted(individual: &[usize], at: usize, chain: &[usize]) -> Vec<usize> {
    let mut child = individual[..at].to_vec();
    child.extend_from_slice(chain);
    child.extend_from_slice(&individual[at..]);
    child
}

fn splices(individual: &[usize], topology: &Topology, support: &MutationSupport) -> Vec<Vec<usize>> {
    let last = individual.len().saturating_sub(1);
    let mut offspring = Vec::new();
    for i in 0..last {
        let reach = (i + support.max_hops()).min(last);
        for j in i + 1..=reach {
            let segment = &individual[i..=j];
            for alternative in support.paths(individual[i], individual[j]) {
                if alternative.as_slice() == segment {
                    continue;
                }
                let interior = &alternative[1..alternative.len() - 1];
                let clashes = interior
                    .iter()
                    .any(|n| individual[..i].contains(n) || individual[j + 1..].contains(n));
                if clashes || !alternative.windows(2).all(|hop| linked(topology, hop[0], hop[1])) {
                    continue;
                }
                let mut child = individual[..i].to_vec();
                child.extend_from_slice(alternative);
                child.extend_from_slice(&individual[j + 1..]);
                offspring.push(child);
            }
        }
    }
    offspring
}
