//! Path enumeration feeding the genetic optimizer.
//!
//! The mutation support holds, for every ordered node pair, every simple
//! path of at most `max_hops` links over the operational graph. It seeds
//! populations and backs the splice mutation.

use crate::topology::Topology;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MutationSupport {
    max_hops: usize,
    paths: HashMap<(usize, usize), Vec<Vec<usize>>>,
}

impl MutationSupport {
    pub fn enumerate(topology: &Topology, max_hops: usize) -> Self {
        let n = topology.node_count();
        let paths: HashMap<(usize, usize), Vec<Vec<usize>>> = (0..n)
            .into_par_iter()
            .flat_map_iter(|src| {
                (0..n)
                    .filter(move |&dst| dst != src)
                    .map(move |dst| ((src, dst), simple_paths(topology, src, dst, max_hops)))
                    .collect::<Vec<_>>()
            })
            .filter(|(_, paths)| !paths.is_empty())
            .collect();

        log::debug!(
            "Enumerated {} paths over {} node pairs (max {} hops)",
            paths.values().map(Vec::len).sum::<usize>(),
            paths.len(),
            max_hops
        );
        Self { max_hops, paths }
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Enumerated paths between two nodes; empty if none are short enough
    pub fn paths(&self, src: usize, dst: usize) -> &[Vec<usize>] {
        self.paths.get(&(src, dst)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pair_count(&self) -> usize {
        self.paths.len()
    }
}

/// Every simple path from `src` to `dst` with at most `max_hops` links,
/// following active links in activation order
pub fn simple_paths(topology: &Topology, src: usize, dst: usize, max_hops: usize) -> Vec<Vec<usize>> {
    let mut found = Vec::new();
    if src == dst || max_hops == 0 || !topology.node_at(src).is_on() {
        return found;
    }

    // Explicit stack of (prefix, index of the next successor to try)
    let mut prefix = vec![src];
    let mut cursor = vec![0usize];
    let mut successors = vec![topology.successors(src)];

    while let Some(next_idx) = cursor.last_mut() {
        let depth = successors.len() - 1;
        let Some(&next) = successors[depth].get(*next_idx) else {
            cursor.pop();
            successors.pop();
            prefix.pop();
            continue;
        };
        *next_idx += 1;

        if prefix.contains(&next) {
            continue;
        }
        if next == dst {
            let mut path = prefix.clone();
            path.push(dst);
            found.push(path);
            continue;
        }
        if prefix.len() < max_hops {
            prefix.push(next);
            cursor.push(0);
            successors.push(topology.successors(next));
        }
    }

    found
}

/// A random loop-free walk from `src` that ends at `dst`, or `None` if the
/// walk gets stuck
pub fn random_walk<R: Rng>(topology: &Topology, src: usize, dst: usize, rng: &mut R) -> Option<Vec<usize>> {
    let mut path = vec![src];
    let mut current = src;
    while current != dst {
        let options: Vec<usize> = topology
            .successors(current)
            .into_iter()
            .filter(|n| !path.contains(n))
            .collect();
        if options.contains(&dst) {
            path.push(dst);
            break;
        }
        current = *options.choose(rng)?;
        path.push(current);
    }
    Some(path)
}
