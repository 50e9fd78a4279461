//! NSGA-II ranking: fast non-dominated sorting, crowding distance,
//! environmental selection and crowded binary tournaments.

use super::fitness::Objectives;
use rand::Rng;
use std::cmp::Ordering;

/// `a` is no worse than `b` everywhere and strictly better somewhere
pub fn dominates(a: &Objectives, b: &Objectives) -> bool {
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b.iter()) {
        if x > y {
            return false;
        }
        if x < y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Indices grouped into successive non-dominated fronts
pub fn non_dominated_sort(objectives: &[Objectives]) -> Vec<Vec<usize>> {
    let n = objectives.len();
    let mut dominated_by_me: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];
    let mut fronts: Vec<Vec<usize>> = vec![Vec::new()];

    for p in 0..n {
        for q in 0..n {
            if p == q {
                continue;
            }
            if dominates(&objectives[p], &objectives[q]) {
                dominated_by_me[p].push(q);
            } else if dominates(&objectives[q], &objectives[p]) {
                domination_count[p] += 1;
            }
        }
        if domination_count[p] == 0 {
            fronts[0].push(p);
        }
    }

    let mut current = 0;
    while !fronts[current].is_empty() {
        let mut next = Vec::new();
        for &p in &fronts[current] {
            for &q in &dominated_by_me[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        next.sort_unstable();
        fronts.push(next);
        current += 1;
    }
    fronts.pop();
    fronts
}

/// Crowding distance of each member of `front`, aligned with it
pub fn crowding_distance(objectives: &[Objectives], front: &[usize]) -> Vec<f64> {
    let len = front.len();
    let mut distance = vec![0.0; len];
    if len < 3 {
        return vec![f64::INFINITY; len];
    }

    for m in 0..objectives[front[0]].len() {
        let mut order: Vec<usize> = (0..len).collect();
        order.sort_by(|&a, &b| {
            objectives[front[a]][m]
                .partial_cmp(&objectives[front[b]][m])
                .unwrap_or(Ordering::Equal)
        });

        let low = objectives[front[order[0]]][m];
        let high = objectives[front[order[len - 1]]][m];
        distance[order[0]] = f64::INFINITY;
        distance[order[len - 1]] = f64::INFINITY;
        let range = high - low;
        if range < 1e-12 {
            continue;
        }
        for k in 1..len - 1 {
            let gap = objectives[front[order[k + 1]]][m] - objectives[front[order[k - 1]]][m];
            distance[order[k]] += gap / range;
        }
    }
    distance
}

/// Front rank and crowding distance of every individual
pub fn rank_and_crowding(objectives: &[Objectives]) -> (Vec<usize>, Vec<f64>) {
    let mut rank = vec![0; objectives.len()];
    let mut crowding = vec![0.0; objectives.len()];
    for (r, front) in non_dominated_sort(objectives).iter().enumerate() {
        for (member, distance) in front.iter().zip(crowding_distance(objectives, front)) {
            rank[*member] = r;
            crowding[*member] = distance;
        }
    }
    (rank, crowding)
}

/// Indices of the `k` best individuals: whole fronts first, the last
/// partially-fitting front by decreasing crowding distance
pub fn select(objectives: &[Objectives], k: usize) -> Vec<usize> {
    let mut chosen = Vec::with_capacity(k);
    for front in non_dominated_sort(objectives) {
        if chosen.len() + front.len() <= k {
            chosen.extend_from_slice(&front);
            continue;
        }
        let distance = crowding_distance(objectives, &front);
        let mut order: Vec<usize> = (0..front.len()).collect();
        order.sort_by(|&a, &b| distance[b].partial_cmp(&distance[a]).unwrap_or(Ordering::Equal));
        chosen.extend(order.into_iter().take(k - chosen.len()).map(|i| front[i]));
        break;
    }
    chosen
}

/// Crowded binary tournament: lower rank wins, then larger crowding distance
pub fn tournament<R: Rng>(rank: &[usize], crowding: &[f64], rng: &mut R) -> usize {
    let a = rng.gen_range(0..rank.len());
    let b = rng.gen_range(0..rank.len());
    match rank[a].cmp(&rank[b]) {
        Ordering::Less => a,
        Ordering::Greater => b,
        Ordering::Equal if crowding[b] > crowding[a] => b,
        Ordering::Equal => a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn obj(a: f64, b: f64) -> Objectives {
        [a, b, 0.0, 0.0]
    }

    #[test]
    fn test_dominates() {
        assert!(dominates(&obj(1.0, 1.0), &obj(2.0, 1.0)));
        assert!(!dominates(&obj(1.0, 3.0), &obj(2.0, 1.0)));
        assert!(!dominates(&obj(1.0, 1.0), &obj(1.0, 1.0)));
    }

    #[test]
    fn test_fronts() {
        let objectives = vec![obj(1.0, 4.0), obj(2.0, 2.0), obj(4.0, 1.0), obj(3.0, 3.0), obj(5.0, 5.0)];
        let fronts = non_dominated_sort(&objectives);
        assert_eq!(fronts, vec![vec![0, 1, 2], vec![3], vec![4]]);
    }

    #[test]
    fn test_crowding_extremes_are_infinite() {
        let objectives = vec![obj(1.0, 4.0), obj(2.0, 2.0), obj(4.0, 1.0)];
        let distance = crowding_distance(&objectives, &[0, 1, 2]);
        assert!(distance[0].is_infinite());
        assert!(distance[2].is_infinite());
        assert!(distance[1].is_finite() && distance[1] > 0.0);
    }

    #[test]
    fn test_select_prefers_better_fronts() {
        let objectives = vec![obj(5.0, 5.0), obj(1.0, 4.0), obj(3.0, 3.0), obj(4.0, 1.0), obj(2.0, 2.0)];
        let mut chosen = select(&objectives, 3);
        chosen.sort_unstable();
        assert_eq!(chosen, vec![1, 3, 4]);

        let chosen = select(&objectives, 4);
        assert!(chosen.contains(&2));
        assert!(!chosen.contains(&0));
    }

    #[test]
    fn test_tournament_picks_lower_rank() {
        let rank = vec![0, 1];
        let crowding = vec![0.0, 10.0];
        let mut rng = StdRng::seed_from_u64(2);
        let mut wins = 0;
        for _ in 0..200 {
            if tournament(&rank, &crowding, &mut rng) == 0 {
                wins += 1;
            }
        }
        // index 0 wins every draw it takes part in
        assert!(wins > 100);

        // equal ranks fall back to crowding distance
        let rank = vec![0, 0];
        let crowding = vec![1.0, f64::INFINITY];
        let wins = (0..200).filter(|_| tournament(&rank, &crowding, &mut rng) == 1).count();
        assert!(wins > 100);
    }
}
