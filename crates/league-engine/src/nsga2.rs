//! NSGA-II selection
//!
//! Pareto dominance, fast non-dominated sorting into ranked fronts,
//! per-front crowding distance, binary tournament, and size-bounded
//! survivor selection.
//!
//! The selector operates on [`RankedGenome`] records only: an id, an
//! objective vector, and writable rank / crowding slots. It never inspects
//! agent states or any other payload.

use league_core::{CoreError, ObjectiveAxis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Crowding contributions below this range are skipped as degenerate.
const CROWDING_RANGE_EPSILON: f64 = 1e-10;

/// The selector's view of one individual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedGenome {
    pub id: String,
    pub objectives: Vec<f64>,
    /// Front index after sorting; 0 = non-dominated.
    pub rank: usize,
    /// Per-front diversity score; higher means more isolated.
    pub crowding: f64,
}

impl RankedGenome {
    pub fn new(id: String, objectives: Vec<f64>) -> Self {
        Self {
            id,
            objectives,
            rank: 0,
            crowding: 0.0,
        }
    }
}

fn check_length(genome: &RankedGenome, axes: &[ObjectiveAxis]) -> Result<(), EngineError> {
    if genome.objectives.len() != axes.len() {
        return Err(CoreError::ObjectiveLengthMismatch {
            expected: axes.len(),
            actual: genome.objectives.len(),
        }
        .into());
    }
    Ok(())
}

fn dominates_unchecked(a: &RankedGenome, b: &RankedGenome, axes: &[ObjectiveAxis]) -> bool {
    let mut strictly_better_somewhere = false;
    for (axis, (&va, &vb)) in axes.iter().zip(a.objectives.iter().zip(&b.objectives)) {
        if !axis.sense.no_worse(va, vb) {
            return false;
        }
        if axis.sense.strictly_better(va, vb) {
            strictly_better_somewhere = true;
        }
    }
    strictly_better_somewhere
}

/// Pareto dominance: `a` dominates `b` iff `a` is no worse on every axis and
/// strictly better on at least one. Irreflexive, asymmetric, transitive.
pub fn dominates(
    a: &RankedGenome,
    b: &RankedGenome,
    axes: &[ObjectiveAxis],
) -> Result<bool, EngineError> {
    check_length(a, axes)?;
    check_length(b, axes)?;
    Ok(dominates_unchecked(a, b, axes))
}

/// Fast non-dominated sort.
///
/// Returns the fronts as index lists in rank order and writes each genome's
/// `rank`. Every genome lands in exactly one front; empty fronts are never
/// emitted; an empty population yields an empty list.
pub fn fast_non_dominated_sort(
    genomes: &mut [RankedGenome],
    axes: &[ObjectiveAxis],
) -> Result<Vec<Vec<usize>>, EngineError> {
    if genomes.is_empty() {
        return Ok(Vec::new());
    }
    for genome in genomes.iter() {
        check_length(genome, axes)?;
    }

    let n = genomes.len();
    let mut dominated: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];

    for p in 0..n {
        for q in 0..n {
            if p != q && dominates_unchecked(&genomes[p], &genomes[q], axes) {
                dominated[p].push(q);
                domination_count[q] += 1;
            }
        }
    }

    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    let mut rank = 0;
    while !current.is_empty() {
        for &i in &current {
            genomes[i].rank = rank;
        }
        let mut next = Vec::new();
        for &p in &current {
            for &q in &dominated[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        fronts.push(current);
        current = next;
        rank += 1;
    }
    Ok(fronts)
}

/// Crowding distance within one front.
///
/// Fronts of size ≤ 2 get `+∞` throughout. Otherwise each axis is sorted
/// best-first, the endpoints get `+∞`, and interior members accumulate the
/// normalised gap between their neighbours. Axes whose value range over the
/// front is degenerate contribute nothing.
pub fn crowding_distance(genomes: &mut [RankedGenome], front: &[usize], axes: &[ObjectiveAxis]) {
    if front.len() <= 2 {
        for &i in front {
            genomes[i].crowding = f64::INFINITY;
        }
        return;
    }

    let mut distances = vec![0.0f64; front.len()];
    for (m, axis) in axes.iter().enumerate() {
        // Positions into `front`, ordered best-first under this axis.
        let mut order: Vec<usize> = (0..front.len()).collect();
        order.sort_by(|&ia, &ib| {
            let a = genomes[front[ia]].objectives[m];
            let b = genomes[front[ib]].objectives[m];
            if axis.sense.strictly_better(a, b) {
                std::cmp::Ordering::Less
            } else if axis.sense.strictly_better(b, a) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });

        distances[order[0]] = f64::INFINITY;
        distances[order[front.len() - 1]] = f64::INFINITY;

        let values: Vec<f64> = front
            .iter()
            .map(|&i| genomes[i].objectives[m])
            .collect();
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let range = max - min;
        if range < CROWDING_RANGE_EPSILON {
            continue;
        }

        for w in 1..front.len() - 1 {
            let prev = genomes[front[order[w - 1]]].objectives[m];
            let next = genomes[front[order[w + 1]]].objectives[m];
            distances[order[w]] += (next - prev).abs() / range;
        }
    }

    for (&i, &d) in front.iter().zip(&distances) {
        genomes[i].crowding = d;
    }
}

/// Binary tournament with replacement.
///
/// Lower rank wins; on equal rank higher crowding wins; on both equal the
/// first draw wins. Because the same genome can be drawn twice, outcomes
/// are intrinsically probabilistic. Panics on an empty slice.
pub fn tournament_select<'a, R: Rng>(genomes: &'a [RankedGenome], rng: &mut R) -> &'a RankedGenome {
    let first = &genomes[rng.gen_range(0..genomes.len())];
    let second = &genomes[rng.gen_range(0..genomes.len())];
    if second.rank < first.rank || (second.rank == first.rank && second.crowding > first.crowding)
    {
        second
    } else {
        first
    }
}

/// Fill a next generation of at most `target` genomes.
///
/// Sorts, measures crowding on every front, then takes whole fronts in rank
/// order; the last front that does not fit is truncated by descending
/// crowding. Populations no larger than the target are returned whole, in
/// front order.
pub fn select_survivors(
    mut genomes: Vec<RankedGenome>,
    target: usize,
    axes: &[ObjectiveAxis],
) -> Result<Vec<RankedGenome>, EngineError> {
    if genomes.is_empty() {
        return Ok(Vec::new());
    }
    let fronts = fast_non_dominated_sort(&mut genomes, axes)?;
    for front in &fronts {
        crowding_distance(&mut genomes, front, axes);
    }

    let mut selected = Vec::with_capacity(target.min(genomes.len()));
    for front in &fronts {
        if selected.len() + front.len() <= target {
            selected.extend(front.iter().map(|&i| genomes[i].clone()));
        } else {
            let mut by_crowding = front.to_vec();
            by_crowding.sort_by(|&a, &b| {
                genomes[b]
                    .crowding
                    .partial_cmp(&genomes[a].crowding)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            selected.extend(
                by_crowding
                    .iter()
                    .take(target - selected.len())
                    .map(|&i| genomes[i].clone()),
            );
            break;
        }
    }
    Ok(selected)
}
