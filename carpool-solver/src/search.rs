//! Visiting-order search over a precomputed leg matrix.
//!
//! Indices follow the request layout: `0` is the origin, `1..=n` are the
//! pickups in input order and `n + 1` is the destination. An order is the
//! sequence of pickup indices visited between origin and destination.

use std::cmp::Ordering;
use std::time::Duration;

use carpool_core::{LegEstimate, LegMatrix, Objective, RouteCost, SearchStrategy};

/// Best order found and how it was found.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Outcome {
    pub order: Vec<usize>,
    pub cost: RouteCost,
    pub strategy: SearchStrategy,
    pub orders_evaluated: u64,
}

/// No evaluated order fits within the distance limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OverLimit {
    pub shortest_distance_m: f64,
    pub limit_m: f64,
}

/// Leg matrix paired with the objective used to compare costs.
#[derive(Debug)]
pub(crate) struct Costs {
    legs: LegMatrix,
    objective: Objective,
    distance_limit_m: Option<f64>,
}

impl Costs {
    /// `legs` must be square with one row per request waypoint.
    pub(crate) const fn new(legs: LegMatrix, objective: Objective) -> Self {
        Self {
            legs,
            objective,
            distance_limit_m: None,
        }
    }

    /// Only orders no longer than `limit_m` may be returned.
    pub(crate) const fn with_distance_limit(mut self, limit_m: Option<f64>) -> Self {
        self.distance_limit_m = limit_m;
        self
    }

    fn within_limit(&self, cost: &RouteCost) -> bool {
        self.distance_limit_m
            .is_none_or(|limit_m| cost.distance_m <= limit_m)
    }

    pub(crate) const fn pickups(&self) -> usize {
        self.legs.len().saturating_sub(2)
    }

    const fn destination(&self) -> usize {
        self.legs.len().saturating_sub(1)
    }

    pub(crate) fn leg(&self, from: usize, to: usize) -> LegEstimate {
        self.legs
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or_else(|| {
                log::warn!("leg {from} -> {to} missing from matrix; treating it as free");
                debug_assert!(false, "leg {from} -> {to} missing from matrix");
                LegEstimate::ZERO
            })
    }

    /// Waypoint indices from origin to destination for `order`.
    pub(crate) fn stops(&self, order: &[usize]) -> Vec<usize> {
        std::iter::once(0)
            .chain(order.iter().copied())
            .chain(std::iter::once(self.destination()))
            .collect()
    }

    /// Total cost of visiting `order` between origin and destination.
    #[expect(
        clippy::float_arithmetic,
        reason = "route distance is a sum of float leg distances"
    )]
    pub(crate) fn order_cost(&self, order: &[usize]) -> RouteCost {
        let stops = self.stops(order);
        stops.windows(2).fold(
            RouteCost {
                distance_m: 0.0,
                duration: Duration::ZERO,
            },
            |total, pair| match pair {
                [from, to] => {
                    let leg = self.leg(*from, *to);
                    RouteCost {
                        distance_m: total.distance_m + leg.distance_m,
                        duration: total.duration.saturating_add(leg.duration),
                    }
                }
                _ => total,
            },
        )
    }

    /// Compare by the objective first and the other measure second.
    pub(crate) fn compare(&self, lhs: &RouteCost, rhs: &RouteCost) -> Ordering {
        let by_distance = lhs.distance_m.total_cmp(&rhs.distance_m);
        let by_duration = lhs.duration.cmp(&rhs.duration);
        match self.objective {
            Objective::Duration => by_duration.then(by_distance),
            Objective::Distance => by_distance.then(by_duration),
        }
    }

    fn compare_legs(&self, lhs: LegEstimate, rhs: LegEstimate) -> Ordering {
        self.compare(
            &RouteCost {
                distance_m: lhs.distance_m,
                duration: lhs.duration,
            },
            &RouteCost {
                distance_m: rhs.distance_m,
                duration: rhs.duration,
            },
        )
    }

    fn improves(&self, candidate: &RouteCost, incumbent: &RouteCost) -> bool {
        self.compare(candidate, incumbent) == Ordering::Less
    }
}

/// Cheapest order within the distance limit among those offered, plus the
/// shortest distance seen for reporting when none fits.
struct Incumbent<'c> {
    costs: &'c Costs,
    best: Option<(Vec<usize>, RouteCost)>,
    shortest_distance_m: f64,
}

impl<'c> Incumbent<'c> {
    const fn new(costs: &'c Costs) -> Self {
        Self {
            costs,
            best: None,
            shortest_distance_m: f64::INFINITY,
        }
    }

    /// Ties keep the earlier offer.
    fn offer(&mut self, order: &[usize], cost: &RouteCost) {
        self.shortest_distance_m = self.shortest_distance_m.min(cost.distance_m);
        if !self.costs.within_limit(cost) {
            return;
        }
        if self
            .best
            .as_ref()
            .is_none_or(|(_, best)| self.costs.improves(cost, best))
        {
            self.best = Some((order.to_vec(), *cost));
        }
    }

    fn finish(
        self,
        strategy: SearchStrategy,
        orders_evaluated: u64,
    ) -> Result<Outcome, OverLimit> {
        match self.best {
            Some((order, cost)) => Ok(Outcome {
                order,
                cost,
                strategy,
                orders_evaluated,
            }),
            None => Err(OverLimit {
                shortest_distance_m: self.shortest_distance_m,
                limit_m: self.costs.distance_limit_m.unwrap_or(f64::INFINITY),
            }),
        }
    }
}

/// Input order: pickups `1..=n` as given.
pub(crate) fn input_order(pickups: usize) -> Vec<usize> {
    (1..=pickups).collect()
}

/// Evaluate every permutation in lexicographic order, starting from the
/// input order. Orders over the distance limit are skipped. Only strict
/// improvements replace the incumbent, so ties go to the lexicographically
/// smallest order.
pub(crate) fn exhaustive(costs: &Costs) -> Result<Outcome, OverLimit> {
    let mut order = input_order(costs.pickups());
    let mut incumbent = Incumbent::new(costs);
    let mut evaluated = 0_u64;

    loop {
        let cost = costs.order_cost(&order);
        evaluated = evaluated.saturating_add(1);
        incumbent.offer(&order, &cost);
        if !next_permutation(&mut order) {
            break;
        }
    }

    let strategy = if costs.pickups() <= 1 {
        SearchStrategy::Direct
    } else {
        SearchStrategy::Exhaustive
    };
    incumbent.finish(strategy, evaluated)
}

/// Nearest-neighbour construction refined by 2-opt. The input order, the
/// greedy order and every 2-opt improvement compete, so the result is never
/// worse than the input order and honours the distance limit whenever any
/// of them does.
pub(crate) fn nearest_neighbour_two_opt(
    costs: &Costs,
    max_passes: usize,
) -> Result<Outcome, OverLimit> {
    let mut incumbent = Incumbent::new(costs);
    let baseline = input_order(costs.pickups());
    incumbent.offer(&baseline, &costs.order_cost(&baseline));

    let mut order = nearest_neighbour(costs);
    let mut cost = costs.order_cost(&order);
    incumbent.offer(&order, &cost);
    let evaluated = two_opt(costs, &mut order, &mut cost, max_passes, &mut incumbent)
        .saturating_add(2);

    incumbent.finish(SearchStrategy::NearestNeighbourTwoOpt, evaluated)
}

/// Greedy order: from the origin, repeatedly visit the cheapest unvisited
/// pickup, preferring the lowest index on ties.
fn nearest_neighbour(costs: &Costs) -> Vec<usize> {
    let mut remaining = input_order(costs.pickups());
    let mut order = Vec::with_capacity(remaining.len());
    let mut current = 0;

    while let Some(position) = remaining
        .iter()
        .enumerate()
        .min_by(|(_, lhs), (_, rhs)| {
            costs
                .compare_legs(costs.leg(current, **lhs), costs.leg(current, **rhs))
                .then(lhs.cmp(rhs))
        })
        .map(|(position, _)| position)
    {
        let next = remaining.remove(position);
        order.push(next);
        current = next;
    }
    order
}

/// Reverse segments while doing so strictly improves the order, for at
/// most `max_passes` sweeps. Returns the number of orders costed.
fn two_opt(
    costs: &Costs,
    order: &mut Vec<usize>,
    cost: &mut RouteCost,
    max_passes: usize,
    incumbent: &mut Incumbent<'_>,
) -> u64 {
    let mut evaluated = 0_u64;
    for _ in 0..max_passes {
        let mut improved = false;
        for start in 0..order.len() {
            for end in start.saturating_add(1)..order.len() {
                let mut candidate = order.clone();
                if let Some(segment) = candidate.get_mut(start..=end) {
                    segment.reverse();
                }
                let candidate_cost = costs.order_cost(&candidate);
                evaluated = evaluated.saturating_add(1);
                if costs.improves(&candidate_cost, cost) {
                    incumbent.offer(&candidate, &candidate_cost);
                    *order = candidate;
                    *cost = candidate_cost;
                    improved = true;
                }
            }
        }
        if !improved {
            break;
        }
    }
    evaluated
}

/// Advance `order` to the next lexicographic permutation. Returns `false`
/// once the last permutation has been reached.
fn next_permutation(order: &mut [usize]) -> bool {
    let Some(pivot) = order
        .windows(2)
        .rposition(|pair| matches!(pair, [lhs, rhs] if lhs < rhs))
    else {
        return false;
    };
    let Some(&pivot_value) = order.get(pivot) else {
        return false;
    };
    let Some(successor) = order.iter().rposition(|&value| value > pivot_value) else {
        return false;
    };
    order.swap(pivot, successor);
    if let Some(tail) = order.get_mut(pivot.saturating_add(1)..) {
        tail.reverse();
    }
    true
}
