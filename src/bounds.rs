use log::info;

use crate::problem::Sense;
use crate::solver::Solver;

/// Lagrangian bound estimate from the accumulated multipliers. Reporting
/// only; it never participates in termination.
pub struct BoundsReporter {
    sense: Sense,
    best_lower: f64,
    best_upper: f64,
    /// Mode-extreme raw cost, used to undo the cost normalization.
    max_cost: f64,
}

impl BoundsReporter {
    pub fn new(sense: Sense, original_costs: &[f64]) -> BoundsReporter {
        let max_cost = match sense {
            Sense::Minimize => original_costs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Sense::Maximize => original_costs.iter().copied().fold(f64::INFINITY, f64::min),
        };

        BoundsReporter {
            sense,
            best_lower: f64::NEG_INFINITY,
            best_upper: f64::INFINITY,
            max_cost,
        }
    }

    /// Recomputes the dual-side estimate and folds it into the running best
    /// bounds. Returns the pair for inspection.
    pub fn report(&mut self, slv: &Solver, best_value: Option<f64>) -> (f64, f64) {
        let mut dual = 0.0;
        for k in 0..slv.m {
            let rhs = self.sense.bound_rhs(slv.b[k].min, slv.b[k].max);
            dual += slv.pi[k] * rhs as f64;
        }

        for j in 0..slv.n {
            let mut sum_a_pi = 0.0;
            for held in slv.ap.column(j) {
                sum_a_pi += (slv.ap.a()[held.slot].abs() as f64) * slv.pi[held.position];
            }

            let contribution = slv.costs[j] - sum_a_pi;
            dual += match self.sense {
                Sense::Minimize => contribution.min(0.0),
                Sense::Maximize => contribution.max(0.0),
            };
        }

        if self.max_cost.is_finite() {
            dual *= self.max_cost;
        }

        let (lower, upper) = match self.sense {
            Sense::Minimize => (dual, best_value.unwrap_or(f64::INFINITY)),
            Sense::Maximize => (best_value.unwrap_or(f64::NEG_INFINITY), dual),
        };

        let improved = lower > self.best_lower || upper < self.best_upper;
        self.best_lower = self.best_lower.max(lower);
        self.best_upper = self.best_upper.min(upper);

        if improved {
            match self.sense {
                Sense::Minimize if self.best_upper.is_finite() && self.best_upper != 0.0 => {
                    info!(
                        "lower bound: {} (gap: {:.2}%)",
                        self.best_lower,
                        100.0 * (self.best_upper - self.best_lower) / self.best_upper
                    );
                }
                Sense::Minimize => info!("lower bound: {}", self.best_lower),
                Sense::Maximize if self.best_lower.is_finite() && self.best_lower != 0.0 => {
                    info!(
                        "upper bound: {} (gap: {:.2}%)",
                        self.best_upper,
                        100.0 * (self.best_lower - self.best_upper) / self.best_lower
                    );
                }
                Sense::Maximize => info!("upper bound: {}", self.best_upper),
            }
        }

        (self.best_lower, self.best_upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::InitPolicy;
    use crate::problem::{Constraint, Element};
    use rand::SeedableRng;
    use rand_xoshiro::SplitMix64;

    fn solver() -> Solver {
        let csts = vec![Constraint::equal(
            vec![
                Element { factor: 1, variable: 0 },
                Element { factor: 1, variable: 1 },
            ],
            1,
        )];
        Solver::new(
            Sense::Minimize,
            SplitMix64::seed_from_u64(1),
            2,
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            &csts,
            InitPolicy::Bastert,
            0.0,
        )
    }

    #[test]
    fn zero_multipliers_give_a_zero_dual_bound() {
        let slv = solver();
        let mut reporter = BoundsReporter::new(Sense::Minimize, &[1.0, 2.0]);

        // pi = 0 and positive costs: no variable contributes.
        let (lower, upper) = reporter.report(&slv, Some(1.0));
        assert_eq!(lower, 0.0);
        assert_eq!(upper, 1.0);
    }

    #[test]
    fn multipliers_raise_the_dual_side() {
        let mut slv = solver();
        slv.pi[0] = 0.5;

        let mut reporter = BoundsReporter::new(Sense::Minimize, &[1.0, 2.0]);
        let (lower, _) = reporter.report(&slv, None);

        // dual = pi * b_min = 0.5, both reduced contributions positive,
        // scaled back by the largest cost.
        assert_eq!(lower, 1.0);
    }

    #[test]
    fn best_bounds_only_tighten() {
        let mut slv = solver();
        slv.pi[0] = 0.5;
        let mut reporter = BoundsReporter::new(Sense::Minimize, &[1.0, 2.0]);

        let first = reporter.report(&slv, Some(3.0));
        slv.pi[0] = 0.0;
        let second = reporter.report(&slv, Some(5.0));

        assert!(second.0 >= first.0);
        assert!(second.1 <= first.1);
    }
}
