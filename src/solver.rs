use rand::prelude::SliceRandom;
use rand::Rng;
use rand_xoshiro::SplitMix64;

use crate::bb;
use crate::matrix::PairedMatrix;
use crate::params::InitPolicy;
use crate::problem::{Constraint, Sense, Solution, Status, NO_MAX, NO_MIN};

/// One reduced-cost entry of the row currently being updated.
#[derive(Copy, Clone, Debug)]
pub struct RData {
    pub value: f64,
    pub id: usize,
}

/// Back-reference to a negative-coefficient cell of a row: its column and
/// its index in the row's cell order.
#[derive(Copy, Clone, Debug)]
struct CData {
    id_a: usize,
    id_r: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bound {
    pub min: i64,
    pub max: i64,
}

pub struct Solver {
    pub(crate) sense: Sense,
    pub(crate) rng: SplitMix64,
    pub(crate) ap: PairedMatrix,
    /// Reduced-cost scratch, sized once to the widest row.
    r: Vec<RData>,
    /// Negative-coefficient cells per row, for the negate-and-restore trick.
    c: Vec<Vec<CData>>,
    /// True for rows holding a coefficient of magnitude above one.
    z: Vec<bool>,
    pub(crate) b: Vec<Bound>,
    /// Normalized costs driving the reduced-cost ranking.
    pub(crate) costs: Vec<f64>,
    /// Raw costs, used by the push-phase amplifier.
    raw_costs: Vec<f64>,
    x: Vec<i8>,
    pub(crate) pi: Vec<f64>,
    pub(crate) m: usize,
    pub(crate) n: usize,
}

impl Solver {
    pub fn new(
        sense: Sense,
        mut rng: SplitMix64,
        n: usize,
        costs: Vec<f64>,
        raw_costs: Vec<f64>,
        csts: &[Constraint],
        init_policy: InitPolicy,
        init_random: f64,
    ) -> Solver {
        let m = csts.len();

        let mut entries = Vec::new();
        for (k, cst) in csts.iter().enumerate() {
            for elem in &cst.elements {
                entries.push((k, elem.variable, elem.factor));
            }
        }
        let ap = PairedMatrix::new(m, n, &entries);

        // Replace open interval ends by the tightest value any 0/1
        // assignment of the row can reach.
        let mut b = Vec::with_capacity(m);
        let mut z = vec![false; m];
        for (k, cst) in csts.iter().enumerate() {
            let mut lower = 0i64;
            let mut upper = 0i64;
            for elem in &cst.elements {
                if elem.factor > 0 {
                    upper += elem.factor as i64;
                } else {
                    lower += elem.factor as i64;
                }
                if elem.factor.abs() > 1 {
                    z[k] = true;
                }
            }

            if cst.min == cst.max {
                b.push(Bound {
                    min: cst.min,
                    max: cst.max,
                });
            } else {
                let min = if cst.min == NO_MIN {
                    lower
                } else if lower < 0 {
                    lower.max(cst.min)
                } else {
                    cst.min
                };
                let max = if cst.max == NO_MAX { upper } else { cst.max };
                b.push(Bound { min, max });
            }
        }

        let mut c = Vec::with_capacity(m);
        let mut widest_row = 0;
        for k in 0..m {
            let row = ap.row(k);
            widest_row = widest_row.max(row.len());
            c.push(
                row.iter()
                    .enumerate()
                    .filter(|(_, cell)| ap.a()[cell.slot] < 0)
                    .map(|(id_r, cell)| CData {
                        id_a: cell.position,
                        id_r,
                    })
                    .collect(),
            );
        }

        let mut x = vec![0i8; n];
        init_values(&mut x, sense, &costs, &[], init_policy, init_random, &mut rng);

        Solver {
            sense,
            rng,
            ap,
            r: vec![RData { value: 0.0, id: 0 }; widest_row],
            c,
            z,
            b,
            costs,
            raw_costs,
            x,
            pi: vec![0.0; m],
            m,
            n,
        }
    }

    /// Forgets all preferences and multipliers and re-draws x. Used by the
    /// optimizer when a worker restarts its schedule.
    pub fn reinit(&mut self, best_previous: &[i8], init_policy: InitPolicy, init_random: f64) {
        self.ap.clear_p();
        self.pi.iter_mut().for_each(|v| *v = 0.0);
        init_values(
            &mut self.x,
            self.sense,
            &self.costs,
            best_previous,
            init_policy,
            init_random,
            &mut self.rng,
        );
    }

    pub fn x(&self) -> &[i8] {
        &self.x
    }

    pub fn row_value(&self, k: usize) -> i64 {
        self.ap
            .row(k)
            .iter()
            .map(|cell| self.ap.a()[cell.slot] as i64 * self.x[cell.position] as i64)
            .sum()
    }

    /// Fills `out` with the violated rows in natural order, each paired with
    /// its violation magnitude.
    pub fn collect_violated(&self, out: &mut Vec<(usize, i64)>) {
        out.clear();
        for k in 0..self.m {
            let v = self.row_value(k);
            if v < self.b[k].min {
                out.push((k, self.b[k].min - v));
            } else if v > self.b[k].max {
                out.push((k, v - self.b[k].max));
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        (0..self.m).all(|k| {
            let v = self.row_value(k);
            self.b[k].min <= v && v <= self.b[k].max
        })
    }

    pub fn results(&self, original_costs: &[f64], cost_constant: f64) -> Solution {
        let mut violated = Vec::new();
        self.collect_violated(&mut violated);
        let feasible = violated.is_empty();

        let value = feasible.then(|| {
            cost_constant
                + self
                    .x
                    .iter()
                    .zip(original_costs)
                    .map(|(&x, &c)| c * x as f64)
                    .sum::<f64>()
        });

        Solution {
            status: if feasible {
                Status::Success
            } else {
                Status::LimitReached
            },
            value,
            variable_value: self.x.clone(),
            remaining_constraints: violated.len(),
            loops: 0,
            duration: 0.0,
            method: String::new(),
            variable_name: Vec::new(),
            constraints: self.m,
            variables: self.n,
        }
    }

    pub fn update_row(&mut self, k: usize, kappa: f64, delta: f64, theta: f64) {
        self.update_row_with(k, kappa, delta, theta, 0.0);
    }

    /// Push-phase variant: every reduced cost is additionally pulled toward
    /// the raw objective.
    pub fn push_update_row(
        &mut self,
        k: usize,
        kappa: f64,
        delta: f64,
        theta: f64,
        objective_amplifier: f64,
    ) {
        self.update_row_with(k, kappa, delta, theta, objective_amplifier);
    }

    fn update_row_with(
        &mut self,
        k: usize,
        kappa: f64,
        delta: f64,
        theta: f64,
        objective_amplifier: f64,
    ) {
        self.ap.scale_row_p(k, theta);

        let r_size = self.compute_reduced_costs(k);

        if objective_amplifier != 0.0 {
            for i in 0..r_size {
                self.r[i].value += objective_amplifier * self.raw_costs[self.r[i].id];
            }
        }

        // Negate reduced costs and coefficients of the negative cells; the
        // row then reads as a row with positive coefficients over shifted
        // bounds.
        let c_size = self.c[k].len();
        let mut shift = 0i64;
        for i in 0..c_size {
            let cd = self.c[k][i];
            self.r[cd.id_r].value = -self.r[cd.id_r].value;
            shift += self.ap.invert_p(k, cd.id_a) as i64;
        }
        let shift = shift.abs();

        let (bmin, bmax) = (self.b[k].min + shift, self.b[k].max + shift);

        let selected = if self.z[k] {
            let weights: Vec<i64> = self.r[..r_size]
                .iter()
                .map(|rd| self.ap.a_at(k, rd.id) as i64)
                .collect();
            bb::select(self.sense, &mut self.r[..r_size], &weights, bmin, bmax)
        } else {
            calculator_sort(self.sense, &mut self.r[..r_size], &mut self.rng);
            if bmin == bmax {
                self.select_equality(r_size, bmin)
            } else {
                self.select_inequality(r_size, bmin, bmax)
            }
        };

        self.affect_variables(k, selected, r_size, kappa, delta);

        // Restore the original signs and flip the negated variables back.
        for i in 0..c_size {
            let cd = self.c[k][i];
            self.ap.invert_p(k, cd.id_a);
            self.x[cd.id_a] = 1 - self.x[cd.id_a];
        }
    }

    fn compute_reduced_costs(&mut self, k: usize) -> usize {
        let mut r_size = 0;
        for cell in self.ap.row(k) {
            let mut sum_a_pi = 0.0;
            let mut sum_a_p = 0.0;

            for held in self.ap.column(cell.position) {
                let a = self.ap.a()[held.slot] as f64;
                sum_a_pi += a * self.pi[held.position];
                sum_a_p += a * self.ap.p()[held.slot];
            }

            self.r[r_size] = RData {
                value: self.costs[cell.position] - sum_a_pi - sum_a_p,
                id: cell.position,
            };
            r_size += 1;
        }
        r_size
    }

    fn select_equality(&self, r_size: usize, bk: i64) -> i64 {
        assert!(
            bk >= 0 && bk <= r_size as i64,
            "row target escaped preprocessing"
        );
        bk - 1
    }

    /// Largest prefix whose length stays within the bounds and whose next
    /// entry still improves the objective.
    fn select_inequality(&mut self, r_size: usize, bmin: i64, bmax: i64) -> i64 {
        let forced = bmin.max(0);
        assert!(forced <= r_size as i64, "row bounds escaped preprocessing");

        let mut count = forced as usize;
        while count < r_size && (count as i64) < bmax {
            let value = self.r[count].value;
            if self.sense.stop_iterating(value, &mut self.rng) {
                break;
            }
            count += 1;
        }

        count as i64 - 1
    }

    fn affect_variables(&mut self, k: usize, selected: i64, r_size: usize, kappa: f64, delta: f64) {
        if selected < 0 {
            for i in 0..r_size {
                let id = self.r[i].id;
                self.x[id] = 0;
                self.ap.add_p(k, id, -delta);
            }
        } else if selected as usize + 1 >= r_size {
            for i in 0..r_size {
                let id = self.r[i].id;
                self.x[id] = 1;
                self.ap.add_p(k, id, delta);
            }
        } else {
            let sel = selected as usize;
            self.pi[k] += (self.r[sel].value + self.r[sel + 1].value) / 2.0;

            let d = delta + (kappa / (1.0 - kappa)) * (self.r[sel + 1].value - self.r[sel].value);

            for i in 0..=sel {
                let id = self.r[i].id;
                self.x[id] = 1;
                self.ap.add_p(k, id, d);
            }
            for i in sel + 1..r_size {
                let id = self.r[i].id;
                self.x[id] = 0;
                self.ap.add_p(k, id, -d);
            }
        }
    }
}

fn init_values(
    x: &mut [i8],
    sense: Sense,
    costs: &[f64],
    best_previous: &[i8],
    init_policy: InitPolicy,
    init_random: f64,
    rng: &mut SplitMix64,
) {
    let mut policy = init_policy;
    if best_previous.is_empty() && policy == InitPolicy::Best {
        policy = InitPolicy::Random;
    }
    let ratio = init_random.clamp(0.0, 1.0);

    match policy {
        InitPolicy::Bastert => {
            if ratio == 0.0 || ratio == 1.0 {
                let value_if_zero = ratio == 1.0;
                for (xi, &ci) in x.iter_mut().zip(costs) {
                    *xi = sense.init_x(ci, value_if_zero) as i8;
                }
            } else {
                for (xi, &ci) in x.iter_mut().zip(costs) {
                    *xi = sense.init_x(ci, rng.gen_bool(ratio)) as i8;
                }
            }
        }
        InitPolicy::Random => {
            for xi in x.iter_mut() {
                *xi = rng.gen_bool(ratio) as i8;
            }
        }
        InitPolicy::Best => {
            for (i, xi) in x.iter_mut().enumerate() {
                *xi = rng.gen_bool(ratio) as i8;
                if rng.gen_bool(ratio) {
                    *xi = best_previous[i];
                }
            }
        }
    }
}

/// Stable sense-aware sort with runs of equal values shuffled, so ties break
/// fairly but reproducibly under the solver's seed.
fn calculator_sort(sense: Sense, r: &mut [RData], rng: &mut impl Rng) {
    if r.len() <= 1 {
        return;
    }

    r.sort_by(|lhs, rhs| sense.compare_reduced_cost(lhs.value, rhs.value));

    let mut at = 0;
    while at < r.len() {
        let mut end = at;
        while end < r.len() && r[end].value == r[at].value {
            end += 1;
        }
        r[at..end].shuffle(rng);
        at = end;
    }
}
