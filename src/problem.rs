use std::cmp::Ordering;
use std::collections::HashMap;

use log::info;
use ordered_float::OrderedFloat;
use rand::Rng;

use crate::util;

/// Sentinels for open constraint intervals.
pub const NO_MIN: i64 = i64::MIN;
pub const NO_MAX: i64 = i64::MAX;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Element {
    pub factor: i32,
    pub variable: usize,
}

/// One input constraint, already in interval form: min <= elements . x <= max.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    pub elements: Vec<Element>,
    pub min: i64,
    pub max: i64,
}

impl Constraint {
    pub fn equal(elements: Vec<Element>, value: i64) -> Constraint {
        Constraint {
            elements,
            min: value,
            max: value,
        }
    }

    pub fn less_equal(elements: Vec<Element>, value: i64) -> Constraint {
        Constraint {
            elements,
            min: NO_MIN,
            max: value,
        }
    }

    pub fn greater_equal(elements: Vec<Element>, value: i64) -> Constraint {
        Constraint {
            elements,
            min: value,
            max: NO_MAX,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Domain {
    Binary,
    Integer { lo: i64, hi: i64 },
}

impl Domain {
    pub fn upper(&self) -> i64 {
        match *self {
            Domain::Binary => 1,
            Domain::Integer { hi, .. } => hi,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

impl Sense {
    /// Ordering used to rank reduced costs: best candidates first.
    pub fn compare_reduced_cost(&self, lhs: f64, rhs: f64) -> Ordering {
        match self {
            Sense::Minimize => OrderedFloat(lhs).cmp(&OrderedFloat(rhs)),
            Sense::Maximize => OrderedFloat(rhs).cmp(&OrderedFloat(lhs)),
        }
    }

    /// True when taking one more variable would no longer improve the
    /// objective. An exact zero is decided by a fair coin.
    pub fn stop_iterating(&self, value: f64, rng: &mut impl Rng) -> bool {
        if value == 0.0 {
            return rng.gen_bool(0.5);
        }
        match self {
            Sense::Minimize => value > 0.0,
            Sense::Maximize => value < 0.0,
        }
    }

    pub fn is_better(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Sense::Minimize => lhs < rhs,
            Sense::Maximize => lhs > rhs,
        }
    }

    /// The bound side used by the Lagrangian estimate.
    pub fn bound_rhs(&self, min: i64, max: i64) -> i64 {
        match self {
            Sense::Minimize => min,
            Sense::Maximize => max,
        }
    }

    /// Bastert start value: take the variable when its cost helps the
    /// objective, break zero costs with the supplied draw.
    pub fn init_x(&self, cost: f64, value_if_zero: bool) -> bool {
        if cost == 0.0 {
            return value_if_zero;
        }
        match self {
            Sense::Minimize => cost < 0.0,
            Sense::Maximize => cost > 0.0,
        }
    }
}

pub struct Problem {
    pub sense: Sense,
    pub costs: Vec<f64>,
    pub cost_constant: f64,
    pub constraints: Vec<Constraint>,
    pub domains: Vec<Domain>,
    pub variable_names: Vec<String>,
    /// Variables fixed before the solver ran, reported alongside solutions.
    pub affected: Vec<(String, i32)>,
}

impl Problem {
    pub fn variables(&self) -> usize {
        self.costs.len()
    }

    /// Builds the solver input from a parsed LP file. Coefficients and
    /// right-hand sides are rounded to integers; domains come from the
    /// binary/general sections and the bounds block.
    pub fn from_lp(lp: &lpparser::LpProblem) -> Problem {
        let n = lp.variables.len();

        let sense = match lp.sense {
            lpparser::Sense::Minimize => Sense::Minimize,
            lpparser::Sense::Maximize => Sense::Maximize,
        };

        let mut costs = vec![0.0; n];
        for term in &lp.objective {
            costs[term.var] += term.factor;
        }

        let constraints = lp
            .constraints
            .iter()
            .map(|cst| {
                let elements = cst
                    .terms
                    .iter()
                    .map(|t| Element {
                        factor: t.factor.round() as i32,
                        variable: t.var,
                    })
                    .collect();
                let value = cst.rhs.round() as i64;

                match cst.op {
                    lpparser::Op::Equal => Constraint::equal(elements, value),
                    lpparser::Op::Lte => Constraint::less_equal(elements, value),
                    lpparser::Op::Gte => Constraint::greater_equal(elements, value),
                }
            })
            .collect();

        let domains = lp
            .variables
            .iter()
            .map(|var| match var.kind {
                lpparser::VarKind::Binary => Domain::Binary,
                _ => Domain::Integer {
                    lo: var.lb.ceil() as i64,
                    hi: if var.ub.is_finite() {
                        var.ub.floor() as i64
                    } else {
                        NO_MAX
                    },
                },
            })
            .collect();

        Problem {
            sense,
            costs,
            cost_constant: lp.objective_constant,
            constraints,
            domains,
            variable_names: lp.variables.iter().map(|v| v.name.clone()).collect(),
            affected: Vec::new(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PreprocessError {
    /// A merged constraint ended up with min > max.
    EmptyInterval { constraint: usize },
    /// No 0/1 assignment of the row's variables can reach the interval.
    UnreachableBounds { constraint: usize },
    /// The solver core works on 0/1 variables only.
    NonBinaryDomain { variable: usize },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    LimitReached,
    KappaMaxReached,
    TimeLimitReached,
    InfeasiblePreprocess,
}

/// Best point observed by a run, feasible or not.
#[derive(Clone, Debug)]
pub struct Solution {
    pub status: Status,
    pub value: Option<f64>,
    pub variable_value: Vec<i8>,
    pub remaining_constraints: usize,
    pub loops: usize,
    pub duration: f64,
    pub method: String,
    pub variable_name: Vec<String>,
    pub constraints: usize,
    pub variables: usize,
}

impl Solution {
    pub fn is_feasible(&self) -> bool {
        matches!(self.status, Status::Success)
    }
}

/// Sorts like terms, folds duplicate variables and drops zero factors.
pub fn canonicalize(mut elements: Vec<Element>) -> Vec<Element> {
    if elements.len() > 1 {
        elements.sort_by_key(|e| e.variable);
    }

    let mut out: Vec<Element> = Vec::with_capacity(elements.len());
    for elem in elements {
        match out.last_mut() {
            Some(last) if last.variable == elem.variable => last.factor += elem.factor,
            _ => out.push(elem),
        }
    }
    out.retain(|e| e.factor != 0);
    out
}

/// Coalesces constraints that share an element vector by intersecting their
/// intervals, and rejects rows no 0/1 assignment can satisfy.
pub fn merge_constraints(pb: &Problem) -> Result<Vec<Constraint>, PreprocessError> {
    for (variable, domain) in pb.domains.iter().enumerate() {
        let ok = matches!(
            *domain,
            Domain::Binary | Domain::Integer { lo: 0, hi: 0..=1 }
        );
        if !ok {
            return Err(PreprocessError::NonBinaryDomain { variable });
        }
    }

    let mut merged: Vec<Constraint> = Vec::with_capacity(pb.constraints.len());
    let mut seen: HashMap<Vec<Element>, usize> = HashMap::new();

    for (at, cst) in pb.constraints.iter().enumerate() {
        let elements = canonicalize(cst.elements.clone());

        if elements.is_empty() {
            if cst.min > 0 || cst.max < 0 {
                return Err(PreprocessError::EmptyInterval { constraint: at });
            }
            continue;
        }

        match seen.get(&elements) {
            Some(&row) => {
                merged[row].min = merged[row].min.max(cst.min);
                merged[row].max = merged[row].max.min(cst.max);
            }
            None => {
                seen.insert(elements.clone(), merged.len());
                merged.push(Constraint {
                    elements,
                    min: cst.min,
                    max: cst.max,
                });
            }
        }
    }

    for (at, cst) in merged.iter().enumerate() {
        if cst.min > cst.max {
            return Err(PreprocessError::EmptyInterval { constraint: at });
        }

        let mut lower = 0i64;
        let mut upper = 0i64;
        for elem in &cst.elements {
            let reach = elem.factor as i64 * pb.domains[elem.variable].upper();
            if reach > 0 {
                upper += reach;
            } else {
                lower += reach;
            }
        }

        if (cst.min != NO_MIN && cst.min > upper) || (cst.max != NO_MAX && cst.max < lower) {
            return Err(PreprocessError::UnreachableBounds { constraint: at });
        }
    }

    info!(
        "merged {} constraints into {} ({} removed), {}",
        pb.constraints.len(),
        merged.len(),
        pb.constraints.len() - merged.len(),
        util::summarize(&merged),
    );

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elems(terms: &[(i32, usize)]) -> Vec<Element> {
        terms.iter()
            .map(|&(factor, variable)| Element { factor, variable })
            .collect()
    }

    fn binary_problem(constraints: Vec<Constraint>, n: usize) -> Problem {
        Problem {
            sense: Sense::Minimize,
            costs: vec![0.0; n],
            cost_constant: 0.0,
            constraints,
            domains: vec![Domain::Binary; n],
            variable_names: (0..n).map(|i| format!("x{}", i)).collect(),
            affected: Vec::new(),
        }
    }

    #[test]
    fn canonicalize_folds_like_terms() {
        let out = canonicalize(elems(&[(1, 2), (2, 0), (-1, 2), (1, 1)]));
        assert_eq!(out, elems(&[(2, 0), (1, 1)]));
    }

    #[test]
    fn merge_intersects_duplicate_rows() {
        let pb = binary_problem(
            vec![
                Constraint::less_equal(elems(&[(1, 0), (1, 1)]), 2),
                Constraint::greater_equal(elems(&[(1, 1), (1, 0)]), 1),
                Constraint::equal(elems(&[(1, 2)]), 1),
            ],
            3,
        );

        let merged = merge_constraints(&pb).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].min, merged[0].max), (1, 2));
        assert_eq!((merged[1].min, merged[1].max), (1, 1));
    }

    #[test]
    fn merge_is_idempotent() {
        let pb = binary_problem(
            vec![
                Constraint::less_equal(elems(&[(1, 0), (1, 1)]), 1),
                Constraint::greater_equal(elems(&[(1, 0), (1, 1)]), 1),
                Constraint::equal(elems(&[(1, 1), (-1, 2)]), 0),
            ],
            3,
        );

        let once = merge_constraints(&pb).unwrap();
        let again = merge_constraints(&binary_problem(once.clone(), 3)).unwrap();
        assert_eq!(once, again);
    }

    #[test]
    fn merge_rejects_empty_interval() {
        let pb = binary_problem(
            vec![
                Constraint::less_equal(elems(&[(1, 0)]), 0),
                Constraint::greater_equal(elems(&[(1, 0)]), 1),
            ],
            1,
        );
        assert_eq!(
            merge_constraints(&pb),
            Err(PreprocessError::EmptyInterval { constraint: 0 })
        );
    }

    #[test]
    fn merge_rejects_unreachable_bounds() {
        let pb = binary_problem(
            vec![Constraint::greater_equal(elems(&[(1, 0), (1, 1)]), 3)],
            2,
        );
        assert_eq!(
            merge_constraints(&pb),
            Err(PreprocessError::UnreachableBounds { constraint: 0 })
        );
    }

    #[test]
    fn from_lp_rounds_and_maps_domains() {
        let lp = lpparser::parse(
            "minimize\n2 x + y\nsubject to\nx + y >= 1\nbinary\nx y\nend\n".as_bytes(),
        )
        .unwrap();

        let pb = Problem::from_lp(&lp);
        assert_eq!(pb.sense, Sense::Minimize);
        assert_eq!(pb.costs, vec![2.0, 1.0]);
        assert_eq!((pb.constraints[0].min, pb.constraints[0].max), (1, NO_MAX));
        assert_eq!(pb.domains, vec![Domain::Binary, Domain::Binary]);
        assert_eq!(pb.variable_names, vec!["x", "y"]);
    }

    #[test]
    fn from_lp_keeps_negative_lower_bounds_for_rejection() {
        let lp = lpparser::parse(
            "minimize\n\
             x + y\n\
             subject to\n\
             x + y >= 0\n\
             bounds\n\
             -1 <= x <= 1\n\
             general\n\
             x\n\
             binary\n\
             y\n\
             end\n"
                .as_bytes(),
        )
        .unwrap();

        let pb = Problem::from_lp(&lp);
        assert_eq!(pb.domains[0], Domain::Integer { lo: -1, hi: 1 });
        assert_eq!(
            merge_constraints(&pb),
            Err(PreprocessError::NonBinaryDomain { variable: 0 })
        );
    }

    #[test]
    fn sense_orders_candidates() {
        assert_eq!(
            Sense::Minimize.compare_reduced_cost(-1.0, 2.0),
            Ordering::Less
        );
        assert_eq!(
            Sense::Maximize.compare_reduced_cost(-1.0, 2.0),
            Ordering::Greater
        );
        assert!(Sense::Minimize.is_better(1.0, 2.0));
        assert!(Sense::Maximize.is_better(2.0, 1.0));
        assert_eq!(Sense::Minimize.bound_rhs(3, 7), 3);
        assert_eq!(Sense::Maximize.bound_rhs(3, 7), 7);
        assert!(Sense::Minimize.init_x(-1.0, false));
        assert!(!Sense::Minimize.init_x(1.0, true));
        assert!(Sense::Maximize.init_x(1.0, false));
    }
}
