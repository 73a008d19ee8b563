use rand::prelude::SliceRandom;
use rand::Rng;

/// Order in which the violated rows of one sweep are updated. The entries
/// carry the violation magnitude so the infeasibility variants can sort
/// without re-walking the matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConstraintOrder {
    None,
    Reversing,
    Random,
    InfeasibilityDecr,
    InfeasibilityIncr,
}

impl ConstraintOrder {
    pub fn from_name(name: &str) -> Option<ConstraintOrder> {
        match name {
            "none" => Some(ConstraintOrder::None),
            "reversing" => Some(ConstraintOrder::Reversing),
            "random" | "random-sorting" => Some(ConstraintOrder::Random),
            "infeasibility-decr" => Some(ConstraintOrder::InfeasibilityDecr),
            "infeasibility-incr" => Some(ConstraintOrder::InfeasibilityIncr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintOrder::None => "none",
            ConstraintOrder::Reversing => "reversing",
            ConstraintOrder::Random => "random",
            ConstraintOrder::InfeasibilityDecr => "infeasibility-decr",
            ConstraintOrder::InfeasibilityIncr => "infeasibility-incr",
        }
    }

    pub fn arrange(&self, violated: &mut [(usize, i64)], rng: &mut impl Rng) {
        match self {
            ConstraintOrder::None => {}
            ConstraintOrder::Reversing => violated.reverse(),
            ConstraintOrder::Random => violated.shuffle(rng),
            ConstraintOrder::InfeasibilityDecr => {
                violated.sort_by_key(|&(_, violation)| std::cmp::Reverse(violation));
                swap_equal_neighbors(violated, rng);
            }
            ConstraintOrder::InfeasibilityIncr => {
                violated.sort_by_key(|&(_, violation)| violation);
                swap_equal_neighbors(violated, rng);
            }
        }
    }
}

/// Rows with the same violation magnitude trade places on a fair coin so a
/// stable sort does not always favor the lower row index.
fn swap_equal_neighbors(violated: &mut [(usize, i64)], rng: &mut impl Rng) {
    for i in 1..violated.len() {
        if violated[i - 1].1 == violated[i].1 && rng.gen_bool(0.5) {
            violated.swap(i - 1, i);
        }
    }
}
