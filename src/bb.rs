//! Exact subset search for rows whose coefficients are not all unit. The
//! caller hands over the row's reduced costs and the (positive) coefficient
//! magnitudes; the search picks the subset whose weight lands inside the
//! row bounds with the best total reduced cost.

use crate::problem::Sense;
use crate::solver::RData;

struct Search<'a> {
    sense: Sense,
    items: &'a [(RData, i64)],
    bound_min: i64,
    bound_max: i64,
    /// Most optimistic reduced-cost gain still available from item i on.
    suffix_gain: Vec<f64>,
    /// Total weight still available from item i on.
    suffix_weight: Vec<i64>,
    chosen: Vec<bool>,
    best: Option<(f64, Vec<bool>)>,
}

impl<'a> Search<'a> {
    fn run(&mut self, at: usize, weight: i64, value: f64) {
        if weight > self.bound_max || weight + self.suffix_weight[at] < self.bound_min {
            return;
        }

        if let Some((best_value, _)) = &self.best {
            let optimistic = value + self.suffix_gain[at];
            if !self.sense.is_better(optimistic, *best_value) {
                return;
            }
        }

        if at == self.items.len() {
            debug_assert!(weight >= self.bound_min);
            self.best = Some((value, self.chosen.clone()));
            return;
        }

        self.chosen[at] = true;
        self.run(at + 1, weight + self.items[at].1, value + self.items[at].0.value);
        self.chosen[at] = false;
        self.run(at + 1, weight, value);
    }
}

/// Reorders `r` so the chosen items form a prefix (each kept in reduced-cost
/// order) and returns the index of the last chosen item, or -1 when the best
/// subset is empty. `weights[i]` belongs to `r[i]`; all weights are positive.
pub fn select(
    sense: Sense,
    r: &mut [RData],
    weights: &[i64],
    bound_min: i64,
    bound_max: i64,
) -> i64 {
    debug_assert_eq!(r.len(), weights.len());
    debug_assert!(weights.iter().all(|&w| w > 0));

    let mut items: Vec<(RData, i64)> = r.iter().copied().zip(weights.iter().copied()).collect();
    items.sort_by(|lhs, rhs| sense.compare_reduced_cost(lhs.0.value, rhs.0.value));

    let len = items.len();
    let mut suffix_gain = vec![0.0; len + 1];
    let mut suffix_weight = vec![0i64; len + 1];
    for at in (0..len).rev() {
        let gain = match sense {
            Sense::Minimize => items[at].0.value.min(0.0),
            Sense::Maximize => items[at].0.value.max(0.0),
        };
        suffix_gain[at] = suffix_gain[at + 1] + gain;
        suffix_weight[at] = suffix_weight[at + 1] + items[at].1;
    }

    let mut search = Search {
        sense,
        items: &items,
        bound_min,
        bound_max,
        suffix_gain,
        suffix_weight,
        chosen: vec![false; len],
        best: None,
    };
    search.run(0, 0, 0.0);

    let (_, chosen) = search
        .best
        .expect("unrealizable row escaped preprocessing");

    let mut at = 0;
    for (item, taken) in items.iter().zip(&chosen) {
        if *taken {
            r[at] = item.0;
            at += 1;
        }
    }
    let selected = at as i64 - 1;
    for (item, taken) in items.iter().zip(&chosen) {
        if !*taken {
            r[at] = item.0;
            at += 1;
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(values: &[f64]) -> Vec<RData> {
        values
            .iter()
            .enumerate()
            .map(|(id, &value)| RData { value, id })
            .collect()
    }

    #[test]
    fn picks_all_improving_items_under_capacity() {
        let mut row = r(&[-2.0, -1.0, 3.0]);
        let selected = select(Sense::Minimize, &mut row, &[1, 1, 1], 0, 2);

        assert_eq!(selected, 1);
        assert_eq!(row[0].id, 0);
        assert_eq!(row[1].id, 1);
    }

    #[test]
    fn capacity_cuts_the_cheapest_subset() {
        // Both improving items weigh 2; only one fits.
        let mut row = r(&[-3.0, -2.0]);
        let selected = select(Sense::Minimize, &mut row, &[2, 2], 0, 3);

        assert_eq!(selected, 0);
        assert_eq!(row[0].id, 0);
    }

    #[test]
    fn equality_forces_a_non_improving_pick() {
        let mut row = r(&[1.0, 2.0, 5.0]);
        let selected = select(Sense::Minimize, &mut row, &[2, 1, 1], 3, 3);

        // Weight must reach exactly 3: items 0 and 1.
        assert_eq!(selected, 1);
        let mut chosen: Vec<usize> = row[..2].iter().map(|x| x.id).collect();
        chosen.sort_unstable();
        assert_eq!(chosen, vec![0, 1]);
    }

    #[test]
    fn empty_subset_wins_when_nothing_improves() {
        let mut row = r(&[1.0, 2.0]);
        let selected = select(Sense::Minimize, &mut row, &[1, 1], 0, 2);
        assert_eq!(selected, -1);
    }

    #[test]
    fn maximize_prefers_positive_values() {
        let mut row = r(&[1.0, -4.0, 2.0]);
        let selected = select(Sense::Maximize, &mut row, &[1, 1, 1], 0, 2);

        assert_eq!(selected, 1);
        let mut chosen: Vec<usize> = row[..2].iter().map(|x| x.id).collect();
        chosen.sort_unstable();
        assert_eq!(chosen, vec![0, 2]);
    }
}
