use log::info;
use ordered_float::OrderedFloat;
use rand::Rng;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Norm {
    None,
    L1,
    L2,
    Inf,
    Rng,
}

impl Norm {
    pub fn from_name(name: &str) -> Option<Norm> {
        match name {
            "none" => Some(Norm::None),
            "l1" => Some(Norm::L1),
            "l2" => Some(Norm::L2),
            "inf" => Some(Norm::Inf),
            "rng" => Some(Norm::Rng),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Norm::None => "none",
            Norm::L1 => "l1",
            Norm::L2 => "l2",
            Norm::Inf => "inf",
            Norm::Rng => "rng",
        }
    }
}

fn scaled(costs: &[f64], div: f64) -> Vec<f64> {
    if !div.is_normal() {
        return costs.to_vec();
    }
    costs.iter().map(|c| c / div).collect()
}

fn max_magnitude(costs: &[f64]) -> f64 {
    costs.iter().map(|c| c.abs()).fold(0.0, f64::max)
}

/// Jitters every group of equal costs so the reduced-cost sort becomes a
/// total order, then scales by the infinity norm.
fn rng_normalize(costs: &[f64], rng: &mut impl Rng) -> Vec<f64> {
    let mut by_value: Vec<(f64, usize)> =
        costs.iter().copied().zip(0..costs.len()).collect();
    by_value.sort_by_key(|&(value, _)| OrderedFloat(value));

    let mut at = 0;
    while at < by_value.len() {
        let value = by_value[at].0;
        let mut end = at;
        while end < by_value.len() && by_value[end].0 == value {
            end += 1;
        }

        let next = by_value.get(end).map(|&(v, _)| v).unwrap_or(value + 1.0);
        for entry in &mut by_value[at..end] {
            entry.0 = rng.gen_range(value..next);
        }

        at = end;
    }

    let mut ret = vec![0.0; costs.len()];
    for (value, index) in by_value {
        ret[index] = value;
    }

    scaled(&ret, max_magnitude(costs))
}

/// Scales the cost vector so reduced-cost magnitudes stay comparable across
/// instances. Scaling is skipped when the divisor is zero or non-finite.
pub fn normalize_costs(costs: &[f64], norm: Norm, rng: &mut impl Rng) -> Vec<f64> {
    info!("cost norm: {}", norm.as_str());

    match norm {
        Norm::None => costs.to_vec(),
        Norm::Rng => rng_normalize(costs, rng),
        Norm::L1 => scaled(costs, costs.iter().map(|c| c.abs()).sum()),
        Norm::L2 => scaled(costs, costs.iter().map(|c| c * c).sum::<f64>().sqrt()),
        Norm::Inf => scaled(costs, max_magnitude(costs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::SplitMix64;

    fn rng() -> SplitMix64 {
        SplitMix64::seed_from_u64(7)
    }

    #[test]
    fn l1_l2_inf_scale_as_expected() {
        let costs = [3.0, -4.0];
        assert_eq!(normalize_costs(&costs, Norm::L1, &mut rng()), vec![3.0 / 7.0, -4.0 / 7.0]);
        assert_eq!(normalize_costs(&costs, Norm::L2, &mut rng()), vec![3.0 / 5.0, -4.0 / 5.0]);
        assert_eq!(normalize_costs(&costs, Norm::Inf, &mut rng()), vec![0.75, -1.0]);
    }

    #[test]
    fn zero_divisor_leaves_costs_alone() {
        let costs = [0.0, 0.0];
        assert_eq!(normalize_costs(&costs, Norm::L1, &mut rng()), vec![0.0, 0.0]);
    }

    #[test]
    fn inf_norm_is_idempotent() {
        let costs = [2.0, -8.0, 4.0];
        let once = normalize_costs(&costs, Norm::Inf, &mut rng());
        let twice = normalize_costs(&once, Norm::Inf, &mut rng());
        assert_eq!(once, twice);
    }

    #[test]
    fn rng_norm_breaks_ties_and_keeps_order() {
        let costs = [1.0, 1.0, 1.0, 5.0, 5.0, 9.0];
        let out = normalize_costs(&costs, Norm::Rng, &mut rng());

        // All distinct, and the relative order of distinct groups survives.
        for i in 0..out.len() {
            for j in i + 1..out.len() {
                assert_ne!(out[i], out[j]);
            }
        }
        assert!(out[0] < out[3] && out[3] < out[5]);
    }

    #[test]
    fn rng_norm_is_deterministic_under_a_seed() {
        let costs = [1.0, 1.0, 2.0, 2.0];
        let a = normalize_costs(&costs, Norm::Rng, &mut rng());
        let b = normalize_costs(&costs, Norm::Rng, &mut rng());
        assert_eq!(a, b);
    }
}
