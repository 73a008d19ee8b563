use std::collections::HashMap;

use log::{info, warn};

use crate::norm::Norm;
use crate::order::ConstraintOrder;

#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Real(f64),
    Integer(i64),
    Text(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InitPolicy {
    /// x_j starts at 1 exactly when c_j helps the objective.
    Bastert,
    /// Bernoulli(init_random) draw per variable.
    Random,
    /// Bernoulli mix between a random draw and the best point seen so far.
    Best,
}

impl InitPolicy {
    pub fn from_name(name: &str) -> Option<InitPolicy> {
        match name {
            "bastert" => Some(InitPolicy::Bastert),
            "random" => Some(InitPolicy::Random),
            "best" => Some(InitPolicy::Best),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Params {
    pub order: ConstraintOrder,
    pub theta: f64,
    pub delta: f64,
    pub limit: usize,
    pub kappa_min: f64,
    pub kappa_step: f64,
    pub kappa_max: f64,
    pub alpha: f64,
    pub w: usize,
    /// Wall-clock budget in seconds; zero or negative disables it.
    pub time_limit: f64,
    pub seed: Option<u64>,
    pub init_policy: InitPolicy,
    pub init_random: f64,
    pub norm: Norm,
    pub pushing_k_factor: f64,
    pub pushes_limit: i64,
    pub pushing_objective_amplifier: f64,
    pub pushing_iteration_limit: i64,
}

impl Default for Params {
    fn default() -> Params {
        Params {
            order: ConstraintOrder::None,
            theta: 0.5,
            delta: 0.01,
            limit: 1000,
            kappa_min: 0.0,
            kappa_step: 1e-3,
            kappa_max: 0.6,
            alpha: 1.0,
            w: 20,
            time_limit: 0.0,
            seed: None,
            init_policy: InitPolicy::Bastert,
            init_random: 0.5,
            norm: Norm::Inf,
            pushing_k_factor: 0.9,
            pushes_limit: 10,
            pushing_objective_amplifier: 5.0,
            pushing_iteration_limit: 20,
        }
    }
}

fn get_real(map: &HashMap<String, ParamValue>, name: &str, def: f64) -> f64 {
    match map.get(name) {
        None => def,
        Some(ParamValue::Real(v)) => *v,
        Some(ParamValue::Integer(v)) => *v as f64,
        Some(ParamValue::Text(text)) => {
            warn!("parameter {}: expected a number, got {:?}, using {}", name, text, def);
            def
        }
    }
}

fn get_integer(map: &HashMap<String, ParamValue>, name: &str, def: i64) -> i64 {
    match map.get(name) {
        None => def,
        Some(ParamValue::Integer(v)) => *v,
        Some(ParamValue::Real(v)) => *v as i64,
        Some(ParamValue::Text(text)) => {
            warn!("parameter {}: expected an integer, got {:?}, using {}", name, text, def);
            def
        }
    }
}

fn get_text<'a>(map: &'a HashMap<String, ParamValue>, name: &str) -> Option<&'a str> {
    match map.get(name) {
        None => None,
        Some(ParamValue::Text(text)) => Some(text),
        Some(other) => {
            warn!("parameter {}: expected a name, got {:?}", name, other);
            None
        }
    }
}

impl Params {
    /// Reads the parameter map; unknown keys are ignored, malformed values
    /// fall back to the defaults with a warning.
    pub fn from_map(map: &HashMap<String, ParamValue>) -> Params {
        let def = Params::default();

        let order = match get_text(map, "constraint-order") {
            None => def.order,
            Some(name) => ConstraintOrder::from_name(name).unwrap_or_else(|| {
                warn!("unknown constraint-order {:?}, using {}", name, def.order.as_str());
                def.order
            }),
        };

        let init_policy = match get_text(map, "init-policy") {
            None => def.init_policy,
            Some(name) => InitPolicy::from_name(name).unwrap_or_else(|| {
                warn!("unknown init-policy {:?}", name);
                def.init_policy
            }),
        };

        let norm = match get_text(map, "norm") {
            None => def.norm,
            Some(name) => Norm::from_name(name).unwrap_or_else(|| {
                warn!("unknown norm {:?}, using {}", name, def.norm.as_str());
                def.norm
            }),
        };

        Params {
            order,
            theta: get_real(map, "theta", def.theta),
            delta: get_real(map, "delta", def.delta),
            limit: get_integer(map, "limit", def.limit as i64).max(0) as usize,
            kappa_min: get_real(map, "kappa-min", def.kappa_min),
            kappa_step: get_real(map, "kappa-step", def.kappa_step),
            kappa_max: get_real(map, "kappa-max", def.kappa_max),
            alpha: get_real(map, "alpha", def.alpha),
            w: get_integer(map, "w", def.w as i64).max(0) as usize,
            time_limit: get_real(map, "time-limit", def.time_limit),
            seed: map
                .contains_key("seed")
                .then(|| get_integer(map, "seed", 0) as u64),
            init_policy,
            init_random: get_real(map, "init-random", def.init_random),
            norm,
            pushing_k_factor: get_real(map, "pushing-k-factor", def.pushing_k_factor),
            pushes_limit: get_integer(map, "pushes-limit", def.pushes_limit),
            pushing_objective_amplifier: get_real(
                map,
                "pushing-objective-amplifier",
                def.pushing_objective_amplifier,
            ),
            pushing_iteration_limit: get_integer(
                map,
                "pushing-iteration-limit",
                def.pushing_iteration_limit,
            ),
        }
    }

    pub fn log(&self) {
        info!(
            "order:{} theta:{} delta:{} limit:{} kappa:[{},{},{}] alpha:{} w:{} norm:{}",
            self.order.as_str(),
            self.theta,
            self.delta,
            self.limit,
            self.kappa_min,
            self.kappa_step,
            self.kappa_max,
            self.alpha,
            self.w,
            self.norm.as_str(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, ParamValue)]) -> HashMap<String, ParamValue> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn defaults_apply_for_missing_keys() {
        let p = Params::from_map(&HashMap::new());
        assert_eq!(p.limit, 1000);
        assert_eq!(p.norm, Norm::Inf);
        assert_eq!(p.order, ConstraintOrder::None);
        assert!(p.seed.is_none());
    }

    #[test]
    fn typed_values_are_read() {
        let p = Params::from_map(&map(&[
            ("limit", ParamValue::Integer(50)),
            ("delta", ParamValue::Real(0.2)),
            ("kappa-step", ParamValue::Real(1e-4)),
            ("constraint-order", ParamValue::Text("random".into())),
            ("seed", ParamValue::Integer(123)),
        ]));

        assert_eq!(p.limit, 50);
        assert_eq!(p.delta, 0.2);
        assert_eq!(p.kappa_step, 1e-4);
        assert_eq!(p.order, ConstraintOrder::Random);
        assert_eq!(p.seed, Some(123));
    }

    #[test]
    fn integers_coerce_to_reals() {
        let p = Params::from_map(&map(&[(
            "pushing-objective-amplifier",
            ParamValue::Integer(5),
        )]));
        assert_eq!(p.pushing_objective_amplifier, 5.0);
    }

    #[test]
    fn malformed_values_fall_back() {
        let p = Params::from_map(&map(&[
            ("theta", ParamValue::Text("half".into())),
            ("constraint-order", ParamValue::Text("sideways".into())),
        ]));
        assert_eq!(p.theta, 0.5);
        assert_eq!(p.order, ConstraintOrder::None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let p = Params::from_map(&map(&[("no-such-knob", ParamValue::Integer(9))]));
        assert_eq!(p.limit, Params::default().limit);
    }
}
