use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{error, info, warn};
use rand::{Rng, SeedableRng};
use rand_xoshiro::SplitMix64;

use crate::bounds::BoundsReporter;
use crate::norm::normalize_costs;
use crate::order::ConstraintOrder;
use crate::params::Params;
use crate::problem::{merge_constraints, Constraint, Problem, Solution, Status};
use crate::solver::Solver;

/// Runs one anneal and returns the best point found, feasible or not.
pub fn solve(pb: &Problem, params: &Params) -> Solution {
    params.log();
    let begin = Instant::now();

    let merged = match merge_constraints(pb) {
        Ok(merged) => merged,
        Err(err) => {
            warn!("preprocessing failed: {:?}", err);
            let mut failed = preprocess_failure(pb, begin);
            failed.method = "in-the-middle solver".to_string();
            return failed;
        }
    };

    let mut master = master_rng(params);
    let raw_costs = pb.costs.clone();
    let norm_costs = normalize_costs(&raw_costs, params.norm, &mut master);

    let mut slv = Solver::new(
        pb.sense,
        SplitMix64::seed_from_u64(master.gen()),
        pb.variables(),
        norm_costs,
        raw_costs.clone(),
        &merged,
        params.init_policy,
        params.init_random,
    );

    info!("solver starts: {} constraints, {} variables", slv.m, slv.n);

    let mut best = solve_loop(&mut slv, pb, &raw_costs, params, begin);
    best.method = "in-the-middle solver".to_string();
    best.variable_name = pb.variable_names.clone();
    best
}

/// Runs N independent anneal workers and reduces to the best feasible
/// objective, or the least-violated point when no worker reached
/// feasibility.
pub fn optimize(pb: &Problem, params: &Params, threads: usize) -> Solution {
    params.log();
    let begin = Instant::now();
    let threads = threads.max(1);

    let merged = match merge_constraints(pb) {
        Ok(merged) => merged,
        Err(err) => {
            warn!("preprocessing failed: {:?}", err);
            let mut failed = preprocess_failure(pb, begin);
            failed.method = "in-the-middle optimizer".to_string();
            return failed;
        }
    };

    let mut master = master_rng(params);
    let raw_costs = pb.costs.clone();
    let norm_costs = normalize_costs(&raw_costs, params.norm, &mut master);
    let seeds: Vec<u64> = (0..threads).map(|_| master.gen()).collect();

    if threads == 1 {
        info!("optimizer starts with one worker");
    } else {
        info!("optimizer starts with {} workers", threads);
    }

    let merged = &merged;
    let raw_costs = &raw_costs;
    let norm_costs = &norm_costs;

    let outcomes: Vec<Option<Solution>> = crossbeam::scope(|scope| {
        let handles: Vec<_> = seeds
            .iter()
            .enumerate()
            .map(|(wid, &seed)| {
                scope.spawn(move |_| {
                    worker(wid, seed, pb, merged, norm_costs, raw_costs, params, begin)
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(wid, handle)| match handle.join() {
                Ok(solution) => Some(solution),
                Err(_) => {
                    error!("id:{} worker failed", wid);
                    None
                }
            })
            .collect()
    })
    .unwrap();

    let mut best: Option<Solution> = None;
    for current in outcomes.into_iter().flatten() {
        best = Some(match best.take() {
            None => current,
            Some(held) => reduce(pb, held, current),
        });
    }

    let mut best = best.unwrap_or_else(|| finalize(None, Status::LimitReached, 0, begin));
    best.duration = begin.elapsed().as_secs_f64();
    best.method = "in-the-middle optimizer".to_string();
    best.variable_name = pb.variable_names.clone();
    best
}

/// Sense-aware reduction: a feasible point beats any infeasible one, a
/// better objective beats a worse one, fewer violated rows break the rest.
fn reduce(pb: &Problem, held: Solution, current: Solution) -> Solution {
    match (held.is_feasible(), current.is_feasible()) {
        (true, false) => held,
        (false, true) => current,
        (true, true) => {
            let (h, c) = (held.value.unwrap(), current.value.unwrap());
            if pb.sense.is_better(c, h) {
                current
            } else {
                held
            }
        }
        (false, false) => {
            if current.remaining_constraints < held.remaining_constraints {
                current
            } else {
                held
            }
        }
    }
}

struct PushState {
    pushed: i64,
    pushing_iteration: i64,
}

/// The annealing loop of the solve entry point: anneal until feasible, then
/// push for better objectives until a budget runs out.
fn solve_loop(
    slv: &mut Solver,
    pb: &Problem,
    raw_costs: &[f64],
    p: &Params,
    begin: Instant,
) -> Solution {
    let mut violated: Vec<(usize, i64)> = Vec::new();
    slv.collect_violated(&mut violated);

    let mut bound_report = BoundsReporter::new(pb.sense, raw_costs);
    let mut kappa = p.kappa_min;
    let mut best_remaining: Option<usize> = None;
    let mut best: Option<Solution> = None;
    // In solve mode the first push fires on the sweep where feasibility
    // first shows up.
    let mut push = PushState {
        pushed: -1,
        pushing_iteration: p.pushing_iteration_limit,
    };
    let mut i: usize = 0;

    loop {
        let remaining = sweep(slv, p.order, &mut violated, kappa, p.delta, p.theta);

        if best_remaining.map_or(true, |b| remaining < b) {
            best_remaining = Some(remaining);

            let mut current = slv.results(raw_costs, pb.cost_constant);
            current.loops = i;
            current.duration = begin.elapsed().as_secs_f64();
            bound_report.report(slv, current.value);

            info!(
                "constraints remaining: {}/{} at {:.3}s (loop {})",
                remaining, slv.m, current.duration, i
            );

            best = Some(current);
        }

        let feasible = best.as_ref().map_or(false, Solution::is_feasible);
        if feasible {
            if push.pushed == -1 {
                info!("start push phase");
            }
            push.pushing_iteration += 1;

            if push.pushing_iteration >= p.pushing_iteration_limit {
                push.pushed += 1;
                push.pushing_iteration = 0;

                info!(
                    "push {}: kappa {} amplifier {}",
                    push.pushed,
                    p.pushing_k_factor * kappa,
                    p.pushing_objective_amplifier
                );

                let remaining = push_sweep(
                    slv,
                    &mut violated,
                    p.pushing_k_factor * kappa,
                    p.delta,
                    p.theta,
                    p.pushing_objective_amplifier,
                );

                if remaining == 0 {
                    let mut current = slv.results(raw_costs, pb.cost_constant);
                    current.loops = i;
                    current.duration = begin.elapsed().as_secs_f64();
                    store_if_better(pb, &mut best, current, None);
                }
            }

            if push.pushed > p.pushes_limit {
                info!("push limit reached");
                break;
            }
        }

        // The first w sweeps run at kappa_min; sweep w is the first to see
        // the incremented step.
        if i + 1 >= p.w {
            kappa += p.kappa_step * (remaining as f64 / slv.m.max(1) as f64).powf(p.alpha);
        }
        i += 1;

        if i > p.limit {
            info!("loop limit reached: {}", i);
            return finalize(best, Status::LimitReached, i, begin);
        }

        if kappa > p.kappa_max {
            info!("kappa max reached: {:.6}", kappa);
            return finalize(best, Status::KappaMaxReached, i, begin);
        }

        if p.time_limit > 0.0 && begin.elapsed().as_secs_f64() >= p.time_limit {
            info!("time limit reached at loop {}", i);
            return finalize(best, Status::TimeLimitReached, i, begin);
        }
    }

    finalize(best, Status::LimitReached, i, begin)
}

/// One optimizer worker: anneal, push, and restart from the best point until
/// the global time budget runs out.
#[allow(clippy::too_many_arguments)]
fn worker(
    wid: usize,
    seed: u64,
    pb: &Problem,
    merged: &[Constraint],
    norm_costs: &[f64],
    raw_costs: &[f64],
    p: &Params,
    begin: Instant,
) -> Solution {
    let mut slv = Solver::new(
        pb.sense,
        SplitMix64::seed_from_u64(seed),
        pb.variables(),
        norm_costs.to_vec(),
        raw_costs.to_vec(),
        merged,
        p.init_policy,
        p.init_random,
    );

    info!("id:{} worker starts (seed {})", wid, seed);

    let time_limit =
        (p.time_limit > 0.0).then(|| Duration::from_secs_f64(p.time_limit));

    let mut violated: Vec<(usize, i64)> = Vec::new();
    slv.collect_violated(&mut violated);

    let mut bound_report = BoundsReporter::new(pb.sense, raw_costs);
    let mut best: Option<Solution> = None;
    let mut best_infeasible: Option<Solution> = None;
    let mut best_x: Vec<i8> = Vec::new();
    let mut kappa = p.kappa_min;
    let mut push = PushState {
        pushed: -1,
        pushing_iteration: 0,
    };
    let mut i: usize = 0;
    let mut out_of_time = false;

    loop {
        if let Some(limit) = time_limit {
            if begin.elapsed() >= limit {
                out_of_time = true;
                break;
            }
        }

        let remaining = sweep(&mut slv, p.order, &mut violated, kappa, p.delta, p.theta);

        if remaining == 0 {
            let mut current = slv.results(raw_costs, pb.cost_constant);
            current.loops = i;
            current.duration = begin.elapsed().as_secs_f64();

            if store_if_better(pb, &mut best, current, Some(wid)) {
                best_x = slv.x().to_vec();
                push.pushed = 0;
                push.pushing_iteration = 0;
                bound_report.report(&slv, best.as_ref().and_then(|b| b.value));
            }
        } else if best.is_none() {
            let better = best_infeasible
                .as_ref()
                .map_or(true, |held| remaining < held.remaining_constraints);
            if better {
                let mut current = slv.results(raw_costs, pb.cost_constant);
                current.loops = i;
                current.duration = begin.elapsed().as_secs_f64();
                best_infeasible = Some(current);
            }
        }

        if i + 1 >= p.w {
            kappa += p.kappa_step * (remaining as f64 / slv.m.max(1) as f64).powf(p.alpha);
        }
        i += 1;

        if i > p.limit || kappa > p.kappa_max || push.pushed > p.pushes_limit {
            if time_limit.is_none() {
                break;
            }

            slv.reinit(&best_x, p.init_policy, p.init_random);
            slv.collect_violated(&mut violated);
            i = 0;
            kappa = p.kappa_min;
            push.pushed = -1;
            push.pushing_iteration = 0;
            continue;
        }

        if push.pushed >= 0 {
            push.pushing_iteration += 1;

            if push.pushing_iteration >= p.pushing_iteration_limit {
                push.pushed += 1;
                push.pushing_iteration = 0;

                let remaining = push_sweep(
                    &mut slv,
                    &mut violated,
                    p.pushing_k_factor * kappa,
                    p.delta,
                    p.theta,
                    p.pushing_objective_amplifier,
                );

                if remaining == 0 {
                    let mut current = slv.results(raw_costs, pb.cost_constant);
                    current.loops = i;
                    current.duration = begin.elapsed().as_secs_f64();

                    if store_if_better(pb, &mut best, current, Some(wid)) {
                        best_x = slv.x().to_vec();
                    }
                }
            }
        }
    }

    match best {
        Some(solution) => solution,
        None => {
            let fallback = if out_of_time {
                Status::TimeLimitReached
            } else {
                Status::LimitReached
            };
            finalize(best_infeasible, fallback, i, begin)
        }
    }
}

fn sweep(
    slv: &mut Solver,
    order: ConstraintOrder,
    violated: &mut Vec<(usize, i64)>,
    kappa: f64,
    delta: f64,
    theta: f64,
) -> usize {
    order.arrange(violated, &mut slv.rng);

    for &(k, _) in violated.iter() {
        slv.update_row(k, kappa, delta, theta);
    }

    slv.collect_violated(violated);
    violated.len()
}

/// A push sweep updates every row, violated or not, with the amplified
/// objective.
fn push_sweep(
    slv: &mut Solver,
    violated: &mut Vec<(usize, i64)>,
    kappa: f64,
    delta: f64,
    theta: f64,
    objective_amplifier: f64,
) -> usize {
    for k in 0..slv.m {
        slv.push_update_row(k, kappa, delta, theta, objective_amplifier);
    }

    slv.collect_violated(violated);
    violated.len()
}

/// Keeps `best` when `current` is not a strictly better feasible point;
/// otherwise replaces it, logs, and checkpoints for optimizer workers.
fn store_if_better(
    pb: &Problem,
    best: &mut Option<Solution>,
    current: Solution,
    wid: Option<usize>,
) -> bool {
    if !current.is_feasible() {
        return false;
    }

    let replace = match best {
        None => true,
        Some(held) => {
            !held.is_feasible()
                || pb
                    .sense
                    .is_better(current.value.unwrap(), held.value.unwrap())
        }
    };

    if replace {
        if let Some(wid) = wid {
            info!(
                "id:{} solution found: {} (loop {} at {:.3}s)",
                wid,
                current.value.unwrap(),
                current.loops,
                current.duration
            );
            write_checkpoint(wid, pb, &current);
        } else {
            info!(
                "solution found: {} (loop {} at {:.3}s)",
                current.value.unwrap(),
                current.loops,
                current.duration
            );
        }

        *best = Some(current);
    }

    replace
}

/// One `temp-<wid>.sol` per worker; failures are logged and ignored.
fn write_checkpoint(wid: usize, pb: &Problem, solution: &Solution) {
    let path = format!("temp-{}.sol", wid);

    let file = match File::create(&path) {
        Ok(file) => file,
        Err(err) => {
            warn!("checkpoint {}: {}", path, err);
            return;
        }
    };

    let mut out = BufWriter::new(file);
    if write_solution(&mut out, pb, solution).is_err() {
        warn!("checkpoint {}: short write", path);
    }
}

pub fn write_solution(
    out: &mut impl Write,
    pb: &Problem,
    solution: &Solution,
) -> std::io::Result<()> {
    writeln!(out, "\\ status: {:?}", solution.status)?;
    if let Some(value) = solution.value {
        writeln!(out, "\\ value: {}", value)?;
    }
    writeln!(
        out,
        "\\ remaining: {}/{} loops: {} duration: {:.3}s",
        solution.remaining_constraints, solution.constraints, solution.loops, solution.duration
    )?;

    for (name, value) in &pb.affected {
        writeln!(out, "{}:{}", name, value)?;
    }
    for (name, value) in pb.variable_names.iter().zip(&solution.variable_value) {
        writeln!(out, "{}:{}", name, value)?;
    }

    Ok(())
}

fn finalize(best: Option<Solution>, fallback: Status, loops: usize, begin: Instant) -> Solution {
    let mut solution = best.unwrap_or_else(|| Solution {
        status: fallback,
        value: None,
        variable_value: Vec::new(),
        remaining_constraints: usize::MAX,
        loops,
        duration: 0.0,
        method: String::new(),
        variable_name: Vec::new(),
        constraints: 0,
        variables: 0,
    });

    if !solution.is_feasible() {
        solution.status = fallback;
    }
    solution.duration = begin.elapsed().as_secs_f64();
    solution
}

fn preprocess_failure(pb: &Problem, begin: Instant) -> Solution {
    Solution {
        status: Status::InfeasiblePreprocess,
        value: None,
        variable_value: vec![0; pb.variables()],
        remaining_constraints: pb.constraints.len(),
        loops: 0,
        duration: begin.elapsed().as_secs_f64(),
        method: String::new(),
        variable_name: pb.variable_names.clone(),
        constraints: pb.constraints.len(),
        variables: pb.variables(),
    }
}

fn master_rng(params: &Params) -> SplitMix64 {
    let seed = params.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    });
    SplitMix64::seed_from_u64(seed)
}
