use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use log::warn;
use structopt::StructOpt;

use witm::{ParamValue, Params, Problem};

#[derive(Debug, StructOpt)]
#[structopt(about = "Wedelin in-the-middle heuristic for 0/1 integer programs")]
struct Opts {
    /// LP-format input file.
    #[structopt(name = "INPUT", parse(from_os_str))]
    input_file: PathBuf,

    /// Where to write the best solution.
    #[structopt(long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Run the multi-worker optimizer instead of a single solve.
    #[structopt(long)]
    optimize: bool,

    #[structopt(long, default_value = "1")]
    threads: usize,

    /// Solver parameters as name=value, e.g. -p limit=50 -p norm=l1.
    #[structopt(short = "p", long = "param")]
    params: Vec<String>,
}

fn parse_param(entry: &str) -> Option<(String, ParamValue)> {
    let (name, value) = entry.split_once('=')?;

    let value = if let Ok(v) = value.parse::<i64>() {
        ParamValue::Integer(v)
    } else if let Ok(v) = value.parse::<f64>() {
        ParamValue::Real(v)
    } else {
        ParamValue::Text(value.to_string())
    };

    Some((name.to_string(), value))
}

fn main() {
    pretty_env_logger::env_logger::Builder::from_env(
        pretty_env_logger::env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let _p = hprof::enter("solver");
    let opt = Opts::from_args();

    let file = match File::open(&opt.input_file) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("cannot open {}: {}", opt.input_file.display(), err);
            std::process::exit(1);
        }
    };

    let lp = match lpparser::parse(BufReader::new(file)) {
        Ok(lp) => lp,
        Err(err) => {
            eprintln!("cannot parse {}: {:?}", opt.input_file.display(), err);
            std::process::exit(1);
        }
    };
    let pb = Problem::from_lp(&lp);

    let mut map = HashMap::new();
    for entry in &opt.params {
        match parse_param(entry) {
            Some((name, value)) => {
                map.insert(name, value);
            }
            None => warn!("ignoring malformed parameter {:?}", entry),
        }
    }
    let params = Params::from_map(&map);

    let result = if opt.optimize {
        witm::optimize(&pb, &params, opt.threads)
    } else {
        witm::solve(&pb, &params)
    };

    println!("status: {:?}", result.status);
    if let Some(value) = result.value {
        println!("value: {}", value);
    }
    println!(
        "remaining: {}/{} loops: {} duration: {:.3}s",
        result.remaining_constraints, result.constraints, result.loops, result.duration
    );

    if let Some(path) = &opt.output {
        let write = File::create(path).and_then(|file| {
            witm::write_solution(&mut BufWriter::new(file), &pb, &result)
        });
        if let Err(err) = write {
            eprintln!("cannot write {}: {}", path.display(), err);
            std::process::exit(1);
        }
    }

    drop(_p);
    hprof::profiler().print_timing();

    if !result.is_feasible() {
        std::process::exit(2);
    }
}
