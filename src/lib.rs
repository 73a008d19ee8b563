//! Wedelin-style "in-the-middle" Lagrangian heuristic for 0/1 integer
//! linear programs. Each sweep re-costs the violated constraints through a
//! shadow-price vector and a per-cell preference matrix, decides a
//! consistent local assignment per row, and anneals a step size until every
//! constraint holds or the schedule runs out.

mod bb;
pub mod bounds;
pub mod matrix;
pub mod norm;
pub mod order;
pub mod params;
pub mod problem;
pub mod run;
pub mod solver;
mod util;

pub use norm::Norm;
pub use order::ConstraintOrder;
pub use params::{InitPolicy, ParamValue, Params};
pub use problem::{
    Constraint, Domain, Element, PreprocessError, Problem, Sense, Solution, Status,
};
pub use run::{optimize, solve, write_solution};
