use witm::{Constraint, Domain, Element, Problem, Sense};

pub fn elements(terms: &[(i32, usize)]) -> Vec<Element> {
    terms
        .iter()
        .map(|&(factor, variable)| Element { factor, variable })
        .collect()
}

pub fn binary_problem(sense: Sense, costs: Vec<f64>, constraints: Vec<Constraint>) -> Problem {
    let n = costs.len();
    Problem {
        sense,
        costs,
        cost_constant: 0.0,
        constraints,
        domains: vec![Domain::Binary; n],
        variable_names: (0..n).map(|i| format!("x{}", i)).collect(),
        affected: Vec::new(),
    }
}

/// n x n assignment problem: every row and every column picks exactly one
/// cell. `costs` is the flattened cost matrix.
pub fn assignment(n: usize, costs: Vec<f64>) -> Problem {
    assert_eq!(costs.len(), n * n);

    let mut constraints = Vec::new();
    for i in 0..n {
        constraints.push(Constraint::equal(
            (0..n).map(|j| (1, i * n + j)).map(to_element).collect(),
            1,
        ));
    }
    for j in 0..n {
        constraints.push(Constraint::equal(
            (0..n).map(|i| (1, i * n + j)).map(to_element).collect(),
            1,
        ));
    }

    binary_problem(Sense::Minimize, costs, constraints)
}

fn to_element((factor, variable): (i32, usize)) -> Element {
    Element { factor, variable }
}

pub fn satisfies(pb: &Problem, x: &[i8]) -> bool {
    pb.constraints.iter().all(|cst| {
        let v: i64 = cst
            .elements
            .iter()
            .map(|e| e.factor as i64 * x[e.variable] as i64)
            .sum();
        cst.min <= v && v <= cst.max
    })
}

pub fn objective(pb: &Problem, x: &[i8]) -> f64 {
    pb.cost_constant
        + pb
            .costs
            .iter()
            .zip(x)
            .map(|(&c, &x)| c * x as f64)
            .sum::<f64>()
}
