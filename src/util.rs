use crate::problem::{Constraint, NO_MAX, NO_MIN};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Disjunction over literals: sum of +-1 terms >= 1 after shifting.
    Clause,
    /// At most one of the literals.
    AtMostOne,
    /// Exactly-k or at-least-k over +-1 terms.
    Cardinality,
    /// Unit factors, general interval.
    PseudoBoolean,
    /// At least one factor with magnitude > 1.
    General,
}

pub fn constraint_kind(cst: &Constraint) -> ConstraintKind {
    if cst.elements.iter().any(|e| e.factor.abs() > 1) {
        return ConstraintKind::General;
    }

    // Shift so that negated literals read as 1 - x.
    let negatives = cst.elements.iter().filter(|e| e.factor < 0).count() as i64;
    let min = if cst.min == NO_MIN { NO_MIN } else { cst.min + negatives };
    let max = if cst.max == NO_MAX { NO_MAX } else { cst.max + negatives };
    let size = cst.elements.len() as i64;

    if min == 1 && max >= size {
        return ConstraintKind::Clause;
    }

    if max == 1 && min <= 0 {
        return ConstraintKind::AtMostOne;
    }

    if min == max || max >= size || min <= 0 {
        return ConstraintKind::Cardinality;
    }

    ConstraintKind::PseudoBoolean
}

/// One-line tally of the constraint mix, for the preprocessing log.
pub fn summarize(constraints: &[Constraint]) -> String {
    let mut clauses = 0;
    let mut atmost1 = 0;
    let mut card = 0;
    let mut pb = 0;
    let mut general = 0;

    for cst in constraints {
        match constraint_kind(cst) {
            ConstraintKind::Clause => clauses += 1,
            ConstraintKind::AtMostOne => atmost1 += 1,
            ConstraintKind::Cardinality => card += 1,
            ConstraintKind::PseudoBoolean => pb += 1,
            ConstraintKind::General => general += 1,
        }
    }

    format!(
        "clauses:{} atm1:{} card:{} pb:{} general:{}",
        clauses, atmost1, card, pb, general
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Element;

    fn elems(terms: &[(i32, usize)]) -> Vec<Element> {
        terms.iter()
            .map(|&(factor, variable)| Element { factor, variable })
            .collect()
    }

    #[test]
    fn classifies_clause_with_negated_literals() {
        // x0 - x1 >= 0  is the clause  x0 or not x1.
        let cst = Constraint::greater_equal(elems(&[(1, 0), (-1, 1)]), 0);
        assert_eq!(constraint_kind(&cst), ConstraintKind::Clause);
    }

    #[test]
    fn classifies_at_most_one_and_cardinality() {
        let amo = Constraint::less_equal(elems(&[(1, 0), (1, 1), (1, 2)]), 1);
        assert_eq!(constraint_kind(&amo), ConstraintKind::AtMostOne);

        let card = Constraint::equal(elems(&[(1, 0), (1, 1), (1, 2)]), 2);
        assert_eq!(constraint_kind(&card), ConstraintKind::Cardinality);
    }

    #[test]
    fn classifies_general_factors() {
        let cst = Constraint::less_equal(elems(&[(2, 0), (1, 1)]), 2);
        assert_eq!(constraint_kind(&cst), ConstraintKind::General);
    }
}
