use lpstep_solver::ConstraintOp;

use crate::parser::{ParseError, ParseResult};

/// `c1·v1 + c2·v2 + ... + k`, with repeated variables merged in order of
/// first appearance
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(String, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn add_term(&mut self, variable: &str, coefficient: f64) {
        match self.terms.iter_mut().find(|(name, _)| name == variable) {
            Some((_, c)) => *c += coefficient,
            None => self.terms.push((variable.to_string(), coefficient)),
        }
    }

    pub fn coefficient(&self, variable: &str) -> f64 {
        self.terms
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, c)| *c)
            .unwrap_or(0.0)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(name, _)| name.as_str())
    }

    /// Dense coefficient vector over `variables`. Variables the expression
    /// does not mention get 0; a variable outside the list is an error.
    pub fn coefficients(&self, variables: &[String]) -> ParseResult<Vec<f64>> {
        if let Some(unknown) = self.variables().find(|v| !variables.iter().any(|d| d == *v)) {
            return Err(ParseError::UnknownVariable(unknown.to_string()));
        }
        Ok(variables.iter().map(|v| self.coefficient(v)).collect())
    }
}

/// A constraint in canonical form: variable terms on the left, constant on the right
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub op: ConstraintOp,
    pub rhs: f64,
}

impl LinearConstraint {
    /// Move every variable to the left and every constant to the right.
    /// The relational operator is kept as written.
    pub fn canonical(lhs: LinearExpr, op: ConstraintOp, rhs: LinearExpr) -> Self {
        let mut expr = LinearExpr {
            terms: lhs.terms,
            constant: 0.0,
        };
        for (name, c) in &rhs.terms {
            expr.add_term(name, -c);
        }
        Self {
            expr,
            op,
            rhs: rhs.constant - lhs.constant,
        }
    }

    pub fn coefficients(&self, variables: &[String]) -> ParseResult<Vec<f64>> {
        self.expr.coefficients(variables)
    }

    /// `x >= 0` (or `-x <= 0`): implied by non-negativity, never stored
    pub fn as_bound(&self) -> Option<&str> {
        if self.rhs != 0.0 {
            return None;
        }
        let mut nonzero = self.expr.terms.iter().filter(|(_, c)| *c != 0.0);
        let (name, c) = nonzero.next()?;
        if nonzero.next().is_some() {
            return None;
        }
        match self.op {
            ConstraintOp::Ge if *c > 0.0 => Some(name.as_str()),
            ConstraintOp::Le if *c < 0.0 => Some(name.as_str()),
            _ => None,
        }
    }
}

/// Classification of one constraint line
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintLine {
    /// Non-negativity marker such as `x1 >= 0` or `x1, x2 >= 0`
    Bound { variables: Vec<String> },
    Linear(LinearConstraint),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(terms: &[(&str, f64)], constant: f64) -> LinearExpr {
        LinearExpr {
            terms: terms.iter().map(|(n, c)| (n.to_string(), *c)).collect(),
            constant,
        }
    }

    #[test]
    fn test_canonical_moves_terms_left() {
        // x2 >= 2x1  ->  x2 - 2x1 >= 0
        let c = LinearConstraint::canonical(expr(&[("x2", 1.0)], 0.0), ConstraintOp::Ge, expr(&[("x1", 2.0)], 0.0));
        assert_eq!(c.op, ConstraintOp::Ge);
        assert_eq!(c.rhs, 0.0);
        assert_eq!(c.expr.coefficient("x1"), -2.0);
        assert_eq!(c.expr.coefficient("x2"), 1.0);
        assert_eq!(c.as_bound(), None);
    }

    #[test]
    fn test_canonical_moves_constants_right() {
        // x1 + 3 <= 7 + x2  ->  x1 - x2 <= 4
        let c = LinearConstraint::canonical(expr(&[("x1", 1.0)], 3.0), ConstraintOp::Le, expr(&[("x2", 1.0)], 7.0));
        assert_eq!(c.rhs, 4.0);
        let vars = vec!["x1".to_string(), "x2".to_string()];
        assert_eq!(c.coefficients(&vars).unwrap(), vec![1.0, -1.0]);
    }

    #[test]
    fn test_bound_detection() {
        let ge = LinearConstraint::canonical(expr(&[("x1", 1.0)], 0.0), ConstraintOp::Ge, expr(&[], 0.0));
        assert_eq!(ge.as_bound(), Some("x1"));

        let flipped = LinearConstraint::canonical(expr(&[], 0.0), ConstraintOp::Le, expr(&[("x2", 1.0)], 0.0));
        assert_eq!(flipped.as_bound(), Some("x2"));

        let lower = LinearConstraint::canonical(expr(&[("x1", 1.0)], 0.0), ConstraintOp::Ge, expr(&[], 20.0));
        assert_eq!(lower.as_bound(), None);
    }

    #[test]
    fn test_unknown_variable() {
        let e = expr(&[("y", 1.0)], 0.0);
        assert_eq!(
            e.coefficients(&["x1".to_string()]),
            Err(ParseError::UnknownVariable("y".to_string()))
        );
    }
}
