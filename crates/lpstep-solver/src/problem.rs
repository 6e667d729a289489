use std::fmt;

use crate::error::SolveError;

/// Represents a linear programming problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LpProblem {
    /// Variable names, in column order
    pub variables: Vec<String>,
    /// Objective function coefficients
    pub objective: Objective,
    /// Constraints, in input order
    pub constraints: Vec<Constraint>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to maximize or minimize
    pub maximize: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Name/label for the constraint (R1, R2, ...)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintOp::Le => write!(f, "<="),
            ConstraintOp::Ge => write!(f, ">="),
        }
    }
}

impl LpProblem {
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                maximize: true,
            },
            constraints: Vec::new(),
        }
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, maximize: bool) {
        self.objective = Objective { coefficients, maximize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// True when at least one constraint needs a surplus and artificial column
    pub fn needs_big_m(&self) -> bool {
        self.constraints.iter().any(|c| c.op == ConstraintOp::Ge)
    }

    /// Check the shape invariants the tableau builder relies on
    pub fn validate(&self) -> Result<(), SolveError> {
        let n = self.num_variables();
        if n == 0 {
            return Err(SolveError::NoVariables);
        }
        if self.constraints.is_empty() {
            return Err(SolveError::NoConstraints);
        }
        if self.objective.coefficients.len() != n {
            return Err(SolveError::ObjectiveDimension {
                expected: n,
                found: self.objective.coefficients.len(),
            });
        }
        if self.objective.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(SolveError::NonFiniteCoefficient {
                location: "objective".to_string(),
            });
        }
        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(SolveError::ConstraintDimension {
                    constraint: c.name.clone(),
                    expected: n,
                    found: c.coefficients.len(),
                });
            }
            if !c.rhs.is_finite() || c.coefficients.iter().any(|v| !v.is_finite()) {
                return Err(SolveError::NonFiniteCoefficient {
                    location: c.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Left-hand side of a constraint evaluated at `values`
    pub fn lhs(&self, constraint: &Constraint, values: &[f64]) -> f64 {
        constraint
            .coefficients
            .iter()
            .zip(values)
            .map(|(coef, value)| coef * value)
            .sum()
    }

    /// Whether `values` satisfies every constraint and non-negativity within `tolerance`
    pub fn is_satisfied_by(&self, values: &[f64], tolerance: f64) -> bool {
        if values.len() != self.num_variables() || values.iter().any(|&v| v < -tolerance) {
            return false;
        }
        self.constraints.iter().all(|c| {
            let lhs = self.lhs(c, values);
            match c.op {
                ConstraintOp::Le => lhs <= c.rhs + tolerance,
                ConstraintOp::Ge => lhs >= c.rhs - tolerance,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_vars() -> LpProblem {
        LpProblem::new(vec!["x1".to_string(), "x2".to_string()])
    }

    #[test]
    fn test_validate_rejects_missing_constraints() {
        let mut problem = two_vars();
        problem.set_objective(vec![3.0, 2.0], true);
        assert_eq!(problem.validate(), Err(SolveError::NoConstraints));
    }

    #[test]
    fn test_validate_rejects_dimension_mismatch() {
        let mut problem = two_vars();
        problem.set_objective(vec![3.0, 2.0], true);
        problem.add_constraint("R1", vec![1.0], ConstraintOp::Le, 4.0);
        assert_eq!(
            problem.validate(),
            Err(SolveError::ConstraintDimension {
                constraint: "R1".to_string(),
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn test_satisfaction_check() {
        let mut problem = two_vars();
        problem.set_objective(vec![1.0, 1.0], true);
        problem.add_constraint("R1", vec![1.0, 1.0], ConstraintOp::Le, 6.0);
        problem.add_constraint("R2", vec![1.0, 0.0], ConstraintOp::Ge, 1.0);

        assert!(problem.is_satisfied_by(&[2.0, 4.0], 1e-9));
        assert!(!problem.is_satisfied_by(&[0.0, 4.0], 1e-9));
        assert!(!problem.is_satisfied_by(&[3.0, 4.0], 1e-9));
        assert!(!problem.is_satisfied_by(&[2.0, -1.0], 1e-9));
        assert!(problem.needs_big_m());
    }
}
