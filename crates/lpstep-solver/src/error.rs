use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("Problem declares no variables")]
    NoVariables,
    #[error("Problem has no constraints")]
    NoConstraints,
    #[error("Objective has {found} coefficients but {expected} variables are declared")]
    ObjectiveDimension { expected: usize, found: usize },
    #[error("Constraint {constraint} has {found} coefficients but {expected} variables are declared")]
    ConstraintDimension {
        constraint: String,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite coefficient in {location}")]
    NonFiniteCoefficient { location: String },
    #[error("Tableau shape is invalid: {0}")]
    InvalidTableau(String),
    #[error("Pivot element {value:e} at row {row}, column {column} is below tolerance")]
    PivotTooSmall { row: usize, column: usize, value: f64 },
}
