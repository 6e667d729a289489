mod error;
mod problem;
pub mod report;
mod simplex;
mod solution;
mod tableau;

pub use error::SolveError;
pub use problem::{Constraint, ConstraintOp, LpProblem, Objective};
pub use simplex::{EngineOutcome, EngineState, SimplexEngine, Solver, SolverConfig};
pub use solution::{IterationRecord, OptimalSolution, PivotInfo, SolveResult, SolveStatus, VariableValue};
pub use tableau::{Column, ColumnKind, Construction, DEFAULT_BIG_M, Tableau, TableauBuilder};
