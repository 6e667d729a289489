use std::fmt;

use crate::tableau::Tableau;

/// Terminal status of a solve
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// An optimal solution was found
    Optimal,
    /// The objective can grow without limit
    Unbounded,
    /// The pivot budget ran out before optimality
    IterationLimitExceeded,
    /// Malformed input or a numeric failure
    Error,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Unbounded => write!(f, "unbounded"),
            SolveStatus::IterationLimitExceeded => write!(f, "iteration_limit_exceeded"),
            SolveStatus::Error => write!(f, "error"),
        }
    }
}

/// Metadata of a single pivot
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PivotInfo {
    /// 1-based pivot count
    pub iteration: usize,
    pub entering_variable: String,
    pub leaving_variable: String,
    pub pivot_row: usize,
    pub pivot_column: usize,
    /// Pivot element before normalization
    pub pivot_element: f64,
}

/// One entry of the solve trace
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub description: String,
    /// Full copy of the tableau after this step
    pub tableau: Tableau,
    pub basic_variables: Vec<String>,
    pub non_basic_variables: Vec<String>,
    /// Absent for the initial tableau
    pub pivot: Option<PivotInfo>,
}

impl IterationRecord {
    pub fn initial(tableau: &Tableau) -> Self {
        Self {
            description: "Initial tableau".to_string(),
            tableau: tableau.clone(),
            basic_variables: tableau.basic_variables(),
            non_basic_variables: tableau.non_basic_variables(),
            pivot: None,
        }
    }

    pub fn after_pivot(tableau: &Tableau, pivot: PivotInfo) -> Self {
        Self {
            description: format!("Iteration {}", pivot.iteration),
            tableau: tableau.clone(),
            basic_variables: tableau.basic_variables(),
            non_basic_variables: tableau.non_basic_variables(),
            pivot: Some(pivot),
        }
    }

    /// Objective value of the internal maximization at this step
    pub fn objective_value(&self) -> f64 {
        self.tableau.objective_value()
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct VariableValue {
    pub name: String,
    pub value: f64,
}

/// Numeric fields, present only when the status is optimal
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct OptimalSolution {
    /// Decision variable values, in declaration order
    pub variables: Vec<VariableValue>,
    /// Objective value in the caller's sense (minimization undone)
    pub optimal_value: f64,
    pub basic_variables: Vec<String>,
    pub non_basic_variables: Vec<String>,
    pub final_tableau: Tableau,
}

impl OptimalSolution {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.variables.iter().find(|v| v.name == name).map(|v| v.value)
    }

    pub fn values(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.value).collect()
    }
}

/// The result of solving an LP problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    pub status: SolveStatus,
    /// Human-readable explanation for non-optimal statuses
    pub message: Option<String>,
    pub solution: Option<OptimalSolution>,
    /// Ordered audit trail; empty when the solve failed before a tableau existed
    pub iterations: Vec<IterationRecord>,
    pub maximize: bool,
    pub constraint_names: Vec<String>,
    /// M used for the artificial penalties (needed to render the objective row)
    pub big_m: f64,
    pub report: Option<String>,
}

impl SolveResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SolveStatus::Error,
            message: Some(message.into()),
            solution: None,
            iterations: Vec::new(),
            maximize: true,
            constraint_names: Vec::new(),
            big_m: crate::tableau::DEFAULT_BIG_M,
            report: None,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    pub fn optimal_value(&self) -> Option<f64> {
        self.solution.as_ref().map(|s| s.optimal_value)
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.solution.as_ref().and_then(|s| s.value(name))
    }

    /// Number of pivots performed
    pub fn pivot_count(&self) -> usize {
        self.iterations.iter().filter(|r| r.pivot.is_some()).count()
    }
}
