use log::{debug, info, warn};

use crate::error::SolveError;
use crate::problem::LpProblem;
use crate::report;
use crate::solution::{IterationRecord, OptimalSolution, PivotInfo, SolveResult, SolveStatus, VariableValue};
use crate::tableau::{ColumnKind, DEFAULT_BIG_M, Tableau, TableauBuilder};

/// Tunables shared by every solve; immutable once the solver is built
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Maximum pivots before giving up (guards against cycling)
    pub max_iterations: usize,
    /// Tolerance for floating point comparisons
    pub tolerance: f64,
    /// Penalty for artificial variables
    pub big_m: f64,
    /// Attach a rendered report to optimal results
    pub with_report: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-10,
            big_m: DEFAULT_BIG_M,
            with_report: false,
        }
    }
}

/// Simplex solver for linear programming problems
#[derive(Debug, Clone, Default)]
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.config.tolerance = tol;
        self
    }

    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.config.big_m = big_m;
        self
    }

    pub fn with_report(mut self, enabled: bool) -> Self {
        self.config.with_report = enabled;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve the LP problem with the tableau simplex method (Big-M when any
    /// constraint is >=). Every failure is reported through the result status.
    pub fn solve(&self, problem: &LpProblem) -> SolveResult {
        let constraint_names: Vec<String> = problem.constraints.iter().map(|c| c.name.clone()).collect();
        let maximize = problem.objective.maximize;

        let tableau = match TableauBuilder::new().with_big_m(self.config.big_m).build(problem) {
            Ok(t) => t,
            Err(e) => return self.failed(e, maximize, constraint_names),
        };

        let outcome = match SimplexEngine::new(tableau, &self.config).run() {
            Ok(o) => o,
            Err(e) => return self.failed(e, maximize, constraint_names),
        };

        let mut result = self.finish(outcome, maximize, constraint_names);
        if self.config.with_report && result.is_optimal() {
            result.report = Some(report::render(&result));
        }
        result
    }

    /// Run a prebuilt tableau. The tableau is assumed to encode a maximization.
    pub fn solve_tableau(&self, tableau: Tableau) -> SolveResult {
        let constraint_names = (1..=tableau.num_constraints()).map(|i| format!("R{}", i)).collect();
        match SimplexEngine::new(tableau, &self.config).run() {
            Ok(outcome) => self.finish(outcome, true, constraint_names),
            Err(e) => self.failed(e, true, constraint_names),
        }
    }

    fn failed(&self, error: SolveError, maximize: bool, constraint_names: Vec<String>) -> SolveResult {
        info!("solve failed: {}", error);
        let mut result = SolveResult::error(error.to_string());
        result.maximize = maximize;
        result.constraint_names = constraint_names;
        result.big_m = self.config.big_m;
        result
    }

    fn finish(&self, outcome: EngineOutcome, maximize: bool, constraint_names: Vec<String>) -> SolveResult {
        let EngineOutcome {
            state,
            tableau,
            trace,
            unbounded_column,
        } = outcome;

        let (status, message, solution) = match state {
            EngineState::Optimal if !report::artificial_residue(&tableau).is_empty() => {
                let residue: Vec<String> = report::artificial_residue(&tableau)
                    .into_iter()
                    .map(|(name, value)| format!("{} = {}", name, value))
                    .collect();
                warn!("artificial variables remain basic at the optimum: {}", residue.join(", "));
                let message = format!(
                    "Problem is infeasible: artificial variables remain basic ({})",
                    residue.join(", ")
                );
                (SolveStatus::Error, Some(message), None)
            }
            EngineState::Optimal => {
                let variables = tableau
                    .columns()
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.kind == ColumnKind::Decision)
                    .map(|(j, c)| VariableValue {
                        name: c.name.clone(),
                        value: tableau.column_value(j),
                    })
                    .collect();

                // Undo the internal negation of minimization objectives
                let optimal_value = if maximize {
                    tableau.objective_value()
                } else {
                    -tableau.objective_value() + 0.0
                };

                let solution = OptimalSolution {
                    variables,
                    optimal_value,
                    basic_variables: tableau.basic_variables(),
                    non_basic_variables: tableau.non_basic_variables(),
                    final_tableau: tableau,
                };
                (SolveStatus::Optimal, None, Some(solution))
            }
            EngineState::Unbounded => {
                let entering = unbounded_column
                    .map(|j| tableau.columns()[j].name.clone())
                    .unwrap_or_default();
                let message = format!(
                    "Objective is unbounded: {} can increase without limit (no positive entry in its column)",
                    entering
                );
                (SolveStatus::Unbounded, Some(message), None)
            }
            EngineState::IterationLimitExceeded => {
                let message = format!(
                    "No optimum reached within {} pivots (possible cycling)",
                    self.config.max_iterations
                );
                (SolveStatus::IterationLimitExceeded, Some(message), None)
            }
            EngineState::Iterating => {
                (SolveStatus::Error, Some("Engine stopped before a terminal state".to_string()), None)
            }
        };

        info!("solve finished with status {} after {} records", status, trace.len());

        SolveResult {
            status,
            message,
            solution,
            iterations: trace,
            maximize,
            constraint_names,
            big_m: self.config.big_m,
            report: None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Iterating,
    Optimal,
    Unbounded,
    IterationLimitExceeded,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        self != EngineState::Iterating
    }
}

/// Terminal state of a finished engine
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    pub state: EngineState,
    pub tableau: Tableau,
    pub trace: Vec<IterationRecord>,
    /// Entering column that had no eligible leaving row
    pub unbounded_column: Option<usize>,
}

/// Working state of one solve. Owns its tableau; `run` consumes it, so an
/// engine cannot be shared between solves.
#[derive(Debug)]
pub struct SimplexEngine {
    tableau: Tableau,
    trace: Vec<IterationRecord>,
    state: EngineState,
    pivots: usize,
    max_iterations: usize,
    tolerance: f64,
    unbounded_column: Option<usize>,
}

impl SimplexEngine {
    pub fn new(tableau: Tableau, config: &SolverConfig) -> Self {
        let trace = vec![IterationRecord::initial(&tableau)];
        Self {
            tableau,
            trace,
            state: EngineState::Iterating,
            pivots: 0,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            unbounded_column: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    pub fn trace(&self) -> &[IterationRecord] {
        &self.trace
    }

    pub fn pivots(&self) -> usize {
        self.pivots
    }

    /// Dantzig rule: most negative objective-row entry, first one on ties
    pub fn entering_column(&self) -> Option<usize> {
        let obj = self.tableau.objective_row();
        let n_cols = self.tableau.rhs_column();

        let mut min_val = -self.tolerance;
        let mut min_col = None;
        for (j, &v) in obj.iter().enumerate().take(n_cols) {
            if v < min_val {
                min_val = v;
                min_col = Some(j);
            }
        }
        min_col
    }

    /// Minimum ratio test over rows with a positive entry, first one on ties
    pub fn leaving_row(&self, col: usize) -> Option<usize> {
        let mut min_ratio = f64::INFINITY;
        let mut min_row = None;

        for i in 0..self.tableau.num_constraints() {
            let val = self.tableau.value(i, col);
            if val > self.tolerance {
                let ratio = self.tableau.rhs(i) / val;
                if ratio >= 0.0 && ratio < min_ratio {
                    min_ratio = ratio;
                    min_row = Some(i);
                }
            }
        }
        min_row
    }

    /// Advance by one pivot, or settle into a terminal state
    pub fn step(&mut self) -> Result<EngineState, SolveError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        let Some(col) = self.entering_column() else {
            self.state = EngineState::Optimal;
            return Ok(self.state);
        };

        if self.pivots >= self.max_iterations {
            self.state = EngineState::IterationLimitExceeded;
            return Ok(self.state);
        }

        let Some(row) = self.leaving_row(col) else {
            self.unbounded_column = Some(col);
            self.state = EngineState::Unbounded;
            return Ok(self.state);
        };

        let columns = self.tableau.columns();
        let pivot = PivotInfo {
            iteration: self.pivots + 1,
            entering_variable: columns[col].name.clone(),
            leaving_variable: columns[self.tableau.basis()[row]].name.clone(),
            pivot_row: row,
            pivot_column: col,
            pivot_element: self.tableau.value(row, col),
        };

        self.tableau.pivot(row, col, self.tolerance)?;
        self.pivots += 1;

        debug!(
            "pivot {}: {} enters, {} leaves (row {}, column {}, element {}), z = {}",
            pivot.iteration,
            pivot.entering_variable,
            pivot.leaving_variable,
            row,
            col,
            pivot.pivot_element,
            self.tableau.objective_value()
        );

        self.trace.push(IterationRecord::after_pivot(&self.tableau, pivot));
        Ok(self.state)
    }

    /// Iterate until a terminal state
    pub fn run(mut self) -> Result<EngineOutcome, SolveError> {
        while !self.step()?.is_terminal() {}

        Ok(EngineOutcome {
            state: self.state,
            tableau: self.tableau,
            trace: self.trace,
            unbounded_column: self.unbounded_column,
        })
    }
}
