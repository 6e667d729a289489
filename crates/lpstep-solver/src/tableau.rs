use log::{debug, warn};

use crate::error::SolveError;
use crate::problem::{ConstraintOp, LpProblem};

/// Penalty applied to artificial variables in the Big-M objective row
pub const DEFAULT_BIG_M: f64 = 1_000_000.0;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Original decision variable
    Decision,
    /// Slack of a <= row
    Slack,
    /// Surplus of a >= row
    Surplus,
    /// Artificial seed of a >= row
    Artificial,
}

impl ColumnKind {
    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Decision => "decision",
            ColumnKind::Slack => "slack",
            ColumnKind::Surplus => "surplus",
            ColumnKind::Artificial => "artificial",
        }
    }
}

/// A named tableau column (every column except RHS)
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    /// Index of the constraint that introduced this column
    pub constraint: Option<usize>,
}

impl Column {
    pub fn decision(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Decision,
            constraint: None,
        }
    }

    fn auxiliary(kind: ColumnKind, constraint: usize) -> Self {
        let prefix = match kind {
            ColumnKind::Slack => 's',
            ColumnKind::Surplus => 'e',
            ColumnKind::Artificial => 'a',
            ColumnKind::Decision => 'x',
        };
        Self {
            name: format!("{}{}", prefix, constraint + 1),
            kind,
            constraint: Some(constraint),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construction {
    /// Only <= rows: `[A | I | b]` over `[-c | 0 | 0]`
    Standard,
    /// At least one >= row: surplus and artificial columns with M penalties
    BigM,
}

/// Simplex tableau: `m` constraint rows followed by the objective row.
/// The last column of every row is the right-hand side.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    rows: Vec<Vec<f64>>,
    columns: Vec<Column>,
    /// Column index of the basic variable of each constraint row
    basis: Vec<usize>,
    construction: Construction,
}

impl Tableau {
    /// Assemble a tableau from raw rows, checking its shape
    pub fn from_rows(rows: Vec<Vec<f64>>, columns: Vec<Column>, basis: Vec<usize>) -> Result<Self, SolveError> {
        if rows.len() < 2 {
            return Err(SolveError::InvalidTableau(
                "need at least one constraint row and the objective row".to_string(),
            ));
        }
        if basis.len() != rows.len() - 1 {
            return Err(SolveError::InvalidTableau(format!(
                "{} basic variables for {} constraint rows",
                basis.len(),
                rows.len() - 1
            )));
        }
        let width = columns.len() + 1;
        if let Some(i) = rows.iter().position(|r| r.len() != width) {
            return Err(SolveError::InvalidTableau(format!(
                "row {} has {} entries, expected {}",
                i,
                rows[i].len(),
                width
            )));
        }
        if let Some(&b) = basis.iter().find(|&&b| b >= columns.len()) {
            return Err(SolveError::InvalidTableau(format!("basic column {} out of range", b)));
        }

        let construction = if columns.iter().any(|c| c.kind == ColumnKind::Artificial) {
            Construction::BigM
        } else {
            Construction::Standard
        };

        Ok(Self {
            rows,
            columns,
            basis,
            construction,
        })
    }

    pub fn construction(&self) -> Construction {
        self.construction
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn basis(&self) -> &[usize] {
        &self.basis
    }

    pub fn num_constraints(&self) -> usize {
        self.rows.len() - 1
    }

    /// Index of the RHS column
    pub fn rhs_column(&self) -> usize {
        self.columns.len()
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.rows[row][col]
    }

    pub fn rhs(&self, row: usize) -> f64 {
        self.rows[row][self.rhs_column()]
    }

    pub fn objective_row(&self) -> &[f64] {
        &self.rows[self.rows.len() - 1]
    }

    /// Bottom-right cell: objective value of the internal maximization
    pub fn objective_value(&self) -> f64 {
        self.rhs(self.rows.len() - 1)
    }

    /// Value of a column in the current basic solution
    pub fn column_value(&self, col: usize) -> f64 {
        self.basis
            .iter()
            .position(|&b| b == col)
            .map(|row| self.rhs(row))
            .unwrap_or(0.0)
    }

    pub fn basic_variables(&self) -> Vec<String> {
        self.basis.iter().map(|&b| self.columns[b].name.clone()).collect()
    }

    /// Non-basic columns in column order; artificial columns are left out
    pub fn non_basic_variables(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(j, c)| c.kind != ColumnKind::Artificial && !self.basis.contains(j))
            .map(|(_, c)| c.name.clone())
            .collect()
    }

    /// Exchange the basic variable of `row` for column `col`
    pub fn pivot(&mut self, row: usize, col: usize, tolerance: f64) -> Result<(), SolveError> {
        let pivot_val = self.rows[row][col];
        if pivot_val.abs() < tolerance {
            return Err(SolveError::PivotTooSmall {
                row,
                column: col,
                value: pivot_val,
            });
        }

        let width = self.rows[row].len();

        for j in 0..width {
            self.rows[row][j] /= pivot_val;
        }

        let pivot_row = self.rows[row].clone();
        for (i, current) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = current[col];
            if factor == 0.0 {
                continue;
            }
            for (cell, &p) in current.iter_mut().zip(&pivot_row) {
                *cell -= factor * p;
            }
        }

        self.basis[row] = col;
        Ok(())
    }
}

/// Multiply every row with a negative right-hand side by -1, flipping its
/// operator, so the slack or artificial of each row starts non-negative
fn normalize_rhs(problem: &LpProblem) -> LpProblem {
    let mut normalized = problem.clone();
    for c in &mut normalized.constraints {
        if c.rhs < 0.0 {
            warn!("{} has negative right-hand side {}; row negated", c.name, c.rhs);
            c.coefficients.iter_mut().for_each(|a| *a = -*a);
            c.rhs = -c.rhs;
            c.op = match c.op {
                ConstraintOp::Le => ConstraintOp::Ge,
                ConstraintOp::Ge => ConstraintOp::Le,
            };
        }
    }
    normalized
}

/// Turns an [`LpProblem`] into its initial tableau
#[derive(Debug, Clone)]
pub struct TableauBuilder {
    big_m: f64,
}

impl Default for TableauBuilder {
    fn default() -> Self {
        Self { big_m: DEFAULT_BIG_M }
    }
}

impl TableauBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = big_m;
        self
    }

    pub fn big_m(&self) -> f64 {
        self.big_m
    }

    /// Build the initial tableau. Minimization objectives are negated so the
    /// engine always maximizes.
    pub fn build(&self, problem: &LpProblem) -> Result<Tableau, SolveError> {
        problem.validate()?;
        let normalized = normalize_rhs(problem);
        let problem = &normalized;

        let objective: Vec<f64> = if problem.objective.maximize {
            problem.objective.coefficients.clone()
        } else {
            problem.objective.coefficients.iter().map(|c| -c).collect()
        };

        let tableau = if problem.needs_big_m() {
            self.build_big_m(problem, &objective)
        } else {
            self.build_standard(problem, &objective)
        }?;

        debug!(
            "built {:?} tableau: {} rows x {} columns, basis {:?}",
            tableau.construction(),
            tableau.rows().len(),
            tableau.rhs_column() + 1,
            tableau.basic_variables()
        );
        Ok(tableau)
    }

    fn build_standard(&self, problem: &LpProblem, objective: &[f64]) -> Result<Tableau, SolveError> {
        let n = problem.num_variables();
        let m = problem.num_constraints();

        let mut columns: Vec<Column> = problem.variables.iter().map(Column::decision).collect();
        columns.extend((0..m).map(|i| Column::auxiliary(ColumnKind::Slack, i)));
        let width = n + m + 1;

        let mut rows = Vec::with_capacity(m + 1);
        for (i, c) in problem.constraints.iter().enumerate() {
            let mut row = vec![0.0; width];
            row[..n].copy_from_slice(&c.coefficients);
            row[n + i] = 1.0;
            row[width - 1] = c.rhs;
            rows.push(row);
        }

        let mut obj_row = vec![0.0; width];
        for (cell, &c) in obj_row.iter_mut().zip(objective) {
            *cell = -c;
        }
        rows.push(obj_row);

        let basis = (n..n + m).collect();
        Tableau::from_rows(rows, columns, basis)
    }

    fn build_big_m(&self, problem: &LpProblem, objective: &[f64]) -> Result<Tableau, SolveError> {
        let n = problem.num_variables();
        let m = problem.num_constraints();

        let le_rows: Vec<usize> = (0..m).filter(|&i| problem.constraints[i].op == ConstraintOp::Le).collect();
        let ge_rows: Vec<usize> = (0..m).filter(|&i| problem.constraints[i].op == ConstraintOp::Ge).collect();

        // Layout: decision | slack | surplus | artificial | RHS
        let slack_start = n;
        let surplus_start = slack_start + le_rows.len();
        let artificial_start = surplus_start + ge_rows.len();
        let width = artificial_start + ge_rows.len() + 1;

        let mut columns: Vec<Column> = problem.variables.iter().map(Column::decision).collect();
        columns.extend(le_rows.iter().map(|&i| Column::auxiliary(ColumnKind::Slack, i)));
        columns.extend(ge_rows.iter().map(|&i| Column::auxiliary(ColumnKind::Surplus, i)));
        columns.extend(ge_rows.iter().map(|&i| Column::auxiliary(ColumnKind::Artificial, i)));

        let mut rows = Vec::with_capacity(m + 1);
        let mut basis = Vec::with_capacity(m);
        let mut slack_idx = slack_start;
        let mut surplus_idx = surplus_start;
        let mut artificial_idx = artificial_start;

        for c in &problem.constraints {
            let mut row = vec![0.0; width];
            row[..n].copy_from_slice(&c.coefficients);
            row[width - 1] = c.rhs;

            match c.op {
                ConstraintOp::Le => {
                    row[slack_idx] = 1.0;
                    basis.push(slack_idx);
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    row[surplus_idx] = -1.0;
                    row[artificial_idx] = 1.0;
                    basis.push(artificial_idx);
                    surplus_idx += 1;
                    artificial_idx += 1;
                }
            }
            rows.push(row);
        }

        let mut obj_row = vec![0.0; width];
        for (cell, &c) in obj_row.iter_mut().zip(objective) {
            *cell = -c;
        }
        for cell in &mut obj_row[artificial_start..width - 1] {
            *cell = self.big_m;
        }

        // Cancel the penalty of every artificial that starts in the basis
        for (i, &b) in basis.iter().enumerate() {
            if b >= artificial_start {
                for (cell, &v) in obj_row.iter_mut().zip(&rows[i]) {
                    *cell -= self.big_m * v;
                }
            }
        }
        rows.push(obj_row);

        Tableau::from_rows(rows, columns, basis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(vars: &[&str]) -> Vec<String> {
        vars.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_standard_layout() {
        let mut problem = LpProblem::new(names(&["x1", "x2"]));
        problem.set_objective(vec![3.0, 2.0], true);
        problem.add_constraint("R1", vec![1.0, 1.0], ConstraintOp::Le, 6.0);
        problem.add_constraint("R2", vec![2.0, 1.0], ConstraintOp::Le, 8.0);

        let tableau = TableauBuilder::new().build(&problem).unwrap();

        assert_eq!(tableau.construction(), Construction::Standard);
        assert_eq!(tableau.rows()[0], vec![1.0, 1.0, 1.0, 0.0, 6.0]);
        assert_eq!(tableau.rows()[1], vec![2.0, 1.0, 0.0, 1.0, 8.0]);
        assert_eq!(tableau.objective_row(), &[-3.0, -2.0, 0.0, 0.0, 0.0]);
        assert_eq!(tableau.basic_variables(), names(&["s1", "s2"]));
        assert_eq!(tableau.non_basic_variables(), names(&["x1", "x2"]));
    }

    #[test]
    fn test_minimization_negates_objective() {
        let mut problem = LpProblem::new(names(&["x1", "x2"]));
        problem.set_objective(vec![2.0, 5.0], false);
        problem.add_constraint("R1", vec![1.0, 1.0], ConstraintOp::Le, 4.0);

        let tableau = TableauBuilder::new().build(&problem).unwrap();
        assert_eq!(tableau.objective_row(), &[2.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_big_m_layout_and_penalty_cancellation() {
        let mut problem = LpProblem::new(names(&["x1", "x2"]));
        problem.set_objective(vec![30.0, 50.0], true);
        problem.add_constraint("R1", vec![1.0, 3.0], ConstraintOp::Le, 200.0);
        problem.add_constraint("R2", vec![1.0, 0.0], ConstraintOp::Ge, 20.0);

        let tableau = TableauBuilder::new().build(&problem).unwrap();
        let columns: Vec<&str> = tableau.columns().iter().map(|c| c.name.as_str()).collect();

        assert_eq!(tableau.construction(), Construction::BigM);
        assert_eq!(columns, vec!["x1", "x2", "s1", "e2", "a2"]);
        assert_eq!(tableau.rows()[1], vec![1.0, 0.0, 0.0, -1.0, 1.0, 20.0]);
        assert_eq!(tableau.basic_variables(), names(&["s1", "a2"]));

        let obj = tableau.objective_row();
        assert_eq!(obj[0], -30.0 - DEFAULT_BIG_M);
        assert_eq!(obj[1], -50.0);
        assert_eq!(obj[3], DEFAULT_BIG_M);
        // basic artificial carries no reduced cost
        assert_eq!(obj[4], 0.0);
        assert_eq!(obj[5], -20.0 * DEFAULT_BIG_M);
        assert_eq!(tableau.non_basic_variables(), names(&["x1", "x2", "e2"]));
    }

    #[test]
    fn test_negative_rhs_ge_row_becomes_le() {
        // x1 - x2 >= -2  ->  -x1 + x2 <= 2, no artificial needed
        let mut problem = LpProblem::new(names(&["x1", "x2"]));
        problem.set_objective(vec![0.0, 1.0], true);
        problem.add_constraint("R1", vec![1.0, -1.0], ConstraintOp::Ge, -2.0);
        problem.add_constraint("R2", vec![1.0, 1.0], ConstraintOp::Le, 4.0);

        let tableau = TableauBuilder::new().build(&problem).unwrap();
        assert_eq!(tableau.construction(), Construction::Standard);
        assert_eq!(tableau.rows()[0], vec![-1.0, 1.0, 1.0, 0.0, 2.0]);
        assert_eq!(tableau.basic_variables(), names(&["s1", "s2"]));
    }

    #[test]
    fn test_negative_rhs_le_row_becomes_ge() {
        // -x1 - x2 <= -2  ->  x1 + x2 >= 2, seeded by an artificial
        let mut problem = LpProblem::new(names(&["x1", "x2"]));
        problem.set_objective(vec![1.0, 1.0], false);
        problem.add_constraint("R1", vec![-1.0, -1.0], ConstraintOp::Le, -2.0);
        problem.add_constraint("R2", vec![1.0, 0.0], ConstraintOp::Le, 5.0);

        let tableau = TableauBuilder::new().build(&problem).unwrap();
        let columns: Vec<&str> = tableau.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(tableau.construction(), Construction::BigM);
        assert_eq!(columns, vec!["x1", "x2", "s2", "e1", "a1"]);
        assert_eq!(tableau.rows()[0], vec![1.0, 1.0, 0.0, -1.0, 1.0, 2.0]);
        assert!(tableau.rows()[..2].iter().all(|r| r[5] >= 0.0));
    }

    #[test]
    fn test_pivot_rejects_tiny_element() {
        let mut problem = LpProblem::new(names(&["x1"]));
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("R1", vec![1e-12], ConstraintOp::Le, 1.0);

        let mut tableau = TableauBuilder::new().build(&problem).unwrap();
        let err = tableau.pivot(0, 0, 1e-10).unwrap_err();
        assert!(matches!(err, SolveError::PivotTooSmall { row: 0, column: 0, .. }));
    }

    #[test]
    fn test_from_rows_checks_shape() {
        let columns = vec![Column::decision("x1")];
        let err = Tableau::from_rows(vec![vec![1.0, 2.0], vec![1.0]], columns, vec![0]).unwrap_err();
        assert!(matches!(err, SolveError::InvalidTableau(_)));
    }
}
