//! Human-readable rendering of solve results and their pivot trace.
//!
//! Every function here is pure: rendering the same [`SolveResult`] twice
//! produces the same text.

use std::fmt::Write;

use crate::problem::LpProblem;
use crate::solution::{IterationRecord, PivotInfo, SolveResult};
use crate::tableau::{ColumnKind, Construction, Tableau, TableauBuilder};

/// Slack values at or below this are reported as binding
pub const REPORT_TOLERANCE: f64 = 1e-6;

const WIDE_RULE: usize = 80;
const NARROW_RULE: usize = 60;

/// Format a tableau entry compactly. Entries of Big-M magnitude are written
/// as multiples of M plus a remainder, e.g. `-M-30`.
pub fn format_value(value: f64, big_m: f64) -> String {
    if value.abs() < 1e-10 {
        return "0".to_string();
    }

    if big_m > 0.0 && value.abs() >= big_m / 10.0 {
        let k = (value / big_m).round();
        if k != 0.0 {
            let m_part = if k == 1.0 {
                "M".to_string()
            } else if k == -1.0 {
                "-M".to_string()
            } else {
                format!("{}M", format_plain(k))
            };
            let rest = value - k * big_m;
            if rest.abs() < REPORT_TOLERANCE {
                return m_part;
            }
            let sign = if rest < 0.0 { '-' } else { '+' };
            return format!("{}{}{}", m_part, sign, format_plain(rest.abs()));
        }
    }

    format_plain(value)
}

fn format_plain(value: f64) -> String {
    if (value - value.round()).abs() < REPORT_TOLERANCE {
        let rounded = value.round();
        // avoid printing "-0"
        if rounded == 0.0 {
            return "0".to_string();
        }
        return format!("{}", rounded as i64);
    }
    let text = if value.abs() >= 0.1 {
        format!("{:.2}", value)
    } else {
        format!("{:.4}", value)
    };
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Render one tableau. When `pivot` is given, the pivot cell, row and column
/// are marked.
pub fn render_tableau(tableau: &Tableau, pivot: Option<&PivotInfo>, big_m: f64) -> String {
    let (hl_row, hl_col) = match pivot {
        Some(p) => (Some(p.pivot_row), Some(p.pivot_column)),
        None => (None, None),
    };
    let columns = tableau.columns();
    let rhs_col = tableau.rhs_column();

    let mut header = vec!["Basis".to_string()];
    for (j, c) in columns.iter().enumerate() {
        if hl_col == Some(j) {
            header.push(format!("[{}]", c.name));
        } else {
            header.push(c.name.clone());
        }
    }
    header.push("RHS".to_string());

    let mut body: Vec<Vec<String>> = Vec::with_capacity(tableau.rows().len());
    for (i, row) in tableau.rows().iter().enumerate() {
        let is_objective = i == tableau.num_constraints();
        let label = if is_objective {
            "Z".to_string()
        } else {
            let name = &columns[tableau.basis()[i]].name;
            if hl_row == Some(i) {
                format!(">{}<", name)
            } else {
                name.clone()
            }
        };

        let mut cells = vec![label];
        for (j, &v) in row.iter().enumerate() {
            let text = format_value(v, big_m);
            let in_row = !is_objective && hl_row == Some(i);
            let in_col = j != rhs_col && hl_col == Some(j);
            cells.push(match (in_row, in_col) {
                (true, true) => format!("*{}*", text),
                (true, false) => format!("({})", text),
                (false, true) => format!("[{}]", text),
                (false, false) => text,
            });
        }
        body.push(cells);
    }

    let n = header.len();
    let mut widths = vec![0usize; n];
    for line in std::iter::once(&header).chain(body.iter()) {
        for (w, cell) in widths.iter_mut().zip(line) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &header, &widths);
    let total: usize = widths.iter().sum::<usize>() + 2 * (n - 1);
    let _ = writeln!(out, "{}", "-".repeat(total));
    for (i, line) in body.iter().enumerate() {
        if i == tableau.num_constraints() {
            let _ = writeln!(out, "{}", "-".repeat(total));
        }
        push_row(&mut out, line, &widths);
    }

    if pivot.is_some() {
        let _ = writeln!(
            out,
            "Legend: *v* pivot element, (v) pivot row, [v] pivot column, >var< pivot row basis (entering variable)"
        );
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (j, (cell, &w)) in cells.iter().zip(widths).enumerate() {
        if j == 0 {
            let _ = write!(line, "{:<w$}", cell, w = w);
        } else {
            let _ = write!(line, "  {:>w$}", cell, w = w);
        }
    }
    let _ = writeln!(out, "{}", line.trim_end());
}

fn render_record(out: &mut String, record: &IterationRecord, big_m: f64) {
    match &record.pivot {
        None => {
            let _ = writeln!(out, "\n{:^width$}", record.description.to_uppercase(), width = NARROW_RULE);
            let _ = writeln!(out, "{}", "=".repeat(NARROW_RULE));
        }
        Some(p) => {
            let _ = writeln!(out, "\n{:^width$}", record.description.to_uppercase(), width = NARROW_RULE);
            let _ = writeln!(out, "{}", "-".repeat(NARROW_RULE));
            let _ = writeln!(out, "Entering variable: {} (column {})", p.entering_variable, p.pivot_column + 1);
            let _ = writeln!(out, "Leaving variable: {} (row {})", p.leaving_variable, p.pivot_row + 1);
            let _ = writeln!(out, "Pivot element: {}", format_value(p.pivot_element, big_m));
        }
    }
    let _ = writeln!(out, "Basic variables: {}", record.basic_variables.join(", "));
    let _ = writeln!(out, "Non-basic variables: {}", record.non_basic_variables.join(", "));
    out.push_str(&render_tableau(&record.tableau, record.pivot.as_ref(), big_m));
    if record.pivot.is_some() {
        let _ = writeln!(out, "Current Z: {}", format_value(record.objective_value(), big_m));
    }
}

/// Full report: values, optimal value, basic roles, every traced tableau and
/// a binding/slack interpretation of each constraint.
pub fn render(result: &SolveResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));
    let _ = writeln!(out, "SIMPLEX SOLUTION");
    let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));
    let _ = writeln!(out, "Status: {}", result.status);

    let Some(solution) = &result.solution else {
        if let Some(message) = &result.message {
            let _ = writeln!(out, "{}", message);
        }
        let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));
        return out;
    };

    let sense = if result.maximize { "maximization" } else { "minimization" };
    let _ = writeln!(out, "Problem type: {}", sense);

    let _ = writeln!(out, "\nOptimal solution:");
    for v in &solution.variables {
        let _ = writeln!(out, "  {} = {:.6}", v.name, v.value);
    }

    let _ = writeln!(out, "\nOptimal value:");
    let _ = writeln!(out, "  Z = {:.6}", solution.optimal_value);

    let tableau = &solution.final_tableau;
    let _ = writeln!(out, "\nFinal basic variables:");
    for (i, &b) in tableau.basis().iter().enumerate() {
        let column = &tableau.columns()[b];
        let _ = writeln!(out, "  {} = {:.6} ({})", column.name, tableau.rhs(i), column.kind.label());
    }

    if result.iterations.len() > 1 {
        let _ = writeln!(out, "\nSIMPLEX ITERATIONS");
        let _ = writeln!(out, "{}", "=".repeat(NARROW_RULE));
        let _ = writeln!(out, "Pivots performed: {}", result.pivot_count());
        if tableau.construction() == Construction::BigM {
            let _ = writeln!(out, "Big-M penalty: M = {}", format_plain(result.big_m));
        }
    }
    for record in &result.iterations {
        render_record(&mut out, record, result.big_m);
    }

    let _ = writeln!(out, "\nInterpretation:");
    let verb = if result.maximize { "maximum" } else { "minimum" };
    let _ = writeln!(out, "  The {} objective value is {:.6}", verb, solution.optimal_value);
    for (i, name) in result.constraint_names.iter().enumerate() {
        let aux = tableau.columns().iter().position(|c| {
            c.constraint == Some(i) && matches!(c.kind, ColumnKind::Slack | ColumnKind::Surplus)
        });
        let Some(j) = aux else {
            continue;
        };
        let column = &tableau.columns()[j];
        let value = tableau.column_value(j);
        if value.abs() <= REPORT_TOLERANCE {
            let _ = writeln!(out, "  {}: binding ({} = 0)", name, column.name);
        } else {
            let _ = writeln!(
                out,
                "  {}: slack ({} = {:.6} {} unused)",
                name,
                column.name,
                value,
                column.kind.label()
            );
        }
    }
    let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));
    out
}

/// Artificial variables left in the basis at a non-zero value
pub fn artificial_residue(tableau: &Tableau) -> Vec<(String, f64)> {
    tableau
        .basis()
        .iter()
        .enumerate()
        .filter_map(|(i, &b)| {
            let column = &tableau.columns()[b];
            let value = tableau.rhs(i);
            (column.kind == ColumnKind::Artificial && value.abs() > REPORT_TOLERANCE).then(|| (column.name.clone(), value))
        })
        .collect()
}

/// Short per-step listing of basic and non-basic variables
pub fn render_iteration_summary(result: &SolveResult) -> String {
    if result.iterations.is_empty() {
        return "No iterations available\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "ITERATION SUMMARY");
    let _ = writeln!(out, "{}", "=".repeat(50));
    for record in &result.iterations {
        let _ = writeln!(out, "\n{}:", record.description);
        if let Some(p) = &record.pivot {
            let _ = writeln!(out, "{} enters, {} leaves", p.entering_variable, p.leaving_variable);
        }
        let _ = writeln!(out, "Basic variables: {}", record.basic_variables.join(", "));
        let _ = writeln!(out, "Non-basic variables: {}", record.non_basic_variables.join(", "));
        let _ = writeln!(out, "Z = {}", format_value(record.objective_value(), result.big_m));
    }
    out
}

fn format_linear(terms: &[(f64, &str)]) -> String {
    let mut out = String::new();
    for &(coef, name) in terms {
        if coef.abs() < 1e-12 {
            continue;
        }
        let magnitude = if (coef.abs() - 1.0).abs() < 1e-12 {
            String::new()
        } else {
            format_plain(coef.abs())
        };
        if out.is_empty() {
            if coef < 0.0 {
                out.push('-');
            }
        } else {
            out.push_str(if coef < 0.0 { " - " } else { " + " });
        }
        out.push_str(&magnitude);
        out.push_str(name);
    }
    if out.is_empty() {
        out.push('0');
    }
    out
}

/// Explain how the problem is turned into equalities before the first pivot
pub fn render_standard_form(problem: &LpProblem) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));
    let _ = writeln!(out, "STANDARD FORM CONVERSION");
    let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));

    let sense = if problem.objective.maximize { "Maximize" } else { "Minimize" };
    let objective: Vec<(f64, &str)> = problem
        .objective
        .coefficients
        .iter()
        .zip(&problem.variables)
        .map(|(&c, v)| (c, v.as_str()))
        .collect();

    let _ = writeln!(out, "\nOriginal problem:");
    let _ = writeln!(out, "  {} Z = {}", sense, format_linear(&objective));
    let _ = writeln!(out, "  Subject to:");
    for c in &problem.constraints {
        let terms: Vec<(f64, &str)> = c
            .coefficients
            .iter()
            .zip(&problem.variables)
            .map(|(&a, v)| (a, v.as_str()))
            .collect();
        let _ = writeln!(out, "    {}: {} {} {}", c.name, format_linear(&terms), c.op, format_plain(c.rhs));
    }
    let _ = writeln!(out, "    {} >= 0", problem.variables.join(", "));

    let tableau = match TableauBuilder::new().build(problem) {
        Ok(t) => t,
        Err(e) => {
            let _ = writeln!(out, "\nCannot convert: {}", e);
            let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));
            return out;
        }
    };

    let columns = tableau.columns();
    let _ = writeln!(out, "\nStandard form:");
    match tableau.construction() {
        Construction::Standard => {
            let _ = writeln!(out, "  One slack variable per <= constraint turns it into an equality:");
        }
        Construction::BigM => {
            let _ = writeln!(
                out,
                "  <= rows gain a slack; >= rows subtract a surplus and add an artificial variable:"
            );
        }
    }
    for (i, c) in problem.constraints.iter().enumerate() {
        let terms: Vec<(f64, &str)> = tableau.rows()[i][..columns.len()]
            .iter()
            .zip(columns)
            .map(|(&a, col)| (a, col.name.as_str()))
            .collect();
        let _ = writeln!(out, "    {}: {} = {}", c.name, format_linear(&terms), format_plain(c.rhs));
    }
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    let _ = writeln!(out, "    {} >= 0", names.join(", "));

    let artificials: Vec<&str> = columns
        .iter()
        .filter(|c| c.kind == ColumnKind::Artificial)
        .map(|c| c.name.as_str())
        .collect();
    if !artificials.is_empty() {
        // artificial penalties work against the optimization direction
        let penalty = if problem.objective.maximize { -1.0 } else { 1.0 };
        let labels: Vec<String> = artificials.iter().map(|a| format!("M{}", a)).collect();
        let mut terms = objective.clone();
        terms.extend(labels.iter().map(|l| (penalty, l.as_str())));
        let _ = writeln!(out, "\n  Penalized objective: {} Z = {}", sense, format_linear(&terms));
    }

    let _ = writeln!(out, "{}", "=".repeat(WIDE_RULE));
    out
}
