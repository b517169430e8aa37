use super::{Model, WeightedFormula};
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::process::{Command, Stdio};

/// A trait for MaxSAT solvers.
///
/// The core never depends on a concrete solver, only on this contract: a
/// solver consumes a weighted formula and returns either a model or the
/// information that the hard clauses are unsatisfiable.
pub trait MaxSatSolver {
    /// Solves the given formula.
    ///
    /// Returns `None` if the hard clauses are unsatisfiable.
    fn solve(&mut self, formula: &WeightedFormula) -> Result<Option<Model>>;
}

impl<F> MaxSatSolver for F
where
    F: FnMut(&WeightedFormula) -> Result<Option<Model>>,
{
    fn solve(&mut self, formula: &WeightedFormula) -> Result<Option<Model>> {
        self(formula)
    }
}

/// A MaxSAT solver which execution is made by a system command.
///
/// The solver must read a WCNF instance from its standard input and answer on
/// its standard output in the format of the MaxSAT evaluations: an `s` status
/// line (`OPTIMUM FOUND`, `SATISFIABLE` or `UNSATISFIABLE`) and `v` value
/// lines of signed literals.
pub struct ExternalMaxSatSolver {
    program: String,
    options: Vec<String>,
}

impl ExternalMaxSatSolver {
    /// Builds a new external MaxSAT solver.
    ///
    /// The `program` argument is the path to the software to execute, and
    /// `options` the CLI options to provide to it.
    pub fn new(program: String, options: Vec<String>) -> Self {
        Self { program, options }
    }
}

impl MaxSatSolver for ExternalMaxSatSolver {
    fn solve(&mut self, formula: &WeightedFormula) -> Result<Option<Model>> {
        let context = || format!("while executing the MaxSAT solver {}", self.program);
        let mut child = Command::new(&self.program)
            .args(&self.options)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(context)?;
        let mut stdin = child.stdin.take().with_context(context)?;
        let mut instance = Vec::new();
        formula.write(&mut instance)?;
        let writer = std::thread::spawn(move || {
            use std::io::Write;
            stdin.write_all(&instance)
        });
        let mut output = String::new();
        child
            .stdout
            .take()
            .with_context(context)?
            .read_to_string(&mut output)
            .with_context(context)?;
        child.wait().with_context(context)?;
        writer
            .join()
            .map_err(|_| anyhow!("solver input writer panicked"))?
            .with_context(context)?;
        parse_solver_output(&output).with_context(context)
    }
}

fn parse_solver_output(output: &str) -> Result<Option<Model>> {
    let mut status = None;
    for line in output.lines() {
        if let Some(s) = line.strip_prefix("s ") {
            if status.is_some() {
                return Err(anyhow!("multiple status lines"));
            }
            status = Some(s.trim().to_string());
        }
    }
    match status.as_deref() {
        Some("OPTIMUM FOUND") | Some("SATISFIABLE") => {
            let values = output
                .lines()
                .filter(|l| l.starts_with('v'))
                .collect::<Vec<&str>>()
                .join("\n");
            let model = Model::from_read(&mut values.as_bytes())?;
            if model.is_empty() {
                return Err(anyhow!("satisfiable answer without a value line"));
            }
            Ok(Some(model))
        }
        Some("UNSATISFIABLE") => Ok(None),
        Some(s) => Err(anyhow!(r#"unexpected solver status "{}""#, s)),
        None => Err(anyhow!("no status line in solver output")),
    }
}
