use anyhow::{Context, Result};
use std::io::Write;

/// The default weight given to hard clauses.
///
/// Soft weights must sum to strictly less than this sentinel.
pub const DEFAULT_HARD_WEIGHT: u64 = i32::MAX as u64;

/// The kind of DIMACS instance a formula renders to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormulaMode {
    /// A plain CNF instance; every clause is hard.
    Cnf,
    /// A weighted CNF instance mixing hard and weighted soft clauses.
    Wcnf,
}

/// A clause with an optional weight (`None` for hard clauses).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clause {
    weight: Option<u64>,
    literals: Vec<isize>,
}

impl Clause {
    /// Returns the weight, or `None` for a hard clause.
    pub fn weight(&self) -> Option<u64> {
        self.weight
    }

    /// Returns the literals of the clause.
    pub fn literals(&self) -> &[isize] {
        &self.literals
    }
}

/// A growing set of hard and weighted soft clauses.
///
/// The formula maintains its validity invariants as it grows: literals are
/// non-zero, weights are strictly positive, the soft-weight sum stays below
/// the hard-clause sentinel, and the tracked maximum proposition id never
/// decreases. An empty hard clause is permitted: it is the falsum a consumer
/// without producers encodes to.
pub struct WeightedFormula {
    mode: FormulaMode,
    clauses: Vec<Clause>,
    n_props: usize,
    hard_weight: u64,
    soft_weight_sum: u64,
}

impl WeightedFormula {
    /// Builds a new, empty formula with the default hard-clause weight.
    pub fn new(mode: FormulaMode) -> Self {
        Self::new_with_hard_weight(mode, DEFAULT_HARD_WEIGHT)
    }

    /// Builds a new, empty formula with the given hard-clause weight.
    pub fn new_with_hard_weight(mode: FormulaMode, hard_weight: u64) -> Self {
        Self {
            mode,
            clauses: Vec::new(),
            n_props: 0,
            hard_weight,
            soft_weight_sum: 0,
        }
    }

    /// Returns the formula mode.
    pub fn mode(&self) -> FormulaMode {
        self.mode
    }

    /// Returns the hard-clause weight.
    pub fn hard_weight(&self) -> u64 {
        self.hard_weight
    }

    /// Adds a hard clause.
    ///
    /// # Panics
    ///
    /// Panics if a literal is zero.
    pub fn add_clause(&mut self, literals: Vec<isize>) {
        self.register_literals(&literals);
        self.clauses.push(Clause {
            weight: None,
            literals,
        });
    }

    /// Adds a weighted soft clause.
    ///
    /// # Panics
    ///
    /// Panics if the formula is in CNF mode, if a literal is zero, if the
    /// weight is zero, or if the soft-weight sum reaches the hard-clause
    /// weight.
    pub fn add_soft_clause(&mut self, weight: u64, literals: Vec<isize>) {
        if self.mode == FormulaMode::Cnf {
            panic!("cannot add a soft clause to a CNF formula");
        }
        if weight == 0 {
            panic!("soft clause weights must be strictly positive");
        }
        let sum = self
            .soft_weight_sum
            .checked_add(weight)
            .unwrap_or(u64::MAX);
        if sum >= self.hard_weight {
            panic!(
                "sum of soft weights ({}) reached the hard clause weight ({})",
                sum, self.hard_weight
            );
        }
        self.register_literals(&literals);
        self.soft_weight_sum = sum;
        self.clauses.push(Clause {
            weight: Some(weight),
            literals,
        });
    }

    fn register_literals(&mut self, literals: &[isize]) {
        for l in literals {
            if *l == 0 {
                panic!("invalid proposition: 0");
            }
            self.n_props = usize::max(self.n_props, l.unsigned_abs());
        }
    }

    /// Returns the highest proposition id seen so far.
    pub fn n_props(&self) -> usize {
        self.n_props
    }

    /// Returns the number of clauses.
    pub fn n_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Returns the sum of the soft clause weights.
    pub fn soft_weight_sum(&self) -> u64 {
        self.soft_weight_sum
    }

    /// Iterates over the clauses in insertion order.
    pub fn iter_clauses(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter()
    }

    /// Writes the formula in DIMACS CNF or WCNF format, depending on the
    /// formula mode.
    pub fn write(&self, writer: &mut dyn Write) -> Result<()> {
        let context = "while writing a formula";
        match self.mode {
            FormulaMode::Cnf => {
                writeln!(writer, "p cnf {} {}", self.n_props, self.clauses.len())
                    .context(context)?;
            }
            FormulaMode::Wcnf => {
                writeln!(
                    writer,
                    "p wcnf {} {} {}",
                    self.n_props,
                    self.clauses.len(),
                    self.hard_weight
                )
                .context(context)?;
            }
        }
        for clause in &self.clauses {
            let mut line = String::new();
            if self.mode == FormulaMode::Wcnf {
                line.push_str(&format!("{} ", clause.weight.unwrap_or(self.hard_weight)));
            }
            for l in &clause.literals {
                line.push_str(&format!("{} ", l));
            }
            line.push('0');
            writeln!(writer, "{}", line).context(context)?;
        }
        writer.flush().context(context)
    }
}

#[cfg(test)]
impl WeightedFormula {
    /// Checks the satisfiability of the hard clauses by backtracking search.
    ///
    /// Test support only: complete but naive, for small formulas.
    pub(crate) fn hard_satisfiable(&self) -> bool {
        fn propagate(clauses: &[Vec<isize>], assignment: &mut Vec<Option<bool>>) -> bool {
            loop {
                let mut changed = false;
                for clause in clauses {
                    let mut unassigned = None;
                    let mut n_unassigned = 0;
                    let mut satisfied = false;
                    for l in clause {
                        match assignment[l.unsigned_abs()] {
                            Some(v) if v == (*l > 0) => {
                                satisfied = true;
                                break;
                            }
                            Some(_) => {}
                            None => {
                                n_unassigned += 1;
                                unassigned = Some(*l);
                            }
                        }
                    }
                    if satisfied {
                        continue;
                    }
                    match n_unassigned {
                        0 => return false,
                        1 => {
                            let l = unassigned.unwrap();
                            assignment[l.unsigned_abs()] = Some(l > 0);
                            changed = true;
                        }
                        _ => {}
                    }
                }
                if !changed {
                    return true;
                }
            }
        }

        fn search(clauses: &[Vec<isize>], assignment: &[Option<bool>]) -> bool {
            let mut assignment = assignment.to_vec();
            if !propagate(clauses, &mut assignment) {
                return false;
            }
            match assignment.iter().skip(1).position(Option::is_none) {
                None => true,
                Some(i) => [true, false].into_iter().any(|v| {
                    let mut branch = assignment.clone();
                    branch[i + 1] = Some(v);
                    search(clauses, &branch)
                }),
            }
        }

        let clauses: Vec<Vec<isize>> = self
            .clauses
            .iter()
            .filter(|c| c.weight.is_none())
            .map(|c| c.literals.clone())
            .collect();
        if clauses.iter().any(Vec::is_empty) {
            return false;
        }
        search(&clauses, &vec![None; self.n_props + 1])
    }

    /// Evaluates the hard clauses under a total assignment of the
    /// propositions (indexed from 1).
    ///
    /// Test support only.
    pub(crate) fn hard_clauses_hold(&self, assignment: &[bool]) -> bool {
        self.clauses
            .iter()
            .filter(|c| c.weight.is_none())
            .all(|c| {
                c.literals
                    .iter()
                    .any(|l| assignment[l.unsigned_abs() - 1] == (*l > 0))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_cnf() {
        let mut f = WeightedFormula::new(FormulaMode::Cnf);
        f.add_clause(vec![1, 2]);
        f.add_clause(vec![-1, -2]);
        let mut out = Vec::new();
        f.write(&mut out).unwrap();
        assert_eq!(
            "p cnf 2 2\n1 2 0\n-1 -2 0\n",
            String::from_utf8(out).unwrap()
        );
    }

    #[test]
    fn test_write_wcnf() {
        let mut f = WeightedFormula::new_with_hard_weight(FormulaMode::Wcnf, 100);
        f.add_clause(vec![1, 2]);
        f.add_soft_clause(1, vec![-1]);
        let mut out = Vec::new();
        f.write(&mut out).unwrap();
        assert_eq!(
            "p wcnf 2 2 100\n100 1 2 0\n1 -1 0\n",
            String::from_utf8(out).unwrap()
        );
    }

    #[test]
    fn test_empty_hard_clause_is_falsum() {
        let mut f = WeightedFormula::new(FormulaMode::Wcnf);
        f.add_clause(vec![]);
        assert_eq!(1, f.n_clauses());
        assert!(!f.hard_satisfiable());
    }

    #[test]
    #[should_panic(expected = "invalid proposition: 0")]
    fn test_zero_literal() {
        let mut f = WeightedFormula::new(FormulaMode::Cnf);
        f.add_clause(vec![1, 0]);
    }

    #[test]
    #[should_panic(expected = "weights must be strictly positive")]
    fn test_zero_weight() {
        let mut f = WeightedFormula::new(FormulaMode::Wcnf);
        f.add_soft_clause(0, vec![1]);
    }

    #[test]
    #[should_panic(expected = "reached the hard clause weight")]
    fn test_weight_sum_overflow() {
        let mut f = WeightedFormula::new_with_hard_weight(FormulaMode::Wcnf, 3);
        f.add_soft_clause(2, vec![1]);
        f.add_soft_clause(1, vec![2]);
    }

    #[test]
    #[should_panic(expected = "cannot add a soft clause")]
    fn test_soft_clause_in_cnf_mode() {
        let mut f = WeightedFormula::new(FormulaMode::Cnf);
        f.add_soft_clause(1, vec![1]);
    }

    #[test]
    fn test_n_props_monotonic() {
        let mut f = WeightedFormula::new(FormulaMode::Cnf);
        f.add_clause(vec![5]);
        assert_eq!(5, f.n_props());
        f.add_clause(vec![2]);
        assert_eq!(5, f.n_props());
    }

    #[test]
    fn test_hard_satisfiable() {
        let mut f = WeightedFormula::new(FormulaMode::Cnf);
        f.add_clause(vec![1, 2]);
        f.add_clause(vec![-1, 2]);
        f.add_clause(vec![-2, 3]);
        assert!(f.hard_satisfiable());
        f.add_clause(vec![-3]);
        f.add_clause(vec![2]);
        assert!(!f.hard_satisfiable());
    }

    #[test]
    fn test_soft_clauses_do_not_affect_hard_satisfiability() {
        let mut f = WeightedFormula::new(FormulaMode::Wcnf);
        f.add_clause(vec![1]);
        f.add_soft_clause(1, vec![-1]);
        assert!(f.hard_satisfiable());
    }

    #[test]
    fn test_hard_clauses_hold() {
        let mut f = WeightedFormula::new(FormulaMode::Cnf);
        f.add_clause(vec![1, -2]);
        assert!(f.hard_clauses_hold(&[true, true]));
        assert!(f.hard_clauses_hold(&[false, false]));
        assert!(!f.hard_clauses_hold(&[false, true]));
    }
}
