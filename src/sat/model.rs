use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read};

/// A satisfying assignment returned by a solver.
///
/// A model is the list of literals the solver reported: positive for true
/// propositions, negative for false ones. Propositions absent from the model
/// are unassigned.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Model {
    literals: Vec<isize>,
    true_props: HashSet<usize>,
}

impl Model {
    /// Builds a model from a list of solver literals.
    ///
    /// # Panics
    ///
    /// Panics if one of the literals is zero.
    pub fn new(literals: Vec<isize>) -> Self {
        let true_props = literals
            .iter()
            .map(|l| {
                if *l == 0 {
                    panic!("invalid proposition: 0");
                }
                *l
            })
            .filter(|l| *l > 0)
            .map(|l| l as usize)
            .collect();
        Self {
            literals,
            true_props,
        }
    }

    /// Reads a model from DIMACS-style solver output.
    ///
    /// The input is a sequence of signed integers; `0` terminators are
    /// ignored, as are comment (`c`), status (`s`) and objective (`o`) lines
    /// and the leading `v` of value lines.
    pub fn from_read(reader: &mut dyn Read) -> Result<Self> {
        let context = "while reading a model";
        let mut literals = Vec::new();
        for (i, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.context(context)?;
            let mut words = line.split_ascii_whitespace().peekable();
            match words.peek() {
                None | Some(&"c") | Some(&"s") | Some(&"o") => continue,
                Some(&"v") => {
                    words.next();
                }
                _ => {}
            }
            for w in words {
                let n = w
                    .parse::<isize>()
                    .map_err(|_| anyhow!(r#"{}: "{}" is not a literal (line {})"#, context, w, i + 1))?;
                if n != 0 {
                    literals.push(n);
                }
            }
        }
        Ok(Self::new(literals))
    }

    /// Iterates over the true propositions, in the order the solver reported
    /// them.
    pub fn iter_true(&self) -> impl Iterator<Item = usize> + '_ {
        self.literals.iter().filter(|l| **l > 0).map(|l| *l as usize)
    }

    /// Returns `true` iff the proposition is assigned true.
    pub fn value_of(&self, prop: usize) -> bool {
        self.true_props.contains(&prop)
    }

    /// Returns the number of literals in the model.
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// Returns `true` iff the model assigns no proposition.
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}
