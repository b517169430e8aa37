use super::substitution::Substitution;
use super::symbols::{Constant, Term, Type, Variable};
use std::fmt::Display;

/// A predicate symbol: a name and the ordered list of its parameter types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Predicate {
    name: String,
    parameter_types: Vec<Type>,
}

impl Predicate {
    /// Builds a new predicate given its name and parameter types.
    pub fn new(name: &str, parameter_types: Vec<Type>) -> Self {
        Self {
            name: name.to_string(),
            parameter_types,
        }
    }

    /// Returns the name of the predicate.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of parameters.
    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    /// Returns the declared parameter types.
    pub fn parameter_types(&self) -> &[Type] {
        &self.parameter_types
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A predicate applied to an ordered list of terms.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Atom<T>
where
    T: Term,
{
    predicate: Predicate,
    parameters: Vec<T>,
}

impl<T> Atom<T>
where
    T: Term,
{
    /// Builds a new atom.
    ///
    /// # Panics
    ///
    /// Panics if the number of parameters does not match the predicate arity.
    pub fn new(predicate: Predicate, parameters: Vec<T>) -> Self {
        if predicate.arity() != parameters.len() {
            panic!(
                "predicate {} expects {} parameter(s), got {}",
                predicate.name(),
                predicate.arity(),
                parameters.len()
            );
        }
        Self {
            predicate,
            parameters,
        }
    }

    /// Returns the predicate symbol.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Returns the ordered parameter list.
    pub fn parameters(&self) -> &[T] {
        &self.parameters
    }
}

impl<T> Display for Atom<T>
where
    T: Term,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.predicate)?;
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")
    }
}

/// An atom with a polarity (`true` for a positive literal).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Literal<T>
where
    T: Term,
{
    atom: Atom<T>,
    polarity: bool,
}

impl<T> Literal<T>
where
    T: Term,
{
    /// Builds a new literal from an atom and a polarity.
    pub fn new(atom: Atom<T>, polarity: bool) -> Self {
        Self { atom, polarity }
    }

    /// Returns the underlying atom.
    pub fn atom(&self) -> &Atom<T> {
        &self.atom
    }

    /// Returns the predicate symbol of the underlying atom.
    pub fn predicate(&self) -> &Predicate {
        self.atom.predicate()
    }

    /// Returns the ordered parameter list of the underlying atom.
    pub fn parameters(&self) -> &[T] {
        self.atom.parameters()
    }

    /// Returns the polarity of the literal.
    pub fn polarity(&self) -> bool {
        self.polarity
    }

    /// Returns the literal with the opposite polarity.
    pub fn negated(&self) -> Self {
        Self {
            atom: self.atom.clone(),
            polarity: !self.polarity,
        }
    }
}

impl Literal<Variable> {
    /// Applies a total substitution to every parameter, yielding the ground
    /// literal.
    ///
    /// # Panics
    ///
    /// Panics if one of the parameters is unbound.
    pub fn apply_sub(&self, sub: &Substitution) -> Literal<Constant> {
        Literal::new(
            Atom::new(
                self.predicate().clone(),
                sub.apply_all(self.parameters()),
            ),
            self.polarity,
        )
    }
}

impl<T> Display for Literal<T>
where
    T: Term,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.polarity {
            write!(f, "-")?;
        }
        write!(f, "{}", self.atom)
    }
}
