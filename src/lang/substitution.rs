use super::symbols::{Constant, Variable};
use std::collections::BTreeMap;

/// A mapping from plan variables to constants.
///
/// A substitution may be partial; the plan-level substitution binding every
/// variable of every step is total by construction. Iteration follows the
/// variable ordering, so rendering a substitution is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Substitution {
    map: BTreeMap<Variable, Constant>,
}

impl Substitution {
    /// Builds a new, empty substitution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a variable to a constant, replacing any previous binding.
    pub fn bind(&mut self, var: Variable, value: Constant) {
        self.map.insert(var, value);
    }

    /// Returns the constant bound to the variable, if any.
    pub fn value_of(&self, var: &Variable) -> Option<&Constant> {
        self.map.get(var)
    }

    /// Returns `true` iff the variable is bound.
    pub fn binds(&self, var: &Variable) -> bool {
        self.map.contains_key(var)
    }

    /// Applies the substitution to a variable.
    ///
    /// # Panics
    ///
    /// Panics if the variable is unbound; use [`Self::value_of`] for partial
    /// substitutions.
    pub fn apply(&self, var: &Variable) -> &Constant {
        self.value_of(var)
            .unwrap_or_else(|| panic!("unbound variable {}", var))
    }

    /// Applies the substitution to a sequence of variables.
    ///
    /// # Panics
    ///
    /// Panics if one of the variables is unbound.
    pub fn apply_all(&self, vars: &[Variable]) -> Vec<Constant> {
        vars.iter().map(|v| self.apply(v).clone()).collect()
    }

    /// Returns the restriction of this substitution to the given variables.
    pub fn trim(&self, vars: &[Variable]) -> Substitution {
        let mut trimmed = Substitution::new();
        for v in vars {
            if let Some(c) = self.value_of(v) {
                trimmed.bind(v.clone(), c.clone());
            }
        }
        trimmed
    }

    /// Iterates over the bindings in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Constant)> {
        self.map.iter()
    }

    /// Iterates over the bound variables in variable order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.map.keys()
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` iff no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
