use super::operator::Operator;
use super::problem::Problem;
use super::substitution::Substitution;
use super::symbols::{Constant, Term, Variable};
use crate::pct::CausalStructure;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};

/// A causal-link structured plan.
///
/// A plan is an ordered list of steps bounded by the synthetic `init` and
/// `goal` operators, a total substitution binding every step variable to a
/// constant, and the [`CausalStructure`] recording the candidate producers of
/// every step precondition. Steps are referred to by their index in the list;
/// `init` is always index 0 and `goal` the last index.
pub struct Plan {
    problem: Problem,
    steps: Vec<Operator<Variable>>,
    substitution: Substitution,
    constraints: CausalStructure,
    init_sub: Substitution,
    goal_sub: Substitution,
}

impl Plan {
    /// Builds a new plan, checking its structural contract.
    ///
    /// The step list must start with `init` and end with `goal`, variable
    /// names must be unique across all steps, and the substitution must bind
    /// every step variable. Violating any of these is an input error, not a
    /// recoverable condition.
    pub fn new(
        problem: Problem,
        steps: Vec<Operator<Variable>>,
        substitution: Substitution,
        constraints: CausalStructure,
    ) -> Result<Self> {
        if steps.len() < 2 || !steps[0].is_init() || !steps[steps.len() - 1].is_goal() {
            return Err(anyhow!(
                "a plan requires an init first step and a goal last step"
            ));
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for step in &steps {
            for v in step.parameters() {
                if !seen.insert(v.name()) {
                    return Err(anyhow!(
                        r#"variable "{}" is shared by several steps"#,
                        v.name()
                    ));
                }
                if !substitution.binds(v) {
                    return Err(anyhow!(
                        r#"variable "{}" of step {} is unbound"#,
                        v.name(),
                        step.name()
                    ));
                }
            }
        }
        let init_sub = substitution.trim(steps[0].parameters());
        let goal_sub = substitution.trim(steps[steps.len() - 1].parameters());
        Ok(Self {
            problem,
            steps,
            substitution,
            constraints,
            init_sub,
            goal_sub,
        })
    }

    /// Returns the planning instance this plan solves.
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Returns the ordered step list, `init` and `goal` included.
    pub fn steps(&self) -> &[Operator<Variable>] {
        &self.steps
    }

    /// Returns the number of steps, `init` and `goal` included.
    pub fn n_steps(&self) -> usize {
        self.steps.len()
    }

    /// Returns a step given its index.
    pub fn step(&self, index: usize) -> &Operator<Variable> {
        &self.steps[index]
    }

    /// Returns the index of the `init` step.
    pub fn init_index(&self) -> usize {
        0
    }

    /// Returns the index of the `goal` step.
    pub fn goal_index(&self) -> usize {
        self.steps.len() - 1
    }

    /// Returns `true` iff the index denotes neither `init` nor `goal`.
    pub fn is_real_step(&self, index: usize) -> bool {
        index != self.init_index() && index != self.goal_index()
    }

    /// Iterates over the indices of the real (non-`init`, non-`goal`) steps.
    pub fn iter_real_steps(&self) -> impl Iterator<Item = usize> {
        1..self.steps.len() - 1
    }

    /// Returns the original total substitution.
    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    /// Returns the substitution restricted to the `init` variables.
    pub fn init_substitution(&self) -> &Substitution {
        &self.init_sub
    }

    /// Returns the substitution restricted to the `goal` variables.
    pub fn goal_substitution(&self) -> &Substitution {
        &self.goal_sub
    }

    /// Returns the causal structure of the plan.
    pub fn constraints(&self) -> &CausalStructure {
        &self.constraints
    }

    /// Returns the index of the step with the given name, if any.
    pub fn step_index_of(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name() == name)
    }

    /// Iterates over every variable of every step, in step order.
    pub fn iter_variables(&self) -> impl Iterator<Item = &Variable> {
        self.steps.iter().flat_map(|s| s.parameters().iter())
    }

    /// Maps each constant appearing in the initial state to the `init`
    /// variable it is bound to.
    pub fn constant_variables(&self) -> HashMap<Constant, Variable> {
        self.init_sub
            .iter()
            .map(|(v, c)| (c.clone(), v.clone()))
            .collect()
    }
}
