use super::side_tables::SideTables;
use crate::lang::{Constant, Plan, Term, Variable};
use crate::sat::Model;
use crate::utils::DirectedGraph;
use std::collections::BTreeMap;

/// A decoded partial-order plan: the transitively reduced ordering over step
/// indices, the variable bindings, and the flexibility score.
pub struct DecodedPlan {
    /// The minimal ordering, transitively reduced.
    pub order: DirectedGraph<usize>,
    /// The number of edges of the transitively closed order relation.
    pub closed_size: usize,
    /// The flexibility score of the decoded order.
    pub flex: f64,
    /// The full variable-to-constant binding.
    pub bindings: BTreeMap<Variable, Constant>,
}

/// Reconstructs a partial-order plan from a solver model.
pub struct Decoder<'a> {
    plan: &'a Plan,
    tables: &'a SideTables,
}

impl<'a> Decoder<'a> {
    /// Builds a decoder for a plan and the side tables of its encoding.
    pub fn new(plan: &'a Plan, tables: &'a SideTables) -> Self {
        Self { plan, tables }
    }

    /// Decodes a model.
    ///
    /// Every satisfied precedence proposition not anchored on `init`/`goal`
    /// inserts an edge into the precedence graph, closing it transitively on
    /// each insertion; every satisfied equality proposition touching an
    /// `init`-bound variable propagates the binding to its twin. Proposition
    /// ids with no side-table entry are auxiliary variables and are skipped.
    pub fn decode(&self, model: &Model) -> DecodedPlan {
        let plan = self.plan;
        let init_name = plan.step(plan.init_index()).name();
        let goal_name = plan.step(plan.goal_index()).name();
        let variables: BTreeMap<&str, &Variable> =
            plan.iter_variables().map(|v| (v.name(), v)).collect();
        let init_vars = plan.step(plan.init_index()).parameters();

        let mut closed: DirectedGraph<usize> = DirectedGraph::new();
        let mut bindings: BTreeMap<Variable, Constant> = plan
            .substitution()
            .iter()
            .map(|(v, c)| (v.clone(), c.clone()))
            .collect();

        for prop in model.iter_true() {
            if let Some((first, second)) = self.tables.precedence_of(prop) {
                if first == init_name || second == goal_name {
                    continue;
                }
                let (Some(first), Some(second)) =
                    (plan.step_index_of(first), plan.step_index_of(second))
                else {
                    continue;
                };
                closed.add_and_close_transitive(first, second);
            } else if let Some((first, second)) = self.tables.equality_of(prop) {
                let (Some(first), Some(second)) =
                    (variables.get(first.as_str()), variables.get(second.as_str()))
                else {
                    continue;
                };
                if init_vars.contains(*first) {
                    let value = plan.substitution().apply(first).clone();
                    bindings.insert((*second).clone(), value);
                } else if init_vars.contains(*second) {
                    let value = plan.substitution().apply(second).clone();
                    bindings.insert((*first).clone(), value);
                }
            }
        }

        let closed_size = closed.n_edges();
        let flex = flex(closed_size, plan.n_steps() - 2);
        let mut order = closed;
        order.transitive_reduction();
        DecodedPlan {
            order,
            closed_size,
            flex,
            bindings,
        }
    }
}

/// The plan-flexibility score: one minus the fraction of the orderable step
/// pairs actually ordered.
///
/// `n_real_steps` excludes `init` and `goal`; for a single-step plan the
/// denominator is defined as 1, so the score is 1.0 when no ordering is
/// imposed.
pub fn flex(relation_size: usize, n_real_steps: usize) -> f64 {
    let mut den = if n_real_steps == 0 {
        0
    } else {
        n_real_steps * (n_real_steps - 1) / 2
    };
    if den == 0 {
        den = 1;
    }
    1.0 - relation_size as f64 / den as f64
}
