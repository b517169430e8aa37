use crate::encoder::{PlanEncoding, Relation};
use crate::lang::Plan;
use std::collections::HashMap;

/// The decoder-facing symbol tables: proposition id to operator-name pair
/// for precedence relations, and proposition id to variable-name pair for
/// equality relations.
///
/// Side tables are persisted alongside the formula so decoding a model does
/// not require re-running the encoder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SideTables {
    precedence: HashMap<usize, (String, String)>,
    equality: HashMap<usize, (String, String)>,
}

impl SideTables {
    /// Builds the side tables of an encoding.
    pub fn new(encoding: &PlanEncoding, plan: &Plan) -> Self {
        let mut tables = SideTables::default();
        for (first, second, prop) in encoding.propositions.iter_precedence_pairs() {
            tables.add_precedence(
                prop,
                plan.step(first).name().to_string(),
                plan.step(second).name().to_string(),
            );
        }
        for prop in 1..=encoding.propositions.n_props() {
            if let Some(Relation::Equality(v1, v2)) = encoding.propositions.relation_of(prop) {
                tables.add_equality(prop, v1.to_string(), v2.to_string());
            }
        }
        tables
    }

    /// Records a precedence entry.
    pub fn add_precedence(&mut self, prop: usize, first: String, second: String) {
        self.precedence.insert(prop, (first, second));
    }

    /// Records an equality entry.
    pub fn add_equality(&mut self, prop: usize, first: String, second: String) {
        self.equality.insert(prop, (first, second));
    }

    /// Returns the operator-name pair of a precedence proposition, if any.
    pub fn precedence_of(&self, prop: usize) -> Option<&(String, String)> {
        self.precedence.get(&prop)
    }

    /// Returns the variable-name pair of an equality proposition, if any.
    pub fn equality_of(&self, prop: usize) -> Option<&(String, String)> {
        self.equality.get(&prop)
    }

    /// Iterates over the precedence entries in proposition order.
    pub fn iter_precedence(&self) -> impl Iterator<Item = (usize, &(String, String))> {
        let mut entries: Vec<(usize, &(String, String))> =
            self.precedence.iter().map(|(p, e)| (*p, e)).collect();
        entries.sort_by_key(|(p, _)| *p);
        entries.into_iter()
    }

    /// Iterates over the equality entries in proposition order.
    pub fn iter_equality(&self) -> impl Iterator<Item = (usize, &(String, String))> {
        let mut entries: Vec<(usize, &(String, String))> =
            self.equality.iter().map(|(p, e)| (*p, e)).collect();
        entries.sort_by_key(|(p, _)| *p);
        entries.into_iter()
    }

    /// Returns the total number of entries.
    pub fn len(&self) -> usize {
        self.precedence.len() + self.equality.len()
    }

    /// Returns `true` iff both tables are empty.
    pub fn is_empty(&self) -> bool {
        self.precedence.is_empty() && self.equality.is_empty()
    }
}
