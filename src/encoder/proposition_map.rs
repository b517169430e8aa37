use super::options::AcyclicityOpt;
use crate::lang::{Constant, Variable};
use crate::pct::{PcLink, Threat};
use std::collections::HashMap;

/// A domain-level relation backing a proposition.
///
/// Precedence and threat-resolution relations are directional; equality is
/// symmetric and stored under its canonical (sorted) variable pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Relation {
    /// The first step precedes the second (atom acyclicity encoding).
    Precedence(usize, usize),
    /// Bit `k` of the ripple comparator between two steps (binary encoding).
    PrecedenceBit(usize, usize, usize),
    /// Bit `k` of a step's binary index (binary encoding).
    OperatorIndexBit(usize, usize),
    /// The two variables are bound to the same constant.
    Equality(Variable, Variable),
    /// The variable is bound to the constant.
    Assignment(Variable, Constant),
    /// The link's producer is the selected justification of its consumer.
    LinkSelection(PcLink),
    /// The threat to the link is resolved.
    ThreatResolution(PcLink, Threat),
    /// An anonymous auxiliary proposition, identified by its tag.
    Auxiliary(String),
}

/// The bidirectional symbol table mapping relations to proposition ids.
///
/// The table is injective: each relation maps to exactly one strictly
/// positive id, ids are allocated on first request and never reused or
/// renumbered, and every id maps back to the relation it was allocated for.
/// All accessors are idempotent on a repeated key.
pub struct PropositionMap {
    acyclicity: AcyclicityOpt,
    bits: usize,
    by_relation: HashMap<Relation, usize>,
    by_id: Vec<Relation>,
}

impl PropositionMap {
    /// Builds a new map for the given acyclicity encoding and bit width.
    pub fn new(acyclicity: AcyclicityOpt, bits: usize) -> Self {
        Self {
            acyclicity,
            bits,
            by_relation: HashMap::new(),
            by_id: Vec::new(),
        }
    }

    /// Returns the bit width of the binary operator indices.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Returns the number of allocated propositions.
    pub fn n_props(&self) -> usize {
        self.by_id.len()
    }

    /// Returns the relation a proposition id was allocated for, if any.
    pub fn relation_of(&self, prop: usize) -> Option<&Relation> {
        if prop == 0 {
            return None;
        }
        self.by_id.get(prop - 1)
    }

    fn get_or_insert(&mut self, relation: Relation) -> usize {
        if let Some(p) = self.by_relation.get(&relation) {
            return *p;
        }
        self.by_id.push(relation.clone());
        let prop = self.by_id.len();
        self.by_relation.insert(relation, prop);
        prop
    }

    fn get(&self, relation: &Relation) -> Option<usize> {
        self.by_relation.get(relation).copied()
    }

    /// Returns the precedence proposition of an ordered step pair, allocating
    /// it on first request.
    ///
    /// Under the binary encoding, this allocates the comparator bits of the
    /// pair and returns the top one, which stands for the full comparison.
    ///
    /// # Panics
    ///
    /// Panics if both steps are the same.
    pub fn precedence_prop(&mut self, first: usize, second: usize) -> usize {
        if first == second {
            panic!("no precedence between a step and itself");
        }
        match self.acyclicity {
            AcyclicityOpt::Atom => self.get_or_insert(Relation::Precedence(first, second)),
            AcyclicityOpt::Binary => {
                let mut top = 0;
                for k in 1..=self.bits {
                    top = self.get_or_insert(Relation::PrecedenceBit(first, second, k));
                }
                top
            }
        }
    }

    /// Returns the precedence proposition of an ordered step pair, if
    /// defined.
    pub fn get_precedence(&self, first: usize, second: usize) -> Option<usize> {
        match self.acyclicity {
            AcyclicityOpt::Atom => self.get(&Relation::Precedence(first, second)),
            AcyclicityOpt::Binary => {
                self.get(&Relation::PrecedenceBit(first, second, self.bits))
            }
        }
    }

    /// Returns comparator bit `k` of an ordered step pair.
    ///
    /// # Panics
    ///
    /// Panics if the pair's precedence propositions were never allocated.
    pub fn precedence_bit(&self, first: usize, second: usize, k: usize) -> usize {
        self.get(&Relation::PrecedenceBit(first, second, k))
            .unwrap_or_else(|| {
                panic!("undefined precedence bit {} for pair ({}, {})", k, first, second)
            })
    }

    /// Returns bit `k` of a step's binary index, allocating it on first
    /// request.
    pub fn operator_index_bit_prop(&mut self, step: usize, k: usize) -> usize {
        self.get_or_insert(Relation::OperatorIndexBit(step, k))
    }

    /// Returns the equality proposition of a variable pair, allocating it on
    /// first request. The pair is unordered.
    pub fn equality_prop(&mut self, v1: &Variable, v2: &Variable) -> usize {
        let (a, b) = canonical_pair(v1, v2);
        self.get_or_insert(Relation::Equality(a, b))
    }

    /// Returns the equality proposition of a variable pair, if defined.
    pub fn get_equality(&self, v1: &Variable, v2: &Variable) -> Option<usize> {
        let (a, b) = canonical_pair(v1, v2);
        self.get(&Relation::Equality(a, b))
    }

    /// Returns the assignment proposition of a variable/constant pair,
    /// allocating it on first request.
    pub fn assignment_prop(&mut self, var: &Variable, value: &Constant) -> usize {
        self.get_or_insert(Relation::Assignment(var.clone(), value.clone()))
    }

    /// Returns the assignment proposition of a variable/constant pair, if
    /// defined.
    pub fn get_assignment(&self, var: &Variable, value: &Constant) -> Option<usize> {
        self.get(&Relation::Assignment(var.clone(), value.clone()))
    }

    /// Returns the selection proposition of a causal link, allocating it on
    /// first request.
    pub fn link_selection_prop(&mut self, link: PcLink) -> usize {
        self.get_or_insert(Relation::LinkSelection(link))
    }

    /// Returns the selection proposition of a causal link, if defined.
    pub fn get_link_selection(&self, link: PcLink) -> Option<usize> {
        self.get(&Relation::LinkSelection(link))
    }

    /// Returns the resolution proposition of a threat to a link, allocating
    /// it on first request.
    pub fn threat_resolution_prop(&mut self, link: PcLink, threat: Threat) -> usize {
        self.get_or_insert(Relation::ThreatResolution(link, threat))
    }

    /// Returns the resolution proposition of a threat to a link, if defined.
    pub fn get_threat_resolution(&self, link: PcLink, threat: Threat) -> Option<usize> {
        self.get(&Relation::ThreatResolution(link, threat))
    }

    /// Returns the proposition of an anonymous auxiliary tag, allocating it
    /// on first request.
    pub fn auxiliary_prop(&mut self, tag: &str) -> usize {
        self.get_or_insert(Relation::Auxiliary(tag.to_string()))
    }

    /// Iterates over the defined precedence pairs and their propositions, in
    /// allocation order.
    ///
    /// Under the binary encoding, the pair's proposition is its top
    /// comparator bit.
    pub fn iter_precedence_pairs(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        let bits = self.bits;
        let acyclicity = self.acyclicity;
        self.by_id
            .iter()
            .enumerate()
            .filter_map(move |(i, r)| match (acyclicity, r) {
                (AcyclicityOpt::Atom, Relation::Precedence(a, b)) => Some((*a, *b, i + 1)),
                (AcyclicityOpt::Binary, Relation::PrecedenceBit(a, b, k)) if *k == bits => {
                    Some((*a, *b, i + 1))
                }
                _ => None,
            })
    }

    /// Iterates over the defined equality pairs and their propositions, in
    /// allocation order.
    pub fn iter_equality_pairs(&self) -> impl Iterator<Item = (&Variable, &Variable, usize)> {
        self.by_id.iter().enumerate().filter_map(|(i, r)| match r {
            Relation::Equality(a, b) => Some((a, b, i + 1)),
            _ => None,
        })
    }
}

fn canonical_pair(v1: &Variable, v2: &Variable) -> (Variable, Variable) {
    if v1 <= v2 {
        (v1.clone(), v2.clone())
    } else {
        (v2.clone(), v1.clone())
    }
}
