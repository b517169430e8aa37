use super::relations::{Consumer, PcLink, Producer};
use crate::lang::{Operator, Substitution, Term, Variable};
use std::collections::{BTreeMap, BTreeSet};

/// The bipartite graph of candidate producers per consumer.
///
/// The structure is the single source of truth for "which producer options
/// exist for which consumer". All its collections are ordered, so iterating a
/// causal structure (and therefore emitting clauses from it) is
/// deterministic.
#[derive(Clone, Debug, Default)]
pub struct CausalStructure {
    links_from: BTreeMap<Producer, BTreeSet<Consumer>>,
    links_to: BTreeMap<Consumer, BTreeSet<Producer>>,
    total_order: bool,
    ground: bool,
}

impl CausalStructure {
    /// Builds a new, empty causal structure.
    ///
    /// The two flags record how the structure was derived: `total_order`
    /// structures only hold links following the original step order, and
    /// `ground` structures compare literals after full substitution.
    pub fn new(total_order: bool, ground: bool) -> Self {
        Self {
            links_from: BTreeMap::new(),
            links_to: BTreeMap::new(),
            total_order,
            ground,
        }
    }

    /// Returns `true` iff only original-order links are recorded.
    pub fn is_total_order(&self) -> bool {
        self.total_order
    }

    /// Returns `true` iff the structure was built over ground literals.
    pub fn is_ground(&self) -> bool {
        self.ground
    }

    /// Adds a producer option for a consumer.
    pub fn add_option(&mut self, producer: Producer, consumer: Consumer) {
        self.links_from.entry(producer).or_default().insert(consumer);
        self.links_to.entry(consumer).or_default().insert(producer);
    }

    /// Removes a producer option, if present.
    pub fn remove_option(&mut self, producer: Producer, consumer: Consumer) {
        if let Some(set) = self.links_from.get_mut(&producer) {
            set.remove(&consumer);
        }
        if let Some(set) = self.links_to.get_mut(&consumer) {
            set.remove(&producer);
        }
    }

    /// Returns `true` iff the link is recorded.
    pub fn contains_link(&self, link: &PcLink) -> bool {
        self.links_to
            .get(&link.consumer)
            .map(|s| s.contains(&link.producer))
            .unwrap_or(false)
    }

    /// Iterates over the producer options of a consumer.
    pub fn producers_of(&self, consumer: &Consumer) -> impl Iterator<Item = &Producer> {
        self.links_to.get(consumer).into_iter().flatten()
    }

    /// Iterates over the consumers a producer may justify.
    pub fn consumers_of(&self, producer: &Producer) -> impl Iterator<Item = &Consumer> {
        self.links_from.get(producer).into_iter().flatten()
    }

    /// Iterates over the consumers with at least one producer option.
    pub fn all_consumers(&self) -> impl Iterator<Item = &Consumer> {
        self.links_to
            .iter()
            .filter(|(_, prods)| !prods.is_empty())
            .map(|(cons, _)| cons)
    }

    /// Iterates over the producers with at least one consumer.
    pub fn all_producers(&self) -> impl Iterator<Item = &Producer> {
        self.links_from
            .iter()
            .filter(|(_, conss)| !conss.is_empty())
            .map(|(prod, _)| prod)
    }

    /// Iterates over all the links, ordered by producer then consumer.
    pub fn iter_links(&self) -> impl Iterator<Item = PcLink> + '_ {
        self.links_from.iter().flat_map(|(prod, conss)| {
            conss.iter().map(move |cons| PcLink::new(*prod, *cons))
        })
    }

    /// Returns the number of links.
    pub fn len(&self) -> usize {
        self.links_from.values().map(BTreeSet::len).sum()
    }

    /// Returns `true` iff the structure holds no link.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes the minimal causal structure of a step sequence.
///
/// A link is recorded for every (producer, consumer) pair whose literals
/// share the same predicate and polarity and whose parameter types are
/// mutually assignable; in ground mode the literals must additionally be
/// equal under the given total substitution. A step never produces for
/// itself. When `total_order` is set, only producers preceding their
/// consumer in the step order are recorded.
pub fn minimal_causal_structure(
    steps: &[Operator<Variable>],
    sub: &Substitution,
    total_order: bool,
    ground: bool,
) -> CausalStructure {
    let mut structure = CausalStructure::new(total_order, ground);
    for (c_idx, cons_op) in steps.iter().enumerate() {
        for (pre_idx, pre) in cons_op.preconditions().iter().enumerate() {
            let consumer = Consumer {
                step: c_idx,
                pre: pre_idx,
            };
            for (p_idx, prod_op) in steps.iter().enumerate() {
                if p_idx == c_idx || (total_order && p_idx > c_idx) {
                    continue;
                }
                for (post_idx, post) in prod_op.postconditions().iter().enumerate() {
                    if post.predicate() != pre.predicate() || post.polarity() != pre.polarity() {
                        continue;
                    }
                    if !assignable(post.parameters(), pre.parameters()) {
                        continue;
                    }
                    if ground
                        && sub.apply_all(post.parameters()) != sub.apply_all(pre.parameters())
                    {
                        continue;
                    }
                    structure.add_option(
                        Producer {
                            step: p_idx,
                            post: post_idx,
                        },
                        consumer,
                    );
                }
            }
        }
    }
    structure
}

/// Checks mutual type assignability, position by position.
pub(crate) fn assignable(prod: &[Variable], cons: &[Variable]) -> bool {
    prod.iter().zip(cons.iter()).all(|(p, c)| {
        c.term_type().has_subtype(p.term_type()) || p.term_type().has_subtype(c.term_type())
    })
}
