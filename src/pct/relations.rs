use crate::lang::{Literal, Operator, Plan, Variable};

/// A step effect that may justify another step's precondition.
///
/// Producers are index pairs into the plan step list and the step's
/// postcondition list, so structurally equal producers are identical and all
/// relation objects are cheap, ordered map keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Producer {
    /// The index of the producing step.
    pub step: usize,
    /// The index of the produced postcondition in the step.
    pub post: usize,
}

impl Producer {
    /// Returns the producing operator.
    pub fn operator<'a>(&self, plan: &'a Plan) -> &'a Operator<Variable> {
        plan.step(self.step)
    }

    /// Returns the produced literal.
    pub fn literal<'a>(&self, plan: &'a Plan) -> &'a Literal<Variable> {
        &plan.step(self.step).postconditions()[self.post]
    }
}

/// A step precondition in need of a producer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Consumer {
    /// The index of the consuming step.
    pub step: usize,
    /// The index of the consumed precondition in the step.
    pub pre: usize,
}

impl Consumer {
    /// Returns the consuming operator.
    pub fn operator<'a>(&self, plan: &'a Plan) -> &'a Operator<Variable> {
        plan.step(self.step)
    }

    /// Returns the consumed literal.
    pub fn literal<'a>(&self, plan: &'a Plan) -> &'a Literal<Variable> {
        &plan.step(self.step).preconditions()[self.pre]
    }
}

/// A candidate causal commitment: this producer may justify this consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PcLink {
    /// The producing side of the link.
    pub producer: Producer,
    /// The consuming side of the link.
    pub consumer: Consumer,
}

impl PcLink {
    /// Builds a new candidate link.
    pub fn new(producer: Producer, consumer: Consumer) -> Self {
        Self { producer, consumer }
    }
}

/// A step effect that would undo a causal link scheduled between its producer
/// and its consumer.
///
/// The threat is filed by the postcondition whose effect negates the
/// threatened literal; [`Threat::literal`] is that postcondition negated,
/// i.e. the shape of the literals it threatens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Threat {
    /// The index of the threatening step.
    pub step: usize,
    /// The index of the threatening postcondition in the step.
    pub post: usize,
}

impl Threat {
    /// Returns the threatening operator.
    pub fn operator<'a>(&self, plan: &'a Plan) -> &'a Operator<Variable> {
        plan.step(self.step)
    }

    /// Returns the threatened literal shape: the threatening postcondition,
    /// negated.
    pub fn literal(&self, plan: &Plan) -> Literal<Variable> {
        plan.step(self.step).postconditions()[self.post].negated()
    }

    /// Returns the threatening effect itself.
    pub fn effect<'a>(&self, plan: &'a Plan) -> &'a Literal<Variable> {
        &plan.step(self.step).postconditions()[self.post]
    }
}
