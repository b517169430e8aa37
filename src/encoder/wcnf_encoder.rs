use super::options::{
    AcyclicityOpt, CausalStructureOpt, EncoderOptions, EqualityOpt, OutputOpt, SymmetryOpt,
};
use super::proposition_map::PropositionMap;
use crate::auto::AutomorphismOracle;
use crate::lang::{Constant, Plan, Term, Variable};
use crate::pct::{CausalStructure, Consumer, PcLink, Producer, ThreatMap};
use crate::sat::{FormulaMode, WeightedFormula};
use crate::utils::DirectedGraph;
use anyhow::{anyhow, Result};
use log::{debug, info};
use std::collections::HashMap;

/// The result of an encoding run: the formula, its symbol table, and the
/// symmetry-breaking statistics.
pub struct PlanEncoding {
    /// The emitted formula.
    pub formula: WeightedFormula,
    /// The proposition symbol table the formula is expressed over.
    pub propositions: PropositionMap,
    /// The number of propositions added by the symmetry stage.
    pub n_symmetry_props: usize,
    /// The number of clauses added by the symmetry stage.
    pub n_symmetry_clauses: usize,
}

/// The constraint builder.
///
/// An encoder is configured once and may encode any number of plans. The
/// encoding stages run in a fixed order: causal-link filtering, threat
/// analysis, producer/consumer selection, init/goal anchoring, variable
/// domains, optional total ordering, acyclicity closure, symmetry breaking,
/// equality closure, and finally the soft ordering clauses when a weighted
/// formula is requested.
pub struct WcnfEncoder {
    options: EncoderOptions,
}

impl WcnfEncoder {
    /// Builds a new encoder with the given options.
    pub fn new(options: EncoderOptions) -> Self {
        Self { options }
    }

    /// Encodes a plan.
    ///
    /// This entry point serves the strategies that do not consult the
    /// automorphism oracle; use [`Self::encode_with_oracle`] for the
    /// automorphism-derived symmetry strategies.
    pub fn encode(&self, plan: &Plan) -> Result<PlanEncoding> {
        match self.options.symmetry {
            SymmetryOpt::None | SymmetryOpt::OpTypes => self.run(plan, None),
            _ => Err(anyhow!(
                "the {:?} symmetry strategy requires an automorphism oracle",
                self.options.symmetry
            )),
        }
    }

    /// Encodes a plan, using the given oracle for the automorphism-derived
    /// symmetry strategies.
    pub fn encode_with_oracle(
        &self,
        plan: &Plan,
        oracle: &mut dyn AutomorphismOracle,
    ) -> Result<PlanEncoding> {
        self.run(plan, Some(oracle))
    }

    fn run(
        &self,
        plan: &Plan,
        oracle: Option<&mut dyn AutomorphismOracle>,
    ) -> Result<PlanEncoding> {
        if self.options.causal_structure == CausalStructureOpt::Custom
            && self.options.custom_precedence.is_none()
        {
            return Err(anyhow!(
                "the custom causal structure strategy requires a precedence graph"
            ));
        }
        debug!("initialising encoder");
        let bits = binary_index_width(plan.n_steps());
        let mut state = EncoderState {
            options: &self.options,
            plan,
            bits,
            props: PropositionMap::new(self.options.acyclicity, bits),
            formula: WeightedFormula::new(self.options.mode),
            causal: CausalStructure::default(),
            threats: ThreatMap::new(plan),
            constant_vars: plan.constant_variables(),
            n_symmetry_props: 0,
            n_symmetry_clauses: 0,
        };

        debug!("filtering causal links");
        state.causal = state.filter_causal_links();

        debug!("building causal link and threat constraints");
        state.build_producer_consumer_constraints();

        debug!("building init/goal ordering constraints");
        state.build_init_goal_ordering_constraints();

        if !self.options.ground {
            debug!("building variable domain constraints");
            state.build_variable_domain_constraints();
        }

        if self.options.output == OutputOpt::TotalOrder {
            debug!("building total order constraints");
            state.build_total_order_constraints();
        }

        debug!("closing precedence relation");
        state.build_prec_closure_constraints();

        debug!("building symmetry breaking constraints");
        state.build_symmetry_breaking_constraints(oracle)?;

        if !self.options.ground {
            debug!("closing equality relation");
            state.build_equality_closure_constraints();
        }

        if self.options.mode == FormulaMode::Wcnf {
            debug!("building soft ordering constraints");
            state.build_soft_ordering_constraints();
        }

        info!(
            "encoded {} propositions and {} clauses",
            state.formula.n_props(),
            state.formula.n_clauses()
        );
        Ok(PlanEncoding {
            formula: state.formula,
            propositions: state.props,
            n_symmetry_props: state.n_symmetry_props,
            n_symmetry_clauses: state.n_symmetry_clauses,
        })
    }
}

/// Returns the bit width of the binary operator indices for a step count.
pub(crate) fn binary_index_width(n_steps: usize) -> usize {
    (usize::BITS - n_steps.leading_zeros()) as usize
}

/// Turns a layered (parallel) step partition into the precedence graph
/// backing the custom causal-structure strategy: every step of a layer
/// precedes every step of the following layers.
pub fn layered_precedence_graph(layers: &[Vec<usize>]) -> DirectedGraph<usize> {
    let mut graph = DirectedGraph::new();
    for (i, layer) in layers.iter().enumerate() {
        for later in layers.iter().skip(i + 1) {
            for a in layer {
                for b in later {
                    graph.add_edge(*a, *b);
                }
            }
        }
    }
    graph
}

pub(crate) struct EncoderState<'a> {
    pub(crate) options: &'a EncoderOptions,
    pub(crate) plan: &'a Plan,
    pub(crate) bits: usize,
    pub(crate) props: PropositionMap,
    pub(crate) formula: WeightedFormula,
    pub(crate) causal: CausalStructure,
    pub(crate) threats: ThreatMap,
    pub(crate) constant_vars: HashMap<Constant, Variable>,
    pub(crate) n_symmetry_props: usize,
    pub(crate) n_symmetry_clauses: usize,
}

impl<'a> EncoderState<'a> {
    /// Checks whether a link from `prec` to `ante` is removed by the
    /// causal-structure strategy.
    pub(crate) fn is_filtered(&self, prec: usize, ante: usize) -> bool {
        match self.options.causal_structure {
            CausalStructureOpt::Custom => {
                if prec == self.plan.init_index() || ante == self.plan.goal_index() {
                    return false;
                }
                !self
                    .options
                    .custom_precedence
                    .as_ref()
                    .expect("checked at encoding start")
                    .contains_edge(&prec, &ante)
            }
            CausalStructureOpt::Deorder => prec > ante,
            CausalStructureOpt::Reorder => false,
        }
    }

    fn filter_causal_links(&self) -> CausalStructure {
        let unfiltered = self.plan.constraints();
        let mut filtered =
            CausalStructure::new(unfiltered.is_total_order(), unfiltered.is_ground());
        for link in unfiltered.iter_links() {
            if !self.is_filtered(link.producer.step, link.consumer.step) {
                filtered.add_option(link.producer, link.consumer);
            }
        }
        filtered
    }

    pub(crate) fn build_prec_prop(&mut self, first: usize, second: usize) -> isize {
        self.props.precedence_prop(first, second) as isize
    }

    /// Returns the proposition stating that a variable takes a given value,
    /// honoring the equality encoding.
    ///
    /// # Panics
    ///
    /// Panics if the constant is outside the variable's declared type domain,
    /// or, under the atom equality encoding, if the constant does not appear
    /// in the initial state.
    pub(crate) fn variable_assignment_prop(&mut self, var: &Variable, value: &Constant) -> isize {
        if !var.term_type().has_subtype(value.term_type()) {
            panic!(
                "constant {} is outside the domain of variable {}: {} is no subtype of {}",
                value,
                var,
                value.term_type(),
                var.term_type()
            );
        }
        let prop = match self.options.equality {
            EqualityOpt::Idx => self.props.assignment_prop(var, value),
            _ => {
                let init_var = self
                    .constant_vars
                    .get(value)
                    .unwrap_or_else(|| {
                        panic!("constant {} does not appear in the initial state", value)
                    })
                    .clone();
                self.props.equality_prop(var, &init_var)
            }
        };
        prop as isize
    }

    fn build_producer_consumer_constraints(&mut self) {
        let plan = self.plan;
        // at least one selected producer per consumer; a consumer with no
        // surviving producer yields the empty (falsified) clause
        let consumers: Vec<Consumer> = plan
            .steps()
            .iter()
            .enumerate()
            .flat_map(|(step, op)| {
                (0..op.preconditions().len()).map(move |pre| Consumer { step, pre })
            })
            .collect();
        for cons in consumers {
            let prods: Vec<Producer> = self.causal.producers_of(&cons).copied().collect();
            let clause = prods
                .iter()
                .map(|p| self.props.link_selection_prop(PcLink::new(*p, cons)) as isize)
                .collect();
            self.formula.add_clause(clause);
        }

        let ground = self.options.ground;
        let links: Vec<PcLink> = self.causal.iter_links().collect();
        for link in links {
            let sel = self.props.link_selection_prop(link) as isize;
            let prod_params = link.producer.literal(plan).parameters().to_vec();
            let cons_params = link.consumer.literal(plan).parameters().to_vec();
            let mut rtl: Vec<isize> = Vec::new();

            // selection implies the argument equalities
            if !ground {
                for (pv, cv) in prod_params.iter().zip(cons_params.iter()) {
                    let eq = self.props.equality_prop(pv, cv) as isize;
                    self.formula.add_clause(vec![-sel, eq]);
                    rtl.push(-eq);
                }
            }

            // selection implies producer < consumer
            let prec = self.build_prec_prop(link.producer.step, link.consumer.step);
            self.formula.add_clause(vec![-sel, prec]);
            rtl.push(-prec);

            // selection implies every threat resolution
            let threats = if ground {
                self.threats.ground_threats(&link, plan, plan.substitution())
            } else {
                self.threats.non_ground_threats(&link, plan)
            };
            for threat in threats {
                let tprop = self.props.threat_resolution_prop(link, threat) as isize;
                self.formula.add_clause(vec![-sel, tprop]);
                rtl.push(-tprop);

                let threat_params = threat.literal(plan).parameters().to_vec();
                let mut clause: Vec<isize> = vec![-tprop];

                // resolved if a threat binding differs from the producer's
                if !ground {
                    for k in 0..cons_params.len() {
                        if prod_params[k] == threat_params[k] {
                            continue;
                        }
                        let eq =
                            self.props.equality_prop(&prod_params[k], &threat_params[k]) as isize;
                        clause.push(-eq);
                        self.formula.add_clause(vec![eq, tprop]);
                    }
                }

                // resolved if the threat precedes the producer
                if threat.step != link.producer.step
                    && !self.is_filtered(threat.step, link.producer.step)
                {
                    let tp = self.build_prec_prop(threat.step, link.producer.step);
                    clause.push(tp);
                    self.formula.add_clause(vec![-tp, tprop]);
                }

                // resolved if the consumer precedes the threat
                if !self.is_filtered(link.consumer.step, threat.step) {
                    let ct = self.build_prec_prop(link.consumer.step, threat.step);
                    clause.push(ct);
                    self.formula.add_clause(vec![-ct, tprop]);
                }

                // a later postcondition of the threatening step may re-assert
                // the fact; the ground path intentionally skips the
                // per-argument disjunction
                let undoing = threat
                    .operator(plan)
                    .undoing(threat.effect(plan))
                    .cloned();
                match undoing {
                    Some(undoing) if !ground => {
                        let mut conj: Vec<isize> = Vec::new();
                        for k in 0..threat_params.len() {
                            if undoing.parameters()[k] == threat_params[k] {
                                continue;
                            }
                            let eq = self
                                .props
                                .equality_prop(&undoing.parameters()[k], &threat_params[k])
                                as isize;
                            conj.push(-eq);
                            let mut disj = clause.clone();
                            disj.push(eq);
                            self.formula.add_clause(disj);
                        }
                        conj.push(tprop);
                        self.formula.add_clause(conj);
                    }
                    _ => self.formula.add_clause(clause),
                }
            }

            // the biconditional's other direction
            rtl.push(sel);
            self.formula.add_clause(rtl);
        }
    }

    fn build_init_goal_ordering_constraints(&mut self) {
        let init = self.plan.init_index();
        let goal = self.plan.goal_index();
        if self.options.acyclicity == AcyclicityOpt::Binary {
            // every step gets its index bits
            for step in 0..self.plan.n_steps() {
                for k in 1..=self.bits {
                    self.props.operator_index_bit_prop(step, k);
                }
            }
        }
        let real: Vec<usize> = self.plan.iter_real_steps().collect();
        for i in &real {
            self.build_prec_prop(init, *i);
            self.build_prec_prop(*i, goal);
        }
        if self.options.acyclicity == AcyclicityOpt::Binary {
            // init sits at index 0
            for k in 1..=self.bits {
                let bit = self.props.operator_index_bit_prop(init, k) as isize;
                self.formula.add_clause(vec![-bit]);
            }
            // goal sits at index #steps - 1
            let mut n = self.plan.n_steps() - 1;
            for k in 1..=self.bits {
                let bit = self.props.operator_index_bit_prop(goal, k) as isize;
                if n % 2 == 0 {
                    self.formula.add_clause(vec![-bit]);
                } else {
                    self.formula.add_clause(vec![bit]);
                }
                n /= 2;
            }
        }
        for i in &real {
            let after_init = self.props.get_precedence(init, *i).unwrap() as isize;
            let before_goal = self.props.get_precedence(*i, goal).unwrap() as isize;
            self.formula.add_clause(vec![after_init]);
            self.formula.add_clause(vec![before_goal]);
        }
    }

    fn free_variables(&self) -> Vec<Variable> {
        let init_params = self.plan.step(self.plan.init_index()).parameters();
        let goal_params = self.plan.step(self.plan.goal_index()).parameters();
        self.plan
            .substitution()
            .variables()
            .filter(|v| !init_params.contains(v) && !goal_params.contains(v))
            .cloned()
            .collect()
    }

    fn build_variable_domain_constraints(&mut self) {
        if self.options.equality == EqualityOpt::None {
            return;
        }
        let plan = self.plan;
        let free = self.free_variables();

        // materialize the domain propositions of the free variables
        for v in &free {
            for c in plan.problem().constants_of_type(v.term_type()) {
                match self.options.equality {
                    EqualityOpt::Idx => {
                        self.props.assignment_prop(v, &c);
                    }
                    _ => {
                        self.variable_assignment_prop(v, &c);
                    }
                }
            }
        }

        // exactly one value per free variable
        for v in &free {
            let domain = plan.problem().constants_of_type(v.term_type());
            let alo = domain
                .iter()
                .map(|c| self.variable_assignment_prop(v, c))
                .collect();
            self.formula.add_clause(alo);
            for (i, c1) in domain.iter().enumerate() {
                for c2 in domain.iter().skip(i + 1) {
                    let p1 = self.variable_assignment_prop(v, c1);
                    let p2 = self.variable_assignment_prop(v, c2);
                    self.formula.add_clause(vec![-p1, -p2]);
                }
            }
        }

        match self.options.equality {
            EqualityOpt::Idx => {
                // init and goal variables keep their original value
                for step in [plan.init_index(), plan.goal_index()] {
                    let params = plan.step(step).parameters().to_vec();
                    for v in params {
                        let c = plan.substitution().apply(&v).clone();
                        let p = self.props.assignment_prop(&v, &c) as isize;
                        self.formula.add_clause(vec![p]);
                    }
                }
            }
            EqualityOpt::Atom => {
                // init variables are pairwise distinct
                let mut init_vars = plan.step(plan.init_index()).parameters().to_vec();
                init_vars.sort();
                for (i, v1) in init_vars.iter().enumerate() {
                    for v2 in init_vars.iter().skip(i + 1) {
                        let p = self.props.equality_prop(v1, v2) as isize;
                        self.formula.add_clause(vec![-p]);
                    }
                }
                // goal variables are bound to the init variable carrying
                // their original value
                let goal_vars = plan.step(plan.goal_index()).parameters().to_vec();
                for v in goal_vars {
                    let c = plan.substitution().apply(&v).clone();
                    let p = self.variable_assignment_prop(&v, &c);
                    self.formula.add_clause(vec![p]);
                }
            }
            EqualityOpt::None => unreachable!(),
        }
    }

    fn build_total_order_constraints(&mut self) {
        for i in 0..self.plan.n_steps() {
            for j in i + 1..self.plan.n_steps() {
                let pij = self.build_prec_prop(i, j);
                let pji = self.build_prec_prop(j, i);
                self.formula.add_clause(vec![pji, pij]);
            }
        }
    }

    fn build_prec_closure_constraints(&mut self) {
        match self.options.acyclicity {
            AcyclicityOpt::Atom => self.build_atom_acyclicity(),
            AcyclicityOpt::Binary => self.build_binary_acyclicity(),
        }
    }

    fn build_atom_acyclicity(&mut self) {
        let n = self.plan.n_steps();
        let filter = self.options.filter_transitive_closure;

        // materialize the closure propositions
        for op1 in 0..n {
            for op2 in 0..n {
                if op1 == op2 || (filter && self.props.get_precedence(op2, op1).is_none()) {
                    continue;
                }
                for op3 in 0..n {
                    if op3 == op1
                        || op3 == op2
                        || (filter && self.props.get_precedence(op1, op3).is_none())
                    {
                        continue;
                    }
                    self.build_prec_prop(op2, op3);
                }
            }
        }

        // close
        for op1 in 0..n {
            for op2 in 0..n {
                if op1 == op2 {
                    continue;
                }
                let p21 = match self.props.get_precedence(op2, op1) {
                    Some(p) => p as isize,
                    None => continue,
                };
                if let Some(p12) = self.props.get_precedence(op1, op2) {
                    self.formula.add_clause(vec![-(p12 as isize), -p21]);
                }
                for op3 in 0..n {
                    if op3 == op1 || op3 == op2 {
                        continue;
                    }
                    if let (Some(p13), Some(p23)) = (
                        self.props.get_precedence(op1, op3),
                        self.props.get_precedence(op2, op3),
                    ) {
                        self.formula
                            .add_clause(vec![-p21, -(p13 as isize), p23 as isize]);
                    }
                }
            }
        }
    }

    fn build_binary_acyclicity(&mut self) {
        let n = self.plan.n_steps();
        for i in 0..n {
            for j in 0..n {
                if i == j || self.props.get_precedence(i, j).is_none() {
                    continue;
                }
                // the pair's precedence proposition is the comparator top bit
                for k in 1..=self.bits {
                    let pk = self.props.precedence_bit(i, j, k) as isize;
                    let bi = self.props.operator_index_bit_prop(i, k) as isize;
                    let bj = self.props.operator_index_bit_prop(j, k) as isize;
                    if k == 1 {
                        self.formula.add_clause(vec![-pk, bj]);
                        self.formula.add_clause(vec![-pk, -bi]);
                        self.formula.add_clause(vec![-bj, bi, pk]);
                    } else {
                        let pkm1 = self.props.precedence_bit(i, j, k - 1) as isize;
                        self.formula.add_clause(vec![-pk, bj, -bi]);
                        self.formula.add_clause(vec![-pk, bj, pkm1]);
                        self.formula.add_clause(vec![-pk, -bi, pkm1]);
                        self.formula.add_clause(vec![-bj, bi, pk]);
                        self.formula.add_clause(vec![-bj, -pkm1, pk]);
                        self.formula.add_clause(vec![bi, -pkm1, pk]);
                    }
                }
                if j > i {
                    if let (Some(pij), Some(pji)) = (
                        self.props.get_precedence(i, j),
                        self.props.get_precedence(j, i),
                    ) {
                        self.formula
                            .add_clause(vec![-(pij as isize), -(pji as isize)]);
                    }
                }
            }
        }
    }

    fn build_equality_closure_constraints(&mut self) {
        match self.options.equality {
            EqualityOpt::Idx => self.build_domain_equality_closure(),
            EqualityOpt::Atom => self.build_atom_equality_closure(),
            EqualityOpt::None => {}
        }
    }

    /// Returns the value domain of a variable: its original value when bound
    /// in `init` or `goal`, the constants of its type otherwise.
    fn value_domain(&self, var: &Variable) -> Vec<Constant> {
        if self.plan.init_substitution().binds(var) || self.plan.goal_substitution().binds(var) {
            vec![self.plan.substitution().apply(var).clone()]
        } else {
            self.plan.problem().constants_of_type(var.term_type())
        }
    }

    fn build_domain_equality_closure(&mut self) {
        let vars: Vec<Variable> = self.plan.substitution().variables().cloned().collect();
        for (i, v1) in vars.iter().enumerate() {
            let v1_domain = self.value_domain(v1);
            for v2 in vars.iter().skip(i + 1) {
                let eq12 = match self.props.get_equality(v1, v2) {
                    Some(p) => p as isize,
                    None => continue,
                };
                let v2_domain = self.value_domain(v2);
                let intersection: Vec<Constant> = v1_domain
                    .iter()
                    .filter(|c| v2_domain.contains(c))
                    .cloned()
                    .collect();

                // v1 = v2 <-> (v1 = c -> v2 = c)
                for c in &intersection {
                    let a1 = self.variable_assignment_prop(v1, c);
                    let a2 = self.variable_assignment_prop(v2, c);
                    self.formula.add_clause(vec![-eq12, -a1, a2]);
                    self.formula.add_clause(vec![eq12, -a1, -a2]);
                }

                // v1 = v2 -> both take a value in the intersection
                if intersection.len() < v1_domain.len() {
                    let mut clause = vec![-eq12];
                    for c in &intersection {
                        clause.push(self.variable_assignment_prop(v1, c));
                    }
                    self.formula.add_clause(clause);
                }
                if intersection.len() < v2_domain.len() {
                    let mut clause = vec![-eq12];
                    for c in &intersection {
                        clause.push(self.variable_assignment_prop(v2, c));
                    }
                    self.formula.add_clause(clause);
                }
            }
        }
    }

    fn build_atom_equality_closure(&mut self) {
        let filter = self.options.filter_transitive_closure;
        let vars: Vec<Variable> = self.plan.substitution().variables().cloned().collect();
        for (i, v1) in vars.iter().enumerate() {
            for (j, v2) in vars.iter().enumerate().skip(i + 1) {
                let p12 = match self.props.get_equality(v1, v2) {
                    Some(p) => p as isize,
                    None if filter => continue,
                    None => self.props.equality_prop(v1, v2) as isize,
                };
                for v3 in vars.iter().skip(j + 1) {
                    let p13 = match self.props.get_equality(v1, v3) {
                        Some(p) => p as isize,
                        None if filter => continue,
                        None => self.props.equality_prop(v1, v3) as isize,
                    };
                    let p23 = match self.props.get_equality(v2, v3) {
                        Some(p) => p as isize,
                        None if filter => continue,
                        None => self.props.equality_prop(v2, v3) as isize,
                    };
                    self.formula.add_clause(vec![-p23, -p13, p12]);
                    self.formula.add_clause(vec![-p12, -p23, p13]);
                    self.formula.add_clause(vec![-p12, -p13, p23]);
                }
            }
        }
    }

    fn build_soft_ordering_constraints(&mut self) {
        let n = self.plan.n_steps();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                if let Some(p) = self.props.get_precedence(i, j) {
                    self.formula.add_soft_clause(1, vec![-(p as isize)]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Relation;
    use crate::lang::{
        Atom, Literal, Operator, Predicate, Problem, Substitution, Type, GOAL_OP_NAME,
        INIT_OP_NAME,
    };
    use crate::pct::{minimal_causal_structure, Threat};

    /// A 3-step ground chain: init establishes p, A turns p into q, B turns q
    /// into r, and the goal needs r. No threats, no equality.
    fn chain_plan() -> Plan {
        let root = Type::root();
        let lit = |pred: &str, var: &Variable, polarity: bool| {
            Literal::new(
                Atom::new(
                    Predicate::new(pred, vec![root.clone()]),
                    vec![var.clone()],
                ),
                polarity,
            )
        };
        let var = |name: &str| Variable::new(name, root.clone());
        let (i0, a0, a1, b0, b1, g0) = (
            var("i0"),
            var("a0"),
            var("a1"),
            var("b0"),
            var("b1"),
            var("g0"),
        );
        let steps = vec![
            Operator::new(INIT_OP_NAME, vec![i0.clone()], vec![], vec![lit("p", &i0, true)]),
            Operator::new(
                "0_ab",
                vec![a0.clone(), a1.clone()],
                vec![lit("p", &a0, true)],
                vec![lit("q", &a1, true)],
            ),
            Operator::new(
                "1_bc",
                vec![b0.clone(), b1.clone()],
                vec![lit("q", &b0, true)],
                vec![lit("r", &b1, true)],
            ),
            Operator::new(GOAL_OP_NAME, vec![g0.clone()], vec![lit("r", &g0, true)], vec![]),
        ];
        let mut sub = Substitution::new();
        for s in &steps {
            for v in s.parameters() {
                sub.bind(v.clone(), Constant::new("obj", root.clone()));
            }
        }
        let cs = minimal_causal_structure(&steps, &sub, false, true);
        Plan::new(Problem::default(), steps, sub, cs).unwrap()
    }

    fn ground_options() -> EncoderOptions {
        EncoderOptions {
            ground: true,
            equality: EqualityOpt::None,
            ..EncoderOptions::default()
        }
    }

    #[test]
    fn test_binary_index_width() {
        assert_eq!(2, binary_index_width(2));
        assert_eq!(3, binary_index_width(4));
        assert_eq!(3, binary_index_width(6));
        assert_eq!(4, binary_index_width(8));
    }

    #[test]
    fn test_layered_precedence_graph() {
        let g = layered_precedence_graph(&[vec![0], vec![1, 2], vec![3]]);
        assert!(g.contains_edge(&0, &1));
        assert!(g.contains_edge(&0, &2));
        assert!(g.contains_edge(&0, &3));
        assert!(g.contains_edge(&1, &3));
        assert!(g.contains_edge(&2, &3));
        assert!(!g.contains_edge(&1, &2));
        assert_eq!(5, g.n_edges());
    }

    #[test]
    fn test_chain_plan_encoding_shape() {
        let plan = chain_plan();
        let encoding = WcnfEncoder::new(ground_options()).encode(&plan).unwrap();
        // one selection clause per consumer
        let selection_clauses = encoding
            .formula
            .iter_clauses()
            .filter(|c| {
                c.weight().is_none()
                    && c.literals().len() == 1
                    && matches!(
                        encoding.propositions.relation_of(c.literals()[0] as usize),
                        Some(Relation::LinkSelection(_))
                    )
            })
            .count();
        assert_eq!(3, selection_clauses);
        // one anchor clause per real step and side of the plan
        let anchor_clauses = encoding
            .formula
            .iter_clauses()
            .filter(|c| {
                c.weight().is_none()
                    && c.literals().len() == 1
                    && c.literals()[0] > 0
                    && matches!(
                        encoding.propositions.relation_of(c.literals()[0] as usize),
                        Some(Relation::Precedence(a, b)) if *a == 0 || *b == 3
                    )
            })
            .count();
        assert_eq!(4, anchor_clauses);
        // no threat propositions at all
        assert!(!encoding.formula.iter_clauses().any(|c| {
            c.literals().iter().any(|l| {
                matches!(
                    encoding.propositions.relation_of(l.unsigned_abs()),
                    Some(Relation::ThreatResolution(..))
                )
            })
        }));
        assert!(encoding.formula.hard_satisfiable());
    }

    #[test]
    fn test_chain_plan_forces_a_before_b() {
        let plan = chain_plan();
        let encoding = WcnfEncoder::new(ground_options()).encode(&plan).unwrap();
        // the A<B precedence proposition is forced by the only causal chain:
        // denying it makes the hard clauses unsatisfiable
        let mut formula = encoding.formula;
        let p_ab = encoding.propositions.get_precedence(1, 2).unwrap();
        formula.add_clause(vec![-(p_ab as isize)]);
        assert!(!formula.hard_satisfiable());
    }

    #[test]
    fn test_deorder_filters_backward_links() {
        let plan = chain_plan();
        let options = EncoderOptions {
            causal_structure: CausalStructureOpt::Deorder,
            ..ground_options()
        };
        let encoding = WcnfEncoder::new(options).encode(&plan).unwrap();
        // under deordering no backward precedence proposition is defined
        assert!(encoding.propositions.get_precedence(2, 1).is_none());
        assert!(encoding.formula.hard_satisfiable());
    }

    #[test]
    fn test_consumer_without_producers_encodes_falsum() {
        let root = Type::root();
        let p = Predicate::new("p", vec![root.clone()]);
        let var = |name: &str| Variable::new(name, root.clone());
        let (i0, g0) = (var("i0"), var("g0"));
        let steps = vec![
            Operator::new(INIT_OP_NAME, vec![i0.clone()], vec![], vec![]),
            Operator::new(
                GOAL_OP_NAME,
                vec![g0.clone()],
                vec![Literal::new(Atom::new(p, vec![g0.clone()]), true)],
                vec![],
            ),
        ];
        let mut sub = Substitution::new();
        sub.bind(i0, Constant::new("obj", root.clone()));
        sub.bind(g0, Constant::new("obj", root.clone()));
        let cs = minimal_causal_structure(&steps, &sub, false, true);
        // the structure has no producer for the goal precondition
        assert_eq!(0, cs.len());
        let plan = Plan::new(Problem::default(), steps, sub, cs).unwrap();
        let encoding = WcnfEncoder::new(ground_options()).encode(&plan).unwrap();
        // the consumer encodes to the empty clause
        assert!(encoding
            .formula
            .iter_clauses()
            .any(|c| c.literals().is_empty()));
        assert!(!encoding.formula.hard_satisfiable());
    }

    #[test]
    fn test_filtered_out_consumer_makes_formula_unsatisfiable() {
        // a plan whose only causal chain goes backwards: deordering removes
        // the producer and leaves an empty selection clause
        let root = Type::root();
        let lit = |pred: &str, var: &Variable, polarity: bool| {
            Literal::new(
                Atom::new(
                    Predicate::new(pred, vec![root.clone()]),
                    vec![var.clone()],
                ),
                polarity,
            )
        };
        let var = |name: &str| Variable::new(name, root.clone());
        let (i0, a0, b0, g0) = (var("i0"), var("a0"), var("b0"), var("g0"));
        let steps = vec![
            Operator::new(INIT_OP_NAME, vec![i0.clone()], vec![], vec![]),
            // step 1 consumes what only step 2 produces
            Operator::new("0_a", vec![a0.clone()], vec![lit("p", &a0, true)], vec![]),
            Operator::new("1_b", vec![b0.clone()], vec![], vec![lit("p", &b0, true)]),
            Operator::new(GOAL_OP_NAME, vec![g0.clone()], vec![], vec![]),
        ];
        let mut sub = Substitution::new();
        for s in &steps {
            for v in s.parameters() {
                sub.bind(v.clone(), Constant::new("obj", root.clone()));
            }
        }
        let cs = minimal_causal_structure(&steps, &sub, false, true);
        assert_eq!(1, cs.len());
        let plan = Plan::new(Problem::default(), steps, sub, cs).unwrap();
        let options = EncoderOptions {
            causal_structure: CausalStructureOpt::Deorder,
            ..ground_options()
        };
        let encoding = WcnfEncoder::new(options).encode(&plan).unwrap();
        assert!(!encoding.formula.hard_satisfiable());
    }

    #[test]
    fn test_acyclicity_mutual_exclusion() {
        let plan = chain_plan();
        let options = EncoderOptions {
            output: OutputOpt::TotalOrder,
            ..ground_options()
        };
        let encoding = WcnfEncoder::new(options).encode(&plan).unwrap();
        let mut formula = encoding.formula;
        let p12 = encoding.propositions.get_precedence(1, 2).unwrap();
        let p21 = encoding.propositions.get_precedence(2, 1).unwrap();
        formula.add_clause(vec![p12 as isize]);
        formula.add_clause(vec![p21 as isize]);
        assert!(!formula.hard_satisfiable());
    }

    #[test]
    fn test_binary_and_atom_encodings_agree() {
        for (output, causal) in [
            (OutputOpt::PartialOrder, CausalStructureOpt::Reorder),
            (OutputOpt::TotalOrder, CausalStructureOpt::Reorder),
            (OutputOpt::PartialOrder, CausalStructureOpt::Deorder),
        ] {
            let plan = chain_plan();
            let atom = WcnfEncoder::new(EncoderOptions {
                acyclicity: AcyclicityOpt::Atom,
                output,
                causal_structure: causal,
                ..ground_options()
            })
            .encode(&plan)
            .unwrap();
            let binary = WcnfEncoder::new(EncoderOptions {
                acyclicity: AcyclicityOpt::Binary,
                output,
                causal_structure: causal,
                ..ground_options()
            })
            .encode(&plan)
            .unwrap();
            assert_eq!(
                atom.formula.hard_satisfiable(),
                binary.formula.hard_satisfiable()
            );
        }
    }

    #[test]
    fn test_binary_encoding_rejects_cycles() {
        let plan = chain_plan();
        let encoding = WcnfEncoder::new(EncoderOptions {
            acyclicity: AcyclicityOpt::Binary,
            output: OutputOpt::TotalOrder,
            ..ground_options()
        })
        .encode(&plan)
        .unwrap();
        let mut formula = encoding.formula;
        let p12 = encoding.propositions.get_precedence(1, 2).unwrap();
        let p21 = encoding.propositions.get_precedence(2, 1).unwrap();
        formula.add_clause(vec![p12 as isize]);
        formula.add_clause(vec![p21 as isize]);
        assert!(!formula.hard_satisfiable());
    }

    #[test]
    fn test_soft_clauses_penalize_defined_precedences() {
        let plan = chain_plan();
        let encoding = WcnfEncoder::new(ground_options()).encode(&plan).unwrap();
        let n_pairs = encoding.propositions.iter_precedence_pairs().count();
        let soft: Vec<_> = encoding
            .formula
            .iter_clauses()
            .filter(|c| c.weight().is_some())
            .collect();
        assert_eq!(n_pairs, soft.len());
        assert!(soft
            .iter()
            .all(|c| c.weight() == Some(1) && c.literals().len() == 1 && c.literals()[0] < 0));
    }

    #[test]
    fn test_cnf_mode_emits_no_soft_clause() {
        let plan = chain_plan();
        let encoding = WcnfEncoder::new(EncoderOptions {
            mode: FormulaMode::Cnf,
            ..ground_options()
        })
        .encode(&plan)
        .unwrap();
        assert!(encoding.formula.iter_clauses().all(|c| c.weight().is_none()));
    }

    #[test]
    fn test_custom_strategy_requires_graph() {
        let plan = chain_plan();
        let options = EncoderOptions {
            causal_structure: CausalStructureOpt::Custom,
            ..ground_options()
        };
        assert!(WcnfEncoder::new(options).encode(&plan).is_err());
    }

    #[test]
    fn test_custom_strategy_keeps_init_and_goal_links() {
        let plan = chain_plan();
        let mut graph = DirectedGraph::new();
        graph.add_edge(1, 2);
        let options = EncoderOptions {
            causal_structure: CausalStructureOpt::Custom,
            custom_precedence: Some(graph),
            ..ground_options()
        };
        let encoding = WcnfEncoder::new(options).encode(&plan).unwrap();
        assert!(encoding.formula.hard_satisfiable());
    }

    #[test]
    fn test_oracle_required_for_structural_symmetries() {
        let plan = chain_plan();
        let options = EncoderOptions {
            symmetry: SymmetryOpt::Struct,
            ..ground_options()
        };
        assert!(WcnfEncoder::new(options).encode(&plan).is_err());
    }

    #[test]
    fn test_link_selection_biconditional_truth_table() {
        use permutator::CartesianProduct;
        let plan = chain_plan();
        let encoding = WcnfEncoder::new(EncoderOptions {
            mode: FormulaMode::Cnf,
            ..ground_options()
        })
        .encode(&plan)
        .unwrap();
        // the link from A to B: selection <-> A < B (ground, no threats)
        let link = plan
            .constraints()
            .iter_links()
            .find(|l| l.producer.step == 1 && l.consumer.step == 2)
            .unwrap();
        let sel = encoding.propositions.get_link_selection(link).unwrap();
        let prec = encoding.propositions.get_precedence(1, 2).unwrap();
        let relevant: Vec<&crate::sat::Clause> = encoding
            .formula
            .iter_clauses()
            .filter(|c| {
                c.literals().len() == 2
                    && c.literals().iter().any(|l| l.unsigned_abs() == sel)
                    && c.literals().iter().any(|l| l.unsigned_abs() == prec)
            })
            .collect();
        let domains: Vec<&[bool]> = vec![&[false, true], &[false, true]];
        for assignment in domains.cart_prod() {
            let (sel_v, prec_v) = (*assignment[0], *assignment[1]);
            let holds = relevant.iter().all(|c| {
                c.literals().iter().any(|l| {
                    let v = if l.unsigned_abs() == sel { sel_v } else { prec_v };
                    v == (*l > 0)
                })
            });
            assert_eq!(sel_v == prec_v, holds, "sel={} prec={}", sel_v, prec_v);
        }
    }

    #[test]
    fn test_threat_resolution_forces_demotion() {
        // init gives p; A consumes p; B deletes p: B threatens the init->A
        // link and the only resolution is to schedule B after A
        let root = Type::root();
        let lit = |pred: &str, var: &Variable, polarity: bool| {
            Literal::new(
                Atom::new(
                    Predicate::new(pred, vec![root.clone()]),
                    vec![var.clone()],
                ),
                polarity,
            )
        };
        let var = |name: &str| Variable::new(name, root.clone());
        let (i0, a0, a1, b0, g0) = (var("i0"), var("a0"), var("a1"), var("b0"), var("g0"));
        let steps = vec![
            Operator::new(INIT_OP_NAME, vec![i0.clone()], vec![], vec![lit("p", &i0, true)]),
            Operator::new(
                "0_use",
                vec![a0.clone(), a1.clone()],
                vec![lit("p", &a0, true)],
                vec![lit("q", &a1, true)],
            ),
            Operator::new("1_del", vec![b0.clone()], vec![], vec![lit("p", &b0, false)]),
            Operator::new(GOAL_OP_NAME, vec![g0.clone()], vec![lit("q", &g0, true)], vec![]),
        ];
        let mut sub = Substitution::new();
        for s in &steps {
            for v in s.parameters() {
                sub.bind(v.clone(), Constant::new("obj", root.clone()));
            }
        }
        let cs = minimal_causal_structure(&steps, &sub, false, true);
        let plan = Plan::new(Problem::default(), steps, sub, cs).unwrap();
        let encoding = WcnfEncoder::new(ground_options()).encode(&plan).unwrap();
        let link = plan
            .constraints()
            .iter_links()
            .find(|l| l.producer.step == 0 && l.consumer.step == 1)
            .unwrap();
        let threat = Threat { step: 2, post: 0 };
        let tprop = encoding
            .propositions
            .get_threat_resolution(link, threat)
            .unwrap();
        // the link must be selected, so its threat must be resolved
        let mut sat_formula = encoding.formula;
        sat_formula.add_clause(vec![tprop as isize]);
        assert!(sat_formula.hard_satisfiable());
        // denying the A<B ordering leaves the threat unresolvable
        let encoding = WcnfEncoder::new(ground_options()).encode(&plan).unwrap();
        let p_ab = encoding.propositions.get_precedence(1, 2).unwrap();
        let mut unsat_formula = encoding.formula;
        unsat_formula.add_clause(vec![-(p_ab as isize)]);
        assert!(!unsat_formula.hard_satisfiable());
    }
}
