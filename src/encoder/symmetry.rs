//! Lexicographic-leader symmetry breaking over classified plan
//! automorphisms.

use super::options::{EqualityOpt, SymmetryOpt};
use super::wcnf_encoder::EncoderState;
use crate::auto::{AutomorphismOracle, PlanAutomorphisms, SymmetryKind};
use crate::lang::{Constant, Term, Variable};
use crate::pct::{Consumer, PcLink, Producer};
use anyhow::{anyhow, Result};
use log::debug;
use std::collections::{BTreeMap, HashMap};

impl<'a> EncoderState<'a> {
    pub(crate) fn build_symmetry_breaking_constraints(
        &mut self,
        oracle: Option<&mut dyn AutomorphismOracle>,
    ) -> Result<()> {
        let n_clauses = self.formula.n_clauses();
        let n_props = self.props.n_props();
        let need_oracle =
            || oracle.ok_or_else(|| anyhow!("symmetry strategy requires an automorphism oracle"));
        match self.options.symmetry {
            SymmetryOpt::None => {}
            SymmetryOpt::OpTypes => self.break_operator_type_symmetries(),
            SymmetryOpt::OpVal => self.break_operator_value_symmetries(need_oracle()?)?,
            SymmetryOpt::Struct => self.break_structural_symmetries(need_oracle()?, true)?,
            SymmetryOpt::InitState => self.break_structural_symmetries(need_oracle()?, false)?,
        }
        self.n_symmetry_props = self.props.n_props() - n_props;
        self.n_symmetry_clauses = self.formula.n_clauses() - n_clauses;
        debug!(
            "added {} symmetry breaking propositions and {} clauses",
            self.n_symmetry_props, self.n_symmetry_clauses
        );
        Ok(())
    }

    /// Groups step indices by operator schema, each group sorted by step
    /// name.
    pub(crate) fn operators_by_schema(&self) -> Vec<(String, Vec<usize>)> {
        let mut map: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, op) in self.plan.steps().iter().enumerate() {
            map.entry(op.schema_name().to_string()).or_default().push(i);
        }
        for ops in map.values_mut() {
            ops.sort_by(|a, b| self.plan.step(*a).name().cmp(self.plan.step(*b).name()));
        }
        map.into_iter().collect()
    }

    /// All operators of the same schema are interchangeable: force the
    /// name-ordered one to never come strictly after its twin.
    ///
    /// In a ground encoding only operator pairs with identical bindings are
    /// interchangeable.
    fn break_operator_type_symmetries(&mut self) {
        let sub = self.plan.substitution();
        for (_, ops) in self.operators_by_schema() {
            for (i, op1) in ops.iter().enumerate() {
                for op2 in ops.iter().skip(i + 1) {
                    if self.options.ground
                        && sub.apply_all(self.plan.step(*op1).parameters())
                            != sub.apply_all(self.plan.step(*op2).parameters())
                    {
                        continue;
                    }
                    if let Some(p) = self.props.get_precedence(*op2, *op1) {
                        self.formula.add_clause(vec![-(p as isize)]);
                        debug!(
                            "{} >= {}",
                            self.plan.step(*op2).name(),
                            self.plan.step(*op1).name()
                        );
                    }
                }
            }
        }
    }

    /// Breaks the automorphism-derived structural symmetries; when
    /// `op_symms` is set, same-schema operator pairs are broken the same
    /// way.
    fn break_structural_symmetries(
        &mut self,
        oracle: &mut dyn AutomorphismOracle,
        op_symms: bool,
    ) -> Result<()> {
        let autos = PlanAutomorphisms::of_plan(self.plan, oracle)?;

        // order producers and consumers by (step name, literal position)
        let mut prod_order: Vec<Producer> =
            self.plan.constraints().all_producers().copied().collect();
        prod_order
            .sort_by(|a, b| (self.plan.step(a.step).name(), a.post)
                .cmp(&(self.plan.step(b.step).name(), b.post)));
        let mut cons_order: Vec<Consumer> =
            self.plan.constraints().all_consumers().copied().collect();
        cons_order
            .sort_by(|a, b| (self.plan.step(a.step).name(), a.pre)
                .cmp(&(self.plan.step(b.step).name(), b.pre)));
        let prod_ind: HashMap<Producer, usize> =
            prod_order.iter().enumerate().map(|(i, p)| (*p, i)).collect();
        let cons_ind: HashMap<Consumer, usize> =
            cons_order.iter().enumerate().map(|(i, c)| (*c, i)).collect();

        let mut n_leaders = 0;
        for perm in autos.result().group().permutations() {
            let prod_perm = autos.producer_permutation(perm)?;
            let cons_perm = autos.consumer_permutation(perm)?;
            if !prod_perm.is_empty() || !cons_perm.is_empty() {
                self.encode_structural_leader(
                    &prod_perm, &cons_perm, &prod_ind, &cons_ind, &prod_order, &cons_order,
                    n_leaders,
                );
                n_leaders += 1;
            }
        }

        if op_symms {
            for (_, ops) in self.operators_by_schema() {
                for w in ops.windows(2) {
                    let (op1, op2) = (w[0], w[1]);
                    let mut prod_perm = BTreeMap::new();
                    let mut cons_perm = BTreeMap::new();
                    for j in 0..self.plan.step(op1).postconditions().len() {
                        let prod = Producer { step: op1, post: j };
                        let img = Producer { step: op2, post: j };
                        prod_perm.insert(prod, img);
                        prod_perm.insert(img, prod);
                    }
                    for j in 0..self.plan.step(op1).preconditions().len() {
                        let cons = Consumer { step: op1, pre: j };
                        let img = Consumer { step: op2, pre: j };
                        cons_perm.insert(cons, img);
                        cons_perm.insert(img, cons);
                    }
                    if !prod_perm.is_empty() || !cons_perm.is_empty() {
                        self.encode_structural_leader(
                            &prod_perm, &cons_perm, &prod_ind, &cons_ind, &prod_order,
                            &cons_order, n_leaders,
                        );
                        n_leaders += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Emits the lex-leader chain keeping, among the link-selection vectors
    /// related by the permutation, only the lexicographically smallest one.
    #[allow(clippy::too_many_arguments)]
    fn encode_structural_leader(
        &mut self,
        prod_perm: &BTreeMap<Producer, Producer>,
        cons_perm: &BTreeMap<Consumer, Consumer>,
        prod_ind: &HashMap<Producer, usize>,
        cons_ind: &HashMap<Consumer, usize>,
        prod_order: &[Producer],
        cons_order: &[Consumer],
        leader: usize,
    ) {
        let mut arr: Vec<isize> = Vec::new();
        let mut img: Vec<isize> = Vec::new();
        for prod in prod_order {
            match prod_perm.get(prod) {
                Some(prod_image) => {
                    if prod_ind[prod] < prod_ind[prod_image] {
                        for cons in cons_order {
                            let cons_image = cons_perm.get(cons).unwrap_or(cons);
                            let link = PcLink::new(*prod, *cons);
                            let image = PcLink::new(*prod_image, *cons_image);
                            if self.causal.contains_link(&link) && self.causal.contains_link(&image)
                            {
                                arr.push(self.props.link_selection_prop(link) as isize);
                                img.push(self.props.link_selection_prop(image) as isize);
                            }
                        }
                    }
                }
                None => {
                    for cons in cons_order {
                        if let Some(cons_image) = cons_perm.get(cons) {
                            if cons_ind[cons] < cons_ind[cons_image] {
                                let link = PcLink::new(*prod, *cons);
                                let image = PcLink::new(*prod, *cons_image);
                                if self.causal.contains_link(&link)
                                    && self.causal.contains_link(&image)
                                {
                                    arr.push(self.props.link_selection_prop(link) as isize);
                                    img.push(self.props.link_selection_prop(image) as isize);
                                }
                            }
                        }
                    }
                }
            }
        }

        if arr.is_empty() {
            debug!("all causal links of a structural leader are filtered");
            return;
        }

        let aux: Vec<isize> = (0..arr.len())
            .map(|i| self.props.auxiliary_prop(&format!("cslex-{}-{}", leader, i)) as isize)
            .collect();
        for i in 0..arr.len() {
            if i == 0 {
                self.formula.add_clause(vec![-arr[0], img[0]]);
            } else {
                self.formula.add_clause(vec![-aux[i], -arr[i], img[i]]);
            }
            if i < arr.len() - 1 {
                if i == 0 {
                    self.formula.add_clause(vec![aux[1], -arr[0]]);
                    self.formula.add_clause(vec![aux[1], img[0]]);
                    self.formula.add_clause(vec![-aux[1], arr[0], -img[0]]);
                } else {
                    self.formula.add_clause(vec![aux[i + 1], -aux[i], -arr[i]]);
                    self.formula.add_clause(vec![aux[i + 1], -aux[i], img[i]]);
                    self.formula.add_clause(vec![-aux[i + 1], aux[i]]);
                    self.formula.add_clause(vec![-aux[i + 1], arr[i], -img[i]]);
                }
            }
        }
    }

    /// Breaks object and operator symmetries from classified automorphisms.
    fn break_operator_value_symmetries(
        &mut self,
        oracle: &mut dyn AutomorphismOracle,
    ) -> Result<()> {
        if self.options.equality == EqualityOpt::None {
            debug!("no value symmetries to break in a ground encoding");
            return Ok(());
        }
        let autos = PlanAutomorphisms::of_plan(self.plan, oracle)?;
        let mut n_leaders = 0;
        for perm in autos.result().group().permutations() {
            if perm.is_identity() {
                continue;
            }
            match autos.classify(perm, self.plan)? {
                SymmetryKind::Object => {
                    let cperm = autos.constant_permutation(perm)?;
                    debug!("encoding value lex-leader over {} constants", cperm.len());
                    self.encode_value_lex_leader(&cperm, &autos, n_leaders);
                    n_leaders += 1;
                }
                SymmetryKind::Operator(s1, s2) => {
                    debug!(
                        "encoding operator lex-leader: {} <-> {}",
                        self.plan.step(s1).format_parameters(),
                        self.plan.step(s2).format_parameters()
                    );
                    self.encode_operator_lex_leader(s1, s2, &autos, n_leaders);
                    n_leaders += 1;
                }
                SymmetryKind::Structural => {}
            }
        }
        Ok(())
    }

    /// Emits the lex-leader chain over the free variables of the permuted
    /// constants' types: at the first variable not bound to a fixed point,
    /// the bound constant must not be the image of a smaller one.
    fn encode_value_lex_leader(
        &mut self,
        perm: &BTreeMap<Constant, Constant>,
        autos: &PlanAutomorphisms,
        leader: usize,
    ) {
        let init_params = self.plan.step(self.plan.init_index()).parameters().to_vec();
        let goal_params = self.plan.step(self.plan.goal_index()).parameters().to_vec();
        let mut vars: Vec<Variable> = self
            .plan
            .substitution()
            .variables()
            .filter(|v| {
                perm.keys().any(|c| v.term_type().has_subtype(c.term_type()))
                    && !init_params.contains(v)
                    && !goal_params.contains(v)
            })
            .cloned()
            .collect();
        vars.sort_by_key(|v| autos.variable_vertex(v).unwrap_or(usize::MAX));
        if vars.is_empty() {
            return;
        }

        // partition each variable's domain into the permutation's fixed
        // points and the constants smaller than their image
        let domain_split = |state: &Self, var: &Variable| {
            let mut eq_cons = Vec::new();
            let mut lt_cons = Vec::new();
            for c in state.plan.problem().constants_of_type(var.term_type()) {
                match perm.get(&c) {
                    None => eq_cons.push(c),
                    Some(image) => {
                        if autos.constant_vertex(&c) < autos.constant_vertex(image) {
                            lt_cons.push(c);
                        }
                    }
                }
            }
            (eq_cons, lt_cons)
        };

        let aux: Vec<isize> = (0..vars.len())
            .map(|i| self.props.auxiliary_prop(&format!("objlex-{}-{}", leader, i)) as isize)
            .collect();
        for (i, var) in vars.iter().enumerate() {
            let xi = aux[i];
            let (eq_cons, lt_cons) = domain_split(self, var);
            let eqps: Vec<isize> = eq_cons
                .iter()
                .map(|c| self.variable_assignment_prop(var, c))
                .collect();
            let ltps: Vec<isize> = lt_cons
                .iter()
                .map(|c| self.variable_assignment_prop(var, c))
                .collect();

            if i == 0 {
                let mut clause = vec![-xi];
                clause.extend(&eqps);
                self.formula.add_clause(clause);
                for eqp in &eqps {
                    self.formula.add_clause(vec![-eqp, xi]);
                }
                let mut binding: Vec<isize> = eqps.clone();
                binding.extend(&ltps);
                self.formula.add_clause(binding);
            } else {
                let xim1 = aux[i - 1];
                self.formula.add_clause(vec![-xi, xim1]);
                let mut clause = vec![-xi];
                clause.extend(&eqps);
                self.formula.add_clause(clause);
                for eqp in &eqps {
                    self.formula.add_clause(vec![-xim1, -eqp, xi]);
                }
                let mut binding: Vec<isize> = vec![-xim1];
                binding.extend(&eqps);
                binding.extend(&ltps);
                self.formula.add_clause(binding);
            }
        }
    }

    /// Emits the lex-leader of a same-schema operator pair: a prefix-equal
    /// chain over the pair's variable bindings, extended by the precedence
    /// vector against the rest of the plan.
    fn encode_operator_lex_leader(
        &mut self,
        s1: usize,
        s2: usize,
        autos: &PlanAutomorphisms,
        leader: usize,
    ) {
        let params1 = self.plan.step(s1).parameters().to_vec();
        let params2 = self.plan.step(s2).parameters().to_vec();
        let mut var_perm: HashMap<Variable, Variable> = HashMap::new();
        for (v1, v2) in params1.iter().zip(params2.iter()) {
            var_perm.insert(v1.clone(), v2.clone());
            var_perm.insert(v2.clone(), v1.clone());
        }
        let mut vars: Vec<Variable> = params1.iter().chain(params2.iter()).cloned().collect();
        vars.sort_by_key(|v| autos.variable_vertex(v).unwrap_or(usize::MAX));

        // prefix-equal chain over the variable bindings
        let mut last_aux: isize;
        if vars.is_empty() {
            last_aux = self.props.auxiliary_prop(&format!("oplex-base-{}", leader)) as isize;
            self.formula.add_clause(vec![last_aux]);
        } else {
            let aux: Vec<isize> = (0..vars.len())
                .map(|i| {
                    self.props.auxiliary_prop(&format!("oplex-vars-{}-{}", leader, i)) as isize
                })
                .collect();
            for (i, var) in vars.iter().enumerate() {
                let pvar = var_perm[var].clone();
                let eq = self.props.equality_prop(var, &pvar) as isize;
                let xi = aux[i];
                let domain = self.plan.problem().constants_of_type(var.term_type());
                let vertex_of =
                    |c: &Constant| autos.constant_vertex(c).unwrap_or(usize::MAX);
                if i == 0 {
                    self.formula.add_clause(vec![-xi, eq]);
                    self.formula.add_clause(vec![-eq, xi]);
                } else {
                    let xim1 = aux[i - 1];
                    self.formula.add_clause(vec![-xi, xim1]);
                    self.formula.add_clause(vec![-xi, eq]);
                    self.formula.add_clause(vec![-xim1, -eq, xi]);
                }
                // while the prefix is equal, the variable's value must not be
                // the image of a smaller one
                for c in &domain {
                    let mut clause: Vec<isize> = Vec::new();
                    if i > 0 {
                        clause.push(-aux[i - 1]);
                    }
                    clause.push(eq);
                    clause.push(-self.variable_assignment_prop(var, c));
                    for c2 in &domain {
                        if vertex_of(c2) < vertex_of(c) {
                            clause.push(self.variable_assignment_prop(&pvar, c2));
                        }
                    }
                    self.formula.add_clause(clause);
                }
            }
            last_aux = aux[vars.len() - 1];
        }

        // precedence-vector chain: compare each (step, first-of-pair)
        // ordering with its image under the swap
        let swap = |s: usize| {
            if s == s1 {
                s2
            } else if s == s2 {
                s1
            } else {
                s
            }
        };
        for step in 0..self.plan.n_steps() {
            let xi = self
                .props
                .auxiliary_prop(&format!("oplex-order-{}-{}", leader, step)) as isize;
            let prec = self.props.get_precedence(step, s1).map(|p| p as isize);
            let perm_prec = self
                .props
                .get_precedence(swap(step), swap(s1))
                .map(|p| p as isize);

            self.formula.add_clause(vec![-xi, last_aux]);
            match (prec, perm_prec) {
                (None, None) => {
                    self.formula.add_clause(vec![xi, -last_aux]);
                }
                (None, Some(pp)) => {
                    self.formula.add_clause(vec![-xi, -pp]);
                    self.formula.add_clause(vec![xi, -last_aux, pp]);
                }
                (Some(p), None) => {
                    self.formula.add_clause(vec![-xi, -p]);
                    self.formula.add_clause(vec![xi, -last_aux, p]);
                    self.formula.add_clause(vec![-last_aux, -p]);
                }
                (Some(p), Some(pp)) => {
                    self.formula.add_clause(vec![-xi, -p, pp]);
                    self.formula.add_clause(vec![-xi, p, -pp]);
                    self.formula.add_clause(vec![xi, -last_aux, p, pp]);
                    self.formula.add_clause(vec![xi, -last_aux, -p, -pp]);
                    self.formula.add_clause(vec![-last_aux, -p, pp]);
                }
            }
            last_aux = xi;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto::{AutomorphismResult, ColoredGraph, Group};
    use crate::encoder::{EncoderOptions, Relation, WcnfEncoder};
    use crate::lang::{
        Atom, Domain, Literal, Operator, Plan, Predicate, Problem, Substitution, Type,
        GOAL_OP_NAME, INIT_OP_NAME,
    };
    use crate::pct::minimal_causal_structure;
    use crate::sat::FormulaMode;

    /// Two interchangeable ground steps of the same schema.
    fn twin_ground_plan() -> Plan {
        let root = Type::root();
        let p = Predicate::new("p", vec![root.clone()]);
        let q = Predicate::new("q", vec![root.clone()]);
        let lit = |pred: &Predicate, v: &Variable, polarity: bool| {
            Literal::new(Atom::new(pred.clone(), vec![v.clone()]), polarity)
        };
        let var = |name: &str| Variable::new(name, root.clone());
        let (i0, a0, b0, g0) = (var("i0"), var("a0"), var("b0"), var("g0"));
        let steps = vec![
            Operator::new(INIT_OP_NAME, vec![i0.clone()], vec![], vec![lit(&p, &i0, true)]),
            Operator::new(
                "0_mark",
                vec![a0.clone()],
                vec![lit(&p, &a0, true)],
                vec![lit(&q, &a0, true)],
            ),
            Operator::new(
                "1_mark",
                vec![b0.clone()],
                vec![lit(&p, &b0, true)],
                vec![lit(&q, &b0, true)],
            ),
            Operator::new(GOAL_OP_NAME, vec![g0.clone()], vec![lit(&q, &g0, true)], vec![]),
        ];
        let obj = Constant::new("obj", root.clone());
        let mut sub = Substitution::new();
        for s in &steps {
            for v in s.parameters() {
                sub.bind(v.clone(), obj.clone());
            }
        }
        let problem = Problem::new(Domain::new(vec![], vec![p, q], vec![]), vec![obj], vec![], vec![]);
        let cs = minimal_causal_structure(&steps, &sub, false, true);
        Plan::new(problem, steps, sub, cs).unwrap()
    }

    fn ground_options(symmetry: SymmetryOpt) -> EncoderOptions {
        EncoderOptions {
            mode: FormulaMode::Wcnf,
            ground: true,
            equality: EqualityOpt::None,
            symmetry,
            ..EncoderOptions::default()
        }
    }

    fn trivial_oracle() -> impl FnMut(&ColoredGraph) -> anyhow::Result<AutomorphismResult> {
        |g: &ColoredGraph| {
            Ok(AutomorphismResult::new(
                Group::default(),
                (0..g.n_vertices()).map(|v| vec![v]).collect(),
                1.0,
                g.n_vertices(),
            ))
        }
    }

    #[test]
    fn test_op_types_forces_canonical_order() {
        let plan = twin_ground_plan();
        let encoding = WcnfEncoder::new(EncoderOptions {
            output: crate::encoder::OutputOpt::TotalOrder,
            ..ground_options(SymmetryOpt::OpTypes)
        })
        .encode(&plan)
        .unwrap();
        assert!(encoding.n_symmetry_clauses > 0);
        assert!(encoding.formula.hard_satisfiable());
        // the name-ordered twin must not come strictly after its sibling:
        // the 1_mark < 0_mark precedence proposition is forced false
        let p21 = encoding.propositions.get_precedence(2, 1).unwrap();
        let mut formula = encoding.formula;
        formula.add_clause(vec![p21 as isize]);
        assert!(!formula.hard_satisfiable());
    }

    #[test]
    fn test_op_types_stats_are_reported() {
        let plan = twin_ground_plan();
        let with_sb = WcnfEncoder::new(EncoderOptions {
            output: crate::encoder::OutputOpt::TotalOrder,
            ..ground_options(SymmetryOpt::OpTypes)
        })
        .encode(&plan)
        .unwrap();
        assert_eq!(0, with_sb.n_symmetry_props);
        assert!(with_sb.n_symmetry_clauses > 0);
        let baseline = WcnfEncoder::new(EncoderOptions {
            output: crate::encoder::OutputOpt::TotalOrder,
            ..ground_options(SymmetryOpt::None)
        })
        .encode(&plan)
        .unwrap();
        assert_eq!(
            baseline.formula.n_clauses() + with_sb.n_symmetry_clauses,
            with_sb.formula.n_clauses()
        );
    }

    #[test]
    fn test_op_types_ground_requires_equal_bindings() {
        // rebind the second twin elsewhere: the steps are no longer
        // interchangeable and no canonical-order clause is emitted
        let root = Type::root();
        let plan = twin_ground_plan();
        let mut sub = plan.substitution().clone();
        sub.bind(
            Variable::new("b0", root.clone()),
            Constant::new("other", root.clone()),
        );
        let steps = plan.steps().to_vec();
        let cs = minimal_causal_structure(&steps, &sub, false, true);
        let plan2 = Plan::new(Problem::default(), steps, sub, cs).unwrap();
        let with_sb = WcnfEncoder::new(ground_options(SymmetryOpt::OpTypes))
            .encode(&plan2)
            .unwrap();
        assert_eq!(0, with_sb.n_symmetry_clauses);
    }

    #[test]
    fn test_structural_symmetry_via_oracle() {
        let plan = twin_ground_plan();
        // keep the remaining model: 0_mark selected as the goal's producer
        let encoding = WcnfEncoder::new(ground_options(SymmetryOpt::Struct))
            .encode_with_oracle(&plan, &mut trivial_oracle())
            .unwrap();
        // the operator-pair leader emits auxiliary chain propositions
        assert!(encoding.n_symmetry_clauses > 0);
        assert!(encoding.formula.hard_satisfiable());
        // among the two symmetric goal justifications, selecting the
        // lexicographically greater one alone is forbidden
        let links: Vec<_> = plan.constraints().iter_links().collect();
        let goal = plan.goal_index();
        let from_0 = links
            .iter()
            .find(|l| l.producer.step == 1 && l.consumer.step == goal)
            .unwrap();
        let from_1 = links
            .iter()
            .find(|l| l.producer.step == 2 && l.consumer.step == goal)
            .unwrap();
        let sel0 = encoding.propositions.get_link_selection(*from_0).unwrap();
        let sel1 = encoding.propositions.get_link_selection(*from_1).unwrap();
        let mut formula = encoding.formula;
        formula.add_clause(vec![sel0 as isize]);
        formula.add_clause(vec![-(sel1 as isize)]);
        assert!(!formula.hard_satisfiable());
    }

    #[test]
    fn test_symmetry_stage_off_by_default() {
        let plan = twin_ground_plan();
        let encoding = WcnfEncoder::new(ground_options(SymmetryOpt::None))
            .encode(&plan)
            .unwrap();
        assert_eq!(0, encoding.n_symmetry_props);
        assert_eq!(0, encoding.n_symmetry_clauses);
        assert!(!encoding.formula.iter_clauses().any(|c| {
            c.literals().iter().any(|l| {
                matches!(
                    encoding.propositions.relation_of(l.unsigned_abs()),
                    Some(Relation::Auxiliary(_))
                )
            })
        }));
    }
}
