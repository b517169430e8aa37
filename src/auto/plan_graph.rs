use super::{AutomorphismOracle, AutomorphismResult, ColoredGraph, Permutation};
use crate::lang::{Constant, Plan, Problem, Term, Variable};
use crate::pct::{Consumer, Producer};
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, HashMap};

/// The shape of a classified plan automorphism.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymmetryKind {
    /// The permutation moves constant vertices only.
    Object,
    /// The permutation swaps two operators and their variables in lockstep;
    /// the two step indices are given.
    Operator(usize, usize),
    /// The permutation moves producer/consumer vertices only.
    Structural,
}

/// The bridge between a plan and the automorphism oracle.
///
/// The bridge renders the plan (or the bare problem description) as a
/// vertex-colored graph, hands it to the oracle, and maps the resulting
/// permutations back onto domain objects.
pub struct PlanAutomorphisms {
    result: AutomorphismResult,
    constant_vertex: BTreeMap<Constant, usize>,
    vertex_constant: HashMap<usize, Constant>,
    variable_vertex: BTreeMap<Variable, usize>,
    vertex_variable: HashMap<usize, Variable>,
    vertex_step: HashMap<usize, usize>,
    producer_vertex: BTreeMap<Producer, usize>,
    vertex_producer: HashMap<usize, Producer>,
    consumer_vertex: BTreeMap<Consumer, usize>,
    vertex_consumer: HashMap<usize, Consumer>,
}

/// Allocates colors on first use, in a deterministic order.
#[derive(Default)]
struct ColorAllocator<K: std::hash::Hash + Eq> {
    colors: HashMap<K, usize>,
    next: usize,
}

impl<K: std::hash::Hash + Eq> ColorAllocator<K> {
    fn new() -> Self {
        Self {
            colors: HashMap::new(),
            next: 0,
        }
    }

    fn color_of(&mut self, key: K) -> usize {
        let next = &mut self.next;
        *self.colors.entry(key).or_insert_with(|| {
            let c = *next;
            *next += 1;
            c
        })
    }

    fn fresh(&mut self) -> usize {
        let c = self.next;
        self.next += 1;
        c
    }
}

impl PlanAutomorphisms {
    /// Builds the colored graph of the full causal plan and runs the oracle
    /// over it.
    ///
    /// The graph has one vertex per constant, per real-step variable and per
    /// operator, plus one vertex chain per `init` postcondition and per
    /// `goal` precondition. Colors separate constants and variables by type,
    /// literal chains by polarity and predicate, and operators by schema.
    pub fn of_plan(plan: &Plan, oracle: &mut dyn AutomorphismOracle) -> Result<Self> {
        let mut graph = ColoredGraph::new();
        let mut colors = ColorAllocator::new();

        let mut constant_vertex = BTreeMap::new();
        for c in plan.problem().iter_constants() {
            let color = colors.color_of(format!("const:{}", c.term_type().name()));
            constant_vertex.insert(c.clone(), graph.add_vertex(color));
        }

        let mut variable_vertex = BTreeMap::new();
        for step in plan.iter_real_steps() {
            for v in plan.step(step).parameters() {
                let color = colors.color_of(format!("var:{}", v.term_type().name()));
                variable_vertex.insert(v.clone(), graph.add_vertex(color));
            }
        }

        let mut step_vertex: HashMap<usize, usize> = HashMap::new();
        for step in 0..plan.n_steps() {
            let color = colors.color_of(format!("op:{}", plan.step(step).schema_name()));
            step_vertex.insert(step, graph.add_vertex(color));
        }

        let lit_color = |colors: &mut ColorAllocator<String>, polarity: bool, pred: &str| {
            colors.color_of(format!("lit:{}:{}", polarity, pred))
        };

        let mut producer_vertex = BTreeMap::new();
        let mut consumer_vertex = BTreeMap::new();
        let anchors = [
            (plan.init_index(), true),
            (plan.goal_index(), false),
        ];
        for (step, is_init) in anchors {
            let op = plan.step(step);
            let lits = if is_init {
                op.postconditions()
            } else {
                op.preconditions()
            };
            for (lit_idx, lit) in lits.iter().enumerate() {
                let color = lit_color(&mut colors, lit.polarity(), lit.predicate().name());
                // one vertex for the literal, one per parameter
                let lit_vertex = graph.add_vertex(color);
                graph.add_edge(step_vertex[&step], lit_vertex);
                let mut prev = lit_vertex;
                for param in lit.parameters() {
                    let param_vertex = graph.add_vertex(color);
                    graph.add_edge(param_vertex, prev);
                    prev = param_vertex;
                    let value = plan.substitution().apply(param);
                    let const_vertex = *constant_vertex
                        .get(value)
                        .ok_or_else(|| anyhow!("unknown constant {}", value))?;
                    graph.add_edge(param_vertex, const_vertex);
                }
                if is_init {
                    producer_vertex.insert(
                        Producer {
                            step,
                            post: lit_idx,
                        },
                        lit_vertex,
                    );
                } else {
                    consumer_vertex.insert(
                        Consumer {
                            step,
                            pre: lit_idx,
                        },
                        lit_vertex,
                    );
                }
            }
        }

        // real steps link their parameter chain to their operator vertex
        for step in plan.iter_real_steps() {
            let mut prev = step_vertex[&step];
            for v in plan.step(step).parameters() {
                let var_vertex = variable_vertex[v];
                graph.add_edge(prev, var_vertex);
                prev = var_vertex;
            }
        }

        let result = oracle.automorphisms(&graph)?;
        Ok(Self::assemble(
            result,
            constant_vertex,
            variable_vertex,
            step_vertex,
            producer_vertex,
            consumer_vertex,
        ))
    }

    /// Builds the colored graph of the bare problem description (objects and
    /// initial/goal facts, no operators) and runs the oracle over it.
    pub fn of_problem(problem: &Problem, oracle: &mut dyn AutomorphismOracle) -> Result<Self> {
        let mut graph = ColoredGraph::new();
        let mut colors = ColorAllocator::new();

        let mut constant_vertex = BTreeMap::new();
        for c in problem.iter_constants() {
            let color = colors.color_of(format!("const:{}", c.term_type().name()));
            constant_vertex.insert(c.clone(), graph.add_vertex(color));
        }

        let init_vertex = graph.add_vertex(colors.fresh());
        let goal_vertex = graph.add_vertex(colors.fresh());

        let anchors = [
            (init_vertex, problem.init_facts()),
            (goal_vertex, problem.goal_facts()),
        ];
        for (anchor, facts) in anchors {
            for fact in facts {
                let color = colors.color_of(format!(
                    "lit:{}:{}",
                    fact.polarity(),
                    fact.predicate().name()
                ));
                let mut prev = anchor;
                for param in fact.parameters() {
                    let param_vertex = graph.add_vertex(color);
                    graph.add_edge(param_vertex, prev);
                    prev = param_vertex;
                    let const_vertex = *constant_vertex
                        .get(param)
                        .ok_or_else(|| anyhow!("unknown constant {}", param))?;
                    graph.add_edge(param_vertex, const_vertex);
                }
            }
        }

        let result = oracle.automorphisms(&graph)?;
        Ok(Self::assemble(
            result,
            constant_vertex,
            BTreeMap::new(),
            HashMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
        ))
    }

    fn assemble(
        result: AutomorphismResult,
        constant_vertex: BTreeMap<Constant, usize>,
        variable_vertex: BTreeMap<Variable, usize>,
        step_vertex: HashMap<usize, usize>,
        producer_vertex: BTreeMap<Producer, usize>,
        consumer_vertex: BTreeMap<Consumer, usize>,
    ) -> Self {
        let vertex_constant = constant_vertex
            .iter()
            .map(|(c, v)| (*v, c.clone()))
            .collect();
        let vertex_variable = variable_vertex
            .iter()
            .map(|(var, v)| (*v, var.clone()))
            .collect();
        let vertex_step = step_vertex.iter().map(|(s, v)| (*v, *s)).collect();
        let vertex_producer = producer_vertex.iter().map(|(p, v)| (*v, *p)).collect();
        let vertex_consumer = consumer_vertex.iter().map(|(c, v)| (*v, *c)).collect();
        Self {
            result,
            constant_vertex,
            vertex_constant,
            variable_vertex,
            vertex_variable,
            vertex_step,
            producer_vertex,
            vertex_producer,
            consumer_vertex,
            vertex_consumer,
        }
    }

    /// Returns the oracle result.
    pub fn result(&self) -> &AutomorphismResult {
        &self.result
    }

    /// Returns the graph vertex of a constant, if any.
    pub fn constant_vertex(&self, c: &Constant) -> Option<usize> {
        self.constant_vertex.get(c).copied()
    }

    /// Returns the graph vertex of a variable, if any.
    pub fn variable_vertex(&self, v: &Variable) -> Option<usize> {
        self.variable_vertex.get(v).copied()
    }

    /// Classifies a permutation as an object, operator or structural
    /// symmetry.
    ///
    /// A permutation that fits none of the three shapes indicates that the
    /// colored graph does not match the expected parameter/operator coupling
    /// and is a hard error.
    pub fn classify(&self, perm: &Permutation, plan: &Plan) -> Result<SymmetryKind> {
        let mut consts = 0usize;
        let mut vars: Vec<&Variable> = Vec::new();
        let mut steps: Vec<usize> = Vec::new();
        let mut structural = 0usize;
        for v in perm.moved_vertices() {
            if self.vertex_constant.contains_key(&v) {
                consts += 1;
            } else if let Some(var) = self.vertex_variable.get(&v) {
                vars.push(var);
            } else if let Some(step) = self.vertex_step.get(&v) {
                steps.push(*step);
            } else if self.vertex_producer.contains_key(&v) || self.vertex_consumer.contains_key(&v)
            {
                structural += 1;
            }
        }
        if consts > 0 {
            if vars.is_empty() && steps.is_empty() && structural == 0 {
                return Ok(SymmetryKind::Object);
            }
            return Err(anyhow!(
                "automorphism moves constants together with {} variable(s), {} operator(s) and {} literal vertices",
                vars.len(),
                steps.len(),
                structural
            ));
        }
        if !steps.is_empty() {
            if steps.len() != 2 {
                return Err(anyhow!("automorphism moves {} operators", steps.len()));
            }
            let (s1, s2) = (steps[0], steps[1]);
            let expected = plan.step(s1).parameters().len() + plan.step(s2).parameters().len();
            if vars.len() != expected
                || structural != 0
                || !plan
                    .step(s1)
                    .parameters()
                    .iter()
                    .chain(plan.step(s2).parameters().iter())
                    .all(|p| vars.contains(&p))
            {
                return Err(anyhow!(
                    "automorphism moves operators {} and {} without their variables",
                    plan.step(s1).name(),
                    plan.step(s2).name()
                ));
            }
            return Ok(SymmetryKind::Operator(usize::min(s1, s2), usize::max(s1, s2)));
        }
        if structural > 0 && vars.is_empty() {
            return Ok(SymmetryKind::Structural);
        }
        if !vars.is_empty() {
            return Err(anyhow!(
                "automorphism moves {} variable(s) without their operators",
                vars.len()
            ));
        }
        // identity on every mapped vertex
        Ok(SymmetryKind::Structural)
    }

    /// Maps a permutation onto the constants it moves.
    pub fn constant_permutation(
        &self,
        perm: &Permutation,
    ) -> Result<BTreeMap<Constant, Constant>> {
        let mut map = BTreeMap::new();
        for v in perm.moved_vertices() {
            if let Some(c) = self.vertex_constant.get(&v) {
                let image = self
                    .vertex_constant
                    .get(&perm.apply(v))
                    .ok_or_else(|| anyhow!("constant {} is mapped to a non-constant vertex", c))?;
                map.insert(c.clone(), image.clone());
            }
        }
        Ok(map)
    }

    /// Maps a permutation onto the producers it moves.
    pub fn producer_permutation(&self, perm: &Permutation) -> Result<BTreeMap<Producer, Producer>> {
        let mut map = BTreeMap::new();
        for v in perm.moved_vertices() {
            if let Some(p) = self.vertex_producer.get(&v) {
                let image = self.vertex_producer.get(&perm.apply(v)).ok_or_else(|| {
                    anyhow!("a producer vertex is mapped to a non-producer vertex")
                })?;
                map.insert(*p, *image);
            }
        }
        Ok(map)
    }

    /// Maps a permutation onto the consumers it moves.
    pub fn consumer_permutation(&self, perm: &Permutation) -> Result<BTreeMap<Consumer, Consumer>> {
        let mut map = BTreeMap::new();
        for v in perm.moved_vertices() {
            if let Some(c) = self.vertex_consumer.get(&v) {
                let image = self.vertex_consumer.get(&perm.apply(v)).ok_or_else(|| {
                    anyhow!("a consumer vertex is mapped to a non-consumer vertex")
                })?;
                map.insert(*c, *image);
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto::Group;
    use crate::lang::{
        Atom, Domain, Literal, Operator, Predicate, Substitution, Type, GOAL_OP_NAME, INIT_OP_NAME,
    };
    use crate::pct::minimal_causal_structure;

    /// Two interchangeable unary steps consuming the same init fact.
    fn twin_plan() -> Plan {
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
        let domain = Domain::new(vec![], vec![p, q], vec![]);
        let problem = Problem::new(domain, vec![obj], vec![], vec![]);
        let cs = minimal_causal_structure(&steps, &sub, false, false);
        Plan::new(problem, steps, sub, cs).unwrap()
    }

    fn identity_oracle() -> impl FnMut(&ColoredGraph) -> Result<AutomorphismResult> {
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
    fn test_plan_graph_shape() {
        let plan = twin_plan();
        let mut seen = None;
        let mut oracle = |g: &ColoredGraph| {
            seen = Some((g.n_vertices(), g.n_edges()));
            identity_oracle()(g)
        };
        PlanAutomorphisms::of_plan(&plan, &mut oracle).unwrap();
        // 1 constant + 2 real-step variables + 4 operators + 2 literal
        // chains of 2 vertices each
        let (n_vertices, n_edges) = seen.unwrap();
        assert_eq!(11, n_vertices);
        // 2 chains of (op-lit, lit-param, param-const) + 2 op-var edges
        assert_eq!(8, n_edges);
    }

    #[test]
    fn test_classify_operator_symmetry() {
        let plan = twin_plan();
        let mut oracle = identity_oracle();
        let autos = PlanAutomorphisms::of_plan(&plan, &mut oracle).unwrap();
        // swap the two mark steps and their variables
        let a_var = autos.variable_vertex(&Variable::new("a0", Type::root())).unwrap();
        let b_var = autos.variable_vertex(&Variable::new("b0", Type::root())).unwrap();
        let a_op = *autos
            .vertex_step
            .iter()
            .find(|(_, s)| **s == 1)
            .map(|(v, _)| v)
            .unwrap();
        let b_op = *autos
            .vertex_step
            .iter()
            .find(|(_, s)| **s == 2)
            .map(|(v, _)| v)
            .unwrap();
        let mut image: Vec<usize> = (0..autos.result().n_vertices()).collect();
        image.swap(a_var, b_var);
        image.swap(a_op, b_op);
        let perm = Permutation::new(image).unwrap();
        assert_eq!(
            SymmetryKind::Operator(1, 2),
            autos.classify(&perm, &plan).unwrap()
        );
    }

    #[test]
    fn test_classify_mixed_shape_is_an_error() {
        let plan = twin_plan();
        let mut oracle = identity_oracle();
        let autos = PlanAutomorphisms::of_plan(&plan, &mut oracle).unwrap();
        // move the two operators without their variables
        let a_op = *autos
            .vertex_step
            .iter()
            .find(|(_, s)| **s == 1)
            .map(|(v, _)| v)
            .unwrap();
        let b_op = *autos
            .vertex_step
            .iter()
            .find(|(_, s)| **s == 2)
            .map(|(v, _)| v)
            .unwrap();
        let mut image: Vec<usize> = (0..autos.result().n_vertices()).collect();
        image.swap(a_op, b_op);
        let perm = Permutation::new(image).unwrap();
        assert!(autos.classify(&perm, &plan).is_err());
    }

    #[test]
    fn test_classify_object_symmetry() {
        let root = Type::root();
        let p = Predicate::new("p", vec![root.clone()]);
        let (c1, c2) = (
            Constant::new("c1", root.clone()),
            Constant::new("c2", root.clone()),
        );
        let fact = |c: &Constant| Literal::new(Atom::new(p.clone(), vec![c.clone()]), true);
        let problem = Problem::new(
            Domain::new(vec![], vec![p.clone()], vec![]),
            vec![c1.clone(), c2.clone()],
            vec![fact(&c1), fact(&c2)],
            vec![],
        );
        let mut oracle = identity_oracle();
        let autos = PlanAutomorphisms::of_problem(&problem, &mut oracle).unwrap();
        let v1 = autos.constant_vertex(&c1).unwrap();
        let v2 = autos.constant_vertex(&c2).unwrap();
        let mut image: Vec<usize> = (0..autos.result().n_vertices()).collect();
        image.swap(v1, v2);
        let perm = Permutation::new(image).unwrap();
        // moving only constants is an object symmetry on the problem graph
        let plan = twin_plan();
        assert_eq!(SymmetryKind::Object, autos.classify(&perm, &plan).unwrap());
        let cperm = autos.constant_permutation(&perm).unwrap();
        assert_eq!(Some(&c2), cperm.get(&c1));
        assert_eq!(Some(&c1), cperm.get(&c2));
    }
}
