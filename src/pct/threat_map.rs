use super::causal_structure::assignable;
use super::relations::{PcLink, Threat};
use crate::lang::{Plan, Predicate, Substitution};
use std::collections::HashMap;

/// An index of the step effects able to undo a causal link.
///
/// Every postcondition of every step is filed under the polarity and
/// predicate of the literals it negates, so the candidate threats to a link
/// are found by a single lookup on the link's producer literal. Candidates
/// are then filtered by [`ThreatMap::threats_to`].
pub struct ThreatMap {
    map: HashMap<(bool, Predicate), Vec<Threat>>,
}

impl ThreatMap {
    /// Builds the threat map of a plan's step list.
    pub fn new(plan: &Plan) -> Self {
        let mut map: HashMap<(bool, Predicate), Vec<Threat>> = HashMap::new();
        for (step, op) in plan.steps().iter().enumerate() {
            for (post, lit) in op.postconditions().iter().enumerate() {
                // an effect of polarity p threatens the links producing not(p)
                map.entry((!lit.polarity(), lit.predicate().clone()))
                    .or_default()
                    .push(Threat { step, post });
            }
        }
        Self { map }
    }

    /// Returns the candidate threats matching a link's producer literal,
    /// before filtering.
    pub fn candidates(&self, link: &PcLink, plan: &Plan) -> &[Threat] {
        let lit = link.producer.literal(plan);
        self.map
            .get(&(lit.polarity(), lit.predicate().clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the threats to a link in a lifted encoding.
    pub fn non_ground_threats(&self, link: &PcLink, plan: &Plan) -> Vec<Threat> {
        self.threats_to(link, plan, None)
    }

    /// Returns the threats to a link in a ground encoding, comparing literals
    /// under the given total substitution.
    pub fn ground_threats(&self, link: &PcLink, plan: &Plan, sub: &Substitution) -> Vec<Threat> {
        self.threats_to(link, plan, Some(sub))
    }

    fn threats_to(&self, link: &PcLink, plan: &Plan, sub: Option<&Substitution>) -> Vec<Threat> {
        self.candidates(link, plan)
            .iter()
            .filter(|t| is_threat(link, t, plan, sub))
            .copied()
            .collect()
    }
}

/// Checks whether a candidate actually threatens a link.
fn is_threat(link: &PcLink, threat: &Threat, plan: &Plan, sub: Option<&Substitution>) -> bool {
    let produced = link.producer.literal(plan);
    let threatened = threat.literal(plan);

    if produced.predicate() != threatened.predicate()
        || produced.polarity() != threatened.polarity()
    {
        return false;
    }

    // a consumer cannot be a threat to itself
    if threat.step == link.consumer.step {
        return false;
    }

    if !assignable(
        threatened.parameters(),
        link.consumer.literal(plan).parameters(),
    ) {
        return false;
    }

    // undone in lifted form (p(x), -p(x))
    let threat_op = threat.operator(plan);
    if threat_op.is_undone(threat.effect(plan)) {
        return false;
    }

    // undone in ground form (p(x), -p(y), x=1, y=1)
    if let Some(sub) = sub {
        if threat_op
            .apply(sub)
            .is_undone(&threat.effect(plan).apply_sub(sub))
        {
            return false;
        }
    }

    // a negative effect never threatens a positive effect of its own operator
    if threat.step == link.producer.step && threatened.polarity() {
        return false;
    }

    match sub {
        Some(sub) => {
            sub.apply_all(link.consumer.literal(plan).parameters())
                == sub.apply_all(threatened.parameters())
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{
        Atom, Constant, Literal, Operator, Problem, Type, Variable, GOAL_OP_NAME, INIT_OP_NAME,
    };
    use crate::pct::{minimal_causal_structure, Consumer, Producer};

    // init: +at(i); clear: -at(c); move: -at(m1), +at(m2); goal needs at(g)
    fn threat_plan() -> Plan {
        let root = Type::root();
        let at = Predicate::new("at", vec![root.clone()]);
        let lit = |name: &str, polarity: bool| {
            Literal::new(
                Atom::new(at.clone(), vec![Variable::new(name, root.clone())]),
                polarity,
            )
        };
        let var = |name: &str| Variable::new(name, root.clone());
        let steps = vec![
            Operator::new(INIT_OP_NAME, vec![var("i")], vec![], vec![lit("i", true)]),
            Operator::new("0_clear", vec![var("c")], vec![], vec![lit("c", false)]),
            Operator::new(
                "1_move",
                vec![var("m1"), var("m2")],
                vec![],
                vec![lit("m1", false), lit("m2", true)],
            ),
            Operator::new(GOAL_OP_NAME, vec![var("g")], vec![lit("g", true)], vec![]),
        ];
        let mut sub = Substitution::new();
        for s in &steps {
            for v in s.parameters() {
                sub.bind(v.clone(), Constant::new("spot", root.clone()));
            }
        }
        // the move step goes from spot to dest
        sub.bind(var("m2"), Constant::new("dest", root.clone()));
        let cs = minimal_causal_structure(&steps, &sub, false, false);
        Plan::new(Problem::default(), steps, sub, cs).unwrap()
    }

    fn init_goal_link() -> PcLink {
        PcLink::new(
            Producer { step: 0, post: 0 },
            Consumer { step: 3, pre: 0 },
        )
    }

    #[test]
    fn test_negative_effects_threaten_positive_link() {
        let plan = threat_plan();
        let threats = ThreatMap::new(&plan).non_ground_threats(&init_goal_link(), &plan);
        // both the clear effect and the move delete effect threaten the link
        assert_eq!(
            vec![Threat { step: 1, post: 0 }, Threat { step: 2, post: 0 }],
            threats
        );
    }

    #[test]
    fn test_consumer_is_not_its_own_threat() {
        let plan = threat_plan();
        // link from the move effect to the goal: the goal consumes it, and a
        // step never threatens the link it consumes
        let link = PcLink::new(
            Producer { step: 2, post: 1 },
            Consumer { step: 3, pre: 0 },
        );
        let threats = ThreatMap::new(&plan).non_ground_threats(&link, &plan);
        assert!(threats.iter().all(|t| t.step != 3));
    }

    #[test]
    fn test_producer_negative_effect_spares_its_own_positive_link() {
        let plan = threat_plan();
        let link = PcLink::new(
            Producer { step: 2, post: 1 },
            Consumer { step: 3, pre: 0 },
        );
        let threats = ThreatMap::new(&plan).non_ground_threats(&link, &plan);
        assert_eq!(vec![Threat { step: 1, post: 0 }], threats);
    }

    #[test]
    fn test_ground_threats_require_equal_bindings() {
        let plan = threat_plan();
        let map = ThreatMap::new(&plan);
        let sub = plan.substitution().clone();
        // everything is bound to the same constant: threats survive grounding
        let ground = map.ground_threats(&init_goal_link(), &plan, &sub);
        assert_eq!(2, ground.len());
        // rebind the clear step elsewhere: its threat vanishes
        let mut sub2 = sub.clone();
        sub2.bind(
            Variable::new("c", Type::root()),
            Constant::new("elsewhere", Type::root()),
        );
        let ground2 = map.ground_threats(&init_goal_link(), &plan, &sub2);
        assert_eq!(vec![Threat { step: 2, post: 0 }], ground2);
    }

    #[test]
    fn test_self_undone_effect_is_no_threat() {
        let root = Type::root();
        let at = Predicate::new("at", vec![root.clone()]);
        let lit = |name: &str, polarity: bool| {
            Literal::new(
                Atom::new(at.clone(), vec![Variable::new(name, root.clone())]),
                polarity,
            )
        };
        let var = |name: &str| Variable::new(name, root.clone());
        // the toggle step removes and re-asserts at(t) with the same binding
        let steps = vec![
            Operator::new(INIT_OP_NAME, vec![var("i")], vec![], vec![lit("i", true)]),
            Operator::new(
                "0_toggle",
                vec![var("t")],
                vec![],
                vec![lit("t", false), lit("t", true)],
            ),
            Operator::new(GOAL_OP_NAME, vec![var("g")], vec![lit("g", true)], vec![]),
        ];
        let mut sub = Substitution::new();
        for s in &steps {
            for v in s.parameters() {
                sub.bind(v.clone(), Constant::new("spot", root.clone()));
            }
        }
        let cs = minimal_causal_structure(&steps, &sub, false, false);
        let plan = Plan::new(Problem::default(), steps, sub, cs).unwrap();
        let link = PcLink::new(
            Producer { step: 0, post: 0 },
            Consumer { step: 2, pre: 0 },
        );
        let threats = ThreatMap::new(&plan).non_ground_threats(&link, &plan);
        assert!(threats.is_empty());
    }
}
