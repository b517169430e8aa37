use super::predicates::Literal;
use super::substitution::Substitution;
use super::symbols::{Constant, Term, Variable};
use std::fmt::Display;

/// The name of the synthetic operator producing the initial state.
pub const INIT_OP_NAME: &str = "init";

/// The name of the synthetic operator consuming the goal facts.
pub const GOAL_OP_NAME: &str = "goal";

/// A named action schema instance.
///
/// An operator has an ordered parameter list and ordered lists of
/// precondition and postcondition literals over its parameters. Plan steps
/// are operators over [`Variable`] parameters; applying a substitution yields
/// the ground operator over [`Constant`] parameters.
///
/// Step names follow the `<position>_<schema>` convention, so two steps
/// instantiating the same schema share their [`Self::schema_name`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Operator<T>
where
    T: Term,
{
    name: String,
    parameters: Vec<T>,
    preconditions: Vec<Literal<T>>,
    postconditions: Vec<Literal<T>>,
}

impl<T> Operator<T>
where
    T: Term,
{
    /// Builds a new operator.
    pub fn new(
        name: &str,
        parameters: Vec<T>,
        preconditions: Vec<Literal<T>>,
        postconditions: Vec<Literal<T>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            preconditions,
            postconditions,
        }
    }

    /// Returns the name of the operator instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the schema name, i.e. the instance name with its position
    /// prefix stripped.
    pub fn schema_name(&self) -> &str {
        match self.name.find('_') {
            Some(i) => &self.name[i + 1..],
            None => &self.name,
        }
    }

    /// Returns the ordered parameter list.
    pub fn parameters(&self) -> &[T] {
        &self.parameters
    }

    /// Returns the ordered precondition literals.
    pub fn preconditions(&self) -> &[Literal<T>] {
        &self.preconditions
    }

    /// Returns the ordered postcondition literals.
    pub fn postconditions(&self) -> &[Literal<T>] {
        &self.postconditions
    }

    /// Returns `true` iff this operator is the synthetic `init` operator.
    pub fn is_init(&self) -> bool {
        self.name == INIT_OP_NAME
    }

    /// Returns `true` iff this operator is the synthetic `goal` operator.
    pub fn is_goal(&self) -> bool {
        self.name == GOAL_OP_NAME
    }

    /// Returns `true` iff the given effect is cancelled by another
    /// postcondition of this operator with exactly the same parameters.
    pub fn is_undone(&self, effect: &Literal<T>) -> bool {
        self.postconditions.contains(&effect.negated())
    }

    /// Returns the postcondition re-asserting the fact the given effect
    /// removes (same predicate, opposite polarity, any parameters), if one
    /// exists.
    pub fn undoing(&self, effect: &Literal<T>) -> Option<&Literal<T>> {
        self.postconditions
            .iter()
            .find(|p| p.predicate() == effect.predicate() && p.polarity() != effect.polarity())
    }

    /// Formats the operator as `name(p1,...,pn)`.
    pub fn format_parameters(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| p.name().to_string())
            .collect::<Vec<String>>()
            .join(",");
        format!("{}({})", self.name, params)
    }
}

impl Operator<Variable> {
    /// Applies a substitution to every parameter and literal, yielding the
    /// ground operator.
    ///
    /// # Panics
    ///
    /// Panics if one of the operator's variables is unbound.
    pub fn apply(&self, sub: &Substitution) -> Operator<Constant> {
        Operator {
            name: self.name.clone(),
            parameters: sub.apply_all(&self.parameters),
            preconditions: self
                .preconditions
                .iter()
                .map(|l| l.apply_sub(sub))
                .collect(),
            postconditions: self
                .postconditions
                .iter()
                .map(|l| l.apply_sub(sub))
                .collect(),
        }
    }
}

impl<T> Display for Operator<T>
where
    T: Term,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{Atom, Predicate, Type};

    fn lit(pred: &str, vars: &[&str], polarity: bool) -> Literal<Variable> {
        let root = Type::root();
        let predicate = Predicate::new(pred, vec![root.clone(); vars.len()]);
        let params = vars
            .iter()
            .map(|v| Variable::new(v, root.clone()))
            .collect();
        Literal::new(Atom::new(predicate, params), polarity)
    }

    #[test]
    fn test_schema_name() {
        let op = Operator::<Variable>::new("2_move", vec![], vec![], vec![]);
        assert_eq!("2_move", op.name());
        assert_eq!("move", op.schema_name());
        let init = Operator::<Variable>::new(INIT_OP_NAME, vec![], vec![], vec![]);
        assert_eq!("init", init.schema_name());
        assert!(init.is_init());
    }

    #[test]
    fn test_is_undone() {
        let op = Operator::new(
            "0_toggle",
            vec![Variable::new("x", Type::root())],
            vec![],
            vec![lit("on", &["x"], false), lit("on", &["x"], true)],
        );
        assert!(op.is_undone(&lit("on", &["x"], false)));
        assert!(!op.is_undone(&lit("on", &["y"], false)));
    }

    #[test]
    fn test_undoing_with_other_parameters() {
        let op = Operator::new(
            "0_swap",
            vec![
                Variable::new("x", Type::root()),
                Variable::new("y", Type::root()),
            ],
            vec![],
            vec![lit("on", &["x"], false), lit("on", &["y"], true)],
        );
        let undoing = op.undoing(&lit("on", &["x"], false)).unwrap();
        assert_eq!(&lit("on", &["y"], true), undoing);
        assert!(op.undoing(&lit("off", &["x"], false)).is_none());
    }

    #[test]
    fn test_apply_substitution() {
        let root = Type::root();
        let x = Variable::new("x", root.clone());
        let op = Operator::new(
            "0_visit",
            vec![x.clone()],
            vec![lit("at", &["x"], true)],
            vec![lit("visited", &["x"], true)],
        );
        let mut sub = Substitution::new();
        sub.bind(x, Constant::new("home", root));
        let ground = op.apply(&sub);
        assert_eq!("home", ground.parameters()[0].name());
        assert_eq!("at(home)", ground.preconditions()[0].to_string());
    }

    #[test]
    fn test_format_parameters() {
        let root = Type::root();
        let op = Operator::new(
            "0_move",
            vec![
                Variable::new("x", root.clone()),
                Variable::new("y", root.clone()),
            ],
            vec![],
            vec![],
        );
        assert_eq!("0_move(x,y)", op.format_parameters());
    }
}
