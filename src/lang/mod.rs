//! The first-order plan language: types, terms, literals, operators and plans.

mod operator;
pub use operator::Operator;
pub use operator::GOAL_OP_NAME;
pub use operator::INIT_OP_NAME;

mod plan;
pub use plan::Plan;

mod predicates;
pub use predicates::Atom;
pub use predicates::Literal;
pub use predicates::Predicate;

mod problem;
pub use problem::Domain;
pub use problem::Problem;

mod substitution;
pub use substitution::Substitution;

mod symbols;
pub use symbols::Constant;
pub use symbols::Term;
pub use symbols::Type;
pub use symbols::Variable;
