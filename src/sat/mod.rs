//! The weighted formula, solver models and the external MaxSAT interface.

mod formula;
pub use formula::Clause;
pub use formula::FormulaMode;
pub use formula::WeightedFormula;
pub use formula::DEFAULT_HARD_WEIGHT;

mod model;
pub use model::Model;

mod solver;
pub use solver::ExternalMaxSatSolver;
pub use solver::MaxSatSolver;
