//! Graph automorphisms: the colored plan graph, the oracle interface, and
//! the classification of discovered symmetries.

mod colored_graph;
pub use colored_graph::ColoredGraph;

mod group;
pub use group::AutomorphismResult;
pub use group::Group;
pub use group::Permutation;

mod oracle;
pub use oracle::AutomorphismOracle;
pub use oracle::ExternalAutomorphismOracle;

mod plan_graph;
pub use plan_graph::PlanAutomorphisms;
pub use plan_graph::SymmetryKind;
