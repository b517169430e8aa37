//! The constraint builder: options, the proposition symbol table, the
//! encoding stages and the symmetry breaking subsystem.

mod options;
pub use options::AcyclicityOpt;
pub use options::CausalStructureOpt;
pub use options::EncoderOptions;
pub use options::EqualityOpt;
pub use options::OutputOpt;
pub use options::Preset;
pub use options::SymmetryOpt;

mod proposition_map;
pub use proposition_map::PropositionMap;
pub use proposition_map::Relation;

mod symmetry;

mod wcnf_encoder;
pub use wcnf_encoder::layered_precedence_graph;
pub use wcnf_encoder::PlanEncoding;
pub use wcnf_encoder::WcnfEncoder;
