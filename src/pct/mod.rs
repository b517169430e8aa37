//! Producer/consumer/threat analysis over causal-link plans.

mod causal_structure;
pub use causal_structure::minimal_causal_structure;
pub use causal_structure::CausalStructure;

mod relations;
pub use relations::Consumer;
pub use relations::PcLink;
pub use relations::Producer;
pub use relations::Threat;

mod threat_map;
pub use threat_map::ThreatMap;
