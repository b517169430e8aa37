//! Model decoding: side tables, the precedence-graph reconstruction and the
//! flexibility metric.

mod decoder;
pub use decoder::flex;
pub use decoder::DecodedPlan;
pub use decoder::Decoder;

mod side_tables;
pub use side_tables::SideTables;
