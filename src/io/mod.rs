//! Input/output: the lifted-plan reader, side-table persistence and the
//! partial-order-plan writer.

mod plan_reader;
pub use plan_reader::PlanFile;
pub use plan_reader::PlanReader;
pub use plan_reader::WarningHandler;

mod pop_writer;
pub use pop_writer::write_pop;

mod side_tables_io;
pub use side_tables_io::read_side_tables;
pub use side_tables_io::write_side_tables;
