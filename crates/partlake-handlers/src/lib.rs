//! Partition maintenance and access-log relocation
//!
//! The functions here take explicit configuration and trait objects; the
//! Lambda adapter and the CLI only decide *when* to call them.

mod context;
pub mod mover;
pub mod scheduled;

pub use context::FunctionContext;
pub use mover::{move_access_logs, records_from_s3_event, MoveOutcome, MoveReport, ObjectRef};
pub use scheduled::{create_partitions, transform_missing, transform_partition};
