//! partlake-core - pure building blocks for the partlake functions
//!
//! No async and no I/O: partition arithmetic, SQL text, object key
//! rewriting, the query execution model and the shared error type.

pub mod access_log;
pub mod error;
pub mod partition;
pub mod sql;
pub mod types;

pub use access_log::{decode_event_key, AccessLogKey};
pub use error::{ErrorCode, LakeError, Result};
pub use partition::{parse_dth, DailyPartition, HourlyPartition, PartitionLayout};
pub use sql::TableRef;
pub use types::{QueryHandle, QueryRequest, QueryState, QueryStatus};
