//! Query submission and completion polling for partlake
//!
//! [`QueryRunner`] is the only entry point the functions use: it submits SQL
//! text through a [`QueryEngine`] and waits for a terminal state.

mod athena;
mod engine;
mod runner;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use athena::AthenaEngine;
pub use engine::QueryEngine;
pub use runner::{PollPolicy, QueryOutcome, QueryRunner};
